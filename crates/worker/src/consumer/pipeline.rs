//! Per-message handling: decode, build associations, persist.

use chrono::Utc;
use shipline_core::EventKind;
use tracing::{debug, error, info, warn};

use crate::db::{EventStore, RepositoryError};
use crate::decode::{DecodedEvent, decode};
use crate::models::{NewUser, ShipmentAssociation, ShipmentUpdate};

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Rows were written.
    Persisted,
    /// An update referenced a shipment that does not exist; nothing written.
    NotFound,
    /// The body could not be decoded; nothing written.
    DecodeFailed,
    /// The store rejected the write; nothing written.
    StoreFailed,
}

impl Outcome {
    /// Whether the message resulted in rows being written.
    #[must_use]
    pub const fn is_persisted(self) -> bool {
        matches!(self, Self::Persisted)
    }
}

/// Handle one message body received on `kind`'s queue.
///
/// Never fails: every outcome is logged with enough context for triage and
/// reported to the caller.
pub async fn handle_message<S: EventStore>(kind: EventKind, body: &[u8], store: &S) -> Outcome {
    debug!(
        queue = %kind,
        bytes = body.len(),
        body = %String::from_utf8_lossy(body),
        "Received message"
    );

    match decode(kind, body) {
        Ok(event) => persist(event, store).await,
        Err(e) => {
            warn!(queue = %kind, bytes = body.len(), error = %e, "Discarding undecodable message");
            Outcome::DecodeFailed
        }
    }
}

async fn persist<S: EventStore>(event: DecodedEvent, store: &S) -> Outcome {
    match event {
        DecodedEvent::UserRegistered(payload) => {
            let user = NewUser::from(payload);
            match store.insert_user(&user).await {
                Ok(record) => {
                    info!(username = %record.username, external_id = %record.external_id, "Inserted user");
                    Outcome::Persisted
                }
                Err(e) => {
                    error!(username = %user.username, external_id = %user.external_id, error = %e, "Failed to insert user");
                    Outcome::StoreFailed
                }
            }
        }
        DecodedEvent::ShipmentCreated(payload) => {
            let association = ShipmentAssociation::from_event(payload);
            match store.insert_shipment(&association).await {
                Ok(persisted) => {
                    info!(
                        tracking_number = %persisted.shipment.tracking_number,
                        items = persisted.items.len(),
                        "Inserted shipment"
                    );
                    Outcome::Persisted
                }
                Err(e) => {
                    error!(
                        tracking_number = %association.tracking_number(),
                        items = association.items.len(),
                        error = %e,
                        "Failed to insert shipment"
                    );
                    Outcome::StoreFailed
                }
            }
        }
        DecodedEvent::ShipmentUpdated(payload) => {
            let update = ShipmentUpdate::from_event(payload, Utc::now());
            match store.update_shipment(&update).await {
                Ok(record) => {
                    info!(tracking_number = %record.tracking_number, status = %record.status, "Updated shipment");
                    Outcome::Persisted
                }
                Err(RepositoryError::NotFound) => {
                    warn!(tracking_number = %update.tracking_number, "Shipment not found, dropping update");
                    Outcome::NotFound
                }
                Err(e) => {
                    error!(tracking_number = %update.tracking_number, error = %e, "Failed to update shipment");
                    Outcome::StoreFailed
                }
            }
        }
    }
}
