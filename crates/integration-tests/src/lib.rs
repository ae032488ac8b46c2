//! Integration tests for Shipline.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests
//! cargo test -p shipline-integration-tests
//!
//! # Including the PostgreSQL-backed tests
//! DATABASE_URL=postgres://... cargo test -p shipline-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `user_registered` / `shipment_events` - Message handling end to end
//! - `consumer_concurrency` - Loop independence, shutdown and supervision
//! - `postgres_store` - Repository behavior against a real database
//!
//! This crate provides [`InMemoryStore`], an [`EventStore`] that keeps rows
//! in memory and mirrors the constraints of the real schema, plus helpers to
//! feed consumer loops without a broker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::channel::mpsc;
use shipline_core::{ShipmentItemId, TrackingNumber, UserId};
use shipline_worker::broker::BrokerError;
use shipline_worker::consumer::Inbound;
use shipline_worker::db::{EventStore, RepositoryError};
use shipline_worker::models::{
    PersistedShipment, ShipmentAssociation, ShipmentItemRecord, ShipmentRecord, ShipmentUpdate,
    UserRecord,
};
use tokio::sync::{Notify, Semaphore};

pub use shipline_worker::models::NewUser;

const OPEN_GATE_PERMITS: usize = 1 << 16;

/// Item a consumer loop reads from its delivery stream.
pub type Delivery = Result<Inbound, BrokerError>;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRecord>,
    shipments: BTreeMap<TrackingNumber, ShipmentRecord>,
    items: Vec<ShipmentItemRecord>,
}

/// In-memory [`EventStore`] with the same uniqueness rules as the schema.
///
/// Shipment writes can be held at a gate to simulate a slow store, and all
/// writes can be made to fail.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    shipment_gate: Option<Semaphore>,
    shipment_writes_started: AtomicUsize,
    write_started: Notify,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    /// A store that accepts every write immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose shipment writes wait until [`Self::open_gate`].
    #[must_use]
    pub fn with_closed_shipment_gate() -> Self {
        Self {
            shipment_gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    /// Let every pending and future shipment write through.
    pub fn open_gate(&self) {
        if let Some(gate) = &self.shipment_gate {
            gate.add_permits(OPEN_GATE_PERMITS);
        }
    }

    /// Wait until at least one shipment write has started.
    pub async fn wait_for_shipment_write(&self) {
        while self.shipment_writes_started.load(Ordering::SeqCst) == 0 {
            self.write_started.notified().await;
        }
    }

    /// Make subsequent writes fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// All users in insertion order.
    #[must_use]
    pub fn users(&self) -> Vec<UserRecord> {
        self.lock().users.clone()
    }

    /// A shipment by tracking number.
    #[must_use]
    pub fn shipment(&self, tracking_number: &str) -> Option<ShipmentRecord> {
        self.lock()
            .shipments
            .get(&TrackingNumber::new(tracking_number))
            .cloned()
    }

    /// Number of shipments stored.
    #[must_use]
    pub fn shipment_count(&self) -> usize {
        self.lock().shipments.len()
    }

    /// Items referencing `tracking_number`, in insertion order.
    #[must_use]
    pub fn items_of(&self, tracking_number: &str) -> Vec<ShipmentItemRecord> {
        self.lock()
            .items
            .iter()
            .filter(|item| item.shipment_id.as_str() == tracking_number)
            .cloned()
            .collect()
    }

    /// Total number of items stored.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn write_shipment(
        &self,
        association: &ShipmentAssociation,
    ) -> Result<PersistedShipment, RepositoryError> {
        self.check_writable()?;
        let mut tables = self.lock();
        let id = association.tracking_number().clone();
        if tables.shipments.contains_key(&id) {
            return Err(RepositoryError::Conflict(
                "tracking number already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let new = &association.shipment;
        let shipment = ShipmentRecord {
            id: id.clone(),
            logistic_name: new.logistic_name.clone(),
            tracking_number: id.clone(),
            status: new.status.clone(),
            origin: new.origin.clone(),
            destination: new.destination.clone(),
            notes: new.notes.clone(),
            user_id: new.user_id.clone(),
            contacts: new.contacts.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut items = Vec::with_capacity(association.items.len());
        for item in &association.items {
            let next_id = i32::try_from(tables.items.len() + 1)
                .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
            let record = ShipmentItemRecord {
                id: ShipmentItemId::new(next_id),
                shipment_id: item.shipment_id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                weight: item.weight,
            };
            tables.items.push(record.clone());
            items.push(record);
        }
        tables.shipments.insert(id, shipment.clone());

        Ok(PersistedShipment { shipment, items })
    }
}

impl EventStore for InMemoryStore {
    async fn insert_user(&self, user: &NewUser) -> Result<UserRecord, RepositoryError> {
        self.check_writable()?;
        let mut tables = self.lock();
        if tables
            .users
            .iter()
            .any(|existing| existing.external_id == user.external_id)
        {
            return Err(RepositoryError::Conflict(
                "user external id already exists".to_string(),
            ));
        }

        let next_id = i32::try_from(tables.users.len() + 1)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let record = UserRecord {
            id: UserId::new(next_id),
            external_id: user.external_id.clone(),
            msisdn: user.msisdn.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            created_at: Utc::now(),
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn insert_shipment(
        &self,
        association: &ShipmentAssociation,
    ) -> Result<PersistedShipment, RepositoryError> {
        self.shipment_writes_started.fetch_add(1, Ordering::SeqCst);
        self.write_started.notify_one();
        if let Some(gate) = &self.shipment_gate {
            // Dropping the permit returns it, so an open gate stays open.
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        }
        self.write_shipment(association)
    }

    async fn update_shipment(
        &self,
        update: &ShipmentUpdate,
    ) -> Result<ShipmentRecord, RepositoryError> {
        self.check_writable()?;
        let mut tables = self.lock();
        let record = tables
            .shipments
            .get_mut(&update.tracking_number)
            .ok_or(RepositoryError::NotFound)?;
        update.apply_to(record);
        Ok(record.clone())
    }
}

/// A delivery carrying `body`, needing no acknowledgement.
#[must_use]
pub fn delivery(body: &str) -> Delivery {
    Ok(Inbound::new(body.as_bytes().to_vec()))
}

/// A finite delivery stream; the loop sees the stream close after the last body.
#[must_use]
pub fn finite_deliveries(bodies: &[&str]) -> futures::stream::Iter<std::vec::IntoIter<Delivery>> {
    futures::stream::iter(bodies.iter().map(|body| delivery(body)).collect::<Vec<_>>())
}

/// An open-ended delivery stream fed through the returned sender.
#[must_use]
pub fn open_deliveries() -> (mpsc::UnboundedSender<Delivery>, mpsc::UnboundedReceiver<Delivery>) {
    mpsc::unbounded()
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Payload bodies shared by the tests.
pub mod fixtures {
    /// `user.registered` for `u-1`.
    pub const USER_U1: &str = r#"{"id":"u-1","msisdn":"628123","name":"Ann","username":"ann"}"#;

    /// `shipment.created` for `TRK1` with two items.
    pub const SHIPMENT_TRK1: &str = r#"{
        "logistic_name": "JNE",
        "tracking_number": "TRK1",
        "status": "pending",
        "origin": "Jakarta",
        "destination": "Bandung",
        "sender": {"name": "Ann", "phone": "62811", "address": "Jl. Merdeka 1"},
        "recipient": {"name": "Bob", "phone": "62822", "address": "Jl. Asia Afrika 2"},
        "items": [
            {"name": "book", "quantity": 2, "weight": 0.5},
            {"name": "mug", "quantity": 1, "weight": 0.3}
        ],
        "notes": "fragile",
        "user_id": "u-1"
    }"#;

    /// `shipment.updated` marking `TRK1` delivered.
    pub const UPDATE_TRK1_DELIVERED: &str = r#"{
        "tracking_number": "TRK1",
        "status": "delivered",
        "origin": "Jakarta",
        "destination": "Bandung",
        "notes": "left with neighbour",
        "user_id": "u-1",
        "recipient_name": "Bob",
        "recipient_phone": "62822",
        "recipient_address": "Jl. Asia Afrika 2",
        "updated_at": "2026-03-02T10:00:00Z"
    }"#;

    /// A body no decoder accepts.
    pub const TRUNCATED: &str = r#"{"id":"u-1","msis"#;
}
