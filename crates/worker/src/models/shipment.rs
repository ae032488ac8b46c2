//! Shipment records and their association with items.

use chrono::{DateTime, Utc};
use shipline_core::payload::{ShipmentCreated, ShipmentParty, ShipmentUpdated};
use shipline_core::{ShipmentItemId, TrackingNumber};

/// Sender and recipient, flattened to match the `shipments` columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
    pub sender_name: String,
    pub sender_phone: String,
    pub sender_address: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_address: String,
}

impl ContactFields {
    /// Flatten nested sender/recipient parties.
    #[must_use]
    pub fn flatten(sender: ShipmentParty, recipient: ShipmentParty) -> Self {
        Self {
            sender_name: sender.name,
            sender_phone: sender.phone,
            sender_address: sender.address,
            recipient_name: recipient.name,
            recipient_phone: recipient.phone,
            recipient_address: recipient.address,
        }
    }
}

/// A persisted shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRecord {
    /// Primary key; the tracking number.
    pub id: TrackingNumber,
    pub logistic_name: String,
    /// Same value as `id`, kept as its own column.
    pub tracking_number: TrackingNumber,
    /// Free-form lifecycle status.
    pub status: String,
    pub origin: String,
    pub destination: String,
    pub notes: String,
    /// External identifier of the owning user.
    pub user_id: String,
    pub contacts: ContactFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted shipment item.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentItemRecord {
    pub id: ShipmentItemId,
    /// Owning shipment's tracking number.
    pub shipment_id: TrackingNumber,
    pub name: String,
    pub quantity: i64,
    /// Weight of one unit, in kilograms.
    pub weight: f64,
}

/// Parent row of a `shipment.created` association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShipment {
    pub id: TrackingNumber,
    pub logistic_name: String,
    pub status: String,
    pub origin: String,
    pub destination: String,
    pub notes: String,
    pub user_id: String,
    pub contacts: ContactFields,
}

/// Child row of a `shipment.created` association.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShipmentItem {
    /// Foreign key; always the parent's tracking number.
    pub shipment_id: TrackingNumber,
    pub name: String,
    pub quantity: i64,
    pub weight: f64,
}

/// One shipment with all of its items, committed as a single unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentAssociation {
    pub shipment: NewShipment,
    /// Items in payload order.
    pub items: Vec<NewShipmentItem>,
}

impl ShipmentAssociation {
    /// Expand a `shipment.created` event into parent and child rows.
    ///
    /// The tracking number becomes the parent's key and every child's
    /// foreign key; the nested parties are flattened.
    #[must_use]
    pub fn from_event(event: ShipmentCreated) -> Self {
        let id = event.tracking_number;
        let items = event
            .items
            .into_iter()
            .map(|item| NewShipmentItem {
                shipment_id: id.clone(),
                name: item.name,
                quantity: item.quantity,
                weight: item.weight,
            })
            .collect();

        Self {
            shipment: NewShipment {
                id,
                logistic_name: event.logistic_name,
                status: event.status,
                origin: event.origin,
                destination: event.destination,
                notes: event.notes,
                user_id: event.user_id,
                contacts: ContactFields::flatten(event.sender, event.recipient),
            },
            items,
        }
    }

    /// Tracking number shared by the parent and its children.
    #[must_use]
    pub const fn tracking_number(&self) -> &TrackingNumber {
        &self.shipment.id
    }
}

/// A shipment with the items committed alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedShipment {
    pub shipment: ShipmentRecord,
    pub items: Vec<ShipmentItemRecord>,
}

/// Partial update of an existing shipment.
///
/// `tracking_number` only locates the row. It is never written, and neither
/// is the creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentUpdate {
    pub tracking_number: TrackingNumber,
    pub status: String,
    pub notes: String,
    pub origin: String,
    pub destination: String,
    pub user_id: String,
    pub contacts: ContactFields,
    pub updated_at: DateTime<Utc>,
}

impl ShipmentUpdate {
    /// Build an update from a `shipment.updated` event.
    ///
    /// The row is located by `tracking_number`, or by `id` when the producer
    /// left the tracking number blank. `updated_at` is the event's own
    /// timestamp when it carried a usable one, `now` otherwise.
    #[must_use]
    pub fn from_event(event: ShipmentUpdated, now: DateTime<Utc>) -> Self {
        let tracking_number = if event.tracking_number.is_empty() {
            TrackingNumber::new(event.id)
        } else {
            event.tracking_number
        };

        Self {
            tracking_number,
            status: event.status,
            notes: event.notes,
            origin: event.origin,
            destination: event.destination,
            user_id: event.user_id,
            contacts: ContactFields {
                sender_name: event.sender_name,
                sender_phone: event.sender_phone,
                sender_address: event.sender_address,
                recipient_name: event.recipient_name,
                recipient_phone: event.recipient_phone,
                recipient_address: event.recipient_address,
            },
            updated_at: event.updated_at.unwrap_or(now),
        }
    }

    /// Apply this update to a record in place.
    ///
    /// Identity and `created_at` are left untouched.
    pub fn apply_to(&self, record: &mut ShipmentRecord) {
        record.status.clone_from(&self.status);
        record.notes.clone_from(&self.notes);
        record.origin.clone_from(&self.origin);
        record.destination.clone_from(&self.destination);
        record.user_id.clone_from(&self.user_id);
        record.contacts.clone_from(&self.contacts);
        record.updated_at = self.updated_at;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use shipline_core::payload::ShipmentItemPayload;

    use super::*;

    fn party(name: &str) -> ShipmentParty {
        ShipmentParty {
            name: name.to_string(),
            phone: format!("{name}-phone"),
            address: format!("{name}-address"),
        }
    }

    fn created(tracking: &str, item_count: usize) -> ShipmentCreated {
        ShipmentCreated {
            tracking_number: TrackingNumber::new(tracking),
            status: "pending".to_string(),
            sender: party("ann"),
            recipient: party("bob"),
            items: (0..item_count)
                .map(|i| ShipmentItemPayload {
                    name: format!("item-{i}"),
                    quantity: 1,
                    weight: 0.25,
                })
                .collect(),
            ..ShipmentCreated::default()
        }
    }

    #[test]
    fn test_children_reference_parent_tracking_number() {
        for n in [0, 1, 5] {
            let association = ShipmentAssociation::from_event(created("TRK1", n));
            assert_eq!(association.shipment.id.as_str(), "TRK1");
            assert_eq!(association.items.len(), n);
            assert!(
                association
                    .items
                    .iter()
                    .all(|item| item.shipment_id == association.shipment.id)
            );
        }
    }

    #[test]
    fn test_items_keep_payload_order() {
        let association = ShipmentAssociation::from_event(created("TRK2", 3));
        let names: Vec<_> = association.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["item-0", "item-1", "item-2"]);
    }

    #[test]
    fn test_parties_are_flattened() {
        let association = ShipmentAssociation::from_event(created("TRK3", 0));
        let contacts = &association.shipment.contacts;
        assert_eq!(contacts.sender_name, "ann");
        assert_eq!(contacts.sender_address, "ann-address");
        assert_eq!(contacts.recipient_phone, "bob-phone");
    }

    #[test]
    fn test_update_locates_by_tracking_number_then_id() {
        let now = Utc::now();
        let by_tracking = ShipmentUpdate::from_event(
            ShipmentUpdated {
                id: "uuid-1".to_string(),
                tracking_number: TrackingNumber::new("TRK1"),
                ..ShipmentUpdated::default()
            },
            now,
        );
        assert_eq!(by_tracking.tracking_number.as_str(), "TRK1");

        let by_id = ShipmentUpdate::from_event(
            ShipmentUpdated {
                id: "TRK9".to_string(),
                ..ShipmentUpdated::default()
            },
            now,
        );
        assert_eq!(by_id.tracking_number.as_str(), "TRK9");
    }

    #[test]
    fn test_update_timestamp_prefers_event() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).single().unwrap_or_default();
        let sent = Utc.with_ymd_and_hms(2026, 4, 30, 12, 0, 0).single().unwrap_or_default();

        let with_ts = ShipmentUpdate::from_event(
            ShipmentUpdated {
                updated_at: Some(sent),
                ..ShipmentUpdated::default()
            },
            now,
        );
        assert_eq!(with_ts.updated_at, sent);

        let without_ts = ShipmentUpdate::from_event(ShipmentUpdated::default(), now);
        assert_eq!(without_ts.updated_at, now);
    }

    #[test]
    fn test_apply_keeps_identity_and_created_at() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let mut record = ShipmentRecord {
            id: TrackingNumber::new("TRK1"),
            logistic_name: "JNE".to_string(),
            tracking_number: TrackingNumber::new("TRK1"),
            status: "pending".to_string(),
            origin: "Jakarta".to_string(),
            destination: "Bandung".to_string(),
            notes: String::new(),
            user_id: "u-1".to_string(),
            contacts: ContactFields::default(),
            created_at,
            updated_at: created_at,
        };
        let update = ShipmentUpdate {
            tracking_number: TrackingNumber::new("TRK1"),
            status: "delivered".to_string(),
            notes: "left at door".to_string(),
            origin: "Bogor".to_string(),
            destination: "Depok".to_string(),
            user_id: "u-2".to_string(),
            contacts: ContactFields {
                recipient_name: "Bob".to_string(),
                ..ContactFields::default()
            },
            updated_at: Utc::now(),
        };

        update.apply_to(&mut record);

        assert_eq!(record.id.as_str(), "TRK1");
        assert_eq!(record.created_at, created_at);
        assert_eq!(record.logistic_name, "JNE");
        assert_eq!(record.status, "delivered");
        assert_eq!(record.destination, "Depok");
        assert_eq!(record.contacts.recipient_name, "Bob");
        assert_eq!(record.updated_at, update.updated_at);
    }
}
