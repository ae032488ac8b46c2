//! Relational records and the association builder.
//!
//! A decoded event is expanded here into the exact rows the persistence
//! writer commits: a user, or a shipment with its items, or a partial
//! shipment update.

pub mod shipment;
pub mod user;

pub use shipment::{
    ContactFields, NewShipment, NewShipmentItem, PersistedShipment, ShipmentAssociation,
    ShipmentItemRecord, ShipmentRecord, ShipmentUpdate,
};
pub use user::{NewUser, UserRecord};
