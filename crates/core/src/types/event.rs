//! Event kinds consumed by the persistence worker.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a queue name does not match a known [`EventKind`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

/// A named category of inbound message with its own queue and decoder.
///
/// The queue name on the broker is the event name itself, published through
/// the default exchange with the queue name as routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A new account was registered by the identity service.
    #[serde(rename = "user.registered")]
    UserRegistered,
    /// A shipment order was created, with its items.
    #[serde(rename = "shipment.created")]
    ShipmentCreated,
    /// A shipment's status, contacts or metadata changed.
    #[serde(rename = "shipment.updated")]
    ShipmentUpdated,
}

impl EventKind {
    /// Every event kind the worker subscribes to, in startup order.
    pub const ALL: [Self; 3] = [
        Self::UserRegistered,
        Self::ShipmentCreated,
        Self::ShipmentUpdated,
    ];

    /// Broker queue name for this event kind.
    #[must_use]
    pub const fn queue_name(self) -> &'static str {
        match self {
            Self::UserRegistered => "user.registered",
            Self::ShipmentCreated => "shipment.created",
            Self::ShipmentUpdated => "shipment.updated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.queue_name())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.queue_name() == s)
            .ok_or_else(|| UnknownEventKind(s.to_owned()))
    }
}
