//! Wire shapes of the events published by the upstream services.
//!
//! Every payload is decoded permissively: unknown fields are ignored, and
//! missing fields or explicit `null`s fall back to the type's zero value
//! (empty string, `0`, empty list). This keeps a producer bug from turning
//! into a poison message; it says nothing about data completeness.
//!
//! Field names follow the JSON the producers actually emit, including the
//! `qty` spelling some producers use for item quantities (`quantity` wins
//! when both are sent).

mod lenient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TrackingNumber;
use lenient::{lenient_timestamp, null_as_default, null_elements_as_default};

/// `user.registered`: an account created by the identity service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRegistered {
    /// Identifier issued by the identity service.
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub msisdn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
}

/// Sender or recipient of a shipment, nested in `shipment.created`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentParty {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
}

/// One line of a `shipment.created` order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawShipmentItem")]
pub struct ShipmentItemPayload {
    pub name: String,
    pub quantity: i64,
    /// Weight of a single unit, in kilograms.
    pub weight: f64,
}

/// Item as it appears on the wire. Some producers spell the quantity `qty`;
/// it is only used when `quantity` is absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawShipmentItem {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    quantity: Option<i64>,
    qty: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    weight: f64,
}

impl From<RawShipmentItem> for ShipmentItemPayload {
    fn from(raw: RawShipmentItem) -> Self {
        Self {
            name: raw.name,
            quantity: raw.quantity.or(raw.qty).unwrap_or_default(),
            weight: raw.weight,
        }
    }
}

/// `shipment.created`: a new shipment order with nested parties and items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentCreated {
    #[serde(deserialize_with = "null_as_default")]
    pub logistic_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tracking_number: TrackingNumber,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub origin: String,
    #[serde(deserialize_with = "null_as_default")]
    pub destination: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sender: ShipmentParty,
    #[serde(deserialize_with = "null_as_default")]
    pub recipient: ShipmentParty,
    /// `null` elements read as zero-valued items.
    #[serde(deserialize_with = "null_elements_as_default")]
    pub items: Vec<ShipmentItemPayload>,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
    /// External identifier of the user who created the shipment.
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: String,
}

/// `shipment.updated`: new values for a shipment's mutable fields.
///
/// Contacts arrive already flattened. `updated_at` is accepted as an
/// RFC 3339 string or as Unix seconds; any other value reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentUpdated {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tracking_number: TrackingNumber,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub origin: String,
    #[serde(deserialize_with = "null_as_default")]
    pub destination: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sender_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sender_phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sender_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub recipient_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub recipient_phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub recipient_address: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}
