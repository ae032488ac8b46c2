//! Payload decoders, one per event kind.
//!
//! Decoding is deliberately permissive (see [`shipline_core::payload`]):
//! only bodies that are not a JSON object, or whose present fields have the
//! wrong type, are rejected. A rejected message is logged and dropped by the
//! consumer loop; it is never retried.

use serde::de::DeserializeOwned;
use shipline_core::EventKind;
use shipline_core::payload::{ShipmentCreated, ShipmentUpdated, UserRegistered};
use thiserror::Error;

/// Why a payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body was empty or whitespace.
    #[error("empty payload")]
    Empty,

    /// The body is JSON-ish but not an object (array, scalar, `null`).
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// The body is not valid JSON, or a field has the wrong type.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded event, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    UserRegistered(UserRegistered),
    ShipmentCreated(ShipmentCreated),
    ShipmentUpdated(ShipmentUpdated),
}

impl DecodedEvent {
    /// Event kind this record was decoded as.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::UserRegistered(_) => EventKind::UserRegistered,
            Self::ShipmentCreated(_) => EventKind::ShipmentCreated,
            Self::ShipmentUpdated(_) => EventKind::ShipmentUpdated,
        }
    }
}

/// Decode `body` with the decoder registered for `kind`.
///
/// # Errors
///
/// Returns `DecodeError` if the body is not a JSON object of the expected shape.
pub fn decode(kind: EventKind, body: &[u8]) -> Result<DecodedEvent, DecodeError> {
    match kind {
        EventKind::UserRegistered => decode_user_registered(body).map(DecodedEvent::UserRegistered),
        EventKind::ShipmentCreated => {
            decode_shipment_created(body).map(DecodedEvent::ShipmentCreated)
        }
        EventKind::ShipmentUpdated => {
            decode_shipment_updated(body).map(DecodedEvent::ShipmentUpdated)
        }
    }
}

/// Decode a `user.registered` body.
///
/// # Errors
///
/// Returns `DecodeError` if the body is not a JSON object of the expected shape.
pub fn decode_user_registered(body: &[u8]) -> Result<UserRegistered, DecodeError> {
    decode_object(body)
}

/// Decode a `shipment.created` body.
///
/// # Errors
///
/// Returns `DecodeError` if the body is not a JSON object of the expected shape.
pub fn decode_shipment_created(body: &[u8]) -> Result<ShipmentCreated, DecodeError> {
    decode_object(body)
}

/// Decode a `shipment.updated` body.
///
/// # Errors
///
/// Returns `DecodeError` if the body is not a JSON object of the expected shape.
pub fn decode_shipment_updated(body: &[u8]) -> Result<ShipmentUpdated, DecodeError> {
    decode_object(body)
}

// serde would happily build a struct from a JSON array, positionally.
// Producers only ever send objects, so anything else is rejected up front.
fn decode_object<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        None => Err(DecodeError::Empty),
        Some(b'{') => Ok(serde_json::from_slice(body)?),
        Some(b'[' | b'"' | b'n' | b't' | b'f' | b'-' | b'0'..=b'9') => {
            Err(DecodeError::NotAnObject)
        }
        Some(_) => Ok(serde_json::from_slice(body)?),
    }
}
