//! Shipment tracking number.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied tracking number identifying a shipment.
///
/// The tracking number doubles as the primary key of the `shipments` table;
/// there is no separate store-assigned shipment id.
///
/// No format is enforced. Upstream producers are untrusted and payloads are
/// decoded permissively, so an empty tracking number is representable and
/// left for the store's key constraints to reject or accept.
///
/// ```
/// use shipline_core::TrackingNumber;
///
/// let trk = TrackingNumber::new("TRK1");
/// assert_eq!(trk.as_str(), "TRK1");
/// assert!(!trk.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    /// Wrap a tracking number.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the tracking number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the upstream producer left the tracking number blank.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TrackingNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TrackingNumber {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for TrackingNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for TrackingNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for TrackingNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for TrackingNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_representable() {
        let trk = TrackingNumber::default();
        assert!(trk.is_empty());
        assert_eq!(trk.to_string(), "");
    }

    #[test]
    fn test_deserialize_transparent() {
        let trk: TrackingNumber = serde_json::from_str("\"TRK-9\"").unwrap_or_default();
        assert_eq!(trk, TrackingNumber::new("TRK-9"));
    }
}
