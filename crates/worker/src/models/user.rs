//! User records mirrored from the identity service.

use chrono::{DateTime, Utc};
use shipline_core::UserId;
use shipline_core::payload::UserRegistered;

/// A persisted user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Store-assigned identity. Internal only.
    pub id: UserId,
    /// Identifier issued by the identity service. Unique.
    pub external_id: String,
    /// Phone number.
    pub msisdn: String,
    /// Display name.
    pub name: String,
    /// Login name.
    pub username: String,
    /// Assigned by the store on insert.
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a user; identity and timestamp come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub external_id: String,
    pub msisdn: String,
    pub name: String,
    pub username: String,
}

impl From<UserRegistered> for NewUser {
    fn from(event: UserRegistered) -> Self {
        Self {
            external_id: event.id,
            msisdn: event.msisdn,
            name: event.name,
            username: event.username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_maps_external_id() {
        let user = NewUser::from(UserRegistered {
            id: "u-1".to_string(),
            msisdn: "628123".to_string(),
            name: "Ann".to_string(),
            username: "ann".to_string(),
        });
        assert_eq!(user.external_id, "u-1");
        assert_eq!(user.msisdn, "628123");
    }
}
