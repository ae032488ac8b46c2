//! Database operations for users.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use shipline_core::UserId;

use super::RepositoryError;
use crate::models::{NewUser, UserRecord};

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    external_id: String,
    msisdn: String,
    name: String,
    username: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            msisdn: row.msisdn,
            name: row.name,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user. `created_at` is assigned by the store.
    ///
    /// No lookup by external id happens first; a duplicate is caught by the
    /// unique index.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the external id already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub async fn insert(&self, user: &NewUser) -> Result<UserRecord, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (external_id, msisdn, name, username)
            VALUES ($1, $2, $3, $4)
            RETURNING id, external_id, msisdn, name, username, created_at
            ",
        )
        .bind(&user.external_id)
        .bind(&user.msisdn)
        .bind(&user.name)
        .bind(&user.username)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "user external id"))?;

        Ok(row.into())
    }

    /// Get a user by the identity service's identifier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, external_id, msisdn, name, username, created_at
            FROM users
            WHERE external_id = $1
            ",
        )
        .bind(external_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
