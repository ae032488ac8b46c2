//! The persistence seam used by the consumer loops.
//!
//! Consumer loops are generic over [`EventStore`] so they can run against
//! `PostgreSQL` in production and against an in-memory store in tests.
//! Every operation is one atomic unit of work on the store and holds no lock
//! once it returns.

use std::future::Future;

use sqlx::PgPool;

use super::{RepositoryError, ShipmentRepository, UserRepository};
use crate::models::{
    NewUser, PersistedShipment, ShipmentAssociation, ShipmentRecord, ShipmentUpdate, UserRecord,
};

/// Writes the relational shape of decoded events.
pub trait EventStore: Send + Sync + 'static {
    /// Insert a user unconditionally.
    fn insert_user(
        &self,
        user: &NewUser,
    ) -> impl Future<Output = Result<UserRecord, RepositoryError>> + Send;

    /// Insert a shipment together with all of its items, atomically.
    fn insert_shipment(
        &self,
        association: &ShipmentAssociation,
    ) -> impl Future<Output = Result<PersistedShipment, RepositoryError>> + Send;

    /// Update an existing shipment; `RepositoryError::NotFound` if absent.
    fn update_shipment(
        &self,
        update: &ShipmentUpdate,
    ) -> impl Future<Output = Result<ShipmentRecord, RepositoryError>> + Send;
}

/// `PostgreSQL`-backed [`EventStore`] sharing one pool across all loops.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl EventStore for PgEventStore {
    async fn insert_user(&self, user: &NewUser) -> Result<UserRecord, RepositoryError> {
        UserRepository::new(&self.pool).insert(user).await
    }

    async fn insert_shipment(
        &self,
        association: &ShipmentAssociation,
    ) -> Result<PersistedShipment, RepositoryError> {
        ShipmentRepository::new(&self.pool)
            .insert_with_items(association)
            .await
    }

    async fn update_shipment(
        &self,
        update: &ShipmentUpdate,
    ) -> Result<ShipmentRecord, RepositoryError> {
        ShipmentRepository::new(&self.pool).update(update).await
    }
}
