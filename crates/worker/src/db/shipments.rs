//! Database operations for shipments and their items.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use shipline_core::{ShipmentItemId, TrackingNumber};

use super::RepositoryError;
use crate::models::{
    ContactFields, NewShipmentItem, PersistedShipment, ShipmentAssociation, ShipmentItemRecord,
    ShipmentRecord, ShipmentUpdate,
};

const SHIPMENT_COLUMNS: &str = "id, logistic_name, tracking_number, status, origin, destination, \
     notes, user_id, sender_name, sender_phone, sender_address, recipient_name, \
     recipient_phone, recipient_address, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for shipment queries.
#[derive(Debug, sqlx::FromRow)]
struct ShipmentRow {
    id: TrackingNumber,
    logistic_name: String,
    tracking_number: TrackingNumber,
    status: String,
    origin: String,
    destination: String,
    notes: String,
    user_id: String,
    sender_name: String,
    sender_phone: String,
    sender_address: String,
    recipient_name: String,
    recipient_phone: String,
    recipient_address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShipmentRow> for ShipmentRecord {
    fn from(row: ShipmentRow) -> Self {
        Self {
            id: row.id,
            logistic_name: row.logistic_name,
            tracking_number: row.tracking_number,
            status: row.status,
            origin: row.origin,
            destination: row.destination,
            notes: row.notes,
            user_id: row.user_id,
            contacts: ContactFields {
                sender_name: row.sender_name,
                sender_phone: row.sender_phone,
                sender_address: row.sender_address,
                recipient_name: row.recipient_name,
                recipient_phone: row.recipient_phone,
                recipient_address: row.recipient_address,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for shipment item queries.
#[derive(Debug, sqlx::FromRow)]
struct ShipmentItemRow {
    id: ShipmentItemId,
    shipment_id: TrackingNumber,
    name: String,
    quantity: i64,
    weight: f64,
}

impl From<ShipmentItemRow> for ShipmentItemRecord {
    fn from(row: ShipmentItemRow) -> Self {
        Self {
            id: row.id,
            shipment_id: row.shipment_id,
            name: row.name,
            quantity: row.quantity,
            weight: row.weight,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for shipment database operations.
pub struct ShipmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShipmentRepository<'a> {
    /// Create a new shipment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a shipment and all of its items in one transaction.
    ///
    /// Either the parent and every child become visible together, or
    /// nothing does. Timestamps are assigned by the store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the tracking number already exists.
    /// Returns `RepositoryError::Database` for other database errors; the
    /// transaction is rolled back when it is dropped uncommitted.
    #[instrument(skip(self, association), fields(tracking_number = %association.tracking_number(), items = association.items.len()))]
    pub async fn insert_with_items(
        &self,
        association: &ShipmentAssociation,
    ) -> Result<PersistedShipment, RepositoryError> {
        let shipment = &association.shipment;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            r"
            INSERT INTO shipments (
                id, logistic_name, tracking_number, status, origin, destination, notes, user_id,
                sender_name, sender_phone, sender_address,
                recipient_name, recipient_phone, recipient_address
            )
            VALUES ($1, $2, $1, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {SHIPMENT_COLUMNS}
            "
        ))
        .bind(&shipment.id)
        .bind(&shipment.logistic_name)
        .bind(&shipment.status)
        .bind(&shipment.origin)
        .bind(&shipment.destination)
        .bind(&shipment.notes)
        .bind(&shipment.user_id)
        .bind(&shipment.contacts.sender_name)
        .bind(&shipment.contacts.sender_phone)
        .bind(&shipment.contacts.sender_address)
        .bind(&shipment.contacts.recipient_name)
        .bind(&shipment.contacts.recipient_phone)
        .bind(&shipment.contacts.recipient_address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "tracking number"))?;

        let mut items = Vec::with_capacity(association.items.len());
        for item in &association.items {
            items.push(insert_item(&mut tx, item).await?);
        }

        tx.commit().await?;

        Ok(PersistedShipment {
            shipment: row.into(),
            items,
        })
    }

    /// Overwrite the mutable fields of an existing shipment.
    ///
    /// The row is located by tracking number, which is never rewritten;
    /// neither is `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no shipment has that tracking number.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, update), fields(tracking_number = %update.tracking_number))]
    pub async fn update(&self, update: &ShipmentUpdate) -> Result<ShipmentRecord, RepositoryError> {
        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            r"
            UPDATE shipments
            SET status = $2,
                notes = $3,
                origin = $4,
                destination = $5,
                user_id = $6,
                sender_name = $7,
                sender_phone = $8,
                sender_address = $9,
                recipient_name = $10,
                recipient_phone = $11,
                recipient_address = $12,
                updated_at = $13
            WHERE id = $1
            RETURNING {SHIPMENT_COLUMNS}
            "
        ))
        .bind(&update.tracking_number)
        .bind(&update.status)
        .bind(&update.notes)
        .bind(&update.origin)
        .bind(&update.destination)
        .bind(&update.user_id)
        .bind(&update.contacts.sender_name)
        .bind(&update.contacts.sender_phone)
        .bind(&update.contacts.sender_address)
        .bind(&update.contacts.recipient_name)
        .bind(&update.contacts.recipient_phone)
        .bind(&update.contacts.recipient_address)
        .bind(update.updated_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Get a shipment by tracking number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<ShipmentRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1"
        ))
        .bind(tracking_number)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List the items of a shipment in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Vec<ShipmentItemRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShipmentItemRow>(
            r"
            SELECT id, shipment_id, name, quantity, weight
            FROM shipment_items
            WHERE shipment_id = $1
            ORDER BY id
            ",
        )
        .bind(tracking_number)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    item: &NewShipmentItem,
) -> Result<ShipmentItemRecord, RepositoryError> {
    let row = sqlx::query_as::<_, ShipmentItemRow>(
        r"
        INSERT INTO shipment_items (shipment_id, name, quantity, weight)
        VALUES ($1, $2, $3, $4)
        RETURNING id, shipment_id, name, quantity, weight
        ",
    )
    .bind(&item.shipment_id)
    .bind(&item.name)
    .bind(item.quantity)
    .bind(item.weight)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.into())
}
