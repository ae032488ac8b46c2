//! Integration tests for the `PostgreSQL` event store.
//!
//! These need a database:
//! ```bash
//! DATABASE_URL=postgres://localhost/shipline_test \
//!     cargo test -p shipline-integration-tests --test postgres_store -- --include-ignored
//! ```
//! Each test uses fresh identifiers, so they can share one database.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use secrecy::SecretString;
use shipline_core::{EventKind, TrackingNumber};
use shipline_worker::consumer::{Outcome, handle_message};
use shipline_worker::db::{
    self, EventStore, PgEventStore, RepositoryError, ShipmentRepository, UserRepository,
};
use shipline_worker::models::{
    ContactFields, NewShipment, NewShipmentItem, NewUser, ShipmentAssociation, ShipmentUpdate,
};
use uuid::Uuid;

async fn connect() -> PgEventStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url), 2).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    PgEventStore::new(pool)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn association(tracking: &str, item_count: usize) -> ShipmentAssociation {
    let id = TrackingNumber::new(tracking);
    ShipmentAssociation {
        shipment: NewShipment {
            id: id.clone(),
            logistic_name: "JNE".to_string(),
            status: "pending".to_string(),
            origin: "Jakarta".to_string(),
            destination: "Bandung".to_string(),
            notes: String::new(),
            user_id: "u-1".to_string(),
            contacts: ContactFields {
                sender_name: "Ann".to_string(),
                recipient_name: "Bob".to_string(),
                ..ContactFields::default()
            },
        },
        items: (0..item_count)
            .map(|i| NewShipmentItem {
                shipment_id: id.clone(),
                name: format!("item-{i}"),
                quantity: i64::try_from(i + 1).unwrap(),
                weight: 0.5,
            })
            .collect(),
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_insert_user_assigns_identity() {
    let store = connect().await;
    let external_id = unique("u");

    let record = store
        .insert_user(&NewUser {
            external_id: external_id.clone(),
            msisdn: "628123".to_string(),
            name: "Ann".to_string(),
            username: "ann".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(record.external_id, external_id);
    assert!(record.id.as_i32() > 0);

    let stored = UserRepository::new(store.pool())
        .get_by_external_id(&external_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);

    let duplicate = store
        .insert_user(&NewUser {
            external_id,
            msisdn: String::new(),
            name: String::new(),
            username: String::new(),
        })
        .await;
    assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_insert_shipment_with_items() {
    let store = connect().await;
    let tracking = unique("TRK");

    let persisted = store
        .insert_shipment(&association(&tracking, 3))
        .await
        .unwrap();

    assert_eq!(persisted.shipment.id.as_str(), tracking);
    assert_eq!(persisted.shipment.tracking_number.as_str(), tracking);
    assert_eq!(persisted.items.len(), 3);

    let repo = ShipmentRepository::new(store.pool());
    let items = repo.list_items(&TrackingNumber::new(&tracking)).await.unwrap();
    let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["item-0", "item-1", "item-2"]);
    assert!(items.iter().all(|i| i.shipment_id.as_str() == tracking));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_duplicate_shipment_adds_no_items() {
    let store = connect().await;
    let tracking = unique("TRK");
    store
        .insert_shipment(&association(&tracking, 2))
        .await
        .unwrap();

    let result = store.insert_shipment(&association(&tracking, 5)).await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    let items = ShipmentRepository::new(store.pool())
        .list_items(&TrackingNumber::new(&tracking))
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_failed_item_rolls_back_whole_shipment() {
    let store = connect().await;
    let tracking = unique("TRK");
    // TEXT columns reject NUL, so the second item fails after the parent row
    // and the first item have been written inside the transaction.
    let body = format!(
        r#"{{"tracking_number":"{tracking}","status":"pending","items":[
            {{"name":"book","quantity":1,"weight":0.5}},
            {{"name":"bad\u0000name","quantity":1,"weight":0.5}}
        ]}}"#
    );

    let outcome = handle_message(EventKind::ShipmentCreated, body.as_bytes(), &store).await;

    assert_eq!(outcome, Outcome::StoreFailed);
    let repo = ShipmentRepository::new(store.pool());
    let id = TrackingNumber::new(&tracking);
    assert!(repo.get(&id).await.unwrap().is_none());
    assert!(repo.list_items(&id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_update_shipment() {
    let store = connect().await;
    let tracking = unique("TRK");
    let created = store
        .insert_shipment(&association(&tracking, 1))
        .await
        .unwrap();

    let updated = store
        .update_shipment(&ShipmentUpdate {
            tracking_number: TrackingNumber::new(&tracking),
            status: "delivered".to_string(),
            notes: "signed".to_string(),
            origin: "Jakarta".to_string(),
            destination: "Bogor".to_string(),
            user_id: "u-1".to_string(),
            contacts: ContactFields::default(),
            updated_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    assert_eq!(updated.status, "delivered");
    assert_eq!(updated.destination, "Bogor");
    assert_eq!(updated.logistic_name, "JNE");
    assert_eq!(updated.created_at, created.shipment.created_at);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_update_unknown_shipment_is_not_found() {
    let store = connect().await;
    let tracking = unique("MISSING");

    let outcome = handle_message(
        EventKind::ShipmentUpdated,
        format!(r#"{{"tracking_number":"{tracking}","status":"lost"}}"#).as_bytes(),
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::NotFound);
    let row = ShipmentRepository::new(store.pool())
        .get(&TrackingNumber::new(&tracking))
        .await
        .unwrap();
    assert!(row.is_none());
}
