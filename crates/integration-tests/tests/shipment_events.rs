//! Integration tests for `shipment.created` and `shipment.updated` handling.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use shipline_core::EventKind;
use shipline_integration_tests::{InMemoryStore, fixtures};
use shipline_worker::consumer::{Outcome, handle_message};

async fn create_trk1(store: &InMemoryStore) {
    let outcome = handle_message(
        EventKind::ShipmentCreated,
        fixtures::SHIPMENT_TRK1.as_bytes(),
        store,
    )
    .await;
    assert_eq!(outcome, Outcome::Persisted);
}

// =============================================================================
// Shipment Created
// =============================================================================

#[tokio::test]
async fn test_created_writes_parent_and_items() {
    let store = InMemoryStore::new();
    create_trk1(&store).await;

    let shipment = store.shipment("TRK1").unwrap();
    assert_eq!(shipment.id.as_str(), "TRK1");
    assert_eq!(shipment.tracking_number.as_str(), "TRK1");
    assert_eq!(shipment.logistic_name, "JNE");
    assert_eq!(shipment.status, "pending");
    assert_eq!(shipment.notes, "fragile");
    assert_eq!(shipment.user_id, "u-1");
    assert_eq!(shipment.contacts.sender_name, "Ann");
    assert_eq!(shipment.contacts.sender_address, "Jl. Merdeka 1");
    assert_eq!(shipment.contacts.recipient_phone, "62822");

    let items = store.items_of("TRK1");
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.shipment_id.as_str() == "TRK1"));
    assert_eq!(items[0].name, "book");
    assert_eq!(items[0].quantity, 2);
    assert!((items[0].weight - 0.5).abs() < f64::EPSILON);
    assert_eq!(items[1].name, "mug");
}

#[tokio::test]
async fn test_created_without_items() {
    let store = InMemoryStore::new();

    let outcome = handle_message(
        EventKind::ShipmentCreated,
        br#"{"tracking_number":"TRK0","status":"pending","items":[]}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::Persisted);
    assert!(store.shipment("TRK0").is_some());
    assert!(store.items_of("TRK0").is_empty());
}

#[tokio::test]
async fn test_created_accepts_qty_alias() {
    let store = InMemoryStore::new();

    let outcome = handle_message(
        EventKind::ShipmentCreated,
        br#"{"tracking_number":"TRK5","items":[{"name":"box","qty":4,"weight":1.5}]}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::Persisted);
    assert_eq!(store.items_of("TRK5")[0].quantity, 4);
}

#[tokio::test]
async fn test_created_with_quantity_and_qty_keeps_quantity() {
    let store = InMemoryStore::new();

    let outcome = handle_message(
        EventKind::ShipmentCreated,
        br#"{"tracking_number":"TRK6","items":[{"name":"box","quantity":2,"qty":9,"weight":1.0}]}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::Persisted);
    assert_eq!(store.items_of("TRK6")[0].quantity, 2);
}

#[tokio::test]
async fn test_created_with_null_item_stores_empty_item() {
    let store = InMemoryStore::new();

    let outcome = handle_message(
        EventKind::ShipmentCreated,
        br#"{"tracking_number":"TRK7","items":[null,{"name":"mug","quantity":1}]}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::Persisted);
    let items = store.items_of("TRK7");
    assert_eq!(items.len(), 2);
    assert!(items[0].name.is_empty());
    assert_eq!(items[0].quantity, 0);
    assert_eq!(items[1].name, "mug");
}

#[tokio::test]
async fn test_malformed_created_writes_nothing() {
    let store = InMemoryStore::new();

    for body in [
        fixtures::TRUNCATED,
        r#"{"tracking_number":"TRK1","items":"book"}"#,
        r#"{"tracking_number":"TRK1","items":[{"name":"book","quantity":"two"}]}"#,
        "null",
    ] {
        let outcome = handle_message(EventKind::ShipmentCreated, body.as_bytes(), &store).await;
        assert_eq!(outcome, Outcome::DecodeFailed, "body: {body}");
    }

    assert_eq!(store.shipment_count(), 0);
    assert_eq!(store.item_count(), 0);
}

#[tokio::test]
async fn test_duplicate_tracking_number_leaves_first_intact() {
    let store = InMemoryStore::new();
    create_trk1(&store).await;

    let outcome = handle_message(
        EventKind::ShipmentCreated,
        br#"{"tracking_number":"TRK1","status":"other","items":[{"name":"extra","quantity":1}]}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::StoreFailed);
    assert_eq!(store.shipment("TRK1").unwrap().status, "pending");
    assert_eq!(store.items_of("TRK1").len(), 2);
}

// =============================================================================
// Shipment Updated
// =============================================================================

#[tokio::test]
async fn test_update_overwrites_mutable_fields() {
    let store = InMemoryStore::new();
    create_trk1(&store).await;
    let before = store.shipment("TRK1").unwrap();

    let outcome = handle_message(
        EventKind::ShipmentUpdated,
        fixtures::UPDATE_TRK1_DELIVERED.as_bytes(),
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::Persisted);
    let after = store.shipment("TRK1").unwrap();
    assert_eq!(after.status, "delivered");
    assert_eq!(after.notes, "left with neighbour");
    assert_eq!(after.contacts.recipient_name, "Bob");
    assert_eq!(after.updated_at.to_rfc3339(), "2026-03-02T10:00:00+00:00");

    assert_eq!(after.id, before.id);
    assert_eq!(after.logistic_name, before.logistic_name);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(store.items_of("TRK1").len(), 2);
}

#[tokio::test]
async fn test_update_of_unknown_shipment_is_dropped() {
    let store = InMemoryStore::new();
    create_trk1(&store).await;

    let outcome = handle_message(
        EventKind::ShipmentUpdated,
        br#"{"tracking_number":"NOPE","status":"delivered"}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(store.shipment_count(), 1);
    assert!(store.shipment("NOPE").is_none());
    assert_eq!(store.shipment("TRK1").unwrap().status, "pending");
}

#[tokio::test]
async fn test_update_falls_back_to_id() {
    let store = InMemoryStore::new();
    create_trk1(&store).await;

    let outcome = handle_message(
        EventKind::ShipmentUpdated,
        br#"{"id":"TRK1","status":"in_transit"}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::Persisted);
    assert_eq!(store.shipment("TRK1").unwrap().status, "in_transit");
}

#[tokio::test]
async fn test_update_without_timestamp_bumps_updated_at() {
    let store = InMemoryStore::new();
    create_trk1(&store).await;
    let before = store.shipment("TRK1").unwrap();

    let outcome = handle_message(
        EventKind::ShipmentUpdated,
        br#"{"tracking_number":"TRK1","status":"in_transit","updated_at":"0001-01-01T00:00:00Z"}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::Persisted);
    assert!(store.shipment("TRK1").unwrap().updated_at >= before.updated_at);
}

#[tokio::test]
async fn test_malformed_update_changes_nothing() {
    let store = InMemoryStore::new();
    create_trk1(&store).await;

    let outcome = handle_message(
        EventKind::ShipmentUpdated,
        br#"{"tracking_number":"TRK1","status":42}"#,
        &store,
    )
    .await;

    assert_eq!(outcome, Outcome::DecodeFailed);
    assert_eq!(store.shipment("TRK1").unwrap().status, "pending");
}
