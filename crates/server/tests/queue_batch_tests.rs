//! Integration tests for transactional batch position changes.

mod common;

use carrel_core::RequestStatus;
use carrel_requests::StoreError;
use carrel_requests::models::RequestRow;
use common::store::TestStore;
use common::{open_request, request_with_status};
use time::OffsetDateTime;
use uuid::Uuid;

fn with_position(row: &RequestRow, position: Option<i64>) -> RequestRow {
    let mut updated = row.clone();
    updated.position = position;
    updated.updated_date = OffsetDateTime::now_utc();
    updated
}

#[tokio::test]
async fn test_two_phase_position_swap() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let first = open_request(item_id, Some(1));
    let second = open_request(item_id, Some(2));
    store.upsert_request(&first).await.expect("Create failed");
    store.upsert_request(&second).await.expect("Create failed");

    // Phase 1: clear every touched position.
    store
        .apply_batch(&[with_position(&first, None), with_position(&second, None)])
        .await
        .expect("Clearing batch failed");

    // Phase 2: assign the final positions.
    store
        .apply_batch(&[with_position(&first, Some(2)), with_position(&second, Some(1))])
        .await
        .expect("Assigning batch failed");

    let queue = store.get_queue(item_id).await.expect("Queue failed");
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].id, second.id);
    assert_eq!(queue[0].position, Some(1));
    assert_eq!(queue[1].id, first.id);
    assert_eq!(queue[1].position, Some(2));
}

#[tokio::test]
async fn test_batch_rejects_reasserted_position() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let first = open_request(item_id, Some(1));
    let second = open_request(item_id, Some(2));
    store.upsert_request(&first).await.expect("Create failed");
    store.upsert_request(&second).await.expect("Create failed");

    // Writing a row's own current position is a statement-time conflict:
    // positions must be cleared first even when "unchanged".
    let err = store
        .apply_batch(&[with_position(&first, Some(1))])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::PositionConflict));

    let queue = store.get_queue(item_id).await.expect("Queue failed");
    assert_eq!(queue[0].id, first.id);
    assert_eq!(queue[0].position, Some(1));
    assert_eq!(queue[1].position, Some(2));
}

#[tokio::test]
async fn test_direct_swap_without_clearing_fails() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let first = open_request(item_id, Some(1));
    let second = open_request(item_id, Some(2));
    store.upsert_request(&first).await.expect("Create failed");
    store.upsert_request(&second).await.expect("Create failed");

    let err = store
        .apply_batch(&[with_position(&first, Some(2)), with_position(&second, Some(1))])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::PositionConflict));

    // Nothing from the batch persisted.
    let queue = store.get_queue(item_id).await.expect("Queue failed");
    assert_eq!(queue[0].id, first.id);
    assert_eq!(queue[0].position, Some(1));
    assert_eq!(queue[1].id, second.id);
    assert_eq!(queue[1].position, Some(2));
}

#[tokio::test]
async fn test_batch_rolls_back_on_unresolvable_entry() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let first = open_request(item_id, Some(1));
    store.upsert_request(&first).await.expect("Create failed");

    // First entry is a valid write; the second names a row that does not
    // exist. The whole batch must roll back.
    let ghost = open_request(item_id, Some(5));
    let err = store
        .apply_batch(&[with_position(&first, None), ghost.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    let queue = store.get_queue(item_id).await.expect("Queue failed");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, first.id);
    assert_eq!(queue[0].position, Some(1));
    assert!(store.get_request(ghost.id).await.expect("Get failed").is_none());
}

#[tokio::test]
async fn test_batch_rolls_back_on_transient_conflict() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let first = open_request(item_id, Some(1));
    let second = open_request(item_id, Some(2));
    store.upsert_request(&first).await.expect("Create failed");
    store.upsert_request(&second).await.expect("Create failed");

    // Entry one moves into a free slot and succeeds; entry two then
    // collides with it. Entry one's write must not survive.
    let err = store
        .apply_batch(&[with_position(&first, Some(3)), with_position(&second, Some(3))])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::PositionConflict));

    let queue = store.get_queue(item_id).await.expect("Queue failed");
    assert_eq!(queue[0].position, Some(1));
    assert_eq!(queue[1].position, Some(2));
}

#[tokio::test]
async fn test_batch_writes_pass_through_transition_rule() {
    let test_store = TestStore::new().await;
    let store = test_store.store();

    let row = request_with_status(Uuid::new_v4(), RequestStatus::OpenAwaitingPickup, None);
    store.upsert_request(&row).await.expect("Create failed");

    let mut cancelled = row.clone();
    cancelled.status = RequestStatus::ClosedCancelled.as_str().to_string();
    cancelled.updated_date = OffsetDateTime::now_utc();
    store
        .apply_batch(&[cancelled])
        .await
        .expect("Batch failed");

    let retrieved = store.get_request(row.id).await.unwrap().unwrap();
    assert!(retrieved.awaiting_pickup_request_closed_date.is_some());
}

#[tokio::test]
async fn test_batch_applies_entries_in_caller_order() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let first = open_request(item_id, Some(1));
    let second = open_request(item_id, Some(2));
    store.upsert_request(&first).await.expect("Create failed");
    store.upsert_request(&second).await.expect("Create failed");

    // Clearing the first row's position before assigning it to the second
    // works only because entries run in the order given.
    store
        .apply_batch(&[with_position(&first, None), with_position(&second, Some(1))])
        .await
        .expect("Ordered batch failed");

    let queue = store.get_queue(item_id).await.expect("Queue failed");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, second.id);
    assert_eq!(queue[0].position, Some(1));

    // The reverse order collides and must leave the queue as committed above.
    let err = store
        .apply_batch(&[with_position(&first, Some(1)), with_position(&second, None)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::PositionConflict));
}
