//! Integration tests for the expiration sweep: closing expired requests,
//! compacting surviving queues, and idempotence.

mod common;

use carrel_core::RequestStatus;
use carrel_core::config::SweepConfig;
use carrel_server::run_expiration_sweep;
use common::store::TestStore;
use common::{assert_close, hours_ago, hours_from_now, open_request, request_with_status};
use time::OffsetDateTime;
use uuid::Uuid;

#[tokio::test]
async fn test_sweep_closes_expired_unfilled_and_compacts() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let mut expired = open_request(item_id, Some(1));
    expired.request_expiration_date = Some(hours_ago(24));
    let fresh = open_request(item_id, Some(2));
    store.upsert_request(&expired).await.expect("Create failed");
    store.upsert_request(&fresh).await.expect("Create failed");

    let stats = run_expiration_sweep(
        store.as_ref(),
        &SweepConfig::default(),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("Sweep failed");
    assert_eq!(stats.closed_unfilled, 1);
    assert_eq!(stats.closed_pickup_expired, 0);
    assert_eq!(stats.queues_compacted, 1);

    let closed = store.get_request(expired.id).await.unwrap().unwrap();
    assert_eq!(closed.status, "Closed - Unfilled");
    assert_eq!(closed.position, None);
    // Unfilled closure is not an awaiting-pickup transition.
    assert!(closed.awaiting_pickup_request_closed_date.is_none());

    // The survivor keeps its status and moves to the head of the queue.
    let survivor = store.get_request(fresh.id).await.unwrap().unwrap();
    assert_eq!(survivor.status, "Open - Not yet filled");
    assert_eq!(survivor.position, Some(1));
}

#[tokio::test]
async fn test_sweep_closes_expired_awaiting_pickup_and_stamps_closure() {
    let test_store = TestStore::new().await;
    let store = test_store.store();

    let mut expired = request_with_status(Uuid::new_v4(), RequestStatus::OpenAwaitingPickup, Some(1));
    expired.hold_shelf_expiration_date = Some(hours_ago(24));
    store.upsert_request(&expired).await.expect("Create failed");

    let sweep_time = OffsetDateTime::now_utc();
    let stats = run_expiration_sweep(store.as_ref(), &SweepConfig::default(), sweep_time)
        .await
        .expect("Sweep failed");
    assert_eq!(stats.closed_pickup_expired, 1);

    let closed = store.get_request(expired.id).await.unwrap().unwrap();
    assert_eq!(closed.status, "Closed - Pickup expired");
    assert_eq!(closed.position, None);
    assert_close(
        closed
            .awaiting_pickup_request_closed_date
            .expect("closure date not stamped"),
        sweep_time,
    );
}

#[tokio::test]
async fn test_wrong_date_field_never_expires() {
    let test_store = TestStore::new().await;
    let store = test_store.store();

    // Awaiting pickup with only a *request* expiration in the past.
    let mut awaiting = request_with_status(Uuid::new_v4(), RequestStatus::OpenAwaitingPickup, Some(1));
    awaiting.request_expiration_date = Some(hours_ago(24));
    store.upsert_request(&awaiting).await.expect("Create failed");

    // Not yet filled with only a *hold shelf* expiration in the past.
    let mut unfilled = open_request(Uuid::new_v4(), Some(1));
    unfilled.hold_shelf_expiration_date = Some(hours_ago(24));
    store.upsert_request(&unfilled).await.expect("Create failed");

    // No relevant dates at all.
    let dateless = open_request(Uuid::new_v4(), Some(1));
    store.upsert_request(&dateless).await.expect("Create failed");

    let stats = run_expiration_sweep(
        store.as_ref(),
        &SweepConfig::default(),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("Sweep failed");
    assert_eq!(stats.closed_unfilled, 0);
    assert_eq!(stats.closed_pickup_expired, 0);

    for row in [&awaiting, &unfilled, &dateless] {
        let retrieved = store.get_request(row.id).await.unwrap().unwrap();
        assert_eq!(retrieved.status, row.status);
        assert_eq!(retrieved.position, Some(1));
    }
}

#[tokio::test]
async fn test_future_dates_do_not_expire() {
    let test_store = TestStore::new().await;
    let store = test_store.store();

    let mut row = open_request(Uuid::new_v4(), Some(1));
    row.request_expiration_date = Some(hours_from_now(24));
    store.upsert_request(&row).await.expect("Create failed");

    let stats = run_expiration_sweep(
        store.as_ref(),
        &SweepConfig::default(),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("Sweep failed");
    assert_eq!(stats.closed_unfilled, 0);

    let retrieved = store.get_request(row.id).await.unwrap().unwrap();
    assert_eq!(retrieved.status, "Open - Not yet filled");
}

#[tokio::test]
async fn test_compaction_preserves_relative_order() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let first = open_request(item_id, Some(1));
    let mut second = open_request(item_id, Some(2));
    second.request_expiration_date = Some(hours_ago(24));
    let third = open_request(item_id, Some(3));
    let fourth = open_request(item_id, Some(4));
    for row in [&first, &second, &third, &fourth] {
        store.upsert_request(row).await.expect("Create failed");
    }

    run_expiration_sweep(
        store.as_ref(),
        &SweepConfig::default(),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("Sweep failed");

    // [1,2,3,4] with 2 closed becomes [1,2,3]: 1st stays 1st, 3rd becomes
    // 2nd, 4th becomes 3rd, no gaps.
    let queue = store.get_queue(item_id).await.expect("Queue failed");
    let ids: Vec<Uuid> = queue.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![first.id, third.id, fourth.id]);
    let positions: Vec<Option<i64>> = queue.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_id = Uuid::new_v4();

    let mut expired = open_request(item_id, Some(1));
    expired.request_expiration_date = Some(hours_ago(24));
    let fresh = open_request(item_id, Some(2));
    store.upsert_request(&expired).await.expect("Create failed");
    store.upsert_request(&fresh).await.expect("Create failed");

    let config = SweepConfig::default();
    let first_pass = run_expiration_sweep(store.as_ref(), &config, OffsetDateTime::now_utc())
        .await
        .expect("First sweep failed");
    assert_eq!(first_pass.closed_unfilled, 1);

    // A second pass with no intervening writes settles nothing new.
    let second_pass = run_expiration_sweep(store.as_ref(), &config, OffsetDateTime::now_utc())
        .await
        .expect("Second sweep failed");
    assert_eq!(second_pass.processed, 0);
    assert_eq!(second_pass.closed_unfilled, 0);
    assert_eq!(second_pass.queues_compacted, 0);

    let survivor = store.get_request(fresh.id).await.unwrap().unwrap();
    assert_eq!(survivor.position, Some(1));
}

#[tokio::test]
async fn test_sweep_leaves_other_item_queues_alone() {
    let test_store = TestStore::new().await;
    let store = test_store.store();
    let item_a = Uuid::new_v4();
    let item_b = Uuid::new_v4();

    let mut expired_a = open_request(item_a, Some(1));
    expired_a.request_expiration_date = Some(hours_ago(24));
    let fresh_a = open_request(item_a, Some(2));
    // Item B has a gap at position 1 already; only a sweep closure on B
    // itself may renumber it.
    let standing_b = open_request(item_b, Some(2));
    for row in [&expired_a, &fresh_a, &standing_b] {
        store.upsert_request(row).await.expect("Create failed");
    }

    run_expiration_sweep(
        store.as_ref(),
        &SweepConfig::default(),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("Sweep failed");

    let queue_a = store.get_queue(item_a).await.expect("Queue failed");
    assert_eq!(queue_a.len(), 1);
    assert_eq!(queue_a[0].position, Some(1));

    let queue_b = store.get_queue(item_b).await.expect("Queue failed");
    assert_eq!(queue_b[0].position, Some(2));
}

#[tokio::test]
async fn test_sweep_skips_closed_requests_with_past_dates() {
    let test_store = TestStore::new().await;
    let store = test_store.store();

    let mut row = request_with_status(Uuid::new_v4(), RequestStatus::ClosedFilled, None);
    row.request_expiration_date = Some(hours_ago(24));
    row.hold_shelf_expiration_date = Some(hours_ago(24));
    store.upsert_request(&row).await.expect("Create failed");

    let stats = run_expiration_sweep(
        store.as_ref(),
        &SweepConfig::default(),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("Sweep failed");
    assert_eq!(stats.processed, 0);

    let retrieved = store.get_request(row.id).await.unwrap().unwrap();
    assert_eq!(retrieved.status, "Closed - Filled");
}
