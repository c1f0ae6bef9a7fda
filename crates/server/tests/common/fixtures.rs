//! Test fixtures for generating request and reason records.

use carrel_core::RequestStatus;
use carrel_requests::models::{CancellationReasonRow, RequestRow};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// A timestamp `hours` in the past.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn hours_ago(hours: i64) -> OffsetDateTime {
    OffsetDateTime::now_utc() - Duration::hours(hours)
}

/// A timestamp `hours` in the future.
#[allow(dead_code)]
pub fn hours_from_now(hours: i64) -> OffsetDateTime {
    OffsetDateTime::now_utc() + Duration::hours(hours)
}

/// Build a request row for an item with a given status and queue position.
#[allow(dead_code)]
pub fn request_with_status(
    item_id: Uuid,
    status: RequestStatus,
    position: Option<i64>,
) -> RequestRow {
    let now = OffsetDateTime::now_utc();
    let actor = Uuid::new_v4();
    RequestRow {
        id: Uuid::new_v4(),
        item_id,
        requester_id: Some(Uuid::new_v4()),
        proxy_user_id: None,
        request_type: "Hold".to_string(),
        fulfilment_preference: "Hold Shelf".to_string(),
        delivery_address_type_id: None,
        status: status.as_str().to_string(),
        position,
        request_date: Some(now),
        request_expiration_date: None,
        hold_shelf_expiration_date: None,
        awaiting_pickup_request_closed_date: None,
        cancellation_reason_id: None,
        cancelled_by_user_id: None,
        cancellation_additional_information: None,
        cancelled_date: None,
        item_snapshot: None,
        requester_snapshot: None,
        proxy_snapshot: None,
        instance_snapshot: None,
        search_index: None,
        created_date: now,
        created_by_user_id: actor,
        updated_date: now,
        updated_by_user_id: actor,
    }
}

/// Build an open not-yet-filled request row.
#[allow(dead_code)]
pub fn open_request(item_id: Uuid, position: Option<i64>) -> RequestRow {
    request_with_status(item_id, RequestStatus::OpenNotYetFilled, position)
}

/// Build a cancellation reason row.
#[allow(dead_code)]
pub fn reason(name: &str) -> CancellationReasonRow {
    let now = OffsetDateTime::now_utc();
    let actor = Uuid::new_v4();
    CancellationReasonRow {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("{name} (test reason)"),
        public_description: None,
        created_date: now,
        created_by_user_id: actor,
        updated_date: now,
        updated_by_user_id: actor,
    }
}

/// Assert that two timestamps are within a second of each other. SQLite
/// round-trips timestamps as text, so exact nanosecond equality is not part
/// of the contract under test.
#[allow(dead_code)]
pub fn assert_close(actual: OffsetDateTime, expected: OffsetDateTime) {
    let delta = (actual - expected).abs();
    assert!(
        delta < Duration::seconds(1),
        "timestamps differ by {delta}: {actual} vs {expected}"
    );
}
