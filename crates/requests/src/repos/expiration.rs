//! Expiration sweep repository.

use crate::error::StoreResult;
use crate::models::RequestRow;
use async_trait::async_trait;
use carrel_core::RequestStatus;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for the expiration sweep primitives.
#[async_trait]
pub trait ExpirationRepo: Send + Sync {
    /// Get open not-yet-filled requests whose request expiration date is
    /// strictly before `now`.
    async fn get_expired_unfilled(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> StoreResult<Vec<RequestRow>>;

    /// Get awaiting-pickup requests whose hold shelf expiration date is
    /// strictly before `now`.
    async fn get_expired_awaiting_pickup(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> StoreResult<Vec<RequestRow>>;

    /// Close one expired request: set the new status and clear its position,
    /// stamping the awaiting-pickup closure date when the transition
    /// qualifies. The update is conditioned on the row still carrying
    /// `expected_status`; returns false when a concurrent writer got there
    /// first (the row is simply skipped and rediscovered on a later pass if
    /// still applicable).
    async fn close_expired_request(
        &self,
        id: Uuid,
        expected_status: RequestStatus,
        new_status: RequestStatus,
        now: OffsetDateTime,
    ) -> StoreResult<bool>;

    /// Renumber an item's surviving queue positions contiguously from 1,
    /// preserving relative order. Returns the number of rows moved.
    async fn compact_queue(&self, item_id: Uuid, now: OffsetDateTime) -> StoreResult<u64>;
}
