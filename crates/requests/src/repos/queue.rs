//! Queue mutation repository: single-record upserts and transactional
//! batch application.

use crate::error::StoreResult;
use crate::models::RequestRow;
use async_trait::async_trait;

/// Repository for queue mutations.
///
/// Position uniqueness is enforced per statement, not at commit. A caller
/// that reorders several requests of one item must therefore issue two
/// batches: one clearing the positions of every touched row, then one
/// assigning the final positions. The store does not stage or reorder the
/// caller's writes to avoid transient collisions.
#[async_trait]
pub trait QueueRepo: Send + Sync {
    /// Create or update a single request, keyed by `row.id`.
    ///
    /// On update, creation metadata and the awaiting-pickup closure date are
    /// carried forward from the persisted row; the closure date is stamped
    /// with `row.updated_date` when the status change qualifies.
    ///
    /// Fails with `PositionConflict` when a *different* request of the same
    /// item already holds `row.position`; prior state is left unchanged.
    async fn upsert_request(&self, row: &RequestRow) -> StoreResult<()>;

    /// Apply an ordered list of full-record updates in one transaction.
    ///
    /// Every entry must resolve to an existing row. Each entry's position is
    /// checked against the queue state as of that statement, without
    /// excluding the entry's own row, so re-asserting a currently-held
    /// position is a conflict. Any failure rolls the whole batch back;
    /// afterwards a reader observes exactly the pre-batch state.
    async fn apply_batch(&self, rows: &[RequestRow]) -> StoreResult<()>;
}
