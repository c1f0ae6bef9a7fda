//! Cancellation reason repository.

use crate::error::StoreResult;
use crate::models::CancellationReasonRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for cancellation reason operations.
#[async_trait]
pub trait CancellationReasonRepo: Send + Sync {
    /// Create a cancellation reason. Fails with AlreadyExists when the id or
    /// the globally-unique name is taken.
    async fn create_cancellation_reason(&self, row: &CancellationReasonRow) -> StoreResult<()>;

    /// Get a cancellation reason by ID.
    async fn get_cancellation_reason(
        &self,
        id: Uuid,
    ) -> StoreResult<Option<CancellationReasonRow>>;

    /// List all cancellation reasons, ordered by name.
    async fn list_cancellation_reasons(&self) -> StoreResult<Vec<CancellationReasonRow>>;

    /// Update a cancellation reason. Returns NotFound if no row matches.
    async fn update_cancellation_reason(&self, row: &CancellationReasonRow) -> StoreResult<()>;

    /// Delete a cancellation reason.
    ///
    /// Refused with `ReasonInUse` while any request, whatever its status,
    /// still references the reason; both rows are left untouched.
    async fn delete_cancellation_reason(&self, id: Uuid) -> StoreResult<()>;
}
