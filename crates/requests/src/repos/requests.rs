//! Request record repository.

use crate::error::StoreResult;
use crate::models::RequestRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Filter for request listings. Only exact-match filters the queue engine
/// itself needs; richer search lives in an external collaborator.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Filter by exact status literal.
    pub status: Option<String>,
    /// Filter by requested item.
    pub item_id: Option<Uuid>,
    /// Maximum rows to return.
    pub limit: u32,
    /// Rows to skip.
    pub offset: u32,
}

/// Repository for request record operations.
#[async_trait]
pub trait RequestRepo: Send + Sync {
    /// Get a request by ID.
    async fn get_request(&self, id: Uuid) -> StoreResult<Option<RequestRow>>;

    /// List requests matching a filter, ordered by request date then id.
    async fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<RequestRow>>;

    /// Delete a request. Returns NotFound if no row matches.
    ///
    /// Deletion does not renumber the item's queue; compaction runs only
    /// from the expiration sweep.
    async fn delete_request(&self, id: Uuid) -> StoreResult<()>;

    /// Queue positions for an item, ordered ascending. Rows without a
    /// position are not part of the queue and are excluded.
    async fn get_queue(&self, item_id: Uuid) -> StoreResult<Vec<RequestRow>>;
}
