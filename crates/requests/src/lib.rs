//! Request store abstraction and implementations for Carrel.
//!
//! This crate provides the circulation storage data plane:
//! - Request records with per-item, position-ordered queues
//! - Statement-time queue position uniqueness
//! - Transactional batch position changes (all-or-nothing)
//! - Expiration sweep primitives and queue compaction
//! - Cancellation reasons and their referential delete guard

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{RequestStore, SqliteStore};

use carrel_core::config::StoreConfig;
use std::sync::Arc;

/// Create a request store from configuration.
pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn RequestStore>> {
    tracing::info!(path = %config.path.display(), "Opening request store");
    let store = SqliteStore::new(&config.path, config.query_timeout_secs).await?;
    Ok(Arc::new(store) as Arc<dyn RequestStore>)
}
