//! Request store bootstrap for integration tests.

use carrel_requests::{RequestStore, SqliteStore};
use std::sync::Arc;

/// A request store backed by a SQLite file in a temp dir that lives as long
/// as the test.
pub struct TestStore {
    store: Arc<dyn RequestStore>,
    _temp_dir: tempfile::TempDir,
}

impl TestStore {
    /// Create a fresh, migrated store.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("requests.db"), None)
            .await
            .expect("Failed to create store");
        Self {
            store: Arc::new(store),
            _temp_dir: temp_dir,
        }
    }

    /// Get the store handle.
    pub fn store(&self) -> Arc<dyn RequestStore> {
        self.store.clone()
    }
}
