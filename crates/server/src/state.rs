//! Application state shared across handlers.

use carrel_core::config::AppConfig;
use carrel_requests::RequestStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RequestStore>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: AppConfig, store: Arc<dyn RequestStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
