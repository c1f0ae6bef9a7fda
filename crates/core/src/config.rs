//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_size: default_max_body_size(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_metrics_enabled() -> bool {
    true
}

/// Request store configuration (SQLite).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Advisory query timeout in seconds.
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            query_timeout_secs: None,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/requests.db")
}

/// Expiration sweep configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Batch size for expired-request selects.
    #[serde(default = "default_sweep_batch_size")]
    pub batch_size: u32,
    /// Maximum select iterations per pass (stops runaway passes; the sweep
    /// is re-runnable, so a capped pass simply finishes on the next run).
    #[serde(default = "default_sweep_max_iterations")]
    pub max_iterations: u64,
    /// Run the sweep on an interval from the server process (default: off;
    /// deployments normally drive the sweep from an external scheduler).
    #[serde(default)]
    pub auto_schedule_enabled: bool,
    /// Interval in seconds between automatic sweep passes.
    #[serde(default = "default_sweep_interval_secs")]
    pub auto_schedule_interval_secs: u64,
}

impl SweepConfig {
    /// Get the auto-schedule interval as a Duration.
    pub fn auto_schedule_interval(&self) -> Duration {
        Duration::from_secs(self.auto_schedule_interval_secs)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            batch_size: default_sweep_batch_size(),
            max_iterations: default_sweep_max_iterations(),
            auto_schedule_enabled: false,
            auto_schedule_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_sweep_batch_size() -> u32 {
    500
}

fn default_sweep_max_iterations() -> u64 {
    1000
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}
