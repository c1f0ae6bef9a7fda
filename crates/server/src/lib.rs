//! HTTP API server for Carrel request queue storage.
//!
//! This crate provides the HTTP control plane:
//! - Request CRUD and filtered listings
//! - The transactional batch reorder entry point
//! - Cancellation reason CRUD with the referential delete guard
//! - The scheduler-facing expiration sweep
//! - Health check and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use handlers::expiration::{SweepStats, run_expiration_sweep};
pub use routes::create_router;
pub use state::AppState;
