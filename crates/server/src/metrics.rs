//! Prometheus metrics for the Carrel server.
//!
//! Exposes counters for request writes, queue conflicts, and the expiration
//! sweep. The `/metrics` endpoint is unauthenticated for scraping; restrict
//! it at the infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static REQUESTS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "carrel_requests_created_total",
        "Total number of circulation requests created",
    )
    .expect("metric creation failed")
});

pub static POSITION_CONFLICTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "carrel_position_conflicts_total",
        "Total number of writes rejected for queue position conflicts",
    )
    .expect("metric creation failed")
});

pub static REQUESTS_EXPIRED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "carrel_requests_expired_total",
            "Total number of requests closed by the expiration sweep",
        ),
        &["reason"],
    )
    .expect("metric creation failed")
});

pub static QUEUE_COMPACTIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "carrel_queue_compactions_total",
        "Total number of item queues compacted after expirations",
    )
    .expect("metric creation failed")
});

pub static SWEEP_RUNS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "carrel_expiration_sweep_runs_total",
        "Total number of expiration sweep passes",
    )
    .expect("metric creation failed")
});

pub static SWEEP_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(HistogramOpts::new(
        "carrel_expiration_sweep_duration_seconds",
        "Expiration sweep pass duration in seconds",
    ))
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent: subsequent calls after the first are no-ops, so embedding
/// multiple routers (or running integration tests) is safe.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(REQUESTS_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(POSITION_CONFLICTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REQUESTS_EXPIRED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(QUEUE_COMPACTIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SWEEP_RUNS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SWEEP_DURATION.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // This would panic if any metric creation failed
        register_metrics();
    }
}
