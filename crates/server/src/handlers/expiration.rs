//! Expiration sweep: closes expired requests and compacts surviving queues.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{QUEUE_COMPACTIONS, REQUESTS_EXPIRED, SWEEP_DURATION, SWEEP_RUNS};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use carrel_core::RequestStatus;
use carrel_core::config::SweepConfig;
use carrel_requests::RequestStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use time::OffsetDateTime;
use uuid::Uuid;

/// Expiration sweep statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepStats {
    /// Number of expired candidates processed.
    pub processed: u64,
    /// Not-yet-filled requests closed as unfilled.
    pub closed_unfilled: u64,
    /// Awaiting-pickup requests closed as pickup expired.
    pub closed_pickup_expired: u64,
    /// Item queues compacted after closures.
    pub queues_compacted: u64,
    /// Errors encountered (the pass continues past them).
    pub errors: u64,
}

/// POST /v1/scheduled/request-expiration - Run one expiration sweep pass.
///
/// Invoked by an external scheduler; takes no parameters beyond "now".
pub async fn expire_requests(State(state): State<AppState>) -> ApiResult<Json<SweepStats>> {
    let start = std::time::Instant::now();
    let stats = run_expiration_sweep(
        state.store.as_ref(),
        &state.config.sweep,
        OffsetDateTime::now_utc(),
    )
    .await?;
    SWEEP_DURATION.observe(start.elapsed().as_secs_f64());
    Ok(Json(stats))
}

/// One phase of the sweep: close every request in `expected_status` whose
/// relevant date is past, collecting the item ids that lost a queue entry.
async fn close_expired(
    store: &dyn RequestStore,
    config: &SweepConfig,
    now: OffsetDateTime,
    expected_status: RequestStatus,
    new_status: RequestStatus,
    touched_items: &mut HashSet<Uuid>,
    stats: &mut SweepStats,
) -> Result<u64, ApiError> {
    let mut closed = 0u64;
    let mut iterations = 0u64;
    loop {
        iterations += 1;
        if iterations > config.max_iterations {
            tracing::warn!(
                iterations,
                max_iterations = config.max_iterations,
                expected_status = %expected_status,
                "Expiration sweep exceeded max iterations, stopping; the pass is re-runnable"
            );
            break;
        }

        let expired = match expected_status {
            RequestStatus::OpenNotYetFilled => {
                store.get_expired_unfilled(now, config.batch_size).await?
            }
            _ => {
                store
                    .get_expired_awaiting_pickup(now, config.batch_size)
                    .await?
            }
        };
        if expired.is_empty() {
            break;
        }

        let mut progressed = false;
        for row in expired {
            stats.processed += 1;
            match store
                .close_expired_request(row.id, expected_status, new_status, now)
                .await
            {
                Ok(true) => {
                    closed += 1;
                    progressed = true;
                    touched_items.insert(row.item_id);
                    tracing::debug!(
                        request_id = %row.id,
                        item_id = %row.item_id,
                        status = %new_status,
                        "Closed expired request"
                    );
                }
                Ok(false) => {
                    // A concurrent writer changed the row since selection;
                    // it is rediscovered on a later pass if still expired.
                    tracing::debug!(
                        request_id = %row.id,
                        "Request no longer in expected state, skipping"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        request_id = %row.id,
                        error = %e,
                        "Failed to close expired request"
                    );
                    stats.errors += 1;
                }
            }
        }
        if !progressed {
            // Only failing or concurrently-updated rows remain in the
            // selection; leave them for the next pass.
            break;
        }
    }
    Ok(closed)
}

/// Run one full expiration sweep pass.
///
/// Closes open not-yet-filled requests past their request expiration date
/// and awaiting-pickup requests past their hold shelf expiration date (the
/// latter through the closure-date transition rule), then compacts the
/// queue of every item that lost an entry. Safe to re-run: already-settled
/// rows are simply not selected again.
pub async fn run_expiration_sweep(
    store: &dyn RequestStore,
    config: &SweepConfig,
    now: OffsetDateTime,
) -> Result<SweepStats, ApiError> {
    let mut stats = SweepStats::default();
    let mut touched_items: HashSet<Uuid> = HashSet::new();

    let closed_unfilled = close_expired(
        store,
        config,
        now,
        RequestStatus::OpenNotYetFilled,
        RequestStatus::ClosedUnfilled,
        &mut touched_items,
        &mut stats,
    )
    .await?;
    stats.closed_unfilled = closed_unfilled;
    REQUESTS_EXPIRED
        .with_label_values(&["unfilled"])
        .inc_by(closed_unfilled);

    let closed_pickup_expired = close_expired(
        store,
        config,
        now,
        RequestStatus::OpenAwaitingPickup,
        RequestStatus::ClosedPickupExpired,
        &mut touched_items,
        &mut stats,
    )
    .await?;
    stats.closed_pickup_expired = closed_pickup_expired;
    REQUESTS_EXPIRED
        .with_label_values(&["pickup_expired"])
        .inc_by(closed_pickup_expired);

    for item_id in touched_items {
        match store.compact_queue(item_id, now).await {
            Ok(moved) => {
                stats.queues_compacted += 1;
                QUEUE_COMPACTIONS.inc();
                tracing::debug!(item_id = %item_id, moved, "Compacted request queue");
            }
            Err(e) => {
                tracing::warn!(item_id = %item_id, error = %e, "Failed to compact request queue");
                stats.errors += 1;
            }
        }
    }

    SWEEP_RUNS.inc();
    tracing::info!(
        processed = stats.processed,
        closed_unfilled = stats.closed_unfilled,
        closed_pickup_expired = stats.closed_pickup_expired,
        queues_compacted = stats.queues_compacted,
        errors = stats.errors,
        "Expiration sweep finished"
    );
    Ok(stats)
}
