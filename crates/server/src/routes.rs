//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health check (intentionally unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        // Request storage
        .route(
            "/v1/requests",
            get(handlers::list_requests).post(handlers::create_request),
        )
        // Batch reorder entry point (static segment wins over {id})
        .route(
            "/v1/requests/batch",
            axum::routing::post(handlers::batch_update_requests),
        )
        .route(
            "/v1/requests/{id}",
            get(handlers::get_request)
                .put(handlers::update_request)
                .delete(handlers::delete_request),
        )
        // Cancellation reasons
        .route(
            "/v1/cancellation-reasons",
            get(handlers::list_cancellation_reasons).post(handlers::create_cancellation_reason),
        )
        .route(
            "/v1/cancellation-reasons/{id}",
            get(handlers::get_cancellation_reason)
                .put(handlers::update_cancellation_reason)
                .delete(handlers::delete_cancellation_reason),
        )
        // Scheduler entry point
        .route(
            "/v1/scheduled/request-expiration",
            axum::routing::post(handlers::expire_requests),
        );

    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
