//! Health check handler.

use crate::error::ApiResult;
use crate::handlers::common::map_store_error;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /v1/health - Check store connectivity.
/// Intentionally unauthenticated for load balancer and k8s probes.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.store.health_check().await.map_err(map_store_error)?;
    Ok(Json(HealthResponse { status: "ok" }))
}
