//! Batch reorder entry point.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{map_store_error, read_json_body, require_actor};
use crate::state::AppState;
use axum::extract::{Request as HttpRequest, State};
use axum::http::StatusCode;
use carrel_core::{Request, ValidationError, parse_uuid_field};
use carrel_requests::models::RequestRow;
use serde::Deserialize;
use time::OffsetDateTime;

/// Batch update request body.
#[derive(Debug, Deserialize)]
pub struct BatchUpdateRequest {
    pub requests: Vec<Request>,
}

/// POST /v1/requests/batch - Apply an ordered list of full-record updates
/// as one transaction.
///
/// Entries are applied in the order given; position uniqueness is checked
/// per statement, so reorders must be issued as two batches (clear the
/// touched positions, then assign the final ones). Whole-batch success is
/// signaled as 201 with no body; any failure leaves the queue untouched.
pub async fn batch_update_requests(
    State(state): State<AppState>,
    req: HttpRequest,
) -> ApiResult<StatusCode> {
    let actor = require_actor(req.headers())?;
    let body: BatchUpdateRequest = read_json_body(req, state.config.server.max_body_size).await?;

    let now = OffsetDateTime::now_utc();
    let mut rows = Vec::with_capacity(body.requests.len());
    for (index, entry) in body.requests.iter().enumerate() {
        entry.validate().map_err(|e| {
            ApiError::Validation(ValidationError::new(
                format!("requests[{index}].{}", e.parameter),
                e.value,
                e.message,
            ))
        })?;
        let Some(id) = &entry.id else {
            return Err(ApiError::Validation(ValidationError::new(
                format!("requests[{index}].id"),
                "",
                "is required for batch updates",
            )));
        };
        let id = parse_uuid_field(&format!("requests[{index}].id"), id)?;
        rows.push(RequestRow::from_document(entry, id, actor, now).map_err(map_store_error)?);
    }

    state.store.apply_batch(&rows).await.map_err(map_store_error)?;
    tracing::info!(entries = rows.len(), "Batch request update applied");
    Ok(StatusCode::CREATED)
}
