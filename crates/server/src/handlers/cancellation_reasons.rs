//! Cancellation reason CRUD handlers.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{map_store_error, parse_path_id, read_json_body, require_actor};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request as HttpRequest, State};
use axum::http::StatusCode;
use carrel_core::{CancellationReason, ValidationError, parse_uuid_field};
use carrel_requests::models::CancellationReasonRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// POST /v1/cancellation-reasons - Create a cancellation reason.
pub async fn create_cancellation_reason(
    State(state): State<AppState>,
    req: HttpRequest,
) -> ApiResult<(StatusCode, Json<CancellationReason>)> {
    let actor = require_actor(req.headers())?;
    let body: CancellationReason = read_json_body(req, state.config.server.max_body_size).await?;
    body.validate().map_err(ApiError::Validation)?;

    let id = match &body.id {
        Some(id) => parse_uuid_field("id", id)?,
        None => Uuid::new_v4(),
    };
    let now = OffsetDateTime::now_utc();
    let row = CancellationReasonRow::from_document(&body, id, actor, now).map_err(map_store_error)?;
    state
        .store
        .create_cancellation_reason(&row)
        .await
        .map_err(map_store_error)?;
    tracing::info!(reason_id = %id, name = %row.name, "Cancellation reason created");
    Ok((StatusCode::CREATED, Json(row.to_document())))
}

/// GET /v1/cancellation-reasons - List cancellation reasons.
pub async fn list_cancellation_reasons(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CancellationReason>>> {
    let rows = state
        .store
        .list_cancellation_reasons()
        .await
        .map_err(map_store_error)?;
    Ok(Json(rows.iter().map(|row| row.to_document()).collect()))
}

/// GET /v1/cancellation-reasons/{id} - Get a cancellation reason.
pub async fn get_cancellation_reason(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancellationReason>> {
    let id = parse_path_id(&id)?;
    let row = state
        .store
        .get_cancellation_reason(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| ApiError::NotFound(format!("cancellation reason {id} not found")))?;
    Ok(Json(row.to_document()))
}

/// PUT /v1/cancellation-reasons/{id} - Update a cancellation reason.
pub async fn update_cancellation_reason(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: HttpRequest,
) -> ApiResult<StatusCode> {
    let id = parse_path_id(&id)?;
    let actor = require_actor(req.headers())?;
    let body: CancellationReason = read_json_body(req, state.config.server.max_body_size).await?;
    body.validate().map_err(ApiError::Validation)?;

    if let Some(body_id) = &body.id {
        if parse_uuid_field("id", body_id)? != id {
            return Err(ApiError::Validation(ValidationError::new(
                "id",
                body_id,
                "does not match the id in the path",
            )));
        }
    }

    let existing = state
        .store
        .get_cancellation_reason(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| ApiError::NotFound(format!("cancellation reason {id} not found")))?;

    let row = CancellationReasonRow {
        id,
        name: body.name.clone(),
        description: body.description.clone(),
        public_description: body.public_description.clone(),
        created_date: existing.created_date,
        created_by_user_id: existing.created_by_user_id,
        updated_date: OffsetDateTime::now_utc(),
        updated_by_user_id: actor,
    };
    state
        .store
        .update_cancellation_reason(&row)
        .await
        .map_err(map_store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/cancellation-reasons/{id} - Delete a cancellation reason.
///
/// Refused while any request still references the reason, whatever that
/// request's status.
pub async fn delete_cancellation_reason(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_path_id(&id)?;
    state
        .store
        .delete_cancellation_reason(id)
        .await
        .map_err(map_store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
