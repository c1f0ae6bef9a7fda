//! Request CRUD handlers.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{map_store_error, parse_path_id, read_json_body, require_actor};
use crate::metrics::REQUESTS_CREATED;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, Request as HttpRequest, State};
use axum::http::StatusCode;
use carrel_core::{Request, RequestStatus, ValidationError, parse_uuid_field};
use carrel_requests::models::RequestRow;
use carrel_requests::repos::RequestFilter;
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// POST /v1/requests - Create a circulation request.
pub async fn create_request(
    State(state): State<AppState>,
    req: HttpRequest,
) -> ApiResult<(StatusCode, Json<Request>)> {
    let actor = require_actor(req.headers())?;
    let body: Request = read_json_body(req, state.config.server.max_body_size).await?;
    body.validate().map_err(ApiError::Validation)?;

    let id = match &body.id {
        Some(id) => parse_uuid_field("id", id)?,
        None => Uuid::new_v4(),
    };

    if state.store.get_request(id).await.map_err(map_store_error)?.is_some() {
        return Err(ApiError::Conflict(format!("request {id} already exists")));
    }

    let now = OffsetDateTime::now_utc();
    let row = RequestRow::from_document(&body, id, actor, now).map_err(map_store_error)?;
    state.store.upsert_request(&row).await.map_err(map_store_error)?;
    REQUESTS_CREATED.inc();
    tracing::info!(request_id = %id, item_id = %row.item_id, "Request created");

    let created = state
        .store
        .get_request(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| ApiError::Internal(format!("request {id} missing after create")))?;
    Ok((StatusCode::CREATED, Json(created.to_document().map_err(map_store_error)?)))
}

/// GET /v1/requests/{id} - Get a request by id.
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Request>> {
    let id = parse_path_id(&id)?;
    let row = state
        .store
        .get_request(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| ApiError::NotFound(format!("request {id} not found")))?;
    Ok(Json(row.to_document().map_err(map_store_error)?))
}

/// PUT /v1/requests/{id} - Create or replace a request.
pub async fn update_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: HttpRequest,
) -> ApiResult<StatusCode> {
    let id = parse_path_id(&id)?;
    let actor = require_actor(req.headers())?;
    let body: Request = read_json_body(req, state.config.server.max_body_size).await?;
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

    let now = OffsetDateTime::now_utc();
    let row = RequestRow::from_document(&body, id, actor, now).map_err(map_store_error)?;
    state.store.upsert_request(&row).await.map_err(map_store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/requests/{id} - Delete a request.
pub async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_path_id(&id)?;
    state.store.delete_request(id).await.map_err(map_store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for listing requests.
#[derive(Debug, Deserialize)]
pub struct ListRequestsParams {
    /// Filter by exact status literal.
    pub status: Option<String>,
    /// Filter by requested item.
    pub item_id: Option<String>,
    /// Maximum number of requests to return (default: 100, max: 1000).
    pub limit: Option<i64>,
    /// Number of requests to skip.
    pub offset: Option<i64>,
}

/// GET /v1/requests - List requests.
pub async fn list_requests(
    State(state): State<AppState>,
    Query(params): Query<ListRequestsParams>,
) -> ApiResult<Json<Vec<Request>>> {
    if let Some(offset) = params.offset {
        if offset < 0 {
            return Err(ApiError::Validation(ValidationError::new(
                "offset",
                offset.to_string(),
                "must not be negative",
            )));
        }
    }
    if let Some(limit) = params.limit {
        if limit < 0 {
            return Err(ApiError::Validation(ValidationError::new(
                "limit",
                limit.to_string(),
                "must not be negative",
            )));
        }
    }
    if let Some(status) = &params.status {
        if RequestStatus::parse(status).is_none() {
            return Err(ApiError::Validation(ValidationError::new(
                "status",
                status,
                "must be a known request status",
            )));
        }
    }
    let item_id = params
        .item_id
        .as_deref()
        .map(|raw| parse_uuid_field("item_id", raw))
        .transpose()?;

    let filter = RequestFilter {
        status: params.status.clone(),
        item_id,
        limit: params.limit.unwrap_or(100).min(1000) as u32,
        offset: params.offset.unwrap_or(0) as u32,
    };

    let rows = state.store.list_requests(&filter).await.map_err(map_store_error)?;
    let documents: Result<Vec<Request>, _> = rows.iter().map(|row| row.to_document()).collect();
    Ok(Json(documents.map_err(map_store_error)?))
}
