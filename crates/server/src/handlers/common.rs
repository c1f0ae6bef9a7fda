//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use crate::metrics::POSITION_CONFLICTS;
use axum::extract::Request as HttpRequest;
use axum::http::HeaderMap;
use carrel_core::{ValidationError, parse_uuid_field};
use carrel_requests::StoreError;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Header carrying the acting user id; every write must be attributable.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the acting user for a write. A missing or malformed header is a
/// validation error, not an internal fault.
pub fn require_actor(headers: &HeaderMap) -> ApiResult<Uuid> {
    let value = headers.get(USER_ID_HEADER).ok_or_else(|| {
        ApiError::Validation(ValidationError::new(
            USER_ID_HEADER,
            "",
            "acting user header is required for writes",
        ))
    })?;
    let value = value.to_str().map_err(|_| {
        ApiError::Validation(ValidationError::new(
            USER_ID_HEADER,
            "<non-ascii>",
            "must be a valid UUID",
        ))
    })?;
    Ok(parse_uuid_field(USER_ID_HEADER, value)?)
}

/// Read and deserialize a JSON request body with a size cap.
pub async fn read_json_body<T: DeserializeOwned>(
    req: HttpRequest,
    max_body_size: usize,
) -> ApiResult<T> {
    let bytes = axum::body::to_bytes(req.into_body(), max_body_size)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

/// Parse a path id parameter.
pub fn parse_path_id(id: &str) -> ApiResult<Uuid> {
    Ok(parse_uuid_field("id", id)?)
}

/// Convert a store error into an API error, counting queue conflicts.
pub fn map_store_error(err: StoreError) -> ApiError {
    if matches!(err, StoreError::PositionConflict) {
        POSITION_CONFLICTS.inc();
    }
    ApiError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_require_actor_accepts_uuid_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(require_actor(&headers).unwrap(), id);
    }

    #[test]
    fn test_missing_actor_is_a_validation_error() {
        let err = require_actor(&HeaderMap::new()).unwrap_err();
        match err {
            ApiError::Validation(e) => {
                assert_eq!(e.parameter, USER_ID_HEADER);
                assert!(e.message.contains("required"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_actor_is_a_validation_error() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        let err = require_actor(&headers).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
