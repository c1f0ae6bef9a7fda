//! Request store error types.

use carrel_core::ValidationError;
use thiserror::Error;

/// Request store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A write would give two requests for the same item the same queue
    /// position. The message is part of the API contract; do not reword it.
    #[error("Cannot have more than one request with the same position in the queue")]
    PositionConflict,

    /// A cancellation reason is still referenced by at least one request.
    #[error("cancellation reason {0} is referenced by existing requests")]
    ReasonInUse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for request store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_conflict_message_is_stable() {
        assert_eq!(
            StoreError::PositionConflict.to_string(),
            "Cannot have more than one request with the same position in the queue"
        );
    }
}
