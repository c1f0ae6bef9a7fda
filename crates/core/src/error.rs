//! Error types for the core domain.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A field-level validation failure, detected before any write reaches the
/// store. Carries the offending parameter name, the rejected value, and a
/// human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("parameter '{parameter}' with value '{value}': {message}")]
pub struct ValidationError {
    pub parameter: String,
    pub value: String,
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error for a parameter/value pair.
    pub fn new(
        parameter: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

/// Parse a UUID-shaped field, reporting failures as a validation error
/// naming the parameter.
pub fn parse_uuid_field(parameter: &str, value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value)
        .map_err(|_| ValidationError::new(parameter, value, "must be a valid UUID"))
}

/// Parse an optional UUID-shaped field.
pub fn parse_optional_uuid_field(
    parameter: &str,
    value: Option<&str>,
) -> Result<Option<Uuid>, ValidationError> {
    value.map(|v| parse_uuid_field(parameter, v)).transpose()
}
