//! Cancellation reason reference entity.

use crate::error::{ValidationError, parse_uuid_field};
use crate::request::RecordMetadata;
use serde::{Deserialize, Serialize};

/// A cancellation reason document as exchanged over the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationReason {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Globally unique display name.
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

impl CancellationReason {
    /// Validate field-level constraints before any write.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(id) = &self.id {
            parse_uuid_field("id", id)?;
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", &self.name, "must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::new(
                "description",
                &self.description,
                "must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_name() {
        let reason = CancellationReason {
            id: None,
            name: "  ".to_string(),
            description: "Item could not be found".to_string(),
            public_description: None,
            metadata: None,
        };
        assert_eq!(reason.validate().unwrap_err().parameter, "name");
    }

    #[test]
    fn test_validate_rejects_malformed_id() {
        let reason = CancellationReason {
            id: Some("nope".to_string()),
            name: "Item Not Available".to_string(),
            description: "Item is no longer available".to_string(),
            public_description: None,
            metadata: None,
        };
        assert_eq!(reason.validate().unwrap_err().parameter, "id");
    }
}
