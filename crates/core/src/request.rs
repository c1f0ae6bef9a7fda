//! Circulation request types and queue lifecycle.

use crate::error::{ValidationError, parse_uuid_field};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Request status. The store validates set membership only; whether a
/// particular transition makes sense is circulation business logic and lives
/// outside the storage layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "Open - Not yet filled")]
    OpenNotYetFilled,
    #[serde(rename = "Open - Awaiting pickup")]
    OpenAwaitingPickup,
    #[serde(rename = "Open - In transit")]
    OpenInTransit,
    #[serde(rename = "Closed - Filled")]
    ClosedFilled,
    #[serde(rename = "Closed - Unfilled")]
    ClosedUnfilled,
    #[serde(rename = "Closed - Pickup expired")]
    ClosedPickupExpired,
    #[serde(rename = "Closed - Cancelled")]
    ClosedCancelled,
}

impl RequestStatus {
    /// All members of the closed set, in display order.
    pub const ALL: [RequestStatus; 7] = [
        Self::OpenNotYetFilled,
        Self::OpenAwaitingPickup,
        Self::OpenInTransit,
        Self::ClosedFilled,
        Self::ClosedUnfilled,
        Self::ClosedPickupExpired,
        Self::ClosedCancelled,
    ];

    /// Get the string representation (the stored/wire literal).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenNotYetFilled => "Open - Not yet filled",
            Self::OpenAwaitingPickup => "Open - Awaiting pickup",
            Self::OpenInTransit => "Open - In transit",
            Self::ClosedFilled => "Closed - Filled",
            Self::ClosedUnfilled => "Closed - Unfilled",
            Self::ClosedPickupExpired => "Closed - Pickup expired",
            Self::ClosedCancelled => "Closed - Cancelled",
        }
    }

    /// Parse from the stored/wire literal. Returns None for values outside
    /// the closed set.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }

    /// Check if this is an open status.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::OpenNotYetFilled | Self::OpenAwaitingPickup | Self::OpenInTransit
        )
    }

    /// Check if this is a closed status.
    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a status change must stamp `awaitingPickupRequestClosedDate`
/// with the write time. Evaluated from the (before, after) pair of a single
/// write; every other pair leaves the stored value untouched.
pub fn stamps_awaiting_pickup_closed_date(before: RequestStatus, after: RequestStatus) -> bool {
    before == RequestStatus::OpenAwaitingPickup
        && matches!(
            after,
            RequestStatus::ClosedPickupExpired | RequestStatus::ClosedCancelled
        )
}

/// Request type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    Hold,
    Recall,
    Page,
}

impl RequestType {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "Hold",
            Self::Recall => "Recall",
            Self::Page => "Page",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Hold" => Some(Self::Hold),
            "Recall" => Some(Self::Recall),
            "Page" => Some(Self::Page),
            _ => None,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a filled request is handed to the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FulfilmentPreference {
    #[serde(rename = "Hold Shelf")]
    HoldShelf,
    Delivery,
}

impl FulfilmentPreference {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HoldShelf => "Hold Shelf",
            Self::Delivery => "Delivery",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Hold Shelf" => Some(Self::HoldShelf),
            "Delivery" => Some(Self::Delivery),
            _ => None,
        }
    }
}

impl fmt::Display for FulfilmentPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record metadata stamped by the store: creation fields are set once,
/// update fields refreshed on every write.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
    pub created_by_user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_date: OffsetDateTime,
    pub updated_by_user_id: Uuid,
}

fn default_status() -> String {
    RequestStatus::OpenNotYetFilled.as_str().to_string()
}

fn default_fulfilment_preference() -> String {
    FulfilmentPreference::HoldShelf.as_str().to_string()
}

/// A circulation request document as exchanged over the wire.
///
/// Identifier fields arrive as strings so that malformed values can be
/// rejected with a parameter-level validation error instead of a parse
/// failure; `validate()` checks them before anything reaches the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_user_id: Option<String>,
    pub request_type: String,
    #[serde(default = "default_fulfilment_preference")]
    pub fulfilment_preference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address_type_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_date: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_expiration_date: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub hold_shelf_expiration_date: Option<OffsetDateTime>,
    /// System-owned. Accepted on input for round-trip convenience but never
    /// written through; the store stamps it on qualifying transitions.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub awaiting_pickup_request_closed_date: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_additional_information: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cancelled_date: Option<OffsetDateTime>,
    /// Denormalized snapshot of the requested item, refreshed by an external
    /// feed. Opaque to the queue engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_index: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

impl Request {
    /// Validate field-level constraints: identifier shapes, closed-set
    /// memberships, and position positivity. Runs before any write.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(id) = &self.id {
            parse_uuid_field("id", id)?;
        }
        parse_uuid_field("itemId", &self.item_id)?;
        if let Some(requester_id) = &self.requester_id {
            parse_uuid_field("requesterId", requester_id)?;
        }
        if let Some(proxy_user_id) = &self.proxy_user_id {
            parse_uuid_field("proxyUserId", proxy_user_id)?;
        }
        if let Some(delivery_address_type_id) = &self.delivery_address_type_id {
            parse_uuid_field("deliveryAddressTypeId", delivery_address_type_id)?;
        }
        if let Some(cancellation_reason_id) = &self.cancellation_reason_id {
            parse_uuid_field("cancellationReasonId", cancellation_reason_id)?;
        }
        if let Some(cancelled_by_user_id) = &self.cancelled_by_user_id {
            parse_uuid_field("cancelledByUserId", cancelled_by_user_id)?;
        }

        if RequestType::parse(&self.request_type).is_none() {
            return Err(ValidationError::new(
                "requestType",
                &self.request_type,
                "must be one of: Hold, Recall, Page",
            ));
        }
        if FulfilmentPreference::parse(&self.fulfilment_preference).is_none() {
            return Err(ValidationError::new(
                "fulfilmentPreference",
                &self.fulfilment_preference,
                "must be one of: Hold Shelf, Delivery",
            ));
        }
        if RequestStatus::parse(&self.status).is_none() {
            return Err(ValidationError::new(
                "status",
                &self.status,
                "must be a known request status",
            ));
        }

        if let Some(position) = self.position {
            if position < 1 {
                return Err(ValidationError::new(
                    "position",
                    position.to_string(),
                    "must be a positive integer",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> Request {
        Request {
            id: None,
            item_id: Uuid::new_v4().to_string(),
            requester_id: Some(Uuid::new_v4().to_string()),
            proxy_user_id: None,
            request_type: "Hold".to_string(),
            fulfilment_preference: "Hold Shelf".to_string(),
            delivery_address_type_id: None,
            status: "Open - Not yet filled".to_string(),
            position: Some(1),
            request_date: Some(OffsetDateTime::now_utc()),
            request_expiration_date: None,
            hold_shelf_expiration_date: None,
            awaiting_pickup_request_closed_date: None,
            cancellation_reason_id: None,
            cancelled_by_user_id: None,
            cancellation_additional_information: None,
            cancelled_date: None,
            item: None,
            requester: None,
            proxy: None,
            instance: None,
            search_index: None,
            metadata: None,
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in RequestStatus::ALL {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_status_rejects_unknown() {
        assert_eq!(RequestStatus::parse("Open"), None);
        assert_eq!(RequestStatus::parse("closed - filled"), None);
        assert_eq!(RequestStatus::parse(""), None);
    }

    #[test]
    fn test_open_closed_partition() {
        let open = RequestStatus::ALL.iter().filter(|s| s.is_open()).count();
        let closed = RequestStatus::ALL.iter().filter(|s| s.is_closed()).count();
        assert_eq!(open, 3);
        assert_eq!(closed, 4);
    }

    #[test]
    fn test_closed_date_stamped_only_from_awaiting_pickup() {
        use RequestStatus::*;
        for before in RequestStatus::ALL {
            for after in RequestStatus::ALL {
                let expected = before == OpenAwaitingPickup
                    && (after == ClosedPickupExpired || after == ClosedCancelled);
                assert_eq!(
                    stamps_awaiting_pickup_closed_date(before, after),
                    expected,
                    "transition {before} -> {after}"
                );
            }
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        sample_request().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_malformed_requester_id() {
        let mut request = sample_request();
        request.requester_id = Some("12345".to_string());
        let err = request.validate().unwrap_err();
        assert_eq!(err.parameter, "requesterId");
    }

    #[test]
    fn test_validate_rejects_unknown_status() {
        let mut request = sample_request();
        request.status = "Open - Waiting".to_string();
        let err = request.validate().unwrap_err();
        assert_eq!(err.parameter, "status");
    }

    #[test]
    fn test_validate_rejects_non_positive_position() {
        let mut request = sample_request();
        request.position = Some(0);
        assert_eq!(request.validate().unwrap_err().parameter, "position");
        request.position = Some(-3);
        assert_eq!(request.validate().unwrap_err().parameter, "position");
    }

    #[test]
    fn test_request_json_uses_camel_case() {
        let request = sample_request();
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("itemId").is_some());
        assert!(json.get("requestType").is_some());
        assert!(json.get("item_id").is_none());
    }
}
