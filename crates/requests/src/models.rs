//! Database models mapping to the request store schema.

use crate::error::{StoreError, StoreResult};
use carrel_core::request::RecordMetadata;
use carrel_core::{CancellationReason, Request, parse_optional_uuid_field, parse_uuid_field};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Circulation request record.
///
/// Snapshot fields hold opaque JSON documents maintained by the external
/// denormalization feed; the queue engine stores and returns them verbatim.
#[derive(Debug, Clone, FromRow)]
pub struct RequestRow {
    pub id: Uuid,
    pub item_id: Uuid,
    pub requester_id: Option<Uuid>,
    pub proxy_user_id: Option<Uuid>,
    pub request_type: String,
    pub fulfilment_preference: String,
    pub delivery_address_type_id: Option<Uuid>,
    pub status: String,
    /// Non-null values form the item's queue ordering (1 = next to fill).
    pub position: Option<i64>,
    pub request_date: Option<OffsetDateTime>,
    pub request_expiration_date: Option<OffsetDateTime>,
    pub hold_shelf_expiration_date: Option<OffsetDateTime>,
    /// System-owned; stamped when a request leaves awaiting-pickup into a
    /// pickup-expired or cancelled state.
    pub awaiting_pickup_request_closed_date: Option<OffsetDateTime>,
    pub cancellation_reason_id: Option<Uuid>,
    pub cancelled_by_user_id: Option<Uuid>,
    pub cancellation_additional_information: Option<String>,
    pub cancelled_date: Option<OffsetDateTime>,
    pub item_snapshot: Option<String>,
    pub requester_snapshot: Option<String>,
    pub proxy_snapshot: Option<String>,
    pub instance_snapshot: Option<String>,
    pub search_index: Option<String>,
    pub created_date: OffsetDateTime,
    pub created_by_user_id: Uuid,
    pub updated_date: OffsetDateTime,
    pub updated_by_user_id: Uuid,
}

fn snapshot_to_string(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

fn snapshot_from_string(
    field: &str,
    value: &Option<String>,
) -> StoreResult<Option<serde_json::Value>> {
    value
        .as_deref()
        .map(|raw| {
            serde_json::from_str(raw).map_err(|e| {
                StoreError::Internal(format!("stored {field} snapshot is not valid JSON: {e}"))
            })
        })
        .transpose()
}

impl RequestRow {
    /// Build a row from a validated wire document.
    ///
    /// `awaiting_pickup_request_closed_date` is intentionally not taken from
    /// the document: the store owns that field and carries the persisted
    /// value forward (or stamps it) on every write path.
    pub fn from_document(
        request: &Request,
        id: Uuid,
        actor: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<Self> {
        Ok(Self {
            id,
            item_id: parse_uuid_field("itemId", &request.item_id)?,
            requester_id: parse_optional_uuid_field("requesterId", request.requester_id.as_deref())?,
            proxy_user_id: parse_optional_uuid_field(
                "proxyUserId",
                request.proxy_user_id.as_deref(),
            )?,
            request_type: request.request_type.clone(),
            fulfilment_preference: request.fulfilment_preference.clone(),
            delivery_address_type_id: parse_optional_uuid_field(
                "deliveryAddressTypeId",
                request.delivery_address_type_id.as_deref(),
            )?,
            status: request.status.clone(),
            position: request.position,
            request_date: request.request_date,
            request_expiration_date: request.request_expiration_date,
            hold_shelf_expiration_date: request.hold_shelf_expiration_date,
            awaiting_pickup_request_closed_date: None,
            cancellation_reason_id: parse_optional_uuid_field(
                "cancellationReasonId",
                request.cancellation_reason_id.as_deref(),
            )?,
            cancelled_by_user_id: parse_optional_uuid_field(
                "cancelledByUserId",
                request.cancelled_by_user_id.as_deref(),
            )?,
            cancellation_additional_information: request
                .cancellation_additional_information
                .clone(),
            cancelled_date: request.cancelled_date,
            item_snapshot: snapshot_to_string(&request.item),
            requester_snapshot: snapshot_to_string(&request.requester),
            proxy_snapshot: snapshot_to_string(&request.proxy),
            instance_snapshot: snapshot_to_string(&request.instance),
            search_index: snapshot_to_string(&request.search_index),
            created_date: now,
            created_by_user_id: actor,
            updated_date: now,
            updated_by_user_id: actor,
        })
    }

    /// Convert back to the wire document.
    pub fn to_document(&self) -> StoreResult<Request> {
        Ok(Request {
            id: Some(self.id.to_string()),
            item_id: self.item_id.to_string(),
            requester_id: self.requester_id.map(|id| id.to_string()),
            proxy_user_id: self.proxy_user_id.map(|id| id.to_string()),
            request_type: self.request_type.clone(),
            fulfilment_preference: self.fulfilment_preference.clone(),
            delivery_address_type_id: self.delivery_address_type_id.map(|id| id.to_string()),
            status: self.status.clone(),
            position: self.position,
            request_date: self.request_date,
            request_expiration_date: self.request_expiration_date,
            hold_shelf_expiration_date: self.hold_shelf_expiration_date,
            awaiting_pickup_request_closed_date: self.awaiting_pickup_request_closed_date,
            cancellation_reason_id: self.cancellation_reason_id.map(|id| id.to_string()),
            cancelled_by_user_id: self.cancelled_by_user_id.map(|id| id.to_string()),
            cancellation_additional_information: self
                .cancellation_additional_information
                .clone(),
            cancelled_date: self.cancelled_date,
            item: snapshot_from_string("item", &self.item_snapshot)?,
            requester: snapshot_from_string("requester", &self.requester_snapshot)?,
            proxy: snapshot_from_string("proxy", &self.proxy_snapshot)?,
            instance: snapshot_from_string("instance", &self.instance_snapshot)?,
            search_index: snapshot_from_string("searchIndex", &self.search_index)?,
            metadata: Some(RecordMetadata {
                created_date: self.created_date,
                created_by_user_id: self.created_by_user_id,
                updated_date: self.updated_date,
                updated_by_user_id: self.updated_by_user_id,
            }),
        })
    }
}

/// Cancellation reason record.
#[derive(Debug, Clone, FromRow)]
pub struct CancellationReasonRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub public_description: Option<String>,
    pub created_date: OffsetDateTime,
    pub created_by_user_id: Uuid,
    pub updated_date: OffsetDateTime,
    pub updated_by_user_id: Uuid,
}

impl CancellationReasonRow {
    /// Build a row from a validated wire document.
    pub fn from_document(
        reason: &CancellationReason,
        id: Uuid,
        actor: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<Self> {
        Ok(Self {
            id,
            name: reason.name.clone(),
            description: reason.description.clone(),
            public_description: reason.public_description.clone(),
            created_date: now,
            created_by_user_id: actor,
            updated_date: now,
            updated_by_user_id: actor,
        })
    }

    /// Convert back to the wire document.
    pub fn to_document(&self) -> CancellationReason {
        CancellationReason {
            id: Some(self.id.to_string()),
            name: self.name.clone(),
            description: self.description.clone(),
            public_description: self.public_description.clone(),
            metadata: Some(RecordMetadata {
                created_date: self.created_date,
                created_by_user_id: self.created_by_user_id,
                updated_date: self.updated_date,
                updated_by_user_id: self.updated_by_user_id,
            }),
        }
    }
}
