//! Core domain types and shared logic for Carrel.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Request documents, statuses, types, and fulfilment preferences
//! - The awaiting-pickup closure-date transition rule
//! - Cancellation reason reference entities
//! - Field-level validation with parameter/value/message reporting
//! - Configuration types

pub mod actor;
pub mod cancellation_reason;
pub mod config;
pub mod error;
pub mod request;

pub use actor::{SYSTEM_USER_ID_U128, system_user_id};
pub use cancellation_reason::CancellationReason;
pub use error::{ValidationError, parse_optional_uuid_field, parse_uuid_field};
pub use request::{
    FulfilmentPreference, RecordMetadata, Request, RequestStatus, RequestType,
    stamps_awaiting_pickup_closed_date,
};
