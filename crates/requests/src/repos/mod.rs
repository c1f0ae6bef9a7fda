//! Repository traits for the request store.

pub mod cancellation_reasons;
pub mod expiration;
pub mod queue;
pub mod requests;

pub use cancellation_reasons::CancellationReasonRepo;
pub use expiration::ExpirationRepo;
pub use queue::QueueRepo;
pub use requests::{RequestFilter, RequestRepo};
