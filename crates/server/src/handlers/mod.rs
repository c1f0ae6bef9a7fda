//! HTTP request handlers.

pub mod batch;
pub mod cancellation_reasons;
pub mod common;
pub mod expiration;
pub mod health;
pub mod requests;

pub use batch::*;
pub use cancellation_reasons::*;
pub use common::*;
pub use expiration::*;
pub use health::*;
pub use requests::*;
