//! Domain layer - Protocol types and rules of the call-event relay
//!
//! This layer contains:
//! - Value Objects: call and observer identifiers, caller numbers
//! - The session wire protocol and response-id tracking
//! - Webhook notifications
//! - The response generation port (`ResponseAgent`)

pub mod agent;
pub mod session;
pub mod shared;
pub mod webhook;

// Re-export commonly used types
pub use shared::{RelayError, Result};
