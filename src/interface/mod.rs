//! Interface layer - External interfaces
//!
//! This layer handles:
//! - The per-call session WebSocket
//! - The observer WebSocket
//! - The lifecycle webhook
//! - Health and metrics endpoints

pub mod api;
