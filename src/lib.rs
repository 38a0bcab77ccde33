//! CallRelay - realtime call-event relay
//!
//! Accepts one WebSocket session per live call from a conversational voice
//! platform, answers its protocol frames, and fans call lifecycle and
//! transcript events out to any number of observer dashboards.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::RelayError;
pub use domain::shared::result::Result;
