//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Observer fan-out (subscriber registry and per-observer send queues)
//! - Metrics recording

pub mod broadcast;
pub mod metrics;
