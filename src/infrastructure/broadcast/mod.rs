//! Fan-out of relay events to observer connections

pub mod observer;
pub mod registry;

pub use observer::{Delivery, ObserverHandle};
pub use registry::{BroadcastReport, SubscriberRegistry};
