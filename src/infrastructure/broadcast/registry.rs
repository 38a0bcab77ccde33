//! Subscriber registry - the live set of observer connections

use super::observer::{Delivery, ObserverHandle};
use crate::domain::shared::ObserverId;
use crate::infrastructure::metrics;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// What happened to one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: usize,
}

/// Shared set of observers.
///
/// Register/deregister take the write lock; broadcast iterates under the
/// read lock and only enqueues, so a slow socket never holds up the set or
/// the other observers.
pub struct SubscriberRegistry {
    observers: RwLock<HashMap<ObserverId, Arc<ObserverHandle>>>,
}

impl SubscriberRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
        }
    }

    /// Add an observer
    pub async fn register(&self, observer: Arc<ObserverHandle>) {
        let mut observers = self.observers.write().await;
        let id = observer.id();
        observers.insert(id, observer);
        metrics::set_observers(observers.len());
        debug!(observer_id = %id, total = observers.len(), "Observer registered");
    }

    /// Remove an observer. Returns `false` if it was already gone.
    ///
    /// The caller owns the connection, so no eviction signal is sent.
    pub async fn deregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().await;
        let removed = observers.remove(&id).is_some();
        if removed {
            metrics::set_observers(observers.len());
            debug!(observer_id = %id, total = observers.len(), "Observer deregistered");
        }
        removed
    }

    /// Deliver `message` to every registered observer.
    ///
    /// Never fails as a whole. An observer whose queue is closed or full is
    /// evicted after the pass and told to hang up.
    pub async fn broadcast(&self, message: impl Into<Arc<str>>) -> BroadcastReport {
        let message = message.into();
        let mut report = BroadcastReport::default();
        let mut gone = Vec::new();

        {
            let observers = self.observers.read().await;
            for (id, observer) in observers.iter() {
                match observer.deliver(Arc::clone(&message)) {
                    Delivery::Queued => report.delivered += 1,
                    Delivery::Overflowed => {
                        warn!(observer_id = %id, "Observer queue full, evicting");
                        gone.push(*id);
                    }
                    Delivery::Closed => gone.push(*id),
                }
            }
        }

        if !gone.is_empty() {
            let mut observers = self.observers.write().await;
            for id in &gone {
                if let Some(observer) = observers.remove(id) {
                    observer.evict();
                    report.evicted += 1;
                    debug!(observer_id = %id, "Evicted observer");
                }
            }
            metrics::set_observers(observers.len());
        }

        metrics::record_broadcast(report.evicted);
        debug!(
            recipients = report.delivered,
            evicted = report.evicted,
            "Broadcast message"
        );
        report
    }

    /// Serialize `value` and broadcast it
    pub async fn broadcast_json<T: Serialize>(&self, value: &T) -> BroadcastReport {
        match serde_json::to_string(value) {
            Ok(json) => self.broadcast(json).await,
            Err(e) => {
                warn!(error = %e, "Failed to serialize broadcast payload");
                BroadcastReport::default()
            }
        }
    }

    /// Number of registered observers
    pub async fn subscriber_count(&self) -> usize {
        self.observers.read().await.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
