//! Observer connection handle

use crate::domain::shared::ObserverId;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Outcome of handing one message to an observer's send queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue full; the observer can no longer keep up and must be dropped
    Overflowed,
    /// The observer's writer is gone
    Closed,
}

/// A registered dashboard connection.
///
/// The registry only ever touches the send side of the observer's queue;
/// the socket itself stays with the observer's own writer task.
#[derive(Debug)]
pub struct ObserverHandle {
    id: ObserverId,
    tx: mpsc::Sender<Arc<str>>,
    evicted: Notify,
}

impl ObserverHandle {
    /// Create a handle plus the receiving end its writer task drains
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ObserverId::new(),
            tx,
            evicted: Notify::new(),
        };
        (Arc::new(handle), rx)
    }

    /// Registry key of this observer
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Enqueue without waiting on the socket
    pub fn deliver(&self, message: Arc<str>) -> Delivery {
        match self.tx.try_send(message) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Overflowed,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Tell the connection that owns this handle to hang up
    pub fn evict(&self) {
        self.evicted.notify_one();
    }

    /// Resolves once the registry has evicted this observer
    pub async fn evicted(&self) {
        self.evicted.notified().await
    }
}
