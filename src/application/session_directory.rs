//! Live call sessions, at most one per call id

use crate::domain::shared::CallId;
use crate::infrastructure::metrics;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tracing::info;
use uuid::Uuid;

/// Proof that a session owns its call id. Handed back on close.
#[derive(Debug)]
pub struct SessionLease {
    call_id: CallId,
    token: Uuid,
    shutdown: Arc<Notify>,
}

impl SessionLease {
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Fires when a newer session for the same call id takes over
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }
}

struct LiveSession {
    token: Uuid,
    shutdown: Arc<Notify>,
}

/// Live sessions keyed by call id; at most one per call.
pub struct SessionDirectory {
    live: RwLock<HashMap<CallId, LiveSession>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self {
            live: RwLock::new(HashMap::new()),
        }
    }

    /// Claim `call_id` for a new session. A session already holding it is
    /// told to shut down; the newest connection wins.
    pub async fn open(&self, call_id: CallId) -> SessionLease {
        let token = Uuid::new_v4();
        let shutdown = Arc::new(Notify::new());

        let mut live = self.live.write().await;
        let previous = live.insert(
            call_id.clone(),
            LiveSession {
                token,
                shutdown: Arc::clone(&shutdown),
            },
        );
        if let Some(previous) = previous {
            info!(call_id = %call_id, "Superseding existing session for call");
            // notify_one keeps a permit if the old session is not waiting yet
            previous.shutdown.notify_one();
        }
        metrics::set_active_sessions(live.len());

        SessionLease {
            call_id,
            token,
            shutdown,
        }
    }

    /// Release the lease. Returns `false` when a newer session already owns
    /// the call id, in which case nothing is removed.
    pub async fn close(&self, lease: &SessionLease) -> bool {
        let mut live = self.live.write().await;
        let owned = live
            .get(&lease.call_id)
            .is_some_and(|session| session.token == lease.token);
        if owned {
            live.remove(&lease.call_id);
            metrics::set_active_sessions(live.len());
        }
        owned
    }

    pub async fn contains(&self, call_id: &CallId) -> bool {
        self.live.read().await.contains_key(call_id)
    }

    /// Number of calls with a live session
    pub async fn active_count(&self) -> usize {
        self.live.read().await.len()
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_and_close() {
        let directory = SessionDirectory::new();
        let lease = directory.open(CallId::new("abc123")).await;

        assert!(directory.contains(&CallId::new("abc123")).await);
        assert_eq!(directory.active_count().await, 1);

        assert!(directory.close(&lease).await);
        assert_eq!(directory.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_second_open_supersedes_first() {
        let directory = SessionDirectory::new();
        let first = directory.open(CallId::new("abc123")).await;
        let signal = first.shutdown_signal();

        let second = directory.open(CallId::new("abc123")).await;
        assert_eq!(directory.active_count().await, 1);

        tokio::time::timeout(Duration::from_secs(1), signal.notified())
            .await
            .expect("first session should be told to shut down");

        // The late close of the first session must not evict the second
        assert!(!directory.close(&first).await);
        assert!(directory.contains(second.call_id()).await);
        assert!(directory.close(&second).await);
        assert_eq!(directory.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_distinct_calls_coexist() {
        let directory = SessionDirectory::new();
        let _a = directory.open(CallId::new("a")).await;
        let _b = directory.open(CallId::new("b")).await;
        assert_eq!(directory.active_count().await, 2);
    }
}
