//! Response id tracking for cooperative cancellation
//!
//! Every `response_required`/`reminder_required` frame carries a response
//! id. The newest id observed on a session is the only one whose output is
//! still wanted; a generation stream holding an older id has to notice and
//! stop on its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Latest response id seen on one session. Starts at 0 and never decreases.
#[derive(Debug, Default)]
pub struct ResponseTracker {
    latest: AtomicU64,
}

impl ResponseTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current response id
    pub fn current(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Record a newly arrived response id and hand out the ticket its
    /// generation task checks before every emission.
    ///
    /// Must be called from the session's read loop, in arrival order. A
    /// lower id than the current one is merged with `max`, so the ticket it
    /// returns is already superseded.
    pub fn advance(self: &Arc<Self>, response_id: u64) -> ResponseTicket {
        self.latest.fetch_max(response_id, Ordering::AcqRel);
        ResponseTicket {
            response_id,
            tracker: Arc::clone(self),
        }
    }
}

/// Handle held by one generation task
#[derive(Debug, Clone)]
pub struct ResponseTicket {
    response_id: u64,
    tracker: Arc<ResponseTracker>,
}

impl ResponseTicket {
    pub fn response_id(&self) -> u64 {
        self.response_id
    }

    /// True once a newer response id has been recorded on the session
    pub fn is_superseded(&self) -> bool {
        self.tracker.current() > self.response_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let tracker = ResponseTracker::new();
        assert_eq!(tracker.current(), 0);
        assert!(!tracker.advance(0).is_superseded());
    }

    #[test]
    fn test_newer_id_supersedes_older_ticket() {
        let tracker = ResponseTracker::new();
        let first = tracker.advance(5);
        assert!(!first.is_superseded());

        let second = tracker.advance(6);
        assert!(first.is_superseded());
        assert!(!second.is_superseded());
        assert_eq!(tracker.current(), 6);
    }

    #[test]
    fn test_late_lower_id_never_moves_backwards() {
        let tracker = ResponseTracker::new();
        tracker.advance(9);
        let late = tracker.advance(4);

        assert_eq!(tracker.current(), 9);
        assert!(late.is_superseded());
        assert_eq!(late.response_id(), 4);
    }

    #[test]
    fn test_repeated_id_is_still_current() {
        let tracker = ResponseTracker::new();
        let a = tracker.advance(3);
        let b = tracker.advance(3);
        assert!(!a.is_superseded());
        assert!(!b.is_superseded());
    }

    #[tokio::test]
    async fn test_observations_are_monotonic_under_concurrency() {
        let tracker = ResponseTracker::new();

        let writer = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                for id in 1..=500 {
                    tracker.advance(id);
                    tokio::task::yield_now().await;
                }
            })
        };

        let reader = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                let mut last = 0;
                for _ in 0..500 {
                    let now = tracker.current();
                    assert!(now >= last, "observed {now} after {last}");
                    last = now;
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        assert_eq!(tracker.current(), 500);
    }
}
