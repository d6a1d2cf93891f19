//! Per-view ordering (spec §4.5.2): state-changing notifications run one at
//! a time within a view (but views never block each other), and every
//! notification schedules a diagnose task that supersedes -- cancels -- the
//! diagnose task the previous notification scheduled.

use std::future::Future;
use std::sync::Mutex;

use modlsp_source::CancellationToken;
use tokio::sync::Mutex as AsyncMutex;

/// Serializes one view's state-changing notifications and tracks the
/// cancellation token of its most recently scheduled diagnose task.
pub struct Queue {
    notifications: AsyncMutex<()>,
    current_diagnose: Mutex<Option<CancellationToken>>,
}

impl Queue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            notifications: AsyncMutex::new(()),
            current_diagnose: Mutex::new(None),
        }
    }

    /// Runs `f` with the view's notification lock held, so a second
    /// `did_change` can't interleave with the first's database mutation.
    pub async fn run_serialized<F, Fut>(&self, f: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let _guard = self.notifications.lock().await;
        f().await
    }

    /// Cancels whatever diagnose task is currently running for this view and
    /// returns a fresh token for the next one. Called once per
    /// state-changing notification, after the notification's own mutation
    /// has been applied.
    #[must_use]
    pub fn begin_diagnose(&self) -> CancellationToken {
        let next = CancellationToken::new();
        let mut current = self.current_diagnose.lock().unwrap();
        if let Some(previous) = current.replace(next.clone()) {
            previous.cancel();
        }
        next
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serialized_notifications_see_each_others_effects_in_order() {
        let queue = Queue::new();
        let log = std::sync::Arc::new(Mutex::new(Vec::new()));

        let a = {
            let log = std::sync::Arc::clone(&log);
            queue.run_serialized(|| async move {
                log.lock().unwrap().push(1);
            })
        };
        let b = {
            let log = std::sync::Arc::clone(&log);
            queue.run_serialized(|| async move {
                log.lock().unwrap().push(2);
            })
        };
        a.await;
        b.await;
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn starting_a_new_diagnose_task_cancels_the_previous_one() {
        let queue = Queue::new();
        let first = queue.begin_diagnose();
        assert!(!first.is_cancelled());

        let second = queue.begin_diagnose();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }
}
