//! Cooperative cancellation contexts (spec §4.5.1, §5).
//!
//! A [`CancellationToken`] is cheap to clone and share; cancelling any clone
//! cancels every clone derived from it. Request handlers poll
//! [`CancellationToken::is_cancelled`] at convenient stopping points or await
//! [`CancellationToken::cancelled`] inside `select!` -- cancellation here is
//! advisory, never preemptive.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cancellable context, shareable across threads and tasks.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every clone of it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolve once this token is cancelled. Resolves immediately if it
    /// already was.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Build a request-scoped token that cancels as soon as either `self`
    /// (the owning session context) or `client` (the request's own
    /// cancellation) fires -- spec §4.5.1's "request-scoped cancellable
    /// context derived from both the session context and the client's
    /// cancellation token."
    #[must_use]
    pub fn derived_from(parents: &[CancellationToken]) -> Self {
        let child = Self::new();
        for parent in parents {
            if parent.is_cancelled() {
                child.cancel();
                return child;
            }
        }
        let combined = child.clone();
        let parents: Vec<CancellationToken> = parents.to_vec();
        tokio::spawn(async move {
            wait_for_any_cancel(parents).await;
            combined.cancel();
        });
        child
    }
}

/// Resolves once any one of `parents` cancels. Each parent is polled on its
/// own task so this doesn't need an extra futures-combinator crate for one
/// call site.
async fn wait_for_any_cancel(parents: Vec<CancellationToken>) {
    let mut set = tokio::task::JoinSet::new();
    for parent in parents {
        set.spawn(async move {
            parent.cancelled().await;
        });
    }
    set.join_next().await;
}
