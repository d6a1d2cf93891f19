//! Single-flight promise registry (spec §4.4.1): for a given
//! `(snapshot, computation-kind, key)`, the first caller starts the work and
//! every later caller joins the same in-flight computation instead of
//! starting a duplicate. Promises are cancellable: once every waiter has
//! dropped off, the underlying task is aborted; as long as one waiter
//! remains, the computation runs to completion for it.
//!
//! Join-or-start and last-waiter-removal both go through
//! [`dashmap::DashMap::entry`] rather than separate get/insert calls, since
//! `entry` holds the shard lock for the whole match -- a new joiner
//! incrementing the waiter count can never race a departing last waiter's
//! removal of the same slot.

use std::hash::Hash;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::PipelineError;

type SlotResult<V> = Result<V, Arc<PipelineError>>;

struct Slot<V> {
    waiters: Arc<AtomicUsize>,
    task: JoinHandle<()>,
    result: watch::Receiver<Option<SlotResult<V>>>,
}

/// Decrements the slot's waiter count on drop; if it was the last waiter and
/// the computation hasn't produced a result yet, aborts the task and removes
/// the slot so a future call starts fresh.
struct WaiterGuard<K, V>
where
    K: Eq + Hash + Clone,
{
    registry: PromiseRegistry<K, V>,
    key: K,
    waiters: Arc<AtomicUsize>,
}

impl<K, V> Drop for WaiterGuard<K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        if self.waiters.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        // We were the last waiter. Re-check under the shard lock: another
        // caller may have joined between our decrement and this removal.
        if let MapEntry::Occupied(occupied) = self.registry.slots.entry(self.key.clone()) {
            if occupied.get().waiters.load(Ordering::Acquire) == 0 {
                let finished = occupied.get().result.borrow().is_some();
                let (_, slot) = occupied.remove_entry();
                if !finished {
                    slot.task.abort();
                }
            }
        }
    }
}

/// Deduplicates in-flight computations keyed by `K`, producing
/// `Result<V, Arc<PipelineError>>` since the error type is fixed -- a
/// panicked task reports [`PipelineError::Panicked`] to every waiter rather
/// than needing a generic `From<JoinError>` bound.
pub struct PromiseRegistry<K, V>
where
    K: Eq + Hash + Clone,
{
    slots: Arc<DashMap<K, Slot<V>>>,
}

impl<K, V> Clone for PromiseRegistry<K, V>
where
    K: Eq + Hash + Clone,
{
    fn clone(&self) -> Self {
        Self { slots: Arc::clone(&self.slots) }
    }
}

impl<K, V> Default for PromiseRegistry<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self { slots: Arc::new(DashMap::new()) }
    }
}

impl<K, V> PromiseRegistry<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join an in-flight computation for `key`, or start one by spawning
    /// `compute`. Resolves once a result is available; returns
    /// `Err(PipelineError::Cancelled)` if this call's waiter slot is dropped
    /// elsewhere while awaiting (practically: only if `compute` itself never
    /// completes and the future is dropped, which `watch::Receiver::changed`
    /// surfaces as the sender going away).
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> SlotResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, PipelineError>> + Send + 'static,
    {
        let (mut rx, _guard) = self.join_or_start(key, compute);

        loop {
            if let Some(result) = rx.borrow().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                return Err(Arc::new(PipelineError::Panicked));
            }
        }
    }

    fn join_or_start<F, Fut>(
        &self,
        key: K,
        compute: F,
    ) -> (watch::Receiver<Option<SlotResult<V>>>, WaiterGuard<K, V>)
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, PipelineError>> + Send + 'static,
    {
        match self.slots.entry(key.clone()) {
            MapEntry::Occupied(occupied) => {
                let slot = occupied.get();
                slot.waiters.fetch_add(1, Ordering::AcqRel);
                let guard = WaiterGuard {
                    registry: self.clone(),
                    key,
                    waiters: Arc::clone(&slot.waiters),
                };
                (slot.result.clone(), guard)
            }
            MapEntry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                let fut = compute();
                let task = tokio::spawn(async move {
                    let result = fut.await.map_err(Arc::new);
                    let _ = tx.send(Some(result));
                });
                let waiters = Arc::new(AtomicUsize::new(1));
                vacant.insert(Slot { waiters: Arc::clone(&waiters), task, result: rx.clone() });
                let guard = WaiterGuard { registry: self.clone(), key, waiters };
                (rx, guard)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_join_a_single_computation() {
        let registry: PromiseRegistry<&str, u32> = PromiseRegistry::new();
        let starts = Arc::new(AtomicU32::new(0));

        let make_compute = {
            let starts = Arc::clone(&starts);
            move || {
                let starts = Arc::clone(&starts);
                async move {
                    starts.fetch_add(1, Ordering::AcqRel);
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok::<_, PipelineError>(42)
                }
            }
        };

        let a = registry.get_or_compute("k", make_compute.clone());
        let b = registry.get_or_compute("k", make_compute);
        let (a, b) = tokio::join!(a, b);

        assert_eq!(*a.unwrap(), 42);
        assert_eq!(*b.unwrap(), 42);
        assert_eq!(starts.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn a_fresh_call_after_completion_recomputes() {
        let registry: PromiseRegistry<&str, u32> = PromiseRegistry::new();
        let starts = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let starts = Arc::clone(&starts);
            let result = registry
                .get_or_compute("k", move || async move {
                    starts.fetch_add(1, Ordering::AcqRel);
                    Ok::<_, PipelineError>(7)
                })
                .await;
            assert_eq!(*result.unwrap(), 7);
        }

        assert_eq!(starts.load(Ordering::Acquire), 2);
    }
}
