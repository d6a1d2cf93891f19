//! Generational, content-keyed cache used for artifacts that are addressed
//! by a derived key (content-hash, analyzer id, ...) rather than by a salsa
//! input identity — salsa already memoizes anything keyed on a `File` or
//! tracked struct, so this only exists for the cases spec §4.3.3 calls out
//! where the key is something else.

use std::hash::Hash;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use modlsp_source::FxDashMap;

struct Entry<V> {
    value: V,
    generation: u64,
}

/// A bounded-by-eviction cache stamped with a monotonically increasing
/// generation counter.
///
/// Each [`GenerationalCache::advance_generation`] call starts a new
/// generation; entries are tagged with the generation active when they were
/// last produced. [`GenerationalCache::evict_older_than`] then drops entries
/// whose generation has fallen behind, except those a caller-supplied
/// predicate marks as still reachable (e.g. referenced by an open file).
pub struct GenerationalCache<K, V> {
    entries: FxDashMap<K, Entry<V>>,
    generation: AtomicU64,
}

impl<K, V> GenerationalCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxDashMap::default(),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Return the cached value for `key` if present, otherwise compute it
    /// with `f`, insert it stamped with the current generation, and return
    /// it. A hit also refreshes the entry's generation so it survives the
    /// next eviction pass.
    pub fn get_or_insert_with(&self, key: K, f: impl FnOnce() -> V) -> V {
        let generation = self.current_generation();

        if let Some(mut entry) = self.entries.get_mut(&key) {
            entry.generation = generation;
            return entry.value.clone();
        }

        let value = f();
        self.entries.insert(
            key,
            Entry {
                value: value.clone(),
                generation,
            },
        );
        value
    }

    /// Drop every entry whose generation is older than `keep_within`
    /// generations behind the current one, unless `pinned` says it must be
    /// kept (e.g. it backs an open file).
    pub fn evict_older_than(&self, keep_within: u64, pinned: impl Fn(&K) -> bool) {
        let current = self.current_generation();
        let floor = current.saturating_sub(keep_within);
        self.entries
            .retain(|key, entry| entry.generation >= floor || pinned(key));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for GenerationalCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
