//! In-process caches layered over a backend (design notes:
//! "an epoch counter invalidates size estimates on every write; value and
//! name lookups are served from a bounded LRU").
//!
//! None of this is required for correctness — every cache here is a pure
//! read-through accelerator over the backend, and a cache miss always falls
//! back to the backend. `apply_deltas` bumps the epoch and evicts touched
//! entries so a reader never observes stale data within one store handle.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use quad_model::{Value, ValueHash};

/// Default capacity for the value/name caches, sized for a few hundred
/// thousand distinct values without dominating process memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 65_536;

/// Bidirectional `ValueHash <-> Value` cache, backing `value_of`/`name_of`.
pub struct ValueCache {
    by_hash: Mutex<LruCache<ValueHash, Value>>,
}

impl ValueCache {
    /// Build a cache with the given capacity (entry count, not bytes).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("checked non-zero above");
        ValueCache {
            by_hash: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a cached value by its hash.
    pub fn get(&self, hash: ValueHash) -> Option<Value> {
        self.by_hash.lock().get(&hash).cloned()
    }

    /// Record a resolved `hash -> value` mapping.
    pub fn insert(&self, hash: ValueHash, value: Value) {
        self.by_hash.lock().put(hash, value);
    }

    /// Drop a cached mapping, e.g. because the value was just garbage
    /// collected.
    pub fn invalidate(&self, hash: ValueHash) {
        self.by_hash.lock().pop(&hash);
    }

    /// Empty the cache entirely.
    pub fn clear(&self) {
        self.by_hash.lock().clear();
    }
}

impl Default for ValueCache {
    fn default() -> Self {
        ValueCache::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

/// Monotonically increasing counter bumped on every successful
/// `apply_deltas`, used to invalidate size estimates cheaply without
/// threading a callback through every reader (design notes).
#[derive(Default)]
pub struct Epoch(std::sync::atomic::AtomicU64);

impl Epoch {
    /// Current epoch value.
    pub fn get(&self) -> u64 {
        self.0.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Advance the epoch by one, returning the new value.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, std::sync::atomic::Ordering::AcqRel) + 1
    }
}

/// A size estimate cached against the epoch it was computed at. Still
/// valid iff the store's current epoch matches `computed_at_epoch`.
#[derive(Debug, Clone, Copy)]
struct SizedEstimate {
    size: i64,
    computed_at_epoch: u64,
    exact: bool,
}

/// Per-pattern cache of [`crate::QuadStore::quad_iterator_size`] results,
/// invalidated wholesale on every write via the shared [`Epoch`].
#[derive(Default)]
pub struct SizeCache {
    entries: Mutex<rustc_hash::FxHashMap<Vec<u8>, SizedEstimate>>,
}

impl SizeCache {
    /// Fetch a cached estimate for `prefix_key`, if it is still valid at
    /// `current_epoch`.
    pub fn get(&self, prefix_key: &[u8], current_epoch: u64) -> Option<(i64, bool)> {
        let entries = self.entries.lock();
        entries.get(prefix_key).and_then(|e| {
            if e.computed_at_epoch == current_epoch {
                Some((e.size, e.exact))
            } else {
                None
            }
        })
    }

    /// Record an estimate for `prefix_key` computed at `current_epoch`.
    pub fn insert(&self, prefix_key: Vec<u8>, size: i64, exact: bool, current_epoch: u64) {
        self.entries.lock().insert(
            prefix_key,
            SizedEstimate {
                size,
                computed_at_epoch: current_epoch,
                exact,
            },
        );
    }
}
