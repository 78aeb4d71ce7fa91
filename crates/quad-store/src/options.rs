//! Store-wide configuration, covering the wire-neutral delta payload
//! format and the backends' on-disk layout.
//!
//! `StoreOptions` only carries the well-known keys every backend is
//! expected to understand; a backend-specific factory is free to accept
//! additional configuration of its own alongside this.

use crate::delta::IgnorePolicy;

/// Default number of deltas a [`crate::writer::QuadWriter`] batches before
/// flushing to the backend, matching cayley's default batch size of 300.
pub const DEFAULT_BATCH_SIZE: usize = 300;

/// Configuration passed to a backend factory's `init`/`open` and consulted
/// by the store and writer.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Human-readable name for the database, used in some backends' error
    /// messages and by multi-database deployments to disambiguate.
    pub database_name: String,
    /// What to do when a delta conflicts with current state.
    pub ignore_policy: IgnorePolicy,
    /// Skip fsync/durability barriers on write, trading safety for
    /// throughput (the `nosync` well-known key).
    pub nosync: bool,
    /// Number of deltas a writer batches before flushing.
    pub batch_size: usize,
    /// Capacity of the in-process value/name LRU caches.
    pub cache_capacity: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            database_name: String::from("default"),
            ignore_policy: IgnorePolicy::default(),
            nosync: false,
            batch_size: DEFAULT_BATCH_SIZE,
            cache_capacity: crate::cache::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl StoreOptions {
    /// Start from defaults with a specific database name.
    pub fn named(database_name: impl Into<String>) -> Self {
        StoreOptions {
            database_name: database_name.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter for `ignore_policy`.
    pub fn with_ignore_policy(mut self, policy: IgnorePolicy) -> Self {
        self.ignore_policy = policy;
        self
    }

    /// Builder-style setter for `nosync`.
    pub fn with_nosync(mut self, nosync: bool) -> Self {
        self.nosync = nosync;
        self
    }

    /// Builder-style setter for `batch_size`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let opts = StoreOptions::default();
        assert_eq!(opts.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!opts.nosync);
    }

    #[test]
    fn builder_overrides_apply() {
        let opts = StoreOptions::named("test-db").with_batch_size(50).with_nosync(true);
        assert_eq!(opts.database_name, "test-db");
        assert_eq!(opts.batch_size, 50);
        assert!(opts.nosync);
    }
}
