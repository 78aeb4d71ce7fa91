//! The quad store: a backend-agnostic, single-writer/multi-reader home for
//! quads, their delta application protocol, and the permutation indexes
//! that back lookups.
//!
//! This crate does not know about the iterator tree or the shape DSL —
//! those live in `iter-tree` and `shapes` and are built on the primitives
//! exposed here ([`QuadStore::quad_iterator`], [`QuadStore::value_of`],
//! [`NodeRef`], [`QuadRef`]).

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod backend;
mod cache;
mod cancellation;
mod delta;
mod error;
mod graphlog;
pub mod indexes;
mod inmemory;
mod noderef;
mod observability;
mod options;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;
mod store;
mod writer;

pub use backend::{BackendFactory, StorageBackend, StorageStats};
pub use cancellation::CancellationToken;
pub use delta::{Action, Classification, Delta, IgnorePolicy};
pub use error::{DeltaError, DeltaErrorKind, StorageError, StorageResult};
pub use graphlog::{plan_deltas, ClassifiedDelta, GraphLogPlan};
pub use inmemory::{InMemoryBackend, InMemoryFactory};
pub use noderef::{NodeRef, QuadRef};
pub use observability::{track_operation, OperationType};
pub use options::StoreOptions;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::{RocksDbBackend, RocksDbFactory};
pub use store::{QuadRefs, QuadStore, StoreStats};
pub use writer::{QuadWriter, Transaction};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_compiles() {
        let store = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        assert_eq!(store.horizon(), 0);
    }
}
