//! The read-only surface an iterator tree pulls from, erasing
//! [`QuadStore`]'s backend type parameter so the tree can hold `&dyn
//! QuadSource` instead of threading a backend generic through every
//! variant.

use quad_model::Value;
use quad_store::indexes::Pattern;
use quad_store::{NodeRef, QuadRef, QuadRefs, QuadStore, StorageBackend, StorageResult};

/// Everything the iterator tree needs from a store. Implemented for any
/// [`QuadStore<B>`]; leaf variants ([`crate::all::All`],
/// [`crate::linksto::LinksTo`]) hold a `&dyn QuadSource` rather than a
/// concrete `QuadStore<B>`.
pub trait QuadSource: Send + Sync {
    /// See [`QuadStore::value_of`].
    fn value_of(&self, value: &Value) -> StorageResult<Option<NodeRef>>;

    /// See [`QuadStore::name_of`].
    fn name_of(&self, node: NodeRef) -> StorageResult<Option<Value>>;

    /// See [`QuadStore::quad`].
    fn quad(&self, quad_ref: QuadRef) -> StorageResult<Option<QuadRefs>>;

    /// See [`QuadStore::quad_iterator`].
    fn quad_iterator(&self, pattern: Pattern) -> StorageResult<Vec<QuadRef>>;

    /// See [`QuadStore::quad_iterator_size`].
    fn quad_iterator_size(&self, pattern: Pattern) -> StorageResult<(u64, bool)>;

    /// See [`QuadStore::nodes_all`].
    fn nodes_all(&self) -> StorageResult<Vec<NodeRef>>;

    /// See [`QuadStore::quads_all`].
    fn quads_all(&self) -> StorageResult<Vec<QuadRef>>;
}

impl<B: StorageBackend> QuadSource for QuadStore<B> {
    fn value_of(&self, value: &Value) -> StorageResult<Option<NodeRef>> {
        QuadStore::value_of(self, value)
    }

    fn name_of(&self, node: NodeRef) -> StorageResult<Option<Value>> {
        QuadStore::name_of(self, node)
    }

    fn quad(&self, quad_ref: QuadRef) -> StorageResult<Option<QuadRefs>> {
        QuadStore::quad(self, quad_ref)
    }

    fn quad_iterator(&self, pattern: Pattern) -> StorageResult<Vec<QuadRef>> {
        QuadStore::quad_iterator(self, pattern)
    }

    fn quad_iterator_size(&self, pattern: Pattern) -> StorageResult<(u64, bool)> {
        QuadStore::quad_iterator_size(self, pattern)
    }

    fn nodes_all(&self) -> StorageResult<Vec<NodeRef>> {
        QuadStore::nodes_all(self)
    }

    fn quads_all(&self) -> StorageResult<Vec<QuadRef>> {
        QuadStore::quads_all(self)
    }
}
