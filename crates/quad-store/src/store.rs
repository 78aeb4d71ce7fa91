//! The `QuadStore` contract and the delta application protocol
//! that backs it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use quad_model::{Quad, QuadKey, Value, ValueHash};

use crate::backend::{StorageBackend, StorageStats};
use crate::cache::{Epoch, SizeCache, ValueCache};
use crate::delta::Delta;
use crate::error::{DeltaError, DeltaErrorKind, StorageError, StorageResult};
use crate::graphlog::plan_deltas;
use crate::indexes::{self, IndexType, Pattern};
use crate::noderef::{NodeRef, QuadRef};
use crate::observability::{track_operation, OperationType};
use crate::options::StoreOptions;

const VALUE_PREFIX: u8 = 10;
const META_PREFIX: u8 = 11;
const META_HORIZON_KEY: [u8; 2] = [META_PREFIX, 0];
const META_QUAD_COUNT_KEY: [u8; 2] = [META_PREFIX, 1];
const LOG_PREFIX: u8 = 12;

fn value_key(hash: ValueHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(17);
    key.push(VALUE_PREFIX);
    key.extend_from_slice(hash.as_bytes());
    key
}

fn encode_value_row(refcount: u64, value: &Value) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 32);
    buf.extend_from_slice(&refcount.to_be_bytes());
    buf.extend_from_slice(&value.canonical_bytes());
    buf
}

fn decode_value_row(bytes: &[u8]) -> StorageResult<(u64, Value)> {
    if bytes.len() < 8 {
        return Err(StorageError::Backend("truncated value row".into()));
    }
    let refcount = u64::from_be_bytes(bytes[0..8].try_into().expect("checked length"));
    let value = Value::from_canonical_bytes(&bytes[8..])
        .map_err(|e| StorageError::Backend(format!("corrupt value row: {e}")))?;
    Ok((refcount, value))
}

fn log_key(log_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(LOG_PREFIX);
    key.extend_from_slice(&log_id.to_be_bytes());
    key
}

fn read_u64_meta<B: StorageBackend>(backend: &B, key: &[u8]) -> StorageResult<u64> {
    Ok(backend
        .get(key)?
        .map(|b| u64::from_be_bytes(b.try_into().unwrap_or([0; 8])))
        .unwrap_or(0))
}

/// One quad's four components as opaque internal refs, the shape
/// [`QuadStore::quad`] resolves a [`QuadRef`] into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadRefs {
    /// Subject.
    pub subject: NodeRef,
    /// Predicate.
    pub predicate: NodeRef,
    /// Object.
    pub object: NodeRef,
    /// Label, if the quad has one.
    pub label: Option<NodeRef>,
}

fn quad_refs_from_key(key: QuadKey) -> QuadRefs {
    let bytes = key.0;
    let subject = NodeRef::new(ValueHash(bytes[0..16].try_into().expect("fixed width")));
    let predicate = NodeRef::new(ValueHash(bytes[16..32].try_into().expect("fixed width")));
    let object = NodeRef::new(ValueHash(bytes[32..48].try_into().expect("fixed width")));
    let label_bytes: [u8; 16] = bytes[48..64].try_into().expect("fixed width");
    let label = if label_bytes == [0xff; 16] {
        None
    } else {
        Some(NodeRef::new(ValueHash(label_bytes)))
    };
    QuadRefs {
        subject,
        predicate,
        object,
        label,
    }
}

/// A possibly-approximate cardinality. Callers must treat `value < 0` as unknown and fall back to a
/// store-wide estimate; none of the backends here ever produce a negative
/// value, but the field stays signed so a future sampling-based backend can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    /// The estimated (or exact) cardinality. Negative means unknown.
    pub value: i64,
    /// Whether `value` is an exact count rather than an approximation.
    pub exact: bool,
}

/// Extended counters beyond what a raw backend reports (`stats`): the live quad count and the distinct value count, both
/// maintained incrementally so `stats` never needs a full scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Backend-level counters (key count, disk size).
    pub backend: StorageStats,
    /// Number of currently live quads.
    pub quad_count: u64,
    /// Store-assigned horizon (highest log id issued so far).
    pub horizon: u64,
}

/// The central read/write surface over a backend.
///
/// Generic over the backend so the same logic runs unchanged over
/// [`crate::inmemory::InMemoryBackend`] and, behind the `rocksdb-backend`
/// feature, [`crate::rocksdb_backend::RocksDbBackend`].
pub struct QuadStore<B: StorageBackend> {
    backend: Arc<B>,
    options: StoreOptions,
    value_cache: ValueCache,
    epoch: Arc<Epoch>,
    size_cache: SizeCache,
    horizon: AtomicU64,
    quad_count: AtomicU64,
}

impl<B: StorageBackend> QuadStore<B> {
    /// Attach a store to an already-opened backend, loading the persisted
    /// horizon and quad count (both `0` for a fresh backend).
    pub fn open(backend: B, options: StoreOptions) -> StorageResult<Self> {
        let horizon = read_u64_meta(&backend, &META_HORIZON_KEY)?;
        let quad_count = read_u64_meta(&backend, &META_QUAD_COUNT_KEY)?;
        let cache_capacity = options.cache_capacity;
        Ok(QuadStore {
            backend: Arc::new(backend),
            options,
            value_cache: ValueCache::with_capacity(cache_capacity),
            epoch: Arc::new(Epoch::default()),
            size_cache: SizeCache::default(),
            horizon: AtomicU64::new(horizon),
            quad_count: AtomicU64::new(quad_count),
        })
    }

    /// The configuration this store was opened with.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Shared handle to the backend, for callers (e.g. [`crate::writer::QuadWriter`])
    /// that need to batch writes alongside this store's bookkeeping.
    pub(crate) fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub(crate) fn epoch(&self) -> &Arc<Epoch> {
        &self.epoch
    }

    fn is_quad_live(&self, key: QuadKey) -> StorageResult<bool> {
        let mut probe = Vec::with_capacity(65);
        probe.push(IndexType::Spoc.discriminant());
        probe.extend_from_slice(&key.0);
        self.backend.contains(&probe)
    }

    /// Resolve an external value to its internal ref, if the value is
    /// currently known to the store (`value_of`).
    pub fn value_of(&self, value: &Value) -> StorageResult<Option<NodeRef>> {
        track_operation(OperationType::ValueOf, || {
            let hash = value.hash();
            let key = value_key(hash);
            match self.backend.get(&key)? {
                Some(_) => Ok(Some(NodeRef::new(hash))),
                None => Ok(None),
            }
        })
    }

    /// Resolve an internal ref back to its value (`name_of`).
    pub fn name_of(&self, node: NodeRef) -> StorageResult<Option<Value>> {
        track_operation(OperationType::NameOf, || {
            if let Some(v) = self.value_cache.get(node.hash()) {
                return Ok(Some(v));
            }
            match self.backend.get(&value_key(node.hash()))? {
                None => Ok(None),
                Some(bytes) => {
                    let (_refcount, value) = decode_value_row(&bytes)?;
                    self.value_cache.insert(node.hash(), value.clone());
                    Ok(Some(value))
                }
            }
        })
    }

    /// Resolve a quad ref to its component refs, `None` if it is not (or
    /// no longer) live (`quad`).
    pub fn quad(&self, quad_ref: QuadRef) -> StorageResult<Option<QuadRefs>> {
        track_operation(OperationType::Quad, || {
            if self.is_quad_live(quad_ref.key())? {
                Ok(Some(quad_refs_from_key(quad_ref.key())))
            } else {
                Ok(None)
            }
        })
    }

    /// All quad refs matching `pattern` (`quad_iterator`). This
    /// is the primitive backend scan the iterator tree's leaf nodes
    /// (`HasA`/`LinksTo`) pull from; it collects eagerly rather than
    /// streaming, since every backend here already materializes a
    /// `prefix_scan` as a `Vec`.
    pub fn quad_iterator(&self, pattern: Pattern) -> StorageResult<Vec<QuadRef>> {
        let index = pattern.select_best();
        let prefix = pattern.prefix_for(index);
        let mut out = Vec::new();
        for (key, _value) in self.backend.prefix_scan(&prefix)? {
            let Some(quad_key) = indexes::decode_quad_key(index, &key) else {
                continue;
            };
            let refs = quad_refs_from_key(quad_key);
            if pattern.matches_hashes(refs.subject.hash(), refs.predicate.hash(), refs.object.hash(), refs.label.map(|r| r.hash())) {
                out.push(QuadRef::new(quad_key));
            }
        }
        Ok(out)
    }

    /// Size estimate for `pattern`'s `quad_iterator` (`quad_iterator_size`). Exact for the current backends; the `bool`
    /// is kept so a future approximate backend can report a non-exact
    /// figure without changing the signature.
    pub fn quad_iterator_size(&self, pattern: Pattern) -> StorageResult<(u64, bool)> {
        track_operation(OperationType::QuadIteratorSize, || {
            if pattern.bound_count() == 0 {
                return Ok((self.quad_count.load(Ordering::Acquire), true));
            }
            let index = pattern.select_best();
            let prefix = pattern.prefix_for(index);
            let epoch = self.epoch.get();
            if let Some(cached) = self.size_cache.get(&prefix, epoch) {
                return Ok(cached);
            }
            let size = self.quad_iterator(pattern)?.len() as u64;
            self.size_cache.insert(prefix, size, true, epoch);
            Ok((size, true))
        })
    }

    /// Every distinct value currently live in the store (`nodes_all`).
    pub fn nodes_all(&self) -> StorageResult<Vec<NodeRef>> {
        track_operation(OperationType::NodesAll, || {
            let rows = self.backend.prefix_scan(&[VALUE_PREFIX])?;
            let mut out = Vec::with_capacity(rows.len());
            for (key, _bytes) in rows {
                if key.len() == 17 {
                    let hash: [u8; 16] = key[1..17].try_into().expect("fixed width");
                    out.push(NodeRef::new(ValueHash(hash)));
                }
            }
            Ok(out)
        })
    }

    /// Every live quad ref (`quads_all`).
    pub fn quads_all(&self) -> StorageResult<Vec<QuadRef>> {
        track_operation(OperationType::QuadsAll, || self.quad_iterator(Pattern::default()))
    }

    /// Apply a batch of deltas atomically. On success, every
    /// delta was applied in order; on failure, none were (the backend is
    /// left exactly as it was before the call).
    pub fn apply_deltas(&self, deltas: &[Delta]) -> Result<(), DeltaError> {
        track_operation(OperationType::ApplyDeltas, || -> Result<(), DeltaError> {
            let plan = plan_deltas(
                deltas,
                |key| self.is_quad_live(*key).unwrap_or(false),
                self.options.ignore_policy,
            )?;

            let mut component_values: HashMap<ValueHash, Value> = HashMap::new();
            for classified in plan.effective() {
                for (dir, hash) in classified.delta.quad.component_hashes() {
                    let value = classified
                        .delta
                        .quad
                        .component(dir)
                        .expect("component_hashes only yields present directions")
                        .clone();
                    component_values.entry(hash).or_insert(value);
                }
            }

            let mut puts: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
            let mut deletes: Vec<Vec<u8>> = Vec::new();
            let mut quad_count_delta: i64 = 0;
            let mut next_log_id = self.horizon.load(Ordering::Acquire);

            for classified in plan.effective() {
                let quad = &classified.delta.quad;
                let key = quad.key();
                match classified.classification {
                    crate::delta::Classification::NewAdd => {
                        for index in IndexType::ALL {
                            puts.push((indexes::encode_key(index, quad), Vec::new()));
                        }
                        quad_count_delta += 1;
                    }
                    crate::delta::Classification::NewDelete => {
                        for index in IndexType::ALL {
                            deletes.push(indexes::encode_key(index, quad));
                        }
                        quad_count_delta -= 1;
                    }
                    _ => unreachable!("effective excludes noop classifications"),
                }
                next_log_id += 1;
                let log_entry = encode_log_entry(next_log_id, classified.delta.action, &key);
                puts.push((log_key(next_log_id), log_entry));
            }

            for (hash, delta) in &plan.node_refcount_deltas {
                let row_key = value_key(*hash);
                let current = self
                    .backend
                    .get(&row_key)
                    .map_err(|e| DeltaError {
                        quad: deltas.first().map(|d| d.quad.clone()).unwrap_or_else(empty_quad),
                        kind: e.into(),
                    })?
                    .map(|bytes| decode_value_row(&bytes))
                    .transpose()
                    .map_err(|e| DeltaError {
                        quad: deltas.first().map(|d| d.quad.clone()).unwrap_or_else(empty_quad),
                        kind: e.into(),
                    })?;
                let current_refcount = current.as_ref().map(|(rc, _)| *rc as i64).unwrap_or(0);
                let new_refcount = current_refcount + delta;
                if new_refcount <= 0 {
                    deletes.push(row_key);
                } else if let Some(value) = component_values.get(hash) {
                    puts.push((row_key, encode_value_row(new_refcount as u64, value)));
                } else if let Some((_, value)) = current {
                    puts.push((row_key, encode_value_row(new_refcount as u64, &value)));
                }
            }

            puts.push((META_HORIZON_KEY.to_vec(), next_log_id.to_be_bytes().to_vec()));
            let new_quad_count = (self.quad_count.load(Ordering::Acquire) as i64 + quad_count_delta).max(0) as u64;
            puts.push((META_QUAD_COUNT_KEY.to_vec(), new_quad_count.to_be_bytes().to_vec()));

            self.backend.apply_batch(&puts, &deletes).map_err(|e| DeltaError {
                quad: deltas.first().map(|d| d.quad.clone()).unwrap_or_else(empty_quad),
                kind: e.into(),
            })?;

            self.horizon.store(next_log_id, Ordering::Release);
            self.quad_count.store(new_quad_count, Ordering::Release);
            for hash in plan.node_refcount_deltas.keys() {
                self.value_cache.invalidate(*hash);
            }
            self.epoch.advance();
            Ok(())
        })
    }

    /// Point-in-time counters (`stats`).
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            backend: self.backend.stats(),
            quad_count: self.quad_count.load(Ordering::Acquire),
            horizon: self.horizon.load(Ordering::Acquire),
        }
    }

    /// The highest log id issued so far (`horizon`).
    pub fn horizon(&self) -> u64 {
        self.horizon.load(Ordering::Acquire)
    }

    /// Release backend resources. Further calls on this store after
    /// `close` will error.
    pub fn close(&self) -> StorageResult<()> {
        self.backend.close()
    }
}

fn empty_quad() -> Quad {
    Quad::new(Value::plain(""), Value::plain(""), Value::plain(""), None)
}

fn encode_log_entry(log_id: u64, action: crate::delta::Action, quad_key: &QuadKey) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 1 + 64);
    buf.extend_from_slice(&log_id.to_be_bytes());
    buf.push(match action {
        crate::delta::Action::Add => 0,
        crate::delta::Action::Delete => 1,
    });
    buf.extend_from_slice(&quad_key.0);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryBackend;

    fn store() -> QuadStore<InMemoryBackend> {
        QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap()
    }

    fn quad(o: &str) -> Quad {
        Quad::new(
            Value::iri("http://example.org/a"),
            Value::iri("http://example.org/p"),
            Value::iri(o),
            None,
        )
    }

    #[test]
    fn fresh_store_has_zero_horizon_and_no_quads() {
        let s = store();
        assert_eq!(s.horizon(), 0);
        assert_eq!(s.stats().quad_count, 0);
        assert!(s.quads_all().unwrap().is_empty());
    }

    #[test]
    fn apply_deltas_makes_quad_and_values_resolvable() {
        let s = store();
        let q = quad("http://example.org/b");
        s.apply_deltas(&[Delta::add(q.clone())]).unwrap();

        assert_eq!(s.stats().quad_count, 1);
        assert_eq!(s.horizon(), 1);

        let subject_ref = s.value_of(&q.subject).unwrap().expect("subject known");
        let resolved = s.name_of(subject_ref).unwrap().expect("resolves");
        assert_eq!(resolved, q.subject);

        let all = s.quads_all().unwrap();
        assert_eq!(all.len(), 1);
        let refs = s.quad(all[0]).unwrap().expect("live");
        assert_eq!(refs.subject.hash(), q.subject.hash());
        assert!(refs.label.is_none());
    }

    #[test]
    fn duplicate_add_without_ignore_errors_and_keeps_state() {
        let s = store();
        let q = quad("http://example.org/b");
        s.apply_deltas(&[Delta::add(q.clone())]).unwrap();
        let err = s.apply_deltas(&[Delta::add(q)]).unwrap_err();
        assert_eq!(err.kind, DeltaErrorKind::QuadExists);
        assert_eq!(s.stats().quad_count, 1);
    }

    #[test]
    fn delete_removes_quad_and_gcs_unreferenced_values() {
        let s = store();
        let q = quad("http://example.org/b");
        s.apply_deltas(&[Delta::add(q.clone())]).unwrap();
        s.apply_deltas(&[Delta::delete(q.clone())]).unwrap();

        assert_eq!(s.stats().quad_count, 0);
        assert!(s.quads_all().unwrap().is_empty());
        assert!(s.value_of(&q.object).unwrap().is_none());
    }

    #[test]
    fn shared_value_survives_one_of_two_referencing_quads_being_deleted() {
        let s = store();
        let q1 = quad("http://example.org/b");
        let q2 = Quad::new(q1.subject.clone(), q1.predicate.clone(), Value::iri("http://example.org/c"), None);
        s.apply_deltas(&[Delta::add(q1.clone()), Delta::add(q2)]).unwrap();
        s.apply_deltas(&[Delta::delete(q1.clone())]).unwrap();

        assert_eq!(s.stats().quad_count, 1);
        assert!(s.value_of(&q1.subject).unwrap().is_some());
    }

    #[test]
    fn quad_iterator_respects_subject_pattern() {
        let s = store();
        s.apply_deltas(&[Delta::add(quad("http://example.org/b")), Delta::add(quad("http://example.org/c"))])
            .unwrap();
        let pattern = Pattern {
            subject: Some(Value::iri("http://example.org/a").hash()),
            ..Default::default()
        };
        assert_eq!(s.quad_iterator(pattern).unwrap().len(), 2);

        let unrelated = Pattern {
            subject: Some(Value::iri("http://example.org/nope").hash()),
            ..Default::default()
        };
        assert!(s.quad_iterator(unrelated).unwrap().is_empty());
    }

    #[test]
    fn quad_iterator_size_tracks_unbound_pattern_via_counter() {
        let s = store();
        s.apply_deltas(&[Delta::add(quad("http://example.org/b"))]).unwrap();
        let (size, exact) = s.quad_iterator_size(Pattern::default()).unwrap();
        assert_eq!(size, 1);
        assert!(exact);
    }
}
