//! `QuadWriter`: a thin façade over [`crate::QuadStore::apply_deltas`]
//! that batches deltas before flushing.
//!
//! Individual `add_quad`/`remove_quad` calls are just single-delta batches.
//! [`QuadWriter::add_quad_set`] exists for bulk loads: rather than one
//! `apply_deltas` call per row, it accumulates deltas up to
//! [`crate::options::StoreOptions::batch_size`] (cayley's `graph.BatchWriter`
//! default of 300) before flushing, so a loader calling it in a loop gets
//! batching for free.

use quad_model::{Quad, Value};

use crate::delta::{Action, Delta};
use crate::error::{DeltaError, DeltaErrorKind};
use crate::indexes::{LabelPattern, Pattern};
use crate::observability::{track_operation, OperationType};
use crate::store::QuadStore;
use crate::StorageBackend;

/// A pre-staged batch of deltas, applied together by
/// [`QuadWriter::apply_transaction`] (A `Transaction` is a
/// pre-staged batch).
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    deltas: Vec<Delta>,
}

impl Transaction {
    /// An empty transaction.
    pub fn new() -> Self {
        Transaction::default()
    }

    /// Stage an add.
    pub fn add_quad(&mut self, quad: Quad) -> &mut Self {
        self.deltas.push(Delta::add(quad));
        self
    }

    /// Stage a delete.
    pub fn remove_quad(&mut self, quad: Quad) -> &mut Self {
        self.deltas.push(Delta::delete(quad));
        self
    }

    /// The staged deltas, in the order they were added.
    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    /// Number of staged deltas.
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Whether no deltas are staged.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// Serializes `add_quad`/`remove_quad`/`add_quad_set`/`apply_transaction`
/// into [`crate::QuadStore::apply_deltas`] calls.
pub struct QuadWriter<'a, B: StorageBackend> {
    store: &'a QuadStore<B>,
    pending: Vec<Delta>,
    batch_size: usize,
}

impl<'a, B: StorageBackend> QuadWriter<'a, B> {
    /// Wrap a store, batching at its configured `batch_size`.
    pub fn new(store: &'a QuadStore<B>) -> Self {
        let batch_size = store.options().batch_size;
        QuadWriter {
            store,
            pending: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Add one quad, applied immediately.
    pub fn add_quad(&self, quad: Quad) -> Result<(), DeltaError> {
        self.store.apply_deltas(&[Delta::add(quad)])
    }

    /// Remove one quad, applied immediately.
    pub fn remove_quad(&self, quad: Quad) -> Result<(), DeltaError> {
        self.store.apply_deltas(&[Delta::delete(quad)])
    }

    /// Stage `quad` for a batched add, flushing automatically once
    /// `batch_size` deltas have accumulated, in the spirit of cayley's
    /// `BatchWriter`. Callers must call [`QuadWriter::flush`] after
    /// the last call to apply any remainder.
    pub fn add_quad_set(&mut self, quads: impl IntoIterator<Item = Quad>) -> Result<(), DeltaError> {
        track_operation(OperationType::AddQuadSet, || {
            for quad in quads {
                self.pending.push(Delta::add(quad));
                if self.pending.len() >= self.batch_size {
                    self.flush()?;
                }
            }
            Ok(())
        })
    }

    /// Apply any deltas staged by [`QuadWriter::add_quad_set`] that have not
    /// yet been flushed.
    pub fn flush(&mut self) -> Result<(), DeltaError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        self.store.apply_deltas(&batch)
    }

    /// Apply a pre-staged [`Transaction`] atomically.
    pub fn apply_transaction(&self, txn: &Transaction) -> Result<(), DeltaError> {
        self.store.apply_deltas(&txn.deltas)
    }

    /// Remove every live quad mentioning `value` in any direction; this
    /// is equivalent to issuing a Delete for each one.
    ///
    /// Open question resolved here: when the store's
    /// `ignore_missing` policy is set and `value` turns out to reference
    /// zero live quads, this returns `Ok(())` rather than
    /// `NodeNotExists` — consistent with `ignore_missing` meaning "a
    /// no-op delete is not an error" applied uniformly to the decomposed
    /// per-quad deletes. Without `ignore_missing`, zero affected quads is
    /// reported as `NodeNotExists` since the caller asked to remove a node
    /// that was not actually referenced.
    pub fn remove_node(&self, value: &Value) -> Result<(), DeltaError> {
        track_operation(OperationType::RemoveNode, || {
            let hash = value.hash();
            let mut deltas = Vec::new();
            for dir in [
                quad_model::Direction::Subject,
                quad_model::Direction::Predicate,
                quad_model::Direction::Object,
            ] {
                let pattern = Pattern {
                    subject: (dir == quad_model::Direction::Subject).then_some(hash),
                    predicate: (dir == quad_model::Direction::Predicate).then_some(hash),
                    object: (dir == quad_model::Direction::Object).then_some(hash),
                    label: LabelPattern::Any,
                };
                for quad_ref in self.store.quad_iterator(pattern).map_err(|e| DeltaError {
                    quad: empty_quad(value),
                    kind: e.into(),
                })? {
                    if let Some(quad) = self.materialize(quad_ref)? {
                        deltas.push(Delta::delete(quad));
                    }
                }
            }
            let label_pattern = Pattern {
                label: LabelPattern::Present(hash),
                ..Default::default()
            };
            for quad_ref in self.store.quad_iterator(label_pattern).map_err(|e| DeltaError {
                quad: empty_quad(value),
                kind: e.into(),
            })? {
                if let Some(quad) = self.materialize(quad_ref)? {
                    deltas.push(Delta::delete(quad));
                }
            }

            dedup_by_key(&mut deltas);

            if deltas.is_empty() {
                if self.store.options().ignore_policy.ignore_missing {
                    return Ok(());
                }
                return Err(DeltaError {
                    quad: empty_quad(value),
                    kind: DeltaErrorKind::NodeNotExists,
                });
            }

            self.store.apply_deltas(&deltas)
        })
    }

    fn materialize(&self, quad_ref: crate::noderef::QuadRef) -> Result<Option<Quad>, DeltaError> {
        let Some(refs) = self.store.quad(quad_ref).map_err(|e| DeltaError {
            quad: empty_quad_unit(),
            kind: e.into(),
        })?
        else {
            return Ok(None);
        };
        let resolve = |r: crate::noderef::NodeRef| -> Result<Value, DeltaError> {
            self.store
                .name_of(r)
                .map_err(|e| DeltaError {
                    quad: empty_quad_unit(),
                    kind: e.into(),
                })?
                .ok_or_else(|| DeltaError {
                    quad: empty_quad_unit(),
                    kind: DeltaErrorKind::NodeNotExists,
                })
        };
        let subject = resolve(refs.subject)?;
        let predicate = resolve(refs.predicate)?;
        let object = resolve(refs.object)?;
        let label = refs.label.map(resolve).transpose()?;
        Ok(Some(Quad::new(subject, predicate, object, label)))
    }
}

fn dedup_by_key(deltas: &mut Vec<Delta>) {
    let mut seen = std::collections::HashSet::new();
    deltas.retain(|d| seen.insert(d.quad.key()));
}

fn empty_quad(value: &Value) -> Quad {
    Quad::new(value.clone(), Value::plain(""), Value::plain(""), None)
}

fn empty_quad_unit() -> Quad {
    Quad::new(Value::plain(""), Value::plain(""), Value::plain(""), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryBackend;
    use crate::options::StoreOptions;

    fn store() -> QuadStore<InMemoryBackend> {
        QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap()
    }

    fn quad(s: &str, o: &str) -> Quad {
        Quad::new(Value::iri(s), Value::iri("http://example.org/p"), Value::iri(o), None)
    }

    #[test]
    fn add_quad_set_batches_and_flushes() {
        let s = store();
        let mut writer = QuadWriter::new(&s);
        writer.batch_size = 2;
        writer
            .add_quad_set(vec![
                quad("http://example.org/a", "http://example.org/b"),
                quad("http://example.org/a", "http://example.org/c"),
                quad("http://example.org/a", "http://example.org/d"),
            ])
            .unwrap();
        // Two flushed automatically (batch_size=2), one still pending.
        assert_eq!(s.stats().quad_count, 2);
        writer.flush().unwrap();
        assert_eq!(s.stats().quad_count, 3);
    }

    #[test]
    fn apply_transaction_is_all_or_nothing() {
        let s = store();
        let writer = QuadWriter::new(&s);
        let q = quad("http://example.org/a", "http://example.org/b");
        writer.add_quad(q.clone()).unwrap();

        let mut txn = Transaction::new();
        txn.add_quad(quad("http://example.org/a", "http://example.org/e"));
        txn.add_quad(q); // duplicate, no ignore_dup configured
        let err = writer.apply_transaction(&txn).unwrap_err();
        assert_eq!(err.kind, DeltaErrorKind::QuadExists);
        // Pre-state preserved: the first quad in the transaction was not
        // committed either, since apply_deltas is atomic.
        assert_eq!(s.stats().quad_count, 1);
    }

    #[test]
    fn remove_node_deletes_every_referencing_quad() {
        let s = store();
        let writer = QuadWriter::new(&s);
        writer.add_quad(quad("http://example.org/a", "http://example.org/b")).unwrap();
        writer.add_quad(quad("http://example.org/a", "http://example.org/c")).unwrap();
        writer.remove_node(&Value::iri("http://example.org/a")).unwrap();
        assert_eq!(s.stats().quad_count, 0);
    }

    #[test]
    fn remove_node_on_absent_value_errors_without_ignore_missing() {
        let s = store();
        let writer = QuadWriter::new(&s);
        let err = writer.remove_node(&Value::iri("http://example.org/nope")).unwrap_err();
        assert_eq!(err.kind, DeltaErrorKind::NodeNotExists);
    }

    #[test]
    fn remove_node_on_absent_value_is_noop_with_ignore_missing() {
        let s = QuadStore::open(
            InMemoryBackend::new(),
            StoreOptions::default().with_ignore_policy(crate::delta::IgnorePolicy {
                ignore_duplicate: false,
                ignore_missing: true,
            }),
        )
            .unwrap();
        let writer = QuadWriter::new(&s);
        writer.remove_node(&Value::iri("http://example.org/nope")).unwrap();
    }
}
