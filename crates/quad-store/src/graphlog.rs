//! Shared delta classification and refcount planning (:
//! "a shared graph-log utility usable by every backend").
//!
//! Both [`crate::store::QuadStore::apply_deltas`] and any backend that
//! wants to apply its own batches go through [`plan_deltas`] so that
//! classification, duplicate/missing handling, and refcount bookkeeping
//! happen exactly once, in one place.

use std::collections::HashMap;

use quad_model::{QuadKey, ValueHash};

use crate::delta::{Action, Classification, Delta, IgnorePolicy};
use crate::error::{DeltaError, DeltaErrorKind};

/// One delta, paired with how it was classified against the state at the
/// time it was processed (which may itself be a prior delta in the same
/// batch — : "a batch is evaluated in order, each delta seeing the
/// effect of the ones before it").
#[derive(Debug, Clone)]
pub struct ClassifiedDelta {
    /// The original delta.
    pub delta: Delta,
    /// Its classification.
    pub classification: Classification,
}

/// The result of planning a batch: the classified deltas in order, plus
/// the net per-value refcount change the batch implies (step 3).
#[derive(Debug, Clone, Default)]
pub struct GraphLogPlan {
    /// Every delta in the batch, classified in order.
    pub classified: Vec<ClassifiedDelta>,
    /// Net change in reference count per value touched by a non-noop
    /// delta. A value whose count would reach zero is eligible for GC
    /// (step 5).
    pub node_refcount_deltas: HashMap<ValueHash, i64>,
}

impl GraphLogPlan {
    /// The non-noop deltas only, in order — what actually needs writing.
    pub fn effective(&self) -> impl Iterator<Item = &ClassifiedDelta> {
        self.classified.iter().filter(|c| !c.classification.is_noop())
    }
}

/// Classify every delta in `deltas` against `is_live` (a closure answering
/// "is this quad key currently live in the store"), honoring intra-batch
/// ordering, and accumulate the refcount deltas implied by the non-noop
/// ones.
///
/// Returns the first [`DeltaError`] encountered if a duplicate `Add` or
/// missing `Delete` is not covered by `policy`; the whole batch is meant to
/// be discarded by the caller in that case (atomic, all or
/// nothing).
pub fn plan_deltas(
    deltas: &[Delta],
    mut is_live: impl FnMut(&QuadKey) -> bool,
    policy: IgnorePolicy,
) -> Result<GraphLogPlan, DeltaError> {
    let mut overlay: HashMap<QuadKey, bool> = HashMap::new();
    let mut classified = Vec::with_capacity(deltas.len());
    let mut node_refcount_deltas: HashMap<ValueHash, i64> = HashMap::new();

    for delta in deltas {
        let key = delta.quad.key();
        let live = *overlay.entry(key).or_insert_with(|| is_live(&key));
        let classification = Classification::classify(delta.action, live);

        match classification {
            Classification::DuplicateAdd if !policy.ignore_duplicate => {
                return Err(DeltaError {
                    quad: delta.quad.clone(),
                    kind: DeltaErrorKind::QuadExists,
                });
            }
            Classification::MissingDelete if !policy.ignore_missing => {
                return Err(DeltaError {
                    quad: delta.quad.clone(),
                    kind: DeltaErrorKind::QuadNotExist,
                });
            }
            _ => {}
        }

        if !classification.is_noop() {
            let sign: i64 = match delta.action {
                Action::Add => 1,
                Action::Delete => -1,
            };
            for (_, hash) in delta.quad.component_hashes() {
                *node_refcount_deltas.entry(hash).or_insert(0) += sign;
            }
            overlay.insert(key, matches!(classification, Classification::NewAdd));
        }

        classified.push(ClassifiedDelta {
            delta: delta.clone(),
            classification,
        });
    }

    Ok(GraphLogPlan {
        classified,
        node_refcount_deltas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quad_model::Value;

    fn quad(o: &str) -> quad_model::Quad {
        quad_model::Quad::new(
            Value::iri("http://example.org/a"),
            Value::iri("http://example.org/p"),
            Value::iri(o),
            None,
        )
    }

    #[test]
    fn duplicate_add_without_policy_errors() {
        let deltas = vec![Delta::add(quad("http://example.org/b"))];
        let err = plan_deltas(&deltas, |_| true, IgnorePolicy::default()).unwrap_err();
        assert_eq!(err.kind, DeltaErrorKind::QuadExists);
    }

    #[test]
    fn duplicate_add_with_policy_is_noop() {
        let deltas = vec![Delta::add(quad("http://example.org/b"))];
        let policy = IgnorePolicy {
            ignore_duplicate: true,
            ignore_missing: false,
        };
        let plan = plan_deltas(&deltas, |_| true, policy).unwrap();
        assert_eq!(plan.effective().count(), 0);
        assert!(plan.node_refcount_deltas.is_empty());
    }

    #[test]
    fn missing_delete_without_policy_errors() {
        let deltas = vec![Delta::delete(quad("http://example.org/b"))];
        let err = plan_deltas(&deltas, |_| false, IgnorePolicy::default()).unwrap_err();
        assert_eq!(err.kind, DeltaErrorKind::QuadNotExist);
    }

    #[test]
    fn add_then_delete_in_same_batch_nets_to_noop_refcounts() {
        let q = quad("http://example.org/b");
        let deltas = vec![Delta::add(q.clone()), Delta::delete(q)];
        let plan = plan_deltas(&deltas, |_| false, IgnorePolicy::default()).unwrap();
        assert_eq!(plan.effective().count(), 2);
        for (_, delta) in &plan.node_refcount_deltas {
            assert_eq!(*delta, 0);
        }
    }

    #[test]
    fn fresh_add_increments_every_component() {
        let deltas = vec![Delta::add(quad("http://example.org/b"))];
        let plan = plan_deltas(&deltas, |_| false, IgnorePolicy::default()).unwrap();
        assert_eq!(plan.node_refcount_deltas.len(), 3);
        assert!(plan.node_refcount_deltas.values().all(|&v| v == 1));
    }
}
