//! `All(relation)` enumerates every ref in the given relation, nodes or
//! quads; `Contains` is always true for any ref of the right kind.

use std::collections::HashMap;

use quad_store::CancellationToken;

use crate::error::{IterError, IterResult};
use crate::iterator::QIter;
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::{SizeEstimate, Stats};
use crate::tags::TagSet;

/// Which store-wide relation an `All` scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `QuadSource::nodes_all`.
    Nodes,
    /// `QuadSource::quads_all`.
    Quads,
}

/// Scans every ref of one relation, in whatever order the backend yields
/// them (order irrelevant for semantics).
#[derive(Debug)]
pub struct All {
    relation: Relation,
    items: Vec<Ref>,
    pos: Option<usize>,
    state: IterState,
    tags: TagSet,
}

impl All {
    /// Build and eagerly fetch every ref in `relation` from `source`.
    pub fn new(source: &dyn QuadSource, relation: Relation) -> IterResult<Self> {
        let items = match relation {
            Relation::Nodes => source.nodes_all()?.into_iter().map(Ref::Node).collect(),
            Relation::Quads => source.quads_all()?.into_iter().map(Ref::Quad).collect(),
        };
        Ok(All {
            relation,
            items,
            pos: None,
            state: IterState::Fresh,
            tags: TagSet::new(),
        })
    }

    /// Attach a free tag name to this node's results.
    pub fn tagged(mut self, name: impl Into<String>) -> Self {
        self.tags.free.push(name.into());
        self
    }

    fn matches_relation(&self, v: Ref) -> bool {
        matches!(
            (self.relation, v),
            (Relation::Nodes, Ref::Node(_)) | (Relation::Quads, Ref::Quad(_))
        )
    }
}

impl QIter for All {
    fn next(&mut self, _source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        cancel.check()?;
        let next_pos = self.pos.map(|p| p + 1).unwrap_or(0);
        if next_pos < self.items.len() {
            self.pos = Some(next_pos);
            self.state = IterState::Iterating;
            Ok(true)
        } else {
            self.pos = Some(self.items.len());
            self.state = IterState::Exhausted;
            Ok(false)
        }
    }

    fn result(&self) -> Option<Ref> {
        self.pos.and_then(|p| self.items.get(p).copied())
    }

    fn contains(&mut self, _source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        cancel.check()?;
        if self.matches_relation(v) {
            if let Some(idx) = self.items.iter().position(|r| *r == v) {
                self.pos = Some(idx);
                self.state = IterState::Iterating;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.tags.populate(self.result(), out);
    }

    fn stats(&self, _source: &dyn QuadSource) -> Stats {
        Stats {
            contains_cost: self.items.len().max(1) as u64,
            next_cost: 1,
            size: SizeEstimate::exact(self.items.len() as u64),
        }
    }

    fn reset(&mut self) {
        self.pos = None;
        self.state = IterState::Fresh;
    }

    fn close(&mut self) -> IterResult<()> {
        self.state = IterState::Closed;
        Ok(())
    }

    fn state(&self) -> IterState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quad_model::{Quad, Value};
    use quad_store::{InMemoryBackend, QuadStore, StoreOptions};

    fn store_with_one_quad() -> QuadStore<InMemoryBackend> {
        let store = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        store
            .apply_deltas(&[quad_store::Delta::add(Quad::new(
                Value::iri("http://example.org/a"),
                Value::iri("http://example.org/p"),
                Value::iri("http://example.org/b"),
                None,
            ))])
            .unwrap();
        store
    }

    #[test]
    fn all_nodes_yields_every_distinct_value() {
        let store = store_with_one_quad();
        let token = CancellationToken::new();
        let mut all = All::new(&store, Relation::Nodes).unwrap();
        let mut count = 0;
        while all.next(&store, &token).unwrap() {
            count += 1;
        }
        assert_eq!(count, 2);
        assert!(!all.next(&store, &token).unwrap());
    }

    #[test]
    fn all_quads_contains_checks_membership() {
        let store = store_with_one_quad();
        let token = CancellationToken::new();
        let mut all = All::new(&store, Relation::Quads).unwrap();
        let q = store.quads_all().unwrap()[0];
        assert!(all.contains(&store, &token, Ref::Quad(q)).unwrap());
        assert_eq!(all.result(), Some(Ref::Quad(q)));
    }

    #[test]
    fn reset_returns_to_fresh() {
        let store = store_with_one_quad();
        let token = CancellationToken::new();
        let mut all = All::new(&store, Relation::Nodes).unwrap();
        all.next(&store, &token).unwrap();
        all.reset();
        assert_eq!(all.state, IterState::Fresh);
        assert!(all.result().is_none());
    }
}
