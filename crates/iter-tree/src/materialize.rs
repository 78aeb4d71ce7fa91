//! `Materialize(child)` caches all of its child's results on the first
//! `Next` pass and replays them afterward, answering `Contains` from a
//! hash set. This breaks cycles that backward-propagating optimizers
//! would otherwise chase forever.

use std::collections::HashMap;

use quad_store::CancellationToken;
use rustc_hash::FxHashSet;

use crate::error::{IterError, IterResult};
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::{SizeEstimate, Stats};
use crate::tags::TagSet;

/// Drains `child` into an in-memory cache on first use, then serves every
/// further `next`/`contains` from that cache without touching `child`
/// again.
#[derive(Debug)]
pub struct Materialize {
    child: BoxedIter,
    cache: Option<Vec<Ref>>,
    lookup: Option<FxHashSet<Ref>>,
    pos: Option<usize>,
    state: IterState,
    tags: TagSet,
}

impl Materialize {
    /// Wrap `child`, deferring materialization to the first `next`/`contains`.
    pub fn new(child: BoxedIter) -> Self {
        Materialize {
            child,
            cache: None,
            lookup: None,
            pos: None,
            state: IterState::Fresh,
            tags: TagSet::new(),
        }
    }

    /// Attach a free tag name to this node's results.
    pub fn tagged(mut self, name: impl Into<String>) -> Self {
        self.tags.free.push(name.into());
        self
    }

    fn ensure_materialized(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<()> {
        if self.cache.is_some() {
            return Ok(());
        }
        self.child.reset();
        let mut items = Vec::new();
        while self.child.next(source, cancel)? {
            if let Some(r) = self.child.result() {
                items.push(r);
            }
        }
        self.lookup = Some(items.iter().copied().collect());
        self.cache = Some(items);
        Ok(())
    }
}

impl QIter for Materialize {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        self.ensure_materialized(source, cancel)?;
        let items = self.cache.as_ref().expect("materialized above");
        let next_pos = self.pos.map(|p| p + 1).unwrap_or(0);
        if next_pos < items.len() {
            self.pos = Some(next_pos);
            self.state = IterState::Iterating;
            Ok(true)
        } else {
            self.pos = Some(items.len());
            self.state = IterState::Exhausted;
            Ok(false)
        }
    }

    fn result(&self) -> Option<Ref> {
        self.pos.and_then(|p| self.cache.as_ref()?.get(p).copied())
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        self.ensure_materialized(source, cancel)?;
        let found = self.lookup.as_ref().expect("materialized above").contains(&v);
        if found {
            let items = self.cache.as_ref().expect("materialized above");
            self.pos = items.iter().position(|r| *r == v);
            self.state = IterState::Iterating;
        }
        Ok(found)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.tags.populate(self.result(), out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        match &self.cache {
            Some(items) => Stats {
                contains_cost: 1,
                next_cost: 1,
                size: SizeEstimate::exact(items.len() as u64),
            },
            None => {
                let child = self.child.stats(source);
                Stats {
                    contains_cost: 1,
                    next_cost: 1,
                    size: child.size,
                }
            }
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.child.as_ref()]
    }

    fn reset(&mut self) {
        self.pos = None;
        self.state = IterState::Fresh;
    }

    fn close(&mut self) -> IterResult<()> {
        self.state = IterState::Closed;
        self.child.close()
    }

    fn state(&self) -> IterState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::all::{All, Relation};
    use quad_model::{Quad, Value};
    use quad_store::{Delta, InMemoryBackend, QuadStore, StoreOptions};

    fn store() -> QuadStore<InMemoryBackend> {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        s.apply_deltas(&[Delta::add(Quad::new(Value::iri("a"), Value::iri("p"), Value::iri("b"), None))])
            .unwrap();
        s
    }

    #[test]
    fn replays_cached_results_without_revisiting_child() {
        let s = store();
        let token = CancellationToken::new();
        let all = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let mut mat = Materialize::new(all);
        assert!(mat.next(&s, &token).unwrap());
        assert!(mat.next(&s, &token).unwrap());
        assert!(!mat.next(&s, &token).unwrap());
        mat.reset();
        let mut count = 0;
        while mat.next(&s, &token).unwrap() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn contains_uses_hash_lookup() {
        let s = store();
        let token = CancellationToken::new();
        let all = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let mut mat = Materialize::new(all);
        let a = s.value_of(&Value::iri("a")).unwrap().unwrap();
        assert!(mat.contains(&s, &token, Ref::Node(a)).unwrap());
    }
}
