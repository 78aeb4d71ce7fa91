//! `Not(child, parent_all)` enumerates `parent_all \ child` and answers
//! `Contains` as `¬child.contains`. Requires a bound universe.

use std::collections::HashMap;

use quad_store::CancellationToken;

use crate::error::{IterError, IterResult};
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::{SizeEstimate, Stats};

/// Complement of `child` within `parent_all`. Graph iterator trees are
/// strictly acyclic, so `Not` always needs an explicit bound
/// universe to enumerate against rather than an implicit "everything".
#[derive(Debug)]
pub struct Not {
    parent_all: BoxedIter,
    child: BoxedIter,
    state: IterState,
}

impl Not {
    /// Build the complement of `child` within `parent_all`.
    pub fn new(parent_all: BoxedIter, child: BoxedIter) -> Self {
        Not {
            parent_all,
            child,
            state: IterState::Fresh,
        }
    }
}

impl QIter for Not {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        loop {
            cancel.check()?;
            if !self.parent_all.next(source, cancel)? {
                self.state = IterState::Exhausted;
                return Ok(false);
            }
            let candidate = self.parent_all.result().expect("next just returned true");
            if !self.child.contains(source, cancel, candidate)? {
                self.state = IterState::Iterating;
                return Ok(true);
            }
        }
    }

    fn result(&self) -> Option<Ref> {
        self.parent_all.result()
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        cancel.check()?;
        if !self.parent_all.contains(source, cancel, v)? {
            return Ok(false);
        }
        let excluded = self.child.contains(source, cancel, v)?;
        Ok(!excluded)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.parent_all.tag_results(out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        let universe = self.parent_all.stats(source);
        let excluded = self.child.stats(source);
        let size = if universe.size.value >= 0 && excluded.size.value >= 0 {
            SizeEstimate {
                value: (universe.size.value - excluded.size.value).max(0),
                exact: universe.size.exact && excluded.size.exact,
            }
        } else {
            SizeEstimate::unknown()
        };
        Stats {
            contains_cost: universe.contains_cost.saturating_add(excluded.contains_cost),
            next_cost: universe.next_cost.saturating_add(excluded.contains_cost),
            size,
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.parent_all.as_ref(), self.child.as_ref()]
    }

    fn reset(&mut self) {
        self.parent_all.reset();
        self.child.reset();
        self.state = IterState::Fresh;
    }

    fn close(&mut self) -> IterResult<()> {
        self.state = IterState::Closed;
        let a = self.parent_all.close();
        let b = self.child.close();
        a.and(b)
    }

    fn state(&self) -> IterState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::all::{All, Relation};
    use crate::fixed::Fixed;
    use quad_model::{Quad, Value};
    use quad_store::{Delta, InMemoryBackend, NodeRef, QuadStore, StoreOptions};

    fn store() -> QuadStore<InMemoryBackend> {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        s.apply_deltas(&[Delta::add(Quad::new(Value::iri("a"), Value::iri("p"), Value::iri("b"), None))])
            .unwrap();
        s
    }

    #[test]
    fn enumerates_universe_minus_child() {
        let s = store();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("a").hash());
        let universe = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let excluded = Box::new(Fixed::single(Ref::Node(a)));
        let mut not = Not::new(universe, excluded);
        let mut results = Vec::new();
        while not.next(&s, &token).unwrap() {
            results.push(not.result().unwrap());
        }
        assert_eq!(results.len(), 1);
        assert_ne!(results[0], Ref::Node(a));
    }

    #[test]
    fn contains_false_for_excluded_member() {
        let s = store();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("a").hash());
        let universe = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let excluded = Box::new(Fixed::single(Ref::Node(a)));
        let mut not = Not::new(universe, excluded);
        assert!(!not.contains(&s, &token, Ref::Node(a)).unwrap());
    }
}
