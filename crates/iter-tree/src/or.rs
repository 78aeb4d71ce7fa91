//! `Or(children)` is a union; with the short-circuit flag set, it yields
//! from the first non-empty child only. Its size estimate is the sum of
//! children's sizes, or the max when short-circuiting.

use std::collections::HashMap;

use quad_store::CancellationToken;

use crate::error::{IterError, IterResult};
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::{SizeEstimate, Stats};

/// Union of its children. In the default (non-short-circuit) mode this
/// concatenates each child's results in order; in short-circuit mode the
/// first child that produces anything is committed to and every other
/// child is never consulted again (yields from first
/// non-empty child only).
#[derive(Debug)]
pub struct Or {
    children: Vec<BoxedIter>,
    short_circuit: bool,
    active: usize,
    committed: Option<usize>,
    state: IterState,
}

impl Or {
    /// Build a union over `children` in plain (non-short-circuit) mode.
    pub fn new(children: Vec<BoxedIter>) -> Self {
        Or {
            children,
            short_circuit: false,
            active: 0,
            committed: None,
            state: IterState::Fresh,
        }
    }

    /// Build a union that commits to the first child with any result
    /// (short-circuit flag).
    pub fn short_circuit(children: Vec<BoxedIter>) -> Self {
        Or {
            children,
            short_circuit: true,
            active: 0,
            committed: None,
            state: IterState::Fresh,
        }
    }
}

impl QIter for Or {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        if self.children.is_empty() {
            self.state = IterState::Exhausted;
            return Ok(false);
        }

        if self.short_circuit {
            if let Some(idx) = self.committed {
                cancel.check()?;
                let advanced = self.children[idx].next(source, cancel)?;
                self.state = if advanced { IterState::Iterating } else { IterState::Exhausted };
                return Ok(advanced);
            }
            while self.active < self.children.len() {
                cancel.check()?;
                if self.children[self.active].next(source, cancel)? {
                    self.committed = Some(self.active);
                    self.state = IterState::Iterating;
                    return Ok(true);
                }
                self.active += 1;
            }
            self.state = IterState::Exhausted;
            return Ok(false);
        }

        while self.active < self.children.len() {
            cancel.check()?;
            if self.children[self.active].next(source, cancel)? {
                self.state = IterState::Iterating;
                return Ok(true);
            }
            self.active += 1;
        }
        self.state = IterState::Exhausted;
        Ok(false)
    }

    fn result(&self) -> Option<Ref> {
        let idx = self.committed.unwrap_or(self.active);
        self.children.get(idx).and_then(|c| c.result())
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        for (idx, child) in self.children.iter_mut().enumerate() {
            cancel.check()?;
            if child.contains(source, cancel, v)? {
                self.active = idx;
                self.state = IterState::Iterating;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next_path(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        let idx = self.committed.unwrap_or(self.active);
        match self.children.get_mut(idx) {
            Some(child) => child.next_path(source, cancel),
            None => Ok(false),
        }
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        for child in &self.children {
            child.tag_results(out);
        }
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        let mut next_cost = 0u64;
        let mut contains_cost = 0u64;
        let mut sizes = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let s = child.stats(source);
            next_cost = next_cost.saturating_add(s.next_cost);
            contains_cost = contains_cost.saturating_add(s.contains_cost);
            sizes.push(s.size);
        }
        let size = if self.short_circuit {
            sizes
                .iter()
                .max_by_key(|s| s.value)
                .copied()
                .unwrap_or_else(SizeEstimate::unknown)
        } else {
            let mut total = 0i64;
            let mut exact = true;
            for s in &sizes {
                if s.value < 0 {
                    exact = false;
                } else {
                    total += s.value;
                }
                exact = exact && s.exact;
            }
            SizeEstimate { value: total, exact }
        };
        Stats {
            contains_cost,
            next_cost,
            size,
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        self.children.iter().map(|c| c.as_ref()).collect()
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
        self.active = 0;
        self.committed = None;
        self.state = IterState::Fresh;
    }

    fn close(&mut self) -> IterResult<()> {
        self.state = IterState::Closed;
        let mut first_err = None;
        for child in &mut self.children {
            if let Err(e) = child.close() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn state(&self) -> IterState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use quad_model::Value;
    use quad_store::{InMemoryBackend, NodeRef, QuadStore, StoreOptions};

    fn store() -> QuadStore<InMemoryBackend> {
        QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap()
    }

    #[test]
    fn plain_union_concatenates_children() {
        let s = store();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("a").hash());
        let b = NodeRef::new(Value::iri("b").hash());
        let mut or = Or::new(vec![Box::new(Fixed::single(Ref::Node(a))), Box::new(Fixed::single(Ref::Node(b)))]);
        assert!(or.next(&s, &token).unwrap());
        assert_eq!(or.result(), Some(Ref::Node(a)));
        assert!(or.next(&s, &token).unwrap());
        assert_eq!(or.result(), Some(Ref::Node(b)));
        assert!(!or.next(&s, &token).unwrap());
    }

    #[test]
    fn short_circuit_commits_to_first_nonempty_child() {
        let s = store();
        let token = CancellationToken::new();
        let empty = Fixed::new(vec![]);
        let a = NodeRef::new(Value::iri("a").hash());
        let b = NodeRef::new(Value::iri("b").hash());
        let mut or = Or::short_circuit(vec![
            Box::new(empty),
            Box::new(Fixed::new(vec![Ref::Node(a), Ref::Node(b)])),
        ]);
        assert!(or.next(&s, &token).unwrap());
        assert_eq!(or.result(), Some(Ref::Node(a)));
        assert!(or.next(&s, &token).unwrap());
        assert_eq!(or.result(), Some(Ref::Node(b)));
        assert!(!or.next(&s, &token).unwrap());
    }

    #[test]
    fn contains_checks_any_child() {
        let s = store();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("a").hash());
        let b = NodeRef::new(Value::iri("b").hash());
        let mut or = Or::new(vec![Box::new(Fixed::single(Ref::Node(a)))]);
        assert!(or.contains(&s, &token, Ref::Node(a)).unwrap());
        assert!(!or.contains(&s, &token, Ref::Node(b)).unwrap());
    }
}
