//! `Fixed(set)` enumerates a stored ref set in insertion order; the
//! order is irrelevant to semantics.

use std::collections::HashMap;

use quad_store::CancellationToken;

use crate::error::{IterError, IterResult};
use crate::iterator::QIter;
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::{SizeEstimate, Stats};
use crate::tags::TagSet;

/// A literal, caller-supplied set of refs — how a shape's `Fixed(Vec<Ref>)`
/// and a constant-valued `QuadFilter` lower to the iterator tree.
#[derive(Debug)]
pub struct Fixed {
    items: Vec<Ref>,
    pos: Option<usize>,
    state: IterState,
    tags: TagSet,
}

impl Fixed {
    /// Build a `Fixed` iterator over `items`, preserving insertion order.
    pub fn new(items: Vec<Ref>) -> Self {
        Fixed {
            items,
            pos: None,
            state: IterState::Fresh,
            tags: TagSet::new(),
        }
    }

    /// A `Fixed` over a single ref — the common case the optimizer
    /// special-cases (LinksTo(Fixed{single}, dir)).
    pub fn single(item: Ref) -> Self {
        Fixed::new(vec![item])
    }

    /// Attach a free tag name to this node's results.
    pub fn tagged(mut self, name: impl Into<String>) -> Self {
        self.tags.free.push(name.into());
        self
    }

    /// The items this iterator was built over, for the optimizer to
    /// pattern-match on without advancing the iterator.
    pub fn items(&self) -> &[Ref] {
        &self.items
    }
}

impl QIter for Fixed {
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
        if let Some(idx) = self.items.iter().position(|r| *r == v) {
            self.pos = Some(idx);
            self.state = IterState::Iterating;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.tags.populate(self.result(), out);
    }

    fn stats(&self, _source: &dyn QuadSource) -> Stats {
        Stats {
            contains_cost: 1,
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
    use quad_model::Value;
    use quad_store::{InMemoryBackend, NodeRef, QuadStore, StoreOptions};

    #[test]
    fn enumerates_in_insertion_order() {
        let store = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("http://example.org/a").hash());
        let b = NodeRef::new(Value::iri("http://example.org/b").hash());
        let mut fixed = Fixed::new(vec![Ref::Node(a), Ref::Node(b)]);
        assert!(fixed.next(&store, &token).unwrap());
        assert_eq!(fixed.result(), Some(Ref::Node(a)));
        assert!(fixed.next(&store, &token).unwrap());
        assert_eq!(fixed.result(), Some(Ref::Node(b)));
        assert!(!fixed.next(&store, &token).unwrap());
    }

    #[test]
    fn contains_finds_membership_without_prior_next() {
        let store = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("http://example.org/a").hash());
        let missing = NodeRef::new(Value::iri("http://example.org/z").hash());
        let mut fixed = Fixed::single(Ref::Node(a));
        assert!(fixed.contains(&store, &token, Ref::Node(a)).unwrap());
        assert!(!fixed.contains(&store, &token, Ref::Node(missing)).unwrap());
    }
}
