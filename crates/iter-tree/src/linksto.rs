//! `LinksTo(sub, dir)` is the dual of `HasA`: for each node in `sub`, it
//! emits quads whose `dir` component equals that node (via
//! `quad_iterator`). Its size estimate grows by a fanout constant (~20).

use std::collections::HashMap;

use quad_model::Direction;
use quad_store::indexes::{LabelPattern, Pattern};
use quad_store::CancellationToken;

use crate::error::{IterError, IterResult};
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::{SizeEstimate, Stats};
use crate::tags::TagSet;

/// The fanout constant attaches to `LinksTo`'s size growth: a
/// rough guess at how many quads share a given node in one direction,
/// used only when the store cannot yet give an exact estimate (e.g. before
/// `sub` has been consulted).
pub const FANOUT_ESTIMATE: u64 = 20;

fn pattern_for(dir: Direction, hash: quad_model::ValueHash) -> Pattern {
    let mut pattern = Pattern::default();
    match dir {
        Direction::Subject => pattern.subject = Some(hash),
        Direction::Predicate => pattern.predicate = Some(hash),
        Direction::Object => pattern.object = Some(hash),
        Direction::Label => pattern.label = LabelPattern::Present(hash),
        Direction::Any => {}
    }
    pattern
}

/// The dual of [`crate::hasa::HasA`]: walks a node-relation iterator and,
/// for each node, asks the store for every quad with that node in `dir`.
#[derive(Debug)]
pub struct LinksTo {
    sub: BoxedIter,
    dir: Direction,
    batch: Vec<quad_store::QuadRef>,
    batch_pos: usize,
    state: IterState,
    tags: TagSet,
}

impl LinksTo {
    /// Build a `LinksTo` over `sub` (a node-relation iterator) and `dir`.
    pub fn new(sub: BoxedIter, dir: Direction) -> Self {
        LinksTo {
            sub,
            dir,
            batch: Vec::new(),
            batch_pos: 0,
            state: IterState::Fresh,
            tags: TagSet::new(),
        }
    }

    /// Attach a free tag name to this node's results.
    pub fn tagged(mut self, name: impl Into<String>) -> Self {
        self.tags.free.push(name.into());
        self
    }

    fn refill_batch(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        loop {
            cancel.check()?;
            if !self.sub.next(source, cancel)? {
                return Ok(false);
            }
            let Some(node) = self.sub.result().and_then(|r| r.as_node()) else {
                continue;
            };
            self.batch = source.quad_iterator(pattern_for(self.dir, node.hash()))?;
            self.batch_pos = 0;
            if !self.batch.is_empty() {
                return Ok(true);
            }
        }
    }
}

impl QIter for LinksTo {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        loop {
            if self.batch_pos < self.batch.len() {
                self.batch_pos += 1;
                self.state = IterState::Iterating;
                return Ok(true);
            }
            if !self.refill_batch(source, cancel)? {
                self.state = IterState::Exhausted;
                return Ok(false);
            }
        }
    }

    fn result(&self) -> Option<Ref> {
        if self.batch_pos == 0 {
            return None;
        }
        self.batch.get(self.batch_pos - 1).copied().map(Ref::Quad)
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        let Some(quad) = v.as_quad() else {
            return Ok(false);
        };
        let Some(component) = quad.component(self.dir) else {
            return Ok(false);
        };
        let found = self.sub.contains(source, cancel, Ref::Node(component))?;
        if found {
            self.batch = vec![quad];
            self.batch_pos = 1;
            self.state = IterState::Iterating;
        }
        Ok(found)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.tags.populate(self.result(), out);
        self.sub.tag_results(out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        let sub_stats = self.sub.stats(source);
        let size = if sub_stats.size.value >= 0 {
            SizeEstimate::approximate(sub_stats.size.value as u64 * FANOUT_ESTIMATE)
        } else {
            SizeEstimate::unknown()
        };
        Stats {
            contains_cost: sub_stats.contains_cost.saturating_add(1),
            next_cost: sub_stats.next_cost.saturating_mul(FANOUT_ESTIMATE).max(1),
            size,
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.sub.as_ref()]
    }

    fn reset(&mut self) {
        self.sub.reset();
        self.batch.clear();
        self.batch_pos = 0;
        self.state = IterState::Fresh;
    }

    fn close(&mut self) -> IterResult<()> {
        self.state = IterState::Closed;
        self.sub.close()
    }

    fn state(&self) -> IterState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use quad_model::{Quad, Value};
    use quad_store::{Delta, InMemoryBackend, QuadStore, StoreOptions};

    fn store() -> QuadStore<InMemoryBackend> {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        s.apply_deltas(&[
            Delta::add(Quad::new(Value::iri("a"), Value::iri("p"), Value::iri("b"), None)),
            Delta::add(Quad::new(Value::iri("a"), Value::iri("p"), Value::iri("c"), None)),
        ])
            .unwrap();
        s
    }

    #[test]
    fn emits_every_quad_whose_subject_matches_sub() {
        let s = store();
        let token = CancellationToken::new();
        let a = s.value_of(&Value::iri("a")).unwrap().unwrap();
        let sub = Box::new(Fixed::single(Ref::Node(a)));
        let mut links = LinksTo::new(sub, Direction::Subject);
        let mut count = 0;
        while links.next(&s, &token).unwrap() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn contains_checks_subs_membership_of_the_quads_component() {
        let s = store();
        let token = CancellationToken::new();
        let a = s.value_of(&Value::iri("a")).unwrap().unwrap();
        let sub = Box::new(Fixed::single(Ref::Node(a)));
        let mut links = LinksTo::new(sub, Direction::Subject);
        let q = s.quads_all().unwrap()[0];
        assert!(links.contains(&s, &token, Ref::Quad(q)).unwrap());
    }
}
