//! `And(children)` drives `Next` on a chosen primary child and checks
//! `Contains` on the rest. The optimizer picks the primary child by
//! ascending `Stats.next_cost * size`.

use std::collections::HashMap;

use quad_store::CancellationToken;

use crate::error::{IterError, IterResult};
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::{SizeEstimate, Stats};

/// Intersection of its children: one child drives iteration ("primary"),
/// the rest are only ever probed with `contains` ("Two-mode
/// cursor" duality is exactly what makes this possible).
#[derive(Debug)]
pub struct And {
    children: Vec<BoxedIter>,
    primary: usize,
    state: IterState,
}

impl And {
    /// Build an intersection over `children`, choosing the primary by
    /// ascending `next_cost * size` (tie-break rules): a
    /// child that cannot answer `contains` cheaply is never picked ahead
    /// of one that can, since ties favor the higher `contains_cost /
    /// next_cost` ratio.
    pub fn new(children: Vec<BoxedIter>, source: &dyn QuadSource) -> Self {
        let primary = Self::choose_primary(&children, source);
        And {
            children,
            primary,
            state: IterState::Fresh,
        }
    }

    fn choose_primary(children: &[BoxedIter], source: &dyn QuadSource) -> usize {
        let mut best = 0usize;
        let mut best_cost = u64::MAX;
        let mut best_ratio = f64::MIN;
        for (idx, child) in children.iter().enumerate() {
            let stats = child.stats(source);
            let cost = stats.next_cost_times_size();
            let ratio = stats.contains_to_next_ratio();
            if cost < best_cost || (cost == best_cost && ratio > best_ratio) {
                best = idx;
                best_cost = cost;
                best_ratio = ratio;
            }
        }
        best
    }

    fn others_contain(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        for (idx, child) in self.children.iter_mut().enumerate() {
            if idx == self.primary {
                continue;
            }
            if !child.contains(source, cancel, v)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn current(&self) -> Option<Ref> {
        self.children.get(self.primary).and_then(|c| c.result())
    }
}

impl QIter for And {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        if self.children.is_empty() {
            self.state = IterState::Exhausted;
            return Ok(false);
        }
        loop {
            cancel.check()?;
            if !self.children[self.primary].next(source, cancel)? {
                self.state = IterState::Exhausted;
                return Ok(false);
            }
            let candidate = self.current().expect("next just returned true");
            if self.others_contain(source, cancel, candidate)? {
                self.state = IterState::Iterating;
                return Ok(true);
            }
        }
    }

    fn result(&self) -> Option<Ref> {
        self.current()
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        cancel.check()?;
        for child in &mut self.children {
            if !child.contains(source, cancel, v)? {
                return Ok(false);
            }
        }
        self.state = IterState::Iterating;
        Ok(true)
    }

    fn next_path(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        let Some(candidate) = self.current() else {
            return Ok(false);
        };
        for idx in 0..self.children.len() {
            cancel.check()?;
            if !self.children[idx].next_path(source, cancel)? {
                continue;
            }
            if self.others_contain_except(source, cancel, idx, candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        for child in &self.children {
            child.tag_results(out);
        }
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        let mut size = i64::MAX;
        let mut exact = true;
        let mut next_cost = 0u64;
        let mut contains_cost = 0u64;
        for child in &self.children {
            let s = child.stats(source);
            if s.size.value >= 0 && s.size.value < size {
                size = s.size.value;
                exact = s.size.exact;
            }
            next_cost = next_cost.saturating_add(s.next_cost);
            contains_cost = contains_cost.saturating_add(s.contains_cost);
        }
        Stats {
            contains_cost,
            next_cost,
            size: if size == i64::MAX {
                SizeEstimate::unknown()
            } else {
                SizeEstimate { value: size, exact }
            },
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        self.children.iter().map(|c| c.as_ref()).collect()
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
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

impl And {
    fn others_contain_except(
        &mut self,
        source: &dyn QuadSource,
        cancel: &CancellationToken,
        advanced: usize,
        v: Ref,
    ) -> IterResult<bool> {
        for (idx, child) in self.children.iter_mut().enumerate() {
            if idx == advanced {
                continue;
            }
            if !child.contains(source, cancel, v)? {
                return Ok(false);
            }
        }
        Ok(true)
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
        s.apply_deltas(&[
            Delta::add(Quad::new(Value::iri("a"), Value::iri("p"), Value::iri("b"), None)),
            Delta::add(Quad::new(Value::iri("a"), Value::iri("p"), Value::iri("c"), None)),
        ])
            .unwrap();
        s
    }

    #[test]
    fn intersects_fixed_with_all_nodes() {
        let s = store();
        let token = CancellationToken::new();
        let b = NodeRef::new(Value::iri("b").hash());
        let all = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let fixed = Box::new(Fixed::single(Ref::Node(b)));
        let mut and = And::new(vec![all, fixed], &s);
        assert!(and.next(&s, &token).unwrap());
        assert_eq!(and.result(), Some(Ref::Node(b)));
        assert!(!and.next(&s, &token).unwrap());
    }

    #[test]
    fn empty_intersection_when_fixed_value_absent() {
        let s = store();
        let token = CancellationToken::new();
        let missing = NodeRef::new(Value::iri("nope").hash());
        let all = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let fixed = Box::new(Fixed::single(Ref::Node(missing)));
        let mut and = And::new(vec![all, fixed], &s);
        assert!(!and.next(&s, &token).unwrap());
    }

    #[test]
    fn contains_requires_every_child_to_agree() {
        let s = store();
        let token = CancellationToken::new();
        let b = NodeRef::new(Value::iri("b").hash());
        let all = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let fixed = Box::new(Fixed::single(Ref::Node(b)));
        let mut and = And::new(vec![all, fixed], &s);
        assert!(and.contains(&s, &token, Ref::Node(b)).unwrap());
    }
}
