//! `Comparison(child, op, literal)` passes values through from `child`,
//! retaining only those whose resolved value satisfies `op` against
//! `literal`. `op` ranges over `{<, ≤, >, ≥}` and comparison is
//! type-aware across strings, ints, floats and times.

use std::cmp::Ordering;
use std::collections::HashMap;

use quad_model::Value;
use quad_store::CancellationToken;

use crate::error::{IterError, IterResult};
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::{SizeEstimate, Stats};
use crate::tags::TagSet;

/// One of the four relational operators names for `Comparison`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    /// `<`
    Lt,
    /// `≤`
    Le,
    /// `>`
    Gt,
    /// `≥`
    Ge,
}

impl CompOp {
    /// Whether `ordering` (the comparison of a candidate value against the
    /// literal) satisfies this operator.
    pub fn satisfied_by(&self, ordering: Ordering) -> bool {
        match self {
            CompOp::Lt => ordering == Ordering::Less,
            CompOp::Le => ordering != Ordering::Greater,
            CompOp::Gt => ordering == Ordering::Greater,
            CompOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// Type-aware ordering between two values (type-aware
/// (strings, ints, floats, times)). `None` when the two variants are not
/// comparable (e.g. an IRI against an integer); such pairs never satisfy
/// any `Comparison`.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Time(x), Value::Time(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        _ => a.lexical_form().zip(b.lexical_form()).map(|(x, y)| x.cmp(y)),
    }
}

/// Filters `child`'s node results by a type-aware comparison against a
/// fixed literal.
#[derive(Debug)]
pub struct Comparison {
    child: BoxedIter,
    op: CompOp,
    literal: Value,
    state: IterState,
    tags: TagSet,
}

impl Comparison {
    /// Build a comparison filter over `child`.
    pub fn new(child: BoxedIter, op: CompOp, literal: Value) -> Self {
        Comparison {
            child,
            op,
            literal,
            state: IterState::Fresh,
            tags: TagSet::new(),
        }
    }

    /// Attach a free tag name to this node's results.
    pub fn tagged(mut self, name: impl Into<String>) -> Self {
        self.tags.free.push(name.into());
        self
    }

    fn satisfies(&self, source: &dyn QuadSource, v: Ref) -> IterResult<bool> {
        let Some(node) = v.as_node() else {
            return Ok(false);
        };
        let Some(value) = source.name_of(node)? else {
            return Ok(false);
        };
        Ok(compare_values(&value, &self.literal).is_some_and(|ord| self.op.satisfied_by(ord)))
    }
}

impl QIter for Comparison {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        loop {
            cancel.check()?;
            if !self.child.next(source, cancel)? {
                self.state = IterState::Exhausted;
                return Ok(false);
            }
            let candidate = self.child.result().expect("next just returned true");
            if self.satisfies(source, candidate)? {
                self.state = IterState::Iterating;
                return Ok(true);
            }
        }
    }

    fn result(&self) -> Option<Ref> {
        self.child.result()
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        cancel.check()?;
        if !self.satisfies(source, v)? {
            return Ok(false);
        }
        let found = self.child.contains(source, cancel, v)?;
        if found {
            self.state = IterState::Iterating;
        }
        Ok(found)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.tags.populate(self.result(), out);
        self.child.tag_results(out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        let child = self.child.stats(source);
        let size = if child.size.value >= 0 {
            SizeEstimate::approximate((child.size.value / 2).max(0) as u64)
        } else {
            SizeEstimate::unknown()
        };
        Stats {
            contains_cost: child.contains_cost.saturating_add(1),
            next_cost: child.next_cost.saturating_add(1),
            size,
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.child.as_ref()]
    }

    fn reset(&mut self) {
        self.child.reset();
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
        s.apply_deltas(&[
            Delta::add(Quad::new(Value::iri("s"), Value::iri("age"), Value::Int(10), None)),
            Delta::add(Quad::new(Value::iri("s"), Value::iri("age"), Value::Int(20), None)),
        ])
            .unwrap();
        s
    }

    #[test]
    fn retains_only_values_satisfying_the_operator() {
        let s = store();
        let token = CancellationToken::new();
        let all = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let mut cmp = Comparison::new(all, CompOp::Gt, Value::Int(15));
        let mut found = Vec::new();
        while cmp.next(&s, &token).unwrap() {
            let r = cmp.result().unwrap();
            let v = s.name_of(r.as_node().unwrap()).unwrap().unwrap();
            found.push(v);
        }
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0], Value::Int(20)));
    }

    #[test]
    fn incomparable_types_never_satisfy() {
        let s = store();
        let token = CancellationToken::new();
        let all = Box::new(All::new(&s, Relation::Nodes).unwrap());
        let mut cmp = Comparison::new(all, CompOp::Ge, Value::iri("zzz"));
        let mut count = 0;
        while cmp.next(&s, &token).unwrap() {
            count += 1;
        }
        // "s", "age" are IRIs >= "zzz"? lexically false; ints are incomparable to an IRI literal.
        assert_eq!(count, 0);
    }
}
