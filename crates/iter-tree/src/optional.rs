//! `Optional(child)` always produces a result, annotating whether the
//! child matched; introduces nullable tag bindings.
//!
//! Used as a non-primary child of [`crate::and::And`]: `And` probes every
//! non-primary child with `contains` and rejects the candidate if any
//! returns `false`. `Optional` never does that — its `contains` always
//! succeeds — so wrapping a child in `Optional` turns "must match" into
//! "bind these tags if it happens to match, otherwise leave them unbound".

use std::collections::HashMap;

use quad_store::CancellationToken;

use crate::error::IterResult;
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::Stats;

/// Wraps `child` so it never causes an enclosing `And` to reject a
/// candidate, while still contributing `child`'s tags when it does match.
#[derive(Debug)]
pub struct Optional {
    child: BoxedIter,
    /// `None` before any `contains`/`next` call; `Some(true)` if the most
    /// recent probe matched `child`, `Some(false)` if it did not.
    matched: Option<bool>,
}

impl Optional {
    /// Wrap `child` as an optional match.
    pub fn new(child: BoxedIter) -> Self {
        Optional { child, matched: None }
    }

    /// Whether the most recent probe matched.
    pub fn matched(&self) -> Option<bool> {
        self.matched
    }
}

impl QIter for Optional {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        let advanced = self.child.next(source, cancel)?;
        self.matched = Some(advanced);
        Ok(advanced)
    }

    fn result(&self) -> Option<Ref> {
        self.child.result()
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        let matched = self.child.contains(source, cancel, v)?;
        self.matched = Some(matched);
        Ok(true)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        if self.matched == Some(true) {
            self.child.tag_results(out);
        }
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        self.child.stats(source)
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.child.as_ref()]
    }

    fn reset(&mut self) {
        self.child.reset();
        self.matched = None;
    }

    fn close(&mut self) -> IterResult<()> {
        self.child.close()
    }

    fn state(&self) -> IterState {
        self.child.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use quad_model::Value;
    use quad_store::{InMemoryBackend, NodeRef, QuadStore, StoreOptions};

    #[test]
    fn contains_always_succeeds_even_when_child_does_not_match() {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("a").hash());
        let missing = NodeRef::new(Value::iri("z").hash());
        let child = Box::new(Fixed::single(Ref::Node(a)));
        let mut opt = Optional::new(child);
        assert!(opt.contains(&s, &token, Ref::Node(missing)).unwrap());
        assert_eq!(opt.matched, Some(false));
    }

    #[test]
    fn tags_unbound_when_not_matched() {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("a").hash());
        let missing = NodeRef::new(Value::iri("z").hash());
        let child = Box::new(crate::save::Save::new(Box::new(Fixed::single(Ref::Node(a))), vec!["x".into()]));
        let mut opt = Optional::new(child);
        opt.contains(&s, &token, Ref::Node(missing)).unwrap();
        let mut out = HashMap::new();
        opt.tag_results(&mut out);
        assert!(out.is_empty());
    }
}
