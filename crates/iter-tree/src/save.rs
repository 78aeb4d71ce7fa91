//! `Save(child, tags)` passes through its child's emission unchanged
//! while binding the current result under one or more tag names, used
//! for query projection.

use std::collections::HashMap;

use quad_store::CancellationToken;

use crate::error::IterResult;
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::Stats;
use crate::tags::TagSet;

/// Passes `child`'s results through unchanged, additionally binding each
/// one under every name in `tags`.
#[derive(Debug)]
pub struct Save {
    child: BoxedIter,
    tags: TagSet,
}

impl Save {
    /// Bind `child`'s results under `names`.
    pub fn new(child: BoxedIter, names: Vec<String>) -> Self {
        Save {
            child,
            tags: TagSet {
                free: names,
                fixed: HashMap::new(),
            },
        }
    }
}

impl QIter for Save {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        self.child.next(source, cancel)
    }

    fn result(&self) -> Option<Ref> {
        self.child.result()
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        self.child.contains(source, cancel, v)
    }

    fn next_path(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        self.child.next_path(source, cancel)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.tags.populate(self.result(), out);
        self.child.tag_results(out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        self.child.stats(source)
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.child.as_ref()]
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn close(&mut self) -> IterResult<()> {
        self.child.close()
    }

    fn err(&self) -> Option<&crate::error::IterError> {
        self.child.err()
    }

    fn state(&self) -> IterState {
        self.child.state()
    }
}

impl Save {
    /// Whether this node (or, transitively, an inner `Save`) has already
    /// bound `name` — used by the optimizer's "Save over Save" fold to
    /// detect when appending tags would duplicate a binding.
    pub fn binds(&self, name: &str) -> bool {
        self.tags.free.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use quad_model::Value;
    use quad_store::{InMemoryBackend, NodeRef, QuadStore, StoreOptions};

    #[test]
    fn binds_current_result_under_every_name() {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        let token = CancellationToken::new();
        let a = NodeRef::new(Value::iri("a").hash());
        let child = Box::new(Fixed::single(Ref::Node(a)));
        let mut save = Save::new(child, vec!["x".into(), "y".into()]);
        assert!(save.next(&s, &token).unwrap());
        let mut out = HashMap::new();
        save.tag_results(&mut out);
        assert_eq!(out.get("x"), Some(&Ref::Node(a)));
        assert_eq!(out.get("y"), Some(&Ref::Node(a)));
    }
}
