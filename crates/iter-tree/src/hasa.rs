//! `HasA(sub, dir)` projects a quad-relation iterator down to a
//! node-relation one: for each quad ref in `sub`, it emits that quad's
//! component in `dir`.

use std::collections::HashMap;

use quad_model::Direction;
use quad_store::CancellationToken;

use crate::error::{IterError, IterResult};
use crate::iterator::{BoxedIter, QIter};
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::Stats;
use crate::tags::TagSet;

/// Projects `sub`'s quad results down to one of their components.
///
/// `component(dir)` is a pure, local computation on the `QuadRef` itself
/// (`QuadRef`... exposes a per-direction accessor), so no
/// backend call is needed to advance — only `sub.next` touches a backend.
#[derive(Debug)]
pub struct HasA {
    sub: BoxedIter,
    dir: Direction,
    state: IterState,
    tags: TagSet,
}

impl HasA {
    /// Project `sub` (a quad-relation iterator) down to its `dir`
    /// component.
    pub fn new(sub: BoxedIter, dir: Direction) -> Self {
        HasA {
            sub,
            dir,
            state: IterState::Fresh,
            tags: TagSet::new(),
        }
    }

    /// Attach a free tag name to this node's results.
    pub fn tagged(mut self, name: impl Into<String>) -> Self {
        self.tags.free.push(name.into());
        self
    }

    fn component_of(&self, r: Ref) -> Option<Ref> {
        r.as_quad()?.component(self.dir).map(Ref::Node)
    }
}

impl QIter for HasA {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        cancel.check()?;
        if !self.sub.next(source, cancel)? {
            self.state = IterState::Exhausted;
            return Ok(false);
        }
        self.state = IterState::Iterating;
        Ok(true)
    }

    fn result(&self) -> Option<Ref> {
        self.sub.result().and_then(|r| self.component_of(r))
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        if !self.state.is_live() {
            return Err(IterError::Closed);
        }
        let Some(target) = v.as_node() else {
            return Ok(false);
        };
        self.sub.reset();
        loop {
            cancel.check()?;
            if !self.sub.next(source, cancel)? {
                self.sub.reset();
                return Ok(false);
            }
            if let Some(quad) = self.sub.result().and_then(|r| r.as_quad()) {
                if quad.component(self.dir) == Some(target) {
                    self.state = IterState::Iterating;
                    return Ok(true);
                }
            }
        }
    }

    fn next_path(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        let Some(current) = self.result() else {
            return Ok(false);
        };
        loop {
            cancel.check()?;
            if !self.sub.next_path(source, cancel)? {
                return Ok(false);
            }
            if self.result() == Some(current) {
                return Ok(true);
            }
        }
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.tags.populate(self.result(), out);
        self.sub.tag_results(out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        self.sub.stats(source)
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.sub.as_ref()]
    }

    fn reset(&mut self) {
        self.sub.reset();
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
    fn projects_quads_to_subjects() {
        let s = store();
        let token = CancellationToken::new();
        let quads = Box::new(All::new(&s, Relation::Quads).unwrap());
        let mut hasa = HasA::new(quads, Direction::Subject);
        assert!(hasa.next(&s, &token).unwrap());
        let a_ref = s.value_of(&Value::iri("a")).unwrap().unwrap();
        assert_eq!(hasa.result(), Some(Ref::Node(a_ref)));
        assert!(!hasa.next(&s, &token).unwrap());
    }

    #[test]
    fn contains_scans_sub_for_matching_component() {
        let s = store();
        let token = CancellationToken::new();
        let quads = Box::new(All::new(&s, Relation::Quads).unwrap());
        let mut hasa = HasA::new(quads, Direction::Object);
        let b_ref = s.value_of(&Value::iri("b")).unwrap().unwrap();
        assert!(hasa.contains(&s, &token, Ref::Node(b_ref)).unwrap());
    }
}
