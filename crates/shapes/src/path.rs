//! A minimal fluent path builder over the Shape DSL — cayley's
//! `graph/path.Path` reduced to a handful of steps: `out`/`in_`/`has`/`save`,
//! lowering directly to [`Shape::NodesFrom`]/[`Shape::Quads`] trees rather
//! than deferring through a `Composite`, since every step already has a
//! direct plain-`Shape` reading.

use quad_model::{Direction, Value};
use quad_store::NodeRef;

use crate::filter::QuadFilter;
use crate::shape::Shape;
use iter_tree::Ref;

fn fixed_of(value: &Value) -> Shape {
    Shape::Fixed(vec![Ref::Node(NodeRef::new(value.hash()))])
}

/// A step-by-step graph walk that lowers to a [`Shape`] once built.
///
/// `Path` is a value type: every step consumes `self` and returns a new
/// `Path`, the same way cayley's path steps never mutate in place.
#[derive(Debug, Clone)]
pub struct Path {
    shape: Shape,
}

impl Path {
    /// Start from every node in the store.
    pub fn start_morphism() -> Self {
        Path { shape: Shape::AllNodes }
    }

    /// Start from a fixed set of nodes.
    pub fn start(nodes: &[Value]) -> Self {
        Path {
            shape: Shape::Fixed(nodes.iter().map(|v| Ref::Node(NodeRef::new(v.hash()))).collect()),
        }
    }

    /// Follow `predicate` forward: from the current nodes (as subjects) to
    /// the objects of matching quads.
    pub fn out(self, predicate: &Value) -> Self {
        self.step(Direction::Subject, Direction::Object, predicate)
    }

    /// Follow `predicate` backward: from the current nodes (as objects) to
    /// the subjects of matching quads.
    pub fn in_(self, predicate: &Value) -> Self {
        self.step(Direction::Object, Direction::Subject, predicate)
    }

    fn step(self, from_dir: Direction, to_dir: Direction, predicate: &Value) -> Self {
        let quads = Shape::Quads(vec![
            QuadFilter::new(from_dir, self.shape),
            QuadFilter::new(Direction::Predicate, fixed_of(predicate)),
        ]);
        Path {
            shape: Shape::NodesFrom {
                dir: to_dir,
                quads: Box::new(quads),
            },
        }
    }

    /// Retain only nodes that have a `predicate`/`value` quad (in either
    /// direction depending on `forward`), without changing which node is
    /// emitted.
    pub fn has(self, predicate: &Value, value: &Value, forward: bool) -> Self {
        let (subject_dir, object_dir) = if forward {
            (Direction::Subject, Direction::Object)
        } else {
            (Direction::Object, Direction::Subject)
        };
        let quads = Shape::Quads(vec![
            QuadFilter::new(subject_dir, self.shape),
            QuadFilter::new(Direction::Predicate, fixed_of(predicate)),
            QuadFilter::new(object_dir, fixed_of(value)),
        ]);
        Path {
            shape: Shape::NodesFrom {
                dir: subject_dir,
                quads: Box::new(quads),
            },
        }
    }

    /// Bind the current nodes under `tag`.
    pub fn save(self, tag: impl Into<String>) -> Self {
        Path {
            shape: self.shape.saved(tag),
        }
    }

    /// Finish the walk, producing the `Shape` this path built.
    pub fn build_shape(self) -> Shape {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_iterator;
    use iter_tree::QIter;
    use quad_store::{CancellationToken, Delta, InMemoryBackend, QuadStore, StoreOptions};
    use quad_model::Quad;

    fn store() -> QuadStore<InMemoryBackend> {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        s.apply_deltas(&[
            Delta::add(Quad::new(Value::iri("a"), Value::iri("follows"), Value::iri("b"), None)),
            Delta::add(Quad::new(Value::iri("b"), Value::iri("follows"), Value::iri("c"), None)),
        ])
            .unwrap();
        s
    }

    #[test]
    fn two_hop_out_follows_the_chain() {
        let s = store();
        let token = CancellationToken::new();
        let shape = Path::start(&[Value::iri("a")])
            .out(&Value::iri("follows"))
            .out(&Value::iri("follows"))
            .build_shape();
        let mut iter = build_iterator(&shape, &s).unwrap();
        assert!(iter.next(&s, &token).unwrap());
        let c = s.value_of(&Value::iri("c")).unwrap().unwrap();
        assert_eq!(iter.result(), Some(Ref::Node(c)));
        assert!(!iter.next(&s, &token).unwrap());
    }

    #[test]
    fn has_filters_without_changing_projection() {
        let s = store();
        let token = CancellationToken::new();
        let shape = Path::start(&[Value::iri("a"), Value::iri("b")])
            .has(&Value::iri("follows"), &Value::iri("b"), true)
            .build_shape();
        let mut iter = build_iterator(&shape, &s).unwrap();
        let a = s.value_of(&Value::iri("a")).unwrap().unwrap();
        assert!(iter.next(&s, &token).unwrap());
        assert_eq!(iter.result(), Some(Ref::Node(a)));
        assert!(!iter.next(&s, &token).unwrap());
    }
}
