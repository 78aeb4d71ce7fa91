//! The backend-neutral Shape DSL, optimizer, and path layer: builds a
//! declarative query DAG, rewrites it to a fixed point, and lowers it to
//! an `iter_tree` evaluation tree. Depends on `iter-tree` and re-exports
//! it, so a caller only needs this one crate to both build and run a
//! query.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod build;
mod filter;
mod optimize;
mod path;
mod shape;

pub use build::build_iterator;
pub use filter::{glob_to_regex, QuadFilter, ValueFilter};
pub use optimize::{optimize, optimize_with_backend, BackendOptimizer, IdentityBackendOptimizer};
pub use path::Path;
pub use shape::{Shape, Simplifiable};

pub use iter_tree::*;

#[cfg(test)]
mod tests {
    use super::*;
    use quad_model::{Direction, Quad, Value};
    use quad_store::{CancellationToken, Delta, InMemoryBackend, QuadStore, StoreOptions};

    #[test]
    fn end_to_end_filter_over_all_nodes() {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        s.apply_deltas(&[
            Delta::add(Quad::new(Value::iri("node_1"), Value::iri("p"), Value::Int(1), None)),
            Delta::add(Quad::new(Value::iri("node_2"), Value::iri("p"), Value::Int(2), None)),
            Delta::add(Quad::new(Value::iri("other"), Value::iri("p"), Value::Int(3), None)),
        ])
            .unwrap();
        let token = CancellationToken::new();
        let shape = optimize(Shape::AllNodes.filtered(ValueFilter::Wildcard {
            pattern: "node_*".to_string(),
        }));
        let mut iter = build_iterator(&shape, &s).unwrap();
        let mut count = 0;
        while iter.next(&s, &token).unwrap() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn quads_action_projects_predicate_with_constant_subject() {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        s.apply_deltas(&[Delta::add(Quad::new(Value::iri("a"), Value::iri("p"), Value::iri("b"), None))])
            .unwrap();
        let token = CancellationToken::new();
        let a = Ref::Node(quad_store::NodeRef::new(Value::iri("a").hash()));
        let mut filter = std::collections::HashMap::new();
        filter.insert(Direction::Subject, a);
        let shape = Shape::QuadsAction {
            result_dir: Direction::Object,
            save: std::collections::HashMap::new(),
            filter,
        };
        let mut iter = build_iterator(&shape, &s).unwrap();
        assert!(iter.next(&s, &token).unwrap());
        let b = s.value_of(&Value::iri("b")).unwrap().unwrap();
        assert_eq!(iter.result(), Some(Ref::Node(b)));
    }
}
