//! The Shape DSL : a declarative query tree, independent of any
//! backend, that [`crate::optimize::optimize`] rewrites and
//! [`crate::build::build_iterator`] lowers to an [`iter_tree::BoxedIter`].

use std::collections::HashMap;
use std::sync::Arc;

use quad_model::Direction;

use crate::filter::{QuadFilter, ValueFilter};
use iter_tree::Ref;

/// A node in the backend-neutral query DAG.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Every node in the store.
    AllNodes,
    /// Every quad in the store.
    AllQuads,
    /// Quads whose components satisfy every filter (quads
    /// whose component in `dir` is among the refs produced by
    /// `values`). An empty filter list is `AllQuads`.
    Quads(Vec<QuadFilter>),
    /// Project a quad-relation shape down to one direction.
    NodesFrom {
        /// Which component to project.
        dir: Direction,
        /// The quad-relation shape to project.
        quads: Box<Shape>,
    },
    /// The common "find quads where dirs equal constants, emit one
    /// direction, tag others" shape (`QuadsAction`).
    QuadsAction {
        /// Which direction's value the shape ultimately produces.
        result_dir: Direction,
        /// Tag names to bind per direction's resolved value.
        save: HashMap<Direction, Vec<String>>,
        /// Constant-value constraints per direction.
        filter: HashMap<Direction, Ref>,
    },
    /// Refine `from`'s node results by one or more value filters.
    Filter {
        /// The shape to filter.
        from: Box<Shape>,
        /// The filters, all of which must pass.
        filters: Vec<ValueFilter>,
    },
    /// Bind `from`'s results under `tags`.
    Save {
        /// The shape whose results are tagged.
        from: Box<Shape>,
        /// Tag names.
        tags: Vec<String>,
    },
    /// Intersection of every member shape.
    Intersect(Vec<Shape>),
    /// Union of every member shape.
    Union(Vec<Shape>),
    /// `from` with every result of `minus` removed.
    Except {
        /// The base shape.
        from: Box<Shape>,
        /// The shape whose results are excluded.
        minus: Box<Shape>,
    },
    /// A skip/limit window over `from`'s results (Page
    /// application rule).
    Page {
        /// The shape to page.
        from: Box<Shape>,
        /// Number of leading results to drop.
        skip: u64,
        /// Maximum number of results to keep after skipping.
        limit: u64,
    },
    /// A literal, caller-supplied set of refs.
    Fixed(Vec<Ref>),
    /// An opaque, backend- or caller-defined shape that rewrites itself
    /// to a plain `Shape` before optimization (`Composite`). Used
    /// by [`crate::path::Path`] to defer lowering until `build_shape` is
    /// called, and by a backend's own shape extensions ("backend hand-off").
    Composite(Arc<dyn Simplifiable>),
}

/// A shape that knows how to rewrite itself into the plain `Shape`
/// vocabulary, one step at a time (Simplify composites).
pub trait Simplifiable: std::fmt::Debug + Send + Sync {
    /// Produce the next, plainer shape this composite stands for.
    fn simplify(&self) -> Shape;
}

impl Shape {
    /// Build a `Quads` shape with a single direction filter.
    pub fn quads_where(dir: Direction, values: Shape) -> Self {
        Shape::Quads(vec![QuadFilter::new(dir, values)])
    }

    /// Wrap in a `Save`.
    pub fn saved(self, tag: impl Into<String>) -> Self {
        Shape::Save {
            from: Box::new(self),
            tags: vec![tag.into()],
        }
    }

    /// Wrap in a `Page`.
    pub fn paged(self, skip: u64, limit: u64) -> Self {
        Shape::Page {
            from: Box::new(self),
            skip,
            limit,
        }
    }

    /// Wrap in a `Filter` over a single `ValueFilter`.
    pub fn filtered(self, filter: ValueFilter) -> Self {
        Shape::Filter {
            from: Box::new(self),
            filters: vec![filter],
        }
    }
}
