//! The backend-neutral optimizer pass rewrites the shape tree bottom-up
//! to a fixed point before [`crate::build::build_iterator`] ever
//! touches a store. Four concerns, applied repeatedly until nothing
//! changes: simplify composites, fold constants, merge adjacent
//! `Page`/`Save` nodes, and flatten associative `Intersect`/`Union` nests.
//!
//! Backend hand-off (step 4: "a backend may recognize part of the
//! tree and substitute its own, typically faster, operator") is exposed as
//! [`BackendOptimizer`] — an interface only; no concrete implementation
//! beyond the identity pass ships here, the same way cayley's own
//! `graph.QuadStore` leaves `OptimizeIterator` to each backend.

use crate::shape::Shape;

/// Rewrites a shape tree bottom-up until a fixed point ("Optimize"). Safe to call on an already-optimized tree: it is
/// idempotent.
pub fn optimize(shape: Shape) -> Shape {
    let mut current = shape;
    loop {
        let rewritten = rewrite_once(current.clone());
        if shapes_equal(&rewritten, &current) {
            return rewritten;
        }
        current = rewritten;
    }
}

/// Run `shape` through `optimize`, then give `backend` a chance to
/// substitute backend-specific operators (step 4).
pub fn optimize_with_backend(shape: Shape, backend: &dyn BackendOptimizer) -> Shape {
    let optimized = optimize(shape);
    backend.optimize(optimized)
}

/// A backend's hook into the generic optimizer (Backend
/// hand-off). A backend that has nothing special to contribute should
/// implement this as the identity function.
pub trait BackendOptimizer: Send + Sync {
    /// Offer `shape`, already generically optimized, a chance to be
    /// rewritten into a backend-specific equivalent. Implementations that
    /// recognize no pattern must return `shape` unchanged.
    fn optimize(&self, shape: Shape) -> Shape;
}

/// The trivial [`BackendOptimizer`]: never rewrites anything.
#[derive(Debug, Default)]
pub struct IdentityBackendOptimizer;

impl BackendOptimizer for IdentityBackendOptimizer {
    fn optimize(&self, shape: Shape) -> Shape {
        shape
    }
}

fn rewrite_once(shape: Shape) -> Shape {
    match shape {
        Shape::Composite(c) => rewrite_once(c.simplify()),
        Shape::NodesFrom { dir, quads } => Shape::NodesFrom {
            dir,
            quads: Box::new(rewrite_once(*quads)),
        },
        Shape::Filter { from, filters } => Shape::Filter {
            from: Box::new(rewrite_once(*from)),
            filters,
        },
        Shape::Save { from, tags } => fold_save(Shape::Save {
            from: Box::new(rewrite_once(*from)),
            tags,
        }),
        Shape::Except { from, minus } => Shape::Except {
            from: Box::new(rewrite_once(*from)),
            minus: Box::new(rewrite_once(*minus)),
        },
        Shape::Page { from, skip, limit } => fold_page(Shape::Page {
            from: Box::new(rewrite_once(*from)),
            skip,
            limit,
        }),
        Shape::Intersect(members) => fold_intersect(members.into_iter().map(rewrite_once).collect()),
        Shape::Union(members) => fold_union(members.into_iter().map(rewrite_once).collect()),
        Shape::Quads(filters) => Shape::Quads(
            filters
                .into_iter()
                .map(|f| crate::filter::QuadFilter::new(f.dir, rewrite_once(*f.values)))
                .collect(),
        ),
        Shape::QuadsAction { result_dir, save, filter } => Shape::QuadsAction { result_dir, save, filter },
        other @ (Shape::AllNodes | Shape::AllQuads | Shape::Fixed(_)) => other,
    }
}

/// `Page(Page(s, skip1, limit1), skip2, limit2)` folds to one `Page` whose
/// window is the intersection of the two (Page application
/// rule): `skip = skip1 + skip2`; `limit = min(limit1 - skip2, limit2)`,
/// clamped to zero so an outer skip past the inner limit yields an empty
/// page rather than an underflowed one.
fn fold_page(shape: Shape) -> Shape {
    if let Shape::Page { from, skip: skip2, limit: limit2 } = shape {
        if let Shape::Page { from: inner, skip: skip1, limit: limit1 } = *from {
            let remaining = limit1.saturating_sub(skip2);
            return Shape::Page {
                from: inner,
                skip: skip1 + skip2,
                limit: remaining.min(limit2),
            };
        }
        return Shape::Page { from, skip: skip2, limit: limit2 };
    }
    shape
}

/// `Save(Save(s, t1), t2)` folds to `Save(s, t1 ++ t2)` (minus duplicates),
/// since both bind the same underlying result (Save over Save).
fn fold_save(shape: Shape) -> Shape {
    if let Shape::Save { from, tags } = shape {
        if let Shape::Save { from: inner, tags: inner_tags } = *from {
            let mut merged = inner_tags;
            for t in tags {
                if !merged.contains(&t) {
                    merged.push(t);
                }
            }
            return Shape::Save { from: inner, tags: merged };
        }
        return Shape::Save { from, tags };
    }
    shape
}

/// Flattens nested `Intersect`s and drops a constant-empty member, since an
/// intersection containing an empty `Fixed` set is always empty ("Constant folding").
fn fold_intersect(members: Vec<Shape>) -> Shape {
    let mut flat = Vec::with_capacity(members.len());
    for m in members {
        match m {
            Shape::Intersect(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    if flat.iter().any(|m| matches!(m, Shape::Fixed(items) if items.is_empty())) {
        return Shape::Fixed(Vec::new());
    }
    match flat.len() {
        1 => flat.into_iter().next().expect("len == 1"),
        _ => Shape::Intersect(flat),
    }
}

/// Flattens nested `Union`s and drops constant-empty members, since they
/// contribute nothing to the union (Constant folding).
fn fold_union(members: Vec<Shape>) -> Shape {
    let mut flat = Vec::with_capacity(members.len());
    for m in members {
        match m {
            Shape::Union(inner) => flat.extend(inner),
            Shape::Fixed(items) if items.is_empty() => {}
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => Shape::Fixed(Vec::new()),
        1 => flat.into_iter().next().expect("len == 1"),
        _ => Shape::Union(flat),
    }
}

/// Structural equality used only to detect the optimizer's fixed point.
/// `Composite` shapes never compare equal to anything (including another
/// `Composite`) since two distinct trait objects cannot be compared without
/// simplifying first — `rewrite_once` always simplifies them away before
/// this is reached, so `Composite` surviving to here means it simplified to
/// itself and the loop should keep progressing rather than spin forever;
/// callers relying on a `Composite` fixed point should implement
/// `Simplifiable` so `simplify` eventually returns a non-`Composite` shape.
fn shapes_equal(a: &Shape, b: &Shape) -> bool {
    match (a, b) {
        (Shape::AllNodes, Shape::AllNodes) => true,
        (Shape::AllQuads, Shape::AllQuads) => true,
        (Shape::Quads(x), Shape::Quads(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| a.dir == b.dir && shapes_equal(&a.values, &b.values))
        }
        (Shape::NodesFrom { dir: d1, quads: q1 }, Shape::NodesFrom { dir: d2, quads: q2 }) => {
            d1 == d2 && shapes_equal(q1, q2)
        }
        (
            Shape::QuadsAction {
                result_dir: r1,
                save: s1,
                filter: f1,
            },
            Shape::QuadsAction {
                result_dir: r2,
                save: s2,
                filter: f2,
            },
        ) => r1 == r2 && s1.len() == s2.len() && f1.len() == f2.len(),
        (Shape::Filter { from: f1, filters: v1 }, Shape::Filter { from: f2, filters: v2 }) => {
            v1.len() == v2.len() && shapes_equal(f1, f2)
        }
        (Shape::Save { from: f1, tags: t1 }, Shape::Save { from: f2, tags: t2 }) => t1 == t2 && shapes_equal(f1, f2),
        (Shape::Intersect(x), Shape::Intersect(y)) | (Shape::Union(x), Shape::Union(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| shapes_equal(a, b))
        }
        (Shape::Except { from: f1, minus: m1 }, Shape::Except { from: f2, minus: m2 }) => {
            shapes_equal(f1, f2) && shapes_equal(m1, m2)
        }
        (
            Shape::Page { from: f1, skip: s1, limit: l1 },
            Shape::Page { from: f2, skip: s2, limit: l2 },
        ) => s1 == s2 && l1 == l2 && shapes_equal(f1, f2),
        (Shape::Fixed(x), Shape::Fixed(y)) => x == y,
        _ => false,
    }
}
