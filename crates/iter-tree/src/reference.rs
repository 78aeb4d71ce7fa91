//! The single value type an iterator tree produces. A tree is
//! polymorphic over which ref kind flows through it: either [`NodeRef`]s
//! (a node-relation tree) or [`QuadRef`]s (a quad-relation tree).

use quad_store::{NodeRef, QuadRef};

/// A result emitted by some point in an iterator tree. Which variant a
/// given subtree actually produces is determined by what it was built
/// over ([`crate::all::All`] over `nodes_all` yields `Node`, over
/// `quads_all` yields `Quad`); nothing here enforces that statically,
/// the same way cayley's `graph.Ref` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ref {
    /// A reference to an interned value.
    Node(NodeRef),
    /// A reference to a stored quad.
    Quad(QuadRef),
}

impl Ref {
    /// The wrapped node ref, if this is a `Node`.
    pub fn as_node(&self) -> Option<NodeRef> {
        match self {
            Ref::Node(n) => Some(*n),
            Ref::Quad(_) => None,
        }
    }

    /// The wrapped quad ref, if this is a `Quad`.
    pub fn as_quad(&self) -> Option<QuadRef> {
        match self {
            Ref::Quad(q) => Some(*q),
            Ref::Node(_) => None,
        }
    }
}

impl From<NodeRef> for Ref {
    fn from(n: NodeRef) -> Self {
        Ref::Node(n)
    }
}

impl From<QuadRef> for Ref {
    fn from(q: QuadRef) -> Self {
        Ref::Quad(q)
    }
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ref::Node(n) => write!(f, "{n}"),
            Ref::Quad(q) => write!(f, "{q}"),
        }
    }
}
