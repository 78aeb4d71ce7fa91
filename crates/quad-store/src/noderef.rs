//! Opaque handles returned by a [`crate::QuadStore`].
//!
//! `NodeRef` and `QuadRef` are backend-independent: they wrap the same
//! `ValueHash`/`QuadKey` that `quad-model` already computes, so any backend
//! can hand one out without knowing about the others' internal row ids.

use quad_model::{Direction, QuadKey, ValueHash};

/// An opaque reference to a single value, as returned by
/// [`crate::QuadStore::quad`] and consumed by [`crate::QuadStore::value_of`]/
/// [`crate::QuadStore::name_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(pub ValueHash);

impl NodeRef {
    /// Wrap a value hash as a node reference.
    pub fn new(hash: ValueHash) -> Self {
        NodeRef(hash)
    }

    /// The underlying hash.
    pub fn hash(&self) -> ValueHash {
        self.0
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque reference to a quad (opaque handles, not assumed to
/// be stable across backends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuadRef(pub QuadKey);

impl QuadRef {
    /// Wrap a quad key as a quad reference.
    pub fn new(key: QuadKey) -> Self {
        QuadRef(key)
    }

    /// The underlying key.
    pub fn key(&self) -> QuadKey {
        self.0
    }

    /// The `NodeRef` for the component in `dir` (`QuadRef`...
    /// exposes a per-direction accessor returning the NodeRef for that
    /// direction). `None` for `Direction::Label` on a quad with no label,
    /// or for `Direction::Any`.
    pub fn component(&self, dir: Direction) -> Option<NodeRef> {
        let bytes = self.0.0;
        let slice: [u8; 16] = match dir {
            Direction::Subject => bytes[0..16].try_into().expect("fixed width"),
            Direction::Predicate => bytes[16..32].try_into().expect("fixed width"),
            Direction::Object => bytes[32..48].try_into().expect("fixed width"),
            Direction::Label => {
                let label: [u8; 16] = bytes[48..64].try_into().expect("fixed width");
                if label == [0xff; 16] {
                    return None;
                }
                label
            }
            Direction::Any => return None,
        };
        Some(NodeRef::new(ValueHash(slice)))
    }
}

impl std::fmt::Display for QuadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..")
    }
}
