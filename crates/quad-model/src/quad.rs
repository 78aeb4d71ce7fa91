//! The quad type and its identity key.

use crate::{Direction, Value, ValueHash};

/// An ordered 4-tuple `(Subject, Predicate, Object, Label)` of values.
///
/// Subject, Predicate, and Object must be present; Label is optional, and
/// its absence is distinct from a blank-node label.
#[derive(Debug, Clone)]
pub struct Quad {
    /// Subject component.
    pub subject: Value,
    /// Predicate component.
    pub predicate: Value,
    /// Object component.
    pub object: Value,
    /// Optional label/graph component.
    pub label: Option<Value>,
}

/// The 64-byte identity key for a quad: the concatenation of its four
/// component hashes, used as the quad's identity for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuadKey(pub [u8; 64]);

/// Sentinel standing in for an absent label in [`Quad::key`].
const ABSENT_LABEL_SENTINEL: [u8; 16] = [0xff; 16];

impl Quad {
    /// Construct a new quad.
    pub fn new(subject: Value, predicate: Value, object: Value, label: Option<Value>) -> Self {
        Quad {
            subject,
            predicate,
            object,
            label,
        }
    }

    /// Fetch the component in the given direction. `Direction::Any` is not
    /// meaningful here and returns `None`.
    pub fn component(&self, dir: Direction) -> Option<&Value> {
        match dir {
            Direction::Subject => Some(&self.subject),
            Direction::Predicate => Some(&self.predicate),
            Direction::Object => Some(&self.object),
            Direction::Label => self.label.as_ref(),
            Direction::Any => None,
        }
    }

    /// The quad's identity key for deduplication.
    pub fn key(&self) -> QuadKey {
        let mut bytes = [0u8; 64];
        bytes[0..16].copy_from_slice(self.subject.hash().as_bytes());
        bytes[16..32].copy_from_slice(self.predicate.hash().as_bytes());
        bytes[32..48].copy_from_slice(self.object.hash().as_bytes());
        match &self.label {
            Some(l) => bytes[48..64].copy_from_slice(l.hash().as_bytes()),
            None => bytes[48..64].copy_from_slice(&ABSENT_LABEL_SENTINEL),
        }
        QuadKey(bytes)
    }

    /// Per-direction component hashes, `Label` only when present — the unit
    /// of work for the reference-count deltas in step 3.
    pub fn component_hashes(&self) -> Vec<(Direction, ValueHash)> {
        let mut out = vec![
            (Direction::Subject, self.subject.hash()),
            (Direction::Predicate, self.predicate.hash()),
            (Direction::Object, self.object.hash()),
        ];
        if let Some(l) = &self.label {
            out.push((Direction::Label, l.hash()));
        }
        out
    }
}

impl std::fmt::Display for Quad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(l) => write!(f, "{} {} {} {}", self.subject, self.predicate, self.object, l),
            None => write!(f, "{} {} {}", self.subject, self.predicate, self.object),
        }
    }
}
