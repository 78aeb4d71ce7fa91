//! The four quad permutation indexes backing `quad_iterator` scans.
//!
//! Each index is a sort order over the same 64-byte quad identity: the
//! concatenation of (Subject, Predicate, Object, Label) hashes, permuted so
//! that a different leading subsequence is contiguous in each one. A quad
//! pattern with a contiguous bound prefix in some permutation becomes a
//! single `prefix_scan` against that index.

use quad_model::{Direction, Quad, QuadKey, ValueHash};

/// Sentinel used for an absent label component when building index keys,
/// matching [`quad_model::Quad::key`].
const LABEL_SENTINEL: [u8; 16] = [0xff; 16];

/// One of the four permutation indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// Subject, Predicate, Object, Label.
    Spoc,
    /// Predicate, Object, Label, Subject.
    Pocs,
    /// Object, Label, Subject, Predicate.
    Ocsp,
    /// Label, Subject, Predicate, Object.
    Cspo,
}

impl IndexType {
    /// All four indexes, in a stable order.
    pub const ALL: [IndexType; 4] = [IndexType::Spoc, IndexType::Pocs, IndexType::Ocsp, IndexType::Cspo];

    /// The direction order this index sorts by.
    pub fn order(&self) -> [Direction; 4] {
        use Direction::*;
        match self {
            IndexType::Spoc => [Subject, Predicate, Object, Label],
            IndexType::Pocs => [Predicate, Object, Label, Subject],
            IndexType::Ocsp => [Object, Label, Subject, Predicate],
            IndexType::Cspo => [Label, Subject, Predicate, Object],
        }
    }

    /// A one-byte discriminant prefix, so all four indexes can share one
    /// backend key space without colliding.
    pub fn discriminant(&self) -> u8 {
        match self {
            IndexType::Spoc => 0,
            IndexType::Pocs => 1,
            IndexType::Ocsp => 2,
            IndexType::Cspo => 3,
        }
    }
}

/// The hash to use for `dir` when building an index key: the component's
/// hash if present, or the label sentinel if `dir` is `Label` and the quad
/// has none.
fn component_bytes(quad: &Quad, dir: Direction) -> [u8; 16] {
    match quad.component(dir) {
        Some(v) => *v.hash().as_bytes(),
        None => LABEL_SENTINEL,
    }
}

/// The full backend key for `quad` under `index`: a one-byte index
/// discriminant followed by the four permuted 16-byte component hashes.
pub fn encode_key(index: IndexType, quad: &Quad) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 64);
    out.push(index.discriminant());
    for dir in index.order() {
        out.extend_from_slice(&component_bytes(quad, dir));
    }
    out
}

/// Recover the quad's identity key from a full, decoded index key, given
/// the index it was encoded under (the inverse permutation of
/// [`encode_key`]).
pub fn decode_quad_key(index: IndexType, encoded: &[u8]) -> Option<QuadKey> {
    if encoded.len() != 1 + 64 || encoded[0] != index.discriminant() {
        return None;
    }
    let order = index.order();
    let mut slots: [[u8; 16]; 4] = [[0u8; 16]; 4];
    for (i, dir) in order.iter().enumerate() {
        let start = 1 + i * 16;
        let chunk: [u8; 16] = encoded[start..start + 16].try_into().ok()?;
        let canonical_slot = match dir {
            Direction::Subject => 0,
            Direction::Predicate => 1,
            Direction::Object => 2,
            Direction::Label => 3,
            Direction::Any => return None,
        };
        slots[canonical_slot] = chunk;
    }
    let mut out = [0u8; 64];
    for (i, slot) in slots.iter().enumerate() {
        out[i * 16..i * 16 + 16].copy_from_slice(slot);
    }
    Some(QuadKey(out))
}

/// What a pattern requires of a quad's label: any label at all (wildcard),
/// specifically no label, or a specific one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPattern {
    /// Matches quads with or without a label.
    #[default]
    Any,
    /// Matches only quads with no label.
    Absent,
    /// Matches only quads whose label hashes to this value.
    Present(ValueHash),
}

/// A partially- or fully-bound quad pattern for [`crate::QuadStore::quad_iterator`].
/// `None` on subject/predicate/object means "match any value in
/// this position"; label uses [`LabelPattern`] because its absence is itself
/// meaningful.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pattern {
    /// Subject constraint, or `None` for any.
    pub subject: Option<ValueHash>,
    /// Predicate constraint, or `None` for any.
    pub predicate: Option<ValueHash>,
    /// Object constraint, or `None` for any.
    pub object: Option<ValueHash>,
    /// Label constraint.
    pub label: LabelPattern,
}

impl Pattern {
    /// The bound byte value for `dir`, if the pattern constrains it.
    fn bound_bytes(&self, dir: Direction) -> Option<[u8; 16]> {
        match dir {
            Direction::Subject => self.subject.map(|h| *h.as_bytes()),
            Direction::Predicate => self.predicate.map(|h| *h.as_bytes()),
            Direction::Object => self.object.map(|h| *h.as_bytes()),
            Direction::Label => match self.label {
                LabelPattern::Any => None,
                LabelPattern::Absent => Some(LABEL_SENTINEL),
                LabelPattern::Present(h) => Some(*h.as_bytes()),
            },
            Direction::Any => None,
        }
    }

    /// How many of the four positions are bound.
    pub fn bound_count(&self) -> usize {
        [Direction::Subject, Direction::Predicate, Direction::Object, Direction::Label]
            .into_iter()
            .filter(|d| self.bound_bytes(*d).is_some())
            .count()
    }

    /// Whether every position is bound — the pattern names exactly one
    /// quad.
    pub fn is_fully_bound(&self) -> bool {
        self.bound_count() == 4
    }

    /// The number of leading positions of `index`'s order that this
    /// pattern binds contiguously from the front.
    fn leading_bound_run(&self, index: IndexType) -> usize {
        index
            .order()
            .into_iter()
            .take_while(|d| self.bound_bytes(*d).is_some())
            .count()
    }

    /// The backend key prefix to scan against `index` for this pattern:
    /// the discriminant byte followed by the leading contiguous run of
    /// bound component bytes.
    pub fn prefix_for(&self, index: IndexType) -> Vec<u8> {
        let run = self.leading_bound_run(index);
        let mut out = Vec::with_capacity(1 + run * 16);
        out.push(index.discriminant());
        for dir in index.order().into_iter().take(run) {
            out.extend_from_slice(&self.bound_bytes(dir).expect("within bound run"));
        }
        out
    }

    /// Whether `quad` actually satisfies this pattern (a post-scan filter
    /// for the positions a prefix scan could not bind, and a defensive
    /// recheck for the ones it could).
    pub fn matches(&self, quad: &Quad) -> bool {
        for dir in [Direction::Subject, Direction::Predicate, Direction::Object, Direction::Label] {
            if let Some(expected) = self.bound_bytes(dir) {
                if component_bytes(quad, dir) != expected {
                    return false;
                }
            }
        }
        true
    }

    /// Like [`Pattern::matches`], but against already-hashed components —
    /// what a pattern check against a [`crate::store::QuadRefs`] needs,
    /// since resolving those back to full [`quad_model::Value`]s is not
    /// required just to filter a scan.
    pub fn matches_hashes(
        &self,
        subject: ValueHash,
        predicate: ValueHash,
        object: ValueHash,
        label: Option<ValueHash>,
    ) -> bool {
        if let Some(s) = self.subject {
            if s != subject {
                return false;
            }
        }
        if let Some(p) = self.predicate {
            if p != predicate {
                return false;
            }
        }
        if let Some(o) = self.object {
            if o != object {
                return false;
            }
        }
        match self.label {
            LabelPattern::Any => {}
            LabelPattern::Absent => {
                if label.is_some() {
                    return false;
                }
            }
            LabelPattern::Present(h) => {
                if label != Some(h) {
                    return false;
                }
            }
        }
        true
    }

    /// Choose the index whose order gives the longest contiguous bound
    /// prefix for this pattern, breaking ties by declaration order in
    /// [`IndexType::ALL`].
    pub fn select_best(&self) -> IndexType {
        IndexType::ALL
            .into_iter()
            .max_by_key(|idx| self.leading_bound_run(*idx))
            .expect("ALL is non-empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quad_model::Value;

    fn quad() -> Quad {
        Quad::new(
            Value::iri("http://example.org/a"),
            Value::iri("http://example.org/p"),
            Value::iri("http://example.org/b"),
            Some(Value::iri("http://example.org/g")),
        )
    }

    #[test]
    fn encode_decode_roundtrips_quad_key() {
        let q = quad();
        for idx in IndexType::ALL {
            let key = encode_key(idx, &q);
            let decoded = decode_quad_key(idx, &key).unwrap();
            assert_eq!(decoded, q.key());
        }
    }

    #[test]
    fn fully_bound_pattern_selects_full_prefix() {
        let q = quad();
        let pattern = Pattern {
            subject: Some(q.subject.hash()),
            predicate: Some(q.predicate.hash()),
            object: Some(q.object.hash()),
            label: LabelPattern::Present(q.label.as_ref().unwrap().hash()),
        };
        assert!(pattern.is_fully_bound());
        let best = pattern.select_best();
        assert_eq!(pattern.prefix_for(best).len(), 1 + 64);
    }

    #[test]
    fn subject_only_pattern_prefers_spoc() {
        let q = quad();
        let pattern = Pattern {
            subject: Some(q.subject.hash()),
            ..Default::default()
        };
        assert_eq!(pattern.select_best(), IndexType::Spoc);
        assert_eq!(pattern.prefix_for(IndexType::Spoc).len(), 1 + 16);
    }

    #[test]
    fn object_only_pattern_prefers_ocsp() {
        let q = quad();
        let pattern = Pattern {
            object: Some(q.object.hash()),
            ..Default::default()
        };
        assert_eq!(pattern.select_best(), IndexType::Ocsp);
    }

    #[test]
    fn matches_respects_label_absence() {
        let mut q = quad();
        q.label = None;
        let pattern = Pattern {
            label: LabelPattern::Absent,
            ..Default::default()
        };
        assert!(pattern.matches(&q));
        let pattern_any_label = Pattern {
            label: LabelPattern::Present(Value::iri("http://example.org/g").hash()),
            ..Default::default()
        };
        assert!(!pattern_any_label.matches(&q));
    }

    #[test]
    fn unbound_pattern_matches_everything() {
        assert!(Pattern::default().matches(&quad()));
    }
}
