//! The polymorphic value space (DATA MODEL).

use crate::hash::ValueHash;
use std::fmt;
use time::OffsetDateTime;

/// A tagged union over every kind of node the store can hold.
///
/// Every variant has a canonical byte serialization ([`Value::canonical_bytes`])
/// that [`ValueHash::of`] is fed to produce the value's fingerprint. Identity
/// equality between two `Value`s is exactly hash equality : callers
/// that only need to compare values should prefer comparing `value.hash()`
/// over deriving `PartialEq` on floats/times, which is why this type does
/// not implement `Eq` itself.
#[derive(Clone, Debug)]
pub enum Value {
    /// An IRI / URI reference, e.g. `http://example.org/resource`.
    Iri(Box<str>),
    /// A blank node, identified by a locally-scoped label.
    BlankNode(Box<str>),
    /// A literal with an explicit datatype IRI, e.g. `"42"^^xsd:integer`.
    TypedString {
        /// Lexical form.
        value: Box<str>,
        /// Datatype IRI.
        datatype: Box<str>,
    },
    /// A language-tagged string, e.g. `"chat"@en`.
    LangString {
        /// Lexical form.
        value: Box<str>,
        /// BCP-47 language tag.
        lang: Box<str>,
    },
    /// A plain string with neither datatype nor language tag.
    PlainString(Box<str>),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// A UTC timestamp with sub-second precision.
    Time(OffsetDateTime),
    /// Opaque raw bytes, for values with no natural textual form.
    Bytes(Box<[u8]>),
}

/// Type tags for the canonical byte form. Stable across process restarts —
/// these are persisted indirectly via the hash, so never renumber them.
mod tag {
    pub const IRI: u8 = 0;
    pub const BLANK_NODE: u8 = 1;
    pub const TYPED_STRING: u8 = 2;
    pub const LANG_STRING: u8 = 3;
    pub const PLAIN_STRING: u8 = 4;
    pub const INT: u8 = 5;
    pub const FLOAT: u8 = 6;
    pub const BOOL: u8 = 7;
    pub const TIME: u8 = 8;
    pub const BYTES: u8 = 9;
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn read_u64(buf: &[u8], pos: &mut usize) -> Result<u64, crate::ModelError> {
    let bytes: [u8; 8] = buf
        .get(*pos..*pos + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| crate::ModelError::MalformedEncoding("truncated length".into()))?;
    *pos += 8;
    Ok(u64::from_be_bytes(bytes))
}

fn read_str(buf: &[u8], pos: &mut usize) -> Result<Box<str>, crate::ModelError> {
    let len = read_u64(buf, pos)? as usize;
    let bytes = buf
        .get(*pos..*pos + len)
        .ok_or_else(|| crate::ModelError::MalformedEncoding("truncated string".into()))?;
    *pos += len;
    std::str::from_utf8(bytes)
        .map(|s| s.into())
        .map_err(|e| crate::ModelError::MalformedEncoding(e.to_string()))
}

impl Value {
    /// Construct an IRI value.
    pub fn iri(s: impl Into<Box<str>>) -> Self {
        Value::Iri(s.into())
    }

    /// Construct a blank node value.
    pub fn blank_node(s: impl Into<Box<str>>) -> Self {
        Value::BlankNode(s.into())
    }

    /// Construct a plain string literal.
    pub fn plain(s: impl Into<Box<str>>) -> Self {
        Value::PlainString(s.into())
    }

    /// Construct a language-tagged string literal.
    pub fn lang_string(value: impl Into<Box<str>>, lang: impl Into<Box<str>>) -> Self {
        Value::LangString {
            value: value.into(),
            lang: lang.into(),
        }
    }

    /// Construct a typed literal.
    pub fn typed_string(value: impl Into<Box<str>>, datatype: impl Into<Box<str>>) -> Self {
        Value::TypedString {
            value: value.into(),
            datatype: datatype.into(),
        }
    }

    /// Canonical byte serialization used for hashing.
    ///
    /// Format is `[tag:u8][payload]`, with every variable-length field
    /// length-prefixed so no two distinct values can share an encoding
    /// (the classic "does `(a, bc)` collide with `(ab, c)`" pitfall).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        match self {
            Value::Iri(s) => {
                buf.push(tag::IRI);
                push_str(&mut buf, s);
            }
            Value::BlankNode(s) => {
                buf.push(tag::BLANK_NODE);
                push_str(&mut buf, s);
            }
            Value::TypedString { value, datatype } => {
                buf.push(tag::TYPED_STRING);
                push_str(&mut buf, value);
                push_str(&mut buf, datatype);
            }
            Value::LangString { value, lang } => {
                buf.push(tag::LANG_STRING);
                push_str(&mut buf, value);
                push_str(&mut buf, lang);
            }
            Value::PlainString(s) => {
                buf.push(tag::PLAIN_STRING);
                push_str(&mut buf, s);
            }
            Value::Int(i) => {
                buf.push(tag::INT);
                buf.extend_from_slice(&i.to_be_bytes());
            }
            Value::Float(f) => {
                buf.push(tag::FLOAT);
                // Normalize -0.0 to 0.0 and all NaNs to one bit pattern so
                // canonical form only disagrees with `==` where IEEE 754
                // itself disagrees with identity (NaN != NaN).
                let bits = if f.is_nan() {
                    f64::NAN.to_bits()
                } else if *f == 0.0 {
                    0.0f64.to_bits()
                } else {
                    f.to_bits()
                };
                buf.extend_from_slice(&bits.to_be_bytes());
            }
            Value::Bool(b) => {
                buf.push(tag::BOOL);
                buf.push(*b as u8);
            }
            Value::Time(t) => {
                buf.push(tag::TIME);
                let utc = t.to_offset(time::UtcOffset::UTC);
                buf.extend_from_slice(&utc.unix_timestamp_nanos().to_be_bytes());
            }
            Value::Bytes(b) => {
                buf.push(tag::BYTES);
                buf.extend_from_slice(&(b.len() as u64).to_be_bytes());
                buf.extend_from_slice(b);
            }
        }
        buf
    }

    /// Stable 128-bit fingerprint of this value.
    pub fn hash(&self) -> ValueHash {
        ValueHash::of(&self.canonical_bytes())
    }

    /// Inverse of [`Value::canonical_bytes`], used by a store's `value_of`
    /// to recover a value from what it persisted under a hash.
    pub fn from_canonical_bytes(buf: &[u8]) -> Result<Self, crate::ModelError> {
        let mut pos = 0usize;
        let t = *buf
            .first()
            .ok_or_else(|| crate::ModelError::MalformedEncoding("empty buffer".into()))?;
        pos += 1;
        match t {
            tag::IRI => Ok(Value::Iri(read_str(buf, &mut pos)?)),
            tag::BLANK_NODE => Ok(Value::BlankNode(read_str(buf, &mut pos)?)),
            tag::TYPED_STRING => {
                let value = read_str(buf, &mut pos)?;
                let datatype = read_str(buf, &mut pos)?;
                Ok(Value::TypedString { value, datatype })
            }
            tag::LANG_STRING => {
                let value = read_str(buf, &mut pos)?;
                let lang = read_str(buf, &mut pos)?;
                Ok(Value::LangString { value, lang })
            }
            tag::PLAIN_STRING => Ok(Value::PlainString(read_str(buf, &mut pos)?)),
            tag::INT => {
                let bytes: [u8; 8] = buf
                    .get(pos..pos + 8)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(|| crate::ModelError::MalformedEncoding("truncated int".into()))?;
                Ok(Value::Int(i64::from_be_bytes(bytes)))
            }
            tag::FLOAT => {
                let bytes: [u8; 8] = buf
                    .get(pos..pos + 8)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(|| crate::ModelError::MalformedEncoding("truncated float".into()))?;
                Ok(Value::Float(f64::from_bits(u64::from_be_bytes(bytes))))
            }
            tag::BOOL => {
                let b = *buf
                    .get(pos)
                    .ok_or_else(|| crate::ModelError::MalformedEncoding("truncated bool".into()))?;
                Ok(Value::Bool(b != 0))
            }
            tag::TIME => {
                let bytes: [u8; 16] = buf
                    .get(pos..pos + 16)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(|| crate::ModelError::MalformedEncoding("truncated time".into()))?;
                let nanos = i128::from_be_bytes(bytes);
                let t = OffsetDateTime::from_unix_timestamp_nanos(nanos)
                    .map_err(|e| crate::ModelError::MalformedEncoding(e.to_string()))?;
                Ok(Value::Time(t))
            }
            tag::BYTES => {
                let len = read_u64(buf, &mut pos)? as usize;
                let bytes = buf
                    .get(pos..pos + len)
                    .ok_or_else(|| crate::ModelError::MalformedEncoding("truncated bytes".into()))?;
                Ok(Value::Bytes(bytes.to_vec().into_boxed_slice()))
            }
            other => Err(crate::ModelError::MalformedEncoding(format!("unknown tag {other}"))),
        }
    }

    /// Whether this value may legally occupy a quad's Subject position.
    /// Subject, Predicate and Object must be present; no variant
    /// restriction beyond presence is imposed here, callers building
    /// backend-specific schemas may add their own.
    pub fn is_iri(&self) -> bool {
        matches!(self, Value::Iri(_))
    }

    /// True for [`Value::BlankNode`].
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Value::BlankNode(_))
    }

    /// The bare lexical string an IRI/blank-node/string-family value
    /// carries, with no quoting or datatype/language suffix — what a glob
    /// or regex filter (`ValueFilter::Wildcard`/`Regexp`) should
    /// match against rather than [`Value`]'s quoted `Display` form. `None`
    /// for variants with no natural string form (`Int`, `Float`, `Bool`,
    /// `Time`, `Bytes`).
    pub fn lexical_form(&self) -> Option<&str> {
        match self {
            Value::Iri(s) => Some(s),
            Value::BlankNode(s) => Some(s),
            Value::PlainString(s) => Some(s),
            Value::LangString { value,.. } => Some(value),
            Value::TypedString { value,.. } => Some(value),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Time(_) | Value::Bytes(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(s) => write!(f, "<{}>", s),
            Value::BlankNode(s) => write!(f, "_:{}", s),
            Value::TypedString { value, datatype } => {
                write!(f, "\"{}\"^^<{}>", value, datatype)
            }
            Value::LangString { value, lang } => write!(f, "\"{}\"@{}", value, lang),
            Value::PlainString(s) => write!(f, "\"{}\"", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Time(t) => write!(f, "{}", t),
            Value::Bytes(b) => write!(f, "0x{}", b.iter().map(|x| format!("{:02x}", x)).collect::<String>()),
        }
    }
}
