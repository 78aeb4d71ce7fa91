//! The polymorphic value space and the quad type (DATA MODEL).
//!
//! This crate has no notion of a backend, a store, or an iterator — it only
//! defines what a value *is* and how to fingerprint one. `quad-store` builds
//! `NodeRef`/`QuadRef` handles on top of the hashes this crate produces.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod direction;
mod hash;
mod quad;
mod value;

pub use direction::Direction;
pub use hash::ValueHash;
pub use quad::{Quad, QuadKey};
pub use value::Value;

/// Errors that can occur constructing or decoding values.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A canonical byte form could not be decoded back into a `Value`.
    #[error("malformed canonical value encoding: {0}")]
    MalformedEncoding(String),
    /// A quad failed a structural precondition (e.g. wrong arity on decode).
    #[error("malformed quad: {0}")]
    MalformedQuad(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_compiles() {
        let v = Value::iri("http://example.org/x");
        assert!(v.is_iri());
    }
}
