//! Iterator-level error taxonomy (Iterators expose a terminal
//! `err` reachable after `next` returns false).

use quad_store::StorageError;

/// What can go wrong advancing or probing an iterator tree.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IterError {
    /// The backend a leaf iterator pulled from failed.
    #[error("backend error: {0}")]
    Backend(String),
    /// A cancellation token was observed cancelled mid-operation.
    #[error("operation cancelled")]
    Cancelled,
    /// `contains`/`next` was called on a [`crate::state::IterState::Closed`]
    /// iterator.
    #[error("iterator is closed")]
    Closed,
    /// A [`crate::not::Not`] was built or queried without a bound universe.
    #[error("Not requires a bound parent universe")]
    UnboundNot,
}

impl From<StorageError> for IterError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Cancelled => IterError::Cancelled,
            other => IterError::Backend(other.to_string()),
        }
    }
}

/// Result type threaded through every `QIter` method that can fail.
pub type IterResult<T> = Result<T, IterError>;
