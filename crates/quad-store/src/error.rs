//! Error taxonomy.

use quad_model::{Quad, Value};
use std::fmt;

/// Low-level key-value storage errors, carrying the error taxonomy's
/// names for backend-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error (file system, network, etc).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A backend refused the operation for a reason specific to it.
    #[error("backend error: {0}")]
    Backend(String),
    /// A schema already exists at `init` time.
    #[error("database already exists at this path")]
    DatabaseExists,
    /// No schema found at `open` time.
    #[error("no database found at this path")]
    DatabaseMissing,
    /// The backend does not support a bulk-load fast path.
    #[error("backend cannot bulk load: {0}")]
    CannotBulkLoad(String),
    /// The operation was cancelled via its `CancellationToken`.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for storage-backend-level operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The kind of failure a single [`crate::Delta`] can suffer applying
///.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaErrorKind {
    /// A delta's action was outside `{Add, Delete}`. The CORE's `Action`
    /// enum only has two variants, so this is reserved for future wire
    /// decode paths that accept an out-of-range discriminant.
    InvalidAction,
    /// `Add` on a quad that is already live, without `ignore_dup`.
    QuadExists,
    /// `Delete` on a quad that is not live, without `ignore_missing`.
    QuadNotExist,
    /// `remove_node` targeted a value with no live references.
    NodeNotExists,
    /// The backend failed for a reason of its own.
    Backend(String),
    /// Cancelled mid-application; the whole batch was rolled back.
    Cancelled,
}

impl fmt::Display for DeltaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaErrorKind::InvalidAction => write!(f, "invalid action"),
            DeltaErrorKind::QuadExists => write!(f, "quad already exists"),
            DeltaErrorKind::QuadNotExist => write!(f, "quad does not exist"),
            DeltaErrorKind::NodeNotExists => write!(f, "node does not exist"),
            DeltaErrorKind::Backend(e) => write!(f, "backend error: {e}"),
            DeltaErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A single delta's failure, with the offending delta attached so a
/// caller can tell which one in a batch went wrong.
#[derive(Debug)]
pub struct DeltaError {
    /// The quad the failing delta concerned.
    pub quad: Quad,
    /// Why it failed.
    pub kind: DeltaErrorKind,
}

impl fmt::Display for DeltaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (quad: {})", self.kind, self.quad)
    }
}

impl std::error::Error for DeltaError {}

impl From<StorageError> for DeltaErrorKind {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Cancelled => DeltaErrorKind::Cancelled,
            other => DeltaErrorKind::Backend(other.to_string()),
        }
    }
}
