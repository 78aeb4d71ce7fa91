//! Cooperative cancellation (iterators and long-running
//! operations accept a cancellation token, checked at safe points).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{StorageError, StorageResult};

/// A cheaply-cloned handle that can signal cancellation to whoever holds a
/// clone of it. Checking it is always non-blocking.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether `cancel` has been called on this token or any of its
    /// clones.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Convenience check for a safe point in a loop: returns
    /// `Err(StorageError::Cancelled)` if cancelled, `Ok(())` otherwise.
    pub fn check(&self) -> StorageResult<()> {
        if self.is_cancelled() {
            Err(StorageError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancelling_a_clone_is_visible_on_the_original() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().is_err());
    }
}
