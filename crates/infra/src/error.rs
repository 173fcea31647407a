//! Storage error shared by the social-graph, post, user and inbox stores.

use thiserror::Error;

/// Store operation error.
///
/// These are infrastructure failures surfaced unchanged to the caller; the
/// stores do not retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed (connectivity, poisoned lock, ...).
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        Self::Storage("lock poisoned".to_string())
    }
}
