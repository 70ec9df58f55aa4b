//! Profile failures.

use crate::storage::{ErrorKind, StorageError};

/// Result type for profile calls.
pub type Result<T> = std::result::Result<T, TrxError>;

/// Errors returned by a profile invocation.
#[derive(Debug, thiserror::Error)]
pub enum TrxError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Some requested item ids are not in the catalog. TPC-C generates
    /// about 1% of New-Order calls this way on purpose.
    #[error("Order references unknown items: requested {requested}, found {found}")]
    InvalidItem { requested: usize, found: usize },

    #[error("Transaction cancelled")]
    Cancelled,
}

impl TrxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrxError::Storage(e) => e.kind(),
            TrxError::InvalidItem { .. } => ErrorKind::InvalidItem,
            TrxError::Cancelled => ErrorKind::Transport,
        }
    }

    /// Whether the retry loop may attempt the body again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TrxError::Cancelled) && self.kind().is_retryable()
    }
}
