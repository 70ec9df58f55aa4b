//! Storage error taxonomy.

use crate::models::Table;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Coarse classification the orchestrator makes retry decisions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Targeted row does not exist.
    NotFound,
    /// An optimistic check or lock lost a race.
    Conflict,
    /// New-Order referenced an unknown item (the deliberate 1% rollback).
    InvalidItem,
    /// Connectivity or backend fault.
    Transport,
}

impl ErrorKind {
    /// Whether a transactional retry loop may re-attempt after this kind.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::NotFound)
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Conflict on {entity}: {reason}")]
    Conflict { entity: &'static str, reason: String },

    #[error("Batch insert into {table} rejected {failed} of {total} records: {reason}")]
    BatchRejected {
        table: Table,
        failed: usize,
        total: usize,
        reason: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "elasticsearch")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        StorageError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn conflict(entity: &'static str, reason: impl Into<String>) -> Self {
        StorageError::Conflict {
            entity,
            reason: reason.into(),
        }
    }

    /// Classify into the orchestrator's error kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Conflict { .. } => ErrorKind::Conflict,
            StorageError::Database(e) => classify_sqlx(e),
            #[cfg(feature = "elasticsearch")]
            StorageError::Http(_) => ErrorKind::Transport,
            StorageError::BatchRejected { .. }
            | StorageError::Transport(_)
            | StorageError::Json(_)
            | StorageError::InvalidTimestamp(_) => ErrorKind::Transport,
        }
    }
}

/// PostgreSQL SQLSTATEs and SQLite extended result codes that mean another
/// writer won.
const CONFLICT_CODES: &[&str] = &[
    // PostgreSQL: serialization_failure, deadlock_detected, unique_violation
    "40001", "40P01", "23505",
    // SQLite: BUSY, LOCKED, BUSY_SNAPSHOT, CONSTRAINT_PRIMARYKEY, CONSTRAINT_UNIQUE
    "5", "6", "517", "1555", "2067",
];

fn classify_sqlx(error: &sqlx::Error) -> ErrorKind {
    match error {
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::Database(db) => match db.code() {
            Some(code) if CONFLICT_CODES.contains(&code.as_ref()) => ErrorKind::Conflict,
            _ => ErrorKind::Transport,
        },
        _ => ErrorKind::Transport,
    }
}
