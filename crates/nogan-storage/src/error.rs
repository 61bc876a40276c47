//! Storage error types for nogan-storage.

use thiserror::Error;

use nogan_core::NoganError;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The SQLite backend reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A schema migration could not be applied.
    #[error("migration error: {0}")]
    Migration(String),

    /// A snapshot with the given ID was not found.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(i64),

    /// A data integrity violation was detected.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },

    /// The stored snapshot does not describe a valid nogan.
    #[error("store error: {0}")]
    Store(#[from] NoganError),
}
