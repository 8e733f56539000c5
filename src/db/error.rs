//! Storage error types.

use thiserror::Error;

/// Errors from the key-value storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The job list could not be serialized for writing.
    #[error("Failed to encode jobs: {0}")]
    Encode(#[from] serde_json::Error),
}
