//! Error types for the storage layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    /// The row changed underneath the caller. Nothing was written; the
    /// caller must re-read and retry.
    #[error("version conflict on record {id}: expected version {expected}")]
    VersionConflict { id: String, expected: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
