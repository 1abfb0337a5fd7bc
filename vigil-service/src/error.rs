//! Service-level error taxonomy.

use thiserror::Error;
use vigil_lists::ListError;
use vigil_storage::StorageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Wrong credential or corrupted ciphertext; deliberately one shape.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("not found: {0}")]
    NotFound(String),

    /// Caller is not a party to the link they addressed.
    #[error("not authorized")]
    NotAuthorized,

    /// The record changed between read and write. Nothing was saved;
    /// re-read and retry.
    #[error("concurrent modification, retry")]
    Conflict,

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ListError> for ServiceError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::Decryption => ServiceError::DecryptionFailed,
            ListError::UnsupportedSchemaVersion(v) => {
                ServiceError::Validation(format!("unsupported schema version {v}"))
            }
            other => ServiceError::Storage(other.to_string()),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => ServiceError::NotFound(id),
            StorageError::VersionConflict { .. } => ServiceError::Conflict,
            other => ServiceError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Storage(e.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
