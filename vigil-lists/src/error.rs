//! Error types for encrypted lists.

use thiserror::Error;
use vigil_crypto::CryptoError;

#[derive(Debug, Error)]
pub enum ListError {
    /// Wrong passcode, corrupted ciphertext, and undecodable plaintext all
    /// surface as this one shape — none may act as an oracle for the others.
    #[error("decryption failed")]
    Decryption,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("payload encoding failed: {0}")]
    Encoding(String),

    #[error("unsupported payload schema version {0}")]
    UnsupportedSchemaVersion(u32),
}

impl From<CryptoError> for ListError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Decryption => ListError::Decryption,
            other => ListError::Encryption(other.to_string()),
        }
    }
}

pub type ListResult<T> = Result<T, ListError>;
