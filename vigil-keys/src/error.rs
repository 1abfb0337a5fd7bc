//! Error types for account key management.

use thiserror::Error;
use vigil_crypto::CryptoError;

#[derive(Debug, Error)]
pub enum KeyringError {
    /// Wrong password, wrong recovery code, or corrupted wrap — one shape,
    /// no distinguishing detail.
    #[error("invalid credential")]
    InvalidCredential,

    #[error("account keys already set up")]
    AlreadySetUp,

    #[error("recovery code already generated")]
    RecoveryAlreadyConfigured,

    #[error("recovery not configured")]
    RecoveryNotConfigured,

    #[error("account keys not found")]
    NotFound,

    /// The version-checked replace lost a race. Nothing was written; the
    /// previous credential is still valid.
    #[error("concurrent key update detected")]
    Conflict,

    #[error("reveal proof rejected")]
    ProofRejected,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<CryptoError> for KeyringError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Decryption | CryptoError::InvalidRecoveryCode => {
                KeyringError::InvalidCredential
            }
            other => KeyringError::Crypto(other.to_string()),
        }
    }
}

pub type KeyringResult<T> = Result<T, KeyringError>;
