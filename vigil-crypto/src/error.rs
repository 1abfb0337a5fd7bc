//! Error types for the crypto primitive.

use thiserror::Error;

/// All errors the crypto primitive can produce.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Wrong key and tampered ciphertext both land here, with no detail
    /// that would let a caller tell the two apart.
    #[error("decryption failed")]
    Decryption,

    #[error("invalid recovery code")]
    InvalidRecoveryCode,
}

pub type CryptoResult<T> = Result<T, CryptoError>;
