//! Error types for the vault.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault not set up")]
    NotSetUp,

    #[error("vault already set up")]
    AlreadySetUp,

    #[error("master passcode too short (min 8 characters)")]
    PasscodeTooShort,

    /// Wrong passcode and corrupted verification token are one shape.
    #[error("invalid passcode")]
    InvalidPasscode,

    /// No active session: never unlocked, explicitly locked, or expired.
    #[error("vault is locked")]
    LockedVault,

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("challenge invalid or expired")]
    ChallengeRejected,

    #[error("credential not registered")]
    CredentialNotRegistered,

    #[error("authenticator assertion rejected")]
    AssertionRejected,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("crypto error: {0}")]
    Crypto(String),
}

pub type VaultResult<T> = Result<T, VaultError>;
