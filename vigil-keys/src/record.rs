//! Persisted account key records.

use serde::{Deserialize, Serialize};
use vigil_crypto::{EncryptedData, Salt};

/// Current wrapping-scheme version.
pub const SCHEME_VERSION: u32 = 1;

/// A DEK encrypted under a credential-derived KEK, with that KEK's salt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WrappedDek {
    pub kdf_salt: Salt,
    pub wrapped: EncryptedData,
}

/// An account's progress through adopting DEK-based encryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// No DEK exists; the account predates the scheme.
    Legacy,
    /// DEK generated and password-wrapped, recovery wrap still missing.
    Migrating,
    /// Both wraps present. Terminal for normal operation.
    Upgraded,
}

/// At-rest key material for one account. The plaintext DEK never appears
/// here — only its wrapped forms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserKeyRecord {
    pub user_id: String,
    pub scheme_version: u32,
    pub wrapped_dek_password: Option<WrappedDek>,
    pub wrapped_dek_recovery: Option<WrappedDek>,
    /// Display copy of the recovery code, encrypted under the password-KEK
    /// path. Password change and recovery restore must re-encrypt it in the
    /// same atomic replace that swaps the password wrap.
    pub encrypted_recovery_code: Option<EncryptedData>,
    pub migration_state: MigrationState,
    /// Optimistic-concurrency version for the all-or-nothing replace.
    pub record_version: u64,
}
