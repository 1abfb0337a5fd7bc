//! Account key management for Vigil.
//!
//! Each account's durable secrets are encrypted under a random Data
//! Encryption Key (DEK). The DEK itself is never persisted or transmitted
//! in the clear — only its wrapped forms exist at rest:
//!
//! - `wrapped_dek_password`: DEK encrypted under a password-derived KEK
//! - `wrapped_dek_recovery`: the same DEK encrypted under a KEK derived
//!   from a 12-word recovery code
//!
//! This layering makes the account credential rotatable (password change
//! re-wraps; content is untouched) and recoverable (the recovery wrap
//! re-establishes access after a forgotten password).
//!
//! Accounts move through a migration state machine as they adopt the
//! scheme: `Legacy` (no DEK) → `Migrating` (password wrap only) →
//! `Upgraded` (both wraps present; terminal for normal operation).

mod error;
mod manager;
mod record;
mod reveal;
mod store;

pub use error::{KeyringError, KeyringResult};
pub use manager::AccountDekManager;
pub use record::{MigrationState, UserKeyRecord, WrappedDek, SCHEME_VERSION};
pub use reveal::{RevealProof, RevealProofGate, DEFAULT_PROOF_TTL_SECS};
pub use store::{KeyRecordStore, MemoryKeyRecordStore};
