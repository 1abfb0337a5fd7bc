//! Encryption primitive for Vigil.
//!
//! Provides the single narrow crypto API every higher layer consumes:
//! - Argon2id for key derivation from passcodes, passwords, and recovery codes
//! - ChaCha20-Poly1305 for authenticated encryption
//! - Key material zeroized on drop
//!
//! # Architecture
//!
//! Two kinds of keys flow through this crate:
//!
//! 1. **Credential-derived keys (KEKs)**: derived from a typed secret with
//!    Argon2id and a salt. Never stored - re-derived on every use.
//!
//! 2. **Random content keys (DEKs / link keys)**: generated from OS entropy
//!    and only ever persisted wrapped (encrypted under a KEK).
//!
//! Decryption failure is a single, deliberately uninformative error shape:
//! a wrong credential and a tampered ciphertext are indistinguishable to
//! callers, so neither can be used as an oracle.

mod cipher;
mod error;
mod key;
mod recovery_code;

pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, generate_random_key, DerivedKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE};
pub use recovery_code::{
    generate_recovery_code, normalize_recovery_code, recovery_code_to_key, RECOVERY_CODE_WORDS,
};
