//! Human-readable recovery codes.
//!
//! A recovery code is a 12-word sequence drawn from the BIP39 wordlist,
//! carrying 128 bits of entropy. It is generated exactly once per account,
//! shown to the user exactly once, and thereafter only retrievable through
//! the two-factor reveal flow in the key manager.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, DerivedKey, KdfParams, Salt};
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of words in a recovery code.
pub const RECOVERY_CODE_WORDS: usize = 12;

/// Generates a new 12-word recovery code from 128 bits of OS entropy.
pub fn generate_recovery_code() -> CryptoResult<String> {
    let mut entropy = [0u8; 16];
    OsRng.fill_bytes(&mut entropy);

    let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
        .map_err(|e| CryptoError::KeyDerivation(format!("recovery code generation failed: {e}")))?;

    Ok(mnemonic.to_string())
}

/// Derives the recovery KEK from a recovery code and the wrap's KDF salt.
///
/// Input is normalized (trimmed, lowercased, single-spaced) before
/// validation and derivation, so the code survives retyping.
pub fn recovery_code_to_key(code: &str, salt: &Salt) -> CryptoResult<DerivedKey> {
    let normalized = normalize_recovery_code(code);

    let _: bip39::Mnemonic = normalized
        .parse()
        .map_err(|_| CryptoError::InvalidRecoveryCode)?;

    derive_key(&normalized, salt, &KdfParams::default())
}

/// Canonical form of a recovery code: trimmed, lowercased, single-spaced.
/// Both key derivation and at-rest display copies use this form.
pub fn normalize_recovery_code(code: &str) -> String {
    code.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
