//! Account DEK lifecycle: setup, rotation, recovery, reveal.

use crate::error::{KeyringError, KeyringResult};
use crate::record::{MigrationState, UserKeyRecord, WrappedDek, SCHEME_VERSION};
use crate::reveal::{RevealProof, RevealProofGate};
use crate::store::KeyRecordStore;
use std::sync::Arc;
use tracing::{info, warn};
use vigil_crypto::{
    decrypt, derive_key, encrypt, generate_random_key, generate_recovery_code,
    normalize_recovery_code, recovery_code_to_key, DerivedKey, KdfParams, Salt, KEY_SIZE,
};

/// Owns each account's DEK lifecycle and drives the migration state machine.
///
/// Every mutation of the key record goes through the store's version-checked
/// replace, so a multi-field rewrap either fully lands or leaves the previous
/// record (and the previous credential) intact.
pub struct AccountDekManager {
    store: Arc<dyn KeyRecordStore>,
    reveal_gate: RevealProofGate,
}

impl AccountDekManager {
    pub fn new(store: Arc<dyn KeyRecordStore>) -> Self {
        Self {
            store,
            reveal_gate: RevealProofGate::default(),
        }
    }

    /// Where the account stands in the migration state machine.
    /// Accounts without a key record are `Legacy`.
    pub fn migration_state(&self, user_id: &str) -> KeyringResult<MigrationState> {
        Ok(self
            .store
            .load(user_id)?
            .map(|r| r.migration_state)
            .unwrap_or(MigrationState::Legacy))
    }

    /// First-time upgrade: generates a random DEK, wraps it under a
    /// password-derived KEK with a fresh salt, and persists the record in
    /// state `Migrating`. Returns the DEK for immediate content encryption.
    pub fn setup_encryption(&self, user_id: &str, password: &str) -> KeyringResult<DerivedKey> {
        if self.store.load(user_id)?.is_some() {
            return Err(KeyringError::AlreadySetUp);
        }

        let dek = generate_random_key();
        let salt = Salt::random();
        let kek = derive_key(password, &salt, &KdfParams::default())?;
        let wrapped = encrypt(&kek, dek.as_bytes())?;

        let record = UserKeyRecord {
            user_id: user_id.to_string(),
            scheme_version: SCHEME_VERSION,
            wrapped_dek_password: Some(WrappedDek {
                kdf_salt: salt,
                wrapped,
            }),
            wrapped_dek_recovery: None,
            encrypted_recovery_code: None,
            migration_state: MigrationState::Migrating,
            record_version: 1,
        };
        self.store.insert(&record)?;

        info!(user_id, "account encryption set up, state migrating");
        Ok(dek)
    }

    /// Unwraps the account DEK with the password. The primitive every
    /// content operation uses to obtain the DEK.
    pub fn unwrap_dek(&self, user_id: &str, password: &str) -> KeyringResult<DerivedKey> {
        let record = self.load_required(user_id)?;
        let (_kek, dek) = unwrap_with_password(&record, password)?;
        Ok(dek)
    }

    /// Generates the account's recovery code, wraps the same DEK a second
    /// time under the code-derived KEK, stores the code's display copy
    /// (encrypted under the password-KEK path), and advances the account to
    /// `Upgraded`. One code per account; the code is returned exactly once.
    pub fn generate_recovery_code(
        &self,
        user_id: &str,
        password: &str,
    ) -> KeyringResult<String> {
        let record = self.load_required(user_id)?;
        if record.wrapped_dek_recovery.is_some() {
            return Err(KeyringError::RecoveryAlreadyConfigured);
        }

        let (password_kek, dek) = unwrap_with_password(&record, password)?;

        let code = generate_recovery_code()?;
        let recovery_salt = Salt::random();
        let recovery_kek = recovery_code_to_key(&code, &recovery_salt)?;
        let wrapped_recovery = encrypt(&recovery_kek, dek.as_bytes())?;
        let encrypted_code = encrypt(&password_kek, code.as_bytes())?;

        let expected = record.record_version;
        let updated = UserKeyRecord {
            wrapped_dek_recovery: Some(WrappedDek {
                kdf_salt: recovery_salt,
                wrapped: wrapped_recovery,
            }),
            encrypted_recovery_code: Some(encrypted_code),
            migration_state: MigrationState::Upgraded,
            record_version: expected + 1,
            ..record
        };
        self.store.replace(&updated, expected)?;

        info!(user_id, "recovery code generated, state upgraded");
        Ok(code)
    }

    /// Rotates the password. Unwraps the DEK via the old password, re-wraps
    /// it under a new KEK with a new salt, re-encrypts the recovery-code
    /// display copy, and replaces all affected fields in one atomic write.
    /// On conflict the operation fails loudly and the old password remains
    /// valid — there is no half-migrated state.
    pub fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> KeyringResult<()> {
        let record = self.load_required(user_id)?;
        let (old_kek, dek) = unwrap_with_password(&record, old_password)?;

        let new_salt = Salt::random();
        let new_kek = derive_key(new_password, &new_salt, &KdfParams::default())?;
        let rewrapped = encrypt(&new_kek, dek.as_bytes())?;

        // The display copy was encrypted under the old password path;
        // carry it over to the new one inside the same replace.
        let reencrypted_code = match &record.encrypted_recovery_code {
            Some(enc) => {
                let code_bytes = decrypt(&old_kek, enc)?;
                Some(encrypt(&new_kek, &code_bytes)?)
            }
            None => None,
        };

        let expected = record.record_version;
        let updated = UserKeyRecord {
            wrapped_dek_password: Some(WrappedDek {
                kdf_salt: new_salt,
                wrapped: rewrapped,
            }),
            encrypted_recovery_code: reencrypted_code,
            record_version: expected + 1,
            ..record
        };

        if let Err(err) = self.store.replace(&updated, expected) {
            warn!(user_id, %err, "password change did not complete; previous password remains valid");
            return Err(err);
        }

        info!(user_id, "password changed");
        Ok(())
    }

    /// Restores account access from the recovery code. Unwraps the DEK via
    /// the recovery wrap, re-wraps under a fresh password KEK, re-encrypts
    /// the display copy, and lands on `Upgraded` regardless of prior state.
    pub fn restore_from_recovery(
        &self,
        user_id: &str,
        code: &str,
        new_password: &str,
    ) -> KeyringResult<DerivedKey> {
        let record = self.load_required(user_id)?;
        let recovery_wrap = record
            .wrapped_dek_recovery
            .as_ref()
            .ok_or(KeyringError::RecoveryNotConfigured)?;

        let recovery_kek = recovery_code_to_key(code, &recovery_wrap.kdf_salt)?;
        let dek_bytes = decrypt(&recovery_kek, &recovery_wrap.wrapped)?;
        let dek = key_from_plaintext(&dek_bytes)?;

        let new_salt = Salt::random();
        let new_kek = derive_key(new_password, &new_salt, &KdfParams::default())?;
        let rewrapped = encrypt(&new_kek, dek.as_bytes())?;
        let encrypted_code =
            encrypt(&new_kek, normalize_recovery_code(code).as_bytes())?;

        let expected = record.record_version;
        let updated = UserKeyRecord {
            wrapped_dek_password: Some(WrappedDek {
                kdf_salt: new_salt,
                wrapped: rewrapped,
            }),
            encrypted_recovery_code: Some(encrypted_code),
            migration_state: MigrationState::Upgraded,
            record_version: expected + 1,
            ..record
        };

        if let Err(err) = self.store.replace(&updated, expected) {
            warn!(user_id, %err, "recovery restore did not complete");
            return Err(err);
        }

        info!(user_id, "account restored from recovery code");
        Ok(dek)
    }

    /// First step of the two-factor reveal: issues a single-use proof for
    /// out-of-band delivery. Requires that a recovery code exists.
    pub fn request_reveal_proof(&self, user_id: &str) -> KeyringResult<RevealProof> {
        let record = self.load_required(user_id)?;
        if record.encrypted_recovery_code.is_none() {
            return Err(KeyringError::RecoveryNotConfigured);
        }
        Ok(self.reveal_gate.issue(user_id))
    }

    /// Second step: verifies the password first (unified invalid-credential
    /// on failure), then consumes the out-of-band proof, and only with both
    /// factors decrypts and returns the stored recovery code. The password
    /// alone never reveals the code.
    pub fn reveal_recovery_code(
        &self,
        user_id: &str,
        password: &str,
        proof_code: &str,
    ) -> KeyringResult<String> {
        let record = self.load_required(user_id)?;
        let (password_kek, _dek) = unwrap_with_password(&record, password)?;

        if !self.reveal_gate.verify_and_consume(user_id, proof_code) {
            warn!(user_id, "recovery code reveal rejected: bad or expired proof");
            return Err(KeyringError::ProofRejected);
        }

        let encrypted_code = record
            .encrypted_recovery_code
            .as_ref()
            .ok_or(KeyringError::RecoveryNotConfigured)?;
        let code_bytes = decrypt(&password_kek, encrypted_code)?;
        String::from_utf8(code_bytes).map_err(|_| KeyringError::InvalidCredential)
    }

    fn load_required(&self, user_id: &str) -> KeyringResult<UserKeyRecord> {
        self.store.load(user_id)?.ok_or(KeyringError::NotFound)
    }
}

/// Derives the password KEK from the stored salt and unwraps the DEK.
/// Failure is the unified invalid-credential error.
fn unwrap_with_password(
    record: &UserKeyRecord,
    password: &str,
) -> KeyringResult<(DerivedKey, DerivedKey)> {
    let wrap = record
        .wrapped_dek_password
        .as_ref()
        .ok_or(KeyringError::NotFound)?;
    let kek = derive_key(password, &wrap.kdf_salt, &KdfParams::default())?;
    let dek_bytes = decrypt(&kek, &wrap.wrapped)?;
    let dek = key_from_plaintext(&dek_bytes)?;
    Ok((kek, dek))
}

fn key_from_plaintext(bytes: &[u8]) -> KeyringResult<DerivedKey> {
    if bytes.len() != KEY_SIZE {
        // Wrong-length plaintext means a corrupted wrap; unified error
        return Err(KeyringError::InvalidCredential);
    }
    let mut arr = [0u8; KEY_SIZE];
    arr.copy_from_slice(bytes);
    Ok(DerivedKey::from_bytes(arr))
}
