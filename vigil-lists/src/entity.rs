//! Single-owner encrypted lists.
//!
//! The content key is derived fresh from the owner's passcode on every
//! call; the KDF salt is the only per-entity key state and travels with
//! the ciphertext.

use crate::error::{ListError, ListResult};
use crate::payload::{Prayer, PrayerListPayload};
use serde::{Deserialize, Serialize};
use vigil_crypto::{decrypt, derive_key, encrypt, DerivedKey, EncryptedData, KdfParams, Salt};

/// An encrypted prayer list bundled with its KDF salt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedList {
    pub kdf_salt: Salt,
    pub data: EncryptedData,
}

/// Encrypts a prayer list directly under a passcode-derived key.
///
/// A fresh salt (and therefore a fresh key) is used on every call; two
/// encryptions of the same list share no key material.
pub fn encrypt_list(passcode: &str, prayers: &[Prayer]) -> ListResult<EncryptedList> {
    let salt = Salt::random();
    let key = derive_key(passcode, &salt, &KdfParams::default())?;
    let data = encrypt_list_with_key(&key, prayers)?;
    Ok(EncryptedList {
        kdf_salt: salt,
        data,
    })
}

/// Decrypts a prayer list with the owner's passcode.
///
/// A wrong passcode and a corrupted ciphertext fail identically.
pub fn decrypt_list(passcode: &str, list: &EncryptedList) -> ListResult<Vec<Prayer>> {
    let key = derive_key(passcode, &list.kdf_salt, &KdfParams::default())?;
    decrypt_list_with_key(&key, &list.data)
}

/// Encrypts a prayer list under a caller-supplied content key (link lists).
pub fn encrypt_list_with_key(key: &DerivedKey, prayers: &[Prayer]) -> ListResult<EncryptedData> {
    let payload = PrayerListPayload::new(prayers.to_vec());
    let bytes = payload.encode()?;
    Ok(encrypt(key, &bytes)?)
}

/// Decrypts a prayer list under a caller-supplied content key.
pub fn decrypt_list_with_key(key: &DerivedKey, data: &EncryptedData) -> ListResult<Vec<Prayer>> {
    let bytes = decrypt(key, data).map_err(|_| ListError::Decryption)?;
    let payload = PrayerListPayload::decode(&bytes)?;
    Ok(payload.prayers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Prayer;

    #[test]
    fn passcode_roundtrip() {
        let prayers = vec![Prayer::new("guidance", "work"), Prayer::new("rest", "self")];
        let encrypted = encrypt_list("my-passcode", &prayers).unwrap();
        let decrypted = decrypt_list("my-passcode", &encrypted).unwrap();
        assert_eq!(decrypted, prayers);
    }

    #[test]
    fn wrong_passcode_fails_with_unified_error() {
        let encrypted = encrypt_list("right", &[Prayer::new("x", "general")]).unwrap();
        assert!(matches!(
            decrypt_list("wrong", &encrypted),
            Err(ListError::Decryption)
        ));
    }

    #[test]
    fn corrupted_ciphertext_fails_with_same_error_as_wrong_passcode() {
        let mut encrypted = encrypt_list("right", &[Prayer::new("x", "general")]).unwrap();
        let last = encrypted.data.ciphertext.len() - 1;
        encrypted.data.ciphertext[last] ^= 0x01;

        assert!(matches!(
            decrypt_list("right", &encrypted),
            Err(ListError::Decryption)
        ));
    }

    #[test]
    fn fresh_salt_per_encryption() {
        let prayers = [Prayer::new("x", "general")];
        let e1 = encrypt_list("pass", &prayers).unwrap();
        let e2 = encrypt_list("pass", &prayers).unwrap();
        assert_ne!(e1.kdf_salt.as_bytes(), e2.kdf_salt.as_bytes());
    }

    #[test]
    fn empty_list_roundtrips() {
        let encrypted = encrypt_list("pass", &[]).unwrap();
        assert!(decrypt_list("pass", &encrypted).unwrap().is_empty());
    }
}
