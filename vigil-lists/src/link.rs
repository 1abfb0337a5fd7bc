//! Two-party link key exchange.
//!
//! One random content key `K` per link, wrapped twice — once under each
//! party's passcode-derived KEK. Unwrapping either side must yield
//! byte-identical keys; that identity is the correctness contract of the
//! whole sharing scheme. The wrapped keys are immutable after creation.

use crate::error::{ListError, ListResult};
use serde::{Deserialize, Serialize};
use vigil_crypto::{
    decrypt, derive_key, encrypt, generate_random_key, DerivedKey, EncryptedData, KdfParams,
    Salt, KEY_SIZE,
};

/// Which side of a link the caller is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkParty {
    Person1,
    Person2,
}

/// A content key wrapped under one party's passcode-derived KEK.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WrappedKey {
    pub kdf_salt: Salt,
    pub wrapped: EncryptedData,
}

/// The pair of wrapped copies of a link's content key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkKeyPair {
    pub person1_key_wrapped: WrappedKey,
    pub person2_key_wrapped: WrappedKey,
}

impl LinkKeyPair {
    pub fn wrapped_for(&self, party: LinkParty) -> &WrappedKey {
        match party {
            LinkParty::Person1 => &self.person1_key_wrapped,
            LinkParty::Person2 => &self.person2_key_wrapped,
        }
    }
}

/// Creates the key material for a new link.
///
/// Generates a fresh random content key and wraps it under each passcode's
/// KEK with independent salts. The plaintext content key and both KEKs are
/// zeroized when they drop at the end of this function; only the wrapped
/// forms escape.
pub fn create_link(passcode1: &str, passcode2: &str) -> ListResult<LinkKeyPair> {
    let content_key = generate_random_key();

    Ok(LinkKeyPair {
        person1_key_wrapped: wrap_key(&content_key, passcode1)?,
        person2_key_wrapped: wrap_key(&content_key, passcode2)?,
    })
}

/// Unwraps the link content key for one party.
///
/// A wrong passcode and a corrupted wrapped key fail identically.
pub fn unwrap_for_party(
    party: LinkParty,
    passcode: &str,
    keys: &LinkKeyPair,
) -> ListResult<DerivedKey> {
    let wrapped = keys.wrapped_for(party);
    let kek = derive_key(passcode, &wrapped.kdf_salt, &KdfParams::default())?;
    let plaintext = decrypt(&kek, &wrapped.wrapped).map_err(|_| ListError::Decryption)?;

    // A wrong-length plaintext means a corrupted record; same unified error.
    if plaintext.len() != KEY_SIZE {
        return Err(ListError::Decryption);
    }
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&plaintext);
    Ok(DerivedKey::from_bytes(bytes))
}

fn wrap_key(content_key: &DerivedKey, passcode: &str) -> ListResult<WrappedKey> {
    let salt = Salt::random();
    let kek = derive_key(passcode, &salt, &KdfParams::default())?;
    let wrapped = encrypt(&kek, content_key.as_bytes())?;
    Ok(WrappedKey {
        kdf_salt: salt,
        wrapped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{decrypt_list_with_key, encrypt_list_with_key};
    use crate::payload::Prayer;

    #[test]
    fn both_parties_unwrap_the_same_key() {
        let keys = create_link("pass-one", "pass-two").unwrap();

        let k1 = unwrap_for_party(LinkParty::Person1, "pass-one", &keys).unwrap();
        let k2 = unwrap_for_party(LinkParty::Person2, "pass-two", &keys).unwrap();

        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn wrong_passcode_fails() {
        let keys = create_link("pass-one", "pass-two").unwrap();
        assert!(matches!(
            unwrap_for_party(LinkParty::Person1, "pass-two", &keys),
            Err(ListError::Decryption)
        ));
    }

    #[test]
    fn party_cannot_unwrap_the_other_side() {
        let keys = create_link("pass-one", "pass-two").unwrap();
        // Person 2's wrapped copy is opaque to person 1's passcode
        assert!(unwrap_for_party(LinkParty::Person2, "pass-one", &keys).is_err());
    }

    #[test]
    fn content_written_by_one_party_reads_by_the_other() {
        let keys = create_link("alpha", "beta").unwrap();

        let k1 = unwrap_for_party(LinkParty::Person1, "alpha", &keys).unwrap();
        let prayers = vec![Prayer::new("for us both", "shared")];
        let ciphertext = encrypt_list_with_key(&k1, &prayers).unwrap();

        let k2 = unwrap_for_party(LinkParty::Person2, "beta", &keys).unwrap();
        let read_back = decrypt_list_with_key(&k2, &ciphertext).unwrap();

        assert_eq!(read_back, prayers);
    }

    #[test]
    fn tampered_wrapped_key_fails_like_wrong_passcode() {
        let mut keys = create_link("pass-one", "pass-two").unwrap();
        keys.person1_key_wrapped.wrapped.ciphertext[0] ^= 0xFF;

        assert!(matches!(
            unwrap_for_party(LinkParty::Person1, "pass-one", &keys),
            Err(ListError::Decryption)
        ));
    }
}
