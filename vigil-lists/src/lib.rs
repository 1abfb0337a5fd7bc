//! Encrypted prayer lists.
//!
//! Two encryption schemes live here, kept deliberately distinct from the
//! account-level DEK/KEK machinery in `vigil-keys`:
//!
//! 1. **Entity lists**: a single owner's list, encrypted directly under a
//!    key derived fresh from that owner's passcode on every call. Simple
//!    and shareable by sharing the passcode.
//!
//! 2. **Linked lists**: a two-party shared list. One random content key is
//!    generated at link creation and wrapped twice, once per party's
//!    passcode-derived key, so either party independently recovers the same
//!    key. The wrapped keys never change after creation; mutation only
//!    replaces the content ciphertext.
//!
//! Payloads are versioned, strongly typed records; fields added after v1
//! carry serde defaults so older ciphertexts decode without guessing.

mod entity;
mod error;
mod link;
mod payload;

pub use entity::{
    decrypt_list, decrypt_list_with_key, encrypt_list, encrypt_list_with_key, EncryptedList,
};
pub use error::{ListError, ListResult};
pub use link::{create_link, unwrap_for_party, LinkKeyPair, LinkParty, WrappedKey};
pub use payload::{ListFacts, Prayer, PrayerListPayload, SCHEMA_VERSION};
