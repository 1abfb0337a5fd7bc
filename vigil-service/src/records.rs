//! Stored record shapes for the two list kinds.
//!
//! These are the JSON bodies persisted in `ListStore::record_json`. Both are
//! ciphertext-bearing envelopes; the only plaintext inside is key-wrapping
//! metadata (salts) and, for links, the party ids used for authorization.

use serde::{Deserialize, Serialize};
use vigil_crypto::EncryptedData;
use vigil_lists::{EncryptedList, LinkKeyPair, LinkParty};

/// A single owner's encrypted list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityListRecord {
    pub list: EncryptedList,
}

/// A two-party linked list: the wrapped key pair (immutable after creation)
/// plus the current content ciphertext.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkListRecord {
    pub person1_id: String,
    pub person2_id: String,
    pub keys: LinkKeyPair,
    pub content: EncryptedData,
}

impl LinkListRecord {
    /// Resolves which side of the link a person is, if any.
    pub fn party_for(&self, person_id: &str) -> Option<LinkParty> {
        if person_id == self.person1_id {
            Some(LinkParty::Person1)
        } else if person_id == self.person2_id {
            Some(LinkParty::Person2)
        } else {
            None
        }
    }
}
