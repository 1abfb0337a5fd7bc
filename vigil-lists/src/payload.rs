//! Versioned plaintext payload for prayer lists.
//!
//! The payload only ever exists decrypted in memory; it is serialized to
//! JSON and encrypted wholesale on every write. Prayers are never persisted
//! individually.

use crate::error::{ListError, ListResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current payload schema version. Bump when adding fields; every field
/// added after v1 must carry a serde default so v1 ciphertexts still decode.
pub const SCHEMA_VERSION: u32 = 1;

/// A single prayer. Exists only inside the decrypted payload of an entity
/// or link list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prayer {
    pub id: Uuid,
    pub text: String,
    pub category: String,
    pub created_at: i64,
    pub modified_at: i64,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub answered: bool,
    #[serde(default)]
    pub closing_note: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub last_prayed_at: Option<i64>,
    #[serde(default)]
    pub prayed_count: u32,
}

impl Prayer {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            category: category.into(),
            created_at: now,
            modified_at: now,
            pinned: false,
            answered: false,
            closing_note: None,
            tags: Vec::new(),
            last_prayed_at: None,
            prayed_count: 0,
        }
    }

    /// Records one prayed-for event.
    pub fn mark_prayed(&mut self, at: i64) {
        self.last_prayed_at = Some(at);
        self.prayed_count += 1;
        self.modified_at = at;
    }
}

/// The versioned envelope that gets serialized and encrypted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrayerListPayload {
    pub schema_version: u32,
    pub prayers: Vec<Prayer>,
}

impl PrayerListPayload {
    pub fn new(prayers: Vec<Prayer>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            prayers,
        }
    }

    /// Serializes the payload for encryption.
    pub fn encode(&self) -> ListResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ListError::Encoding(e.to_string()))
    }

    /// Decodes a decrypted payload, rejecting versions newer than this build
    /// understands. Older versions decode with explicit field defaults.
    pub fn decode(bytes: &[u8]) -> ListResult<Self> {
        let payload: Self =
            serde_json::from_slice(bytes).map_err(|_| ListError::Decryption)?;
        if payload.schema_version > SCHEMA_VERSION {
            return Err(ListError::UnsupportedSchemaVersion(payload.schema_version));
        }
        Ok(payload)
    }
}

/// Denormalized listing fields, recomputed from plaintext on every write.
///
/// These are the only plaintext fields ever persisted next to a ciphertext
/// and must never contain prayer text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFacts {
    pub prayer_count: u32,
    pub last_prayed_at: Option<i64>,
}

impl ListFacts {
    pub fn compute(prayers: &[Prayer]) -> Self {
        Self {
            prayer_count: prayers.len() as u32,
            last_prayed_at: prayers.iter().filter_map(|p| p.last_prayed_at).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let payload = PrayerListPayload::new(vec![Prayer::new("for my sister", "family")]);
        let bytes = payload.encode().unwrap();
        let decoded = PrayerListPayload::decode(&bytes).unwrap();
        assert_eq!(decoded.prayers, payload.prayers);
    }

    #[test]
    fn v1_payload_without_later_fields_decodes_with_defaults() {
        // A minimal prayer as an older client would have written it
        let raw = serde_json::json!({
            "schema_version": 1,
            "prayers": [{
                "id": Uuid::new_v4(),
                "text": "healing",
                "category": "health",
                "created_at": 1_700_000_000,
                "modified_at": 1_700_000_000
            }]
        });
        let decoded = PrayerListPayload::decode(raw.to_string().as_bytes()).unwrap();
        let prayer = &decoded.prayers[0];
        assert!(!prayer.pinned);
        assert!(!prayer.answered);
        assert!(prayer.closing_note.is_none());
        assert!(prayer.tags.is_empty());
        assert_eq!(prayer.prayed_count, 0);
    }

    #[test]
    fn future_schema_version_rejected() {
        let raw = serde_json::json!({ "schema_version": 99, "prayers": [] });
        assert!(matches!(
            PrayerListPayload::decode(raw.to_string().as_bytes()),
            Err(ListError::UnsupportedSchemaVersion(99))
        ));
    }

    #[test]
    fn facts_computed_from_plaintext() {
        let mut p1 = Prayer::new("a", "general");
        let mut p2 = Prayer::new("b", "general");
        p1.mark_prayed(100);
        p2.mark_prayed(200);
        p1.mark_prayed(150);

        let facts = ListFacts::compute(&[p1, p2]);
        assert_eq!(facts.prayer_count, 2);
        assert_eq!(facts.last_prayed_at, Some(200));
    }

    #[test]
    fn facts_for_empty_list() {
        let facts = ListFacts::compute(&[]);
        assert_eq!(facts.prayer_count, 0);
        assert_eq!(facts.last_prayed_at, None);
    }
}
