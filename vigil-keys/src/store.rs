//! Persistence boundary for account key records.

use crate::error::{KeyringError, KeyringResult};
use crate::record::UserKeyRecord;
use std::collections::HashMap;
use std::sync::Mutex;

/// Storage for [`UserKeyRecord`]s.
///
/// `replace` is the transaction boundary for every multi-field key rewrap:
/// either all fields of the new record land, or nothing changes and the
/// caller gets `Conflict`/`Storage`. There is no valid intermediate state.
pub trait KeyRecordStore: Send + Sync {
    fn load(&self, user_id: &str) -> KeyringResult<Option<UserKeyRecord>>;

    /// Inserts a brand-new record. Fails with `AlreadySetUp` if one exists.
    fn insert(&self, record: &UserKeyRecord) -> KeyringResult<()>;

    /// Replaces the whole record iff the stored `record_version` still
    /// equals `expected_version`. All-or-nothing.
    fn replace(&self, record: &UserKeyRecord, expected_version: u64) -> KeyringResult<()>;
}

/// In-memory store for tests and single-process embedding.
#[derive(Default)]
pub struct MemoryKeyRecordStore {
    records: Mutex<HashMap<String, UserKeyRecord>>,
}

impl MemoryKeyRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyRecordStore for MemoryKeyRecordStore {
    fn load(&self, user_id: &str) -> KeyringResult<Option<UserKeyRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(user_id).cloned())
    }

    fn insert(&self, record: &UserKeyRecord) -> KeyringResult<()> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.user_id) {
            return Err(KeyringError::AlreadySetUp);
        }
        records.insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    fn replace(&self, record: &UserKeyRecord, expected_version: u64) -> KeyringResult<()> {
        let mut records = self.records.lock().unwrap();
        let existing = records
            .get(&record.user_id)
            .ok_or(KeyringError::NotFound)?;
        if existing.record_version != expected_version {
            return Err(KeyringError::Conflict);
        }
        records.insert(record.user_id.clone(), record.clone());
        Ok(())
    }
}
