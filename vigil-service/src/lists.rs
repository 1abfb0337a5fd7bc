//! Encrypted list CRUD over persistent storage.
//!
//! Every mutation is a read-modify-write: decrypt, mutate the plaintext,
//! recompute the derived facts, re-encrypt, and write back with the version
//! read at the start. A concurrent writer makes the final write fail with
//! [`ServiceError::Conflict`] and nothing is saved; the caller re-reads and
//! retries, so no update is silently lost.

use crate::error::{ServiceError, ServiceResult};
use crate::records::{EntityListRecord, LinkListRecord};
use std::path::Path;
use tracing::info;
use vigil_lists::{
    create_link, decrypt_list, decrypt_list_with_key, encrypt_list, encrypt_list_with_key,
    unwrap_for_party, ListFacts, Prayer,
};
use vigil_storage::{ListKind, ListStore, StorageError, StoredListRecord};

pub struct ListService {
    store: ListStore,
}

impl ListService {
    pub fn open(path: &Path) -> ServiceResult<Self> {
        Ok(Self {
            store: ListStore::open(path)?,
        })
    }

    pub fn open_in_memory() -> ServiceResult<Self> {
        Ok(Self {
            store: ListStore::open_in_memory()?,
        })
    }

    /// Wraps an already-open store. The store is cheap to clone, so a
    /// caller can keep a handle to the same database.
    pub fn with_store(store: ListStore) -> Self {
        Self { store }
    }

    // ── entity lists ──

    /// Creates a new single-owner list encrypted under the given passcode.
    pub fn create_entity_list(
        &self,
        id: &str,
        passcode: &str,
        prayers: &[Prayer],
    ) -> ServiceResult<()> {
        let record = EntityListRecord {
            list: encrypt_list(passcode, prayers)?,
        };
        let stored = self.stored_record(id, ListKind::Entity, &record, ListFacts::compute(prayers))?;

        match self.store.put(&stored, 0) {
            Ok(_) => {
                info!(list_id = %id, "entity list created");
                Ok(())
            }
            Err(StorageError::VersionConflict { .. }) => {
                Err(ServiceError::AlreadyExists(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Decrypts and returns an entity list's prayers.
    pub fn read_entity_list(&self, id: &str, passcode: &str) -> ServiceResult<Vec<Prayer>> {
        let (record, _) = self.load_entity(id)?;
        Ok(decrypt_list(passcode, &record.list)?)
    }

    /// Read-modify-write on an entity list.
    ///
    /// Returns the prayers as written. Fails with `Conflict` if the stored
    /// record moved between the read and the write.
    pub fn update_entity_list<F>(
        &self,
        id: &str,
        passcode: &str,
        mutate: F,
    ) -> ServiceResult<Vec<Prayer>>
    where
        F: FnOnce(&mut Vec<Prayer>),
    {
        let (record, version) = self.load_entity(id)?;
        let mut prayers = decrypt_list(passcode, &record.list)?;
        mutate(&mut prayers);

        let updated = EntityListRecord {
            list: encrypt_list(passcode, &prayers)?,
        };
        let stored =
            self.stored_record(id, ListKind::Entity, &updated, ListFacts::compute(&prayers))?;
        self.store.put(&stored, version)?;
        Ok(prayers)
    }

    /// Records a prayed-for event on one prayer of an entity list.
    ///
    /// An unknown prayer id fails before anything is written, so the stored
    /// record (and its version) is untouched.
    pub fn record_prayed(&self, id: &str, passcode: &str, prayer_id: uuid::Uuid) -> ServiceResult<()> {
        let now = chrono::Utc::now().timestamp();
        let (record, version) = self.load_entity(id)?;
        let mut prayers = decrypt_list(passcode, &record.list)?;
        prayers
            .iter_mut()
            .find(|p| p.id == prayer_id)
            .ok_or_else(|| ServiceError::NotFound(prayer_id.to_string()))?
            .mark_prayed(now);

        let updated = EntityListRecord {
            list: encrypt_list(passcode, &prayers)?,
        };
        let stored =
            self.stored_record(id, ListKind::Entity, &updated, ListFacts::compute(&prayers))?;
        self.store.put(&stored, version)?;
        Ok(())
    }

    /// Deletes an entity list. No credential required: deletion destroys
    /// ciphertext, it reveals nothing.
    pub fn delete_entity_list(&self, id: &str) -> ServiceResult<()> {
        self.store.delete(id)?;
        info!(list_id = %id, "entity list deleted");
        Ok(())
    }

    /// Plaintext overview of entity lists: (id, prayer_count, last_prayed_at).
    pub fn entity_overview(&self) -> ServiceResult<Vec<(String, i64, Option<i64>)>> {
        Ok(self.store.list_overview(ListKind::Entity)?)
    }

    // ── linked lists ──

    /// Creates a two-party linked list with an empty payload.
    pub fn create_link_list(
        &self,
        id: &str,
        person1_id: &str,
        passcode1: &str,
        person2_id: &str,
        passcode2: &str,
    ) -> ServiceResult<()> {
        if person1_id == person2_id {
            return Err(ServiceError::Validation(
                "link parties must be distinct".into(),
            ));
        }

        let keys = create_link(passcode1, passcode2)?;
        let content_key = unwrap_for_party(vigil_lists::LinkParty::Person1, passcode1, &keys)?;
        let content = encrypt_list_with_key(&content_key, &[])?;

        let record = LinkListRecord {
            person1_id: person1_id.to_string(),
            person2_id: person2_id.to_string(),
            keys,
            content,
        };
        let stored = self.stored_record(id, ListKind::Link, &record, ListFacts::compute(&[]))?;

        match self.store.put(&stored, 0) {
            Ok(_) => {
                info!(list_id = %id, "link list created");
                Ok(())
            }
            Err(StorageError::VersionConflict { .. }) => {
                Err(ServiceError::AlreadyExists(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Decrypts a linked list for one of its parties.
    pub fn read_link_list(
        &self,
        id: &str,
        person_id: &str,
        passcode: &str,
    ) -> ServiceResult<Vec<Prayer>> {
        let (record, _) = self.load_link(id)?;
        let party = record
            .party_for(person_id)
            .ok_or(ServiceError::NotAuthorized)?;
        let key = unwrap_for_party(party, passcode, &record.keys)?;
        Ok(decrypt_list_with_key(&key, &record.content)?)
    }

    /// Read-modify-write on a linked list. Only the content ciphertext is
    /// replaced; the wrapped key pair is immutable after creation.
    pub fn update_link_list<F>(
        &self,
        id: &str,
        person_id: &str,
        passcode: &str,
        mutate: F,
    ) -> ServiceResult<Vec<Prayer>>
    where
        F: FnOnce(&mut Vec<Prayer>),
    {
        let (record, version) = self.load_link(id)?;
        let party = record
            .party_for(person_id)
            .ok_or(ServiceError::NotAuthorized)?;
        let key = unwrap_for_party(party, passcode, &record.keys)?;

        let mut prayers = decrypt_list_with_key(&key, &record.content)?;
        mutate(&mut prayers);

        let updated = LinkListRecord {
            content: encrypt_list_with_key(&key, &prayers)?,
            ..record
        };
        let stored = self.stored_record(id, ListKind::Link, &updated, ListFacts::compute(&prayers))?;
        self.store.put(&stored, version)?;
        Ok(prayers)
    }

    /// Deletes a linked list. Requires membership: a non-party may not
    /// destroy the link.
    pub fn delete_link_list(&self, id: &str, person_id: &str) -> ServiceResult<()> {
        let (record, _) = self.load_link(id)?;
        if record.party_for(person_id).is_none() {
            return Err(ServiceError::NotAuthorized);
        }
        self.store.delete(id)?;
        info!(list_id = %id, "link list deleted");
        Ok(())
    }

    /// Plaintext overview of link lists.
    pub fn link_overview(&self) -> ServiceResult<Vec<(String, i64, Option<i64>)>> {
        Ok(self.store.list_overview(ListKind::Link)?)
    }

    // ── internals ──

    fn load_entity(&self, id: &str) -> ServiceResult<(EntityListRecord, u64)> {
        let stored = self.require(id, ListKind::Entity)?;
        let record: EntityListRecord = serde_json::from_str(&stored.record_json)?;
        Ok((record, stored.row_version))
    }

    fn load_link(&self, id: &str) -> ServiceResult<(LinkListRecord, u64)> {
        let stored = self.require(id, ListKind::Link)?;
        let record: LinkListRecord = serde_json::from_str(&stored.record_json)?;
        Ok((record, stored.row_version))
    }

    fn require(&self, id: &str, kind: ListKind) -> ServiceResult<StoredListRecord> {
        let stored = self
            .store
            .get(id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        if stored.kind != kind {
            return Err(ServiceError::NotFound(id.to_string()));
        }
        Ok(stored)
    }

    fn stored_record<T: serde::Serialize>(
        &self,
        id: &str,
        kind: ListKind,
        record: &T,
        facts: ListFacts,
    ) -> ServiceResult<StoredListRecord> {
        let now = chrono::Utc::now().timestamp();
        Ok(StoredListRecord {
            id: id.to_string(),
            kind,
            record_json: serde_json::to_string(record)?,
            prayer_count: facts.prayer_count as i64,
            last_prayed_at: facts.last_prayed_at,
            created_at: now,
            modified_at: now,
            row_version: 0,
        })
    }
}
