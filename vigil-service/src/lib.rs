//! Orchestration layer for Vigil.
//!
//! Wires the encryption crates to DuckDB persistence:
//!
//! - [`ListService`]: entity and linked list CRUD with read-modify-write
//!   concurrency (version-checked writes, retry on conflict)
//! - [`open_account_manager`]: an [`AccountDekManager`] backed by the
//!   DuckDB key record store
//!
//! Credentials pass through this layer on every call and are never held
//! between calls; the only persistent state is ciphertext and key-wrapping
//! metadata.

mod error;
mod lists;
mod records;

pub use error::{ServiceError, ServiceResult};
pub use lists::ListService;
pub use records::{EntityListRecord, LinkListRecord};

use std::path::Path;
use std::sync::Arc;
use vigil_keys::AccountDekManager;
use vigil_storage::DuckDbKeyRecordStore;

/// Opens an account DEK manager persisting key records in DuckDB.
pub fn open_account_manager(path: &Path) -> ServiceResult<AccountDekManager> {
    let store = DuckDbKeyRecordStore::open(path)
        .map_err(|e| ServiceError::Storage(e.to_string()))?;
    Ok(AccountDekManager::new(Arc::new(store)))
}
