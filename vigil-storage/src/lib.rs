//! DuckDB persistence for Vigil.
//!
//! Two stores share the conventions here:
//!
//! - [`ListStore`]: encrypted list records plus their plaintext derived
//!   facts, with an optimistic row version on every write
//! - [`DuckDbKeyRecordStore`]: account key records behind the
//!   [`vigil_keys::KeyRecordStore`] trait, where the version check is the
//!   transaction boundary for multi-field key rewraps
//!
//! Ciphertext goes in, ciphertext comes out — this layer never holds key
//! material and never decrypts anything.

mod error;
mod key_store;
mod list_store;

pub use error::{StorageError, StorageResult};
pub use key_store::DuckDbKeyRecordStore;
pub use list_store::{ListKind, ListStore, StoredListRecord};

use tracing::warn;

/// Open a DuckDB connection with stale WAL recovery.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open retried once. Handles the common case where an
/// unclean shutdown leaves a WAL file that prevents reopening.
pub fn open_duckdb_with_wal_recovery(
    path: &std::path::Path,
) -> StorageResult<duckdb::Connection> {
    match duckdb::Connection::open(path) {
        Ok(c) => Ok(c),
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                warn!(wal = %wal_path.display(), "DuckDB open failed, removing stale WAL and retrying");
                if std::fs::remove_file(&wal_path).is_ok() {
                    return Ok(duckdb::Connection::open(path)?);
                }
            }
            Err(first_err.into())
        }
    }
}
