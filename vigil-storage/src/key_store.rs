//! DuckDB-backed [`KeyRecordStore`].
//!
//! The whole [`UserKeyRecord`] is stored as one JSON column; `record_version`
//! is mirrored into its own column so the optimistic-concurrency check runs
//! as a single conditional UPDATE with no read-then-write window.

use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use vigil_keys::{KeyRecordStore, KeyringError, KeyringResult, UserKeyRecord};

use crate::error::StorageResult;

#[derive(Clone)]
pub struct DuckDbKeyRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbKeyRecordStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = crate::open_duckdb_with_wal_recovery(path)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Shares an existing connection (the service keeps one database file).
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> StorageResult<Self> {
        {
            let guard = conn.lock().unwrap();
            initialize_schema(&guard)?;
        }
        Ok(Self { conn })
    }
}

impl KeyRecordStore for DuckDbKeyRecordStore {
    fn load(&self, user_id: &str) -> KeyringResult<Option<UserKeyRecord>> {
        let conn = self.conn.lock().unwrap();
        let result: Result<String, _> = conn.query_row(
            "SELECT record_json FROM user_key_records WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        );

        match result {
            Ok(json) => {
                let record: UserKeyRecord = serde_json::from_str(&json)
                    .map_err(|e| KeyringError::Storage(e.to_string()))?;
                Ok(Some(record))
            }
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(KeyringError::Storage(e.to_string())),
        }
    }

    fn insert(&self, record: &UserKeyRecord) -> KeyringResult<()> {
        let json =
            serde_json::to_string(record).map_err(|e| KeyringError::Storage(e.to_string()))?;

        let conn = self.conn.lock().unwrap();
        let inserted = conn
            .execute(
                "INSERT INTO user_key_records (user_id, record_json, record_version)
                 SELECT ?, ?, ?
                 WHERE NOT EXISTS (SELECT 1 FROM user_key_records WHERE user_id = ?)",
                params![
                    record.user_id,
                    json,
                    record.record_version as i64,
                    record.user_id
                ],
            )
            .map_err(|e| KeyringError::Storage(e.to_string()))?;
        if inserted == 0 {
            return Err(KeyringError::AlreadySetUp);
        }
        Ok(())
    }

    fn replace(&self, record: &UserKeyRecord, expected_version: u64) -> KeyringResult<()> {
        let json =
            serde_json::to_string(record).map_err(|e| KeyringError::Storage(e.to_string()))?;

        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE user_key_records SET record_json = ?, record_version = ?
                 WHERE user_id = ? AND record_version = ?",
                params![
                    json,
                    record.record_version as i64,
                    record.user_id,
                    expected_version as i64
                ],
            )
            .map_err(|e| KeyringError::Storage(e.to_string()))?;

        if updated == 0 {
            let exists: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM user_key_records WHERE user_id = ?",
                    params![record.user_id],
                    |row| row.get(0),
                )
                .map_err(|e| KeyringError::Storage(e.to_string()))?;
            if exists == 0 {
                return Err(KeyringError::NotFound);
            }
            return Err(KeyringError::Conflict);
        }
        Ok(())
    }
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_key_records (
            user_id VARCHAR PRIMARY KEY,
            record_json TEXT NOT NULL,
            record_version BIGINT NOT NULL
        );",
    )?;
    Ok(())
}
