//! Versioned store for encrypted list records.
//!
//! The record body (`record_json`) is opaque ciphertext-bearing JSON produced
//! by the service layer. Only the derived facts (prayer count, last-prayed
//! timestamp) are stored as plaintext columns so list overviews never require
//! decryption.

use crate::error::{StorageError, StorageResult};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// What a record protects: a single person's list, or a two-party linked list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Entity,
    Link,
}

impl ListKind {
    fn as_str(&self) -> &'static str {
        match self {
            ListKind::Entity => "entity",
            ListKind::Link => "link",
        }
    }

    fn parse(s: &str) -> StorageResult<Self> {
        match s {
            "entity" => Ok(ListKind::Entity),
            "link" => Ok(ListKind::Link),
            other => Err(StorageError::NotFound(format!("unknown list kind: {other}"))),
        }
    }
}

/// One persisted list row.
#[derive(Clone, Debug)]
pub struct StoredListRecord {
    pub id: String,
    pub kind: ListKind,
    /// Serialized encrypted record; never inspected by this layer.
    pub record_json: String,
    pub prayer_count: i64,
    pub last_prayed_at: Option<i64>,
    pub created_at: i64,
    pub modified_at: i64,
    /// Optimistic-concurrency version. 0 means "not yet stored".
    pub row_version: u64,
}

/// DuckDB-backed list record store.
#[derive(Clone)]
pub struct ListStore {
    conn: Arc<Mutex<Connection>>,
}

impl ListStore {
    /// Opens or creates a list store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = crate::open_duckdb_with_wal_recovery(path)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory list store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Writes a record iff the stored version still equals `expected_version`.
    ///
    /// `expected_version == 0` means insert: fails with `VersionConflict` if
    /// the id already exists. Otherwise a single conditional UPDATE; zero
    /// affected rows means the record moved on (or was deleted) since the
    /// caller read it, and nothing is written.
    pub fn put(&self, record: &StoredListRecord, expected_version: u64) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let new_version = expected_version + 1;

        if expected_version == 0 {
            let inserted = conn.execute(
                "INSERT INTO list_records
                 (id, kind, record_json, prayer_count, last_prayed_at, created_at, modified_at, row_version)
                 SELECT ?, ?, ?, ?, ?, ?, ?, ?
                 WHERE NOT EXISTS (SELECT 1 FROM list_records WHERE id = ?)",
                params![
                    record.id,
                    record.kind.as_str(),
                    record.record_json,
                    record.prayer_count,
                    record.last_prayed_at,
                    record.created_at,
                    record.modified_at,
                    new_version as i64,
                    record.id,
                ],
            )?;
            if inserted == 0 {
                return Err(StorageError::VersionConflict {
                    id: record.id.clone(),
                    expected: 0,
                });
            }
            return Ok(new_version);
        }

        let updated = conn.execute(
            "UPDATE list_records
             SET record_json = ?, prayer_count = ?, last_prayed_at = ?, modified_at = ?, row_version = ?
             WHERE id = ? AND row_version = ?",
            params![
                record.record_json,
                record.prayer_count,
                record.last_prayed_at,
                record.modified_at,
                new_version as i64,
                record.id,
                expected_version as i64,
            ],
        )?;
        if updated == 0 {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM list_records WHERE id = ?",
                params![record.id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(StorageError::NotFound(record.id.clone()));
            }
            return Err(StorageError::VersionConflict {
                id: record.id.clone(),
                expected: expected_version,
            });
        }
        Ok(new_version)
    }

    /// Loads a record by id.
    pub fn get(&self, id: &str) -> StorageResult<Option<StoredListRecord>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, kind, record_json, prayer_count, last_prayed_at, created_at, modified_at, row_version
             FROM list_records WHERE id = ?",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            },
        );

        match result {
            Ok((id, kind, record_json, prayer_count, last_prayed_at, created_at, modified_at, row_version)) => {
                Ok(Some(StoredListRecord {
                    id,
                    kind: ListKind::parse(&kind)?,
                    record_json,
                    prayer_count,
                    last_prayed_at,
                    created_at,
                    modified_at,
                    row_version: row_version as u64,
                }))
            }
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists record ids of a kind, most recently modified first.
    pub fn list_ids(&self, kind: ListKind) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id FROM list_records WHERE kind = ? ORDER BY modified_at DESC",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![kind.as_str()], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    /// Plaintext overview rows: (id, prayer_count, last_prayed_at).
    /// Readable without any credential.
    pub fn list_overview(&self, kind: ListKind) -> StorageResult<Vec<(String, i64, Option<i64>)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, prayer_count, last_prayed_at FROM list_records
             WHERE kind = ? ORDER BY modified_at DESC",
        )?;
        let rows: Vec<(String, i64, Option<i64>)> = stmt
            .query_map(params![kind.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Deletes a record by id.
    pub fn delete(&self, id: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM list_records WHERE id = ?", params![id])?;
        if affected == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Count records of a kind.
    pub fn count(&self, kind: ListKind) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM list_records WHERE kind = ?",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS list_records (
            id VARCHAR PRIMARY KEY,
            kind VARCHAR NOT NULL,
            record_json TEXT NOT NULL,
            prayer_count INTEGER NOT NULL DEFAULT 0,
            last_prayed_at BIGINT,
            created_at BIGINT NOT NULL,
            modified_at BIGINT NOT NULL,
            row_version BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_list_records_kind ON list_records(kind);
        CREATE INDEX IF NOT EXISTS idx_list_records_modified ON list_records(modified_at DESC);
        "#,
    )?;
    Ok(())
}
