use vigil_keys::{
    KeyRecordStore, KeyringError, MigrationState, UserKeyRecord, SCHEME_VERSION,
};
use vigil_storage::{DuckDbKeyRecordStore, ListKind, ListStore, StorageError, StoredListRecord};

fn record(id: &str, kind: ListKind) -> StoredListRecord {
    StoredListRecord {
        id: id.to_string(),
        kind,
        record_json: r#"{"blob":"ciphertext"}"#.to_string(),
        prayer_count: 3,
        last_prayed_at: Some(1_700_000_000),
        created_at: 1_700_000_000,
        modified_at: 1_700_000_000,
        row_version: 0,
    }
}

#[test]
fn insert_and_get_roundtrip() {
    let store = ListStore::open_in_memory().unwrap();
    let version = store.put(&record("list-1", ListKind::Entity), 0).unwrap();
    assert_eq!(version, 1);

    let loaded = store.get("list-1").unwrap().unwrap();
    assert_eq!(loaded.kind, ListKind::Entity);
    assert_eq!(loaded.prayer_count, 3);
    assert_eq!(loaded.row_version, 1);
}

#[test]
fn get_missing_returns_none() {
    let store = ListStore::open_in_memory().unwrap();
    assert!(store.get("nope").unwrap().is_none());
}

#[test]
fn double_insert_conflicts() {
    let store = ListStore::open_in_memory().unwrap();
    store.put(&record("list-1", ListKind::Entity), 0).unwrap();
    assert!(matches!(
        store.put(&record("list-1", ListKind::Entity), 0),
        Err(StorageError::VersionConflict { .. })
    ));
}

#[test]
fn stale_update_changes_nothing() {
    let store = ListStore::open_in_memory().unwrap();
    store.put(&record("list-1", ListKind::Entity), 0).unwrap();

    let mut fresh = record("list-1", ListKind::Entity);
    fresh.record_json = r#"{"blob":"v2"}"#.to_string();
    fresh.prayer_count = 4;
    store.put(&fresh, 1).unwrap(); // now at version 2

    let mut stale = record("list-1", ListKind::Entity);
    stale.record_json = r#"{"blob":"lost-update"}"#.to_string();
    assert!(matches!(
        store.put(&stale, 1),
        Err(StorageError::VersionConflict { .. })
    ));

    let loaded = store.get("list-1").unwrap().unwrap();
    assert_eq!(loaded.record_json, r#"{"blob":"v2"}"#);
    assert_eq!(loaded.row_version, 2);
}

#[test]
fn update_of_missing_record_is_not_found() {
    let store = ListStore::open_in_memory().unwrap();
    assert!(matches!(
        store.put(&record("ghost", ListKind::Entity), 3),
        Err(StorageError::NotFound(_))
    ));
}

#[test]
fn list_ids_filters_by_kind() {
    let store = ListStore::open_in_memory().unwrap();
    store.put(&record("entity-1", ListKind::Entity), 0).unwrap();
    store.put(&record("link-1", ListKind::Link), 0).unwrap();

    assert_eq!(store.list_ids(ListKind::Entity).unwrap(), vec!["entity-1"]);
    assert_eq!(store.list_ids(ListKind::Link).unwrap(), vec!["link-1"]);
    assert_eq!(store.count(ListKind::Entity).unwrap(), 1);
}

#[test]
fn overview_exposes_only_plaintext_facts() {
    let store = ListStore::open_in_memory().unwrap();
    store.put(&record("list-1", ListKind::Entity), 0).unwrap();

    let overview = store.list_overview(ListKind::Entity).unwrap();
    assert_eq!(overview, vec![("list-1".to_string(), 3, Some(1_700_000_000))]);
}

#[test]
fn delete_then_get_is_none() {
    let store = ListStore::open_in_memory().unwrap();
    store.put(&record("list-1", ListKind::Entity), 0).unwrap();
    store.delete("list-1").unwrap();

    assert!(store.get("list-1").unwrap().is_none());
    assert!(matches!(
        store.delete("list-1"),
        Err(StorageError::NotFound(_))
    ));
}

#[test]
fn persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lists.db");

    {
        let store = ListStore::open(&path).unwrap();
        store.put(&record("list-1", ListKind::Entity), 0).unwrap();
    }

    let store = ListStore::open(&path).unwrap();
    let loaded = store.get("list-1").unwrap().unwrap();
    assert_eq!(loaded.row_version, 1);
}

// ── key record store ──

fn key_record(user_id: &str, version: u64) -> UserKeyRecord {
    UserKeyRecord {
        user_id: user_id.to_string(),
        scheme_version: SCHEME_VERSION,
        wrapped_dek_password: None,
        wrapped_dek_recovery: None,
        encrypted_recovery_code: None,
        migration_state: MigrationState::Migrating,
        record_version: version,
    }
}

#[test]
fn key_record_roundtrip() {
    let store = DuckDbKeyRecordStore::open_in_memory().unwrap();
    store.insert(&key_record("u1", 1)).unwrap();

    let loaded = store.load("u1").unwrap().unwrap();
    assert_eq!(loaded.record_version, 1);
    assert_eq!(loaded.migration_state, MigrationState::Migrating);
    assert!(store.load("u2").unwrap().is_none());
}

#[test]
fn key_record_double_insert_rejected() {
    let store = DuckDbKeyRecordStore::open_in_memory().unwrap();
    store.insert(&key_record("u1", 1)).unwrap();
    assert!(matches!(
        store.insert(&key_record("u1", 1)),
        Err(KeyringError::AlreadySetUp)
    ));
}

#[test]
fn key_record_replace_is_version_checked() {
    let store = DuckDbKeyRecordStore::open_in_memory().unwrap();
    store.insert(&key_record("u1", 1)).unwrap();

    let mut updated = key_record("u1", 2);
    updated.migration_state = MigrationState::Upgraded;

    assert!(matches!(
        store.replace(&updated, 9),
        Err(KeyringError::Conflict)
    ));
    assert_eq!(
        store.load("u1").unwrap().unwrap().migration_state,
        MigrationState::Migrating
    );

    store.replace(&updated, 1).unwrap();
    assert_eq!(
        store.load("u1").unwrap().unwrap().migration_state,
        MigrationState::Upgraded
    );
}

#[test]
fn key_record_replace_missing_is_not_found() {
    let store = DuckDbKeyRecordStore::open_in_memory().unwrap();
    assert!(matches!(
        store.replace(&key_record("ghost", 2), 1),
        Err(KeyringError::NotFound)
    ));
}
