//! Unit tests for the TabSync database layer (connection + migrations).

use tabsync::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use tabsync::database::Database;
use tempfile::TempDir;

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_local_state_table() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='local_state'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    run_all(&conn).unwrap();
    run_all(&conn).unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn test_file_database_persists_between_opens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabsync.db");
    {
        let db = Database::open(&path).unwrap();
        db.connection()
            .execute(
                "INSERT INTO local_state (key, value, updated_at) VALUES ('device_id', 'abc', 0)",
                [],
            )
            .unwrap();
    }
    let db = Database::open(&path).unwrap();
    let value: String = db
        .connection()
        .query_row("SELECT value FROM local_state WHERE key = 'device_id'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(value, "abc");
}
