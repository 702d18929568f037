use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version: u32 = Self::get_version(conn).unwrap_or(0);

        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
        }

        conn.execute("PRAGMA foreign_keys=ON", [])?;
        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            log::debug!("Applied schema migration v{}", version);
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> {
    let mut migrations: HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: forms, entries, entry meta, users, terms and views
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    // Field schema is stored as the JSON list of fields
    tx.execute(
        "CREATE TABLE forms (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            fields_json TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE entries (
            id INTEGER PRIMARY KEY,
            form_id INTEGER NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
            date_created TEXT NOT NULL,
            date_updated TEXT NOT NULL,
            created_by INTEGER NULL,
            payment_date TEXT NULL,
            payment_status TEXT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            is_starred INTEGER NOT NULL DEFAULT 0,
            is_read INTEGER NOT NULL DEFAULT 0,
            ip TEXT NOT NULL DEFAULT '',
            source_url TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_entries_form_status ON entries(form_id, status)",
        [],
    )?;

    // Field values ("3", "3.2") and entry meta ("is_approved", ...)
    // Empty values are never written, so "no row" means "empty"
    tx.execute(
        "CREATE TABLE entry_meta (
            id INTEGER PRIMARY KEY,
            entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
            form_id INTEGER NOT NULL,
            meta_key TEXT NOT NULL,
            meta_value TEXT NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            user_login TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            user_email TEXT NOT NULL DEFAULT '',
            roles_json TEXT NOT NULL DEFAULT '[]',
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE terms (
            term_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            taxonomy TEXT NOT NULL DEFAULT 'category'
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE views (
            id INTEGER PRIMARY KEY,
            form_id INTEGER NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            filters_json TEXT NULL,
            joined_forms_json TEXT NOT NULL DEFAULT '[]',
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Migration v2: meta lookup indexes
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE INDEX idx_entry_meta_entry_key ON entry_meta(entry_id, meta_key)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_entry_meta_form_key ON entry_meta(form_id, meta_key)",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_migration_applies_cleanly() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        let version = MigrationManager::get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        MigrationManager::initialize(&conn).unwrap();
        MigrationManager::initialize(&conn).unwrap();

        let version = MigrationManager::get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_foreign_key_constraints() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        // No form 999
        let result = conn.execute(
            "INSERT INTO entries (form_id, date_created, date_updated) VALUES (999, '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_meta_rows_cascade_with_entry() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        conn.execute("INSERT INTO forms (id, title) VALUES (1, 'Contact')", []).unwrap();
        conn.execute(
            "INSERT INTO entries (form_id, date_created, date_updated) VALUES (1, '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
            [],
        ).unwrap();
        let entry_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO entry_meta (entry_id, form_id, meta_key, meta_value) VALUES (?1, 1, '3', 'hello')",
            [entry_id],
        ).unwrap();

        conn.execute("DELETE FROM entries WHERE id = ?1", [entry_id]).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entry_meta", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 0);
    }
}
