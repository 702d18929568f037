use rusqlite::{Connection, OptionalExtension};
use crate::models::Entry;
use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// Entry repository
///
/// Properties live in the `entries` table; field values and other meta in
/// `entry_meta`, one row per key. Empty values are not written.
pub struct EntryRepo;

impl EntryRepo {
    /// Create a new entry with its meta rows
    pub fn create(conn: &Connection, entry: &Entry) -> Result<Entry> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO entries (form_id, date_created, date_updated, created_by, payment_date,
                                  payment_status, status, is_starred, is_read, ip, source_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                entry.form_id,
                entry.date_created,
                entry.date_updated,
                entry.created_by,
                entry.payment_date,
                entry.payment_status,
                entry.status,
                if entry.is_starred { 1 } else { 0 },
                if entry.is_read { 1 } else { 0 },
                entry.ip,
                entry.source_url,
            ],
        )
        .with_context(|| format!("Failed to create entry for form {}", entry.form_id))?;
        let id = tx.last_insert_rowid();

        let mut meta = BTreeMap::new();
        for (key, value) in &entry.meta {
            if value.is_empty() {
                continue;
            }
            tx.execute(
                "INSERT INTO entry_meta (entry_id, form_id, meta_key, meta_value) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, entry.form_id, key, value],
            )
            .with_context(|| format!("Failed to store value '{}' of entry {}", key, id))?;
            meta.insert(key.clone(), value.clone());
        }
        tx.commit()?;

        Ok(Entry {
            id: Some(id),
            meta,
            ..entry.clone()
        })
    }

    /// Get entry by ID, with its meta
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Entry>> {
        let mut stmt = conn.prepare(
            "SELECT id, form_id, date_created, date_updated, created_by, payment_date, payment_status,
                    status, is_starred, is_read, ip, source_url
             FROM entries WHERE id = ?1"
        )?;

        let entry = stmt.query_row([id], |row| {
            Ok(Entry {
                id: Some(row.get(0)?),
                form_id: row.get(1)?,
                date_created: row.get(2)?,
                date_updated: row.get(3)?,
                created_by: row.get(4)?,
                payment_date: row.get(5)?,
                payment_status: row.get(6)?,
                status: row.get(7)?,
                is_starred: row.get::<_, i64>(8)? != 0,
                is_read: row.get::<_, i64>(9)? != 0,
                ip: row.get(10)?,
                source_url: row.get(11)?,
                meta: BTreeMap::new(),
            })
        }).optional()?;

        let Some(mut entry) = entry else {
            return Ok(None);
        };
        entry.meta = Self::load_meta(conn, id)?;
        Ok(Some(entry))
    }

    /// All active entries of a form, oldest first
    pub fn list_for_form(conn: &Connection, form_id: i64) -> Result<Vec<Entry>> {
        let mut stmt = conn.prepare(
            "SELECT id FROM entries WHERE form_id = ?1 AND status = 'active' ORDER BY id"
        )?;
        let ids = stmt.query_map([form_id], |row| row.get::<_, i64>(0))?;

        let mut entries = Vec::new();
        for id in ids {
            if let Some(entry) = Self::get_by_id(conn, id?)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn load_meta(conn: &Connection, entry_id: i64) -> Result<BTreeMap<String, String>> {
        let mut stmt = conn.prepare(
            "SELECT meta_key, meta_value FROM entry_meta WHERE entry_id = ?1 ORDER BY id"
        )?;
        let rows = stmt.query_map([entry_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut meta = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            meta.insert(key, value);
        }
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::models::Form;
    use crate::repo::FormRepo;

    fn setup() -> Connection {
        let conn = DbConnection::connect_in_memory().unwrap();
        FormRepo::save(&conn, &Form::new(1, "Contact")).unwrap();
        conn
    }

    #[test]
    fn test_create_and_get() {
        let conn = setup();
        let mut entry = Entry::new(1).with_value("3", "hello").with_value("7", "12");
        entry.created_by = Some(5);
        let created = EntryRepo::create(&conn, &entry).unwrap();
        assert!(created.id.is_some());

        let loaded = EntryRepo::get_by_id(&conn, created.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.created_by, Some(5));
        assert_eq!(loaded.get("3"), Some("hello".to_string()));
        assert_eq!(loaded.get("7"), Some("12".to_string()));
    }

    #[test]
    fn test_empty_values_have_no_meta_row() {
        let conn = setup();
        let created = EntryRepo::create(&conn, &Entry::new(1).with_value("7", "")).unwrap();
        let loaded = EntryRepo::get_by_id(&conn, created.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.get("7"), None);

        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM entry_meta", [], |row| row.get(0)).unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_list_for_form_skips_trashed() {
        let conn = setup();
        EntryRepo::create(&conn, &Entry::new(1)).unwrap();
        let mut trashed = Entry::new(1);
        trashed.status = "trash".to_string();
        EntryRepo::create(&conn, &trashed).unwrap();

        assert_eq!(EntryRepo::list_for_form(&conn, 1).unwrap().len(), 1);
    }
}
