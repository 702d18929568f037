use rusqlite::{Connection, OptionalExtension};
use anyhow::{Context, Result};

/// Taxonomy terms (post categories)
pub struct TermRepo;

impl TermRepo {
    /// Create a term and return its id
    pub fn create(conn: &Connection, name: &str, taxonomy: &str) -> Result<i64> {
        conn.execute(
            "INSERT INTO terms (name, taxonomy) VALUES (?1, ?2)",
            rusqlite::params![name, taxonomy],
        )
        .with_context(|| format!("Failed to create term: {}", name))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn name_by_id(conn: &Connection, term_id: i64) -> Result<Option<String>> {
        let name = conn
            .query_row("SELECT name FROM terms WHERE term_id = ?1", [term_id], |row| row.get(0))
            .optional()?;
        Ok(name)
    }
}
