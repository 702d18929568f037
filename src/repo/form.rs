use rusqlite::{Connection, OptionalExtension};
use crate::models::{Field, Form};
use anyhow::{Context, Result};

/// Form repository
///
/// Forms keep their own ids (they are imported, not generated) and store
/// the field schema as a JSON list.
pub struct FormRepo;

impl FormRepo {
    /// Insert or replace a form
    pub fn save(conn: &Connection, form: &Form) -> Result<()> {
        let fields_json = serde_json::to_string(&form.fields)?;
        conn.execute(
            "INSERT INTO forms (id, title, fields_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               title = excluded.title,
               fields_json = excluded.fields_json",
            rusqlite::params![form.id, form.title, fields_json],
        )
        .with_context(|| format!("Failed to save form {}", form.id))?;
        Ok(())
    }

    /// Get form by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Form>> {
        let mut stmt = conn.prepare("SELECT id, title, fields_json FROM forms WHERE id = ?1")?;
        let row = stmt
            .query_row([id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .optional()?;

        match row {
            Some((id, title, fields_json)) => {
                let fields: Vec<Field> = serde_json::from_str(&fields_json)
                    .with_context(|| format!("Invalid field schema stored for form {}", id))?;
                Ok(Some(Form { id, title, fields }))
            }
            None => Ok(None),
        }
    }

    /// List all forms ordered by id
    pub fn list(conn: &Connection) -> Result<Vec<Form>> {
        let mut stmt = conn.prepare("SELECT id FROM forms ORDER BY id")?;
        let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut forms = Vec::new();
        for id in ids {
            if let Some(form) = Self::get_by_id(conn, id?)? {
                forms.push(form);
            }
        }
        Ok(forms)
    }
}
