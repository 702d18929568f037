use rusqlite::{Connection, OptionalExtension};
use anyhow::{Context, Result};

/// A view: the container a filter configuration is stored against
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub id: i64,
    pub form_id: i64,
    pub title: String,
    /// Stored filter blob, flat or nested; `None` when never configured
    pub filters: Option<String>,
    pub joined_form_ids: Vec<i64>,
    pub created_ts: i64,
    pub modified_ts: i64,
}

pub struct ViewRepo;

impl ViewRepo {
    pub fn create(conn: &Connection, form_id: i64, title: &str, joined_form_ids: &[i64]) -> Result<View> {
        let now = chrono::Utc::now().timestamp();
        let joined_json = serde_json::to_string(joined_form_ids)?;

        conn.execute(
            "INSERT INTO views (form_id, title, filters_json, joined_forms_json, created_ts, modified_ts)
             VALUES (?1, ?2, NULL, ?3, ?4, ?5)",
            rusqlite::params![form_id, title, joined_json, now, now],
        )
        .with_context(|| format!("Failed to create view '{}'", title))?;

        Ok(View {
            id: conn.last_insert_rowid(),
            form_id,
            title: title.to_string(),
            filters: None,
            joined_form_ids: joined_form_ids.to_vec(),
            created_ts: now,
            modified_ts: now,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<View>> {
        let mut stmt = conn.prepare(
            "SELECT id, form_id, title, filters_json, joined_forms_json, created_ts, modified_ts
             FROM views WHERE id = ?1"
        )?;
        let view = stmt.query_row([id], |row| {
            let joined_json: String = row.get(4)?;
            Ok(View {
                id: row.get(0)?,
                form_id: row.get(1)?,
                title: row.get(2)?,
                filters: row.get(3)?,
                joined_form_ids: serde_json::from_str(&joined_json).unwrap_or_default(),
                created_ts: row.get(5)?,
                modified_ts: row.get(6)?,
            })
        }).optional()?;
        Ok(view)
    }

    /// Replace the stored filter blob; the blob is kept as given
    pub fn set_filters(conn: &Connection, id: i64, filters: Option<&str>) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let updated = conn
            .execute(
                "UPDATE views SET filters_json = ?1, modified_ts = ?2 WHERE id = ?3",
                rusqlite::params![filters, now, id],
            )
            .with_context(|| format!("Failed to save filters of view {}", id))?;
        if updated == 0 {
            anyhow::bail!("View {} not found", id);
        }
        Ok(())
    }
}
