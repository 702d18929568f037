use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry properties stored as columns of the entries table.
/// Any other key (field ids, `is_approved`, ...) lives in entry meta.
pub const ENTRY_PROPERTIES: &[&str] = &[
    "id",
    "form_id",
    "date_created",
    "date_updated",
    "created_by",
    "payment_date",
    "payment_status",
    "status",
    "is_starred",
    "is_read",
    "ip",
    "source_url",
];

/// Date-like entry properties
pub const DATE_PROPERTIES: &[&str] = &["date_created", "date_updated", "payment_date"];

pub fn is_entry_property(key: &str) -> bool {
    ENTRY_PROPERTIES.contains(&key)
}

pub fn is_date_property(key: &str) -> bool {
    DATE_PROPERTIES.contains(&key)
}

/// Entry (one submitted record of a form)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Option<i64>,
    pub form_id: i64,
    pub date_created: String, // UTC, "%Y-%m-%d %H:%M:%S"
    pub date_updated: String,
    pub created_by: Option<i64>,
    pub payment_date: Option<String>,
    pub payment_status: Option<String>,
    pub status: String,
    pub is_starred: bool,
    pub is_read: bool,
    pub ip: String,
    pub source_url: String,
    pub meta: BTreeMap<String, String>, // Field values ("3", "3.2") and entry meta
}

impl Entry {
    /// Create a new, unsaved entry for a form
    pub fn new(form_id: i64) -> Self {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            id: None,
            form_id,
            date_created: now.clone(),
            date_updated: now,
            created_by: None,
            payment_date: None,
            payment_status: None,
            status: "active".to_string(),
            is_starred: false,
            is_read: false,
            ip: String::new(),
            source_url: String::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.meta.insert(key.to_string(), value.to_string());
        self
    }

    /// Stored value for a property or meta key; `None` when nothing is stored
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.map(|id| id.to_string()),
            "form_id" => Some(self.form_id.to_string()),
            "date_created" => Some(self.date_created.clone()),
            "date_updated" => Some(self.date_updated.clone()),
            "created_by" => self.created_by.map(|id| id.to_string()),
            "payment_date" => self.payment_date.clone(),
            "payment_status" => self.payment_status.clone(),
            "status" => Some(self.status.clone()),
            "is_starred" => Some(if self.is_starred { "1" } else { "0" }.to_string()),
            "is_read" => Some(if self.is_read { "1" } else { "0" }.to_string()),
            "ip" => Some(self.ip.clone()),
            "source_url" => Some(self.source_url.clone()),
            _ => self.meta.get(key).cloned(),
        }
    }
}
