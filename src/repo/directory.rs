use rusqlite::Connection;
use anyhow::Result;
use crate::filter::Directory;
use crate::repo::{TermRepo, UserRepo};

/// User and term lookups backed by the database
pub struct SqliteDirectory<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDirectory<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl Directory for SqliteDirectory<'_> {
    fn user_ids_with_roles(&self, roles: &[String]) -> Result<Vec<i64>> {
        UserRepo::ids_with_roles(self.conn, roles)
    }

    fn term_name(&self, term_id: i64) -> Result<Option<String>> {
        TermRepo::name_by_id(self.conn, term_id)
    }
}
