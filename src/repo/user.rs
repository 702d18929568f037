use rusqlite::{Connection, OptionalExtension};
use crate::models::User;
use anyhow::{Context, Result};

pub struct UserRepo;

impl UserRepo {
    /// Create a new user
    pub fn create(conn: &Connection, user: &User) -> Result<User> {
        let roles_json = serde_json::to_string(&user.roles)?;
        conn.execute(
            "INSERT INTO users (user_login, display_name, user_email, roles_json, created_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user.login, user.display_name, user.email, roles_json, user.created_ts],
        )
        .with_context(|| format!("Failed to create user: {}", user.login))?;

        Ok(User {
            id: Some(conn.last_insert_rowid()),
            ..user.clone()
        })
    }

    /// Get user by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_login, display_name, user_email, roles_json, created_ts FROM users WHERE id = ?1"
        )?;
        let user = stmt.query_row([id], Self::from_row).optional()?;
        Ok(user)
    }

    /// Get user by login name
    pub fn get_by_login(conn: &Connection, login: &str) -> Result<Option<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_login, display_name, user_email, roles_json, created_ts FROM users WHERE user_login = ?1"
        )?;
        let user = stmt.query_row([login], Self::from_row).optional()?;
        Ok(user)
    }

    /// Ids of users holding any of the given roles, ascending
    pub fn ids_with_roles(conn: &Connection, roles: &[String]) -> Result<Vec<i64>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(
            "SELECT id, user_login, display_name, user_email, roles_json, created_ts FROM users ORDER BY id"
        )?;
        let users = stmt.query_map([], Self::from_row)?;

        let mut ids = Vec::new();
        for user in users {
            let user = user?;
            if user.roles.iter().any(|r| roles.contains(r)) {
                if let Some(id) = user.id {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let roles_json: String = row.get(4)?;
        Ok(User {
            id: Some(row.get(0)?),
            login: row.get(1)?,
            display_name: row.get(2)?,
            email: row.get(3)?,
            roles: serde_json::from_str(&roles_json).unwrap_or_default(),
            created_ts: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    #[test]
    fn test_create_and_lookup() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let user = UserRepo::create(&conn, &User::new("ana", &["editor".to_string()])).unwrap();

        let by_id = UserRepo::get_by_id(&conn, user.id.unwrap()).unwrap().unwrap();
        assert_eq!(by_id.login, "ana");
        assert_eq!(by_id.roles, vec!["editor"]);
        assert!(UserRepo::get_by_login(&conn, "ana").unwrap().is_some());
        assert!(UserRepo::get_by_login(&conn, "bo").unwrap().is_none());
    }

    #[test]
    fn test_ids_with_roles() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let a = UserRepo::create(&conn, &User::new("a", &["editor".to_string()])).unwrap();
        UserRepo::create(&conn, &User::new("b", &["subscriber".to_string()])).unwrap();
        let c = UserRepo::create(&conn, &User::new("c", &["author".to_string(), "editor".to_string()])).unwrap();

        let ids = UserRepo::ids_with_roles(&conn, &["editor".to_string()]).unwrap();
        assert_eq!(ids, vec![a.id.unwrap(), c.id.unwrap()]);
        assert!(UserRepo::ids_with_roles(&conn, &["shop_manager".to_string()]).unwrap().is_empty());
        assert!(UserRepo::ids_with_roles(&conn, &[]).unwrap().is_empty());
    }
}
