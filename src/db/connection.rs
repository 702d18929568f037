use rusqlite::Connection;
use anyhow::{Context, Result};
use crate::config::Config;
use crate::db::migrations::MigrationManager;

/// Database connection manager
pub struct DbConnection;

impl DbConnection {
    /// Connect to the configured database, creating it and parent directories if needed
    pub fn connect(config: &Config) -> Result<Connection> {
        let db_path = &config.data_location;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }

    /// Connect to an in-memory database (for testing)
    pub fn connect_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_connect_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_location: temp_dir.path().join("nested").join("entries.db"),
            ..Config::default()
        };

        DbConnection::connect(&config).unwrap();
        assert!(config.data_location.exists());
    }

    #[test]
    fn test_connect_in_memory() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let version = MigrationManager::get_version(&conn).unwrap();
        assert_eq!(version, 2);
    }
}
