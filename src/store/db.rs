//! `SQLite` handle shared by the settings and log stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use super::error::StoreError;
use super::schema::{ADD_KIND_COLUMN, DEFAULT_SETTINGS, SCHEMA, SCHEMA_VERSION};

/// Settings and log storage.
///
/// Opened once at startup and passed explicitly to whatever needs it. Clones
/// share one connection; it is closed when the last clone is dropped. All
/// statements run through `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open a store at the specified path.
    ///
    /// Creates parent directories if they don't exist, applies the schema and
    /// seeds default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot be applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        let path_clone = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn =
                Connection::open(&path_clone).map_err(|source| StoreError::DatabaseOpen {
                    path: path_clone,
                    source,
                })?;
            initialize(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        tracing::info!(path = %path.display(), "Opened store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or the schema cannot be applied.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection, StoreError> {
            let conn = Connection::open_in_memory()?;
            initialize(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the path to the database, if opened from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool.
    pub(super) async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }
}

fn initialize(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA)?;
    if !has_kind_column(conn)? {
        conn.execute(ADD_KIND_COLUMN, [])?;
        tracing::debug!("Added setting_kind column to admin_settings");
    }
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![SCHEMA_VERSION],
    )?;
    for (key, kind, value) in DEFAULT_SETTINGS {
        conn.execute(
            "INSERT OR IGNORE INTO admin_settings (setting_key, setting_value, setting_kind)
             VALUES (?1, ?2, ?3)",
            params![key, value, kind],
        )?;
    }
    Ok(())
}

fn has_kind_column(conn: &Connection) -> Result<bool, StoreError> {
    let mut stmt = conn.prepare("PRAGMA table_info(admin_settings)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns.iter().any(|name| name == "setting_kind"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WORKER_DB_FILE;

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn test_open_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("dir").join("web.db");

        let store = Store::open(&db_path).await.unwrap();
        assert!(db_path.exists());
        assert_eq!(store.path(), Some(db_path.as_path()));
    }

    #[tokio::test]
    async fn test_open_records_schema_version() {
        let store = Store::open_in_memory().await.unwrap();
        let version: u32 = store
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                    row.get(0)
                })?)
            })
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_open_adopts_worker_created_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join(WORKER_DB_FILE);
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE admin_settings (
                     id INTEGER PRIMARY KEY,
                     setting_key TEXT UNIQUE,
                     setting_value TEXT,
                     updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                 );
                 INSERT INTO admin_settings (setting_key, setting_value)
                 VALUES ('email_user', 'ops@example.com');",
            )
            .unwrap();
        }

        let store = Store::open(&db_path).await.unwrap();
        let settings = store.get_all_settings().await.unwrap();
        assert_eq!(settings["email_user"].as_text(), Some("ops@example.com"));
        assert!(settings.contains_key("schedule_day"));

        // Reopening must not try to add the column twice
        drop(store);
        Store::open(&db_path).await.unwrap();
    }
}
