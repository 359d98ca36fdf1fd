//! Embedded `SQLite` backend.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{migrations, Store};
use crate::error::{Error, Result};
use crate::records::Collection;

/// Store keeping every collection in one `SQLite` database.
///
/// The connection sits behind a mutex; each append is a single `INSERT`, so
/// concurrent submitters cannot overwrite each other.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

fn initialized_key(collection: Collection) -> String {
    format!("initialized.{}", collection.name())
}

impl SqliteStore {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned {
            collection: "sqlite",
        })
    }
}

impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn initialize(&self, housing_defaults: &[String]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for collection in Collection::ALL {
            let key = initialized_key(collection);
            let exists = tx
                .query_row("SELECT 1 FROM metadata WHERE key = ?1", [&key], |_| Ok(()))
                .optional()?
                .is_some();
            if exists {
                continue;
            }

            if collection == Collection::Housing {
                let mut stmt =
                    tx.prepare("INSERT INTO records (collection, payload) VALUES (?1, ?2)")?;
                for block in housing_defaults {
                    let payload = serde_json::to_string(block)?;
                    stmt.execute(params![collection.name(), payload])?;
                }
            }
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, datetime('now'))",
                [&key],
            )?;
            info!("Created {} collection", collection);
        }

        tx.commit()?;
        Ok(())
    }

    fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, payload FROM records WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map([collection.name()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let values = rows
            .into_iter()
            .filter_map(|(id, payload)| match serde_json::from_str(&payload) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Skipping malformed {} row {}: {}", collection, id, e);
                    None
                }
            })
            .collect();
        Ok(values)
    }

    fn append(&self, collection: Collection, record: Value) -> Result<()> {
        let payload = serde_json::to_string(&record)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO records (collection, payload) VALUES (?1, ?2)",
            params![collection.name(), payload],
        )?;
        debug!(
            "Inserted {} record with id {}",
            collection,
            conn.last_insert_rowid()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::default_housing_blocks;
    use serde_json::json;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    #[test]
    fn test_open_in_memory() {
        let store = create_test_store();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_initialize_seeds_housing() {
        let store = create_test_store();
        store.initialize(&default_housing_blocks()).unwrap();

        let blocks = store.load(Collection::Housing).unwrap();
        assert_eq!(
            blocks,
            vec![
                json!("Block A"),
                json!("Block B"),
                json!("Block C"),
                json!("Block D")
            ]
        );
        assert_eq!(store.count(Collection::Feedback).unwrap(), 0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let store = create_test_store();
        store.initialize(&default_housing_blocks()).unwrap();
        store.initialize(&default_housing_blocks()).unwrap();

        assert_eq!(store.count(Collection::Housing).unwrap(), 4);
    }

    #[test]
    fn test_append_and_load_in_order() {
        let store = create_test_store();
        store.append(Collection::Feedback, json!({"rating": 1})).unwrap();
        store.append(Collection::Feedback, json!({"rating": 2})).unwrap();
        store.append(Collection::Tickets, json!({"room": "A-1"})).unwrap();

        assert_eq!(
            store.load(Collection::Feedback).unwrap(),
            vec![json!({"rating": 1}), json!({"rating": 2})]
        );
        assert_eq!(store.count(Collection::Tickets).unwrap(), 1);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let store = create_test_store();
        store.append(Collection::Tickets, json!({"room": "A-1"})).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO records (collection, payload) VALUES ('tickets', '{broken')",
                [],
            )
            .unwrap();

        assert_eq!(
            store.load(Collection::Tickets).unwrap(),
            vec![json!({"room": "A-1"})]
        );
    }

    #[test]
    fn test_count_agrees_with_load() {
        let store = create_test_store();
        store.append(Collection::Feedback, json!({"rating": 4})).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO records (collection, payload) VALUES ('feedback', 'not json')",
                [],
            )
            .unwrap();

        assert_eq!(store.count(Collection::Feedback).unwrap(), 1);
        assert_eq!(
            store.count(Collection::Feedback).unwrap(),
            store.load(Collection::Feedback).unwrap().len()
        );
    }

    #[test]
    fn test_open_file_based_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("desk.db");

        {
            let store = SqliteStore::open(&db_path).unwrap();
            store.initialize(&default_housing_blocks()).unwrap();
            store.append(Collection::Feedback, json!({"rating": 5})).unwrap();
            assert_eq!(store.path(), db_path);
        }

        let reopened = SqliteStore::open(&db_path).unwrap();
        reopened.initialize(&default_housing_blocks()).unwrap();
        assert_eq!(reopened.count(Collection::Feedback).unwrap(), 1);
        assert_eq!(reopened.count(Collection::Housing).unwrap(), 4);
    }
}
