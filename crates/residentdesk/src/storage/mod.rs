//! Storage layer for residentdesk.
//!
//! A [`Store`] keeps the three collections (feedback, tickets, housing
//! blocks) as insertion-ordered sequences of JSON documents. Backends:
//!
//! - [`JsonFileStore`]: one pretty-printed JSON array file per collection
//! - [`SqliteStore`]: a single embedded `SQLite` database
//! - [`MemoryStore`]: process memory, for tests
//!
//! Every backend serializes appends per collection, so two submitters never
//! overwrite each other's records.

mod json;
mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{Config, StorageBackend};
use crate::error::Result;
use crate::records::Collection;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persistence backend for the record collections.
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Short backend name (`json`, `sqlite`, `memory`).
    fn backend(&self) -> &'static str;

    /// Where the data lives, for logs and status output.
    fn location(&self) -> String;

    /// Create every missing collection.
    ///
    /// Feedback and tickets start empty; the housing collection starts with
    /// `housing_defaults`. Collections that already exist are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if a collection cannot be created.
    fn initialize(&self, housing_defaults: &[String]) -> Result<()>;

    /// Load all documents of a collection in insertion order.
    ///
    /// Missing or malformed data yields an empty sequence.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backend itself fails.
    fn load(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Append one document to a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be persisted.
    fn append(&self, collection: Collection, record: Value) -> Result<()>;

    /// Number of documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backend itself fails.
    fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self.load(collection)?.len())
    }
}

/// Load a collection as typed records.
///
/// A collection whose documents do not match `T` is treated like malformed
/// content and yields an empty sequence.
///
/// # Errors
///
/// Returns an error only when the backend itself fails.
pub fn load_records<T: DeserializeOwned>(
    store: &dyn Store,
    collection: Collection,
) -> Result<Vec<T>> {
    let values = store.load(collection)?;
    match serde_json::from_value(Value::Array(values)) {
        Ok(records) => Ok(records),
        Err(e) => {
            warn!("Unreadable {} collection, treating as empty: {}", collection, e);
            Ok(Vec::new())
        }
    }
}

/// Append a typed record to a collection.
///
/// # Errors
///
/// Returns an error if the record cannot be serialized or persisted.
pub fn append_record<T: Serialize>(
    store: &dyn Store,
    collection: Collection,
    record: &T,
) -> Result<()> {
    store.append(collection, serde_json::to_value(record)?)
}

/// Open the store selected by the configuration.
///
/// # Errors
///
/// Returns an error if the backend cannot be opened.
pub fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.storage.backend {
        StorageBackend::Json => Arc::new(JsonFileStore::open(config.data_dir())?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(config.database_path())?),
    };
    info!("Using {} store at {}", store.backend(), store.location());
    Ok(store)
}

/// Statistics about a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Backend name.
    pub backend: &'static str,
    /// Where the data lives.
    pub location: String,
    /// Number of feedback records.
    pub feedback: usize,
    /// Number of tickets.
    pub tickets: usize,
    /// Number of housing blocks.
    pub housing_blocks: usize,
}

impl StoreStats {
    /// Gather statistics from a store.
    ///
    /// # Errors
    ///
    /// Returns an error if a collection cannot be counted.
    pub fn collect(store: &dyn Store) -> Result<Self> {
        Ok(Self {
            backend: store.backend(),
            location: store.location(),
            feedback: store.count(Collection::Feedback)?,
            tickets: store.count(Collection::Tickets)?,
            housing_blocks: store.count(Collection::Housing)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{default_housing_blocks, FeedbackRecord};
    use serde_json::json;

    #[test]
    fn test_load_records_typed() {
        let store = MemoryStore::new();
        store.initialize(&default_housing_blocks()).unwrap();

        let blocks: Vec<String> = load_records(&store, Collection::Housing).unwrap();
        assert_eq!(blocks, default_housing_blocks());
    }

    #[test]
    fn test_load_records_shape_mismatch_is_empty() {
        let store = MemoryStore::new();
        store
            .append(Collection::Feedback, json!({"rating": "five"}))
            .unwrap();

        let records: Vec<FeedbackRecord> = load_records(&store, Collection::Feedback).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_append_record_round_trips_through_store() {
        let store = MemoryStore::new();
        let record = FeedbackRecord {
            timestamp: "2024-05-01T09:30:00.000000Z".to_string(),
            rating: 2,
            description: "Noisy lift".to_string(),
        };
        append_record(&store, Collection::Feedback, &record).unwrap();

        let records: Vec<FeedbackRecord> = load_records(&store, Collection::Feedback).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_store_stats() {
        let store = MemoryStore::new();
        store.initialize(&default_housing_blocks()).unwrap();
        store.append(Collection::Tickets, json!({})).unwrap();

        let stats = StoreStats::collect(&store).unwrap();
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.feedback, 0);
        assert_eq!(stats.tickets, 1);
        assert_eq!(stats.housing_blocks, 4);
    }

    #[test]
    fn test_open_store_json_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());

        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), "json");
    }

    #[test]
    fn test_open_store_sqlite_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.data_dir = Some(dir.path().to_path_buf());

        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), "sqlite");
        assert!(dir.path().join("residentdesk.db").exists());
    }
}
