//! In-process backend for tests and throwaway runs.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::Store;
use crate::error::{Error, Result};
use crate::records::Collection;

/// Store that keeps every collection in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    /// Create an empty store with no collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `collection` has been created.
    #[must_use]
    pub fn contains(&self, collection: Collection) -> bool {
        self.collections
            .lock()
            .is_ok_and(|collections| collections.contains_key(&collection))
    }

    fn with_collections<T>(
        &self,
        f: impl FnOnce(&mut HashMap<Collection, Vec<Value>>) -> T,
    ) -> Result<T> {
        let mut collections = self.collections.lock().map_err(|_| Error::LockPoisoned {
            collection: "memory",
        })?;
        Ok(f(&mut collections))
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn location(&self) -> String {
        ":memory:".to_string()
    }

    fn initialize(&self, housing_defaults: &[String]) -> Result<()> {
        self.with_collections(|collections| {
            collections.entry(Collection::Feedback).or_default();
            collections.entry(Collection::Tickets).or_default();
            collections.entry(Collection::Housing).or_insert_with(|| {
                housing_defaults
                    .iter()
                    .map(|block| Value::String(block.clone()))
                    .collect()
            });
        })
    }

    fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        self.with_collections(|collections| {
            collections.get(&collection).cloned().unwrap_or_default()
        })
    }

    fn append(&self, collection: Collection, record: Value) -> Result<()> {
        self.with_collections(|collections| {
            collections.entry(collection).or_default().push(record);
        })
    }
}
