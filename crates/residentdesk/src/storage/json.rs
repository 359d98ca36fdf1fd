//! Flat-file backend: one JSON array per collection.

use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::Store;
use crate::error::{Error, Result};
use crate::records::Collection;

/// Store keeping `feedback.json`, `tickets.json` and `housing.json` in one
/// directory.
///
/// Each collection has its own lock, held across the whole
/// read-append-rewrite cycle. Files are replaced by renaming a fully written
/// temporary file, so readers never observe a partial array.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    locks: [Mutex<()>; 3],
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
        }
        debug!("Opened JSON store in {}", dir.display());
        Ok(Self {
            dir,
            locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        })
    }

    /// Directory holding the store files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `collection`.
    #[must_use]
    pub fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    fn lock(&self, collection: Collection) -> Result<MutexGuard<'_, ()>> {
        self.locks[collection.index()]
            .lock()
            .map_err(|_| Error::LockPoisoned {
                collection: collection.name(),
            })
    }

    fn read_values(&self, collection: Collection) -> Vec<Value> {
        let path = self.path(collection);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read {}, treating as empty: {}", path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&text) {
            Ok(Value::Array(values)) => values,
            Ok(_) => {
                warn!("{} is not a JSON array, treating as empty", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("Malformed {}, treating as empty: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    fn write_values(&self, collection: Collection, values: &[Value]) -> Result<()> {
        let path = self.path(collection);
        let write_error = |source: std::io::Error| Error::StoreWrite {
            path: path.clone(),
            source,
        };

        let mut file = NamedTempFile::new_in(&self.dir).map_err(write_error)?;
        if let Some(permissions) = store_permissions(&path) {
            file.as_file()
                .set_permissions(permissions)
                .map_err(write_error)?;
        }
        serde_json::to_writer_pretty(&mut file, values)?;
        file.flush().map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(&path).map_err(|e| write_error(e.error))?;
        Ok(())
    }
}

/// Permissions for a rewritten store file. An existing file keeps its mode;
/// a new one is `0644` rather than the temp file's owner-only default.
fn store_permissions(path: &Path) -> Option<Permissions> {
    match std::fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(_) => new_file_permissions(),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}

impl Store for JsonFileStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    fn location(&self) -> String {
        self.dir().display().to_string()
    }

    fn initialize(&self, housing_defaults: &[String]) -> Result<()> {
        for collection in Collection::ALL {
            let _guard = self.lock(collection)?;
            if self.path(collection).exists() {
                continue;
            }
            let seed: Vec<Value> = match collection {
                Collection::Housing => housing_defaults
                    .iter()
                    .map(|block| Value::String(block.clone()))
                    .collect(),
                Collection::Feedback | Collection::Tickets => Vec::new(),
            };
            self.write_values(collection, &seed)?;
            info!("Created {}", self.path(collection).display());
        }
        Ok(())
    }

    fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let _guard = self.lock(collection)?;
        Ok(self.read_values(collection))
    }

    fn append(&self, collection: Collection, record: Value) -> Result<()> {
        let _guard = self.lock(collection)?;
        let mut values = self.read_values(collection);
        values.push(record);
        self.write_values(collection, &values)?;
        debug!("Appended to {} ({} records)", collection, values.len());
        Ok(())
    }
}
