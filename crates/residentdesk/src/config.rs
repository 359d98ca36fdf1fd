//! Configuration management for residentdesk.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::records::default_housing_blocks;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the user's config directory.
const CONFIG_DIR_NAME: &str = "residentdesk";

/// Default database file name for the `SQLite` backend.
const DATABASE_FILE_NAME: &str = "residentdesk.db";

/// Prefix of environment variables that override the configuration.
const ENV_PREFIX: &str = "RESIDENTDESK_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `RESIDENTDESK_`, sections separated
///    by `__`, e.g. `RESIDENTDESK_STORAGE__DATA_DIR`)
/// 2. TOML config file at `~/.config/residentdesk/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Housing reference data configuration.
    pub housing: HousingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
}

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON array file per collection.
    #[default]
    Json,
    /// A single embedded `SQLite` database.
    Sqlite,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Persistence backend.
    pub backend: StorageBackend,
    /// Directory holding the store files.
    /// Defaults to the current working directory.
    pub data_dir: Option<PathBuf>,
    /// Path to the `SQLite` database.
    /// Defaults to `<data_dir>/residentdesk.db`.
    pub database_path: Option<PathBuf>,
}

/// Housing reference data configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingConfig {
    /// Blocks written to a fresh housing store.
    pub default_blocks: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl Default for HousingConfig {
    fn default() -> Self {
        Self {
            default_blocks: default_housing_blocks(),
        }
    }
}

impl Config {
    /// Load configuration from all sources, reading the TOML file at
    /// `config_path` or the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        if self.housing.default_blocks.is_empty() {
            return Err(Error::ConfigValidation {
                message: "housing.default_blocks must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for block in &self.housing.default_blocks {
            if block.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "housing.default_blocks contains a blank name".to_string(),
                });
            }
            if !seen.insert(block.as_str()) {
                return Err(Error::ConfigValidation {
                    message: format!("housing.default_blocks lists {block:?} twice"),
                });
            }
        }

        Ok(())
    }

    /// Parse the configured listen address.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|_| Error::ConfigValidation {
                message: format!("server.bind is not a socket address: {}", self.server.bind),
            })
    }

    /// Get the data directory, resolving defaults if not set.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert!(config.storage.data_dir.is_none());
        assert_eq!(config.housing.default_blocks.len(), 4);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_bind() {
        let mut config = Config::default();
        config.server.bind = "localhost".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.bind"));
    }

    #[test]
    fn test_validate_empty_housing() {
        let mut config = Config::default();
        config.housing.default_blocks.clear();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must not be empty"));
    }

    #[test]
    fn test_validate_blank_housing_name() {
        let mut config = Config::default();
        config.housing.default_blocks.push("  ".to_string());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("blank"));
    }

    #[test]
    fn test_validate_duplicate_housing_name() {
        let mut config = Config::default();
        config.housing.default_blocks.push("Block A".to_string());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("twice"));
    }

    #[test]
    fn test_bind_addr() {
        let addr = Config::default().bind_addr().unwrap();
        assert_eq!(addr.port(), 5000);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_data_dir_default() {
        assert_eq!(Config::default().data_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_database_path_follows_data_dir() {
        let mut config = Config::default();
        config.storage.data_dir = Some(PathBuf::from("/srv/desk"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/desk/residentdesk.db")
        );
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("residentdesk"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:8080"

[storage]
backend = "sqlite"
data_dir = "/var/lib/residentdesk"

[housing]
default_blocks = ["North", "South"]
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/residentdesk/residentdesk.db")
        );
        assert_eq!(config.housing.default_blocks, vec!["North", "South"]);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[housing]\ndefault_blocks = []\n").unwrap();

        assert!(Config::load_from(Some(path)).is_err());
    }

    #[test]
    fn test_storage_backend_serde() {
        let json = serde_json::to_string(&StorageBackend::Sqlite).unwrap();
        assert_eq!(json, "\"sqlite\"");
        let backend: StorageBackend = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(backend, StorageBackend::Json);
    }
}
