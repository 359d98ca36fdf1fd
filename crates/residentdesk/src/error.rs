//! Error types for residentdesk.
//!
//! Validation failures are not errors: they are reported as
//! [`Rejection`](crate::validation::Rejection) values. This module covers the
//! failures that abort a request or a command.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for residentdesk operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// Failed to write a store file.
    #[error("failed to write store {path}: {source}")]
    StoreWrite {
        /// Path of the store file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A store lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {collection}")]
    LockPoisoned {
        /// Name of the guarded collection.
        collection: &'static str,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Server Errors ===
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A page template failed to compile.
    #[error("invalid template: {0}")]
    TemplateRegistration(Box<handlebars::TemplateError>),

    /// A page template failed to render.
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// The HTTP server failed.
    #[error("server error: {0}")]
    Server(String),

    // === File System Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for residentdesk operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::TemplateRegistration(Box::new(err))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}

impl Error {
    /// Create a new server error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }
}
