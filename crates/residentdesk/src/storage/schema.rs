//! `SQLite` schema for the embedded store backend.
//!
//! All collections share one `records` table; each row holds one JSON
//! document tagged with its collection name.

/// SQL statement to create the records table.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to index records by collection, added in schema version 2.
pub const CREATE_COLLECTION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection, id)
";

/// Base schema statements, in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_RECORDS_TABLE, CREATE_METADATA_TABLE];
