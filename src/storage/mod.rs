//! Storage module for persisting imported commentary
//!
//! This module handles all database operations for the import stage, including:
//! - SQLite database initialization and schema management
//! - Replace-on-conflict verse and edition upserts
//! - The append-only import log
//! - Statistics queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HarvestError;

use std::path::Path;

/// Kind of text stored in a verse row
pub const RESOURCE_KIND_TAFSIR: &str = "tafsir";

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// A verse row as written by the loader
#[derive(Debug, Clone, PartialEq)]
pub struct VerseRow {
    pub verse_key: String,
    pub chapter: u16,
    pub verse: u16,
    pub edition_id: i64,
    pub edition_name: String,
    pub author: String,
    pub language: String,
    pub text: String,
    pub resource_kind: String,
    pub content_hash: String,
}

/// Edition metadata as stored
#[derive(Debug, Clone, PartialEq)]
pub struct EditionRow {
    pub edition_id: i64,
    pub name: String,
    pub author: String,
    pub language: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub total_verses: i64,
    pub import_date: String,
    pub source_path: Option<String>,
    pub checksum: Option<String>,
}

/// A new import log entry
#[derive(Debug, Clone, PartialEq)]
pub struct ImportLogEntry {
    pub path: String,
    pub edition_id: Option<i64>,
    pub verses_imported: u64,
    pub verses_skipped: u64,
    pub status: ImportStatus,
    pub error_message: Option<String>,
    pub duration_seconds: f64,
}

/// An import log entry read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct ImportLogRecord {
    pub id: i64,
    pub import_date: String,
    pub entry: ImportLogEntry,
}

/// Outcome of importing one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Completed,
    Skipped,
    Failed,
}

impl ImportStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "skipped" => Some(Self::Skipped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_status_roundtrip() {
        for status in &[
            ImportStatus::Completed,
            ImportStatus::Skipped,
            ImportStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            let parsed = ImportStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_import_status_invalid() {
        assert_eq!(ImportStatus::from_db_string("invalid"), None);
    }
}
