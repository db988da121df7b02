//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{EditionRow, ImportLogEntry, ImportLogRecord, VerseRow};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// All verse and edition writes are replace-on-conflict, so repeating a
/// write is always safe.
pub trait Storage {
    // ===== Editions =====

    /// Whether a metadata row exists for `edition_id`
    fn edition_exists(&self, edition_id: i64) -> StorageResult<bool>;

    /// Inserts or replaces the metadata row keyed by `edition.edition_id`
    fn upsert_edition(&mut self, edition: &EditionRow) -> StorageResult<()>;

    fn get_edition(&self, edition_id: i64) -> StorageResult<Option<EditionRow>>;

    // ===== Verses =====

    /// Upserts one batch of verse rows inside a single transaction
    ///
    /// On error nothing from the batch is kept.
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn upsert_verses(&mut self, rows: &[VerseRow]) -> StorageResult<usize>;

    // ===== Import log =====

    /// Appends one audit entry; entries are never updated
    fn append_import_log(&mut self, entry: &ImportLogEntry) -> StorageResult<i64>;

    /// All audit entries, oldest first
    fn import_log(&self) -> StorageResult<Vec<ImportLogRecord>>;

    // ===== Statistics =====

    fn count_verses(&self) -> StorageResult<u64>;

    fn count_verses_for_edition(&self, edition_id: i64) -> StorageResult<u64>;

    fn count_editions(&self) -> StorageResult<u64>;

    /// Verse counts per language, largest first
    fn language_breakdown(&self) -> StorageResult<Vec<(String, u64)>>;
}
