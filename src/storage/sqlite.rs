//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{EditionRow, ImportLogEntry, ImportLogRecord, ImportStatus, VerseRow};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const UPSERT_VERSE_SQL: &str = "
    INSERT INTO verses (verse_key, chapter, verse, edition_id, edition_name, author, language,
                        text, resource_kind, content_hash, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
    ON CONFLICT(verse_key, edition_id) DO UPDATE SET
        chapter = excluded.chapter,
        verse = excluded.verse,
        edition_name = excluded.edition_name,
        author = excluded.author,
        language = excluded.language,
        text = excluded.text,
        resource_kind = excluded.resource_kind,
        content_hash = excluded.content_hash,
        updated_at = excluded.updated_at
";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    fn count(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    // ===== Editions =====

    fn edition_exists(&self, edition_id: i64) -> StorageResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM editions WHERE edition_id = ?1",
                params![edition_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert_edition(&mut self, edition: &EditionRow) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO editions (edition_id, name, author, language, description, source_url,
                                   total_verses, import_date, source_path, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(edition_id) DO UPDATE SET
                name = excluded.name,
                author = excluded.author,
                language = excluded.language,
                description = excluded.description,
                source_url = excluded.source_url,
                total_verses = excluded.total_verses,
                import_date = excluded.import_date,
                source_path = excluded.source_path,
                checksum = excluded.checksum",
            params![
                edition.edition_id,
                edition.name,
                edition.author,
                edition.language,
                edition.description,
                edition.source_url,
                edition.total_verses,
                edition.import_date,
                edition.source_path,
                edition.checksum,
            ],
        )?;
        Ok(())
    }

    fn get_edition(&self, edition_id: i64) -> StorageResult<Option<EditionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT edition_id, name, author, language, description, source_url, total_verses,
                    import_date, source_path, checksum
             FROM editions WHERE edition_id = ?1",
        )?;

        let edition = stmt
            .query_row(params![edition_id], |row| {
                Ok(EditionRow {
                    edition_id: row.get(0)?,
                    name: row.get(1)?,
                    author: row.get(2)?,
                    language: row.get(3)?,
                    description: row.get(4)?,
                    source_url: row.get(5)?,
                    total_verses: row.get(6)?,
                    import_date: row.get(7)?,
                    source_path: row.get(8)?,
                    checksum: row.get(9)?,
                })
            })
            .optional()?;

        Ok(edition)
    }

    // ===== Verses =====

    fn upsert_verses(&mut self, rows: &[VerseRow]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        // Dropping an uncommitted transaction rolls it back
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_VERSE_SQL)?;
            for row in rows {
                stmt.execute(params![
                    row.verse_key,
                    row.chapter,
                    row.verse,
                    row.edition_id,
                    row.edition_name,
                    row.author,
                    row.language,
                    row.text,
                    row.resource_kind,
                    row.content_hash,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    // ===== Import log =====

    fn append_import_log(&mut self, entry: &ImportLogEntry) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO import_log (path, edition_id, verses_imported, verses_skipped, status,
                                     error_message, import_date, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.path,
                entry.edition_id,
                entry.verses_imported as i64,
                entry.verses_skipped as i64,
                entry.status.to_db_string(),
                entry.error_message,
                now,
                entry.duration_seconds,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn import_log(&self) -> StorageResult<Vec<ImportLogRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, edition_id, verses_imported, verses_skipped, status, error_message,
                    import_date, duration_seconds
             FROM import_log ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, f64>(8)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, path, edition_id, imported, skipped, status, error_message, import_date, duration) = row?;
            let status = ImportStatus::from_db_string(&status).ok_or_else(|| StorageError::Corrupt {
                table: "import_log",
                reason: format!("unknown status '{}'", status),
            })?;

            records.push(ImportLogRecord {
                id,
                import_date,
                entry: ImportLogEntry {
                    path,
                    edition_id,
                    verses_imported: imported as u64,
                    verses_skipped: skipped as u64,
                    status,
                    error_message,
                    duration_seconds: duration,
                },
            });
        }

        Ok(records)
    }

    // ===== Statistics =====

    fn count_verses(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM verses", [])
    }

    fn count_verses_for_edition(&self, edition_id: i64) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM verses WHERE edition_id = ?1",
            params![edition_id],
        )
    }

    fn count_editions(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM editions", [])
    }

    fn language_breakdown(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT language, COUNT(*) AS count
             FROM verses
             GROUP BY language
             ORDER BY count DESC, language",
        )?;

        let breakdown = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(breakdown)
    }
}
