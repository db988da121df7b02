//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Tafsir-Ripple store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per (verse, edition); re-imports overwrite in place
CREATE TABLE IF NOT EXISTS verses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    verse_key TEXT NOT NULL,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    edition_id INTEGER NOT NULL,
    edition_name TEXT NOT NULL,
    author TEXT NOT NULL,
    language TEXT NOT NULL,
    text TEXT NOT NULL,
    resource_kind TEXT NOT NULL DEFAULT 'tafsir',
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(verse_key, edition_id)
);

CREATE INDEX IF NOT EXISTS idx_verses_chapter ON verses(chapter, verse);
CREATE INDEX IF NOT EXISTS idx_verses_edition ON verses(edition_id);
CREATE INDEX IF NOT EXISTS idx_verses_language ON verses(language);

-- Edition metadata; presence of a row gates whole-document skips
CREATE TABLE IF NOT EXISTS editions (
    edition_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    author TEXT NOT NULL,
    language TEXT NOT NULL,
    description TEXT,
    source_url TEXT,
    total_verses INTEGER NOT NULL DEFAULT 0,
    import_date TEXT NOT NULL,
    source_path TEXT,
    checksum TEXT
);

-- Append-only audit trail, one row per processed document
CREATE TABLE IF NOT EXISTS import_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    edition_id INTEGER,
    verses_imported INTEGER NOT NULL DEFAULT 0,
    verses_skipped INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    error_message TEXT,
    import_date TEXT NOT NULL,
    duration_seconds REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_import_log_edition ON import_log(edition_id);
"#;

/// Initializes the database schema
///
/// This function creates all tables and indexes if they don't exist.
/// It's safe to call multiple times.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
