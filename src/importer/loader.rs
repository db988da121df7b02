//! Deduplicating loader
//!
//! Writes one edition document into the store: gate on the edition row,
//! upsert the edition, then upsert verses in independent batches. Every
//! document handled here leaves exactly one import log entry, unless the
//! store itself fails.

use crate::config::Config;
use crate::document::{parse_document, ImportDocument};
use crate::storage::{
    EditionRow, ImportLogEntry, ImportStatus, Storage, StorageResult, VerseRow,
    RESOURCE_KIND_TAFSIR,
};
use crate::HarvestError;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{Duration, Instant};

/// Result of loading one document
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub status: ImportStatus,
    pub edition_id: Option<i64>,
    pub imported: u64,
    pub skipped: u64,
    pub error: Option<String>,
    pub duration: Duration,
}

/// Where a document came from, for the edition row and the log
#[derive(Debug, Clone, Default)]
pub struct DocumentSource {
    pub path: String,
    pub checksum: Option<String>,
}

/// Loads edition documents into a `Storage`
pub struct Loader<'a, S: Storage> {
    storage: &'a mut S,
    batch_size: usize,
    min_text_length: usize,
    source_url: Option<String>,
}

impl<'a, S: Storage> Loader<'a, S> {
    /// Creates a loader
    ///
    /// # Arguments
    ///
    /// * `storage` - Destination store
    /// * `batch_size` - Verse rows per transaction (at least 1)
    /// * `min_text_length` - Shortest accepted commentary, in characters after trimming
    pub fn new(storage: &'a mut S, batch_size: usize, min_text_length: usize) -> Self {
        Self {
            storage,
            batch_size: batch_size.max(1),
            min_text_length: min_text_length.max(1),
            source_url: None,
        }
    }

    pub fn from_config(storage: &'a mut S, config: &Config) -> Self {
        Self::new(
            storage,
            config.import.batch_size,
            config.validation.min_text_length,
        )
        .with_source_url(&config.crawler.base_url)
    }

    /// Origin recorded on edition rows
    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }

    /// Reads, validates and loads the document at `path`
    ///
    /// Unreadable, unparseable or structurally invalid files are logged as
    /// `failed` without touching verse or edition rows.
    pub fn import_file(&mut self, path: &Path, force: bool) -> Result<ImportOutcome, HarvestError> {
        let start = Instant::now();
        let path_str = path.display().to_string();

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let outcome = self.fail(&path_str, None, format!("Cannot read file: {}", e), start)?;
                return Ok(outcome);
            }
        };
        let checksum = hex::encode(Sha256::digest(&bytes));

        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                let outcome = self.fail(&path_str, None, format!("Invalid JSON: {}", e), start)?;
                return Ok(outcome);
            }
        };

        let document = match parse_document(&value) {
            Ok(document) => document,
            Err(e) => {
                let edition_id = value["meta"]["tid"].as_i64();
                let message = format!("Invalid document: {}", e);
                let outcome = self.fail(&path_str, edition_id, message, start)?;
                return Ok(outcome);
            }
        };

        let source = DocumentSource {
            path: path_str,
            checksum: Some(checksum),
        };
        let outcome = self.import_document(&document, &source, force)?;
        Ok(outcome)
    }

    /// Loads a validated document
    ///
    /// Without `force`, an edition that already has a metadata row is
    /// skipped whole, reporting every verse entry as skipped. Otherwise the
    /// edition row is upserted and verses are written in batches; a failed
    /// batch is rolled back and its rows counted as skipped.
    pub fn import_document(
        &mut self,
        document: &ImportDocument,
        source: &DocumentSource,
        force: bool,
    ) -> StorageResult<ImportOutcome> {
        let start = Instant::now();
        let meta = &document.meta;

        if !force && self.storage.edition_exists(meta.id)? {
            tracing::info!("Edition {} already imported, skipping {}", meta.id, source.path);
            let outcome = ImportOutcome {
                status: ImportStatus::Skipped,
                edition_id: Some(meta.id),
                imported: 0,
                skipped: document.total_entries as u64,
                error: None,
                duration: start.elapsed(),
            };
            self.log(&source.path, &outcome)?;
            return Ok(outcome);
        }

        self.storage.upsert_edition(&EditionRow {
            edition_id: meta.id,
            name: meta.name.clone(),
            author: meta.author.clone(),
            language: meta.language.to_string(),
            description: Some(format!("Imported from {} - {}", source.path, meta.name)),
            source_url: self.source_url.clone(),
            total_verses: document.total_entries as i64,
            import_date: Utc::now().to_rfc3339(),
            source_path: Some(source.path.clone()),
            checksum: source.checksum.clone(),
        })?;

        let mut skipped = document.rejected as u64;
        let mut rows = Vec::with_capacity(document.records.len());
        for record in &document.records {
            let text = record.text.trim();
            if text.chars().count() < self.min_text_length {
                skipped += 1;
                continue;
            }

            rows.push(VerseRow {
                verse_key: record.reference.key(),
                chapter: record.reference.chapter(),
                verse: record.reference.verse(),
                edition_id: meta.id,
                edition_name: meta.name.clone(),
                author: meta.author.clone(),
                language: meta.language.to_string(),
                text: text.to_string(),
                resource_kind: RESOURCE_KIND_TAFSIR.to_string(),
                content_hash: content_hash(text),
            });
        }

        let mut imported = 0u64;
        let mut failed_batches = 0usize;
        let mut last_error = None;
        let batches = rows.chunks(self.batch_size);
        let batch_count = batches.len();

        for (index, batch) in batches.enumerate() {
            match self.storage.upsert_verses(batch) {
                Ok(written) => imported += written as u64,
                Err(e) => {
                    tracing::warn!(
                        "Batch {}/{} of edition {} rolled back: {}",
                        index + 1,
                        batch_count,
                        meta.id,
                        e
                    );
                    skipped += batch.len() as u64;
                    failed_batches += 1;
                    last_error = Some(e.to_string());
                }
            }
        }

        let status = if batch_count > 0 && failed_batches == batch_count {
            ImportStatus::Failed
        } else {
            ImportStatus::Completed
        };
        let error = last_error.map(|e| format!("{} of {} batches failed: {}", failed_batches, batch_count, e));

        let outcome = ImportOutcome {
            status,
            edition_id: Some(meta.id),
            imported,
            skipped,
            error,
            duration: start.elapsed(),
        };
        self.log(&source.path, &outcome)?;

        tracing::info!(
            "Imported {} ({}): {} verses, {} skipped",
            meta.name,
            meta.id,
            imported,
            skipped
        );
        Ok(outcome)
    }

    fn fail(
        &mut self,
        path: &str,
        edition_id: Option<i64>,
        message: String,
        start: Instant,
    ) -> StorageResult<ImportOutcome> {
        tracing::error!("Failed to import {}: {}", path, message);
        let outcome = ImportOutcome {
            status: ImportStatus::Failed,
            edition_id,
            imported: 0,
            skipped: 0,
            error: Some(message),
            duration: start.elapsed(),
        };
        self.log(path, &outcome)?;
        Ok(outcome)
    }

    fn log(&mut self, path: &str, outcome: &ImportOutcome) -> StorageResult<()> {
        self.storage.append_import_log(&ImportLogEntry {
            path: path.to_string(),
            edition_id: outcome.edition_id,
            verses_imported: outcome.imported,
            verses_skipped: outcome.skipped,
            status: outcome.status,
            error_message: outcome.error.clone(),
            duration_seconds: outcome.duration.as_secs_f64(),
        })?;
        Ok(())
    }
}

/// SHA-256 hex digest of a verse's text
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
