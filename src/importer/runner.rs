//! Multi-document import runs and the import progress ledger

use crate::importer::loader::{ImportOutcome, Loader};
use crate::state::{ImportProgress, ProgressStore};
use crate::storage::{ImportStatus, Storage};
use crate::HarvestError;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Files between progress log lines
const PROGRESS_INTERVAL: usize = 5;

/// Collects the documents to import from a file or directory
///
/// A directory yields its `tafsir_*.json` files, sorted by name. A
/// directory without any is `HarvestError::NoDocuments`.
pub fn find_documents(input: &Path) -> Result<Vec<PathBuf>, HarvestError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    if !input.is_dir() {
        return Err(HarvestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is neither a file nor a directory", input.display()),
        )));
    }

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        let is_document = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("tafsir_") && name.ends_with(".json"))
            .unwrap_or(false);

        if is_document && path.is_file() {
            documents.push(path);
        }
    }
    documents.sort();

    if documents.is_empty() {
        return Err(HarvestError::NoDocuments {
            path: input.display().to_string(),
        });
    }

    Ok(documents)
}

/// Totals of an import run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub files_total: usize,
    /// Documents the loader ran on, whatever their outcome
    pub files_processed: usize,
    /// Documents bypassed because the ledger already listed them
    pub files_skipped: usize,
    pub verses_total: u64,
    pub verses_imported: u64,
    pub verses_skipped: u64,
    pub errors: usize,
    pub duration: Duration,
    pub interrupted: bool,
}

impl ImportSummary {
    /// Imported verses per second
    pub fn rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.verses_imported as f64 / secs
        } else {
            0.0
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors == 0 && !self.interrupted
    }

    fn record(&mut self, outcome: &ImportOutcome) {
        self.files_processed += 1;
        self.verses_total += outcome.imported + outcome.skipped;
        self.verses_imported += outcome.imported;
        self.verses_skipped += outcome.skipped;
    }
}

/// One import run over a list of documents
pub struct ImportRun<'a, S: Storage> {
    loader: Loader<'a, S>,
    ledger: &'a dyn ProgressStore<ImportProgress>,
}

impl<'a, S: Storage> ImportRun<'a, S> {
    pub fn new(loader: Loader<'a, S>, ledger: &'a dyn ProgressStore<ImportProgress>) -> Self {
        Self { loader, ledger }
    }

    /// Imports `documents` in order
    ///
    /// A path the ledger lists as processed is bypassed unless `force`.
    /// The ledger is saved after every document. It is deleted at the end
    /// only if `cleanup` is set and the run finished with zero errors.
    ///
    /// # Arguments
    ///
    /// * `documents` - Paths to import
    /// * `force` - Re-import ledgered paths and existing editions
    /// * `cleanup` - Delete the ledger after a clean run
    /// * `token` - Checked between documents
    pub fn run(
        &mut self,
        documents: &[PathBuf],
        force: bool,
        cleanup: bool,
        token: &CancellationToken,
    ) -> Result<ImportSummary, HarvestError> {
        let start = Instant::now();
        let mut ledger = self.ledger.load()?;
        let mut summary = ImportSummary {
            files_total: documents.len(),
            ..Default::default()
        };

        tracing::info!("Importing {} documents", documents.len());

        for (index, path) in documents.iter().enumerate() {
            if token.is_cancelled() {
                tracing::info!("Import interrupted after {} documents", index);
                summary.interrupted = true;
                break;
            }

            let key = path.display().to_string();
            if !force && ledger.is_processed(&key) {
                tracing::info!("Already processed: {}", key);
                summary.files_skipped += 1;
                continue;
            }

            let outcome = self.loader.import_file(path, force)?;
            summary.record(&outcome);

            match outcome.status {
                ImportStatus::Completed | ImportStatus::Skipped => ledger.mark_processed(&key),
                ImportStatus::Failed => {
                    summary.errors += 1;
                    ledger.mark_failed(&key);
                }
            }
            self.ledger.save(&ledger)?;

            if (index + 1) % PROGRESS_INTERVAL == 0 || index + 1 == documents.len() {
                tracing::info!(
                    "Progress: {}/{} files ({:.1}%), {} verses imported",
                    index + 1,
                    documents.len(),
                    (index + 1) as f64 / documents.len() as f64 * 100.0,
                    summary.verses_imported
                );
            }
        }

        summary.duration = start.elapsed();

        if cleanup && summary.is_success() {
            self.ledger.clear()?;
            tracing::debug!("Import ledger cleared");
        } else if !summary.is_success() {
            tracing::warn!("Keeping import ledger for inspection and resumption");
        }

        Ok(summary)
    }
}
