//! Durable progress snapshots
//!
//! Pipeline code only ever sees `ProgressStore`; the file-backed store is
//! injected by the CLI and the in-memory store by tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors raised while loading or persisting a checkpoint
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Failed to write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove checkpoint {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checkpoint store lock poisoned")]
    Poisoned,
}

/// Load/save interface over a single progress snapshot
pub trait ProgressStore<T>: Send + Sync {
    /// Returns the last saved snapshot, or the default when none exists
    fn load(&self) -> Result<T, ProgressError>;

    /// Durably replaces the snapshot
    fn save(&self, snapshot: &T) -> Result<(), ProgressError>;

    /// Removes the snapshot so the next `load` starts from the default
    fn clear(&self) -> Result<(), ProgressError>;
}

/// JSON file holding one snapshot
///
/// Saves go through a sibling temp file and a rename, so a crash leaves
/// either the previous or the new snapshot on disk.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> ProgressStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> Result<T, ProgressError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(ProgressError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                tracing::warn!(
                    "Could not parse progress file {}: {}; starting from scratch",
                    self.path.display(),
                    e
                );
                Ok(T::default())
            }
        }
    }

    fn save(&self, snapshot: &T) -> Result<(), ProgressError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        write_atomically(&self.path, &json).map_err(|source| ProgressError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn clear(&self) -> Result<(), ProgressError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ProgressError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Writes `bytes` to `path` via a temp file in the same directory
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// In-process snapshot store
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    snapshot: Mutex<Option<T>>,
    saves: Mutex<usize>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(None),
            saves: Mutex::new(0),
        }
    }

    /// Seeds the store as if `snapshot` had been saved by an earlier run
    pub fn with_snapshot(snapshot: T) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    /// Whether a snapshot is currently held
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl<T> ProgressStore<T> for MemoryStore<T>
where
    T: Clone + Default + Send,
{
    fn load(&self) -> Result<T, ProgressError> {
        let guard = self.snapshot.lock().map_err(|_| ProgressError::Poisoned)?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &T) -> Result<(), ProgressError> {
        *self.snapshot.lock().map_err(|_| ProgressError::Poisoned)? = Some(snapshot.clone());
        *self.saves.lock().map_err(|_| ProgressError::Poisoned)? += 1;
        Ok(())
    }

    fn clear(&self) -> Result<(), ProgressError> {
        *self.snapshot.lock().map_err(|_| ProgressError::Poisoned)? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CrawlProgress, ImportProgress};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_default() {
        let dir = TempDir::new().unwrap();
        let store: JsonFileStore<CrawlProgress> = JsonFileStore::new(dir.path().join("p.json"));
        assert_eq!(store.load().unwrap(), CrawlProgress::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store: JsonFileStore<CrawlProgress> =
            JsonFileStore::new(dir.path().join("nested").join("p.json"));

        let mut progress = CrawlProgress::default();
        progress.begin_edition(12);
        progress.complete_chapter(3);
        store.save(&progress).unwrap();

        assert_eq!(store.load().unwrap(), progress);
        assert!(!dir.path().join("nested").join("p.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_loads_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, "{not json").unwrap();

        let store: JsonFileStore<ImportProgress> = JsonFileStore::new(&path);
        assert_eq!(store.load().unwrap(), ImportProgress::default());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.json");
        let store: JsonFileStore<ImportProgress> = JsonFileStore::new(&path);
        store.save(&ImportProgress::default()).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // A regular file cannot act as a parent directory
        let store: JsonFileStore<CrawlProgress> = JsonFileStore::new(blocker.join("p.json"));
        let result = store.save(&CrawlProgress::default());
        assert!(matches!(result, Err(ProgressError::Write { .. })));
    }

    #[test]
    fn test_memory_store() {
        let store: MemoryStore<ImportProgress> = MemoryStore::new();
        assert!(!store.has_snapshot());

        let mut progress = ImportProgress::default();
        progress.mark_processed("x.json");
        store.save(&progress).unwrap();

        assert_eq!(store.load().unwrap(), progress);
        assert_eq!(store.save_count(), 1);

        store.clear().unwrap();
        assert!(!store.has_snapshot());
    }
}
