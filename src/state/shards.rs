//! Per-chapter verse shards for the edition in progress
//!
//! A chapter's verses are written here before the chapter is checkpointed,
//! so a resumed crawl can rebuild the full document without refetching.

use crate::document::VerseEntry;
use crate::state::store::write_atomically;
use crate::state::ProgressError;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;

/// Verses keyed by `"<chapter>:<verse>"`
pub type VerseMap = BTreeMap<String, VerseEntry>;

pub trait ShardStore: Send + Sync {
    /// Durably stores the verses collected for one chapter
    fn save_chapter(&self, edition_id: i64, chapter: u16, verses: &VerseMap) -> Result<(), ProgressError>;

    /// Merges the stored verses of `chapters`; missing shards contribute nothing
    fn load_chapters(&self, edition_id: i64, chapters: &[u16]) -> Result<VerseMap, ProgressError>;

    /// Drops every shard of `edition_id`
    fn clear(&self, edition_id: i64) -> Result<(), ProgressError>;
}

/// One JSON file per chapter under `<root>/<edition_id>/`
pub struct FileShardStore {
    root: PathBuf,
}

impl FileShardStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn edition_dir(&self, edition_id: i64) -> PathBuf {
        self.root.join(edition_id.to_string())
    }

    fn chapter_path(&self, edition_id: i64, chapter: u16) -> PathBuf {
        self.edition_dir(edition_id)
            .join(format!("chapter_{}.json", chapter))
    }
}

impl ShardStore for FileShardStore {
    fn save_chapter(&self, edition_id: i64, chapter: u16, verses: &VerseMap) -> Result<(), ProgressError> {
        let path = self.chapter_path(edition_id, chapter);
        let json = serde_json::to_vec(verses)?;
        write_atomically(&path, &json).map_err(|source| ProgressError::Write { path, source })
    }

    fn load_chapters(&self, edition_id: i64, chapters: &[u16]) -> Result<VerseMap, ProgressError> {
        let mut merged = VerseMap::new();

        for &chapter in chapters {
            let path = self.chapter_path(edition_id, chapter);
            let content = match std::fs::read(&path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(
                        "No shard for edition {} chapter {}; its verses will be missing",
                        edition_id,
                        chapter
                    );
                    continue;
                }
                Err(source) => return Err(ProgressError::Read { path, source }),
            };

            let verses: VerseMap = serde_json::from_slice(&content)?;
            merged.extend(verses);
        }

        Ok(merged)
    }

    fn clear(&self, edition_id: i64) -> Result<(), ProgressError> {
        let dir = self.edition_dir(edition_id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ProgressError::Remove { path: dir, source }),
        }
    }
}

/// In-process shard store
#[derive(Debug, Default)]
pub struct MemoryShardStore {
    shards: Mutex<HashMap<(i64, u16), VerseMap>>,
}

impl MemoryShardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chapter shards currently held for `edition_id`
    pub fn chapter_count(&self, edition_id: i64) -> usize {
        self.shards
            .lock()
            .map(|s| s.keys().filter(|(id, _)| *id == edition_id).count())
            .unwrap_or(0)
    }
}

impl ShardStore for MemoryShardStore {
    fn save_chapter(&self, edition_id: i64, chapter: u16, verses: &VerseMap) -> Result<(), ProgressError> {
        let mut shards = self.shards.lock().map_err(|_| ProgressError::Poisoned)?;
        shards.insert((edition_id, chapter), verses.clone());
        Ok(())
    }

    fn load_chapters(&self, edition_id: i64, chapters: &[u16]) -> Result<VerseMap, ProgressError> {
        let shards = self.shards.lock().map_err(|_| ProgressError::Poisoned)?;
        let mut merged = VerseMap::new();
        for chapter in chapters {
            if let Some(verses) = shards.get(&(edition_id, *chapter)) {
                merged.extend(verses.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        Ok(merged)
    }

    fn clear(&self, edition_id: i64) -> Result<(), ProgressError> {
        let mut shards = self.shards.lock().map_err(|_| ProgressError::Poisoned)?;
        shards.retain(|(id, _), _| *id != edition_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::VerseRecord;
    use crate::verse::VerseReference;
    use tempfile::TempDir;

    fn chapter_verses(chapter: i64, count: i64) -> VerseMap {
        (1..=count)
            .map(|v| {
                let record = VerseRecord::new(VerseReference::new(chapter, v).unwrap(), 1, "text");
                (record.reference.key(), record.to_entry())
            })
            .collect()
    }

    #[test]
    fn test_file_shards_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileShardStore::new(dir.path());

        store.save_chapter(1, 1, &chapter_verses(1, 7)).unwrap();
        store.save_chapter(1, 2, &chapter_verses(2, 3)).unwrap();
        store.save_chapter(2, 1, &chapter_verses(1, 1)).unwrap();

        let merged = store.load_chapters(1, &[1, 2]).unwrap();
        assert_eq!(merged.len(), 10);

        // A chapter without a shard is skipped
        let partial = store.load_chapters(1, &[2, 3]).unwrap();
        assert_eq!(partial.len(), 3);
    }

    #[test]
    fn test_file_shards_clear_is_per_edition() {
        let dir = TempDir::new().unwrap();
        let store = FileShardStore::new(dir.path());
        store.save_chapter(1, 1, &chapter_verses(1, 2)).unwrap();
        store.save_chapter(2, 1, &chapter_verses(1, 2)).unwrap();

        store.clear(1).unwrap();
        store.clear(1).unwrap();

        assert!(store.load_chapters(1, &[1]).unwrap().is_empty());
        assert_eq!(store.load_chapters(2, &[1]).unwrap().len(), 2);
    }

    #[test]
    fn test_memory_shards() {
        let store = MemoryShardStore::new();
        store.save_chapter(5, 1, &chapter_verses(1, 7)).unwrap();
        store.save_chapter(5, 114, &chapter_verses(114, 6)).unwrap();
        assert_eq!(store.chapter_count(5), 2);
        assert_eq!(store.load_chapters(5, &[1, 114]).unwrap().len(), 13);

        store.clear(5).unwrap();
        assert_eq!(store.chapter_count(5), 0);
    }
}
