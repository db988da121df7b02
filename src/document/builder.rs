//! Edition document assembly and output
//!
//! Assembly is pure; `write_document` is the only function here that
//! touches the filesystem.

use crate::document::{ChapterEntry, EditionDocument, EditionMetadata, VerseEntry};
use crate::state::write_atomically;
use crate::verse::{CHAPTERS, CHAPTER_COUNT};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// The fixed chapter table, all 114 entries keyed by chapter number
pub fn chapter_table() -> BTreeMap<String, ChapterEntry> {
    (1..=CHAPTER_COUNT)
        .map(|id| {
            let (name, verse_count) = CHAPTERS[(id - 1) as usize];
            (
                id.to_string(),
                ChapterEntry {
                    id,
                    name: name.to_string(),
                    verse_count,
                },
            )
        })
        .collect()
}

/// Assembles one edition document from metadata and collected verses
///
/// Coverage is recomputed: `verses` from the map and `size_mb` from the
/// compact serialized size of the assembled document.
pub fn build_document(meta: EditionMetadata, verses: BTreeMap<String, VerseEntry>) -> EditionDocument {
    let mut document = EditionDocument {
        meta,
        chapters: chapter_table(),
        verses,
    };

    document.meta.coverage.verses = document.verses.len();
    document.meta.coverage.size_mb = 0.0;

    let size_mb = match serde_json::to_vec(&document) {
        Ok(bytes) => bytes.len() as f64 / BYTES_PER_MB,
        Err(e) => {
            tracing::warn!("Could not measure document {}: {}", document.meta.id, e);
            0.0
        }
    };
    document.meta.coverage.size_mb = (size_mb * 100.0).round() / 100.0;

    document
}

/// File name for an edition: `tafsir_<lang>_<id>_<name>.json`
///
/// Spaces in the name become underscores; anything other than
/// alphanumerics, `_`, `-` and `.` is dropped.
pub fn document_filename(meta: &EditionMetadata) -> String {
    let raw = format!(
        "tafsir_{}_{}_{}.json",
        meta.language,
        meta.id,
        meta.name.replace(' ', "_")
    );

    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

/// Writes `document` as compact JSON into `dir`, returning the file path
pub fn write_document(dir: &Path, document: &EditionDocument) -> std::io::Result<PathBuf> {
    let path = dir.join(document_filename(&document.meta));
    let bytes = serde_json::to_vec(document)?;
    write_atomically(&path, &bytes)?;
    tracing::info!("Saved edition {} to {}", document.meta.id, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::VerseRecord;
    use crate::language::LanguageTag;
    use crate::verse::VerseReference;
    use tempfile::TempDir;

    fn verses(keys: &[(i64, i64)]) -> BTreeMap<String, VerseEntry> {
        keys.iter()
            .map(|&(c, v)| {
                let record =
                    VerseRecord::new(VerseReference::new(c, v).unwrap(), 5001, format!("text {}:{}", c, v));
                (record.reference.key(), record.to_entry())
            })
            .collect()
    }

    #[test]
    fn test_chapter_table_is_complete() {
        let table = chapter_table();
        assert_eq!(table.len(), 114);
        assert_eq!(table["1"].verse_count, 7);
        assert_eq!(table["114"].name, "An-Nas");
    }

    #[test]
    fn test_build_document_always_has_all_chapters() {
        let meta = EditionMetadata::new(5001, "Partial", "Unknown", LanguageTag::English);
        let document = build_document(meta, verses(&[(1, 1), (1, 2)]));

        assert_eq!(document.chapters.len(), 114);
        assert_eq!(document.verses.len(), 2);
        assert_eq!(document.meta.coverage.verses, 2);
    }

    #[test]
    fn test_build_document_measures_size() {
        let meta = EditionMetadata::new(5001, "Large", "Unknown", LanguageTag::English);
        let mut large = verses(&[(2, 1)]);
        if let Some(entry) = large.get_mut("2:1") {
            entry.commentary.text = "x".repeat(3 * 1024 * 1024);
        }

        let document = build_document(meta, large);
        assert!(document.meta.coverage.size_mb >= 3.0);
        assert!(document.meta.coverage.size_mb < 3.1);
    }

    #[test]
    fn test_document_filename() {
        let meta = EditionMetadata::new(5003, "Tafsir Ibn Kathir (Abridged)", "", LanguageTag::English);
        assert_eq!(
            document_filename(&meta),
            "tafsir_english_5003_Tafsir_Ibn_Kathir_Abridged.json"
        );

        let meta = EditionMetadata::new(7, "تفسير الطبري", "", LanguageTag::Arabic);
        assert_eq!(document_filename(&meta), "tafsir_arabic_7_تفسير_الطبري.json");
    }

    #[test]
    fn test_write_document_round_trips() {
        let dir = TempDir::new().unwrap();
        let meta = EditionMetadata::new(5001, "Written", "Unknown", LanguageTag::Urdu);
        let document = build_document(meta, verses(&[(114, 6)]));

        let path = write_document(dir.path(), &document).unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("tafsir_urdu_5001_Written.json")
        );

        let parsed: EditionDocument =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed, document);
    }
}
