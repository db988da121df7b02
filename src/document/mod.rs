//! Edition interchange documents
//!
//! An `EditionDocument` is the only artifact passed from the crawl to the
//! import stage. The serde field names below are the on-disk contract:
//!
//! ```text
//! {"meta": {"tid", "tn", "au", "lang", "arabic", "date", "coverage": {"verses", "size_mb"}},
//!  "chs":  {"<chapter>": {"id", "n", "vc"}, ... all 114},
//!  "vs":   {"<chapter>:<verse>": {"v", "c", "n", "tf": {"t", "id"}}, ...}}
//! ```

mod builder;
mod validate;

pub use builder::{build_document, chapter_table, document_filename, write_document};
pub use validate::{parse_document, validate_structure, ImportDocument, ValidationError};

use crate::language::LanguageTag;
use crate::verse::VerseReference;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One crawled edition, ready to be written or imported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditionDocument {
    pub meta: EditionMetadata,
    #[serde(rename = "chs")]
    pub chapters: BTreeMap<String, ChapterEntry>,
    #[serde(rename = "vs")]
    pub verses: BTreeMap<String, VerseEntry>,
}

/// Descriptive metadata of an edition
///
/// Only `tid`, `tn` and `lang` are required. The other fields fall back to
/// their defaults when absent, null or of the wrong type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditionMetadata {
    /// Stable external identifier of the edition
    #[serde(rename = "tid")]
    pub id: i64,
    #[serde(rename = "tn")]
    pub name: String,
    #[serde(rename = "au", default = "unknown_author", deserialize_with = "lenient_author")]
    pub author: String,
    #[serde(rename = "lang")]
    pub language: LanguageTag,
    #[serde(rename = "arabic", default, deserialize_with = "lenient")]
    pub is_arabic_script: bool,
    #[serde(rename = "date", default = "today", deserialize_with = "lenient_date")]
    pub created_date: NaiveDate,
    #[serde(default, deserialize_with = "lenient")]
    pub coverage: Coverage,
}

impl EditionMetadata {
    /// Metadata for a fresh crawl, dated today with empty coverage
    pub fn new(id: i64, name: impl Into<String>, author: impl Into<String>, language: LanguageTag) -> Self {
        let is_arabic_script = language.is_arabic_script();
        Self {
            id,
            name: name.into(),
            author: author.into(),
            language,
            is_arabic_script,
            created_date: today(),
            coverage: Coverage::default(),
        }
    }
}

/// How much of the text an edition document covers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    #[serde(default)]
    pub verses: usize,
    #[serde(default)]
    pub size_mb: f64,
}

/// Entry in the fixed chapter table of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterEntry {
    pub id: u16,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "vc")]
    pub verse_count: u16,
}

/// Serialized form of one verse's commentary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseEntry {
    #[serde(rename = "v")]
    pub key: String,
    #[serde(rename = "c")]
    pub chapter: u16,
    #[serde(rename = "n")]
    pub verse: u16,
    #[serde(rename = "tf")]
    pub commentary: Commentary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commentary {
    #[serde(rename = "t", default)]
    pub text: String,
    #[serde(rename = "id")]
    pub edition_id: i64,
}

/// A verse's commentary text, as produced by extraction and consumed by the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseRecord {
    pub reference: VerseReference,
    pub edition_id: i64,
    pub text: String,
}

impl VerseRecord {
    pub fn new(reference: VerseReference, edition_id: i64, text: impl Into<String>) -> Self {
        Self {
            reference,
            edition_id,
            text: text.into(),
        }
    }

    /// Whether the text is empty after trimming
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn to_entry(&self) -> VerseEntry {
        VerseEntry {
            key: self.reference.key(),
            chapter: self.reference.chapter(),
            verse: self.reference.verse(),
            commentary: Commentary {
                text: self.text.clone(),
                edition_id: self.edition_id,
            },
        }
    }
}

fn unknown_author() -> String {
    "Unknown".to_string()
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Decodes `T`, or its default when the value has another shape
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: for<'a> Deserialize<'a> + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_author<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(unknown_author))
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(today))
}
