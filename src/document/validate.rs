//! Import-side validation of edition documents
//!
//! Structural failures reject the whole document. Semantic failures are
//! per verse entry and only show up in `ImportDocument::rejected`.

use crate::document::{EditionMetadata, VerseRecord};
use crate::verse::VerseReference;
use serde_json::Value;
use thiserror::Error;

/// Structural problems that reject a document wholesale
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("document root is not a JSON object")]
    NotAnObject,

    #[error("missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("'{0}' must be an object")]
    NotAnObjectField(&'static str),

    #[error("meta.{field} must be {expected}")]
    InvalidMetaField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("invalid metadata: {0}")]
    Metadata(String),
}

/// A structurally valid document, decoded into domain records
#[derive(Debug, Clone)]
pub struct ImportDocument {
    pub meta: EditionMetadata,
    pub records: Vec<VerseRecord>,
    /// Verse entries dropped for a bad key or an undecodable body
    pub rejected: usize,
    /// Number of entries under `vs`, accepted or not
    pub total_entries: usize,
}

/// Checks the keys and types every document must carry
pub fn validate_structure(value: &Value) -> Result<(), ValidationError> {
    let root = value.as_object().ok_or(ValidationError::NotAnObject)?;

    for key in ["meta", "chs", "vs"] {
        if !root.contains_key(key) {
            return Err(ValidationError::MissingKey(key));
        }
    }

    let meta = root["meta"]
        .as_object()
        .ok_or(ValidationError::NotAnObjectField("meta"))?;
    if !root["vs"].is_object() {
        return Err(ValidationError::NotAnObjectField("vs"));
    }

    let checks: [(&'static str, &'static str, fn(&Value) -> bool); 3] = [
        ("tid", "an integer", |v| v.is_i64()),
        ("tn", "a string", |v| v.is_string()),
        ("lang", "a string", |v| v.is_string()),
    ];
    for (field, expected, check) in checks {
        match meta.get(field) {
            Some(v) if check(v) => {}
            _ => return Err(ValidationError::InvalidMetaField { field, expected }),
        }
    }

    Ok(())
}

/// Validates `value` and decodes its verse entries
///
/// Entries whose key is not a canonical valid reference, whose body is
/// not an object, or whose `c`/`n` (when present) disagree with the key
/// are counted in `rejected`. `v` and `tf.id` are not required. Text is
/// not checked here; the loader applies the length rule.
pub fn parse_document(value: &Value) -> Result<ImportDocument, ValidationError> {
    validate_structure(value)?;

    let meta: EditionMetadata = serde_json::from_value(value["meta"].clone())
        .map_err(|e| ValidationError::Metadata(e.to_string()))?;

    let mut records = Vec::new();
    let mut rejected = 0;
    let entries = value["vs"].as_object().map(|m| m.len()).unwrap_or(0);

    if let Some(verses) = value["vs"].as_object() {
        for (key, raw) in verses {
            match decode_entry(key, raw, meta.id) {
                Some(record) => records.push(record),
                None => rejected += 1,
            }
        }
    }

    Ok(ImportDocument {
        meta,
        records,
        rejected,
        total_entries: entries,
    })
}

fn decode_entry(key: &str, raw: &Value, edition_id: i64) -> Option<VerseRecord> {
    let reference = match VerseReference::parse_key(key) {
        Ok(reference) => reference,
        Err(e) => {
            tracing::debug!("Rejecting verse entry: {}", e);
            return None;
        }
    };

    let Some(body) = raw.as_object() else {
        tracing::debug!("Rejecting verse entry {}: body is not an object", key);
        return None;
    };

    // The key is authoritative; `c` and `n` only have to agree when given
    for (field, expected) in [("c", reference.chapter()), ("n", reference.verse())] {
        if let Some(value) = body.get(field) {
            if value.as_u64() != Some(expected as u64) {
                tracing::debug!("Rejecting verse entry {}: {} is {}", key, field, value);
                return None;
            }
        }
    }

    // A missing text decodes as blank and is left to the loader's length rule.
    // Records belong to the document's edition regardless of tf.id
    let text = body
        .get("tf")
        .and_then(|tf| tf.get("t"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    Some(VerseRecord::new(reference, edition_id, text))
}
