//! Language tags and the default script-based detector
//!
//! Language values arrive as loose strings from the remote source and from
//! interchange documents; they are mapped onto `LanguageTag` at the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Explicit mapping from short codes to canonical names
const LANGUAGE_MAPPINGS: [(&str, &str); 10] = [
    ("ar", "arabic"),
    ("en", "english"),
    ("ur", "urdu"),
    ("id", "indonesian"),
    ("tr", "turkish"),
    ("fa", "persian"),
    ("ru", "russian"),
    ("fr", "french"),
    ("bn", "bengali"),
    ("ku", "kurdish"),
];

/// Language of an edition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LanguageTag {
    Arabic,
    English,
    Urdu,
    Indonesian,
    Turkish,
    Persian,
    Russian,
    French,
    Bengali,
    Kurdish,
    /// A tag outside the mapping table, kept verbatim (lower-cased)
    Other(String),
    Unknown,
}

impl LanguageTag {
    /// Maps a short code or full name onto a tag
    pub fn parse(input: &str) -> Self {
        let lower = input.trim().to_lowercase();
        let name = LANGUAGE_MAPPINGS
            .iter()
            .find(|(code, name)| *code == lower || *name == lower)
            .map(|(_, name)| *name);

        match name {
            Some("arabic") => Self::Arabic,
            Some("english") => Self::English,
            Some("urdu") => Self::Urdu,
            Some("indonesian") => Self::Indonesian,
            Some("turkish") => Self::Turkish,
            Some("persian") => Self::Persian,
            Some("russian") => Self::Russian,
            Some("french") => Self::French,
            Some("bengali") => Self::Bengali,
            Some("kurdish") => Self::Kurdish,
            _ if lower.is_empty() || lower == "unknown" => Self::Unknown,
            _ => Self::Other(lower),
        }
    }

    /// Canonical lower-case name, as written to documents and the store
    pub fn as_str(&self) -> &str {
        match self {
            Self::Arabic => "arabic",
            Self::English => "english",
            Self::Urdu => "urdu",
            Self::Indonesian => "indonesian",
            Self::Turkish => "turkish",
            Self::Persian => "persian",
            Self::Russian => "russian",
            Self::French => "french",
            Self::Bengali => "bengali",
            Self::Kurdish => "kurdish",
            Self::Other(name) => name,
            Self::Unknown => "unknown",
        }
    }

    /// Whether text in this language is written in Arabic script
    pub fn is_arabic_script(&self) -> bool {
        matches!(
            self,
            Self::Arabic | Self::Urdu | Self::Persian | Self::Kurdish
        )
    }
}

impl From<String> for LanguageTag {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<LanguageTag> for String {
    fn from(value: LanguageTag) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pluggable language detection
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> LanguageTag;
}

/// Character-block heuristic over the first 500 characters
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptDetector;

impl LanguageDetector for ScriptDetector {
    fn detect(&self, text: &str) -> LanguageTag {
        let sample: String = text.trim().chars().take(500).collect();
        if sample.is_empty() {
            return LanguageTag::Unknown;
        }

        let in_block = |lo: u32, hi: u32| sample.chars().any(|c| (lo..=hi).contains(&(c as u32)));

        // Arabic and Arabic Supplement; Urdu shares the block
        if in_block(0x0600, 0x06FF) || in_block(0x0750, 0x077F) {
            return LanguageTag::Arabic;
        }

        if sample.chars().all(|c| {
            c.is_ascii_alphabetic()
                || c.is_whitespace()
                || matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | '(' | ')' | '-')
        }) {
            return LanguageTag::English;
        }

        if in_block(0x0980, 0x09FF) {
            return LanguageTag::Bengali;
        }

        if in_block(0x0400, 0x04FF) {
            return LanguageTag::Russian;
        }

        LanguageTag::Unknown
    }
}
