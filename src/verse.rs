//! Verse reference validation
//!
//! The fixed 114-chapter structure is the single source of truth for both
//! the crawl (before building a fetch URL) and the import (before accepting
//! a record). Nothing else in the crate keeps its own verse-count table.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of chapters in the text
pub const CHAPTER_COUNT: u16 = 114;

/// Total number of verses across all chapters
pub const TOTAL_VERSES: u32 = 6236;

/// Chapter name and verse count, indexed by `chapter - 1`
pub const CHAPTERS: [(&str, u16); 114] = [
    ("Al-Fatihah", 7),
    ("Al-Baqarah", 286),
    ("Ali 'Imran", 200),
    ("An-Nisa", 176),
    ("Al-Ma'idah", 120),
    ("Al-An'am", 165),
    ("Al-A'raf", 206),
    ("Al-Anfal", 75),
    ("At-Tawbah", 129),
    ("Yunus", 109),
    ("Hud", 123),
    ("Yusuf", 111),
    ("Ar-Ra'd", 43),
    ("Ibrahim", 52),
    ("Al-Hijr", 99),
    ("An-Nahl", 128),
    ("Al-Isra", 111),
    ("Al-Kahf", 110),
    ("Maryam", 98),
    ("Taha", 135),
    ("Al-Anbya", 112),
    ("Al-Hajj", 78),
    ("Al-Mu'minun", 118),
    ("An-Nur", 64),
    ("Al-Furqan", 77),
    ("Ash-Shu'ara", 227),
    ("An-Naml", 93),
    ("Al-Qasas", 88),
    ("Al-'Ankabut", 69),
    ("Ar-Rum", 60),
    ("Luqman", 34),
    ("As-Sajdah", 30),
    ("Al-Ahzab", 73),
    ("Saba", 54),
    ("Fatir", 45),
    ("Ya-Sin", 83),
    ("As-Saffat", 182),
    ("Sad", 88),
    ("Az-Zumar", 75),
    ("Ghafir", 85),
    ("Fussilat", 54),
    ("Ash-Shuraa", 53),
    ("Az-Zukhruf", 89),
    ("Ad-Dukhan", 59),
    ("Al-Jathiyah", 37),
    ("Al-Ahqaf", 35),
    ("Muhammad", 38),
    ("Al-Fath", 29),
    ("Al-Hujurat", 18),
    ("Qaf", 45),
    ("Adh-Dhariyat", 60),
    ("At-Tur", 49),
    ("An-Najm", 62),
    ("Al-Qamar", 55),
    ("Ar-Rahman", 78),
    ("Al-Waqi'ah", 96),
    ("Al-Hadid", 29),
    ("Al-Mujadila", 22),
    ("Al-Hashr", 24),
    ("Al-Mumtahanah", 13),
    ("As-Saf", 14),
    ("Al-Jumu'ah", 11),
    ("Al-Munafiqun", 11),
    ("At-Taghabun", 18),
    ("At-Talaq", 12),
    ("At-Tahrim", 12),
    ("Al-Mulk", 30),
    ("Al-Qalam", 52),
    ("Al-Haqqah", 52),
    ("Al-Ma'arij", 44),
    ("Nuh", 28),
    ("Al-Jinn", 28),
    ("Al-Muzzammil", 20),
    ("Al-Muddaththir", 56),
    ("Al-Qiyamah", 40),
    ("Al-Insan", 31),
    ("Al-Mursalat", 50),
    ("An-Naba", 40),
    ("An-Nazi'at", 46),
    ("'Abasa", 42),
    ("At-Takwir", 29),
    ("Al-Infitar", 19),
    ("Al-Mutaffifin", 36),
    ("Al-Inshiqaq", 25),
    ("Al-Buruj", 22),
    ("At-Tariq", 17),
    ("Al-A'la", 19),
    ("Al-Ghashiyah", 26),
    ("Al-Fajr", 30),
    ("Al-Balad", 20),
    ("Ash-Shams", 15),
    ("Al-Layl", 21),
    ("Ad-Duhaa", 11),
    ("Ash-Sharh", 8),
    ("At-Tin", 8),
    ("Al-'Alaq", 19),
    ("Al-Qadr", 5),
    ("Al-Bayyinah", 8),
    ("Az-Zalzalah", 8),
    ("Al-'Adiyat", 11),
    ("Al-Qari'ah", 11),
    ("At-Takathur", 8),
    ("Al-'Asr", 3),
    ("Al-Humazah", 9),
    ("Al-Fil", 5),
    ("Quraysh", 4),
    ("Al-Ma'un", 7),
    ("Al-Kawthar", 3),
    ("Al-Kafirun", 6),
    ("An-Nasr", 3),
    ("Al-Masad", 5),
    ("Al-Ikhlas", 4),
    ("Al-Falaq", 5),
    ("An-Nas", 6),
];

/// Errors produced when a `(chapter, verse)` pair or verse key is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReference {
    #[error("chapter {0} is outside 1..=114")]
    Chapter(i64),

    #[error("verse {verse} is outside chapter {chapter}'s range")]
    Verse { chapter: i64, verse: i64 },

    #[error("malformed verse key '{0}'")]
    MalformedKey(String),
}

/// Returns the number of verses in `chapter`, or `None` if the chapter does not exist
pub fn verse_count(chapter: i64) -> Option<u16> {
    if (1..=CHAPTER_COUNT as i64).contains(&chapter) {
        Some(CHAPTERS[(chapter - 1) as usize].1)
    } else {
        None
    }
}

/// Returns the transliterated name of `chapter`
pub fn chapter_name(chapter: i64) -> Option<&'static str> {
    if (1..=CHAPTER_COUNT as i64).contains(&chapter) {
        Some(CHAPTERS[(chapter - 1) as usize].0)
    } else {
        None
    }
}

/// Checks a `(chapter, verse)` pair against the fixed chapter table
///
/// Total over all integers: anything outside the table is `false`, never clamped.
///
/// # Example
///
/// ```
/// use tafsir_ripple::verse::is_valid;
///
/// assert!(is_valid(1, 7));
/// assert!(!is_valid(1, 8));
/// assert!(!is_valid(115, 1));
/// ```
pub fn is_valid(chapter: i64, verse: i64) -> bool {
    match verse_count(chapter) {
        Some(count) => verse >= 1 && verse <= count as i64,
        None => false,
    }
}

/// A validated `(chapter, verse)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerseReference {
    chapter: u16,
    verse: u16,
}

impl VerseReference {
    /// Builds a reference, rejecting anything outside the chapter table
    pub fn new(chapter: i64, verse: i64) -> Result<Self, InvalidReference> {
        let count = verse_count(chapter).ok_or(InvalidReference::Chapter(chapter))?;
        if verse < 1 || verse > count as i64 {
            return Err(InvalidReference::Verse { chapter, verse });
        }
        Ok(Self {
            chapter: chapter as u16,
            verse: verse as u16,
        })
    }

    /// Parses a canonical `"<chapter>:<verse>"` key
    ///
    /// Both parts must be plain decimal digits without leading zeros, so a
    /// reference has exactly one key.
    pub fn parse_key(key: &str) -> Result<Self, InvalidReference> {
        let malformed = || InvalidReference::MalformedKey(key.to_string());
        let (chapter, verse) = key.split_once(':').ok_or_else(malformed)?;
        let chapter = parse_key_part(chapter).ok_or_else(malformed)?;
        let verse = parse_key_part(verse).ok_or_else(malformed)?;
        Self::new(chapter, verse)
    }

    pub fn chapter(&self) -> u16 {
        self.chapter
    }

    pub fn verse(&self) -> u16 {
        self.verse
    }

    /// Returns the `"<chapter>:<verse>"` key used in documents and the store
    pub fn key(&self) -> String {
        format!("{}:{}", self.chapter, self.verse)
    }
}

impl fmt::Display for VerseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

impl FromStr for VerseReference {
    type Err = InvalidReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_key(s)
    }
}

fn parse_key_part(part: &str) -> Option<i64> {
    let canonical = !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'));
    if !canonical {
        return None;
    }
    part.parse().ok()
}

/// Iterates every valid reference in `chapter`
pub fn verses_in(chapter: u16) -> impl Iterator<Item = VerseReference> {
    let count = verse_count(chapter as i64).unwrap_or(0);
    (1..=count).map(move |verse| VerseReference { chapter, verse })
}
