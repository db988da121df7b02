//! HTML parsers for verse pages and the edition index
//!
//! Both are site-specific defaults behind small seams: the scheduler only
//! sees `VerseExtractor`, and discovery takes any `LanguageDetector`.

use crate::crawler::EditionSource;
use crate::document::VerseRecord;
use crate::language::LanguageDetector;
use crate::verse::VerseReference;
use crate::ConfigError;
use scraper::{Html, Selector};
use url::Url;

/// Editions beyond this many index links are ignored
const MAX_DISCOVERED_EDITIONS: usize = 10;

/// First id assigned to a discovered edition
const DISCOVERED_ID_BASE: i64 = 5000;

/// Turns a fetched verse page into a record
pub trait VerseExtractor: Send + Sync {
    /// Returns `None` when the page holds no commentary
    fn extract(&self, html: &str, reference: VerseReference, edition_id: i64) -> Option<VerseRecord>;
}

/// Extracts the text of the first element matching a CSS selector
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    selector: Selector,
}

impl SelectorExtractor {
    pub fn new(selector: &str) -> Result<Self, ConfigError> {
        let selector = Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("{}: {:?}", selector, e)))?;
        Ok(Self { selector })
    }
}

impl VerseExtractor for SelectorExtractor {
    fn extract(&self, html: &str, reference: VerseReference, edition_id: i64) -> Option<VerseRecord> {
        let document = Html::parse_document(html);
        let element = document.select(&self.selector).next()?;
        let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));

        if text.is_empty() {
            return None;
        }
        Some(VerseRecord::new(reference, edition_id, text))
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses the edition index page into edition sources
///
/// Only anchors whose href contains `/tafsir` or `/tafaseer` count, and
/// only the first ten of those. The n-th anchor gets id `5000 + n`;
/// anchors with no text or an unresolvable href are dropped without
/// shifting the ids of the rest.
///
/// # Arguments
///
/// * `html` - The index page
/// * `base_url` - Base for resolving relative hrefs
/// * `detector` - Guesses the language from the link text
pub fn parse_edition_links(
    html: &str,
    base_url: &Url,
    detector: &dyn LanguageDetector,
) -> Vec<EditionSource> {
    let document = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&anchors)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            (href.contains("/tafsir") || href.contains("/tafaseer")).then_some((element, href))
        })
        .take(MAX_DISCOVERED_EDITIONS)
        .enumerate()
        .filter_map(|(index, (element, href))| {
            let name = clean_text(&element.text().collect::<String>());
            if name.is_empty() {
                return None;
            }
            let url = base_url.join(href).ok()?;

            Some(EditionSource {
                id: DISCOVERED_ID_BASE + index as i64,
                language: detector.detect(&name),
                name,
                author: "Unknown".to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}
