use serde::Deserialize;

/// Main configuration structure for Tafsir-Ripple
///
/// Every section and field has a default, so an absent configuration file
/// is equivalent to an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Editions to crawl without running discovery against the origin
    #[serde(default, rename = "edition")]
    pub editions: Vec<EditionEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Origin the editions are discovered on
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: u32,

    /// Delay paid before every request attempt (seconds)
    #[serde(rename = "delay-secs")]
    pub delay_secs: f64,

    /// Attempts per URL before it is treated as unavailable
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// CSS selector holding the commentary text on a verse page
    #[serde(rename = "verse-selector")]
    pub verse_selector: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.altafsir.com".to_string(),
            max_concurrent: 5,
            delay_secs: 1.0,
            max_retries: 3,
            timeout_secs: 30,
            user_agent: format!("TafsirRipple/{}", env!("CARGO_PKG_VERSION")),
            verse_selector: "div.tafsir-text".to_string(),
        }
    }
}

/// Crawl output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory edition documents are written to
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Crawl progress checkpoint file
    #[serde(rename = "crawl-progress-path")]
    pub crawl_progress_path: String,

    /// Directory holding per-chapter shards of the edition in progress
    #[serde(rename = "shard-dir")]
    pub shard_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "./scraped_tafasir".to_string(),
            crawl_progress_path: "altafsir_progress.json".to_string(),
            shard_dir: "./scraped_tafasir/.shards".to_string(),
        }
    }
}

/// Import configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Verse rows written per transaction
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Import progress ledger file
    #[serde(rename = "progress-path")]
    pub progress_path: String,

    /// Delete the ledger after a run with zero errors
    pub cleanup: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_path: "quran_tafsir.db".to_string(),
            batch_size: 1000,
            progress_path: "import_progress.json".to_string(),
            cleanup: true,
        }
    }
}

/// Record-level validation applied on import
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum commentary length (characters, after trimming)
    #[serde(rename = "min-text-length")]
    pub min_text_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { min_text_length: 1 }
    }
}

/// A statically configured edition
#[derive(Debug, Clone, Deserialize)]
pub struct EditionEntry {
    pub id: i64,
    pub name: String,
    #[serde(default = "unknown_author")]
    pub author: String,
    pub language: String,
    /// Edition root; verse pages live under `<url>/chapter/<c>/verse/<v>`
    pub url: String,
}

fn unknown_author() -> String {
    "Unknown".to_string()
}
