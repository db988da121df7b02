//! Tafsir-Ripple: a resumable tafsir acquisition and load pipeline
//!
//! This crate crawls verse-keyed commentary (tafsir) editions from a remote
//! source under a global concurrency cap and polite per-request delay,
//! checkpoints progress after every chapter, writes one interchange document
//! per edition, and loads those documents into SQLite with deduplicating,
//! batched, replace-on-conflict upserts and a durable import log.

pub mod config;
pub mod crawler;
pub mod document;
pub mod importer;
pub mod language;
pub mod output;
pub mod state;
pub mod storage;
pub mod verse;

use thiserror::Error;

/// Main error type for Tafsir-Ripple operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Could not discover editions from {url}: {reason}")]
    Discovery { url: String, reason: String },

    #[error("No tafsir documents found in {path}")]
    NoDocuments { path: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Progress checkpoint error: {0}")]
    Progress(#[from] state::ProgressError),

    #[error("Invalid verse reference: {0}")]
    Reference(#[from] verse::InvalidReference),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Tafsir-Ripple operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use document::EditionDocument;
pub use language::LanguageTag;
pub use verse::{is_valid, VerseReference};
