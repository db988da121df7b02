//! Configuration module for Tafsir-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and merging command-line overrides on top of them.
//!
//! # Example
//!
//! ```no_run
//! use tafsir_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tafsir.toml")).unwrap();
//! println!("Crawler will use {} concurrent fetches", config.crawler.max_concurrent);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, EditionEntry, ImportConfig, OutputConfig, ValidationConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_or_default, load_config_with_hash};
pub use validation::{validate, MAX_DELAY_SECS};

use std::time::Duration;

impl CrawlerConfig {
    /// Inter-request delay as a `Duration`, clamped to `0..=MAX_DELAY_SECS`
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs.max(0.0).min(MAX_DELAY_SECS))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Merges crawl flags over the loaded values and re-validates
    ///
    /// Moving the output directory also moves the shard directory when it
    /// was left at its default location.
    pub fn apply_crawl_overrides(
        &mut self,
        output_dir: Option<&str>,
        max_concurrent: Option<u32>,
        delay_secs: Option<f64>,
        base_url: Option<&str>,
    ) -> Result<(), crate::ConfigError> {
        if let Some(dir) = output_dir {
            if self.output.shard_dir == OutputConfig::default().shard_dir {
                self.output.shard_dir = std::path::Path::new(dir)
                    .join(".shards")
                    .display()
                    .to_string();
            }
            self.output.output_dir = dir.to_string();
        }
        if let Some(max) = max_concurrent {
            self.crawler.max_concurrent = max;
        }
        if let Some(delay) = delay_secs {
            self.crawler.delay_secs = delay;
        }
        if let Some(url) = base_url {
            self.crawler.base_url = url.to_string();
        }

        validate(self)
    }

    /// Merges import flags over the loaded values and re-validates
    pub fn apply_import_overrides(
        &mut self,
        database: Option<&str>,
        batch_size: Option<usize>,
        no_cleanup: bool,
    ) -> Result<(), crate::ConfigError> {
        if let Some(path) = database {
            self.import.database_path = path.to_string();
        }
        if let Some(size) = batch_size {
            self.import.batch_size = size;
        }
        if no_cleanup {
            self.import.cleanup = false;
        }

        validate(self)
    }

    pub fn apply_database_override(&mut self, database: Option<&str>) {
        if let Some(path) = database {
            self.import.database_path = path.to_string();
        }
    }
}
