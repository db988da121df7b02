use crate::config::types::{Config, CrawlerConfig, EditionEntry, ImportConfig, OutputConfig};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Longest accepted inter-request delay (seconds)
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_import_config(&config.import)?;
    validate_editions(&config.editions)?;

    if config.validation.min_text_length < 1 {
        return Err(ConfigError::Validation(
            "min_text_length must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > 20 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and 20, got {}",
            config.max_concurrent
        )));
    }

    if !config.delay_secs.is_finite()
        || config.delay_secs < 0.1
        || config.delay_secs > MAX_DELAY_SECS
    {
        return Err(ConfigError::Validation(format!(
            "delay_secs must be between 0.1 and {}, got {}",
            MAX_DELAY_SECS, config.delay_secs
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs < 5 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 5, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    validate_http_url(&config.base_url, "base_url")?;

    Selector::parse(&config.verse_selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{}: {:?}", config.verse_selector, e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.crawl_progress_path.is_empty() {
        return Err(ConfigError::Validation(
            "crawl_progress_path cannot be empty".to_string(),
        ));
    }

    if config.shard_dir.is_empty() {
        return Err(ConfigError::Validation(
            "shard_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates import configuration
fn validate_import_config(config: &ImportConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.batch_size < 1 || config.batch_size > 10_000 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 10000, got {}",
            config.batch_size
        )));
    }

    if config.progress_path.is_empty() {
        return Err(ConfigError::Validation(
            "progress_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates statically configured editions
fn validate_editions(editions: &[EditionEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in editions {
        if entry.id < 1 {
            return Err(ConfigError::Validation(format!(
                "Edition id must be positive, got {}",
                entry.id
            )));
        }

        if !seen.insert(entry.id) {
            return Err(ConfigError::Validation(format!(
                "Edition id {} is configured more than once",
                entry.id
            )));
        }

        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Edition {} must have a name",
                entry.id
            )));
        }

        validate_http_url(&entry.url, &format!("url of edition {}", entry.id))?;
    }

    Ok(())
}

fn validate_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
