//! Crawler module for acquiring commentary editions
//!
//! This module contains the crawl side of the pipeline, including:
//! - HTTP fetching under a global concurrency cap with retry and backoff
//! - Verse page extraction and edition discovery
//! - Chapter-at-a-time scheduling with checkpoints
//! - Overall crawl coordination across editions

mod coordinator;
mod fetcher;
mod parser;
mod retry;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlOptions, CrawlReport, EditionSource};
pub use fetcher::{
    build_http_client, FetchError, FetchStatsSnapshot, HttpTransport, RateLimitedFetcher,
    RawResponse, ReqwestTransport, TransportError,
};
pub use parser::{clean_text, parse_edition_links, SelectorExtractor, VerseExtractor};
pub use retry::RetryPolicy;
pub use scheduler::{verse_url, EditionCrawl, EditionCrawler};
