//! Crawler coordinator - multi-edition crawl orchestration
//!
//! This module drives a whole crawl run:
//! - Discovering editions (from configuration or the origin's index page)
//! - Filtering them by id and language
//! - Skipping editions a previous run completed
//! - Crawling, assembling and writing one document per edition
//! - Marking editions complete and dropping their shards

use crate::config::{Config, EditionEntry};
use crate::crawler::fetcher::{FetchError, FetchStatsSnapshot, HttpTransport, RateLimitedFetcher, ReqwestTransport};
use crate::crawler::parser::{parse_edition_links, SelectorExtractor};
use crate::crawler::scheduler::EditionCrawler;
use crate::document::{build_document, write_document, EditionMetadata};
use crate::language::{LanguageDetector, LanguageTag, ScriptDetector};
use crate::state::{CrawlProgress, FileShardStore, JsonFileStore, ProgressStore, ShardStore};
use crate::verse::CHAPTER_COUNT;
use crate::HarvestError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// An edition to crawl
#[derive(Debug, Clone, PartialEq)]
pub struct EditionSource {
    pub id: i64,
    pub name: String,
    pub author: String,
    pub language: LanguageTag,
    /// Edition root; verse pages live below it
    pub url: String,
}

impl EditionSource {
    pub fn metadata(&self) -> EditionMetadata {
        EditionMetadata::new(self.id, &self.name, &self.author, self.language.clone())
    }
}

impl From<&EditionEntry> for EditionSource {
    fn from(entry: &EditionEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            author: entry.author.clone(),
            language: LanguageTag::parse(&entry.language),
            url: entry.url.clone(),
        }
    }
}

/// Per-run selection of what to crawl
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Only these edition ids; empty means all
    pub edition_ids: Vec<i64>,
    /// Only these languages; empty means all
    pub languages: Vec<LanguageTag>,
    pub start_chapter: u16,
    pub end_chapter: u16,
    /// Re-crawl editions a previous run completed
    pub force: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            edition_ids: Vec::new(),
            languages: Vec::new(),
            start_chapter: 1,
            end_chapter: CHAPTER_COUNT,
            force: false,
        }
    }
}

impl CrawlOptions {
    fn selects(&self, source: &EditionSource) -> bool {
        (self.edition_ids.is_empty() || self.edition_ids.contains(&source.id))
            && (self.languages.is_empty() || self.languages.contains(&source.language))
    }
}

/// Summary of a crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub editions_found: usize,
    pub editions_completed: usize,
    /// Written from a chapter range short of all 114 chapters
    pub editions_partial: usize,
    pub editions_skipped: usize,
    pub verses_collected: usize,
    pub documents: Vec<PathBuf>,
    pub fetch: FetchStatsSnapshot,
    pub elapsed: Duration,
    pub interrupted: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: RateLimitedFetcher,
    crawler: EditionCrawler,
    detector: Box<dyn LanguageDetector>,
    progress: Arc<dyn ProgressStore<CrawlProgress>>,
    shards: Arc<dyn ShardStore>,
    token: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator with the HTTP transport and file-backed stores
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `token` - Cancels the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to build the client or the extractor
    pub fn new(config: Config, token: CancellationToken) -> Result<Self, HarvestError> {
        let transport = Arc::new(ReqwestTransport::from_config(&config.crawler)?);
        let progress = Arc::new(JsonFileStore::<CrawlProgress>::new(&config.output.crawl_progress_path));
        let shards = Arc::new(FileShardStore::new(&config.output.shard_dir));
        Self::from_parts(config, transport, progress, shards, token)
    }

    /// Creates a coordinator over explicit collaborators
    pub fn from_parts(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        progress: Arc<dyn ProgressStore<CrawlProgress>>,
        shards: Arc<dyn ShardStore>,
        token: CancellationToken,
    ) -> Result<Self, HarvestError> {
        let fetcher = RateLimitedFetcher::from_config(transport, &config.crawler, token.clone());
        let extractor = SelectorExtractor::new(&config.crawler.verse_selector)?;
        let crawler = EditionCrawler::new(fetcher.clone(), Arc::new(extractor));

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            crawler,
            detector: Box::new(ScriptDetector),
            progress,
            shards,
            token,
        })
    }

    /// Replaces the language detector used during discovery
    pub fn with_detector(mut self, detector: Box<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Lists the editions available for crawling
    ///
    /// Configured `[[edition]]` entries win; otherwise the origin's index
    /// page is fetched and parsed. An unreachable origin is an error.
    pub async fn discover(&self) -> Result<Vec<EditionSource>, HarvestError> {
        if !self.config.editions.is_empty() {
            tracing::info!("Using {} configured editions", self.config.editions.len());
            return Ok(self.config.editions.iter().map(EditionSource::from).collect());
        }

        let base_url = &self.config.crawler.base_url;
        let base = Url::parse(base_url).map_err(|e| HarvestError::Discovery {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!("Discovering editions from {}", base_url);
        let html = match self.fetcher.fetch(base.as_str()).await {
            Ok(html) => html,
            Err(FetchError::Cancelled) => return Err(HarvestError::Cancelled),
            Err(e) => {
                return Err(HarvestError::Discovery {
                    url: base_url.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let sources = parse_edition_links(&html, &base, self.detector.as_ref());
        tracing::info!("Found {} editions", sources.len());
        Ok(sources)
    }

    /// Runs the crawl
    ///
    /// Per-verse failures only reduce coverage. Discovery and checkpoint
    /// failures abort the run; cancellation ends it early with
    /// `interrupted` set.
    pub async fn run(&self, options: &CrawlOptions) -> Result<CrawlReport, HarvestError> {
        let start = Instant::now();
        let mut report = CrawlReport::default();

        let editions: Vec<EditionSource> = self
            .discover()
            .await?
            .into_iter()
            .filter(|source| options.selects(source))
            .collect();
        report.editions_found = editions.len();

        if editions.is_empty() {
            tracing::warn!("No editions match the requested ids and languages");
        }

        let output_dir = PathBuf::from(&self.config.output.output_dir);
        let chapters = options.start_chapter..=options.end_chapter;

        for (index, source) in editions.iter().enumerate() {
            if self.token.is_cancelled() {
                report.interrupted = true;
                break;
            }

            if !options.force && self.progress.load()?.is_edition_completed(source.id) {
                tracing::info!("Skipping completed edition {} ({})", source.id, source.name);
                report.editions_skipped += 1;
                continue;
            }

            tracing::info!(
                "Crawling edition {}/{}: {} ({}, {})",
                index + 1,
                editions.len(),
                source.name,
                source.id,
                source.language
            );

            let crawl = match self
                .crawler
                .crawl_edition(
                    source,
                    chapters.clone(),
                    self.progress.as_ref(),
                    self.shards.as_ref(),
                    &self.token,
                )
                .await
            {
                Ok(crawl) => crawl,
                Err(HarvestError::Cancelled) => {
                    report.interrupted = true;
                    break;
                }
                Err(e) => return Err(e),
            };

            let document = build_document(source.metadata(), crawl.verses);
            let path = write_document(&output_dir, &document)?;
            report.verses_collected += document.verses.len();
            report.documents.push(path);

            if crawl.is_complete {
                let mut snapshot = self.progress.load()?;
                snapshot.complete_edition(source.id);
                self.progress.save(&snapshot)?;
                self.shards.clear(source.id)?;
                report.editions_completed += 1;
            } else {
                report.editions_partial += 1;
            }

            tracing::info!(
                "Edition {} done: {} verses ({} chapters fetched, {} resumed)",
                source.id,
                document.verses.len(),
                crawl.chapters_crawled,
                crawl.chapters_resumed
            );
        }

        report.fetch = self.fetcher.stats();
        report.elapsed = start.elapsed();

        tracing::info!(
            "Fetch totals: {} requests, {} retries, {} not found, {} unavailable",
            report.fetch.requests,
            report.fetch.retries,
            report.fetch.not_found,
            report.fetch.unavailable
        );

        Ok(report)
    }
}

/// Runs a complete crawl with the default collaborators
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `options` - Edition and chapter selection
/// * `token` - Cancels the run
pub async fn run_crawl(
    config: Config,
    options: &CrawlOptions,
    token: CancellationToken,
) -> Result<CrawlReport, HarvestError> {
    let coordinator = Coordinator::new(config, token)?;
    coordinator.run(options).await
}
