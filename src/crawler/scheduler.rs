//! Per-edition crawl scheduling
//!
//! An edition is crawled one chapter at a time. All verse fetches of a
//! chapter run concurrently under the fetcher's global cap, and the
//! chapter is checkpointed only after every one of them has resolved:
//!
//! 1. shard the chapter's verses
//! 2. append the chapter to `CrawlProgress`
//! 3. persist `CrawlProgress`

use crate::crawler::fetcher::{FetchError, RateLimitedFetcher};
use crate::crawler::parser::VerseExtractor;
use crate::crawler::EditionSource;
use crate::state::{CrawlProgress, ProgressStore, ShardStore, VerseMap};
use crate::verse::{verses_in, InvalidReference, VerseReference, CHAPTER_COUNT};
use crate::HarvestError;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Chapters between progress log lines
const PROGRESS_INTERVAL: usize = 5;

/// Result of crawling one edition
#[derive(Debug, Clone)]
pub struct EditionCrawl {
    /// Every verse collected for the edition so far, resumed chapters included
    pub verses: VerseMap,
    /// Chapters fetched during this call
    pub chapters_crawled: usize,
    /// Chapters skipped because an earlier run had checkpointed them
    pub chapters_resumed: usize,
    /// Whether all 114 chapters are now checkpointed
    pub is_complete: bool,
}

/// Crawls the chapters of a single edition
pub struct EditionCrawler {
    fetcher: RateLimitedFetcher,
    extractor: Arc<dyn VerseExtractor>,
}

impl EditionCrawler {
    pub fn new(fetcher: RateLimitedFetcher, extractor: Arc<dyn VerseExtractor>) -> Self {
        Self { fetcher, extractor }
    }

    /// Crawls `chapters` of `source`, resuming from the last checkpoint
    ///
    /// Chapters already listed for this edition in `progress` are not
    /// refetched; their verses come back from `shards`. Starting a different
    /// edition than the one in progress drops the old edition's shards. If the token fires
    /// mid-chapter, that chapter is discarded and `HarvestError::Cancelled`
    /// is returned with the last checkpoint intact.
    ///
    /// # Arguments
    ///
    /// * `source` - The edition to crawl
    /// * `chapters` - Chapter range, within 1..=114
    /// * `progress` - Crawl checkpoint store
    /// * `shards` - Per-chapter verse store
    /// * `token` - Stops dispatching at the next chapter or attempt
    pub async fn crawl_edition(
        &self,
        source: &EditionSource,
        chapters: RangeInclusive<u16>,
        progress: &dyn ProgressStore<CrawlProgress>,
        shards: &dyn ShardStore,
        token: &CancellationToken,
    ) -> Result<EditionCrawl, HarvestError> {
        validate_range(&chapters)?;

        let mut snapshot = progress.load()?;
        let abandoned = snapshot.current_edition_id.filter(|&id| id != source.id);
        snapshot.begin_edition(source.id);
        progress.save(&snapshot)?;

        // The checkpoint no longer lists the abandoned edition's chapters,
        // so its shards can never be loaded again
        if let Some(previous) = abandoned {
            tracing::info!("Dropping shards of unfinished edition {}", previous);
            shards.clear(previous)?;
        }

        let resumed: Vec<u16> = snapshot.completed_chapters_for(source.id).to_vec();
        if !resumed.is_empty() {
            tracing::info!(
                "Resuming edition {} ({}) with {} chapters already done",
                source.id,
                source.name,
                resumed.len()
            );
        }

        let total = chapters.clone().count();
        let mut chapters_crawled = 0;
        let mut chapters_resumed = 0;

        for (index, chapter) in chapters.enumerate() {
            if resumed.contains(&chapter) {
                chapters_resumed += 1;
                continue;
            }
            if token.is_cancelled() {
                tracing::info!("Crawl of edition {} interrupted before chapter {}", source.id, chapter);
                return Err(HarvestError::Cancelled);
            }

            let verses = self.crawl_chapter(source, chapter, token).await?;
            tracing::debug!("Chapter {} of edition {}: {} verses", chapter, source.id, verses.len());

            shards.save_chapter(source.id, chapter, &verses)?;
            snapshot.complete_chapter(chapter);
            progress.save(&snapshot)?;
            chapters_crawled += 1;

            if (index + 1) % PROGRESS_INTERVAL == 0 || index + 1 == total {
                tracing::info!(
                    "Edition {}: {}/{} chapters ({:.1}%)",
                    source.id,
                    index + 1,
                    total,
                    (index + 1) as f64 / total as f64 * 100.0
                );
            }
        }

        let completed = snapshot.completed_chapters_for(source.id).to_vec();
        let verses = shards.load_chapters(source.id, &completed)?;
        let is_complete = (1..=CHAPTER_COUNT).all(|c| completed.contains(&c));

        Ok(EditionCrawl {
            verses,
            chapters_crawled,
            chapters_resumed,
            is_complete,
        })
    }

    /// Fetches and extracts every verse of `chapter`, joining all tasks before returning
    async fn crawl_chapter(
        &self,
        source: &EditionSource,
        chapter: u16,
        token: &CancellationToken,
    ) -> Result<VerseMap, HarvestError> {
        let mut tasks = JoinSet::new();

        for reference in verses_in(chapter) {
            let fetcher = self.fetcher.clone();
            let extractor = Arc::clone(&self.extractor);
            let url = verse_url(&source.url, reference);
            let edition_id = source.id;

            tasks.spawn(async move {
                let outcome = fetcher
                    .fetch(&url)
                    .await
                    .map(|html| extractor.extract(&html, reference, edition_id));
                (reference, outcome)
            });
        }

        let mut verses = VerseMap::new();
        let mut interrupted = false;

        while let Some(joined) = tasks.join_next().await {
            let (reference, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Verse task of edition {} failed: {}", source.id, e);
                    continue;
                }
            };

            match outcome {
                Ok(Some(record)) => {
                    verses.insert(reference.key(), record.to_entry());
                }
                Ok(None) => tracing::warn!("No commentary found for {} in edition {}", reference, source.id),
                Err(FetchError::Cancelled) => interrupted = true,
                Err(e) => tracing::warn!("Dropping verse {} of edition {}: {}", reference, source.id, e),
            }
        }

        if interrupted || token.is_cancelled() {
            tracing::info!("Chapter {} of edition {} interrupted; not checkpointed", chapter, source.id);
            return Err(HarvestError::Cancelled);
        }

        Ok(verses)
    }
}

/// URL of one verse page under an edition root
pub fn verse_url(edition_url: &str, reference: VerseReference) -> String {
    format!(
        "{}/chapter/{}/verse/{}",
        edition_url.trim_end_matches('/'),
        reference.chapter(),
        reference.verse()
    )
}

fn validate_range(chapters: &RangeInclusive<u16>) -> Result<(), InvalidReference> {
    let (start, end) = (*chapters.start(), *chapters.end());
    if start < 1 || start > CHAPTER_COUNT {
        return Err(InvalidReference::Chapter(start as i64));
    }
    if end < start || end > CHAPTER_COUNT {
        return Err(InvalidReference::Chapter(end as i64));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{HttpTransport, RawResponse, TransportError};
    use crate::crawler::parser::SelectorExtractor;
    use crate::crawler::retry::RetryPolicy;
    use crate::document::VerseRecord;
    use crate::language::LanguageTag;
    use crate::state::{MemoryShardStore, MemoryStore, ProgressError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves a commentary page for every verse URL, except the listed 404s
    #[derive(Default)]
    struct VersePages {
        missing: Vec<String>,
        requested: Mutex<Vec<String>>,
        cancel_on: Option<(String, CancellationToken)>,
    }

    #[async_trait]
    impl HttpTransport for VersePages {
        async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
            self.requested.lock().unwrap().push(url.to_string());
            if let Some((trigger, token)) = &self.cancel_on {
                if url == trigger {
                    token.cancel();
                }
            }
            if self.missing.iter().any(|m| m == url) {
                return Ok(RawResponse { status: 404, body: String::new() });
            }
            Ok(RawResponse {
                status: 200,
                body: format!(r#"<div class="tafsir-text">commentary for {}</div>"#, url),
            })
        }
    }

    fn source() -> EditionSource {
        EditionSource {
            id: 5001,
            name: "Test".to_string(),
            author: "Unknown".to_string(),
            language: LanguageTag::English,
            url: "http://origin/tafsir/test/".to_string(),
        }
    }

    fn crawler(transport: Arc<VersePages>, token: &CancellationToken) -> EditionCrawler {
        let fetcher = RateLimitedFetcher::new(
            transport,
            5,
            Duration::from_millis(1),
            RetryPolicy::new(1, Duration::from_millis(1)),
            token.clone(),
        );
        let extractor = SelectorExtractor::new("div.tafsir-text").unwrap();
        EditionCrawler::new(fetcher, Arc::new(extractor))
    }

    #[test]
    fn test_verse_url() {
        let reference = VerseReference::new(2, 255).unwrap();
        assert_eq!(verse_url("http://o/t/", reference), "http://o/t/chapter/2/verse/255");
        assert_eq!(verse_url("http://o/t", reference), "http://o/t/chapter/2/verse/255");
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(&(1..=114)).is_ok());
        assert!(validate_range(&(0..=3)).is_err());
        assert!(validate_range(&(1..=115)).is_err());
        assert!(validate_range(&(5..=4)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_verses_are_dropped() {
        let transport = Arc::new(VersePages {
            missing: vec!["http://origin/tafsir/test/chapter/1/verse/3".to_string()],
            ..Default::default()
        });
        let token = CancellationToken::new();
        let progress = MemoryStore::<CrawlProgress>::new();
        let shards = MemoryShardStore::new();

        let crawl = crawler(transport, &token)
            .crawl_edition(&source(), 1..=2, &progress, &shards, &token)
            .await
            .unwrap();

        assert_eq!(crawl.verses.len(), 7 + 286 - 1);
        assert!(!crawl.verses.contains_key("1:3"));
        assert_eq!(crawl.verses["2:1"].commentary.edition_id, 5001);
        assert!(!crawl.is_complete);

        let snapshot = progress.load().unwrap();
        assert_eq!(snapshot.current_edition_id, Some(5001));
        assert_eq!(snapshot.completed_chapters_for_current, vec![1, 2]);
        assert_eq!(shards.chapter_count(5001), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_chapter_is_not_checkpointed() {
        let token = CancellationToken::new();
        let transport = Arc::new(VersePages {
            cancel_on: Some((
                "http://origin/tafsir/test/chapter/2/verse/10".to_string(),
                token.clone(),
            )),
            ..Default::default()
        });
        let progress = MemoryStore::<CrawlProgress>::new();
        let shards = MemoryShardStore::new();

        let result = crawler(transport, &token)
            .crawl_edition(&source(), 1..=3, &progress, &shards, &token)
            .await;

        assert!(matches!(result, Err(HarvestError::Cancelled)));
        let snapshot = progress.load().unwrap();
        assert_eq!(snapshot.completed_chapters_for_current, vec![1]);
        assert_eq!(shards.chapter_count(5001), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shard_is_written_before_checkpoint() {
        /// Accepts the initial save, then fails every checkpoint
        struct FailingCheckpoints(Mutex<usize>);

        impl ProgressStore<CrawlProgress> for FailingCheckpoints {
            fn load(&self) -> Result<CrawlProgress, ProgressError> {
                Ok(CrawlProgress::default())
            }

            fn save(&self, _snapshot: &CrawlProgress) -> Result<(), ProgressError> {
                let mut saves = self.0.lock().unwrap();
                *saves += 1;
                if *saves > 1 {
                    return Err(ProgressError::Poisoned);
                }
                Ok(())
            }

            fn clear(&self) -> Result<(), ProgressError> {
                Ok(())
            }
        }

        let token = CancellationToken::new();
        let shards = MemoryShardStore::new();
        let result = crawler(Arc::new(VersePages::default()), &token)
            .crawl_edition(&source(), 1..=2, &FailingCheckpoints(Mutex::new(0)), &shards, &token)
            .await;

        assert!(matches!(result, Err(HarvestError::Progress(_))));
        assert_eq!(shards.chapter_count(5001), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_edition_drops_previous_shards() {
        let previous = VerseRecord::new(VerseReference::new(1, 1).unwrap(), 4000, "earlier run");
        let shards = MemoryShardStore::new();
        let mut verses = VerseMap::new();
        verses.insert("1:1".to_string(), previous.to_entry());
        shards.save_chapter(4000, 1, &verses).unwrap();

        let progress = MemoryStore::with_snapshot(CrawlProgress {
            completed_edition_ids: vec![],
            current_edition_id: Some(4000),
            completed_chapters_for_current: vec![1],
        });

        let token = CancellationToken::new();
        let crawl = crawler(Arc::new(VersePages::default()), &token)
            .crawl_edition(&source(), 1..=1, &progress, &shards, &token)
            .await
            .unwrap();

        assert_eq!(crawl.chapters_resumed, 0);
        assert_eq!(shards.chapter_count(4000), 0);
        assert_eq!(shards.chapter_count(5001), 1);
        assert_eq!(progress.load().unwrap().current_edition_id, Some(5001));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resuming_same_edition_keeps_shards() {
        let shards = MemoryShardStore::new();
        let record = VerseRecord::new(VerseReference::new(1, 1).unwrap(), 5001, "earlier run");
        let mut verses = VerseMap::new();
        verses.insert("1:1".to_string(), record.to_entry());
        shards.save_chapter(5001, 1, &verses).unwrap();

        let progress = MemoryStore::with_snapshot(CrawlProgress {
            completed_edition_ids: vec![],
            current_edition_id: Some(5001),
            completed_chapters_for_current: vec![1],
        });

        let token = CancellationToken::new();
        let transport = Arc::new(VersePages::default());
        let crawl = crawler(transport.clone(), &token)
            .crawl_edition(&source(), 1..=1, &progress, &shards, &token)
            .await
            .unwrap();

        assert_eq!(crawl.chapters_resumed, 1);
        assert_eq!(crawl.verses["1:1"].commentary.text, "earlier run");
        assert!(transport.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_range_fetches_nothing() {
        let transport = Arc::new(VersePages::default());
        let token = CancellationToken::new();
        let progress = MemoryStore::<CrawlProgress>::new();

        let result = crawler(transport.clone(), &token)
            .crawl_edition(&source(), 100..=120, &progress, &MemoryShardStore::new(), &token)
            .await;

        assert!(matches!(result, Err(HarvestError::Reference(_))));
        assert!(transport.requested.lock().unwrap().is_empty());
        assert!(!progress.has_snapshot());
    }
}
