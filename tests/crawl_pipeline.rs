//! Integration tests for the crawl stage
//!
//! The resumption and end-to-end tests run against an in-process origin on
//! a paused clock. The HTTP tests use wiremock with the real reqwest
//! transport.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tafsir_ripple::config::{Config, EditionEntry};
use tafsir_ripple::crawler::{
    Coordinator, CrawlOptions, HttpTransport, RawResponse, ReqwestTransport, TransportError,
};
use tafsir_ripple::importer::Loader;
use tafsir_ripple::state::{CrawlProgress, MemoryShardStore, MemoryStore, ProgressStore};
use tafsir_ripple::storage::{ImportStatus, SqliteStorage, Storage};
use tafsir_ripple::verse::verse_count;
use tafsir_ripple::{HarvestError, LanguageTag};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Origin that serves a commentary page for every verse URL
#[derive(Default)]
struct FakeOrigin {
    requested: Mutex<Vec<String>>,
}

impl FakeOrigin {
    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    /// Chapter number of every verse URL requested
    fn requested_chapters(&self) -> Vec<u16> {
        self.requested()
            .iter()
            .filter_map(|url| {
                let rest = url.split("/chapter/").nth(1)?;
                rest.split('/').next()?.parse().ok()
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for FakeOrigin {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(RawResponse {
            status: 200,
            body: format!(
                r#"<html><body><div class="tafsir-text">  Commentary for {}  </div></body></html>"#,
                url
            ),
        })
    }
}

fn edition(id: i64, url: &str) -> EditionEntry {
    EditionEntry {
        id,
        name: "Tafsir al-Jalalayn".to_string(),
        author: "Jalal ad-Din al-Mahalli".to_string(),
        language: "ar".to_string(),
        url: url.to_string(),
    }
}

fn test_config(output_dir: &Path, editions: Vec<EditionEntry>) -> Config {
    let mut config = Config::default();
    config.crawler.delay_secs = 0.1;
    config.crawler.max_concurrent = 5;
    config.crawler.max_retries = 2;
    config.output.output_dir = output_dir.display().to_string();
    config.editions = editions;
    config
}

fn chapter_range(start: u16, end: u16) -> CrawlOptions {
    CrawlOptions {
        start_chapter: start,
        end_chapter: end,
        ..Default::default()
    }
}

fn verses_between(start: u16, end: u16) -> usize {
    (start..=end)
        .map(|c| verse_count(c as i64).unwrap() as usize)
        .sum()
}

#[tokio::test(start_paused = true)]
async fn test_resume_skips_checkpointed_chapters() {
    let output = TempDir::new().unwrap();
    let origin = Arc::new(FakeOrigin::default());
    let progress = Arc::new(MemoryStore::with_snapshot(CrawlProgress {
        completed_edition_ids: vec![],
        current_edition_id: Some(1),
        completed_chapters_for_current: (1..=50).collect(),
    }));
    let shards = Arc::new(MemoryShardStore::new());

    let config = test_config(output.path(), vec![edition(1, "http://origin.test/tafsir/1")]);
    let coordinator = Coordinator::from_parts(
        config,
        origin.clone(),
        progress.clone(),
        shards.clone(),
        CancellationToken::new(),
    )
    .unwrap();

    let report = coordinator.run(&CrawlOptions::default()).await.unwrap();

    let expected = verses_between(51, 114);
    assert_eq!(origin.requested().len(), expected);
    assert!(origin.requested_chapters().iter().all(|&c| c > 50));

    assert_eq!(report.editions_completed, 1);
    assert_eq!(report.editions_partial, 0);
    // Shards of chapters 1..=50 never existed here, so only the fetched
    // chapters reach the document
    assert_eq!(report.verses_collected, expected);
    assert_eq!(report.fetch.requests, expected as u64);

    let saved = progress.load().unwrap();
    assert!(saved.is_edition_completed(1));
    assert_eq!(saved.current_edition_id, None);
    assert!(saved.completed_chapters_for_current.is_empty());
    assert_eq!(shards.chapter_count(1), 0);
}

#[tokio::test(start_paused = true)]
async fn test_completed_editions_are_skipped_unless_forced() {
    let output = TempDir::new().unwrap();
    let origin = Arc::new(FakeOrigin::default());
    let progress = Arc::new(MemoryStore::with_snapshot(CrawlProgress {
        completed_edition_ids: vec![1],
        ..Default::default()
    }));

    let config = test_config(output.path(), vec![edition(1, "http://origin.test/tafsir/1")]);
    let coordinator = Coordinator::from_parts(
        config,
        origin.clone(),
        progress.clone(),
        Arc::new(MemoryShardStore::new()),
        CancellationToken::new(),
    )
    .unwrap();

    let report = coordinator.run(&chapter_range(1, 1)).await.unwrap();
    assert_eq!(report.editions_skipped, 1);
    assert!(origin.requested().is_empty());

    let forced = CrawlOptions {
        force: true,
        ..chapter_range(1, 1)
    };
    let report = coordinator.run(&forced).await.unwrap();
    assert_eq!(report.editions_skipped, 0);
    assert_eq!(origin.requested().len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_partial_crawl_then_import() {
    let output = TempDir::new().unwrap();
    let origin = Arc::new(FakeOrigin::default());
    let progress = Arc::new(MemoryStore::<CrawlProgress>::new());
    let shards = Arc::new(MemoryShardStore::new());

    let config = test_config(output.path(), vec![edition(1, "http://origin.test/tafsir/1")]);
    let coordinator = Coordinator::from_parts(
        config,
        origin.clone(),
        progress.clone(),
        shards.clone(),
        CancellationToken::new(),
    )
    .unwrap();

    let report = coordinator.run(&chapter_range(1, 1)).await.unwrap();
    assert_eq!(report.editions_partial, 1);
    assert_eq!(report.editions_completed, 0);
    assert_eq!(report.verses_collected, 7);
    assert_eq!(report.documents.len(), 1);

    // Partial editions keep their checkpoint and shards
    let saved = progress.load().unwrap();
    assert!(!saved.is_edition_completed(1));
    assert_eq!(saved.completed_chapters_for(1), &[1]);
    assert_eq!(shards.chapter_count(1), 1);

    let document = &report.documents[0];
    let name = document.file_name().unwrap().to_str().unwrap();
    assert_eq!(name, "tafsir_arabic_1_Tafsir_al-Jalalayn.json");

    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let outcome = Loader::new(&mut storage, 1000, 1)
        .import_file(document, false)
        .unwrap();

    assert_eq!(outcome.status, ImportStatus::Completed);
    assert_eq!(outcome.imported, 7);
    assert_eq!(storage.count_verses_for_edition(1).unwrap(), 7);

    let row = storage.get_edition(1).unwrap().unwrap();
    assert_eq!(row.name, "Tafsir al-Jalalayn");
    assert_eq!(row.author, "Jalal ad-Din al-Mahalli");
}

#[tokio::test(start_paused = true)]
async fn test_rerun_resumes_from_shards_without_fetching() {
    let output = TempDir::new().unwrap();
    let origin = Arc::new(FakeOrigin::default());
    let progress = Arc::new(MemoryStore::<CrawlProgress>::new());
    let shards = Arc::new(MemoryShardStore::new());

    let config = test_config(output.path(), vec![edition(1, "http://origin.test/tafsir/1")]);
    let coordinator = Coordinator::from_parts(
        config,
        origin.clone(),
        progress,
        shards,
        CancellationToken::new(),
    )
    .unwrap();

    coordinator.run(&chapter_range(1, 2)).await.unwrap();
    let fetched = origin.requested().len();
    assert_eq!(fetched, verses_between(1, 2));

    let report = coordinator.run(&chapter_range(1, 2)).await.unwrap();
    assert_eq!(origin.requested().len(), fetched);
    assert_eq!(report.verses_collected, verses_between(1, 2));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_run_fetches_nothing() {
    let output = TempDir::new().unwrap();
    let origin = Arc::new(FakeOrigin::default());
    let token = CancellationToken::new();
    token.cancel();

    let config = test_config(output.path(), vec![edition(1, "http://origin.test/tafsir/1")]);
    let coordinator = Coordinator::from_parts(
        config,
        origin.clone(),
        Arc::new(MemoryStore::<CrawlProgress>::new()),
        Arc::new(MemoryShardStore::new()),
        token,
    )
    .unwrap();

    let report = coordinator.run(&CrawlOptions::default()).await.unwrap();
    assert!(report.interrupted);
    assert!(report.documents.is_empty());
    assert!(origin.requested().is_empty());
}

#[tokio::test]
async fn test_missing_and_failing_verses_are_dropped() {
    let server = MockServer::start().await;
    let edition_url = format!("{}/tafsir/7", server.uri());

    for verse in 1..=5 {
        Mock::given(method("GET"))
            .and(path(format!("/tafsir/7/chapter/1/verse/{}", verse)))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<div class="tafsir-text">Verse {} commentary</div>"#,
                verse
            )))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/tafsir/7/chapter/1/verse/6"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tafsir/7/chapter/1/verse/7"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(output.path(), vec![edition(7, &edition_url)]);
    let transport = Arc::new(ReqwestTransport::from_config(&config.crawler).unwrap());
    let coordinator = Coordinator::from_parts(
        config,
        transport,
        Arc::new(MemoryStore::<CrawlProgress>::new()),
        Arc::new(MemoryShardStore::new()),
        CancellationToken::new(),
    )
    .unwrap();

    let report = coordinator.run(&chapter_range(1, 1)).await.unwrap();

    assert_eq!(report.verses_collected, 5);
    assert_eq!(report.fetch.not_found, 1);
    assert_eq!(report.fetch.unavailable, 1);
    assert_eq!(report.fetch.retries, 1);

    let bytes = std::fs::read(&report.documents[0]).unwrap();
    let document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(document["vs"]["1:5"]["tf"]["t"], "Verse 5 commentary");
    assert!(document["vs"].get("1:6").is_none());
    assert!(document["vs"].get("1:7").is_none());
    assert_eq!(document["meta"]["coverage"]["verses"], 5);
}

#[tokio::test]
async fn test_discovery_from_index_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="/contact">Contact</a>
                <a href="/tafsir/jalalayn">Tafsir al-Jalalayn</a>
                <a href="/tafaseer/tabari">تفسير الطبري</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let mut config = test_config(output.path(), vec![]);
    config.crawler.base_url = server.uri();
    let transport = Arc::new(ReqwestTransport::from_config(&config.crawler).unwrap());
    let coordinator = Coordinator::from_parts(
        config,
        transport,
        Arc::new(MemoryStore::<CrawlProgress>::new()),
        Arc::new(MemoryShardStore::new()),
        CancellationToken::new(),
    )
    .unwrap();

    let sources = coordinator.discover().await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].id, 5000);
    assert_eq!(sources[0].url, format!("{}/tafsir/jalalayn", server.uri()));
    assert_eq!(sources[0].language, LanguageTag::English);
    assert_eq!(sources[1].id, 5001);
    assert_eq!(sources[1].language, LanguageTag::Arabic);
}

#[tokio::test]
async fn test_unreachable_origin_fails_discovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let mut config = test_config(output.path(), vec![]);
    config.crawler.base_url = server.uri();
    config.crawler.max_retries = 1;
    let transport = Arc::new(ReqwestTransport::from_config(&config.crawler).unwrap());
    let coordinator = Coordinator::from_parts(
        config,
        transport,
        Arc::new(MemoryStore::<CrawlProgress>::new()),
        Arc::new(MemoryShardStore::new()),
        CancellationToken::new(),
    )
    .unwrap();

    let result = coordinator.run(&CrawlOptions::default()).await;
    assert!(matches!(result, Err(HarvestError::Discovery { .. })));
}
