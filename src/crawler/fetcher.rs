//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - A global concurrency cap shared by every outstanding fetch
//! - The polite delay paid before every attempt
//! - Retry with exponential backoff for transient failures
//! - Error classification (not found vs. unavailable)

use crate::config::CrawlerConfig;
use crate::crawler::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of a fetch that produced no body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{url} returned 404")]
    NotFound { url: String },

    #[error("{url} unavailable: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("fetch cancelled")]
    Cancelled,
}

/// Status and body of one HTTP exchange
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Network-level failure of one attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

/// A single GET, with no retry or rate limiting of its own
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `HttpTransport` over a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        Ok(RawResponse { status, body })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Counters shared by every fetch of a run
#[derive(Debug, Default)]
pub struct FetchStats {
    requests: AtomicU64,
    retries: AtomicU64,
    not_found: AtomicU64,
    unavailable: AtomicU64,
}

/// Point-in-time copy of `FetchStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    pub requests: u64,
    pub retries: u64,
    pub not_found: u64,
    pub unavailable: u64,
}

impl FetchStats {
    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
        }
    }
}

/// Fetcher enforcing the global concurrency cap, per-attempt delay and retry policy
///
/// Clones share the same semaphore and counters.
#[derive(Clone)]
pub struct RateLimitedFetcher {
    transport: Arc<dyn HttpTransport>,
    semaphore: Arc<Semaphore>,
    delay: Duration,
    policy: RetryPolicy,
    stats: Arc<FetchStats>,
    token: CancellationToken,
}

impl RateLimitedFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `transport` - Performs the individual GETs
    /// * `max_concurrent` - Fetches allowed in flight at once (at least 1)
    /// * `delay` - Paid before every attempt, retries included
    /// * `policy` - Attempt count and backoff
    /// * `token` - Cancels pending attempts
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        max_concurrent: usize,
        delay: Duration,
        policy: RetryPolicy,
        token: CancellationToken,
    ) -> Self {
        Self {
            transport,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            delay,
            policy,
            stats: Arc::new(FetchStats::default()),
            token,
        }
    }

    pub fn from_config(
        transport: Arc<dyn HttpTransport>,
        config: &CrawlerConfig,
        token: CancellationToken,
    ) -> Self {
        Self::new(
            transport,
            config.max_concurrent as usize,
            config.delay(),
            RetryPolicy::new(config.max_retries, Duration::from_secs(1)),
            token,
        )
    }

    pub fn stats(&self) -> FetchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Fetches `url`, returning the body of the first 2xx response
    ///
    /// The concurrency permit is held for the whole retry sequence.
    /// A 404 ends the sequence immediately; any other failure is retried
    /// until the policy is exhausted.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let _permit = tokio::select! {
            _ = self.token.cancelled() => return Err(FetchError::Cancelled),
            permit = self.semaphore.acquire() => permit.map_err(|_| FetchError::Cancelled)?,
        };

        let mut attempt = 0;
        loop {
            tokio::select! {
                _ = self.token.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }

            self.stats.requests.fetch_add(1, Ordering::Relaxed);
            let reason = match self.transport.get(url).await {
                Ok(response) if (200..300).contains(&response.status) => return Ok(response.body),
                Ok(response) if response.status == StatusCode::NOT_FOUND.as_u16() => {
                    self.stats.not_found.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Not found: {}", url);
                    return Err(FetchError::NotFound {
                        url: url.to_string(),
                    });
                }
                Ok(response) => format!("HTTP {}", response.status),
                Err(e) => e.to_string(),
            };

            if !self.policy.should_retry(attempt) {
                self.stats.unavailable.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "Giving up on {} after {} attempts: {}",
                    url,
                    attempt + 1,
                    reason
                );
                return Err(FetchError::Unavailable {
                    url: url.to_string(),
                    reason,
                });
            }

            let backoff = self.policy.backoff(attempt);
            tracing::debug!(
                "Attempt {} for {} failed ({}), retrying in {:?}",
                attempt + 1,
                url,
                reason,
                backoff
            );
            self.stats.retries.fetch_add(1, Ordering::Relaxed);

            tokio::select! {
                _ = self.token.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
            attempt += 1;
        }
    }
}
