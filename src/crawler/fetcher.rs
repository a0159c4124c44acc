//! HTTP fetcher implementation
//!
//! This module handles origin requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Building the origin URL from the requested cache key
//! - Retrying until a non-empty body arrives or attempts run out

use crate::config::FetchConfig;
use crate::CrawlError;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// How often and how patiently an origin is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Pause between failed attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(2),
        }
    }
}

/// Why a single attempt produced no content
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("origin answered {0}")]
    Status(StatusCode),

    #[error("origin returned an empty body")]
    EmptyBody,

    #[error("cannot build origin URL from {url:?}: {message}")]
    InvalidTarget { url: String, message: String },
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use crawl_cache::config::FetchConfig;
/// use crawl_cache::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches origin pages for crawl workers
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    scheme: String,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(
            client,
            config.scheme.clone(),
            config.retry_policy(),
        ))
    }

    pub fn with_client(client: Client, scheme: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            client,
            scheme: scheme.into(),
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Origin URL for a requested cache key, e.g. `example.com/a` → `https://example.com/a`
    pub fn target_url(&self, url: &str) -> Result<Url, FetchError> {
        Url::parse(&format!("{}://{}", self.scheme, url)).map_err(|e| FetchError::InvalidTarget {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// One GET against the origin
    ///
    /// Succeeds only for a 2xx response with a non-empty body.
    pub async fn fetch_once(&self, target: &Url) -> Result<String, FetchError> {
        let response = self.client.get(target.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(body)
    }

    /// Fetches `url` with the retry policy
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx with body | Done |
    /// | Empty body, non-2xx, network error, timeout | Wait `delay`, retry |
    /// | Attempts exhausted | `FetchExhausted` |
    /// | URL cannot be built | `FetchExhausted` at once |
    pub async fn fetch_with_retry(&self, url: &str) -> Result<String, CrawlError> {
        let target = self.target_url(url).map_err(|e| {
            tracing::warn!("{}", e);
            CrawlError::FetchExhausted {
                url: url.to_string(),
                attempts: 1,
            }
        })?;

        for attempt in 1..=self.policy.max_attempts {
            match self.fetch_once(&target).await {
                Ok(body) => {
                    tracing::debug!("Fetched {} on attempt {}", target, attempt);
                    return Ok(body);
                }
                Err(e) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.policy.max_attempts,
                        target,
                        e
                    );
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        Err(CrawlError::FetchExhausted {
            url: url.to_string(),
            attempts: self.policy.max_attempts,
        })
    }
}
