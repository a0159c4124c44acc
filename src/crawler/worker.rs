//! Crawl worker: the unit of work dispatched for one admitted request

use crate::cache::CacheStore;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::rewriter::rewrite_html_with;
use crate::state::{SharedState, WorkerSlot};
use crate::CrawlError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Fetches, rewrites and caches one page per run
#[derive(Clone)]
pub struct CrawlWorker {
    cache: Arc<dyn CacheStore>,
    fetcher: Arc<Fetcher>,
    shared: Arc<SharedState>,
    page_ttl: Duration,
    strict_rewrite: bool,
}

impl CrawlWorker {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        fetcher: Arc<Fetcher>,
        shared: Arc<SharedState>,
        page_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            fetcher,
            shared,
            page_ttl,
            strict_rewrite: false,
        }
    }

    /// Fails the rewrite on ambiguous markup instead of rewriting best-effort;
    /// such pages are then cached unmodified
    pub fn with_strict_rewrite(mut self, strict: bool) -> Self {
        self.strict_rewrite = strict;
        self
    }

    /// Crawls `url` while holding `slot`
    ///
    /// 1. Charges the rate budget (admission already checked it)
    /// 2. Fetches the origin with retries
    /// 3. Rewrites resource URLs, keeping the original body if that fails
    /// 4. Caches the page with the configured TTL
    /// 5. Flags the URL as done
    ///
    /// The slot is owned by this call and released when it returns, whatever
    /// the outcome. Failures leave no completion flag behind.
    pub async fn run(&self, url: &str, slot: WorkerSlot) -> Result<(), CrawlError> {
        let _slot = slot;

        let remaining = self.shared.budget.decrement();
        tracing::debug!("Crawling {} ({} crawls left this window)", url, remaining);

        let body = self.fetcher.fetch_with_retry(url).await?;

        let html = match rewrite_html_with(&body, url, self.strict_rewrite) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("{} ({})", e, url);
                body
            }
        };

        self.cache
            .set(url, &html, Some(self.page_ttl))
            .await
            .map_err(|source| CrawlError::CacheWriteFailed {
                url: url.to_string(),
                source,
            })?;

        self.shared.registry.mark_done(url);
        tracing::info!("Cached {} ({} bytes)", url, html.len());
        Ok(())
    }

    /// Runs the crawl as an independent task
    ///
    /// Errors are logged inside the task; the caller only ever learns about
    /// success through the completion registry.
    pub fn dispatch(&self, url: String, slot: WorkerSlot) -> JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move {
            if let Err(e) = worker.run(&url, slot).await {
                tracing::error!("{}", e);
            }
        })
    }
}
