//! Request coordinator - per-request crawl orchestration
//!
//! For each requested URL the coordinator:
//! - Serves the cached copy when there is one
//! - Rejects the request when the hourly budget is spent
//! - Waits for a slot in the requester's priority pool
//! - Dispatches a crawl worker and waits, bounded, for it to finish
//!
//! Identical URLs requested at the same time are not coalesced; each request
//! that misses the cache dispatches its own crawl.

use crate::cache::CacheStore;
use crate::crawler::worker::CrawlWorker;
use crate::state::{AdmissionError, CompletionWatch, PriorityClass, SharedState};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// How long a request waits for its crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    /// Total time a request waits before giving up
    pub fn total_wait(&self) -> Duration {
        self.interval * self.attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_secs(2),
        }
    }
}

/// Why a request was not served a page
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Hourly crawl limit is exceeded")]
    CapacityExceeded,

    #[error("No page for {url} within {waited:?}")]
    TimedOut { url: String, waited: Duration },

    /// See [`AdmissionError`]; not produced by the long-lived pools
    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

/// Orchestrates cache-aside crawling for incoming requests
pub struct RequestCoordinator {
    cache: Arc<dyn CacheStore>,
    shared: Arc<SharedState>,
    worker: CrawlWorker,
    poll: PollPolicy,
}

impl RequestCoordinator {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        shared: Arc<SharedState>,
        worker: CrawlWorker,
        poll: PollPolicy,
    ) -> Self {
        Self {
            cache,
            shared,
            worker,
            poll,
        }
    }

    /// Serves `url` for a requester of `class`
    ///
    /// # Returns
    ///
    /// * `Ok(page)` - Cached or freshly crawled page
    /// * `Err(ServeError::CapacityExceeded)` - Budget spent; nothing was dispatched
    /// * `Err(ServeError::TimedOut)` - The crawl did not finish in time; it keeps running
    pub async fn serve(&self, url: &str, class: PriorityClass) -> Result<String, ServeError> {
        if let Some(page) = self.cached(url).await {
            tracing::debug!("Cache hit for {}", url);
            return Ok(page);
        }

        if !self.shared.budget.is_available() {
            tracing::warn!("Hourly crawl limit is exceeded, rejecting {}", url);
            return Err(ServeError::CapacityExceeded);
        }

        let slot = self.shared.pools.acquire(class).await?;
        tracing::debug!("Admitted {} crawl for {}", class, url);

        let watch = self.shared.registry.watch(url);
        // not joined: the crawl outlives this request if it has to
        let _crawl = self.worker.dispatch(url.to_string(), slot);

        match self.await_page(&watch).await {
            Some(page) => Ok(page),
            None => {
                let waited = self.poll.total_wait();
                tracing::info!("Gave up waiting for {} after {:?}", url, waited);
                Err(ServeError::TimedOut {
                    url: url.to_string(),
                    waited,
                })
            }
        }
    }

    /// Cache read that treats an unreachable cache as a miss
    async fn cached(&self, url: &str) -> Option<String> {
        match self.cache.get(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Cache read for {} failed, treating as miss: {}", url, e);
                None
            }
        }
    }

    /// Waits for a completion flag on the watched URL, then reads the page
    ///
    /// Once a flag has been consumed the page is known to have been written,
    /// so a miss after that is retried every poll interval rather than
    /// waiting for another flag. Everything stops at the same deadline.
    async fn await_page(&self, watch: &CompletionWatch<'_>) -> Option<String> {
        let url = watch.url();
        let deadline = Instant::now() + self.poll.total_wait();

        if !watch.wait_consume(deadline).await {
            return None;
        }

        loop {
            if let Some(page) = self.cached(url).await {
                return Some(page);
            }

            let next = Instant::now() + self.poll.interval;
            if next >= deadline {
                return None;
            }
            tokio::time::sleep_until(next).await;
        }
    }
}
