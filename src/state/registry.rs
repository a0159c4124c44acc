use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Entries {
    flags: HashMap<String, bool>,
    /// Live watches per URL
    watchers: HashMap<String, usize>,
}

/// Completion flags for dispatched crawls, keyed by URL
///
/// A worker marks its URL done after the page is cached; the request waiting
/// on that URL consumes the flag. The flag is only a liveness signal, the
/// cache read that follows is authoritative.
///
/// Flags are only kept while some request watches the URL. A crawl that
/// finishes after its requester gave up leaves nothing behind.
#[derive(Debug, Default)]
pub struct CompletionRegistry {
    entries: Mutex<Entries>,
    changed: Notify,
}

/// Interest in the completion of one URL, held by a waiting request
///
/// Dropping the last watch for a URL discards any unconsumed flag for it.
#[derive(Debug)]
pub struct CompletionWatch<'a> {
    registry: &'a CompletionRegistry,
    url: String,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers interest in `url` until the returned watch is dropped
    ///
    /// Take the watch before dispatching the crawl so a fast completion is
    /// not missed.
    pub fn watch(&self, url: &str) -> CompletionWatch<'_> {
        *self.entries().watchers.entry(url.to_string()).or_insert(0) += 1;
        CompletionWatch {
            registry: self,
            url: url.to_string(),
        }
    }

    /// Marks the crawl for `url` as finished and wakes every waiter
    ///
    /// Returns false, and records nothing, when no request watches `url`.
    pub fn mark_done(&self, url: &str) -> bool {
        let recorded = {
            let mut entries = self.entries();
            if entries.watchers.contains_key(url) {
                entries.flags.insert(url.to_string(), true);
                true
            } else {
                false
            }
        };

        if recorded {
            self.changed.notify_waiters();
        } else {
            tracing::debug!("No request waiting on {}, completion dropped", url);
        }
        recorded
    }

    /// Whether a completion for `url` is waiting to be consumed
    ///
    /// Absent entries read as false.
    pub fn is_done(&self, url: &str) -> bool {
        self.entries().flags.get(url).copied().unwrap_or(false)
    }

    /// Clears the flag for `url` if it is set, returning whether it was
    pub fn consume(&self, url: &str) -> bool {
        self.entries().flags.remove(url).unwrap_or(false)
    }

    /// Waits until a completion for `url` can be consumed or `deadline` passes
    ///
    /// Watches `url` for the duration of the call. Returns true when this
    /// call consumed the flag.
    pub async fn wait_consume(&self, url: &str, deadline: Instant) -> bool {
        self.watch(url).wait_consume(deadline).await
    }

    async fn wait_flag(&self, url: &str, deadline: Instant) -> bool {
        loop {
            // register interest before checking so a mark_done in between is not missed
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.consume(url) {
                return true;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.consume(url);
            }
        }
    }

    /// Number of flags not yet consumed
    pub fn pending(&self) -> usize {
        self.entries().flags.len()
    }

    /// Number of URLs with at least one live watch
    pub fn watched(&self) -> usize {
        self.entries().watchers.len()
    }
}

impl CompletionWatch<'_> {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Waits until a completion for the watched URL can be consumed or
    /// `deadline` passes
    pub async fn wait_consume(&self, deadline: Instant) -> bool {
        self.registry.wait_flag(&self.url, deadline).await
    }
}

impl Drop for CompletionWatch<'_> {
    fn drop(&mut self) {
        let mut entries = self.registry.entries();
        let remaining = match entries.watchers.get_mut(&self.url) {
            Some(count) => {
                *count -= 1;
                *count
            }
            None => return,
        };

        if remaining == 0 {
            entries.watchers.remove(&self.url);
            entries.flags.remove(&self.url);
        }
    }
}
