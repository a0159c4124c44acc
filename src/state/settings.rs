//! Pool configuration and its persistence in the cache service

use crate::cache::{CacheError, CacheStore};
use crate::config::WorkersConfig;
use crate::state::{PriorityClass, SharedState};
use std::sync::Arc;
use thiserror::Error;

/// Cache key holding the paying pool size
pub const PAYING_WORKERS_KEY: &str = "paying-worker-count";

/// Cache key holding the non-paying pool size
pub const NON_PAYING_WORKERS_KEY: &str = "non-paying-worker-count";

/// Cache key holding the pages-per-hour speed
pub const PAGES_PER_HOUR_KEY: &str = "pages-per-hour";

/// Pool capacities and crawl speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfiguration {
    pub paying_workers: u32,
    pub non_paying_workers: u32,
    pub pages_per_hour: u32,
}

impl PoolConfiguration {
    /// Crawls permitted per budget window
    pub fn hourly_limit(&self) -> i64 {
        i64::from(self.pages_per_hour)
            * (i64::from(self.paying_workers) + i64::from(self.non_paying_workers))
    }

    pub fn capacity(&self, class: PriorityClass) -> usize {
        match class {
            PriorityClass::Paying => self.paying_workers as usize,
            PriorityClass::NonPaying => self.non_paying_workers as usize,
        }
    }
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self::from(&WorkersConfig::default())
    }
}

impl From<&WorkersConfig> for PoolConfiguration {
    fn from(config: &WorkersConfig) -> Self {
        Self {
            paying_workers: config.paying,
            non_paying_workers: config.non_paying,
            pages_per_hour: config.pages_per_hour,
        }
    }
}

/// Errors from runtime configuration changes
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to persist {key}: {source}")]
    Persist {
        key: &'static str,
        source: CacheError,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Loads, persists and applies the pool configuration
///
/// All changes go through the configuration lock in [`SharedState`], so a
/// resize, the budget recompute that follows it and the periodic budget
/// reset never interleave.
pub struct ConfigManager {
    cache: Arc<dyn CacheStore>,
    shared: Arc<SharedState>,
}

impl ConfigManager {
    pub fn new(cache: Arc<dyn CacheStore>, shared: Arc<SharedState>) -> Self {
        Self { cache, shared }
    }

    /// Reads the persisted configuration, falling back per key to `defaults`
    ///
    /// Missing, unreadable or unparsable values fall back individually, as do
    /// worker counts of zero.
    pub async fn load_persisted(
        cache: &dyn CacheStore,
        defaults: PoolConfiguration,
    ) -> PoolConfiguration {
        let paying_workers = read_count(cache, PAYING_WORKERS_KEY, defaults.paying_workers, 1).await;
        let non_paying_workers =
            read_count(cache, NON_PAYING_WORKERS_KEY, defaults.non_paying_workers, 1).await;
        let pages_per_hour = read_count(cache, PAGES_PER_HOUR_KEY, defaults.pages_per_hour, 0).await;

        PoolConfiguration {
            paying_workers,
            non_paying_workers,
            pages_per_hour,
        }
    }

    /// Snapshot of the running configuration
    pub async fn current(&self) -> PoolConfiguration {
        self.shared.pool_configuration().await
    }

    /// Persists and applies new pool sizes
    ///
    /// Nothing is applied unless both values were stored.
    pub async fn set_workers(
        &self,
        paying: u32,
        non_paying: u32,
    ) -> Result<PoolConfiguration, SettingsError> {
        ensure_positive("setPayingWorkerTo", paying)?;
        ensure_positive("setNonPayingWorkerTo", non_paying)?;

        let mut config = self.shared.lock_config().await;
        self.persist(PAYING_WORKERS_KEY, paying).await?;
        self.persist(NON_PAYING_WORKERS_KEY, non_paying).await?;

        config.paying_workers = paying;
        config.non_paying_workers = non_paying;
        self.shared.apply(&config);

        tracing::info!(
            "Number of workers updated: {} paying, {} non-paying",
            paying,
            non_paying
        );
        Ok(*config)
    }

    /// Persists and applies a new crawl speed
    ///
    /// A failed write is logged and the speed is applied anyway; it only
    /// matters after a restart.
    pub async fn set_speed(&self, pages_per_hour: u32) -> PoolConfiguration {
        let mut config = self.shared.lock_config().await;
        if let Err(e) = self.persist(PAGES_PER_HOUR_KEY, pages_per_hour).await {
            tracing::warn!("{}", e);
        }

        config.pages_per_hour = pages_per_hour;
        self.shared.apply(&config);

        tracing::info!("Crawling speed updated: {} pages/hour", pages_per_hour);
        *config
    }

    async fn persist(&self, key: &'static str, value: u32) -> Result<(), SettingsError> {
        self.cache
            .set(key, &value.to_string(), None)
            .await
            .map_err(|source| SettingsError::Persist { key, source })
    }
}

async fn read_count(cache: &dyn CacheStore, key: &str, default: u32, min: u32) -> u32 {
    match cache.get(key).await {
        Ok(Some(raw)) => match raw.trim().parse::<u32>() {
            Ok(value) if value >= min => value,
            _ => {
                tracing::warn!("Ignoring persisted {} = {:?}, using {}", key, raw, default);
                default
            }
        },
        Ok(None) => {
            tracing::info!("No persisted {}, using {}", key, default);
            default
        }
        Err(e) => {
            tracing::warn!("Can't fetch {} ({}), using {}", key, e, default);
            default
        }
    }
}

fn ensure_positive(field: &'static str, value: u32) -> Result<(), SettingsError> {
    if value == 0 {
        return Err(SettingsError::InvalidValue {
            field,
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
