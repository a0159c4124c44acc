//! crawl-cache: a caching crawl proxy
//!
//! A client asks for a remote page by URL. The proxy either serves a cached,
//! rewritten copy or admits a crawl for it, rewrites embedded resource URLs to
//! absolute form, caches the result and serves it. Crawls are admitted through
//! two priority pools and a shared hourly budget.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod state;
pub mod web;

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheError, CacheStore};
use crate::crawler::{spawn_budget_reset, CrawlWorker, Fetcher, RequestCoordinator};
use crate::state::{ConfigManager, PoolConfiguration, SharedState};
use crate::web::AppState;

/// Main error type for crawl-cache startup and wiring
#[derive(Debug, Error)]
pub enum CrawlCacheError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failures of a single dispatched crawl
///
/// These never reach the requester directly; a requester only observes the
/// missing completion flag and times out.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Cannot get {url}: no content after {attempts} attempts")]
    FetchExhausted { url: String, attempts: u32 },

    #[error("Failed to cache page for {url}: {source}")]
    CacheWriteFailed { url: String, source: CacheError },
}

/// Result type alias for crawl-cache operations
pub type Result<T> = std::result::Result<T, CrawlCacheError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use state::PriorityClass;

/// Everything a running proxy owns besides its router
pub struct Services {
    pub shared: Arc<SharedState>,
    pub coordinator: Arc<RequestCoordinator>,
    pub settings: Arc<ConfigManager>,
    pub budget_reset: tokio::task::JoinHandle<()>,
}

/// Wires the proxy together against an already connected cache
///
/// Persisted pool settings are read from the cache first (falling back to the
/// `[workers]` section), then the pools, budget and the periodic budget reset
/// are started from them.
pub async fn build_services(config: &Config, cache: Arc<dyn CacheStore>) -> Result<Services> {
    let defaults = PoolConfiguration::from(&config.workers);
    let pool_config = ConfigManager::load_persisted(cache.as_ref(), defaults).await;
    tracing::info!(
        "Pool configuration: {} paying, {} non-paying, {} pages/hour",
        pool_config.paying_workers,
        pool_config.non_paying_workers,
        pool_config.pages_per_hour
    );

    let shared = Arc::new(SharedState::new(pool_config));
    let settings = Arc::new(ConfigManager::new(Arc::clone(&cache), Arc::clone(&shared)));

    let fetcher = Fetcher::new(&config.fetch)?;
    let worker = CrawlWorker::new(
        Arc::clone(&cache),
        Arc::new(fetcher),
        Arc::clone(&shared),
        config.cache.page_ttl(),
    )
    .with_strict_rewrite(config.rewrite.strict);
    let coordinator = Arc::new(RequestCoordinator::new(
        cache,
        Arc::clone(&shared),
        worker,
        config.coordinator.poll_policy(),
    ));

    let budget_reset = spawn_budget_reset(Arc::clone(&shared), config.workers.budget_reset_period());

    Ok(Services {
        shared,
        coordinator,
        settings,
        budget_reset,
    })
}

/// Builds the HTTP application for a configuration and cache backend
pub async fn build_app(config: &Config, cache: Arc<dyn CacheStore>) -> Result<axum::Router> {
    let services = build_services(config, cache).await?;
    let state = AppState {
        coordinator: services.coordinator,
        settings: services.settings,
    };
    Ok(web::build_router(state, &config.server.landing_page))
}
