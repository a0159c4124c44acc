use serde::Deserialize;
use std::time::Duration;

use crate::crawler::{PollPolicy, RetryPolicy};

/// Main configuration structure for crawl-cache
///
/// Every section is optional in the TOML file; omitted sections take the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the proxy listens on
    #[serde(rename = "bind-address")]
    pub bind_address: String,

    /// Static page served at `/`
    #[serde(rename = "landing-page")]
    pub landing_page: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            landing_page: "./static/index.html".to_string(),
        }
    }
}

/// Which cache service backs the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Cache service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Connection URL for the redis backend
    #[serde(rename = "redis-url")]
    pub redis_url: String,

    /// Time-to-live of a cached page, in seconds
    #[serde(rename = "page-ttl-secs")]
    pub page_ttl_secs: u64,
}

impl CacheConfig {
    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            page_ttl_secs: 3600,
        }
    }
}

/// Default pool sizing, used when the cache holds no persisted values
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Concurrent crawls admitted for paying requests
    pub paying: u32,

    /// Concurrent crawls admitted for non-paying requests
    #[serde(rename = "non-paying")]
    pub non_paying: u32,

    /// Pages per hour per worker; the hourly budget is this times the total pool size
    #[serde(rename = "pages-per-hour")]
    pub pages_per_hour: u32,

    /// Interval between rate budget resets, in seconds
    #[serde(rename = "budget-reset-secs")]
    pub budget_reset_secs: u64,
}

impl WorkersConfig {
    pub fn budget_reset_period(&self) -> Duration {
        Duration::from_secs(self.budget_reset_secs)
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            paying: 5,
            non_paying: 2,
            pages_per_hour: 10,
            budget_reset_secs: 3600,
        }
    }
}

/// Origin fetch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Scheme prepended to the requested URL when fetching the origin
    pub scheme: String,

    /// Total attempts before a crawl is abandoned
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Pause between failed attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            max_attempts: 10,
            retry_delay_ms: 2000,
            request_timeout_secs: 30,
            user_agent: format!("crawl-cache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Bounds on how long a request waits for its crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    #[serde(rename = "poll-attempts")]
    pub poll_attempts: u32,

    /// Milliseconds per poll step
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
}

impl CoordinatorConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            attempts: self.poll_attempts,
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 20,
            poll_interval_ms: 2000,
        }
    }
}

/// Resource URL rewriting of crawled pages
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Cache pages with ambiguous markup unmodified instead of rewriting them best-effort
    pub strict: bool,
}
