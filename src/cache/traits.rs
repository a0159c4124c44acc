//! Cache store trait and error types
//!
//! This module defines the interface the proxy uses to talk to its key/value
//! cache service, and the errors that service can report.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during cache operations
///
/// A miss is not an error: `get` returns `Ok(None)` for it. These variants
/// mean the service itself could not answer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache service unavailable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for cache backend implementations
///
/// Implementations must be safe to share between request handlers and
/// crawl workers. No retries happen at this layer.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a value
    ///
    /// # Returns
    ///
    /// * `Ok(Some(value))` - The key is present and not expired
    /// * `Ok(None)` - Cache miss
    /// * `Err(CacheError)` - The service could not be reached
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Writes a value, optionally expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;
}
