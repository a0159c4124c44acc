//! Cache module for pages and persisted settings
//!
//! This module holds the key/value seam the proxy is built around:
//! - Rewritten pages, keyed by the requested URL, with a time-to-live
//! - Pool sizes and crawl speed, keyed by fixed names, without expiry
//!
//! Backends are a redis server and an in-process map.

mod memory;
mod redis_store;
mod traits;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;
pub use traits::{CacheError, CacheResult, CacheStore};

use crate::config::{CacheBackend, CacheConfig};
use std::sync::Arc;

/// Opens the cache backend selected in the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn CacheStore>)` - A connected backend
/// * `Err(CacheError)` - The redis server could not be reached
pub async fn open_cache(config: &CacheConfig) -> CacheResult<Arc<dyn CacheStore>> {
    match config.backend {
        CacheBackend::Redis => {
            let cache = RedisCache::connect(&config.redis_url).await?;
            Ok(Arc::new(cache))
        }
        CacheBackend::Memory => {
            tracing::warn!("Using in-process memory cache; pages and settings are not shared or persisted");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}
