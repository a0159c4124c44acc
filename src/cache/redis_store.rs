//! Redis-backed cache store

use crate::cache::{CacheResult, CacheStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Cache store backed by a redis server
///
/// Holds a `ConnectionManager`, which multiplexes commands over one
/// connection and reconnects after the server goes away. Cloning is cheap.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connects to the redis server at `url`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use crawl_cache::cache::RedisCache;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let cache = RedisCache::connect("redis://127.0.0.1:6379/").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        tracing::info!("Connected to redis");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut con = self.connection.clone();
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut con = self.connection.clone();
        match ttl {
            Some(ttl) => {
                // EX takes whole seconds and rejects zero
                let seconds = ttl.as_secs().max(1);
                con.set_ex::<_, _, ()>(key, value, seconds).await?;
            }
            None => con.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }
}
