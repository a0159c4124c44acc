//! Configuration module for crawl-cache
//!
//! This module handles loading, parsing, and validating the TOML startup
//! configuration. Pool sizes and crawl speed found here are only defaults:
//! values persisted in the cache service take precedence at startup.
//!
//! # Example
//!
//! ```no_run
//! use crawl_cache::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-cache.toml")).unwrap();
//! println!("Listening on {}", config.server.bind_address);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheBackend, CacheConfig, Config, CoordinatorConfig, FetchConfig, RewriteConfig,
    ServerConfig, WorkersConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
