use crate::config::types::{
    CacheBackend, CacheConfig, Config, CoordinatorConfig, FetchConfig, ServerConfig, WorkersConfig,
};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_cache_config(&config.cache)?;
    validate_workers_config(&config.workers)?;
    validate_fetch_config(&config.fetch)?;
    validate_coordinator_config(&config.coordinator)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "bind-address '{}' is not a socket address: {}",
            config.bind_address, e
        ))
    })?;

    if config.landing_page.is_empty() {
        return Err(ConfigError::Validation(
            "landing-page cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.backend == CacheBackend::Redis {
        let url = Url::parse(&config.redis_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid redis-url: {}", e)))?;

        if !matches!(url.scheme(), "redis" | "rediss") {
            return Err(ConfigError::InvalidUrl(format!(
                "redis-url must use the redis or rediss scheme, got '{}'",
                url.scheme()
            )));
        }
    }

    // redis rejects SET ... EX 0
    if config.page_ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "page-ttl-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_workers_config(config: &WorkersConfig) -> Result<(), ConfigError> {
    if config.paying < 1 {
        return Err(ConfigError::Validation(format!(
            "workers.paying must be >= 1, got {}",
            config.paying
        )));
    }

    if config.non_paying < 1 {
        return Err(ConfigError::Validation(format!(
            "workers.non-paying must be >= 1, got {}",
            config.non_paying
        )));
    }

    if config.budget_reset_secs < 1 {
        return Err(ConfigError::Validation(
            "budget-reset-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if !matches!(config.scheme.as_str(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "fetch.scheme must be http or https, got '{}'",
            config.scheme
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_coordinator_config(config: &CoordinatorConfig) -> Result<(), ConfigError> {
    if config.poll_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "poll-attempts must be >= 1, got {}",
            config.poll_attempts
        )));
    }

    if config.poll_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}
