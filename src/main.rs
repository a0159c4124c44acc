//! crawl-cache main entry point
//!
//! This is the command-line interface for the caching crawl proxy.

use anyhow::Context;
use clap::Parser;
use crawl_cache::cache::open_cache;
use crawl_cache::config::{load_config_with_hash, validate, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// crawl-cache: a caching crawl proxy
///
/// Serves cached copies of remote pages, crawling them on a miss. Crawls are
/// admitted through a paying and a non-paying worker pool under a shared
/// hourly budget.
#[derive(Parser, Debug)]
#[command(name = "crawl-cache")]
#[command(version)]
#[command(about = "A caching crawl proxy", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            let config = Config::default();
            validate(&config)?;
            config
        }
    };

    let cache = open_cache(&config.cache)
        .await
        .context("Failed to connect to the cache service")?;
    let app = crawl_cache::build_app(&config, cache).await?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    tracing::info!(addr = %config.server.bind_address, "server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_cache=info,tower_http=info,warn"),
            1 => EnvFilter::new("crawl_cache=debug,tower_http=debug,info"),
            2 => EnvFilter::new("crawl_cache=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
