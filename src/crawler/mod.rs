//! Crawler module for origin fetching and request coordination
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Resource URL rewriting on fetched pages
//! - Crawl workers that cache pages and flag completion
//! - Per-request coordination: cache, budget, admission, bounded wait
//! - The periodic rate budget reset

mod coordinator;
mod fetcher;
mod rewriter;
mod scheduler;
mod worker;

pub use coordinator::{PollPolicy, RequestCoordinator, ServeError};
pub use fetcher::{build_http_client, FetchError, Fetcher, RetryPolicy};
pub use rewriter::{absolutize, rewrite_html, rewrite_html_with, RewriteError};
pub use scheduler::spawn_budget_reset;
pub use worker::CrawlWorker;
