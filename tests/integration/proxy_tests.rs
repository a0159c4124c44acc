//! Integration tests for the proxy
//!
//! These tests use wiremock as the origin, the in-memory cache backend and
//! `tower::ServiceExt::oneshot` against the full router.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use crawl_cache::cache::{CacheStore, MemoryCache};
use crawl_cache::config::{CacheBackend, Config};
use crawl_cache::state::{
    ConfigManager, PoolConfiguration, PriorityClass, PAGES_PER_HOUR_KEY, PAYING_WORKERS_KEY,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short retry and wait bounds
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.cache.backend = CacheBackend::Memory;
    config.fetch.scheme = "http".to_string();
    config.fetch.max_attempts = 2;
    config.fetch.retry_delay_ms = 10;
    config.fetch.request_timeout_secs = 5;
    config.coordinator.poll_attempts = 10;
    config.coordinator.poll_interval_ms = 20;
    config
}

async fn app_with(config: &Config, cache: &Arc<MemoryCache>) -> Router {
    crawl_cache::build_app(config, cache.clone()).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_miss_then_hit() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><img src="/logo.png"><script src="https://cdn.example.com/x.js"></script></body></html>"#),
        )
        .expect(1)
        .mount(&origin)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let app = app_with(&create_test_config(), &cache).await;
    let url = format!("{}/page", origin.address());

    let (status, body) = get(&app, &format!("/results?url={}&paying=true", url)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&format!(r#"<img src="https://{}/logo.png">"#, url)));
    assert!(body.contains(r#"<script src="https://cdn.example.com/x.js">"#));
    assert!(cache.contains(&url));

    // served from the cache; the origin mock allows exactly one fetch
    let (status, second) = get(&app, &format!("/results?url={}&paying=false", url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, body);
    assert_eq!(cache.write_count(), 1);
}

#[tokio::test]
async fn test_budget_exhausted_returns_503() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>never</p>"))
        .expect(0)
        .mount(&origin)
        .await;

    let mut config = create_test_config();
    config.workers.pages_per_hour = 0;
    let cache = Arc::new(MemoryCache::new());
    let app = app_with(&config, &cache).await;

    let uri = format!("/results?url={}/page&paying=true", origin.address());
    let (status, body) = get(&app, &uri).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Hourly crawl limit is exceeded");
    assert_eq!(cache.write_count(), 0);
}

#[tokio::test]
async fn test_unreachable_origin_returns_404() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&origin)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let app = app_with(&create_test_config(), &cache).await;
    let url = format!("{}/missing", origin.address());

    let (status, _) = get(&app, &format!("/results?url={}", url)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!cache.contains(&url));
}

#[tokio::test]
async fn test_results_requires_url() {
    let cache = Arc::new(MemoryCache::new());
    let app = app_with(&create_test_config(), &cache).await;

    let (status, _) = get(&app, "/results").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/results?url=&paying=true").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_padded_url_is_a_distinct_key() {
    let mut config = create_test_config();
    config.workers.pages_per_hour = 0;
    let cache = Arc::new(MemoryCache::new());
    cache.set("example.com/a", "<p>cached</p>", None).await.unwrap();
    let app = app_with(&config, &cache).await;

    let (status, body) = get(&app, "/results?url=example.com/a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<p>cached</p>");

    // the padded key misses, and with no budget the miss is a 503
    let (status, body) = get(&app, "/results?url=%20example.com/a%20").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Hourly crawl limit is exceeded");

    let (status, _) = get(&app, "/results?url=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_speed_persists_across_restart() {
    let cache = Arc::new(MemoryCache::new());
    let config = create_test_config();
    let app = app_with(&config, &cache).await;

    let (status, body) = get(&app, "/set-speed?setWorkerSpeedTo=20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Crawling speed updated.");
    assert_eq!(
        cache.get(PAGES_PER_HOUR_KEY).await.unwrap().as_deref(),
        Some("20")
    );

    // a restarted proxy reads the persisted value instead of the file default
    let services = crawl_cache::build_services(&config, cache.clone())
        .await
        .unwrap();
    let restored = services.settings.current().await;
    assert_eq!(restored.pages_per_hour, 20);
    assert_eq!(services.shared.budget.remaining(), 20 * 7);
    services.budget_reset.abort();
}

#[tokio::test]
async fn test_set_workers() {
    let cache = Arc::new(MemoryCache::new());
    let config = create_test_config();
    let app = app_with(&config, &cache).await;

    let (status, body) = get(
        &app,
        "/set-workers?setPayingWorkerTo=8&setNonPayingWorkerTo=3",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Number of workers updated.");

    let loaded = ConfigManager::load_persisted(cache.as_ref(), PoolConfiguration::default()).await;
    assert_eq!(loaded.paying_workers, 8);
    assert_eq!(loaded.non_paying_workers, 3);

    let services = crawl_cache::build_services(&config, cache.clone())
        .await
        .unwrap();
    assert_eq!(services.shared.pools.capacity(PriorityClass::Paying), 8);
    assert_eq!(services.shared.pools.capacity(PriorityClass::NonPaying), 3);
    services.budget_reset.abort();
}

#[tokio::test]
async fn test_set_workers_rejects_bad_values() {
    let cache = Arc::new(MemoryCache::new());
    let app = app_with(&create_test_config(), &cache).await;

    for uri in [
        "/set-workers?setPayingWorkerTo=8",
        "/set-workers?setPayingWorkerTo=eight&setNonPayingWorkerTo=3",
        "/set-workers?setPayingWorkerTo=0&setNonPayingWorkerTo=3",
        "/set-speed",
        "/set-speed?setWorkerSpeedTo=-5",
    ] {
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
    assert!(cache.get(PAYING_WORKERS_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_workers_persist_failure_returns_500() {
    let cache = Arc::new(MemoryCache::new());
    let app = app_with(&create_test_config(), &cache).await;
    cache.set_offline(true);

    let (status, body) = get(
        &app,
        "/set-workers?setPayingWorkerTo=8&setNonPayingWorkerTo=3",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error while Updating");

    // still serving
    let (status, _) = get(&app, "/set-speed?setWorkerSpeedTo=4").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_landing_page() {
    let mut page = NamedTempFile::new().unwrap();
    page.write_all(b"<h1>crawl-cache</h1>").unwrap();
    page.flush().unwrap();

    let mut config = create_test_config();
    config.server.landing_page = page.path().to_string_lossy().into_owned();
    let cache = Arc::new(MemoryCache::new());
    let app = app_with(&config, &cache).await;

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>crawl-cache</h1>");
}
