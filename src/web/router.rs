use axum::{routing::get, Router};
use tower_http::{services::ServeFile, trace::TraceLayer};

use super::handlers::{results, set_speed, set_workers};
use super::AppState;

pub fn build_router(state: AppState, landing_page: &str) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(landing_page))
        .route("/results", get(results))
        .route("/set-workers", get(set_workers))
        .route("/set-speed", get(set_speed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
