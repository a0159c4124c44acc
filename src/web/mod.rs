//! HTTP surface of the proxy

pub mod error;
pub mod handlers;
mod router;

pub use error::AdminError;
pub use router::build_router;

use std::sync::Arc;

use crate::crawler::RequestCoordinator;
use crate::state::ConfigManager;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<RequestCoordinator>,
    pub settings: Arc<ConfigManager>,
}
