use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::crawler::ServeError;
use crate::state::SettingsError;

pub const CAPACITY_EXCEEDED_BODY: &str = "Hourly crawl limit is exceeded";
pub const NOT_FOUND_BODY: &str = "Page not found";
pub const UPDATE_FAILED_BODY: &str = "Error while Updating";

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        match &self {
            ServeError::CapacityExceeded => {
                (StatusCode::SERVICE_UNAVAILABLE, CAPACITY_EXCEEDED_BODY).into_response()
            }
            ServeError::TimedOut { .. } => (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response(),
            ServeError::Admission(e) => {
                tracing::error!("{}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Crawl admission is closed").into_response()
            }
        }
    }
}

/// Failures of the query-driven endpoints
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("missing query parameter {0}")]
    MissingParameter(&'static str),

    #[error("invalid value {value:?} for {name}")]
    InvalidParameter { name: &'static str, value: String },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        match &self {
            AdminError::MissingParameter(_) | AdminError::InvalidParameter { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            AdminError::Settings(SettingsError::InvalidValue { .. }) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            AdminError::Settings(e @ SettingsError::Persist { .. }) => {
                tracing::error!("{}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, UPDATE_FAILED_BODY).into_response()
            }
        }
    }
}
