use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::state::PriorityClass;
use crate::web::error::AdminError;
use crate::web::AppState;

pub const WORKERS_UPDATED_BODY: &str = "Number of workers updated.";
pub const SPEED_UPDATED_BODY: &str = "Crawling speed updated.";

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub url: Option<String>,
    pub paying: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetWorkersQuery {
    #[serde(rename = "setPayingWorkerTo")]
    pub paying: Option<String>,
    #[serde(rename = "setNonPayingWorkerTo")]
    pub non_paying: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetSpeedQuery {
    #[serde(rename = "setWorkerSpeedTo")]
    pub pages_per_hour: Option<String>,
}

pub async fn results(State(state): State<AppState>, Query(query): Query<ResultsQuery>) -> Response {
    // used verbatim as cache key and crawl target
    let url = match query.url {
        Some(url) if !url.trim().is_empty() => url,
        _ => return (StatusCode::BAD_REQUEST, "missing query parameter url").into_response(),
    };
    // anything but the exact string `true` is non-paying
    let class = PriorityClass::from_paying_flag(query.paying.as_deref() == Some("true"));

    tracing::info!(%url, %class, "page requested");
    match state.coordinator.serve(&url, class).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::info!(%url, error = %e, "page not served");
            e.into_response()
        }
    }
}

pub async fn set_workers(
    State(state): State<AppState>,
    Query(query): Query<SetWorkersQuery>,
) -> Result<&'static str, AdminError> {
    let paying = parse_count("setPayingWorkerTo", query.paying.as_deref())?;
    let non_paying = parse_count("setNonPayingWorkerTo", query.non_paying.as_deref())?;

    state.settings.set_workers(paying, non_paying).await?;
    Ok(WORKERS_UPDATED_BODY)
}

pub async fn set_speed(
    State(state): State<AppState>,
    Query(query): Query<SetSpeedQuery>,
) -> Result<&'static str, AdminError> {
    let pages_per_hour = parse_count("setWorkerSpeedTo", query.pages_per_hour.as_deref())?;

    state.settings.set_speed(pages_per_hour).await;
    Ok(SPEED_UPDATED_BODY)
}

fn parse_count(name: &'static str, raw: Option<&str>) -> Result<u32, AdminError> {
    let raw = raw.ok_or(AdminError::MissingParameter(name))?;
    raw.trim()
        .parse::<u32>()
        .map_err(|_| AdminError::InvalidParameter {
            name,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("n", Some("12")).unwrap(), 12);
        assert_eq!(parse_count("n", Some(" 3 ")).unwrap(), 3);
        assert!(matches!(
            parse_count("n", None),
            Err(AdminError::MissingParameter("n"))
        ));
        assert!(matches!(
            parse_count("n", Some("-1")),
            Err(AdminError::InvalidParameter { .. })
        ));
        assert!(matches!(
            parse_count("n", Some("fast")),
            Err(AdminError::InvalidParameter { .. })
        ));
    }
}
