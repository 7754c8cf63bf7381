//! HTTP API surface for the merged forecast.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::error::WxError;
use crate::models::MergedForecastResult;
use crate::resolver::MergedForecastResolver;

/// Shared request-handling state, constructed once at startup.
pub struct AppState {
    pub resolver: MergedForecastResolver,
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    lat: Option<String>,
    lng: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/forecast", get(get_merged_forecast))
        .with_state(state)
}

/// Both parameters must be present and parse as floats before any outbound
/// request is issued.
fn parse_coordinates(query: &ForecastQuery) -> Option<(f64, f64)> {
    let lat = query.lat.as_deref()?.parse().ok()?;
    let lng = query.lng.as_deref()?.parse().ok()?;
    Some((lat, lng))
}

async fn get_merged_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<MergedForecastResult>, (StatusCode, Json<Value>)> {
    let Some((lat, lng)) = parse_coordinates(&query) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing or invalid lat/lng parameters" })),
        ));
    };

    state
        .resolver
        .resolve(lat, lng)
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(err: WxError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        WxError::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
        WxError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(%err, "merged forecast request failed");
    }
    (status, Json(json!({ "error": err.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinates() {
        let query = ForecastQuery {
            lat: Some("41.48".to_string()),
            lng: Some("-81.81".to_string()),
        };
        assert_eq!(parse_coordinates(&query), Some((41.48, -81.81)));
    }

    #[test]
    fn test_parse_rejects_missing_or_non_numeric() {
        let missing = ForecastQuery {
            lat: None,
            lng: Some("-81.81".to_string()),
        };
        assert!(parse_coordinates(&missing).is_none());

        let garbage = ForecastQuery {
            lat: Some("41.48".to_string()),
            lng: Some("west".to_string()),
        };
        assert!(parse_coordinates(&garbage).is_none());
    }

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = error_response(WxError::invalid_coordinate("x"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(WxError::upstream("x"));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = error_response(WxError::data_integrity("x"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
