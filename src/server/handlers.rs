//! HTTP handlers.

use super::AppState;
use crate::analysis::{aggregate, resolve_threshold};
use crate::error::ApiError;
use crate::models::{AggregationRequest, LatencyCheckRequest, LatencyReport};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use std::sync::Arc;
use tracing::{debug, warn};

/// `POST /api/latency-check`
///
/// The body is parsed as JSON whatever the `Content-Type`.
pub async fn handle_latency_check(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<LatencyReport>, ApiError> {
    let request: LatencyCheckRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected malformed request body: {}", e);
        ApiError::from(e)
    })?;

    let threshold_ms =
        resolve_threshold(request.threshold_ms.as_ref(), state.default_threshold_ms)
            .map_err(|e| {
                warn!("Rejected request: {}", e);
                ApiError::from(e)
            })?;

    debug!(
        "Aggregating {} region(s) at threshold {}ms",
        request.regions.len(),
        threshold_ms
    );

    let request = AggregationRequest::new(request.regions).with_threshold(threshold_ms);
    let report = aggregate(state.telemetry.records(), &request).map_err(|e| {
        warn!("Aggregation failed validation: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(report))
}

/// `GET /` and `GET /api/latency-check`
pub async fn handle_usage(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "latency-check",
        "version": env!("CARGO_PKG_VERSION"),
        "usage": "POST /api/latency-check with a JSON body",
        "endpoints": {
            "/api/latency-check": {
                "method": "POST",
                "description": "Per-region latency and uptime summary",
                "body": {
                    "regions": "List of region keys (case-insensitive)",
                    "threshold_ms": format!(
                        "Breach threshold in milliseconds (optional, default: {})",
                        state.default_threshold_ms
                    ),
                },
            },
        },
        "example": {
            "regions": ["apac", "emea"],
            "threshold_ms": 177,
        },
        "default_threshold_ms": state.default_threshold_ms,
        "telemetry": {
            "source": state.telemetry.origin().to_string(),
            "records": state.telemetry.len(),
        },
    }))
}

/// Fallback for unknown routes.
pub async fn handle_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
}
