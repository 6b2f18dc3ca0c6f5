//! HTTP server.
//!
//! Exposes the region aggregator over axum. Telemetry is loaded once at
//! startup and shared read-only by every request.

mod handlers;

use crate::telemetry::TelemetrySource;
use anyhow::{Context, Result};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tracing::info;

pub use handlers::{handle_latency_check, handle_usage};

/// Shared server state.
#[derive(Debug)]
pub struct AppState {
    pub telemetry: TelemetrySource,
    pub default_threshold_ms: f64,
}

impl AppState {
    pub fn new(telemetry: TelemetrySource, default_threshold_ms: f64) -> Self {
        Self {
            telemetry,
            default_threshold_ms,
        }
    }
}

/// Build the axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_usage))
        .route(
            "/api/latency-check",
            get(handle_usage).post(handle_latency_check),
        )
        .fallback(handlers::handle_not_found)
        .layer(middleware::from_fn(cors))
        .with_state(Arc::new(state))
}

/// Permissive CORS: any origin, POST/OPTIONS, any header.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
}

/// Run the HTTP server until Ctrl-C.
pub async fn run_server(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
