//! HTTP scrape endpoint.
//!
//! Serves the drive gauges held by a shared [`MetricStore`] in the Prometheus
//! text exposition format at `/metrics`, next to a small health check and an
//! endpoint index.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use log::{error, info};
use serde::Serialize;

use ssacli_exporter_core::MetricStore;

/// Shared server state.
struct AppState {
    store: Arc<MetricStore>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    drives: usize,
    probe_failures: u64,
    records_dropped: u64,
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.store.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.store.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        drives: state.store.drive_identities().len(),
        probe_failures: state.store.probe_failures(),
        records_dropped: state.store.records_dropped(),
    })
}

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "ssacli-exporter",
        "version": ssacli_exporter_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/metrics": "Drive health metrics (Prometheus text format)",
            "/health": "Exporter health check",
        },
    }))
}

/// Build the axum router.
pub fn build_router(store: Arc<MetricStore>) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/", get(handle_index))
        .route("/metrics", get(handle_metrics))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Serve the scrape endpoint until `shutdown` resolves.
///
/// Failing to bind `host:port` is returned to the caller.
pub async fn run_server(
    store: Arc<MetricStore>,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = build_router(store);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("serving metrics on http://{addr}/metrics");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
