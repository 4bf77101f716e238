//! HTTP handlers and routing.

mod forecast;
mod marine;
mod tide;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub use forecast::forecast_handler;
pub use marine::marine_handler;
pub use tide::tide_handler;

/// Build the application router. `/metrics` renders `prometheus` when given.
pub fn router(state: Arc<AppState>, prometheus: Option<PrometheusHandle>) -> Router {
    let app = Router::new()
        .route("/api/forecast", get(forecast_handler))
        .route("/api/marine", get(marine_handler))
        .route("/api/tide", get(tide_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(state));

    let app = match prometheus {
        Some(handle) => app.layer(Extension(handle)),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

/// Serialized JSON body with the endpoint's cache policy.
pub(crate) fn json_body(body: Bytes, cache_control: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response()
}

/// `debug` is on when the parameter is present at all, even empty.
pub(crate) fn debug_requested(debug: &Option<String>) -> bool {
    debug.is_some()
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn metrics_handler(prometheus: Option<Extension<PrometheusHandle>>) -> impl IntoResponse {
    match prometheus {
        Some(Extension(handle)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            String::new(),
        ),
    }
}
