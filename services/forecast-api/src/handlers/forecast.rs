//! `GET /api/forecast`

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use forecast_common::grid::parse_days;
use serde::Deserialize;

use super::{debug_requested, json_body};
use crate::error::ApiError;
use crate::state::AppState;

pub const CACHE_CONTROL: &str = "public, max-age=1800";

#[derive(Debug, Default, Deserialize)]
pub struct ForecastParams {
    pub days: Option<String>,
    pub debug: Option<String>,
}

pub async fn forecast_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ForecastParams>,
) -> Result<Response, ApiError> {
    if debug_requested(&params.debug) {
        let report = match params.debug.as_deref() {
            Some("layers") => state.forecast.probe_layers().await?,
            _ => state.forecast.probe_variables().await?,
        };
        return Ok(([(header::CACHE_CONTROL, "no-store")], Json(report)).into_response());
    }

    let days = parse_days(params.days.as_deref(), state.forecast.default_days());
    let body = state.forecast.get(days).await?;
    Ok(json_body(body, CACHE_CONTROL))
}
