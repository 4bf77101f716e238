//! `GET /api/tide`

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use forecast_common::grid::{parse_days, DEFAULT_DAYS};
use serde::Deserialize;

use super::{debug_requested, json_body};
use crate::error::ApiError;
use crate::state::AppState;

pub const CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Debug, Default, Deserialize)]
pub struct TideParams {
    pub days: Option<String>,
    pub debug: Option<String>,
}

pub async fn tide_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<TideParams>,
) -> Result<Response, ApiError> {
    let days = parse_days(params.days.as_deref(), DEFAULT_DAYS);
    let body = state.tide.get(days, debug_requested(&params.debug)).await?;
    Ok(json_body(body, CACHE_CONTROL))
}
