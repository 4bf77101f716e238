//! `GET /api/marine`

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::Deserialize;

use super::{debug_requested, json_body};
use crate::error::ApiError;
use crate::state::AppState;

pub const CACHE_CONTROL: &str = "public, max-age=1800";

#[derive(Debug, Default, Deserialize)]
pub struct MarineParams {
    pub debug: Option<String>,
}

pub async fn marine_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<MarineParams>,
) -> Result<Response, ApiError> {
    let body = state.marine.get(debug_requested(&params.debug)).await?;
    Ok(json_body(body, CACHE_CONTROL))
}
