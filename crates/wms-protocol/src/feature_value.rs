//! Numeric value extraction from GetFeatureInfo responses.
//!
//! GeoMet answers point queries with GeoJSON, but the property carrying the
//! sample differs between layers, and some error paths return plain text or
//! an exception report with HTTP 200.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// `value: 12.3`, `Value = -4`, `value 1.2e3`
static LABELLED_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[Vv]alue[:\s=]+([+-]?\d+\.?\d*(?:[eE][+-]?\d+)?)").expect("valid regex")
});

/// A line holding nothing but a number.
static BARE_NUMBER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*([+-]?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)\s*$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureInfoError {
    #[error("empty response body")]
    Empty,

    #[error("upstream ServiceException: {0}")]
    ServiceException(String),

    #[error("no numeric value in response")]
    NoValue,
}

/// Extract the sampled value from a GetFeatureInfo body.
///
/// Order: exception marker, GeoJSON (`value`, then `pixel`, then the first
/// numeric property), then plain-text heuristics. A body that parses as JSON
/// never falls through to the text heuristics.
pub fn parse_feature_info_value(body: &str) -> Result<f64, FeatureInfoError> {
    if body.trim().is_empty() {
        return Err(FeatureInfoError::Empty);
    }

    if body.contains("ServiceException") {
        return Err(FeatureInfoError::ServiceException(exception_snippet(body)));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(json) => value_from_geojson(&json).ok_or(FeatureInfoError::NoValue),
        Err(_) => value_from_text(body).ok_or(FeatureInfoError::NoValue),
    }
}

fn value_from_geojson(json: &Value) -> Option<f64> {
    let props = json
        .get("features")?
        .get(0)?
        .get("properties")?
        .as_object()?;

    if let Some(v) = props.get("value").and_then(numeric) {
        return Some(v);
    }
    if let Some(v) = props.get("pixel").and_then(numeric) {
        return Some(v);
    }

    // serde_json is built with preserve_order, so this is document order
    props.values().find_map(numeric)
}

fn value_from_text(body: &str) -> Option<f64> {
    if let Some(caps) = LABELLED_VALUE.captures(body) {
        if let Some(v) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
            return Some(v);
        }
    }

    BARE_NUMBER_LINE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Numbers and numeric strings count; `NaN` and infinities do not.
fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn exception_snippet(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(200)
        .collect()
}
