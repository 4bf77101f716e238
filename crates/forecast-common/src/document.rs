//! JSON documents served to the charting front-end.
//!
//! Field names are an external contract and must not change.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Location;

/// One grid cell of one variable at one location.
///
/// `value` is `null` exactly when the fetch or parse failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub hour: u32,
    pub value: Option<f64>,
    pub date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    pub total: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<&Location> for LocationSummary {
    fn from(location: &Location) -> Self {
        Self {
            name: location.name.clone(),
            lat: location.lat,
            lon: location.lon,
        }
    }
}

/// location id → variable id → series
pub type ForecastSeries = BTreeMap<String, BTreeMap<String, Vec<ForecastPoint>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDocument {
    pub forecast: ForecastSeries,
    pub dates: Vec<String>,
    pub model_run: String,
    pub generated_at: DateTime<Utc>,
    pub locations: BTreeMap<String, LocationSummary>,
    pub fetch_stats: FetchStats,
}

/// `{ "error": "..." }` body used by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub error: String,
}

impl ErrorDocument {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_null_value_is_serialized() {
        let point = ForecastPoint {
            hour: 7,
            value: None,
            date: "2024-07-15".into(),
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json, serde_json::json!({"hour": 7, "value": null, "date": "2024-07-15"}));
    }

    #[test]
    fn test_document_field_names() {
        let mut vars = BTreeMap::new();
        vars.insert(
            "pressure".to_string(),
            vec![ForecastPoint {
                hour: 7,
                value: Some(1013.2),
                date: "2024-07-15".into(),
            }],
        );
        let mut forecast = BTreeMap::new();
        forecast.insert("squamish".to_string(), vars);

        let mut locations = BTreeMap::new();
        locations.insert(
            "squamish".to_string(),
            LocationSummary::from(&Location::new("squamish", "Squamish", 49.7016, -123.1558)),
        );

        let doc = ForecastDocument {
            forecast,
            dates: vec!["2024-07-15".into()],
            model_run: "12".into(),
            generated_at: Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap(),
            locations,
            fetch_stats: FetchStats { total: 1, errors: 0 },
        };

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["forecast"]["squamish"]["pressure"][0]["value"], 1013.2);
        assert_eq!(json["locations"]["squamish"]["name"], "Squamish");
        assert_eq!(json["fetch_stats"]["total"], 1);
        assert_eq!(json["model_run"], "12");
        assert_eq!(doc.forecast["squamish"]["pressure"].len(), 1);
    }

    #[test]
    fn test_error_document() {
        let body = serde_json::to_string(&ErrorDocument::new("Tide data file not found")).unwrap();
        assert_eq!(body, r#"{"error":"Tide data file not found"}"#);
    }
}
