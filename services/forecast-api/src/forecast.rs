//! Forecast endpoint pipeline: cache read-through over the aggregator,
//! plus the diagnostic probes.

use std::sync::Arc;

use bytes::Bytes;
use forecast_common::{Clock, Location, ModelRun, TimeGridEntry};
use serde::Serialize;
use serde_json::{json, Map, Value};
use storage::DocumentCache;
use tracing::{info, warn};
use wms_protocol::{parse_feature_info_value, GetFeatureInfoRequest};

use crate::aggregation::Aggregator;
use crate::error::ApiError;
use crate::metrics;

/// Pressure layer names tried by the `debug=layers` probe.
pub const PRESSURE_LAYER_CANDIDATES: &[&str] = &[
    "HRDPS.CONTINENTAL_PRMSL",
    "HRDPS.CONTINENTAL_PN",
    "HRDPS.CONTINENTAL_PRES",
    "HRDPS.CONTINENTAL_PRES-SFC",
    "HRDPS.CONTINENTAL_PRES_SFC",
    "HRDPS.CONTINENTAL.PRES_MSL",
    "HRDPS.CONTINENTAL_MSL",
    "HRDPS.CONTINENTAL_MSLP",
    "HRDPS.CONTINENTAL_PN-SL",
    "HRDPS.CONTINENTAL_PRES_ISBL_1015",
];

const DEBUG_LOCATION_ID: &str = "squamish";
const DEBUG_GRID_INDEX: usize = 7;
const RESPONSE_SNIPPET_CHARS: usize = 600;
const REQUEST_FAILED: &str = "REQUEST FAILED";

pub struct ForecastService {
    aggregator: Aggregator,
    cache: DocumentCache,
    clock: Arc<dyn Clock>,
    default_days: usize,
}

impl ForecastService {
    /// `cache` supplies the store, TTL and clock; its key is replaced per horizon.
    pub fn new(
        aggregator: Aggregator,
        cache: DocumentCache,
        clock: Arc<dyn Clock>,
        default_days: usize,
    ) -> Self {
        Self {
            aggregator,
            cache,
            clock,
            default_days,
        }
    }

    pub fn default_days(&self) -> usize {
        self.default_days
    }

    pub fn cache_key(days: usize) -> String {
        format!("forecast_{}d", days)
    }

    fn cache_for(&self, days: usize) -> DocumentCache {
        self.cache.with_key(Self::cache_key(days))
    }

    /// Serialized forecast for `days`, from a fresh cache entry when possible.
    pub async fn get(&self, days: usize) -> Result<Bytes, ApiError> {
        let cache = self.cache_for(days);

        if let Some(entry) = cache.read_fresh().await {
            metrics::record_cache_hit("forecast");
            return Ok(entry.document);
        }
        metrics::record_cache_miss("forecast");

        self.refresh(days).await
    }

    /// Run the pipeline unconditionally and replace the cache entry.
    pub async fn refresh(&self, days: usize) -> Result<Bytes, ApiError> {
        let now = self.clock.now();
        let document = self.aggregator.run(now, days).await;
        let body = Bytes::from(serde_json::to_vec_pretty(&document)?);

        let cache = self.cache_for(days);
        if let Err(e) = cache.write(body.clone()).await {
            warn!(key = cache.key(), error = %e, "Failed to write forecast cache");
        }

        Ok(body)
    }

    /// Grid entry and location used by the diagnostic probes.
    fn debug_target(&self) -> Result<(TimeGridEntry, Location), ApiError> {
        let catalog = self.aggregator.catalog();
        let location = catalog
            .location(DEBUG_LOCATION_ID)
            .or_else(|| catalog.locations.first())
            .cloned()
            .ok_or_else(|| ApiError::Internal("site catalog has no locations".into()))?;

        let grid = self.aggregator.grid().generate(self.clock.now(), self.default_days);
        let entry = grid
            .get(DEBUG_GRID_INDEX)
            .or_else(|| grid.first())
            .copied()
            .ok_or_else(|| ApiError::Internal("empty time grid".into()))?;

        Ok((entry, location))
    }

    /// `debug=layers`: probe candidate pressure layer names.
    pub async fn probe_layers(&self) -> Result<Value, ApiError> {
        let (entry, location) = self.debug_target()?;
        let source = self.aggregator.source();

        let mut candidates = Map::new();
        for layer in PRESSURE_LAYER_CANDIDATES {
            let request = GetFeatureInfoRequest::for_point(
                layer,
                location.lon,
                location.lat,
                Some(entry.utc_param()),
            );
            let probe = match source.fetch_body(&request).await {
                Ok(body) => {
                    let parsed = parse_feature_info_value(&body).ok();
                    LayerProbe {
                        works: parsed.is_some(),
                        parsed_value: parsed,
                        response_snippet: body.chars().take(RESPONSE_SNIPPET_CHARS).collect(),
                    }
                }
                Err(_) => LayerProbe {
                    works: false,
                    parsed_value: None,
                    response_snippet: REQUEST_FAILED.to_string(),
                },
            };
            candidates.insert(layer.to_string(), serde_json::to_value(probe)?);
        }

        info!(location = %location.id, time = %entry.utc_param(), "Layer probe complete");

        Ok(json!({
            "test_time": entry.utc_param(),
            "test_location": location.name,
            "candidates": candidates,
        }))
    }

    /// `debug=<other>`: one raw request per configured variable.
    pub async fn probe_variables(&self) -> Result<Value, ApiError> {
        let (entry, location) = self.debug_target()?;
        let source = self.aggregator.source();
        let resolved = ModelRun::resolve(self.clock.now());

        let mut requests = Map::new();
        for variable in &self.aggregator.catalog().variables {
            let request = GetFeatureInfoRequest::for_point(
                &variable.layer,
                location.lon,
                location.lat,
                Some(entry.utc_param()),
            );
            let url = source.request_url(&request);
            let probe = match source.fetch_body(&request).await {
                Ok(body) => VariableProbe {
                    url,
                    layer: variable.layer.clone(),
                    raw_length: body.len(),
                    parsed_value: parse_feature_info_value(&body).ok(),
                    raw_response: body,
                },
                Err(_) => VariableProbe {
                    url,
                    layer: variable.layer.clone(),
                    raw_response: REQUEST_FAILED.to_string(),
                    raw_length: 0,
                    parsed_value: None,
                },
            };
            requests.insert(variable.id.clone(), serde_json::to_value(probe)?);
        }

        Ok(json!({
            "model_run": resolved.run.label(),
            "test_time_utc": entry.utc_param(),
            "test_time_local": entry.local_label(),
            "test_location": format!("{} ({}, {})", location.name, location.lat, location.lon),
            "service_version": env!("CARGO_PKG_VERSION"),
            "requests": requests,
        }))
    }
}

#[derive(Debug, Serialize)]
struct LayerProbe {
    works: bool,
    parsed_value: Option<f64>,
    response_snippet: String,
}

#[derive(Debug, Serialize)]
struct VariableProbe {
    url: String,
    layer: String,
    raw_response: String,
    raw_length: usize,
    parsed_value: Option<f64>,
}
