//! Prometheus metrics.
//!
//! Values are recorded through the `metrics` facade; `main` installs the
//! Prometheus recorder and `/metrics` renders it. Without a recorder (tests)
//! every call is a no-op.

use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    Ok(handle)
}

fn describe() {
    metrics::describe_counter!(
        "forecast_upstream_requests_total",
        "GetFeatureInfo requests sent to GeoMet"
    );
    metrics::describe_counter!(
        "forecast_upstream_failures_total",
        "GetFeatureInfo requests that produced no value, by reason"
    );
    metrics::describe_counter!("forecast_cache_hits_total", "Fresh cache hits by endpoint");
    metrics::describe_counter!("forecast_cache_misses_total", "Cache misses or expiries by endpoint");
    metrics::describe_counter!(
        "marine_stale_served_total",
        "Marine responses served from a stale cache entry after a failed refresh"
    );
    metrics::describe_histogram!(
        "forecast_aggregation_duration_seconds",
        "Wall time of a full forecast aggregation pass"
    );
    metrics::describe_counter!(
        "forecast_aggregation_cells_total",
        "Grid cells requested across aggregation passes"
    );
    metrics::describe_counter!(
        "forecast_aggregation_null_cells_total",
        "Grid cells left null after a failed fetch"
    );
}

pub fn record_upstream_request() {
    counter!("forecast_upstream_requests_total").increment(1);
}

pub fn record_upstream_failure(reason: &'static str) {
    counter!("forecast_upstream_failures_total", "reason" => reason).increment(1);
}

pub fn record_cache_hit(endpoint: &'static str) {
    counter!("forecast_cache_hits_total", "endpoint" => endpoint).increment(1);
}

pub fn record_cache_miss(endpoint: &'static str) {
    counter!("forecast_cache_misses_total", "endpoint" => endpoint).increment(1);
}

pub fn record_marine_stale_served() {
    counter!("marine_stale_served_total").increment(1);
}

pub fn record_aggregation(elapsed: Duration, total: usize, errors: usize) {
    histogram!("forecast_aggregation_duration_seconds").record(elapsed.as_secs_f64());
    counter!("forecast_aggregation_cells_total").increment(total as u64);
    counter!("forecast_aggregation_null_cells_total").increment(errors as u64);
}
