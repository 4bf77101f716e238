//! Forecast aggregation: one GeoMet point query per location, variable
//! and grid cell, run with bounded concurrency.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, instrument};
use wms_protocol::GetFeatureInfoRequest;

use forecast_common::{
    FetchStats, ForecastDocument, ForecastPoint, LocationSummary, ModelRun, SiteCatalog,
    TimeGridEntry, TimeGridGenerator,
};

use crate::metrics;
use crate::upstream::PointSource;

/// One cell of the locations × variables × grid cross-product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTask {
    pub location: usize,
    pub variable: usize,
    pub entry: usize,
}

/// Enumerate tasks location-major, then variable, then grid order.
pub fn build_tasks(locations: usize, variables: usize, entries: usize) -> Vec<FetchTask> {
    let mut tasks = Vec::with_capacity(locations * variables * entries);
    for location in 0..locations {
        for variable in 0..variables {
            for entry in 0..entries {
                tasks.push(FetchTask {
                    location,
                    variable,
                    entry,
                });
            }
        }
    }
    tasks
}

pub struct Aggregator {
    source: Arc<dyn PointSource>,
    catalog: Arc<SiteCatalog>,
    grid: TimeGridGenerator,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(
        source: Arc<dyn PointSource>,
        catalog: Arc<SiteCatalog>,
        grid: TimeGridGenerator,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            catalog,
            grid,
            concurrency: concurrency.max(1),
        }
    }

    pub fn catalog(&self) -> &SiteCatalog {
        &self.catalog
    }

    pub fn grid(&self) -> &TimeGridGenerator {
        &self.grid
    }

    pub fn source(&self) -> &Arc<dyn PointSource> {
        &self.source
    }

    /// Run a full pass for `days` and assemble the document.
    ///
    /// Never fails: cells whose fetch or parse failed are `null` and counted
    /// in `fetch_stats.errors`.
    #[instrument(skip(self), fields(concurrency = self.concurrency))]
    pub async fn run(&self, now: DateTime<Utc>, days: usize) -> ForecastDocument {
        let started = Instant::now();
        let resolved = ModelRun::resolve(now);
        let grid = self.grid.generate(now, days);
        let catalog = &self.catalog;

        let tasks = build_tasks(catalog.locations.len(), catalog.variables.len(), grid.len());
        let total = tasks.len();

        let outcomes: Vec<(usize, Option<f64>)> = stream::iter(tasks.into_iter().enumerate())
            .map(|(index, task)| {
                let grid = &grid;
                async move { (index, self.fetch_cell(task, grid).await) }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        // Completion order is arbitrary; place by task index
        let mut values = vec![None; total];
        for (index, value) in outcomes {
            values[index] = value;
        }
        let errors = values.iter().filter(|v| v.is_none()).count();

        let document = self.assemble(&grid, &values, resolved.run, now, FetchStats { total, errors });

        let elapsed = started.elapsed();
        metrics::record_aggregation(elapsed, total, errors);
        info!(
            model_run = resolved.run.label(),
            reference_time = %resolved.reference_time,
            days = days,
            total = total,
            errors = errors,
            elapsed_ms = elapsed.as_millis() as u64,
            "Forecast aggregation complete"
        );

        document
    }

    async fn fetch_cell(&self, task: FetchTask, grid: &[TimeGridEntry]) -> Option<f64> {
        let location = &self.catalog.locations[task.location];
        let variable = &self.catalog.variables[task.variable];
        let entry = &grid[task.entry];

        let request = GetFeatureInfoRequest::for_point(
            &variable.layer,
            location.lon,
            location.lat,
            Some(entry.utc_param()),
        );

        match self.source.fetch_value(&request).await {
            Ok(raw) => Some(variable.conversion.normalize(raw)),
            Err(failure) => {
                metrics::record_upstream_failure(failure.reason());
                None
            }
        }
    }

    fn assemble(
        &self,
        grid: &[TimeGridEntry],
        values: &[Option<f64>],
        run: ModelRun,
        now: DateTime<Utc>,
        fetch_stats: FetchStats,
    ) -> ForecastDocument {
        let catalog = &self.catalog;
        let per_variable = grid.len();
        let per_location = catalog.variables.len() * per_variable;

        let mut forecast = BTreeMap::new();
        for (li, location) in catalog.locations.iter().enumerate() {
            let mut series = BTreeMap::new();
            for (vi, variable) in catalog.variables.iter().enumerate() {
                let offset = li * per_location + vi * per_variable;
                let points = grid
                    .iter()
                    .zip(&values[offset..offset + per_variable])
                    .map(|(entry, value)| ForecastPoint {
                        hour: entry.local_hour,
                        value: *value,
                        date: entry.date_string(),
                    })
                    .collect();
                series.insert(variable.id.clone(), points);
            }
            forecast.insert(location.id.clone(), series);
        }

        let mut dates: Vec<String> = Vec::new();
        for entry in grid {
            let date = entry.date_string();
            if dates.last() != Some(&date) {
                dates.push(date);
            }
        }

        let locations = catalog
            .locations
            .iter()
            .map(|l| (l.id.clone(), LocationSummary::from(l)))
            .collect();

        ForecastDocument {
            forecast,
            dates,
            model_run: run.label().to_string(),
            generated_at: now,
            locations,
            fetch_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::FetchFailure;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use forecast_common::DstPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns a value derived from the layer and TIME, after a delay that
    /// varies by request so completions arrive out of order.
    struct ScriptedSource {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_layer: Option<&'static str>,
    }

    impl ScriptedSource {
        fn new(fail_layer: Option<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_layer,
            }
        }
    }

    #[async_trait]
    impl PointSource for ScriptedSource {
        fn request_url(&self, request: &GetFeatureInfoRequest) -> String {
            request.layer.clone()
        }

        async fn fetch_body(&self, request: &GetFeatureInfoRequest) -> Result<String, FetchFailure> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis((7 * n as u64) % 5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if Some(request.layer.as_str()) == self.fail_layer {
                return Err(FetchFailure::HttpStatus(502));
            }

            // Encode the UTC hour so placement can be checked
            let hour: f64 = request
                .time
                .as_deref()
                .and_then(|t| t.get(11..13))
                .and_then(|h| h.parse().ok())
                .unwrap_or(-1.0);
            Ok(format!(r#"{{"features":[{{"properties":{{"value":{}}}}}]}}"#, hour))
        }
    }

    fn aggregator(source: Arc<ScriptedSource>, concurrency: usize) -> Aggregator {
        Aggregator::new(
            source,
            Arc::new(SiteCatalog::howe_sound()),
            TimeGridGenerator::new(chrono_tz::America::Vancouver, DstPolicy::Current),
            concurrency,
        )
    }

    #[test]
    fn test_task_count_and_order() {
        let tasks = build_tasks(4, 3, 30);
        assert_eq!(tasks.len(), 360);
        assert_eq!(tasks[0], FetchTask { location: 0, variable: 0, entry: 0 });
        assert_eq!(tasks[30], FetchTask { location: 0, variable: 1, entry: 0 });
        assert_eq!(tasks[90], FetchTask { location: 1, variable: 0, entry: 0 });
    }

    #[tokio::test]
    async fn test_results_placed_by_task_not_completion() {
        let source = Arc::new(ScriptedSource::new(None));
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap();
        let doc = aggregator(source.clone(), 20).run(now, 2).await;

        assert_eq!(doc.fetch_stats.total, 360);
        assert_eq!(doc.fetch_stats.errors, 0);

        // Temperature has no conversion below 100, so the value is the UTC hour
        let series = &doc.forecast["whistler"]["temperature"];
        let utc_hours: Vec<f64> = series.iter().map(|p| p.value.unwrap()).collect();
        let expected: Vec<f64> = (7..=21).chain(7..=21).map(|h| ((h + 7) % 24) as f64).collect();
        assert_eq!(utc_hours, expected);

        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 20);
    }

    #[tokio::test]
    async fn test_one_failing_layer_nulls_only_its_cells() {
        let source = Arc::new(ScriptedSource::new(Some("HRDPS.CONTINENTAL_PN")));
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap();
        let doc = aggregator(source, 5).run(now, 1).await;

        assert_eq!(doc.fetch_stats.total, 180);
        assert_eq!(doc.fetch_stats.errors, 60);
        for location in ["pamrocks", "squamish", "whistler", "lillooet"] {
            assert!(doc.forecast[location]["pressure"].iter().all(|p| p.value.is_none()));
            assert!(doc.forecast[location]["cloud"].iter().all(|p| p.value.is_some()));
        }
    }

    #[tokio::test]
    async fn test_dates_and_metadata() {
        let source = Arc::new(ScriptedSource::new(None));
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap();
        let doc = aggregator(source, 20).run(now, 3).await;

        assert_eq!(doc.dates, vec!["2024-07-15", "2024-07-16", "2024-07-17"]);
        assert_eq!(doc.model_run, "12");
        assert_eq!(doc.generated_at, now);
        assert_eq!(doc.locations.len(), 4);
        assert_eq!(doc.locations["pamrocks"].name, "Pam Rocks");
    }

    #[tokio::test]
    async fn test_concurrency_bound_is_respected() {
        let source = Arc::new(ScriptedSource::new(None));
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap();
        aggregator(source.clone(), 3).run(now, 1).await;
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 180);
    }
}
