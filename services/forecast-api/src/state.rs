//! Application state and shared resources.

use std::sync::Arc;

use anyhow::{Context, Result};
use forecast_common::{Clock, SiteCatalog, TimeGridGenerator};
use storage::{DocumentCache, DocumentStore, FileStore, MemoryStore};
use tracing::info;

use crate::aggregation::Aggregator;
use crate::config::{CacheBackend, ServiceConfig};
use crate::forecast::ForecastService;
use crate::marine::MarineService;
use crate::tide::TideService;
use crate::upstream::{GeoMetSource, UpstreamClient};

pub const MARINE_CACHE_KEY: &str = "marine";

/// Shared application state.
pub struct AppState {
    pub config: ServiceConfig,
    pub catalog: Arc<SiteCatalog>,
    pub forecast: Arc<ForecastService>,
    pub marine: Arc<MarineService>,
    pub tide: TideService,
}

fn chrono_ttl(ttl: std::time::Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(ttl).context("Cache TTL out of range")
}

impl AppState {
    pub fn new(config: ServiceConfig, catalog: SiteCatalog, clock: Arc<dyn Clock>) -> Result<Self> {
        catalog.validate()?;
        let timezone = catalog.tz()?;
        let catalog = Arc::new(catalog);

        let store: Arc<dyn DocumentStore> = match &config.cache {
            CacheBackend::File(dir) => Arc::new(FileStore::new(dir.clone())),
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
        };
        info!(backend = store.name(), cache = ?config.cache, "Document store ready");

        let client = UpstreamClient::from_config(&config).context("Failed to build HTTP client")?;

        let source = Arc::new(GeoMetSource::new(client.clone(), &config.geomet_url)?);
        let aggregator = Aggregator::new(
            source,
            catalog.clone(),
            TimeGridGenerator::new(timezone, config.dst_policy),
            config.fetch_concurrency,
        );
        let forecast_cache = DocumentCache::new(
            store.clone(),
            ForecastService::cache_key(config.default_days),
            chrono_ttl(config.forecast_ttl)?,
            clock.clone(),
        );
        let forecast = Arc::new(ForecastService::new(
            aggregator,
            forecast_cache,
            clock.clone(),
            config.default_days,
        ));

        let marine_cache = DocumentCache::new(
            store,
            MARINE_CACHE_KEY,
            chrono_ttl(config.marine_ttl)?,
            clock.clone(),
        );
        let marine = Arc::new(MarineService::new(
            client,
            &config.marine_feed_url,
            marine_cache,
            clock.clone(),
        )?);

        let tide = TideService::new(
            config.tide_csv.clone(),
            catalog.tide_station.clone(),
            timezone,
            clock,
        );

        Ok(Self {
            config,
            catalog,
            forecast,
            marine,
            tide,
        })
    }
}
