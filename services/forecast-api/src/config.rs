//! Service configuration: command line, environment and the site file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use forecast_common::grid::{clamp_days, DEFAULT_DAYS};
use forecast_common::{DstPolicy, SiteCatalog};
use tracing::{info, warn};

pub const DEFAULT_GEOMET_URL: &str = "https://geo.weather.gc.ca/geomet";
pub const DEFAULT_MARINE_FEED_URL: &str = "https://weather.gc.ca/rss/marine/06400_e.xml";
pub const USER_AGENT: &str = "HoweSoundForecast/1.0";

#[derive(Parser, Debug, Clone)]
#[command(name = "forecast-api")]
#[command(about = "Howe Sound forecast proxy")]
pub struct Args {
    /// Listen address
    #[arg(short, long, env = "FORECAST_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TOKIO_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    /// Site catalog (timezone, locations, variables)
    #[arg(long, env = "SITES_CONFIG", default_value = "config/sites.yaml")]
    pub sites: PathBuf,

    /// Directory for cached documents
    #[arg(long, env = "CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Keep cached documents in memory instead of on disk
    #[arg(long, env = "MEMORY_CACHE")]
    pub memory_cache: bool,

    /// CHS tide prediction CSV
    #[arg(long, env = "TIDE_CSV", default_value = "data/07811_data.csv")]
    pub tide_csv: PathBuf,

    /// GeoMet WMS endpoint
    #[arg(long, env = "GEOMET_URL", default_value = DEFAULT_GEOMET_URL)]
    pub geomet_url: String,

    /// Marine forecast Atom feed
    #[arg(long, env = "MARINE_FEED_URL", default_value = DEFAULT_MARINE_FEED_URL)]
    pub marine_feed_url: String,

    /// Per-request upstream timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Maximum concurrent GeoMet requests per aggregation pass
    #[arg(long, env = "FETCH_CONCURRENCY", default_value_t = 20)]
    pub fetch_concurrency: usize,

    /// Forecast horizon used when a request gives none
    #[arg(long, env = "DEFAULT_DAYS", default_value_t = DEFAULT_DAYS)]
    pub default_days: usize,

    /// Forecast cache freshness in seconds
    #[arg(long, env = "FORECAST_CACHE_TTL_SECS", default_value_t = 10800)]
    pub forecast_ttl_secs: u64,

    /// Marine cache freshness in seconds
    #[arg(long, env = "MARINE_CACHE_TTL_SECS", default_value_t = 3600)]
    pub marine_ttl_secs: u64,

    /// UTC offset policy for the time grid (current or per_day)
    #[arg(long, env = "DST_POLICY", default_value = "current")]
    pub dst_policy: DstPolicy,

    /// Refresh forecast and marine caches on a fixed schedule
    #[arg(long, env = "PREFETCH")]
    pub prefetch: bool,
}

/// Where cached documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    File(PathBuf),
    Memory,
}

/// Resolved runtime configuration, independent of how it was supplied.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub geomet_url: String,
    pub marine_feed_url: String,
    pub tide_csv: PathBuf,
    pub cache: CacheBackend,
    pub request_timeout: Duration,
    pub fetch_concurrency: usize,
    pub default_days: usize,
    pub forecast_ttl: Duration,
    pub marine_ttl: Duration,
    pub dst_policy: DstPolicy,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            geomet_url: DEFAULT_GEOMET_URL.to_string(),
            marine_feed_url: DEFAULT_MARINE_FEED_URL.to_string(),
            tide_csv: PathBuf::from("data/07811_data.csv"),
            cache: CacheBackend::File(PathBuf::from("cache")),
            request_timeout: Duration::from_secs(15),
            fetch_concurrency: 20,
            default_days: DEFAULT_DAYS,
            forecast_ttl: Duration::from_secs(10800),
            marine_ttl: Duration::from_secs(3600),
            dst_policy: DstPolicy::Current,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_args(args: &Args) -> Self {
        let cache = if args.memory_cache {
            CacheBackend::Memory
        } else {
            CacheBackend::File(args.cache_dir.clone())
        };

        Self {
            geomet_url: args.geomet_url.clone(),
            marine_feed_url: args.marine_feed_url.clone(),
            tide_csv: args.tide_csv.clone(),
            cache,
            request_timeout: Duration::from_secs(args.request_timeout_secs.max(1)),
            fetch_concurrency: args.fetch_concurrency.max(1),
            default_days: clamp_days(args.default_days as i64),
            forecast_ttl: Duration::from_secs(args.forecast_ttl_secs),
            marine_ttl: Duration::from_secs(args.marine_ttl_secs),
            dst_policy: args.dst_policy,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Load the site catalog from YAML, falling back to the built-in
/// Howe Sound sites when the file does not exist.
pub fn load_site_catalog(path: &Path) -> Result<SiteCatalog> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Site config does not exist, using built-in Howe Sound sites"
        );
        return Ok(SiteCatalog::howe_sound());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read site config: {}", path.display()))?;
    let catalog = SiteCatalog::from_yaml_str(&content)
        .with_context(|| format!("Failed to parse site config: {}", path.display()))?;

    info!(
        path = %path.display(),
        locations = catalog.locations.len(),
        variables = catalog.variables.len(),
        timezone = %catalog.timezone,
        "Loaded site catalog"
    );
    Ok(catalog)
}
