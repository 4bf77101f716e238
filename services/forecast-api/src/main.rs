//! Howe Sound forecast proxy.
//!
//! Serves HRDPS point forecasts, the marine bulletin and the tide table as
//! JSON for the charting front-end.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use forecast_common::SystemClock;
use tokio::sync::broadcast;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use forecast_api::config::load_site_catalog;
use forecast_api::scheduler::PrefetchScheduler;
use forecast_api::{handlers, metrics, AppState, Args, ServiceConfig};

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build tokio runtime with configurable worker threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads.max(1));
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))?;
    Ok(())
}

async fn async_main(args: Args) -> Result<()> {
    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(threads) = args.worker_threads {
        info!(worker_threads = threads, "Configured tokio runtime");
    }

    let prometheus_handle = metrics::install_recorder().context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    let config = ServiceConfig::from_args(&args);
    let catalog = load_site_catalog(&args.sites)?;
    let state = Arc::new(AppState::new(config, catalog, Arc::new(SystemClock))?);

    info!(
        geomet = %state.config.geomet_url,
        marine_feed = %state.config.marine_feed_url,
        tide_csv = %state.config.tide_csv.display(),
        default_days = state.config.default_days,
        dst_policy = %state.config.dst_policy,
        "Starting forecast proxy"
    );

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    if args.prefetch {
        let scheduler = PrefetchScheduler::new(
            state.forecast.clone(),
            state.marine.clone(),
            Arc::new(SystemClock),
            state.catalog.tz()?,
        );
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            scheduler.run_forever(shutdown).await;
        });
        info!("Prefetch scheduler started");
    }

    let app = handlers::router(state, Some(prometheus_handle));

    // Parse listen address
    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let mut shutdown = shutdown_tx.subscribe();
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
        })
        .await
    {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}
