//! Howe Sound forecast proxy service library.
//!
//! This crate provides the HTTP server implementation and the pipelines
//! behind it: HRDPS point forecasts aggregated from GeoMet, the marine
//! bulletin feed and the local tide table.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod forecast;
pub mod handlers;
pub mod marine;
pub mod metrics;
pub mod scheduler;
pub mod state;
pub mod tide;
pub mod upstream;

pub use config::{Args, CacheBackend, ServiceConfig};
pub use error::ApiError;
pub use state::AppState;
