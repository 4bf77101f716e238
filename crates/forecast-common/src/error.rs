//! Error types for the forecast proxy crates.

use thiserror::Error;

/// Result type alias using ForecastError.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Primary error type for configuration and serialization failures.
///
/// Upstream and tide-file failures are not represented here: they become
/// `null` cells or `{"error": ...}` documents and never surface as errors.
#[derive(Debug, Error)]
pub enum ForecastError {
    // === Configuration Errors ===
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid site catalog: {0}")]
    InvalidCatalog(String),

    // === Infrastructure Errors ===
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(format!("JSON error: {}", err))
    }
}
