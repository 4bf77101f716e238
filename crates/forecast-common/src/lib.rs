//! Common types and utilities shared across the forecast proxy crates.

pub mod bbox;
pub mod catalog;
pub mod document;
pub mod error;
pub mod grid;
pub mod time;
pub mod units;

pub use bbox::BoundingBox;
pub use catalog::{Location, SiteCatalog, Variable};
pub use document::{ErrorDocument, FetchStats, ForecastDocument, ForecastPoint, LocationSummary};
pub use error::{ForecastError, ForecastResult};
pub use grid::{DstPolicy, TimeGridEntry, TimeGridGenerator};
pub use time::{Clock, FixedClock, ModelRun, ResolvedRun, SystemClock};
pub use units::UnitConversion;
