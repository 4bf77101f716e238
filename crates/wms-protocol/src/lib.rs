//! OGC WMS GetFeatureInfo point queries.
//!
//! Supports:
//! - WMS 1.1.1 GetFeatureInfo request construction (EPSG:4326, lon/lat axis order)
//! - Value extraction from GeoJSON and plain-text feature info responses

pub mod feature_value;
pub mod getfeatureinfo;

pub use feature_value::{parse_feature_info_value, FeatureInfoError};
pub use getfeatureinfo::GetFeatureInfoRequest;
