//! WMS GetFeatureInfo request construction
//!
//! Builds WMS 1.1.1 point queries: a tiny 3x3 map centred on the point of
//! interest, queried at its centre pixel.

use forecast_common::bbox::{BoundingBox, POINT_QUERY_HALF_WIDTH_DEG};

pub const WMS_VERSION: &str = "1.1.1";
pub const POINT_QUERY_SRS: &str = "EPSG:4326";
/// GeoJSON is requested; plain-text answers are still understood by the parser.
pub const INFO_FORMAT: &str = "application/json";

/// Map size in pixels for point queries.
const POINT_MAP_SIZE: u32 = 3;
/// Centre pixel of the point query map.
const POINT_MAP_CENTER: u32 = 1;

/// One GetFeatureInfo point query.
#[derive(Debug, Clone, PartialEq)]
pub struct GetFeatureInfoRequest {
    /// Layer to display and query
    pub layer: String,
    /// Bounding box in lon/lat
    pub bbox: BoundingBox,
    /// Map width in pixels
    pub width: u32,
    /// Map height in pixels
    pub height: u32,
    /// Pixel column (0-based from left)
    pub x: u32,
    /// Pixel row (0-based from top)
    pub y: u32,
    /// TIME dimension value, e.g. `2024-07-15T14:00:00Z`
    pub time: Option<String>,
}

impl GetFeatureInfoRequest {
    /// Point query for `layer` at (lon, lat), optionally at a valid time.
    pub fn for_point(layer: &str, lon: f64, lat: f64, time: Option<String>) -> Self {
        Self {
            layer: layer.to_string(),
            bbox: BoundingBox::around_point(lon, lat, POINT_QUERY_HALF_WIDTH_DEG),
            width: POINT_MAP_SIZE,
            height: POINT_MAP_SIZE,
            x: POINT_MAP_CENTER,
            y: POINT_MAP_CENTER,
            time,
        }
    }

    /// KVP parameters in the order GeoMet documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("SERVICE", "WMS".to_string()),
            ("VERSION", WMS_VERSION.to_string()),
            ("REQUEST", "GetFeatureInfo".to_string()),
            ("LAYERS", self.layer.clone()),
            ("QUERY_LAYERS", self.layer.clone()),
            ("INFO_FORMAT", INFO_FORMAT.to_string()),
            ("SRS", POINT_QUERY_SRS.to_string()),
            ("BBOX", self.bbox.to_wms_string()),
            ("WIDTH", self.width.to_string()),
            ("HEIGHT", self.height.to_string()),
            ("X", self.x.to_string()),
            ("Y", self.y.to_string()),
        ];
        if let Some(time) = &self.time {
            pairs.push(("TIME", time.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(pairs: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_point_query_pairs() {
        let req = GetFeatureInfoRequest::for_point(
            "HRDPS.CONTINENTAL_TT",
            -123.1558,
            49.7016,
            Some("2024-07-15T21:00:00Z".to_string()),
        );
        let pairs = req.query_pairs();

        assert_eq!(param(&pairs, "VERSION"), Some("1.1.1"));
        assert_eq!(param(&pairs, "REQUEST"), Some("GetFeatureInfo"));
        assert_eq!(param(&pairs, "LAYERS"), Some("HRDPS.CONTINENTAL_TT"));
        assert_eq!(param(&pairs, "QUERY_LAYERS"), Some("HRDPS.CONTINENTAL_TT"));
        assert_eq!(param(&pairs, "INFO_FORMAT"), Some("application/json"));
        assert_eq!(param(&pairs, "SRS"), Some("EPSG:4326"));
        assert_eq!(
            param(&pairs, "BBOX"),
            Some("-123.170800,49.686600,-123.140800,49.716600")
        );
        assert_eq!(param(&pairs, "WIDTH"), Some("3"));
        assert_eq!(param(&pairs, "HEIGHT"), Some("3"));
        assert_eq!(param(&pairs, "X"), Some("1"));
        assert_eq!(param(&pairs, "Y"), Some("1"));
        assert_eq!(param(&pairs, "TIME"), Some("2024-07-15T21:00:00Z"));
    }

    #[test]
    fn test_time_omitted_when_absent() {
        let req = GetFeatureInfoRequest::for_point("HRDPS.CONTINENTAL_PN", 0.0, 0.0, None);
        assert!(param(&req.query_pairs(), "TIME").is_none());
    }
}
