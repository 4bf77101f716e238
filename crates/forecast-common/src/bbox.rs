//! Bounding box types for point queries.

use serde::{Deserialize, Serialize};

/// Half-width in degrees of the box built around a sampled point.
pub const POINT_QUERY_HALF_WIDTH_DEG: f64 = 0.015;

/// A geographic bounding box in degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Square box centred on a point, `half_width` degrees to each side.
    pub fn around_point(lon: f64, lat: f64, half_width: f64) -> Self {
        Self {
            min_x: lon - half_width,
            min_y: lat - half_width,
            max_x: lon + half_width,
            max_y: lat + half_width,
        }
    }

    /// Format as a WMS 1.1.1 BBOX value (lon,lat order for EPSG:4326).
    pub fn to_wms_string(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_around_point() {
        let bbox = BoundingBox::around_point(-123.1558, 49.7016, POINT_QUERY_HALF_WIDTH_DEG);
        assert!((bbox.max_x - bbox.min_x - 0.03).abs() < 1e-9);
        assert!((bbox.max_y - bbox.min_y - 0.03).abs() < 1e-9);
        assert!(((bbox.min_x + bbox.max_x) / 2.0 + 123.1558).abs() < 1e-9);
        assert!(((bbox.min_y + bbox.max_y) / 2.0 - 49.7016).abs() < 1e-9);
    }

    #[test]
    fn test_wms_string_lon_lat_order() {
        let bbox = BoundingBox::around_point(-123.0, 49.0, 0.015);
        assert_eq!(bbox.to_wms_string(), "-123.015000,48.985000,-122.985000,49.015000");
    }
}
