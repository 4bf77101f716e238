//! Value extraction against realistic GeoMet response bodies.

use test_utils::assert_approx_eq;
use test_utils::fixtures::feature_info;
use wms_protocol::{parse_feature_info_value, FeatureInfoError, GetFeatureInfoRequest};

// ============================================================================
// GeoJSON responses
// ============================================================================

#[test]
fn test_geojson_value_property() {
    let value = parse_feature_info_value(feature_info::VALUE_PASCALS).unwrap();
    assert_approx_eq!(value, 101325.0, 1e-9);
}

#[test]
fn test_geojson_pixel_property() {
    let value = parse_feature_info_value(feature_info::PIXEL_KELVIN).unwrap();
    assert_approx_eq!(value, 283.15, 1e-9);
}

#[test]
fn test_geojson_numeric_string_property() {
    let value = parse_feature_info_value(feature_info::NUMERIC_STRING_PROPERTY).unwrap();
    assert_approx_eq!(value, 0.42, 1e-9);
}

#[test]
fn test_geojson_without_features() {
    assert_eq!(
        parse_feature_info_value(feature_info::EMPTY_FEATURES),
        Err(FeatureInfoError::NoValue)
    );
}

// ============================================================================
// Error and text responses
// ============================================================================

#[test]
fn test_service_exception_marker() {
    let err = parse_feature_info_value(feature_info::SERVICE_EXCEPTION).unwrap_err();
    match err {
        FeatureInfoError::ServiceException(snippet) => {
            assert!(snippet.contains("InvalidDimensionValue"));
        }
        other => panic!("expected ServiceException, got {:?}", other),
    }
}

#[test]
fn test_plain_text_labelled_value() {
    let value = parse_feature_info_value(feature_info::PLAIN_TEXT_VALUE).unwrap();
    assert_approx_eq!(value, 1013.2, 1e-9);
}

#[test]
fn test_plain_text_bare_number() {
    let value = parse_feature_info_value(feature_info::PLAIN_BARE_NUMBER).unwrap();
    assert_approx_eq!(value, -3.46, 1e-9);
}

#[test]
fn test_garbage_body() {
    assert_eq!(
        parse_feature_info_value(feature_info::GARBAGE),
        Err(FeatureInfoError::NoValue)
    );
}

#[test]
fn test_empty_body() {
    assert_eq!(parse_feature_info_value(""), Err(FeatureInfoError::Empty));
}

// ============================================================================
// Request construction
// ============================================================================

#[test]
fn test_request_bbox_is_centred_on_point() {
    let req = GetFeatureInfoRequest::for_point("HRDPS.CONTINENTAL_NT", -122.9574, 50.1163, None);
    let bbox = req.bbox;
    assert_approx_eq!((bbox.min_x + bbox.max_x) / 2.0, -122.9574, 1e-9);
    assert_approx_eq!((bbox.min_y + bbox.max_y) / 2.0, 50.1163, 1e-9);
    assert_approx_eq!(bbox.max_x - bbox.min_x, 0.03, 1e-9);
    assert_approx_eq!(bbox.max_y - bbox.min_y, 0.03, 1e-9);
}
