//! Canned upstream payloads for forecast proxy tests.
//!
//! Bodies mirror the shapes GeoMet and weather.gc.ca actually return so the
//! parsers are exercised against realistic input.

/// GetFeatureInfo response bodies.
pub mod feature_info {
    /// GeoJSON with a `value` property (Pa).
    pub const VALUE_PASCALS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "HRDPS.CONTINENTAL_PN",
      "geometry": {"type": "Point", "coordinates": [-123.1558, 49.7016]},
      "properties": {"value": 101325.0}
    }
  ]
}"#;

    /// GeoJSON with a `pixel` property (Kelvin).
    pub const PIXEL_KELVIN: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"pixel": 283.15}}
  ]
}"#;

    /// GeoJSON whose only numeric property is a string under an arbitrary key.
    pub const NUMERIC_STRING_PROPERTY: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"layer": "HRDPS.CONTINENTAL_NT", "Band 1": "0.42", "other": 5}}
  ]
}"#;

    /// GeoJSON with no features (point outside the domain).
    pub const EMPTY_FEATURES: &str = r#"{"type": "FeatureCollection", "features": []}"#;

    /// WMS exception report, returned with HTTP 200.
    pub const SERVICE_EXCEPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.1.1">
  <ServiceException code="InvalidDimensionValue">
    msWMSLoadGetMapParams(): Time value out of range for layer HRDPS.CONTINENTAL_PN
  </ServiceException>
</ServiceExceptionReport>"#;

    /// Plain-text feature info with a `value = n` line.
    pub const PLAIN_TEXT_VALUE: &str = "GetFeatureInfo results:\n\nLayer 'HRDPS.CONTINENTAL_PN'\n  Feature 0:\n  value = 1013.2\n";

    /// Plain-text feature info where the value sits alone on a line.
    pub const PLAIN_BARE_NUMBER: &str = "Results for HRDPS.CONTINENTAL_TT\n-3.46\n";

    /// HTML error page with no usable number.
    pub const GARBAGE: &str = "<html><body>Bad Gateway</body></html>";
}

/// Environment Canada marine Atom feeds.
pub mod marine {
    /// Howe Sound feed with one entry for each section plus a duplicate winds entry.
    pub const HOWE_SOUND_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="en-ca">
  <title>Howe Sound - Marine Weather - Environment Canada</title>
  <updated>2024-07-15T16:00:00Z</updated>
  <author><name>Environment and Climate Change Canada</name></author>
  <entry>
    <title>Strong wind warning in effect</title>
    <updated>2024-07-15T15:30:00Z</updated>
    <summary type="html">&lt;p&gt;Strong wind warning in effect.&lt;/p&gt;&lt;p&gt;Issued 08:30 AM PDT&lt;/p&gt;</summary>
  </entry>
  <entry>
    <title>Winds - Howe Sound (early)</title>
    <updated>2024-07-15T10:30:00Z</updated>
    <summary type="html">Outdated winds.</summary>
  </entry>
  <entry>
    <title>Winds - Howe Sound</title>
    <updated>2024-07-15T15:30:00Z</updated>
    <summary type="html">&lt;p&gt;Wind  light   increasing to southwest 15 to 20 knots this afternoon.&lt;br/&gt;Wind diminishing to light  this evening.&lt;/p&gt;
    &lt;p&gt;Stay connected with WeatherCAN&lt;/p&gt;&lt;p&gt;Footer junk&lt;/p&gt;</summary>
  </entry>
  <entry>
    <title>Weather and Visibility - Howe Sound</title>
    <updated>2024-07-15T15:30:00Z</updated>
    <summary type="html"><![CDATA[<p>Mainly sunny.</p><p>Fog patches &amp; haze near dawn.</p>]]></summary>
  </entry>
  <entry>
    <title>Extended Forecast - Howe Sound</title>
    <updated>2024-07-15T15:30:00Z</updated>
    <summary type="html">&lt;p&gt;Wednesday&lt;br&gt;Wind northwest 10 knots.&lt;/p&gt;</summary>
  </entry>
  <entry>
    <title>Tides - Point Atkinson</title>
    <updated>2024-07-15T15:30:00Z</updated>
    <summary type="html">Not a marine section.</summary>
  </entry>
</feed>"#;

    /// Feed with no entries.
    pub const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Howe Sound - Marine Weather - Environment Canada</title>
  <updated>2024-07-15T16:00:00Z</updated>
</feed>"#;

    /// Truncated document that fails to parse.
    pub const MALFORMED_FEED: &str = r#"<?xml version="1.0"?><feed><title>Howe Sound</title><entry><title>Winds</entry></feed>"#;
}

/// CHS tide prediction CSV header (seven rows before data).
pub const TIDE_CSV_HEADER: &str = "Station Name,Squamish Inner\n\
Station Number,07811\n\
Latitude,49.694\n\
Longitude,-123.155\n\
Datum,Chart Datum\n\
Time Zone,PST/PDT\n\
Date/Time,Predictions (m)\n";
