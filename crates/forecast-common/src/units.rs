//! Unit normalization for raw upstream values.
//!
//! GeoMet has served the same layer in different units over time. The
//! thresholds below decide which convention a raw value is in; they are
//! policy, not physical constants.

use serde::{Deserialize, Serialize};

/// Raw pressure above this is taken to be Pa, otherwise hPa.
pub const PASCAL_THRESHOLD: f64 = 10_000.0;

/// Raw temperature above this is taken to be Kelvin, otherwise Celsius.
pub const KELVIN_THRESHOLD: f64 = 100.0;

/// Raw cloud cover at or below this is taken to be a 0-1 fraction, otherwise percent.
pub const FRACTION_THRESHOLD: f64 = 1.0;

const KELVIN_OFFSET: f64 = 273.15;

/// Conversion rule attached to a forecast variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitConversion {
    /// Pa or hPa → hPa, 1 decimal
    Pressure,
    /// K or °C → °C, 1 decimal
    Temperature,
    /// fraction or % → %, integer
    CloudFraction,
    /// Passed through unchanged
    #[default]
    None,
}

impl UnitConversion {
    /// Rule for one of the built-in variable ids.
    pub fn for_variable_id(id: &str) -> Self {
        match id {
            "pressure" => UnitConversion::Pressure,
            "temperature" => UnitConversion::Temperature,
            "cloud" => UnitConversion::CloudFraction,
            _ => UnitConversion::None,
        }
    }

    /// Convert a raw value to its display unit and round it.
    pub fn normalize(&self, raw: f64) -> f64 {
        match self {
            UnitConversion::Pressure => {
                if raw > PASCAL_THRESHOLD {
                    round_to(raw / 100.0, 1)
                } else {
                    round_to(raw, 1)
                }
            }
            UnitConversion::Temperature => {
                if raw > KELVIN_THRESHOLD {
                    round_to(raw - KELVIN_OFFSET, 1)
                } else {
                    round_to(raw, 1)
                }
            }
            UnitConversion::CloudFraction => {
                if raw <= FRACTION_THRESHOLD {
                    round_half_up(raw * 100.0)
                } else {
                    round_half_up(raw)
                }
            }
            UnitConversion::None => raw,
        }
    }
}

/// Normalize a raw value for a variable id (`pressure`, `temperature`, `cloud`).
pub fn normalize(variable_id: &str, raw: f64) -> f64 {
    UnitConversion::for_variable_id(variable_id).normalize(raw)
}

/// Halves round toward positive infinity, so -2.25 becomes -2.2.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    round_half_up(value * factor) / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_pascals_to_hpa() {
        assert_eq!(normalize("pressure", 101325.0), 1013.3);
    }

    #[test]
    fn test_pressure_already_hpa() {
        assert_eq!(normalize("pressure", 1013.2), 1013.2);
        assert_eq!(normalize("pressure", 1013.24), 1013.2);
    }

    #[test]
    fn test_temperature_kelvin_to_celsius() {
        assert_eq!(normalize("temperature", 283.15), 10.0);
    }

    #[test]
    fn test_temperature_already_celsius() {
        assert_eq!(normalize("temperature", 10.0), 10.0);
        assert_eq!(normalize("temperature", -3.46), -3.5);
    }

    #[test]
    fn test_negative_ties_round_up() {
        assert_eq!(normalize("temperature", -2.25), -2.2);
        assert_eq!(normalize("temperature", 2.25), 2.3);
    }

    #[test]
    fn test_cloud_fraction_to_percent() {
        assert_eq!(normalize("cloud", 0.42), 42.0);
        assert_eq!(normalize("cloud", 1.0), 100.0);
        assert_eq!(normalize("cloud", 0.0), 0.0);
    }

    #[test]
    fn test_cloud_already_percent() {
        assert_eq!(normalize("cloud", 75.0), 75.0);
        assert_eq!(normalize("cloud", 74.6), 75.0);
    }

    #[test]
    fn test_threshold_boundaries() {
        // Exactly at the threshold stays in the "already converted" branch
        assert_eq!(UnitConversion::Pressure.normalize(10_000.0), 10_000.0);
        assert_eq!(UnitConversion::Temperature.normalize(100.0), 100.0);
        // Exactly 1.0 is a fraction
        assert_eq!(UnitConversion::CloudFraction.normalize(1.0), 100.0);
    }

    #[test]
    fn test_unknown_variable_passes_through() {
        assert_eq!(normalize("wind", 12.345), 12.345);
    }

    #[test]
    fn test_rule_deserializes_snake_case() {
        let rule: UnitConversion = serde_json::from_str("\"cloud_fraction\"").unwrap();
        assert_eq!(rule, UnitConversion::CloudFraction);
    }
}
