//! Static site catalog: reference timezone, sampled locations and variables.
//!
//! The catalog is built once at startup (from the built-in defaults or a
//! YAML file) and shared read-only afterwards.

use std::collections::HashSet;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};
use crate::units::UnitConversion;

pub const DEFAULT_TIMEZONE: &str = "America/Vancouver";
pub const DEFAULT_TIDE_STATION: &str = "Squamish Inner (07811)";

/// A fixed geographic sampling point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(id: &str, name: &str, lat: f64, lon: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lon,
        }
    }
}

/// A forecast variable and the upstream layer it is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub layer: String,
    #[serde(default)]
    pub conversion: UnitConversion,
}

impl Variable {
    pub fn new(id: &str, layer: &str, conversion: UnitConversion) -> Self {
        Self {
            id: id.to_string(),
            layer: layer.to_string(),
            conversion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCatalog {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub locations: Vec<Location>,
    pub variables: Vec<Variable>,
    #[serde(default = "default_tide_station")]
    pub tide_station: String,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_tide_station() -> String {
    DEFAULT_TIDE_STATION.to_string()
}

impl Default for SiteCatalog {
    fn default() -> Self {
        Self::howe_sound()
    }
}

impl SiteCatalog {
    /// Built-in Howe Sound corridor catalog.
    pub fn howe_sound() -> Self {
        Self {
            timezone: default_timezone(),
            locations: vec![
                Location::new("pamrocks", "Pam Rocks", 49.4883, -123.2983),
                Location::new("squamish", "Squamish", 49.7016, -123.1558),
                Location::new("whistler", "Whistler", 50.1163, -122.9574),
                Location::new("lillooet", "Lillooet", 50.6868, -121.9422),
            ],
            variables: vec![
                Variable::new("pressure", "HRDPS.CONTINENTAL_PN", UnitConversion::Pressure),
                Variable::new("temperature", "HRDPS.CONTINENTAL_TT", UnitConversion::Temperature),
                Variable::new("cloud", "HRDPS.CONTINENTAL_NT", UnitConversion::CloudFraction),
            ],
            tide_station: default_tide_station(),
        }
    }

    /// Parse a catalog from YAML and validate it.
    pub fn from_yaml_str(yaml: &str) -> ForecastResult<Self> {
        let catalog: SiteCatalog = serde_yaml::from_str(yaml)
            .map_err(|e| ForecastError::InvalidCatalog(format!("YAML parse error: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Resolved reference timezone.
    pub fn tz(&self) -> ForecastResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ForecastError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }

    /// Check timezone, non-empty lists and unique ids.
    pub fn validate(&self) -> ForecastResult<()> {
        self.tz()?;

        if self.locations.is_empty() {
            return Err(ForecastError::InvalidCatalog("no locations defined".into()));
        }
        if self.variables.is_empty() {
            return Err(ForecastError::InvalidCatalog("no variables defined".into()));
        }

        let mut seen = HashSet::new();
        for location in &self.locations {
            if location.id.is_empty() {
                return Err(ForecastError::InvalidCatalog("location with empty id".into()));
            }
            if !seen.insert(location.id.as_str()) {
                return Err(ForecastError::InvalidCatalog(format!(
                    "duplicate location id '{}'",
                    location.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for variable in &self.variables {
            if variable.id.is_empty() || variable.layer.is_empty() {
                return Err(ForecastError::InvalidCatalog(
                    "variable with empty id or layer".into(),
                ));
            }
            if !seen.insert(variable.id.as_str()) {
                return Err(ForecastError::InvalidCatalog(format!(
                    "duplicate variable id '{}'",
                    variable.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = SiteCatalog::howe_sound();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.locations.len(), 4);
        assert_eq!(catalog.variables.len(), 3);
        assert_eq!(catalog.tz().unwrap(), chrono_tz::America::Vancouver);
        assert_eq!(catalog.location("whistler").unwrap().name, "Whistler");
        assert_eq!(
            catalog.variable("cloud").unwrap().layer,
            "HRDPS.CONTINENTAL_NT"
        );
    }

    #[test]
    fn test_yaml_catalog() {
        let yaml = r#"
timezone: America/Edmonton
locations:
  - id: banff
    name: Banff
    lat: 51.1784
    lon: -115.5708
variables:
  - id: temperature
    layer: HRDPS.CONTINENTAL_TT
    conversion: temperature
"#;
        let catalog = SiteCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.timezone, "America/Edmonton");
        assert_eq!(catalog.tide_station, DEFAULT_TIDE_STATION);
        assert_eq!(catalog.variables[0].conversion, UnitConversion::Temperature);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut catalog = SiteCatalog::howe_sound();
        catalog.locations.push(Location::new("squamish", "Again", 0.0, 0.0));
        assert!(matches!(
            catalog.validate(),
            Err(ForecastError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let mut catalog = SiteCatalog::howe_sound();
        catalog.timezone = "Mars/Olympus".into();
        assert!(matches!(
            catalog.validate(),
            Err(ForecastError::UnknownTimezone(_))
        ));
    }
}
