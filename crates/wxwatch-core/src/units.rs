//! Unit conversion utilities
//!
//! The provider reports temperatures in Kelvin; everything stored is °C.
//! Fahrenheit only exists at the read boundary.

use std::fmt;
use std::str::FromStr;

/// Absolute zero expressed in °C
pub const ABSOLUTE_ZERO_CELSIUS: f64 = -273.15;

/// Unit conversion error
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("Unknown unit system: {0}")]
    UnknownUnitSystem(String),
}

/// Temperature unit requested by a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemperatureUnit {
    #[default]
    Metric,
    Imperial,
}

impl TemperatureUnit {
    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Metric => "°C",
            TemperatureUnit::Imperial => "°F",
        }
    }

    /// Convert a stored °C value into this unit
    pub fn from_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Metric => celsius,
            TemperatureUnit::Imperial => celsius_to_fahrenheit(celsius),
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metric" | "celsius" => Ok(TemperatureUnit::Metric),
            "imperial" | "fahrenheit" => Ok(TemperatureUnit::Imperial),
            other => Err(UnitError::UnknownUnitSystem(other.to_string())),
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureUnit::Metric => f.write_str("metric"),
            TemperatureUnit::Imperial => f.write_str("imperial"),
        }
    }
}

/// Kelvin to Celsius
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - 273.15
}

/// Celsius to Fahrenheit
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
