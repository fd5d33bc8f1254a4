//! Core data types for weather observations

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::units::ABSOLUTE_ZERO_CELSIUS;

/// Timestamp type (Unix epoch seconds)
pub type Timestamp = i64;

/// Point-in-time weather reading for one location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    /// Location identifier (city name as sent to the provider)
    pub location: String,

    /// Air temperature in °C
    pub temperature: f64,

    /// Apparent temperature in °C
    pub feels_like: f64,

    /// Relative humidity in percent
    pub humidity: i32,

    /// Wind speed in m/s
    pub wind_speed: f64,

    /// Short condition label ("Clear", "Rain", ...)
    pub condition: String,

    /// Unix timestamp of the fetch
    pub observed_at: Timestamp,
}

/// Reading below absolute zero (or NaN); never persisted
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("implausible reading for {location}: temperature={temperature}, feels_like={feels_like}")]
pub struct ImplausibleReading {
    pub location: String,
    pub temperature: f64,
    pub feels_like: f64,
}

impl Observation {
    /// Check the physical-plausibility invariant
    pub fn check_plausible(&self) -> Result<(), ImplausibleReading> {
        // NaN compares false, so it is rejected as well
        let plausible = |celsius: f64| celsius >= ABSOLUTE_ZERO_CELSIUS;
        if !plausible(self.temperature) || !plausible(self.feels_like) {
            return Err(ImplausibleReading {
                location: self.location.clone(),
                temperature: self.temperature,
                feels_like: self.feels_like,
            });
        }
        Ok(())
    }
}

/// Per-location aggregate for one calendar day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    pub location: String,
    pub date: NaiveDate,
    pub avg_temperature: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub dominant_condition: String,
    pub observation_count: u32,
}

/// Half-open `[start, end)` window covering `day` in the given time zone
///
/// Falls back to UTC midnight when local midnight does not exist.
pub fn day_bounds<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> (Timestamp, Timestamp) {
    let start_of = |d: NaiveDate| -> Timestamp {
        let midnight = d.and_time(NaiveTime::MIN);
        tz.from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| midnight.and_utc().timestamp())
    };
    let next = day + Duration::days(1);
    (start_of(day), start_of(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn obs(temperature: f64, feels_like: f64) -> Observation {
        Observation {
            location: "Delhi".to_string(),
            temperature,
            feels_like,
            humidity: 40,
            wind_speed: 3.1,
            condition: "Haze".to_string(),
            observed_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_plausibility_bounds() {
        assert!(obs(25.0, 27.0).check_plausible().is_ok());
        assert!(obs(-273.15, -273.15).check_plausible().is_ok());
        assert!(obs(-273.16, 0.0).check_plausible().is_err());
        assert!(obs(0.0, -300.0).check_plausible().is_err());
        assert!(obs(f64::NAN, 0.0).check_plausible().is_err());
    }

    #[test]
    fn test_observation_serde() {
        let json = r#"{"location":"Pune","temperature":24.5,"feels_like":25.0,
            "humidity":60,"wind_speed":2.0,"condition":"Clouds","observed_at":1700000000}"#;
        let o: Observation = serde_json::from_str(json).unwrap();
        assert_eq!(o.location, "Pune");
        assert_eq!(o.humidity, 60);
        assert_eq!(o.observed_at, 1_700_000_000);
    }

    #[test]
    fn test_day_bounds_utc() {
        let day = NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
        let (start, end) = day_bounds(day, &Utc);
        assert_eq!(start, 1_699_920_000);
        assert_eq!(end - start, 86_400);
    }

    #[test]
    fn test_day_bounds_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let day = NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
        let (start, _) = day_bounds(day, &ist);
        assert_eq!(start, 1_699_920_000 - 19_800);
    }
}
