//! Simulated provider for running without an API key

use crate::{FetchResult, WeatherProvider};
use std::time::{SystemTime, UNIX_EPOCH};
use wxwatch_core::{kelvin_to_celsius, Observation};

const CONDITIONS: [&str; 5] = ["Clear", "Clouds", "Haze", "Rain", "Mist"];

/// Provider that generates synthetic readings
pub struct SimulatedProvider {
    base_kelvin: f64,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self {
            base_kelvin: 300.15, // 27°C
        }
    }

    /// Build a reading for `location` at `now` (Unix seconds)
    pub fn generate(&self, location: &str, now: i64) -> Observation {
        // Stable per-location offset so cities differ from each other
        let seed: i64 = location.bytes().map(i64::from).sum();

        // Pseudo-random variation in [-5, 5)
        let variation = (((now + seed) % 100) as f64 / 10.0) - 5.0;
        let temp_kelvin = self.base_kelvin + variation + (seed % 7) as f64;
        let condition = CONDITIONS[((now / 600 + seed) % CONDITIONS.len() as i64) as usize];

        Observation {
            location: location.to_string(),
            temperature: kelvin_to_celsius(temp_kelvin),
            feels_like: kelvin_to_celsius(temp_kelvin + variation.abs() / 2.0),
            humidity: (55.0 + variation * 3.0).round() as i32,
            wind_speed: 2.0 + variation.abs(),
            condition: condition.to_string(),
            observed_at: now,
        }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WeatherProvider for SimulatedProvider {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn fetch_current(&self, location: &str) -> FetchResult<Observation> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        Ok(self.generate(location, now))
    }
}
