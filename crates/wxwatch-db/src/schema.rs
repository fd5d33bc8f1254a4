//! Database schema types for observation and summary tables

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use wxwatch_core::{DailySummary, Observation};

use crate::DbError;

/// Observation table record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ObservationRow {
    pub id: i64,
    pub location: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub wind_speed: f64,
    #[sqlx(rename = "weather_condition")]
    pub condition: String,
    /// Unix epoch seconds
    pub observed_at: i64,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Observation {
            location: row.location,
            temperature: row.temperature,
            feels_like: row.feels_like,
            humidity: row.humidity,
            wind_speed: row.wind_speed,
            condition: row.condition,
            observed_at: row.observed_at,
        }
    }
}

/// Daily summary table record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailySummaryRow {
    pub id: i64,
    pub location: String,
    pub summary_date: NaiveDate,
    pub avg_temperature: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub dominant_condition: String,
    pub observation_count: i32,
}

impl TryFrom<DailySummaryRow> for DailySummary {
    type Error = DbError;

    fn try_from(row: DailySummaryRow) -> Result<Self, Self::Error> {
        let observation_count = u32::try_from(row.observation_count).map_err(|_| {
            DbError::InvalidRow(format!(
                "negative observation_count {} for summary {}",
                row.observation_count, row.id
            ))
        })?;

        Ok(DailySummary {
            location: row.location,
            date: row.summary_date,
            avg_temperature: row.avg_temperature,
            max_temperature: row.max_temperature,
            min_temperature: row.min_temperature,
            dominant_condition: row.dominant_condition,
            observation_count,
        })
    }
}

/// Table definitions applied by `DbClient::open`
///
/// `daily_summary` has no unique key on (location, summary_date) so the
/// append write mode can keep duplicates; upserts replace inside a
/// transaction instead.
pub const DDL: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS observations (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        location VARCHAR(128) NOT NULL,
        temperature DOUBLE NOT NULL,
        feels_like DOUBLE NOT NULL,
        humidity INT NOT NULL,
        wind_speed DOUBLE NOT NULL,
        weather_condition VARCHAR(64) NOT NULL,
        observed_at BIGINT NOT NULL,
        INDEX idx_observations_location_time (location, observed_at),
        INDEX idx_observations_time (observed_at)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS daily_summary (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        location VARCHAR(128) NOT NULL,
        summary_date DATE NOT NULL,
        avg_temperature DOUBLE NOT NULL,
        max_temperature DOUBLE NOT NULL,
        min_temperature DOUBLE NOT NULL,
        dominant_condition VARCHAR(64) NOT NULL,
        observation_count INT NOT NULL,
        INDEX idx_daily_summary_key (location, summary_date)
    )
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversions() {
        let row = ObservationRow {
            id: 7,
            location: "Noida".into(),
            temperature: 28.4,
            feels_like: 30.0,
            humidity: 55,
            wind_speed: 2.5,
            condition: "Smoke".into(),
            observed_at: 1_700_000_000,
        };
        let obs = Observation::from(row);
        assert_eq!(obs.location, "Noida");
        assert_eq!(obs.condition, "Smoke");

        let bad = DailySummaryRow {
            id: 3,
            location: "Noida".into(),
            summary_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            avg_temperature: 1.0,
            max_temperature: 1.0,
            min_temperature: 1.0,
            dominant_condition: "Mist".into(),
            observation_count: -1,
        };
        assert!(DailySummary::try_from(bad).is_err());
    }
}
