//! Daily aggregation over the observation store

use crate::{ArchiveError, ArchiveResult};
use chrono::{NaiveDate, TimeZone};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument};
use wxwatch_core::{day_bounds, summarize_day, DailySummary, ObservationStore};

/// How a recomputed summary meets an existing one for the same day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryWriteMode {
    /// Replace any summary for (location, date)
    #[default]
    Upsert,
    /// Always insert; reruns leave duplicates
    Append,
}

impl FromStr for SummaryWriteMode {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upsert" => Ok(SummaryWriteMode::Upsert),
            "append" => Ok(SummaryWriteMode::Append),
            other => Err(ArchiveError::InvalidWriteMode(other.to_string())),
        }
    }
}

/// A summary that was computed but could not be written
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFailure {
    pub location: String,
    pub message: String,
}

/// Outcome of one aggregation run
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationReport {
    pub day: NaiveDate,
    pub persisted: Vec<DailySummary>,
    pub failed: Vec<SummaryFailure>,
}

/// Computes and stores per-location daily summaries
#[derive(Clone)]
pub struct DailyAggregator {
    store: Arc<dyn ObservationStore>,
    mode: SummaryWriteMode,
}

impl DailyAggregator {
    pub fn new(store: Arc<dyn ObservationStore>, mode: SummaryWriteMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> SummaryWriteMode {
        self.mode
    }

    /// Summarise every location observed during `day` in `tz`
    ///
    /// Each summary is written on its own; a failed write is recorded in
    /// the report and the remaining locations are still written.
    #[instrument(skip(self, tz))]
    pub async fn run_for_day<Tz: TimeZone>(
        &self,
        day: NaiveDate,
        tz: &Tz,
    ) -> ArchiveResult<AggregationReport> {
        let (from, to) = day_bounds(day, tz);
        let observations = self
            .store
            .query_range(None, from, to)
            .await
            .map_err(|e| ArchiveError::Query {
                day,
                message: format!("{:#}", e),
            })?;

        let summaries = summarize_day(&observations, day);
        info!(
            "Aggregating {} observations into {} summaries",
            observations.len(),
            summaries.len()
        );

        let mut report = AggregationReport {
            day,
            persisted: Vec::with_capacity(summaries.len()),
            failed: Vec::new(),
        };

        for summary in summaries {
            let written = match self.mode {
                SummaryWriteMode::Upsert => self.store.upsert_summary(&summary).await,
                SummaryWriteMode::Append => self.store.append_summary(&summary).await,
            };

            match written {
                Ok(()) => {
                    info!(location = %summary.location, "Daily summary saved");
                    report.persisted.push(summary);
                }
                Err(e) => {
                    error!(location = %summary.location, error = %e, "Failed to save daily summary");
                    report.failed.push(SummaryFailure {
                        location: summary.location,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use wxwatch_core::{Observation, Timestamp};
    use wxwatch_db::MemoryStore;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, 14).unwrap()
    }

    // 2023-11-14T00:00:00Z
    const MIDNIGHT: Timestamp = 1_699_920_000;

    fn obs(location: &str, temperature: f64, condition: &str, observed_at: Timestamp) -> Observation {
        Observation {
            location: location.to_string(),
            temperature,
            feels_like: temperature,
            humidity: 50,
            wind_speed: 2.0,
            condition: condition.to_string(),
            observed_at,
        }
    }

    /// Memory store whose summary writes fail for one location
    struct FlakyStore {
        inner: MemoryStore,
        broken_location: String,
    }

    #[async_trait::async_trait]
    impl ObservationStore for FlakyStore {
        async fn append(&self, o: &Observation) -> anyhow::Result<()> {
            self.inner.append(o).await
        }

        async fn latest(&self, location: &str) -> anyhow::Result<Option<Observation>> {
            self.inner.latest(location).await
        }

        async fn latest_per_location(&self) -> anyhow::Result<Vec<Observation>> {
            self.inner.latest_per_location().await
        }

        async fn query_range(
            &self,
            location: Option<&str>,
            from: Timestamp,
            to: Timestamp,
        ) -> anyhow::Result<Vec<Observation>> {
            self.inner.query_range(location, from, to).await
        }

        async fn upsert_summary(&self, s: &DailySummary) -> anyhow::Result<()> {
            if s.location == self.broken_location {
                anyhow::bail!("disk full");
            }
            self.inner.upsert_summary(s).await
        }

        async fn append_summary(&self, s: &DailySummary) -> anyhow::Result<()> {
            self.inner.append_summary(s).await
        }

        async fn summaries(
            &self,
            location: &str,
            date: NaiveDate,
        ) -> anyhow::Result<Vec<DailySummary>> {
            self.inner.summaries(location, date).await
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let rows = [
            obs("A", 99.0, "Storm", MIDNIGHT - 1), // previous day
            obs("A", 20.0, "Clear", MIDNIGHT + 60),
            obs("B", 31.0, "Haze", MIDNIGHT + 90),
            obs("A", 24.0, "Clear", MIDNIGHT + 3_600),
            obs("A", 22.0, "Rain", MIDNIGHT + 7_200),
            obs("B", 29.0, "Haze", MIDNIGHT + 86_400), // next day
        ];
        for o in &rows {
            store.append(o).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_summaries_for_day() {
        let store = seeded_store().await;
        let aggregator = DailyAggregator::new(store.clone(), SummaryWriteMode::Upsert);

        let report = aggregator.run_for_day(day(), &Utc).await.unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(report.persisted.len(), 2);

        let a = &store.summaries("A", day()).await.unwrap()[0];
        assert_eq!(a.avg_temperature, 22.0);
        assert_eq!(a.max_temperature, 24.0);
        assert_eq!(a.min_temperature, 20.0);
        assert_eq!(a.dominant_condition, "Clear");
        assert_eq!(a.observation_count, 3);

        let b = &store.summaries("B", day()).await.unwrap()[0];
        assert_eq!(b.avg_temperature, 31.0);
        assert_eq!(b.observation_count, 1);
    }

    #[tokio::test]
    async fn test_location_without_observations_gets_no_summary() {
        let store = seeded_store().await;
        let aggregator = DailyAggregator::new(store.clone(), SummaryWriteMode::Upsert);
        aggregator.run_for_day(day(), &Utc).await.unwrap();

        assert!(store.summaries("C", day()).await.unwrap().is_empty());

        let empty_day = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();
        let report = aggregator.run_for_day(empty_day, &Utc).await.unwrap();
        assert!(report.persisted.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_upsert_is_idempotent() {
        let store = seeded_store().await;
        let aggregator = DailyAggregator::new(store.clone(), SummaryWriteMode::Upsert);
        aggregator.run_for_day(day(), &Utc).await.unwrap();
        aggregator.run_for_day(day(), &Utc).await.unwrap();

        assert_eq!(store.summaries("A", day()).await.unwrap().len(), 1);
        assert_eq!(store.all_summaries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rerun_append_duplicates() {
        let store = seeded_store().await;
        let aggregator = DailyAggregator::new(store.clone(), SummaryWriteMode::Append);
        aggregator.run_for_day(day(), &Utc).await.unwrap();
        aggregator.run_for_day(day(), &Utc).await.unwrap();

        assert_eq!(store.summaries("A", day()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_is_isolated() {
        let inner = MemoryStore::new();
        for o in [
            obs("A", 20.0, "Clear", MIDNIGHT + 10),
            obs("B", 25.0, "Rain", MIDNIGHT + 20),
            obs("C", 30.0, "Haze", MIDNIGHT + 30),
        ] {
            inner.append(&o).await.unwrap();
        }
        let store = Arc::new(FlakyStore {
            inner,
            broken_location: "B".to_string(),
        });
        let aggregator = DailyAggregator::new(store.clone(), SummaryWriteMode::Upsert);

        let report = aggregator.run_for_day(day(), &Utc).await.unwrap();
        let saved: Vec<_> = report.persisted.iter().map(|s| s.location.as_str()).collect();
        assert_eq!(saved, vec!["A", "C"]);
        assert_eq!(
            report.failed,
            vec![SummaryFailure {
                location: "B".to_string(),
                message: "disk full".to_string(),
            }]
        );
        assert_eq!(store.summaries("C", day()).await.unwrap().len(), 1);
    }

    #[test]
    fn test_write_mode_parsing() {
        assert_eq!("upsert".parse::<SummaryWriteMode>().unwrap(), SummaryWriteMode::Upsert);
        assert_eq!("append".parse::<SummaryWriteMode>().unwrap(), SummaryWriteMode::Append);
        insta::assert_snapshot!(
            "replace".parse::<SummaryWriteMode>().unwrap_err().to_string(),
            @"Unknown summary write mode: replace"
        );
        assert_eq!(SummaryWriteMode::default(), SummaryWriteMode::Upsert);
    }
}
