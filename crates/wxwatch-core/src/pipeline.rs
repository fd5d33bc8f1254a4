use anyhow::Result;
use chrono::NaiveDate;

use crate::{DailySummary, Observation, Timestamp};

/// Append-only observation time series plus daily summaries
#[async_trait::async_trait]
pub trait ObservationStore: Send + Sync {
    /// Persist one observation; either the whole record lands or nothing does
    async fn append(&self, observation: &Observation) -> Result<()>;

    /// Most recent observation for a location
    async fn latest(&self, location: &str) -> Result<Option<Observation>>;

    /// Most recent observation for every location that has one
    async fn latest_per_location(&self) -> Result<Vec<Observation>>;

    /// Observations with `from <= observed_at < to`, oldest first.
    /// `None` matches every location.
    async fn query_range(
        &self,
        location: Option<&str>,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Observation>>;

    /// Replace any summary for the same (location, date)
    async fn upsert_summary(&self, summary: &DailySummary) -> Result<()>;

    /// Insert a summary unconditionally
    async fn append_summary(&self, summary: &DailySummary) -> Result<()>;

    async fn summaries(&self, location: &str, date: NaiveDate) -> Result<Vec<DailySummary>>;
}

/// Outbound message transport for alerts (best effort)
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}
