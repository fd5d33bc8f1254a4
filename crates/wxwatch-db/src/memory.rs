//! In-process observation store

use chrono::NaiveDate;
use tokio::sync::RwLock;
use wxwatch_core::{DailySummary, Observation, ObservationStore, Timestamp};

/// Observation store kept in memory, in insertion order.
///
/// Nothing is ever evicted: memory grows with every sweep for the life of
/// the process, and each read scans the whole series. Fine for tests and
/// short keyless runs; long-running deployments should use [`DbClient`].
///
/// [`DbClient`]: crate::DbClient
#[derive(Debug, Default)]
pub struct MemoryStore {
    observations: RwLock<Vec<Observation>>,
    summaries: RwLock<Vec<DailySummary>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn observation_count(&self) -> usize {
        self.observations.read().await.len()
    }

    pub async fn all_summaries(&self) -> Vec<DailySummary> {
        self.summaries.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ObservationStore for MemoryStore {
    async fn append(&self, observation: &Observation) -> anyhow::Result<()> {
        self.observations.write().await.push(observation.clone());
        Ok(())
    }

    async fn latest(&self, location: &str) -> anyhow::Result<Option<Observation>> {
        let observations = self.observations.read().await;
        // max_by_key keeps the last maximum, so later insertions win ties
        Ok(observations
            .iter()
            .filter(|o| o.location == location)
            .max_by_key(|o| o.observed_at)
            .cloned())
    }

    async fn latest_per_location(&self) -> anyhow::Result<Vec<Observation>> {
        let observations = self.observations.read().await;
        let mut latest: Vec<Observation> = Vec::new();
        for obs in observations.iter() {
            match latest.iter_mut().find(|o| o.location == obs.location) {
                Some(current) if obs.observed_at >= current.observed_at => *current = obs.clone(),
                Some(_) => {}
                None => latest.push(obs.clone()),
            }
        }
        latest.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(latest)
    }

    async fn query_range(
        &self,
        location: Option<&str>,
        from: Timestamp,
        to: Timestamp,
    ) -> anyhow::Result<Vec<Observation>> {
        let observations = self.observations.read().await;
        let mut matched: Vec<Observation> = observations
            .iter()
            .filter(|o| location.map_or(true, |l| o.location == l))
            .filter(|o| o.observed_at >= from && o.observed_at < to)
            .cloned()
            .collect();
        // stable sort keeps insertion order within a second
        matched.sort_by_key(|o| o.observed_at);
        Ok(matched)
    }

    async fn upsert_summary(&self, summary: &DailySummary) -> anyhow::Result<()> {
        let mut summaries = self.summaries.write().await;
        summaries.retain(|s| !(s.location == summary.location && s.date == summary.date));
        summaries.push(summary.clone());
        Ok(())
    }

    async fn append_summary(&self, summary: &DailySummary) -> anyhow::Result<()> {
        self.summaries.write().await.push(summary.clone());
        Ok(())
    }

    async fn summaries(
        &self,
        location: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<DailySummary>> {
        let summaries = self.summaries.read().await;
        Ok(summaries
            .iter()
            .filter(|s| s.location == location && s.date == date)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(location: &str, temperature: f64, observed_at: Timestamp) -> Observation {
        Observation {
            location: location.to_string(),
            temperature,
            feels_like: temperature,
            humidity: 50,
            wind_speed: 1.0,
            condition: "Clear".to_string(),
            observed_at,
        }
    }

    fn summary(location: &str, avg: f64) -> DailySummary {
        DailySummary {
            location: location.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            avg_temperature: avg,
            max_temperature: avg,
            min_temperature: avg,
            dominant_condition: "Clear".to_string(),
            observation_count: 1,
        }
    }

    #[tokio::test]
    async fn test_latest_by_location() {
        let store = MemoryStore::new();
        store.append(&obs("Delhi", 30.0, 100)).await.unwrap();
        store.append(&obs("Delhi", 31.0, 200)).await.unwrap();
        store.append(&obs("Pune", 24.0, 150)).await.unwrap();

        let latest = store.latest("Delhi").await.unwrap().unwrap();
        assert_eq!(latest.temperature, 31.0);
        assert!(store.latest("Bihar").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_per_location() {
        let store = MemoryStore::new();
        store.append(&obs("Pune", 24.0, 150)).await.unwrap();
        store.append(&obs("Delhi", 30.0, 100)).await.unwrap();
        store.append(&obs("Delhi", 31.0, 200)).await.unwrap();

        let latest = store.latest_per_location().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].location, "Delhi");
        assert_eq!(latest[0].temperature, 31.0);
        assert_eq!(latest[1].location, "Pune");
    }

    #[tokio::test]
    async fn test_query_range_is_half_open() {
        let store = MemoryStore::new();
        for (t, ts) in [(1.0, 99), (2.0, 100), (3.0, 150), (4.0, 200)] {
            store.append(&obs("A", t, ts)).await.unwrap();
        }
        store.append(&obs("B", 9.0, 120)).await.unwrap();

        let all = store.query_range(None, 100, 200).await.unwrap();
        let temps: Vec<f64> = all.iter().map(|o| o.temperature).collect();
        assert_eq!(temps, vec![2.0, 9.0, 3.0]);

        let only_a = store.query_range(Some("A"), 100, 200).await.unwrap();
        assert_eq!(only_a.len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_never_evicted() {
        let store = MemoryStore::new();
        for ts in 0..500 {
            store.append(&obs("A", 20.0, ts)).await.unwrap();
        }
        store.append(&obs("A", 25.0, 500)).await.unwrap();

        assert_eq!(store.observation_count().await, 501);
        // the oldest reading is still there after newer ones arrive
        let first = store.query_range(Some("A"), 0, 1).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(store.latest("A").await.unwrap().unwrap().temperature, 25.0);
    }

    #[tokio::test]
    async fn test_upsert_replaces_append_duplicates() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        store.upsert_summary(&summary("A", 20.0)).await.unwrap();
        store.upsert_summary(&summary("A", 21.0)).await.unwrap();
        let stored = store.summaries("A", date).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].avg_temperature, 21.0);

        store.append_summary(&summary("A", 22.0)).await.unwrap();
        assert_eq!(store.summaries("A", date).await.unwrap().len(), 2);
        assert_eq!(store.all_summaries().await.len(), 2);
    }
}
