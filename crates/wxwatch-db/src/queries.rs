//! Database query operations for observation and summary tables

use crate::schema::{DailySummaryRow, ObservationRow};
use crate::{DbClient, DbResult};
use chrono::NaiveDate;
use tracing::{debug, instrument};
use wxwatch_core::{DailySummary, Observation, ObservationStore, Timestamp};

const INSERT_SUMMARY: &str = r#"
    INSERT INTO daily_summary (
        location, summary_date,
        avg_temperature, max_temperature, min_temperature,
        dominant_condition, observation_count
    ) VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

impl DbClient {
    /// Insert a single observation
    #[instrument(skip(self, obs), fields(location = %obs.location))]
    pub async fn insert_observation(&self, obs: &Observation) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO observations (
                location, temperature, feels_like, humidity,
                wind_speed, weather_condition, observed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&obs.location)
        .bind(obs.temperature)
        .bind(obs.feels_like)
        .bind(obs.humidity)
        .bind(obs.wind_speed)
        .bind(&obs.condition)
        .bind(obs.observed_at)
        .execute(self.pool())
        .await?;

        debug!("Inserted observation at {}", obs.observed_at);
        Ok(())
    }

    /// Get the most recent observation for a location
    #[instrument(skip(self))]
    pub async fn get_latest_observation(&self, location: &str) -> DbResult<Option<Observation>> {
        let row = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT * FROM observations
            WHERE location = ?
            ORDER BY observed_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(location)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Observation::from))
    }

    /// Get the most recent observation of every location
    #[instrument(skip(self))]
    pub async fn get_latest_per_location(&self) -> DbResult<Vec<Observation>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT id, location, temperature, feels_like, humidity,
                   wind_speed, weather_condition, observed_at
            FROM (
                SELECT o.*, ROW_NUMBER() OVER (
                    PARTITION BY location
                    ORDER BY observed_at DESC, id DESC
                ) AS rn
                FROM observations o
            ) ranked
            WHERE rn = 1
            ORDER BY location ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Observation::from).collect())
    }

    /// Get observations within `[start_time, end_time)`
    #[instrument(skip(self))]
    pub async fn get_observation_range(
        &self,
        location: Option<&str>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> DbResult<Vec<Observation>> {
        let rows = match location {
            Some(location) => {
                sqlx::query_as::<_, ObservationRow>(
                    r#"
                    SELECT * FROM observations
                    WHERE location = ? AND observed_at >= ? AND observed_at < ?
                    ORDER BY observed_at ASC, id ASC
                    "#,
                )
                .bind(location)
                .bind(start_time)
                .bind(end_time)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, ObservationRow>(
                    r#"
                    SELECT * FROM observations
                    WHERE observed_at >= ? AND observed_at < ?
                    ORDER BY observed_at ASC, id ASC
                    "#,
                )
                .bind(start_time)
                .bind(end_time)
                .fetch_all(self.pool())
                .await?
            }
        };

        debug!(
            "Retrieved {} observations between {} and {}",
            rows.len(),
            start_time,
            end_time
        );
        Ok(rows.into_iter().map(Observation::from).collect())
    }

    /// Replace the summary for (location, date) in one transaction
    #[instrument(skip(self, summary), fields(location = %summary.location, date = %summary.date))]
    pub async fn upsert_daily_summary(&self, summary: &DailySummary) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;

        let replaced = sqlx::query("DELETE FROM daily_summary WHERE location = ? AND summary_date = ?")
            .bind(&summary.location)
            .bind(summary.date)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        bind_summary(sqlx::query(INSERT_SUMMARY), summary)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("Upserted daily summary (replaced {})", replaced);
        Ok(())
    }

    /// Insert a summary without touching existing rows
    #[instrument(skip(self, summary), fields(location = %summary.location, date = %summary.date))]
    pub async fn insert_daily_summary(&self, summary: &DailySummary) -> DbResult<()> {
        bind_summary(sqlx::query(INSERT_SUMMARY), summary)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Get all summaries stored for (location, date)
    #[instrument(skip(self))]
    pub async fn get_daily_summaries(
        &self,
        location: &str,
        date: NaiveDate,
    ) -> DbResult<Vec<DailySummary>> {
        let rows = sqlx::query_as::<_, DailySummaryRow>(
            r#"
            SELECT * FROM daily_summary
            WHERE location = ? AND summary_date = ?
            ORDER BY id ASC
            "#,
        )
        .bind(location)
        .bind(date)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(DailySummary::try_from).collect()
    }

    /// Get count of observation records
    #[instrument(skip(self))]
    pub async fn count_observations(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM observations")
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }
}

fn bind_summary<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    summary: &'q DailySummary,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    query
        .bind(&summary.location)
        .bind(summary.date)
        .bind(summary.avg_temperature)
        .bind(summary.max_temperature)
        .bind(summary.min_temperature)
        .bind(&summary.dominant_condition)
        .bind(summary.observation_count)
}

#[async_trait::async_trait]
impl ObservationStore for DbClient {
    async fn append(&self, observation: &Observation) -> anyhow::Result<()> {
        Ok(self.insert_observation(observation).await?)
    }

    async fn latest(&self, location: &str) -> anyhow::Result<Option<Observation>> {
        Ok(self.get_latest_observation(location).await?)
    }

    async fn latest_per_location(&self) -> anyhow::Result<Vec<Observation>> {
        Ok(self.get_latest_per_location().await?)
    }

    async fn query_range(
        &self,
        location: Option<&str>,
        from: Timestamp,
        to: Timestamp,
    ) -> anyhow::Result<Vec<Observation>> {
        Ok(self.get_observation_range(location, from, to).await?)
    }

    async fn upsert_summary(&self, summary: &DailySummary) -> anyhow::Result<()> {
        Ok(self.upsert_daily_summary(summary).await?)
    }

    async fn append_summary(&self, summary: &DailySummary) -> anyhow::Result<()> {
        Ok(self.insert_daily_summary(summary).await?)
    }

    async fn summaries(
        &self,
        location: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<DailySummary>> {
        Ok(self.get_daily_summaries(location, date).await?)
    }
}
