//! One location's trip through fetch, persist, evaluate, notify

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use wxwatch_core::{evaluate, AlertThreshold, Observation, ObservationStore};
use wxwatch_ingest::{FetchFailure, RetryFetcher};
use wxwatch_notify::AlertDispatcher;

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub observation: Observation,
    pub alerted: bool,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestFailure {
    #[error(transparent)]
    Fetch(FetchFailure),

    #[error("failed to store observation for {location}: {message}")]
    Persistence { location: String, message: String },
}

#[derive(Clone)]
pub struct IngestJob {
    fetcher: RetryFetcher,
    store: Arc<dyn ObservationStore>,
    threshold: Arc<AlertThreshold>,
    dispatcher: AlertDispatcher,
}

impl IngestJob {
    pub fn new(
        fetcher: RetryFetcher,
        store: Arc<dyn ObservationStore>,
        threshold: Arc<AlertThreshold>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            fetcher,
            store,
            threshold,
            dispatcher,
        }
    }

    /// Alerts are evaluated only for observations that were stored.
    pub async fn run(&self, location: &str) -> Result<IngestOutcome, IngestFailure> {
        let observation = self
            .fetcher
            .fetch_with_retry(location)
            .await
            .map_err(IngestFailure::Fetch)?;

        if let Err(e) = self.store.append(&observation).await {
            error!(location, error = ?e, "Error saving weather data");
            return Err(IngestFailure::Persistence {
                location: location.to_string(),
                message: format!("{:#}", e),
            });
        }
        info!(
            location,
            temperature = observation.temperature,
            condition = %observation.condition,
            "Weather data saved"
        );

        let alerted = match evaluate(&observation, self.threshold.get()) {
            Some(event) => self.dispatcher.dispatch(&event).await,
            None => false,
        };

        Ok(IngestOutcome {
            observation,
            alerted,
        })
    }
}
