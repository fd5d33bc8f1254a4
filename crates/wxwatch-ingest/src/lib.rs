//! Weather provider adapters and retrying fetcher
//!
//! A [`WeatherProvider`] turns a location name into one [`Observation`]
//! in °C. Providers never retry; [`RetryFetcher`] owns the attempt budget
//! and the plausibility check.

pub mod openweather;
pub mod retry;
pub mod simulator;

pub use openweather::*;
pub use retry::*;
pub use simulator::*;

use thiserror::Error;
use wxwatch_core::Observation;

/// Transient provider failure; the retry fetcher tries again on these
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Source of current conditions for a location
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name/identifier
    fn name(&self) -> &str;

    /// Fetch the current observation for one location
    async fn fetch_current(&self, location: &str) -> FetchResult<Observation>;
}
