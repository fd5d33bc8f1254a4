//! Bounded retry around a weather provider

use crate::{FetchError, WeatherProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use wxwatch_core::{ImplausibleReading, Observation};

/// Attempt budget and spacing between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Wait after attempt `n` is `backoff * n`; zero retries immediately
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

/// Why a location produced no observation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FailureCause {
    #[error("retries exhausted, last error: {0}")]
    Exhausted(FetchError),

    #[error(transparent)]
    ImplausibleReading(ImplausibleReading),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("fetch failed for {location} after {attempts} attempt(s): {cause}")]
pub struct FetchFailure {
    pub location: String,
    pub attempts: u32,
    pub cause: FailureCause,
}

/// Wraps a provider with the retry policy and plausibility check
#[derive(Clone)]
pub struct RetryFetcher {
    provider: Arc<dyn WeatherProvider>,
    policy: RetryPolicy,
}

impl RetryFetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch one observation, retrying transient errors up to the budget
    ///
    /// Implausible readings are discarded without another attempt.
    pub async fn fetch_with_retry(&self, location: &str) -> Result<Observation, FetchFailure> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.provider.fetch_current(location).await {
                Ok(observation) => {
                    return match observation.check_plausible() {
                        Ok(()) => Ok(observation),
                        Err(reading) => {
                            warn!(location, %reading, "discarding implausible reading");
                            Err(FetchFailure {
                                location: location.to_string(),
                                attempts: attempt,
                                cause: FailureCause::ImplausibleReading(reading),
                            })
                        }
                    };
                }
                Err(err) if attempt >= max_attempts => {
                    error!(location, attempts = attempt, error = %err, "giving up on location");
                    return Err(FetchFailure {
                        location: location.to_string(),
                        attempts: attempt,
                        cause: FailureCause::Exhausted(err),
                    });
                }
                Err(err) => {
                    warn!(
                        location,
                        attempt,
                        remaining = max_attempts - attempt,
                        error = %err,
                        "fetch failed, retrying"
                    );
                    let delay = self.policy.delay_after(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
