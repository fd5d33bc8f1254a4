//! Temperature threshold alerting

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Observation;

/// Threshold used until someone calls [`AlertThreshold::set`]
pub const DEFAULT_THRESHOLD_CELSIUS: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("Threshold must be a finite number, got {0}")]
    NotFinite(f64),
}

/// Process-wide alert threshold in °C
///
/// Stored as the bit pattern of an `f64` so reads and writes are single
/// atomic word operations; share it behind an `Arc`.
#[derive(Debug)]
pub struct AlertThreshold {
    bits: AtomicU64,
}

impl AlertThreshold {
    pub fn new(celsius: f64) -> Result<Self, ThresholdError> {
        validate(celsius)?;
        Ok(Self {
            bits: AtomicU64::new(celsius.to_bits()),
        })
    }

    /// Current threshold
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Replace the threshold; takes effect for the next evaluation
    pub fn set(&self, celsius: f64) -> Result<(), ThresholdError> {
        validate(celsius)?;
        self.bits.store(celsius.to_bits(), Ordering::Release);
        Ok(())
    }
}

impl Default for AlertThreshold {
    fn default() -> Self {
        Self {
            bits: AtomicU64::new(DEFAULT_THRESHOLD_CELSIUS.to_bits()),
        }
    }
}

fn validate(celsius: f64) -> Result<(), ThresholdError> {
    if celsius.is_finite() {
        Ok(())
    } else {
        Err(ThresholdError::NotFinite(celsius))
    }
}

/// Alert raised for a single observation; never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub location: String,
    pub message: String,
    pub triggering_temperature: f64,
    pub threshold: f64,
}

impl AlertEvent {
    /// Subject line for the notification
    pub fn subject(&self) -> String {
        format!("Weather Alert for {}", self.location)
    }
}

/// Emit an alert iff the observation is strictly above the threshold
pub fn evaluate(observation: &Observation, threshold: f64) -> Option<AlertEvent> {
    if observation.temperature <= threshold {
        return None;
    }

    Some(AlertEvent {
        location: observation.location.clone(),
        message: format!(
            "Alert! The temperature in {} has exceeded {}°C. Current temperature: {:.2}°C.",
            observation.location, threshold, observation.temperature
        ),
        triggering_temperature: observation.temperature,
        threshold,
    })
}
