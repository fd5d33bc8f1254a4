//! Daily summary aggregation
//!
//! Reads one calendar day of observations from the store, summarises
//! each location and writes the summaries back one by one.

pub mod aggregator;

pub use aggregator::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to load observations for {day}: {message}")]
    Query {
        day: chrono::NaiveDate,
        message: String,
    },

    #[error("Unknown summary write mode: {0}")]
    InvalidWriteMode(String),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
