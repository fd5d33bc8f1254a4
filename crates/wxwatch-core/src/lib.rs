//! Core data types, units, alerting and daily rollups for wxwatch
//!
//! This crate holds the pieces of the ingestion pipeline that are pure:
//! the observation model, Kelvin/Celsius/Fahrenheit conversion, threshold
//! evaluation and per-location daily summaries. Storage and notification
//! are reached through the traits in [`pipeline`].

pub mod alerts;
pub mod pipeline;
pub mod rollups;
pub mod types;
pub mod units;

pub use alerts::*;
pub use pipeline::*;
pub use rollups::*;
pub use types::*;
pub use units::*;
