//! Observation store backends
//!
//! `DbClient` persists to MySQL through sqlx; `MemoryStore` keeps
//! everything in process and backs tests and database-less runs.
//! Both implement [`wxwatch_core::ObservationStore`].

pub mod client;
pub mod memory;
pub mod queries;
pub mod schema;

pub use client::*;
pub use memory::*;
pub use schema::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

pub type DbResult<T> = Result<T, DbError>;
