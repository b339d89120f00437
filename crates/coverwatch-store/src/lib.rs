//! Persistence layer for coverwatch
//!
//! Provides:
//! - Owner, car and policy records (seeded by the outer CRUD layer)
//! - Policy lookups by car and by end-date range
//! - Expiration log (append-only, unique per policy and expired date)

mod models;
mod sqlite;
mod traits;

pub use models::*;
pub use sqlite::*;
pub use traits::*;

use coverwatch_util::CoverwatchError;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<StoreError> for CoverwatchError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => CoverwatchError::EntityNotFound(what),
            other => CoverwatchError::PersistenceFailure(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
