//! Error types for coverwatch

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for coverwatch operations
#[derive(Debug, Error)]
pub enum CoverwatchError {
    #[error("Date is required")]
    DateRequired,

    #[error("Invalid date format")]
    InvalidDateFormat,

    #[error("Date must be between {min} and {max}")]
    DateOutOfRange { min: NaiveDate, max: NaiveDate },

    #[error("{0} not found")]
    EntityNotFound(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl CoverwatchError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::EntityNotFound(what.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceFailure(msg.into())
    }

    /// Whether the error came from the caller's input rather than the store
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::PersistenceFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, CoverwatchError>;
