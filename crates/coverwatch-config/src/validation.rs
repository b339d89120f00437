//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Longest recency window accepted. The end-date pre-filter only looks back
/// across one calendar day boundary.
pub const MAX_RECENCY_WINDOW_SECONDS: u64 = 24 * 60 * 60;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("check_interval_seconds must be greater than zero")]
    ZeroCheckInterval,

    #[error("recency_window_seconds must be greater than zero")]
    ZeroRecencyWindow,

    #[error("recency_window_seconds {0} exceeds the maximum of {max}", max = MAX_RECENCY_WINDOW_SECONDS)]
    RecencyWindowTooLong(u64),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let service = &config.service;

    if service.check_interval_seconds == Some(0) {
        errors.push(ValidationError::ZeroCheckInterval);
    }

    match service.recency_window_seconds {
        Some(0) => errors.push(ValidationError::ZeroRecencyWindow),
        Some(secs) if secs > MAX_RECENCY_WINDOW_SECONDS => {
            errors.push(ValidationError::RecencyWindowTooLong(secs))
        }
        _ => {}
    }

    errors
}
