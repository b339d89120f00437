//! Validated service configuration

use crate::schema::RawConfig;
use coverwatch_util::default_data_dir;
use std::path::PathBuf;
use std::time::Duration;

/// Default time between sweeps
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Default recency window
pub const DEFAULT_RECENCY_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the database
    pub data_dir: PathBuf,

    /// Time between expiration sweeps
    pub check_interval: Duration,

    /// How long after its end-of-day instant a policy is still reported
    pub recency_window: Duration,
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let service = raw.service;
        Self {
            data_dir: service.data_dir.unwrap_or_else(default_data_dir),
            check_interval: service
                .check_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CHECK_INTERVAL),
            recency_window: service
                .recency_window_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RECENCY_WINDOW),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            recency_window: DEFAULT_RECENCY_WINDOW,
        }
    }
}
