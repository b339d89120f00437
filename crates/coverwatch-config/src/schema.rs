//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service settings
    #[serde(default)]
    pub service: RawServiceConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Seconds between expiration sweeps (default: 1800)
    pub check_interval_seconds: Option<u64>,

    /// How long after the end of its last covered day a policy still counts
    /// as newly expired (default: 3600)
    pub recency_window_seconds: Option<u64>,
}
