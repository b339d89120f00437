//! Default paths for coverwatch components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/coverwatch/config.toml` or `~/.config/coverwatch/config.toml`
//! - Data: `$XDG_DATA_HOME/coverwatch` or `~/.local/share/coverwatch`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const COVERWATCH_CONFIG_ENV: &str = "COVERWATCH_CONFIG";

/// Environment variable for overriding the data directory
pub const COVERWATCH_DATA_DIR_ENV: &str = "COVERWATCH_DATA_DIR";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "coverwatch.db";

/// Application subdirectory name
const APP_DIR: &str = "coverwatch";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/coverwatch/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/coverwatch/config.toml`
/// 3. `/etc/coverwatch/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$COVERWATCH_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/coverwatch` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/coverwatch` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(COVERWATCH_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// XDG data directory, ignoring the COVERWATCH_DATA_DIR override
fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
