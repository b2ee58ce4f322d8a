//! Default paths for tag-reaper components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/tag-reaper/config.toml` or `~/.config/tag-reaper/config.toml`
//! - Data (audit store): `$XDG_DATA_HOME/tag-reaper` or `~/.local/share/tag-reaper`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const REAPER_CONFIG_ENV: &str = "REAPER_CONFIG";

/// Environment variable for overriding the data directory
pub const REAPER_DATA_DIR_ENV: &str = "REAPER_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "tag-reaper";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Audit database filename within the data directory
pub const AUDIT_DB_FILENAME: &str = "reaper.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$REAPER_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/tag-reaper/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/tag-reaper/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(REAPER_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking the REAPER_CONFIG env var.
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$REAPER_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/tag-reaper` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/tag-reaper` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(REAPER_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the REAPER_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_app_dir() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().contains("tag-reaper"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn data_dir_contains_app_dir() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("tag-reaper"));
    }
}
