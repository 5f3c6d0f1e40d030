//! Path utilities for Subarutone configuration files

use std::path::PathBuf;

/// Name of the directory holding Subarutone files inside the platform config dir
const APP_DIR: &str = "subarutone";

/// Get the default configuration directory
///
/// Returns: `<platform config dir>/subarutone` (e.g. `~/.config/subarutone`),
/// or `./subarutone` when the platform has no config dir.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Get the default session config file path
///
/// Returns: `<config dir>/subarutone/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}
