//! Generic configuration I/O utilities
//!
//! YAML loading and saving for any serializable configuration type.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns default config.
/// If the file exists but is invalid, logs a warning and returns default config.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<T>(&contents) {
            Ok(config) => {
                log::info!("load_config: Successfully loaded config from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}, using defaults", e);
                T::default()
            }
        },
        Err(e) => {
            log::warn!(
                "load_config: Failed to read config file: {}, using defaults",
                e
            );
            T::default()
        }
    }
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Config saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: SessionConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_invalid_yaml_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "quantum_length: [not, a, number]").unwrap();

        let config: SessionConfig = load_config(&path);
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_save_then_load_keeps_custom_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = SessionConfig {
            voice_id: 3,
            microphone_labels: vec!["USB Audio Device".to_string()],
            ..Default::default()
        };

        save_config(&config, &path).unwrap();
        let loaded: SessionConfig = load_config(&path);

        assert_eq!(loaded.voice_id, 3);
        assert_eq!(loaded.microphone_labels, vec!["USB Audio Device".to_string()]);
        assert_eq!(loaded.quantum_length, config.quantum_length);
    }
}
