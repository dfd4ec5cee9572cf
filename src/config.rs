//! Configuration management
//!
//! Optional YAML file at `~/.comic-crafter/config.yaml`, with a couple of
//! environment overrides for pointing at a self-hosted endpoint.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};

/// Overrides `api_base_url`
pub const ENV_API_BASE: &str = "COMIC_CRAFTER_API_BASE";

/// Overrides `export_dir`
pub const ENV_EXPORT_DIR: &str = "COMIC_CRAFTER_EXPORT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub request_timeout_secs: u64,
    pub export_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: String::from(DEFAULT_API_BASE),
            text_model: String::from(DEFAULT_TEXT_MODEL),
            image_model: String::from(DEFAULT_IMAGE_MODEL),
            request_timeout_secs: 120,
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from("comic-crafter.log"),
        }
    }
}

impl Config {
    /// Directory holding the config file and the stored credential
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".comic-crafter")
    }

    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_dir().join("config.yaml"))?;
        config.apply_env();
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(base) = std::env::var(ENV_API_BASE) {
            if !base.trim().is_empty() {
                self.api_base_url = base.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var(ENV_EXPORT_DIR) {
            if !dir.trim().is_empty() {
                self.export_dir = PathBuf::from(dir.trim());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "api_base_url: http://localhost:9000\nrequest_timeout_secs: 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:9000");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
    }
}
