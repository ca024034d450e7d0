//! Configuration management.
//!
//! This module handles loading and saving the data-layer configuration,
//! which includes the content API base URL and an optional override for
//! the durable storage directory.
//!
//! Configuration is stored at `~/.config/foliocache/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/storage directory paths
const APP_NAME: &str = "foliocache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Content API base URL used when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    /// Overrides the default storage directory when set.
    pub storage_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the durable cache blobs.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn test_storage_dir_override() {
        let config = Config {
            storage_dir: Some(PathBuf::from("/tmp/folio-cache")),
            ..Config::default()
        };
        assert_eq!(
            config.storage_dir().unwrap(),
            PathBuf::from("/tmp/folio-cache")
        );
    }

    #[test]
    fn test_config_serializes_round_trip() {
        let config = Config {
            api_base_url: "https://example.dev/api".to_string(),
            storage_dir: None,
        };
        let raw = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.api_base_url, config.api_base_url);
    }
}
