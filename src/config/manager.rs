//! Configuration manager for loading and saving application configuration
//!
//! This module provides functionality to load and save configuration to
//! `<config dir>/RelayPanel/config.json` with atomic writes to prevent corruption.

use crate::config::models::{AppConfig, StorePaths};
use crate::error::{RelayPanelError, Result, StringError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the application's configuration directory
    ///
    /// Returns the platform config directory joined with `RelayPanel`, or `./RelayPanel`
    /// when the platform has none.
    pub fn get_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("RelayPanel")
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.json")
    }

    /// Store files in the configuration directory
    pub fn store_paths() -> StorePaths {
        StorePaths::in_dir(&Self::get_config_dir())
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::get_config_dir();
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist or is corrupt, returns default configuration.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(&Self::get_config_path())
    }

    /// Load configuration from `path`
    pub fn load_from(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            info!("Configuration file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let json = std::fs::read_to_string(path)?;

        match serde_json::from_str(&json) {
            Ok(config) => {
                info!("Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to parse configuration, using defaults: {}", e);
                Ok(AppConfig::default())
            }
        }
    }

    /// Save configuration to disk with atomic write
    pub fn save(config: &AppConfig) -> Result<()> {
        Self::ensure_config_dir()?;
        Self::save_to(config, &Self::get_config_path())
    }

    /// Save configuration to `path` with atomic write
    pub fn save_to(config: &AppConfig, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(path, json.as_bytes())?;
        info!("Configuration saved successfully");
        Ok(())
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory
///
/// Readers see either the old file or the new one, never a partial write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| {
        RelayPanelError::ConfigError(StringError::new(format!(
            "Failed to replace {}: {}",
            path.display(),
            e.error
        )))
    })?;
    Ok(())
}
