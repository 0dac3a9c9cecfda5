//! Configuration data models
//!
//! This module defines the data structures used for application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the duration store
pub const DEFAULTS_FILE: &str = "defaults.bin";

/// File name of the alias store
pub const ALIASES_FILE: &str = "aliases.json";

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// User preferences
    pub preferences: UserPreferences,
    /// Window state for persistence
    pub window_state: WindowState,
}

/// User preferences and settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Directory holding the vendor relay library
    pub library_dir: PathBuf,
    /// Window icon (ICO or PNG)
    pub icon_path: PathBuf,
    /// Pulse length in seconds for rows without a stored default
    pub default_pulse_secs: f64,
    /// Initial text of each row's duration entry
    pub default_entry_text: String,
}

/// Window size persisted across sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowState {
    /// Window width
    pub width: u32,
    /// Window height
    pub height: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from("."),
            icon_path: PathBuf::from("hephico.ico"),
            default_pulse_secs: 0.2,
            default_entry_text: "0.2".to_string(),
        }
    }
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            width: 760,
            height: 320,
        }
    }
}

/// Locations of the duration and alias stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// Binary duration store
    pub defaults: PathBuf,
    /// JSON alias store
    pub aliases: PathBuf,
}

impl StorePaths {
    /// Standard store files inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            defaults: dir.join(DEFAULTS_FILE),
            aliases: dir.join(ALIASES_FILE),
        }
    }
}
