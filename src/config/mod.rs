//! Configuration management module
//!
//! This module handles the application configuration file and the two operator
//! stores. Everything lives in the per-user configuration directory
//! (`<config dir>/RelayPanel`):
//!
//! - `config.json`: preferences and window size, written atomically
//! - `defaults.bin`: default pulse duration per channel
//! - `aliases.json`: display name per channel

pub mod aliases;
pub mod defaults;
pub mod manager;
pub mod models;

pub use aliases::{AliasStore, get_alias};
pub use defaults::{DurationStore, load_defaults, save_defaults};
pub use manager::ConfigManager;
pub use models::{AppConfig, StorePaths, UserPreferences, WindowState};
