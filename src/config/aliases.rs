//! Channel display aliases
//!
//! `aliases.json` maps channel keys to the names shown in the Relay column:
//!
//! ```json
//! { "AB12C1": "Shutter", "AB12C2": "Lamp" }
//! ```

use crate::device::ChannelKey;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Channel key to display name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasStore {
    aliases: HashMap<String, String>,
}

impl AliasStore {
    /// Read the store at `path`
    ///
    /// A missing or unreadable file is an empty store; so is corrupt JSON, which is
    /// logged.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("No alias store at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        Self::parse(&text).unwrap_or_else(|e| {
            warn!("Ignoring corrupt alias store {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Parse alias JSON
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let aliases = serde_json::from_str(text)?;
        Ok(Self { aliases })
    }

    /// Display name for `key`, or the key itself when none is set
    pub fn alias_for(&self, key: &ChannelKey) -> String {
        let key = key.to_string();
        self.aliases.get(&key).cloned().unwrap_or(key)
    }

    /// Display name for `key` on a board with `channel_count` channels
    ///
    /// Channel 1 of a single-channel board also answers to the older `"<id>0"` key
    /// when no `"<id>1"` alias exists.
    pub fn alias_on_board(&self, key: &ChannelKey, channel_count: u8) -> String {
        let name = key.to_string();
        if let Some(alias) = self.aliases.get(&name) {
            return alias.clone();
        }
        // Legacy single-channel key
        if channel_count == 1
            && key.channel() == 1
            && let Some(alias) = self.aliases.get(&format!("{}0", key.device()))
        {
            return alias.clone();
        }
        name
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether no aliases are set
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Look up the alias for `key` in the store at `path`
pub fn get_alias(key: &ChannelKey, path: &Path) -> String {
    AliasStore::load(path).alias_for(key)
}
