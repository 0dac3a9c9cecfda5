//! Default pulse durations per channel
//!
//! Stored as a bincode-encoded map from channel key (`"AB12C1"`) to seconds. An
//! absent store file reads as an empty store, so saving on a fresh installation
//! works without a prior load.

use crate::config::manager::write_atomic;
use crate::error::Result;
use crate::relay::ChannelRow;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Channel key to default duration in seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationStore {
    entries: BTreeMap<String, f64>,
}

impl DurationStore {
    /// Read the store at `path`; a missing file is an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Duration store {} not found, starting empty", path.display());
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path)?;
        let entries: BTreeMap<String, f64> = bincode::deserialize(&bytes)?;
        Ok(Self { entries })
    }

    /// Write the whole store to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(&self.entries)?;
        write_atomic(path, &bytes)
    }

    /// Stored seconds for `key`
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Set the seconds for `key`
    pub fn insert(&mut self, key: impl Into<String>, seconds: f64) {
        self.entries.insert(key.into(), seconds);
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge every row's duration into the store at `path`
///
/// Keys not belonging to a current row are kept. Nothing is written when `rows` is
/// empty.
pub fn save_defaults(rows: &[ChannelRow], path: &Path) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut store = DurationStore::load(path)?;
    for row in rows {
        store.insert(row.key().to_string(), row.duration());
    }
    store.save(path)?;

    info!("Saved defaults for {} channel(s) to {}", rows.len(), path.display());
    Ok(())
}

/// Apply stored durations to matching rows; returns how many rows changed
///
/// A single-channel board may still have its default stored under the bare device
/// identifier; that entry applies to its channel 1 row when no keyed entry exists.
pub fn load_defaults(rows: &mut [ChannelRow], path: &Path) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let store = DurationStore::load(path)?;
    let mut applied = 0;

    for i in 0..rows.len() {
        let single_channel = rows
            .iter()
            .filter(|r| r.device_id() == rows[i].device_id())
            .count()
            == 1;

        let row = &mut rows[i];
        let stored = store.get(&row.key().to_string()).or_else(|| {
            (single_channel && row.channel() == 1)
                .then(|| store.get(row.device_id().as_str()))
                .flatten()
        });

        let Some(seconds) = stored else {
            continue;
        };
        match row.load_duration(seconds) {
            Ok(()) => {
                debug!("{}: default {}s", row.key(), seconds);
                applied += 1;
            }
            Err(e) => warn!("Ignoring stored default for {}: {}", row.key(), e),
        }
    }

    info!("Loaded defaults for {} of {} channel(s)", applied, rows.len());
    Ok(applied)
}
