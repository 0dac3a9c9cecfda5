//! Per-channel row model
//!
//! One `ChannelRow` backs one line of controls in the window. Single- and
//! multi-channel boards use the same row type; every action on a row targets
//! the row's own channel.

use crate::device::{ChannelKey, DeviceId};
use crate::error::Result;
use crate::relay::units::{TimeUnit, format_seconds, parse_duration, validate_seconds};
use tracing::debug;

/// State of one relay channel row
#[derive(Debug, Clone)]
pub struct ChannelRow {
    key: ChannelKey,
    device_index: usize,
    alias: String,
    duration_secs: f64,
    pulsing: bool,
}

impl ChannelRow {
    /// Create a row for `channel` on `device`
    pub fn new(
        device: DeviceId,
        device_index: usize,
        channel: u8,
        duration_secs: f64,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            key: ChannelKey::new(device, channel),
            device_index,
            alias: alias.into(),
            duration_secs,
            pulsing: false,
        }
    }

    /// Apply the operator's entry: `text` in the unit named by `unit`
    ///
    /// On error the previous duration is kept.
    pub fn set_duration(&mut self, text: &str, unit: &str) -> Result<f64> {
        let unit: TimeUnit = unit.parse()?;
        let seconds = parse_duration(text, unit)?;
        debug!("{}: duration set to {}s ({} {})", self.key, seconds, text.trim(), unit);
        self.duration_secs = seconds;
        Ok(seconds)
    }

    /// Apply a stored duration in seconds
    pub fn load_duration(&mut self, seconds: f64) -> Result<()> {
        self.duration_secs = validate_seconds(seconds)?;
        Ok(())
    }

    /// Current pulse duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration_secs
    }

    /// Live readout text
    pub fn duration_label(&self) -> String {
        format_seconds(self.duration_secs)
    }

    /// Owning device
    pub fn device_id(&self) -> &DeviceId {
        self.key.device()
    }

    /// Enumeration position of the owning device
    pub fn device_index(&self) -> usize {
        self.device_index
    }

    /// 1-based channel
    pub fn channel(&self) -> u8 {
        self.key.channel()
    }

    /// Persistence key
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Display name
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Replace the display name
    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
    }

    /// Whether a pulse is running on this channel
    pub fn is_pulsing(&self) -> bool {
        self.pulsing
    }

    pub(crate) fn set_pulsing(&mut self, pulsing: bool) {
        self.pulsing = pulsing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayPanelError;

    fn row() -> ChannelRow {
        ChannelRow::new(DeviceId::new("AB12C").unwrap(), 0, 2, 0.2, "AB12C2")
    }

    #[test]
    fn test_new_row() {
        let row = row();
        assert_eq!(row.key().to_string(), "AB12C2");
        assert_eq!(row.channel(), 2);
        assert_eq!(row.duration_label(), "0.2s");
        assert!(!row.is_pulsing());
    }

    #[test]
    fn test_set_duration_with_unit() {
        let mut row = row();
        let secs = row.set_duration("200", "ms").unwrap();
        assert!((secs - 0.2).abs() < 1e-12);
        assert!((row.duration() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_bad_entry_keeps_previous_duration() {
        let mut row = row();
        row.set_duration("1", "s").unwrap();

        assert!(matches!(
            row.set_duration("one", "s"),
            Err(RelayPanelError::InvalidDuration(_))
        ));
        assert!(matches!(
            row.set_duration("1", "h"),
            Err(RelayPanelError::UnknownTimeUnit(_))
        ));
        assert!((row.duration() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_duration_validates() {
        let mut row = row();
        row.load_duration(0.75).unwrap();
        assert!((row.duration() - 0.75).abs() < f64::EPSILON);
        assert!(row.load_duration(-3.0).is_err());
        assert!((row.duration() - 0.75).abs() < f64::EPSILON);
    }
}
