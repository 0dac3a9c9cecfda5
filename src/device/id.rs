//! Device identifiers and channel keys

use crate::error::{RelayPanelError, Result};
use std::fmt;
use std::str::FromStr;

/// Serial number of a relay board, exactly [`DeviceId::LEN`] ASCII characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    /// Length of every serial the vendor library reports
    pub const LEN: usize = 5;

    /// Validate and wrap a serial
    pub fn new(serial: &str) -> Result<Self> {
        if serial.len() == Self::LEN && serial.is_ascii() {
            Ok(Self(serial.to_string()))
        } else {
            Err(RelayPanelError::InvalidDeviceId(serial.to_string()))
        }
    }

    /// Serial as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = RelayPanelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Composite persistence key of one channel: serial followed by the 1-based channel
///
/// Renders as e.g. `AB12C1`. Both the duration store and the alias store are keyed
/// by this string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    device: DeviceId,
    channel: u8,
}

impl ChannelKey {
    /// Key for `channel` on `device`
    pub fn new(device: DeviceId, channel: u8) -> Self {
        Self { device, channel }
    }

    /// Owning device
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// 1-based channel
    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.device, self.channel)
    }
}
