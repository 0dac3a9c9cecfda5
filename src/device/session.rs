//! Scoped device sessions
//!
//! A `DeviceSession` owns one open driver handle. The handle is closed exactly once,
//! either by [`DeviceSession::close`] or when the session is dropped, and the
//! device's lease is released at the same time.

use crate::device::DeviceId;
use crate::driver::{DeviceHandle, RelayDriver};
use crate::error::{RelayPanelError, Result};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Highest channel count a board can report
pub const MAX_CHANNELS: u8 = 8;

/// Exclusive claim on one device, released on drop
pub(crate) struct DeviceLease(Arc<AtomicBool>);

impl DeviceLease {
    /// Claim the device, or `None` if another session holds it
    pub(crate) fn try_acquire(flag: Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Relay status bitmap (bit 0 = channel 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStatus(u8);

impl ChannelStatus {
    /// Wrap a raw bitmap
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bitmap
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether `channel` (1-based) is open
    pub fn is_open(self, channel: u8) -> bool {
        (1..=MAX_CHANNELS).contains(&channel) && self.0 & (1 << (channel - 1)) != 0
    }

    /// Open channels in ascending order
    pub fn open_channels(self) -> SmallVec<[u8; 8]> {
        (1..=MAX_CHANNELS).filter(|&ch| self.is_open(ch)).collect()
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// An open device
pub struct DeviceSession {
    driver: Arc<dyn RelayDriver>,
    device: DeviceId,
    handle: Option<DeviceHandle>,
    channel_count: u8,
    _lease: DeviceLease,
}

impl DeviceSession {
    pub(crate) fn new(
        driver: Arc<dyn RelayDriver>,
        device: DeviceId,
        handle: DeviceHandle,
        channel_count: u8,
        lease: DeviceLease,
    ) -> Self {
        Self {
            driver,
            device,
            handle: Some(handle),
            channel_count,
            _lease: lease,
        }
    }

    /// Device this session is open on
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Channel count read at open time (1-8)
    pub fn channel_count(&self) -> u8 {
        self.channel_count
    }

    fn handle(&self) -> DeviceHandle {
        // Only `release` clears the handle, and it consumes or drops the session.
        self.handle.unwrap_or_else(|| unreachable!("session used after release"))
    }

    fn check_channel(&self, channel: u8) -> Result<()> {
        if channel == 0 || channel > self.channel_count {
            return Err(RelayPanelError::ChannelOutOfRange {
                device: self.device.to_string(),
                channel,
                count: self.channel_count,
            });
        }
        Ok(())
    }

    /// Open (energize) one channel
    pub fn open_channel(&self, channel: u8) -> Result<()> {
        self.check_channel(channel)?;
        let code = self.driver.open_channel(self.handle(), channel);
        if code != 0 {
            return Err(RelayPanelError::ChannelOperationFailed {
                action: "open",
                device: self.device.to_string(),
                channel,
                code,
            });
        }
        debug!("Opened channel {} on {}", channel, self.device);
        Ok(())
    }

    /// Close (release) one channel
    pub fn close_channel(&self, channel: u8) -> Result<()> {
        self.check_channel(channel)?;
        let code = self.driver.close_channel(self.handle(), channel);
        if code != 0 {
            return Err(RelayPanelError::ChannelOperationFailed {
                action: "close",
                device: self.device.to_string(),
                channel,
                code,
            });
        }
        debug!("Closed channel {} on {}", channel, self.device);
        Ok(())
    }

    /// Close every channel on the board
    pub fn close_all_channels(&self) -> Result<()> {
        let code = self.driver.close_all_channels(self.handle());
        if code != 0 {
            return Err(RelayPanelError::ChannelOperationFailed {
                action: "close all",
                device: self.device.to_string(),
                channel: 0,
                code,
            });
        }
        debug!("Closed all channels on {}", self.device);
        Ok(())
    }

    /// Read the status bitmap
    pub fn status(&self) -> Result<ChannelStatus> {
        let raw = self.driver.status_bitmap(self.handle());
        u8::try_from(raw)
            .map(ChannelStatus::from_bits)
            .map_err(|_| RelayPanelError::StatusReadFailed(self.device.to_string()))
    }

    /// Close the device now
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.driver.close_device(handle);
            debug!("Closed device {}", self.device);
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("device", &self.device)
            .field("channel_count", &self.channel_count)
            .field("open", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

/// Log line shared by the channel operations
pub(crate) fn log_status(device: &DeviceId, channel_count: u8, status: ChannelStatus) {
    info!("Relay {} num ch={} state={}", device, channel_count, status);
}
