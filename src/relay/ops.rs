//! Channel operations
//!
//! Each operation opens a session on the addressed device, acts on one channel
//! and releases the session before returning. Relays latch, so a channel stays
//! open after its device session is closed.

use crate::device::session::log_status;
use crate::device::{ChannelStatus, DeviceRegistry};
use crate::error::Result;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Open (energize) `channel` on the device at `device_index`
pub fn switch_open(
    registry: &DeviceRegistry,
    device_index: usize,
    channel: u8,
) -> Result<ChannelStatus> {
    let session = registry.open_by_index(device_index)?;
    session.open_channel(channel)?;
    let status = session.status()?;
    log_status(session.device(), session.channel_count(), status);
    session.close();
    Ok(status)
}

/// Close (release) `channel` on the device at `device_index`
pub fn switch_close(
    registry: &DeviceRegistry,
    device_index: usize,
    channel: u8,
) -> Result<ChannelStatus> {
    let session = registry.open_by_index(device_index)?;
    session.close_channel(channel)?;
    let status = session.status()?;
    log_status(session.device(), session.channel_count(), status);
    session.close();
    Ok(status)
}

/// Close every channel on the device at `device_index`
pub fn close_all(registry: &DeviceRegistry, device_index: usize) -> Result<ChannelStatus> {
    let session = registry.open_by_index(device_index)?;
    session.close_all_channels()?;
    let status = session.status()?;
    log_status(session.device(), session.channel_count(), status);
    session.close();
    Ok(status)
}

/// Open `channel`, wait `duration` on the calling thread, then close it
///
/// Blocks the caller for the whole pulse. The session is held throughout, so the
/// device is busy for other callers until the pulse ends.
pub fn fire_blocking(
    registry: &DeviceRegistry,
    device_index: usize,
    duration: Duration,
    channel: u8,
) -> Result<()> {
    let session = registry.open_by_index(device_index)?;
    session.open_channel(channel)?;
    thread::sleep(duration);
    session.close_channel(channel)?;
    info!(
        "<<<Relay {} ch {} flicked for {}s>>>",
        session.device(),
        channel,
        duration.as_secs_f64()
    );
    session.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, RelayDriver, SimulatedBoard, SimulatedDriver};
    use crate::error::RelayPanelError;
    use std::sync::Arc;
    use std::time::Instant;

    fn setup(boards: Vec<SimulatedBoard>) -> (Arc<SimulatedDriver>, DeviceRegistry) {
        let driver = Arc::new(SimulatedDriver::new(boards));
        let registry = DeviceRegistry::new(Arc::clone(&driver) as Arc<dyn RelayDriver>);
        registry.enumerate().unwrap();
        (driver, registry)
    }

    #[test]
    fn test_switch_open_and_close() {
        let (driver, registry) = setup(vec![SimulatedBoard::new("AB12C", 2)]);

        let status = switch_open(&registry, 0, 2).unwrap();
        assert!(status.is_open(2));
        assert!(!status.is_open(1));
        // Session released, relay stays latched
        assert_eq!(driver.open_handle_count(), 0);
        assert_eq!(driver.status_of("AB12C"), 0b10);

        let status = switch_close(&registry, 0, 2).unwrap();
        assert_eq!(status.bits(), 0);
        assert_eq!(driver.open_handle_count(), 0);
    }

    #[test]
    fn test_switch_uses_requested_channel() {
        let (driver, registry) = setup(vec![SimulatedBoard::new("AB12C", 4)]);
        switch_open(&registry, 0, 3).unwrap();
        assert!(
            driver
                .calls()
                .contains(&DriverCall::OpenChannel("AB12C".to_string(), 3))
        );
    }

    #[test]
    fn test_rejected_channel_op_releases_session() {
        let (driver, registry) =
            setup(vec![SimulatedBoard::new("AB12C", 1).rejecting_channel_ops()]);

        assert!(matches!(
            switch_open(&registry, 0, 1),
            Err(RelayPanelError::ChannelOperationFailed { action: "open", code: 1, .. })
        ));
        assert_eq!(driver.open_handle_count(), 0);
    }

    #[test]
    fn test_close_all() {
        let (driver, registry) = setup(vec![SimulatedBoard::new("AB12C", 2)]);
        switch_open(&registry, 0, 1).unwrap();
        switch_open(&registry, 0, 2).unwrap();

        let status = close_all(&registry, 0).unwrap();
        assert_eq!(status.bits(), 0);
        assert_eq!(driver.status_of("AB12C"), 0);
    }

    #[test]
    fn test_fire_blocking_pulses_channel() {
        let (driver, registry) = setup(vec![SimulatedBoard::new("AB12C", 1)]);

        let start = Instant::now();
        fire_blocking(&registry, 0, Duration::from_millis(30), 1).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));

        let calls = driver.calls();
        let open_at = calls
            .iter()
            .position(|c| *c == DriverCall::OpenChannel("AB12C".to_string(), 1))
            .unwrap();
        let close_at = calls
            .iter()
            .position(|c| *c == DriverCall::CloseChannel("AB12C".to_string(), 1))
            .unwrap();
        assert!(open_at < close_at);
        assert_eq!(driver.status_of("AB12C"), 0);
        assert_eq!(driver.open_handle_count(), 0);
    }
}
