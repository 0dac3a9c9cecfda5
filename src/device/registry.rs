//! Device registry
//!
//! Holds the ordered, de-duplicated list of enumerated boards and hands out
//! [`DeviceSession`]s, at most one per device at a time.

use crate::device::session::{DeviceLease, DeviceSession, MAX_CHANNELS};
use crate::device::DeviceId;
use crate::driver::RelayDriver;
use crate::error::{RelayPanelError, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{debug, error, info, warn};

/// Enumerated relay boards and their session leases
pub struct DeviceRegistry {
    driver: Arc<dyn RelayDriver>,
    devices: RwLock<Vec<DeviceId>>,
    leases: Mutex<HashMap<DeviceId, Arc<AtomicBool>>>,
}

impl DeviceRegistry {
    /// Create an empty registry over `driver`
    pub fn new(driver: Arc<dyn RelayDriver>) -> Self {
        Self {
            driver,
            devices: RwLock::new(Vec::new()),
            leases: Mutex::new(HashMap::new()),
        }
    }

    /// Re-enumerate attached boards, replacing the current list
    ///
    /// Duplicate identifiers are logged and dropped. An identifier that is not a
    /// 5-character serial fails the whole enumeration and leaves the previous list.
    pub fn enumerate(&self) -> Result<usize> {
        let mut found: Vec<DeviceId> = Vec::new();

        for raw in self.driver.enumerate_ids() {
            debug!("Enumerated id {}", raw);
            let id = DeviceId::new(&raw).inspect_err(|_| {
                error!("Driver reported malformed device id {:?}", raw);
            })?;

            if found.contains(&id) {
                warn!("Found duplicate ID={}, ignoring", id);
                continue;
            }
            found.push(id);
        }

        let count = found.len();
        info!("Found devices: {}", count);
        *self.devices.write() = found;
        Ok(count)
    }

    /// Enumerated identifiers in driver order
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.read().clone()
    }

    /// Number of enumerated devices
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Whether no devices are enumerated
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Position of `id` in the enumeration
    pub fn index_of(&self, id: &DeviceId) -> Option<usize> {
        self.devices.read().iter().position(|d| d == id)
    }

    /// Identifier at enumeration position `index`
    pub fn device_at(&self, index: usize) -> Option<DeviceId> {
        self.devices.read().get(index).cloned()
    }

    fn lease_flag(&self, id: &DeviceId) -> Arc<AtomicBool> {
        let mut leases = self.leases.lock();
        Arc::clone(
            leases
                .entry(id.clone())
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    /// Open a session on `id`
    ///
    /// Fails with `DeviceBusy` while another session on the same device is alive.
    pub fn open(&self, id: &DeviceId) -> Result<DeviceSession> {
        if self.index_of(id).is_none() {
            return Err(RelayPanelError::DeviceNotFound(id.to_string()));
        }

        let lease = DeviceLease::try_acquire(self.lease_flag(id))
            .ok_or_else(|| RelayPanelError::DeviceBusy(id.to_string()))?;

        let Some(handle) = self.driver.open_device(id.as_str()) else {
            error!("Cannot open device with id={}", id);
            return Err(RelayPanelError::DeviceOpenFailed(id.to_string()));
        };

        let count = self.driver.num_relays(handle);
        let channel_count = match u8::try_from(count) {
            Ok(n) if (1..=MAX_CHANNELS).contains(&n) => n,
            _ => {
                error!("Bad number of channels on {}: {}", id, count);
                self.driver.close_device(handle);
                return Err(RelayPanelError::BadChannelCount {
                    device: id.to_string(),
                    count,
                });
            }
        };

        debug!("Opened device {} ({} channels)", id, channel_count);
        Ok(DeviceSession::new(
            Arc::clone(&self.driver),
            id.clone(),
            handle,
            channel_count,
            lease,
        ))
    }

    /// Open a session on the device at enumeration position `index`
    pub fn open_by_index(&self, index: usize) -> Result<DeviceSession> {
        let id = self
            .device_at(index)
            .ok_or_else(|| RelayPanelError::DeviceNotFound(format!("#{index}")))?;
        self.open(&id)
    }

    /// Channel count of `id`, read through a short-lived session
    pub fn channel_count(&self, id: &DeviceId) -> Result<u8> {
        let session = self.open(id)?;
        let count = session.channel_count();
        session.close();
        Ok(count)
    }
}
