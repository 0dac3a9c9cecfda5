//! Relay driver binding module
//!
//! This module binds the vendor `usb_relay_device` shared library and exposes it
//! to the rest of the crate through the [`RelayDriver`] trait.
//!
//! # Overview
//!
//! The vendor library is a closed, pre-built binary. It owns the HID protocol;
//! this crate only resolves its exports and calls them:
//!
//! - **Enumeration**: `usb_relay_device_enumerate` returns the head of a linked list
//!   of device info nodes, walked with `usb_relay_device_next_dev` until null.
//! - **Open/close**: devices are opened by serial number and yield an opaque handle.
//! - **Channels**: channels are opened/closed one at a time by 1-based index; the
//!   status bitmap reports which channels are currently open.
//!
//! # Architecture
//!
//! - `RelayDriver`: the call surface used by the device registry
//! - `NativeDriver`: `libloading`-backed implementation over the vendor library
//! - `SimulatedDriver`: in-memory boards, used by tests
//! - `DeviceHandle`: opaque handle value, only meaningful to the driver that issued it

pub mod native;
pub mod simulated;

pub use native::{NativeDriver, library_file_name};
pub use simulated::{DriverCall, SimulatedBoard, SimulatedDriver};

/// Opaque device handle issued by a [`RelayDriver`]
///
/// Stored as an address-sized integer so sessions can move between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(usize);

impl DeviceHandle {
    /// Wrap a raw handle value
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw handle value
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

/// Call surface of the vendor relay library
///
/// Return values follow the C library: error codes are `0` on success, the channel
/// count and status bitmap are negative on failure, and `open_device` yields `None`
/// where the library returns a null handle.
pub trait RelayDriver: Send + Sync {
    /// Walk the enumeration list and return every reported identifier in order
    fn enumerate_ids(&self) -> Vec<String>;

    /// Open a device by serial number
    fn open_device(&self, serial: &str) -> Option<DeviceHandle>;

    /// Close a device handle
    fn close_device(&self, handle: DeviceHandle);

    /// Number of relay channels on the device
    fn num_relays(&self, handle: DeviceHandle) -> i32;

    /// Bitmap of open channels (bit 0 = channel 1)
    fn status_bitmap(&self, handle: DeviceHandle) -> i32;

    /// Open (energize) one channel
    fn open_channel(&self, handle: DeviceHandle, channel: u8) -> i32;

    /// Close (release) one channel
    fn close_channel(&self, handle: DeviceHandle, channel: u8) -> i32;

    /// Close every channel on the device
    fn close_all_channels(&self, handle: DeviceHandle) -> i32;
}
