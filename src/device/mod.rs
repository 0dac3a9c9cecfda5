//! Relay board registry module
//!
//! This module tracks the relay boards reported by the driver and manages access
//! to them.
//!
//! # Overview
//!
//! - **Enumeration**: walks the driver's device list into an ordered list of
//!   5-character serials; duplicates are logged and dropped
//! - **Sessions**: a device is used through a `DeviceSession`, which owns the
//!   driver handle and closes it when dropped
//! - **Exclusivity**: at most one session per device is alive at a time; a second
//!   open on the same device fails with `DeviceBusy` instead of displacing it
//!
//! # Example Usage
//!
//! ```no_run
//! use relaypanel::device::DeviceRegistry;
//! use relaypanel::driver::NativeDriver;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let driver = Arc::new(NativeDriver::load(Path::new("."))?);
//! let registry = DeviceRegistry::new(driver);
//! registry.enumerate()?;
//!
//! for id in registry.device_ids() {
//!     let session = registry.open(&id)?;
//!     println!("{}: {} channels, state {}", id, session.channel_count(), session.status()?);
//! }
//! # Ok::<(), relaypanel::error::RelayPanelError>(())
//! ```

pub mod id;
pub mod registry;
pub mod session;

pub use id::{ChannelKey, DeviceId};
pub use registry::DeviceRegistry;
pub use session::{ChannelStatus, DeviceSession, MAX_CHANNELS};
