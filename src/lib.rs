//! `RelayPanel` - Desktop control panel for USB HID relay boards
//!
//! Enumerates the relay boards exposed by the vendor `usb_relay_device` library and
//! offers one row of controls per relay channel: open, close, or pulse for a set
//! duration. Per-channel default durations and display aliases persist in the
//! user's configuration directory.
//!
//! # Layers
//!
//! - `driver`: binding to the vendor library (and a simulated stand-in)
//! - `device`: enumeration and exclusive device sessions
//! - `relay`: channel operations, timed pulses, and the per-channel row model
//! - `config`: application configuration and the operator stores
//! - `controller`: glue between the GUI and the layers above

// Module declarations
pub mod config;
pub mod controller;
pub mod device;
pub mod driver;
pub mod error;
pub mod relay;
pub mod utils;

// Re-export commonly used types
pub use error::{RelayPanelError, Result};
