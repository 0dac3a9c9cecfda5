//! Utility modules
//!
//! Provides logging setup and window icon decoding.

pub mod icon;
pub mod logging;

pub use icon::{IconPixels, load_window_icon};
pub use logging::init_logging;
