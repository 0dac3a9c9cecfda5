//! GUI module
//!
//! Provides the Slint-based main window: the File menu, one row of controls per
//! relay channel and the status line, kept in sync with the application controller.

pub mod gui_controller;

pub use gui_controller::GuiController;
