//! Application logic controller module
//!
//! This module coordinates between the device layer, the operator stores and the
//! GUI, implementing the core application logic.
//!
//! # Overview
//!
//! The application controller is the central coordinator that:
//! - **Discovers boards** through the `DeviceRegistry` and builds one row per channel
//! - **Routes operator actions** (set duration, toggle, open, close) to channel operations
//! - **Loads and saves defaults** and display aliases
//! - **Receives pulse completions** from the `PulseScheduler`
//! - **Sends state updates** to the GUI for display
//!
//! # Architecture
//!
//! - `AppController`: owns the rows, the registry and the pulse scheduler
//! - `AppState`: snapshot sent to the GUI after every change
//! - **Thread-safe**: the GUI shares the controller as `Arc<Mutex<AppController>>`
//!
//! # Event Flow
//!
//! ```text
//! GUI callback → AppController → DeviceRegistry / PulseScheduler
//!                      ↑                        ↓
//!               PulseEvent ←──────── pulse worker
//!                      ↓
//!                  AppState → GUI
//! ```
//!
//! # Failures
//!
//! Operator actions return `Result`; the GUI passes failures to
//! `AppController::report_failure`, which shows `operation failed: <reason>` in the
//! status line. No operator input can stop the event loop.

pub mod app_controller;

pub use app_controller::{AppController, AppState, RowState};
