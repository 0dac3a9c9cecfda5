//! `RelayPanel` - Desktop control panel for USB HID relay boards
//!
//! Loads the vendor relay library, discovers the attached boards and shows one row
//! of controls per relay channel.

// Set Windows subsystem to hide console window
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![expect(
    missing_docs,
    reason = "Slint-generated code from include_modules! lacks doc comments"
)]
#![allow(clippy::unwrap_used)] // Slint-generated code from include_modules! uses .unwrap() extensively

// GUI module is only in the binary, not the library
mod gui;

use anyhow::{Context, Result};
use gui::GuiController;
use parking_lot::Mutex;
use relaypanel::{
    config::ConfigManager,
    controller::{AppController, AppState},
    driver::NativeDriver,
    error::get_user_friendly_error,
    utils,
};
use std::sync::{Arc, mpsc};
use tracing::{error, info, warn};

// Include Slint-generated code
slint::include_modules!();

/// Capacity of the controller to GUI state queue
const STATE_CHANNEL_CAPACITY: usize = 32;

/// Main entry point for the application
///
/// Initializes logging and configuration, loads the relay library, discovers
/// boards, then runs the GUI until the window is closed.
fn main() -> Result<()> {
    let config_dir =
        ConfigManager::ensure_config_dir().context("Failed to create configuration directory")?;
    utils::init_logging(&config_dir).context("Failed to initialize logging system")?;

    info!("RelayPanel v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ConfigManager::load().context("Failed to load application configuration")?;
    info!(
        "Configuration loaded, relay library directory: {}",
        config.preferences.library_dir.display()
    );

    let driver = match NativeDriver::load(&config.preferences.library_dir) {
        Ok(driver) => Arc::new(driver),
        Err(e) => {
            error!("Failed to load relay library: {}", e);
            show_error_and_exit(&format!(
                "Failed to start RelayPanel:\n\n{}",
                get_user_friendly_error(&e)
            ));
            return Err(e).context("Failed to load relay library");
        }
    };

    let (app_state_tx, app_state_rx) = mpsc::sync_channel::<AppState>(STATE_CHANNEL_CAPACITY);

    info!("Creating application controller");
    let mut app_controller = AppController::new(
        config.clone(),
        driver,
        ConfigManager::store_paths(),
        app_state_tx,
    );

    if let Err(e) = app_controller.discover() {
        error!("Device discovery failed: {}", e);
        show_error_and_exit(&format!(
            "Failed to enumerate relay boards:\n\n{}",
            get_user_friendly_error(&e)
        ));
        return Err(e).context("Failed to enumerate relay boards");
    }

    let app_controller_handle = Arc::new(Mutex::new(app_controller));

    info!("Starting pulse event loop thread");
    let event_loop_handle = AppController::spawn_event_loop(&app_controller_handle);

    info!("Creating GUI controller");
    let gui_controller = GuiController::new(
        Arc::clone(&app_controller_handle),
        app_state_rx,
        &config,
    )
    .context("Failed to create GUI controller")?;

    let window_state = gui_controller
        .run()
        .context("GUI event loop terminated with error")?;

    info!("RelayPanel shutting down");
    {
        let mut controller = app_controller_handle.lock();
        controller.shutdown();

        let mut config = controller.config.lock();
        config.window_state = window_state;
        if let Err(e) = ConfigManager::save(&config) {
            warn!("Failed to save window state: {}", e);
        }
    }

    if let Some(handle) = event_loop_handle
        && handle.join().is_err()
    {
        error!("Pulse event loop thread panicked");
    }

    // Last reference: dropping the controller unloads the relay library
    drop(app_controller_handle);
    Ok(())
}

/// Shows an error dialog and exits the application.
fn show_error_and_exit(message: &str) {
    use rfd::MessageDialog;

    eprintln!("ERROR: {message}");
    MessageDialog::new()
        .set_title("RelayPanel - Error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .set_level(rfd::MessageLevel::Error)
        .show();

    std::process::exit(1);
}
