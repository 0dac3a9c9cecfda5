//! GUI controller
//!
//! Owns the Slint main window, forwards its callbacks to the `AppController` and
//! applies `AppState` snapshots to the row model on a timer.

use crate::{MainWindow, RelayRow};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use relaypanel::config::{AppConfig, WindowState};
use relaypanel::controller::{AppController, AppState};
use relaypanel::utils::load_window_icon;
use slint::{
    ComponentHandle, Image, Model, ModelRc, Rgba8Pixel, SharedPixelBuffer, SharedString, Timer,
    TimerMode, VecModel,
};
use std::rc::Rc;
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interval at which queued state updates are applied
const STATE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Main window plus its link to the application controller
pub struct GuiController {
    window: MainWindow,
    controller: Arc<Mutex<AppController>>,
    rows: Rc<VecModel<RelayRow>>,
    state_receiver: Option<mpsc::Receiver<AppState>>,
    state_timer: Timer,
}

impl GuiController {
    /// Build the window and wire its callbacks
    pub fn new(
        controller: Arc<Mutex<AppController>>,
        state_receiver: mpsc::Receiver<AppState>,
        config: &AppConfig,
    ) -> Result<Self> {
        let window = MainWindow::new().context("Failed to create main window")?;
        let rows = Rc::new(VecModel::<RelayRow>::default());
        window.set_rows(ModelRc::from(Rc::clone(&rows)));

        apply_window_state(&window, config.window_state);
        match load_window_icon(&config.preferences.icon_path) {
            Ok(icon) => {
                let buffer = SharedPixelBuffer::<Rgba8Pixel>::clone_from_slice(
                    &icon.rgba,
                    icon.width,
                    icon.height,
                );
                window.set_window_icon(Image::from_rgba8(buffer));
            }
            Err(e) => warn!("Using default window icon: {}", e),
        }

        let gui = Self {
            window,
            controller,
            rows,
            state_receiver: Some(state_receiver),
            state_timer: Timer::default(),
        };
        gui.register_callbacks();
        Ok(gui)
    }

    fn register_callbacks(&self) {
        let window = &self.window;

        let controller = Arc::clone(&self.controller);
        window.on_set_duration(move |row, text, unit| {
            dispatch(&controller, |c| c.set_duration(row_index(row), &text, &unit));
        });

        let controller = Arc::clone(&self.controller);
        window.on_toggle(move |row| dispatch(&controller, |c| c.toggle(row_index(row))));

        let controller = Arc::clone(&self.controller);
        window.on_open_channel(move |row| {
            dispatch(&controller, |c| c.open_channel(row_index(row)));
        });

        let controller = Arc::clone(&self.controller);
        window.on_close_channel(move |row| {
            dispatch(&controller, |c| c.close_channel(row_index(row)));
        });

        let controller = Arc::clone(&self.controller);
        window.on_load_defaults(move || dispatch(&controller, AppController::load_defaults));

        let controller = Arc::clone(&self.controller);
        window.on_save_defaults(move || dispatch(&controller, AppController::save_defaults));

        let controller = Arc::clone(&self.controller);
        window.on_close_all(move || dispatch(&controller, AppController::close_all_relays));

        window.on_exit(|| {
            info!("Exit selected from File menu");
            if let Err(e) = slint::quit_event_loop() {
                warn!("Failed to quit event loop: {}", e);
            }
        });
    }

    /// Run the event loop until the window closes; returns the final window size
    pub fn run(mut self) -> Result<WindowState> {
        if let Some(receiver) = self.state_receiver.take() {
            // Show whatever discovery already queued before the first frame
            drain_states(&receiver, &self.window, &self.rows);

            let window = self.window.as_weak();
            let rows = Rc::clone(&self.rows);
            self.state_timer
                .start(TimerMode::Repeated, STATE_POLL_INTERVAL, move || {
                    if let Some(window) = window.upgrade() {
                        drain_states(&receiver, &window, &rows);
                    }
                });
        }

        info!("Starting GUI event loop");
        self.window.run().context("GUI event loop failed")?;
        self.state_timer.stop();

        Ok(current_window_state(&self.window))
    }
}

/// Run an operator action, routing any failure to the status line
fn dispatch<T>(
    controller: &Arc<Mutex<AppController>>,
    action: impl FnOnce(&mut AppController) -> relaypanel::Result<T>,
) {
    let mut controller = controller.lock();
    if let Err(e) = action(&mut controller) {
        controller.report_failure(&e);
    }
}

/// Slint row indices are `int`; a negative one can never name a row
fn row_index(row: i32) -> usize {
    usize::try_from(row).unwrap_or(usize::MAX)
}

fn drain_states(receiver: &mpsc::Receiver<AppState>, window: &MainWindow, rows: &VecModel<RelayRow>) {
    if let Some(state) = receiver.try_iter().last() {
        apply_state(window, rows, &state);
    }
}

fn apply_state(window: &MainWindow, rows: &VecModel<RelayRow>, state: &AppState) {
    let same_rows = rows.row_count() == state.rows.len()
        && rows
            .iter()
            .zip(&state.rows)
            .all(|(shown, row)| shown.key.as_str() == row.key);

    if same_rows {
        // Keep whatever the operator typed into the entries
        for (i, row) in state.rows.iter().enumerate() {
            if let Some(mut shown) = rows.row_data(i) {
                shown.alias = SharedString::from(row.alias.as_str());
                shown.duration_label = SharedString::from(row.duration_label.as_str());
                shown.pulsing = row.pulsing;
                rows.set_row_data(i, shown);
            }
        }
    } else {
        debug!("Rebuilding row model with {} rows", state.rows.len());
        let entry_text = SharedString::from(state.entry_text.as_str());
        rows.set_vec(
            state
                .rows
                .iter()
                .map(|row| RelayRow {
                    key: SharedString::from(row.key.as_str()),
                    alias: SharedString::from(row.alias.as_str()),
                    entry_text: entry_text.clone(),
                    duration_label: SharedString::from(row.duration_label.as_str()),
                    pulsing: row.pulsing,
                })
                .collect::<Vec<_>>(),
        );
    }

    window.set_status(SharedString::from(state.status.as_str()));
}

#[expect(
    clippy::cast_precision_loss,
    reason = "Window dimensions are far below f32's exact integer range"
)]
fn apply_window_state(window: &MainWindow, state: WindowState) {
    window.set_initial_width(state.width as f32);
    window.set_initial_height(state.height as f32);
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Logical window sizes are small positive values"
)]
fn current_window_state(window: &MainWindow) -> WindowState {
    let window = window.window();
    let size = window.size().to_logical(window.scale_factor());
    WindowState {
        width: size.width.round() as u32,
        height: size.height.round() as u32,
    }
}
