//! Application controller implementation
//!
//! This module implements the controller that owns the relay rows and routes
//! operator actions from the GUI to the device layer.

use crate::config::{AliasStore, AppConfig, StorePaths, load_defaults, save_defaults};
use crate::device::{ChannelKey, ChannelStatus, DeviceRegistry};
use crate::driver::RelayDriver;
use crate::error::{RelayPanelError, Result, operation_failed};
use crate::relay::{ChannelRow, PulseEvent, PulseOutcome, PulseScheduler, ops};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

/// Capacity of the pulse completion queue
const PULSE_EVENT_CAPACITY: usize = 32;

/// Snapshot of one row for display
#[derive(Debug, Clone, PartialEq)]
pub struct RowState {
    /// Channel key, e.g. `AB12C1`
    pub key: String,
    /// Text for the Relay column
    pub alias: String,
    /// Current Duration column text
    pub duration_label: String,
    /// Whether a pulse is running
    pub pulsing: bool,
}

/// Application state for GUI updates
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// One entry per channel row, in display order
    pub rows: Vec<RowState>,
    /// Initial text for each row's duration entry
    pub entry_text: String,
    /// Status line
    pub status: String,
}

/// Application logic controller
pub struct AppController {
    /// Application configuration (public for GUI access)
    pub config: Arc<Mutex<AppConfig>>,
    registry: Arc<DeviceRegistry>,
    scheduler: PulseScheduler,
    stores: StorePaths,
    rows: Vec<ChannelRow>,
    status: String,
    /// Pulse completions (taken when the event loop starts)
    pulse_receiver: Option<mpsc::Receiver<PulseEvent>>,
    /// State sender to GUI
    gui_state_sender: mpsc::SyncSender<AppState>,
    running: Arc<AtomicBool>,
}

impl AppController {
    /// Create a controller over `driver`; call [`discover`](Self::discover) to build rows
    pub fn new(
        config: AppConfig,
        driver: Arc<dyn RelayDriver>,
        stores: StorePaths,
        gui_state_sender: mpsc::SyncSender<AppState>,
    ) -> Self {
        let registry = Arc::new(DeviceRegistry::new(driver));
        let (pulse_tx, pulse_rx) = mpsc::sync_channel(PULSE_EVENT_CAPACITY);

        Self {
            config: Arc::new(Mutex::new(config)),
            scheduler: PulseScheduler::new(Arc::clone(&registry), pulse_tx),
            registry,
            stores,
            rows: Vec::new(),
            status: String::new(),
            pulse_receiver: Some(pulse_rx),
            gui_state_sender,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Enumerate boards and build one row per channel
    ///
    /// Aliases and stored defaults are applied to the new rows. A board that cannot
    /// be opened to read its channel count is skipped and named in the status line.
    /// Returns the number of rows.
    pub fn discover(&mut self) -> Result<usize> {
        use tracing::{info, warn};

        let device_count = self.registry.enumerate()?;
        let default_secs = self.config.lock().preferences.default_pulse_secs;
        let aliases = AliasStore::load(&self.stores.aliases);

        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        for (index, id) in self.registry.device_ids().into_iter().enumerate() {
            let count = match self.registry.channel_count(&id) {
                Ok(count) => count,
                Err(e) => {
                    // No channel count means no rows, but the operator should see why
                    warn!("Skipping device {}: {}", id, e);
                    skipped.push(e.to_string());
                    continue;
                }
            };
            for channel in 1..=count {
                let key = ChannelKey::new(id.clone(), channel);
                let alias = aliases.alias_on_board(&key, count);
                rows.push(ChannelRow::new(id.clone(), index, channel, default_secs, alias));
            }
        }

        // Missing store is fine; a corrupt one only costs the defaults
        if let Err(e) = load_defaults(&mut rows, &self.stores.defaults) {
            warn!("Failed to load default durations: {}", e);
        }

        info!("{} device(s), {} relay channel(s)", device_count, rows.len());
        self.rows = rows;
        self.status = match skipped.first() {
            None => format!("Found devices: {device_count}"),
            Some(reason) => format!(
                "Found devices: {device_count} ({} skipped: {reason})",
                skipped.len()
            ),
        };
        self.send_state_update();
        Ok(self.rows.len())
    }

    /// Rows in display order
    pub fn rows(&self) -> &[ChannelRow] {
        &self.rows
    }

    /// Shared registry
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    fn row(&self, index: usize) -> Result<&ChannelRow> {
        self.rows.get(index).ok_or(RelayPanelError::NoSuchRow(index))
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut ChannelRow> {
        self.rows
            .get_mut(index)
            .ok_or(RelayPanelError::NoSuchRow(index))
    }

    /// Apply a duration entry to row `index`
    pub fn set_duration(&mut self, index: usize, text: &str, unit: &str) -> Result<f64> {
        let row = self.row_mut(index)?;
        let seconds = row.set_duration(text, unit)?;
        let status = format!("{} set to {}", row.alias(), row.duration_label());
        self.status = status;
        self.send_state_update();
        Ok(seconds)
    }

    /// Start a pulse of the row's current duration on its channel
    pub fn fire(&mut self, index: usize) -> Result<()> {
        use tracing::info;

        let row = self.row(index)?;
        // Finite and non-negative already, but may still overflow Duration
        let duration = Duration::try_from_secs_f64(row.duration())
            .map_err(|_| RelayPanelError::InvalidDuration(row.duration().to_string()))?;
        self.scheduler
            .fire(row.device_index(), row.channel(), duration)?;

        // Cleared again by the pulse event, or by shutdown
        let row = self.row_mut(index)?;
        row.set_pulsing(true);
        info!("Firing {} for {}", row.key(), row.duration_label());
        let status = format!("{} pulsing for {}", row.alias(), row.duration_label());
        self.status = status;
        self.send_state_update();
        Ok(())
    }

    /// Cancel the pulse on row `index`; `false` if it was not pulsing
    pub fn cancel_pulse(&mut self, index: usize) -> Result<bool> {
        let key = self.row(index)?.key().clone();
        Ok(self.scheduler.cancel(&key))
    }

    /// Toggle action: fire the row, or cancel its pulse if one is running
    pub fn toggle(&mut self, index: usize) -> Result<()> {
        // Ask the scheduler, not the row flag: the flag lags until the pulse event
        // has been applied
        if self.cancel_pulse(index)? {
            return Ok(());
        }
        self.fire(index)
    }

    /// Open (energize) the row's channel
    pub fn open_channel(&mut self, index: usize) -> Result<ChannelStatus> {
        let row = self.row(index)?;
        let status = ops::switch_open(&self.registry, row.device_index(), row.channel())?;
        let message = format!("{} open", row.alias());
        self.status = message;
        self.send_state_update();
        Ok(status)
    }

    /// Close (release) the row's channel
    pub fn close_channel(&mut self, index: usize) -> Result<ChannelStatus> {
        let row = self.row(index)?;
        let status = ops::switch_close(&self.registry, row.device_index(), row.channel())?;
        let message = format!("{} closed", row.alias());
        self.status = message;
        self.send_state_update();
        Ok(status)
    }

    /// Close every channel on every board not held by a running pulse
    ///
    /// Returns the number of boards closed. Busy boards are skipped; the first
    /// other failure is returned after all boards were tried.
    pub fn close_all_relays(&mut self) -> Result<usize> {
        use tracing::{info, warn};

        let mut closed = 0;
        let mut first_error = None;
        for index in 0..self.registry.len() {
            match ops::close_all(&self.registry, index) {
                Ok(_) => closed += 1,
                // The pulse closes its own channel when it ends
                Err(RelayPanelError::DeviceBusy(id)) => {
                    warn!("Not closing {}: a pulse is running", id);
                }
                Err(e) => {
                    warn!("Failed to close all channels on device #{}: {}", index, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        info!("Closed all channels on {} board(s)", closed);
        self.status = format!("All relays closed on {closed} board(s)");
        self.send_state_update();
        Ok(closed)
    }

    /// File > Load Defaults: re-read aliases and stored durations
    pub fn load_defaults(&mut self) -> Result<usize> {
        let aliases = AliasStore::load(&self.stores.aliases);
        let names: Vec<String> = self
            .rows
            .iter()
            .map(|row| aliases.alias_on_board(row.key(), self.channels_on(row)))
            .collect();
        for (row, name) in self.rows.iter_mut().zip(names) {
            row.set_alias(name);
        }
        let applied = load_defaults(&mut self.rows, &self.stores.defaults)?;
        self.status = format!("Loaded defaults for {applied} channel(s)");
        self.send_state_update();
        Ok(applied)
    }

    /// Rows shown for the row's board, i.e. its channel count
    fn channels_on(&self, row: &ChannelRow) -> u8 {
        let count = self
            .rows
            .iter()
            .filter(|r| r.device_id() == row.device_id())
            .count();
        u8::try_from(count).unwrap_or(u8::MAX)
    }

    /// File > Save Defaults: store every row's duration
    pub fn save_defaults(&mut self) -> Result<()> {
        save_defaults(&self.rows, &self.stores.defaults)?;
        self.status = format!("Saved defaults for {} channel(s)", self.rows.len());
        self.send_state_update();
        Ok(())
    }

    /// Show a failed operator action in the status line
    pub fn report_failure(&mut self, error: &RelayPanelError) {
        use tracing::error;

        error!("{}", error);
        self.status = operation_failed(error);
        self.send_state_update();
    }

    /// Apply a pulse completion to its row
    ///
    /// The row stays marked as pulsing when a newer pulse on the same channel was
    /// started before this event arrived.
    pub fn handle_pulse_event(&mut self, event: PulseEvent) {
        use tracing::{debug, warn};

        let still_pulsing = self.scheduler.is_pulsing(&event.key);
        let Some(row) = self.rows.iter_mut().find(|r| *r.key() == event.key) else {
            warn!("Pulse event for unknown channel {}", event.key);
            return;
        };
        if still_pulsing {
            debug!("{} re-fired before its last pulse event arrived", event.key);
        } else {
            row.set_pulsing(false);
        }

        self.status = match event.outcome {
            PulseOutcome::Completed => {
                format!("{} pulsed for {}", row.alias(), row.duration_label())
            }
            PulseOutcome::Cancelled { elapsed } => {
                format!("{} cancelled after {:.3}s", row.alias(), elapsed.as_secs_f64())
            }
            // Same wording as report_failure
            PulseOutcome::Failed(reason) => format!("operation failed: {reason}"),
        };
        debug!("Pulse event applied: {}", self.status);
        self.send_state_update();
    }

    fn snapshot(&self) -> AppState {
        AppState {
            rows: self
                .rows
                .iter()
                .map(|row| RowState {
                    key: row.key().to_string(),
                    alias: row.alias().to_string(),
                    duration_label: row.duration_label(),
                    pulsing: row.is_pulsing(),
                })
                .collect(),
            entry_text: self.config.lock().preferences.default_entry_text.clone(),
            status: self.status.clone(),
        }
    }

    /// Send the current state to the GUI
    pub fn send_state_update(&self) {
        use tracing::{debug, warn};

        // Never block: the GUI thread itself calls into the controller
        match self.gui_state_sender.try_send(self.snapshot()) {
            Ok(()) => debug!("State update sent to GUI"),
            Err(mpsc::TrySendError::Full(_)) => warn!("GUI state queue full, update dropped"),
            Err(mpsc::TrySendError::Disconnected(_)) => debug!("GUI state receiver gone"),
        }
    }

    /// Spawn the pulse event loop in a background thread. Only locks the controller while
    /// handling individual events, preventing GUI callbacks from being blocked.
    ///
    /// Returns `None` if the loop was already started.
    pub fn spawn_event_loop(
        controller: &Arc<Mutex<AppController>>,
    ) -> Option<std::thread::JoinHandle<()>> {
        let (receiver, running) = {
            let mut guard = controller.lock();
            (guard.pulse_receiver.take()?, Arc::clone(&guard.running))
        };
        let controller = Arc::downgrade(controller);

        Some(std::thread::spawn(move || {
            use std::sync::mpsc::RecvTimeoutError;
            use tracing::{info, warn};

            info!("Entering pulse event loop");
            while running.load(Ordering::SeqCst) {
                match receiver.recv_timeout(Duration::from_millis(100)) {
                    Ok(event) => {
                        // Controller dropped: nothing left to update
                        let Some(controller) = controller.upgrade() else {
                            break;
                        };
                        controller.lock().handle_pulse_event(event);
                    }
                    // Timeout lets the loop notice shutdown
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        warn!("Pulse event channel disconnected. Exiting event loop.");
                        break;
                    }
                }
            }
            info!("Pulse event loop exited");
        }))
    }

    /// Cancel in-flight pulses and stop the event loop
    pub fn shutdown(&mut self) {
        use tracing::info;

        info!("Shutting down controller");
        // Closes every channel held by a pulse and joins the workers
        self.scheduler.shutdown();
        self.running.store(false, Ordering::SeqCst);
        for row in &mut self.rows {
            row.set_pulsing(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DurationStore;
    use crate::driver::{SimulatedBoard, SimulatedDriver};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        driver: Arc<SimulatedDriver>,
        controller: AppController,
        states: mpsc::Receiver<AppState>,
    }

    fn harness(boards: Vec<SimulatedBoard>) -> Harness {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let driver = Arc::new(SimulatedDriver::new(boards));
        let (state_tx, state_rx) = mpsc::sync_channel(64);
        let controller = AppController::new(
            AppConfig::default(),
            Arc::clone(&driver) as Arc<dyn RelayDriver>,
            StorePaths::in_dir(dir.path()),
            state_tx,
        );
        Harness {
            _dir: dir,
            driver,
            controller,
            states: state_rx,
        }
    }

    fn latest(states: &mpsc::Receiver<AppState>) -> AppState {
        states.try_iter().last().expect("no state update sent")
    }

    #[test]
    fn test_discover_builds_row_per_channel() {
        let mut h = harness(vec![
            SimulatedBoard::new("AB12C", 1),
            SimulatedBoard::new("XY999", 2),
        ]);
        assert_eq!(h.controller.discover().unwrap(), 3);

        let state = latest(&h.states);
        let keys: Vec<_> = state.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["AB12C1", "XY9991", "XY9992"]);
        assert_eq!(state.rows[0].alias, "AB12C1");
        assert_eq!(state.rows[0].duration_label, "0.2s");
        assert_eq!(state.entry_text, "0.2");
        assert_eq!(state.status, "Found devices: 2");
    }

    #[test]
    fn test_discover_skips_unopenable_board() {
        let mut h = harness(vec![
            SimulatedBoard::new("AB12C", 1).unopenable(),
            SimulatedBoard::new("XY999", 1),
        ]);
        assert_eq!(h.controller.discover().unwrap(), 1);
        assert_eq!(h.controller.rows()[0].device_index(), 1);
        assert_eq!(
            latest(&h.states).status,
            "Found devices: 2 (1 skipped: Cannot open device AB12C)"
        );
    }

    #[test]
    fn test_discover_uses_legacy_single_channel_alias() {
        let mut h = harness(vec![
            SimulatedBoard::new("AB12C", 1),
            SimulatedBoard::new("XY999", 2),
        ]);
        std::fs::write(
            &h.controller.stores.aliases,
            r#"{"AB12C0": "Shutter", "XY9990": "Unused"}"#,
        )
        .unwrap();

        h.controller.discover().unwrap();
        let aliases: Vec<_> = h.controller.rows().iter().map(ChannelRow::alias).collect();
        assert_eq!(aliases, ["Shutter", "XY9991", "XY9992"]);

        // Reloading keeps the same rule
        h.controller.load_defaults().unwrap();
        assert_eq!(latest(&h.states).rows[0].alias, "Shutter");
    }

    #[test]
    fn test_discover_applies_aliases_and_defaults() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 2)]);
        std::fs::write(&h.controller.stores.aliases, r#"{"AB12C2": "Lamp"}"#).unwrap();
        let mut store = DurationStore::default();
        store.insert("AB12C2", 1.25);
        store.save(&h.controller.stores.defaults).unwrap();

        h.controller.discover().unwrap();
        let row = &h.controller.rows()[1];
        assert_eq!(row.alias(), "Lamp");
        assert!((row.duration() - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bad_duration_reported_in_status() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 1)]);
        h.controller.discover().unwrap();

        let err = h.controller.set_duration(0, "fast", "s").unwrap_err();
        h.controller.report_failure(&err);

        let state = latest(&h.states);
        assert_eq!(state.status, "operation failed: Invalid duration \"fast\"");
        assert_eq!(state.rows[0].duration_label, "0.2s");
    }

    #[test]
    fn test_set_duration_updates_label() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 1)]);
        h.controller.discover().unwrap();

        h.controller.set_duration(0, "1500", "ms").unwrap();
        assert_eq!(latest(&h.states).rows[0].duration_label, "1.5s");
    }

    #[test]
    fn test_open_close_use_row_channel() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 2)]);
        h.controller.discover().unwrap();

        let status = h.controller.open_channel(1).unwrap();
        assert!(status.is_open(2));
        assert!(!status.is_open(1));

        let status = h.controller.close_channel(1).unwrap();
        assert_eq!(status.bits(), 0);
        assert_eq!(h.driver.open_handle_count(), 0);
    }

    #[test]
    fn test_unknown_row() {
        let mut h = harness(vec![]);
        h.controller.discover().unwrap();
        assert!(matches!(
            h.controller.open_channel(0),
            Err(RelayPanelError::NoSuchRow(0))
        ));
    }

    #[test]
    fn test_fire_and_complete_via_event_loop() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 1)]);
        h.controller.discover().unwrap();
        h.controller.set_duration(0, "20", "ms").unwrap();

        let driver = Arc::clone(&h.driver);
        let states = h.states;
        let controller = Arc::new(Mutex::new(h.controller));
        let handle = AppController::spawn_event_loop(&controller).unwrap();
        assert!(AppController::spawn_event_loop(&controller).is_none());

        controller.lock().fire(0).unwrap();
        assert!(controller.lock().rows()[0].is_pulsing());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let done = loop {
            let state = states.recv_timeout(Duration::from_secs(5)).unwrap();
            if !state.rows[0].pulsing && state.status.contains("pulsed") {
                break state;
            }
            assert!(std::time::Instant::now() < deadline, "pulse never completed");
        };
        assert_eq!(done.status, "AB12C1 pulsed for 0.02s");
        assert_eq!(driver.status_of("AB12C"), 0);

        controller.lock().shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn test_toggle_cancels_running_pulse() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 1)]);
        h.controller.discover().unwrap();
        h.controller.set_duration(0, "30", "s").unwrap();

        h.controller.toggle(0).unwrap();
        assert_eq!(h.driver.status_of("AB12C"), 1);
        h.controller.toggle(0).unwrap();

        h.controller.shutdown();
        assert_eq!(h.driver.status_of("AB12C"), 0);
        assert!(!h.controller.rows()[0].is_pulsing());
    }

    #[test]
    fn test_late_pulse_event_keeps_new_pulse_running() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 1)]);
        h.controller.discover().unwrap();
        h.controller.set_duration(0, "0", "s").unwrap();
        h.controller.fire(0).unwrap();

        let key = h.controller.rows()[0].key().clone();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while h.controller.scheduler.is_pulsing(&key) {
            assert!(std::time::Instant::now() < deadline, "pulse never finished");
            std::thread::sleep(Duration::from_millis(5));
        }

        // Toggle before the finished pulse's event has been applied
        h.controller.set_duration(0, "30", "s").unwrap();
        h.controller.toggle(0).unwrap();
        assert!(h.controller.scheduler.is_pulsing(&key));

        let late = h
            .controller
            .pulse_receiver
            .as_ref()
            .unwrap()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(late.outcome, PulseOutcome::Completed);
        h.controller.handle_pulse_event(late);

        assert!(h.controller.rows()[0].is_pulsing());
        assert!(latest(&h.states).rows[0].pulsing);

        // Next toggle cancels rather than reporting a pulse in progress
        h.controller.toggle(0).unwrap();
        h.controller.shutdown();
        assert_eq!(h.driver.status_of("AB12C"), 0);
    }

    #[test]
    fn test_actions_on_pulsing_board_fail_fast() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 2)]);
        h.controller.discover().unwrap();
        h.controller.set_duration(0, "30", "s").unwrap();
        h.controller.fire(0).unwrap();

        assert!(matches!(
            h.controller.open_channel(1),
            Err(RelayPanelError::DeviceBusy(_))
        ));
        assert!(matches!(
            h.controller.fire(0),
            Err(RelayPanelError::PulseInProgress(_))
        ));
        h.controller.shutdown();
    }

    #[test]
    fn test_close_all_relays_skips_busy_board() {
        let mut h = harness(vec![
            SimulatedBoard::new("AB12C", 1),
            SimulatedBoard::new("XY999", 2),
        ]);
        h.controller.discover().unwrap();
        h.controller.open_channel(1).unwrap();
        h.controller.open_channel(2).unwrap();
        h.controller.set_duration(0, "30", "s").unwrap();
        h.controller.fire(0).unwrap();

        assert_eq!(h.controller.close_all_relays().unwrap(), 1);
        assert_eq!(h.driver.status_of("XY999"), 0);
        assert_eq!(h.driver.status_of("AB12C"), 1);
        h.controller.shutdown();
    }

    #[test]
    fn test_save_then_load_defaults() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 1)]);
        h.controller.discover().unwrap();
        h.controller.set_duration(0, "0.75", "s").unwrap();
        h.controller.save_defaults().unwrap();

        h.controller.set_duration(0, "3", "s").unwrap();
        assert_eq!(h.controller.load_defaults().unwrap(), 1);
        assert!((h.controller.rows()[0].duration() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_defaults_reloads_aliases() {
        let mut h = harness(vec![SimulatedBoard::new("AB12C", 1)]);
        h.controller.discover().unwrap();
        assert_eq!(h.controller.rows()[0].alias(), "AB12C1");

        std::fs::write(&h.controller.stores.aliases, r#"{"AB12C1": "Shutter"}"#).unwrap();
        h.controller.load_defaults().unwrap();
        assert_eq!(latest(&h.states).rows[0].alias, "Shutter");
    }
}
