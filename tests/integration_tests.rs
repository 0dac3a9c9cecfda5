//! Integration tests for `RelayPanel`
//!
//! Exercises discovery, channel operations, pulses and store persistence through
//! the public API, with a simulated driver standing in for the vendor library.

use parking_lot::Mutex;
use relaypanel::{
    RelayPanelError,
    config::{AppConfig, ConfigManager, DurationStore, StorePaths, get_alias},
    controller::{AppController, AppState},
    device::{ChannelKey, DeviceRegistry},
    driver::{DriverCall, RelayDriver, SimulatedBoard, SimulatedDriver},
    error::operation_failed,
    relay,
};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn registry_over(boards: Vec<SimulatedBoard>) -> (Arc<SimulatedDriver>, DeviceRegistry) {
    let driver = Arc::new(SimulatedDriver::new(boards));
    let registry = DeviceRegistry::new(Arc::clone(&driver) as Arc<dyn RelayDriver>);
    (driver, registry)
}

fn controller_over(
    boards: Vec<SimulatedBoard>,
    dir: &TempDir,
) -> (Arc<SimulatedDriver>, AppController, mpsc::Receiver<AppState>) {
    let driver = Arc::new(SimulatedDriver::new(boards));
    let (state_tx, state_rx) = mpsc::sync_channel(256);
    let controller = AppController::new(
        AppConfig::default(),
        Arc::clone(&driver) as Arc<dyn RelayDriver>,
        StorePaths::in_dir(dir.path()),
        state_tx,
    );
    (driver, controller, state_rx)
}

/// Duplicate serials collapse to one device
#[test]
fn test_enumeration_dedup() {
    let (_driver, registry) = registry_over(vec![
        SimulatedBoard::new("AB12C", 1),
        SimulatedBoard::new("AB12C", 1),
        SimulatedBoard::new("XY999", 2),
    ]);

    assert_eq!(registry.enumerate().unwrap(), 2);
    let ids: Vec<String> = registry.device_ids().iter().map(ToString::to_string).collect();
    assert_eq!(ids, ["AB12C", "XY999"]);
}

/// A serial that is not 5 characters fails enumeration
#[test]
fn test_enumeration_rejects_short_serial() {
    let (_driver, registry) = registry_over(vec![SimulatedBoard::new("AB12", 1)]);
    assert!(matches!(
        registry.enumerate(),
        Err(RelayPanelError::InvalidDeviceId(_))
    ));
}

/// Channel counts outside 1-8 fail the open and release the handle
#[test]
fn test_channel_count_bounds() {
    for (count, ok) in [(0, false), (1, true), (8, true), (9, false)] {
        let (driver, registry) = registry_over(vec![SimulatedBoard::new("AB12C", count)]);
        registry.enumerate().unwrap();

        let result = registry.open_by_index(0);
        assert_eq!(result.is_ok(), ok, "channel count {count}");
        drop(result);
        assert_eq!(driver.open_handle_count(), 0);
    }
}

/// Open and close act on the requested channel and leave no handle open
#[test]
fn test_switch_round_trip() {
    let (driver, registry) = registry_over(vec![SimulatedBoard::new("XY999", 4)]);
    registry.enumerate().unwrap();

    let status = relay::switch_open(&registry, 0, 3).unwrap();
    assert_eq!(status.open_channels().as_slice(), &[3]);
    let status = relay::switch_close(&registry, 0, 3).unwrap();
    assert!(status.open_channels().is_empty());

    assert_eq!(driver.open_handle_count(), 0);
    assert_eq!(
        driver
            .calls()
            .iter()
            .filter(|c| matches!(c, DriverCall::Close(_)))
            .count(),
        2
    );
}

/// Out-of-range channel never reaches the driver
#[test]
fn test_channel_out_of_range() {
    let (driver, registry) = registry_over(vec![SimulatedBoard::new("AB12C", 1)]);
    registry.enumerate().unwrap();

    assert!(matches!(
        relay::switch_open(&registry, 0, 2),
        Err(RelayPanelError::ChannelOutOfRange { channel: 2, count: 1, .. })
    ));
    assert!(
        !driver
            .calls()
            .iter()
            .any(|c| matches!(c, DriverCall::OpenChannel(..)))
    );
}

/// Full operator flow: discover, set, save, restart, load
#[test]
fn test_defaults_survive_restart() {
    let dir = TempDir::new().unwrap();
    let boards = || vec![SimulatedBoard::new("AB12C", 1), SimulatedBoard::new("XY999", 2)];

    {
        let (_driver, mut controller, _states) = controller_over(boards(), &dir);
        controller.discover().unwrap();
        controller.set_duration(0, "0.75", "s").unwrap();
        controller.set_duration(2, "250", "ms").unwrap();
        controller.save_defaults().unwrap();
    }

    let (_driver, mut controller, _states) = controller_over(boards(), &dir);
    controller.discover().unwrap();
    let durations: Vec<f64> = controller.rows().iter().map(|r| r.duration()).collect();
    assert!((durations[0] - 0.75).abs() < 1e-12);
    assert!((durations[1] - 0.2).abs() < 1e-12);
    assert!((durations[2] - 0.25).abs() < 1e-12);
}

/// Saving before any store exists works
#[test]
fn test_save_defaults_on_fresh_install() {
    let dir = TempDir::new().unwrap();
    let (_driver, mut controller, _states) =
        controller_over(vec![SimulatedBoard::new("AB12C", 2)], &dir);
    controller.discover().unwrap();
    controller.save_defaults().unwrap();

    let store = DurationStore::load(&dir.path().join("defaults.bin")).unwrap();
    assert_eq!(store.len(), 2);
}

/// Unaliased channels show their key
#[test]
fn test_alias_fallback() {
    let dir = TempDir::new().unwrap();
    let key = ChannelKey::new("AB12C".parse().unwrap(), 1);
    assert_eq!(get_alias(&key, &dir.path().join("aliases.json")), "AB12C1");
}

/// A pulse started from the controller completes on its own and closes the relay
#[test]
fn test_pulse_through_controller() {
    let dir = TempDir::new().unwrap();
    let (driver, mut controller, states) =
        controller_over(vec![SimulatedBoard::new("AB12C", 2)], &dir);
    controller.discover().unwrap();
    controller.set_duration(1, "30", "ms").unwrap();

    let controller = Arc::new(Mutex::new(controller));
    let event_loop = AppController::spawn_event_loop(&controller).unwrap();

    controller.lock().fire(1).unwrap();
    assert_eq!(driver.status_of("AB12C"), 0b10);

    let deadline = Instant::now() + Duration::from_secs(5);
    while controller.lock().rows()[1].is_pulsing() {
        assert!(Instant::now() < deadline, "pulse did not complete");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(driver.status_of("AB12C"), 0);
    assert!(
        states
            .try_iter()
            .any(|s| s.status == "AB12C2 pulsed for 0.03s")
    );

    controller.lock().shutdown();
    event_loop.join().unwrap();
}

/// Shutdown closes relays held open by long pulses
#[test]
fn test_shutdown_cancels_pulses() {
    let dir = TempDir::new().unwrap();
    let (driver, mut controller, _states) = controller_over(
        vec![SimulatedBoard::new("AB12C", 1), SimulatedBoard::new("XY999", 1)],
        &dir,
    );
    controller.discover().unwrap();
    controller.set_duration(0, "60", "s").unwrap();
    controller.set_duration(1, "60", "s").unwrap();
    controller.fire(0).unwrap();
    controller.fire(1).unwrap();

    controller.shutdown();

    assert_eq!(driver.status_of("AB12C"), 0);
    assert_eq!(driver.status_of("XY999"), 0);
    assert_eq!(driver.open_handle_count(), 0);
}

/// Operator errors become status text instead of aborting
#[test]
fn test_failures_reach_status_line() {
    let dir = TempDir::new().unwrap();
    let (_driver, mut controller, states) = controller_over(
        vec![SimulatedBoard::new("AB12C", 1).rejecting_channel_ops()],
        &dir,
    );
    controller.discover().unwrap();

    let err = controller.open_channel(0).unwrap_err();
    controller.report_failure(&err);

    let last = states.try_iter().last().unwrap();
    assert_eq!(last.status, operation_failed(&err));
    assert!(last.status.starts_with("operation failed: "));
}

/// Configuration round-trips through the manager
#[test]
fn test_config_persistence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut config = AppConfig::default();
    config.preferences.icon_path = "assets/relay.png".into();
    config.window_state.width = 900;
    ConfigManager::save_to(&config, &path).unwrap();

    assert_eq!(ConfigManager::load_from(&path).unwrap(), config);
}
