//! In-memory relay driver
//!
//! Simulates a set of relay boards so the registry, channel operations and the
//! controller can be exercised without hardware. Every call is recorded.

use crate::driver::{DeviceHandle, RelayDriver};
use parking_lot::Mutex;
use std::collections::HashMap;

/// One simulated board
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    /// Serial reported during enumeration
    pub serial: String,
    /// Channel count reported by `num_relays`
    pub channels: i32,
    /// When set, opening the board returns a null handle
    pub unopenable: bool,
    /// When set, channel open/close calls return an error code
    pub rejects_channel_ops: bool,
}

impl SimulatedBoard {
    /// A working board with `channels` relays
    pub fn new(serial: impl Into<String>, channels: i32) -> Self {
        Self {
            serial: serial.into(),
            channels,
            unopenable: false,
            rejects_channel_ops: false,
        }
    }

    /// Board that fails to open
    #[must_use]
    pub fn unopenable(mut self) -> Self {
        self.unopenable = true;
        self
    }

    /// Board whose channel operations fail
    #[must_use]
    pub fn rejecting_channel_ops(mut self) -> Self {
        self.rejects_channel_ops = true;
        self
    }
}

/// Driver call log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// `enumerate_ids`
    Enumerate,
    /// `open_device(serial)`
    Open(String),
    /// `close_device` on a handle for this serial
    Close(String),
    /// `open_channel(serial, channel)`
    OpenChannel(String, u8),
    /// `close_channel(serial, channel)`
    CloseChannel(String, u8),
    /// `close_all_channels(serial)`
    CloseAll(String),
}

#[derive(Default)]
struct SimState {
    next_handle: usize,
    /// handle -> board index
    open_handles: HashMap<usize, usize>,
    /// board index -> status bitmap
    status: HashMap<usize, i32>,
    calls: Vec<DriverCall>,
}

/// Relay driver over simulated boards
pub struct SimulatedDriver {
    boards: Vec<SimulatedBoard>,
    state: Mutex<SimState>,
}

impl SimulatedDriver {
    /// Create a driver exposing `boards` in enumeration order
    pub fn new(boards: Vec<SimulatedBoard>) -> Self {
        Self {
            boards,
            state: Mutex::new(SimState {
                next_handle: 1,
                ..SimState::default()
            }),
        }
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Number of handles opened and not yet closed
    pub fn open_handle_count(&self) -> usize {
        self.state.lock().open_handles.len()
    }

    /// Status bitmap of the first board with `serial`
    pub fn status_of(&self, serial: &str) -> i32 {
        let Some(index) = self.board_index(serial) else {
            return 0;
        };
        self.state.lock().status.get(&index).copied().unwrap_or(0)
    }

    fn board_index(&self, serial: &str) -> Option<usize> {
        self.boards.iter().position(|b| b.serial == serial)
    }

    fn board_for(&self, state: &SimState, handle: DeviceHandle) -> Option<usize> {
        state.open_handles.get(&handle.as_raw()).copied()
    }

    fn set_channel(&self, handle: DeviceHandle, channel: u8, open: bool) -> i32 {
        let mut state = self.state.lock();
        let Some(index) = self.board_for(&state, handle) else {
            return -1;
        };
        let board = &self.boards[index];
        let serial = board.serial.clone();
        state.calls.push(if open {
            DriverCall::OpenChannel(serial, channel)
        } else {
            DriverCall::CloseChannel(serial, channel)
        });

        if board.rejects_channel_ops || channel == 0 || i32::from(channel) > board.channels {
            return 1;
        }

        let bit = 1 << (channel - 1);
        let status = state.status.entry(index).or_insert(0);
        if open {
            *status |= bit;
        } else {
            *status &= !bit;
        }
        0
    }
}

impl RelayDriver for SimulatedDriver {
    fn enumerate_ids(&self) -> Vec<String> {
        self.state.lock().calls.push(DriverCall::Enumerate);
        self.boards.iter().map(|b| b.serial.clone()).collect()
    }

    fn open_device(&self, serial: &str) -> Option<DeviceHandle> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::Open(serial.to_string()));

        let index = self.board_index(serial)?;
        if self.boards[index].unopenable {
            return None;
        }

        let raw = state.next_handle;
        state.next_handle += 1;
        state.open_handles.insert(raw, index);
        Some(DeviceHandle::from_raw(raw))
    }

    fn close_device(&self, handle: DeviceHandle) {
        let mut state = self.state.lock();
        if let Some(index) = state.open_handles.remove(&handle.as_raw()) {
            let serial = self.boards[index].serial.clone();
            state.calls.push(DriverCall::Close(serial));
        }
    }

    fn num_relays(&self, handle: DeviceHandle) -> i32 {
        let state = self.state.lock();
        self.board_for(&state, handle)
            .map_or(-1, |index| self.boards[index].channels)
    }

    fn status_bitmap(&self, handle: DeviceHandle) -> i32 {
        let state = self.state.lock();
        self.board_for(&state, handle)
            .map_or(-1, |index| state.status.get(&index).copied().unwrap_or(0))
    }

    fn open_channel(&self, handle: DeviceHandle, channel: u8) -> i32 {
        self.set_channel(handle, channel, true)
    }

    fn close_channel(&self, handle: DeviceHandle, channel: u8) -> i32 {
        self.set_channel(handle, channel, false)
    }

    fn close_all_channels(&self, handle: DeviceHandle) -> i32 {
        let mut state = self.state.lock();
        let Some(index) = self.board_for(&state, handle) else {
            return -1;
        };
        let serial = self.boards[index].serial.clone();
        state.calls.push(DriverCall::CloseAll(serial));
        state.status.insert(index, 0);
        0
    }
}
