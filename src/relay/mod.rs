//! Relay channel operations and row model
//!
//! # Overview
//!
//! - **ops**: single-shot channel operations (open, close, close all, blocking
//!   pulse), each acquiring and releasing a device session
//! - **pulse**: `PulseScheduler`, the non-blocking, cancellable pulse used by the GUI
//! - **row**: `ChannelRow`, the state behind one line of controls
//! - **units**: duration entry parsing for the `s`/`ms`/`μs` selector
//!
//! # Pulse Flow
//!
//! ```text
//! GUI fire ─→ PulseScheduler::fire ─→ open channel (caller thread)
//!                                          ↓
//!                                   worker: wait / cancel
//!                                          ↓
//!                         close channel ─→ PulseEvent ─→ AppController
//! ```

pub mod ops;
pub mod pulse;
pub mod row;
pub mod units;

pub use ops::{close_all, fire_blocking, switch_close, switch_open};
pub use pulse::{PulseEvent, PulseOutcome, PulseScheduler};
pub use row::ChannelRow;
pub use units::{TimeUnit, format_seconds, parse_duration};
