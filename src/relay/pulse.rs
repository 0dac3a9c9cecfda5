//! Non-blocking timed pulses
//!
//! `PulseScheduler::fire` opens the channel on the caller's thread, so open
//! failures are reported immediately, then hands the open session to a worker
//! thread that waits out the pulse and closes the channel. The worker waits on a
//! cancellation channel instead of sleeping, so a pulse can be cut short.
//!
//! # Cancellation
//!
//! - `cancel(key)` closes the channel as soon as the worker wakes and reports
//!   `PulseOutcome::Cancelled` with the time the relay was actually open.
//! - Dropping the scheduler cancels every in-flight pulse and joins the workers,
//!   so no relay is left open by an abandoned pulse.

use crate::device::{ChannelKey, DeviceRegistry, DeviceSession};
use crate::error::{RelayPanelError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How a pulse ended
#[derive(Debug, Clone, PartialEq)]
pub enum PulseOutcome {
    /// Ran for the full duration
    Completed,
    /// Cut short by `cancel` or scheduler shutdown
    Cancelled {
        /// Time the channel was open
        elapsed: Duration,
    },
    /// The channel could not be closed at the end of the pulse
    Failed(String),
}

/// Completion notice sent to the GUI
#[derive(Debug, Clone)]
pub struct PulseEvent {
    /// Channel that pulsed
    pub key: ChannelKey,
    /// How it ended
    pub outcome: PulseOutcome,
}

type ActivePulses = Arc<Mutex<HashMap<ChannelKey, mpsc::Sender<()>>>>;

/// Runs timed pulses on worker threads
pub struct PulseScheduler {
    registry: Arc<DeviceRegistry>,
    active: ActivePulses,
    events: mpsc::SyncSender<PulseEvent>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PulseScheduler {
    /// Create a scheduler reporting completions on `events`
    pub fn new(registry: Arc<DeviceRegistry>, events: mpsc::SyncSender<PulseEvent>) -> Self {
        Self {
            registry,
            active: Arc::new(Mutex::new(HashMap::new())),
            events,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Start a pulse of `duration` on `channel` of the device at `device_index`
    ///
    /// Returns once the channel is open. Fails with `PulseInProgress` if this
    /// channel is already pulsing and with `DeviceBusy` if another pulse holds the
    /// board.
    pub fn fire(&self, device_index: usize, channel: u8, duration: Duration) -> Result<()> {
        let device = self
            .registry
            .device_at(device_index)
            .ok_or_else(|| RelayPanelError::DeviceNotFound(format!("#{device_index}")))?;
        let key = ChannelKey::new(device, channel);

        let mut active = self.active.lock();
        if active.contains_key(&key) {
            return Err(RelayPanelError::PulseInProgress(key.to_string()));
        }

        let session = self.registry.open(key.device())?;
        session.open_channel(channel)?;
        let started = Instant::now();

        let (cancel_tx, cancel_rx) = mpsc::channel();
        active.insert(key.clone(), cancel_tx);
        drop(active);

        info!("Pulse started on {} for {}s", key, duration.as_secs_f64());

        let worker = PulseWorker {
            session,
            key: key.clone(),
            channel,
            duration,
            started,
            cancel: cancel_rx,
            active: Arc::clone(&self.active),
            events: self.events.clone(),
        };
        let handle = match thread::Builder::new()
            .name("relay-pulse".to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to spawn pulse worker for {}: {}", key, e);
                self.active.lock().remove(&key);
                return Err(e.into());
            }
        };

        let mut workers = self.workers.lock();
        workers.retain(|w| !w.is_finished());
        workers.push(handle);
        Ok(())
    }

    /// Cut the pulse on `key` short; `false` if none is running
    pub fn cancel(&self, key: &ChannelKey) -> bool {
        let active = self.active.lock();
        match active.get(key) {
            Some(cancel) => {
                debug!("Cancelling pulse on {}", key);
                // The worker may have finished between lookup and send; that is fine.
                let _ = cancel.send(());
                true
            }
            None => false,
        }
    }

    /// Whether a pulse is running on `key`
    pub fn is_pulsing(&self, key: &ChannelKey) -> bool {
        self.active.lock().contains_key(key)
    }

    /// Number of in-flight pulses
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Cancel every in-flight pulse and wait for the workers to close their channels
    pub fn shutdown(&self) {
        {
            let active = self.active.lock();
            if !active.is_empty() {
                info!("Cancelling {} in-flight pulse(s)", active.len());
            }
            for cancel in active.values() {
                let _ = cancel.send(());
            }
        }

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            if worker.join().is_err() {
                error!("Pulse worker panicked");
            }
        }
    }
}

impl Drop for PulseScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct PulseWorker {
    session: DeviceSession,
    key: ChannelKey,
    channel: u8,
    duration: Duration,
    started: Instant,
    cancel: mpsc::Receiver<()>,
    active: ActivePulses,
    events: mpsc::SyncSender<PulseEvent>,
}

impl PulseWorker {
    fn run(self) {
        let cancelled = match self.cancel.recv_timeout(self.duration) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        };
        let elapsed = self.started.elapsed();

        let outcome = match self.session.close_channel(self.channel) {
            Err(e) => {
                error!("Pulse on {} could not close its channel: {}", self.key, e);
                PulseOutcome::Failed(e.to_string())
            }
            Ok(()) if cancelled => {
                info!("Pulse on {} cancelled after {:?}", self.key, elapsed);
                PulseOutcome::Cancelled { elapsed }
            }
            Ok(()) => {
                info!(
                    "<<<Relay {} flicked for {}s>>>",
                    self.key,
                    self.duration.as_secs_f64()
                );
                PulseOutcome::Completed
            }
        };

        // Release the device before announcing completion
        drop(self.session);
        self.active.lock().remove(&self.key);

        let event = PulseEvent {
            key: self.key,
            outcome,
        };
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Pulse event queue full, dropping event for {}", event.key);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Pulse event receiver gone");
            }
        }
    }
}
