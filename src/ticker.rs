//! Periodic signals that drive the background flush.
//!
//! The handler never owns a wall clock directly. Callers hand it a
//! [`FlushTicker`]: either one backed by a real interval timer, or a manual
//! ticker fired through a [`TickTrigger`] so tests control the flush cadence.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, tick};

/// Source of flush ticks consumed by the background worker.
///
/// Dropping every clone of the ticker stops it.
#[derive(Clone, Debug)]
pub struct FlushTicker {
    ticks: Receiver<Instant>,
}

impl FlushTicker {
    /// Tick every `interval` of wall-clock time.
    pub fn every(interval: Duration) -> Self {
        Self {
            ticks: tick(interval),
        }
    }

    /// Create a ticker that only fires when the returned trigger is pulled.
    pub fn manual() -> (TickTrigger, Self) {
        let (tx, rx) = bounded(1);
        (TickTrigger { tx }, Self { ticks: rx })
    }

    pub(crate) fn receiver(&self) -> Receiver<Instant> {
        self.ticks.clone()
    }
}

/// Fires ticks on a manual [`FlushTicker`].
#[derive(Clone, Debug)]
pub struct TickTrigger {
    tx: Sender<Instant>,
}

impl TickTrigger {
    /// Fire a tick.
    ///
    /// A tick that arrives while another is still pending is coalesced with
    /// it. Returns `false` once the ticker has been stopped.
    pub fn tick(&self) -> bool {
        match self.tx.try_send(Instant::now()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
