//! Heartbeat mechanism for the transport client
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every X interval:  │
//! │  1. Wait for tick   │
//! │  2. Post tick ──────┼──> Client command queue ──> ping on the socket
//! │  3. Repeat          │
//! └─────────────────────┘
//! ```
//!
//! The heartbeat is resumed when a session is established (first health
//! check) and suspended whenever the connection drops. Suspension aborts
//! the task; a tick that was already queued is ignored by the client
//! because it checks `is_running()` before pinging.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// Heartbeat task that posts a tick at regular intervals
///
/// The first immediate tick is skipped; the first message is sent one
/// full interval after start.
pub async fn heartbeat_task<T: Clone + Send + 'static>(
    interval: Duration,
    tick: T,
    tx: UnboundedSender<T>,
) {
    let mut ticker = tokio::time::interval(interval);
    // Skip the first immediate tick - wait for the first interval
    ticker.tick().await;
    // If we miss ticks due to slow processing, skip them rather than bursting
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Heartbeat task started with interval: {:?}", interval);

    loop {
        ticker.tick().await;

        if tx.send(tick.clone()).is_err() {
            debug!("Client queue closed, shutting down heartbeat task");
            break;
        }
    }
}

/// Resumable/suspendable repeating timer
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Start ticking; no-op if already running
    pub fn resume<T: Clone + Send + 'static>(&mut self, tx: UnboundedSender<T>, tick: T) {
        if self.task.is_some() {
            return;
        }
        let interval = self.interval;
        self.task = Some(tokio::spawn(heartbeat_task(interval, tick, tx)));
    }

    /// Stop ticking immediately
    pub fn suspend(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Heartbeat suspended");
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.suspend();
    }
}
