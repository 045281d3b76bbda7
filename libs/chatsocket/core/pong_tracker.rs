//! Pong watchdog
//!
//! After every heartbeat ping the client arms a cancelable timeout. A
//! protocol pong or a health check disarms it. If it fires, the
//! connection is treated as dead and dropped with `NoPongReceived`.

use crate::core::timer::ScheduledTask;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug)]
pub struct PongTracker {
    timeout: Duration,
    pending: Option<ScheduledTask>,
}

impl PongTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: None,
        }
    }

    /// Arm the timeout; keeps an already armed one
    pub fn ping_sent<T: Send + 'static>(&mut self, tx: UnboundedSender<T>, on_timeout: T) {
        if self.pending.is_none() {
            self.pending = Some(ScheduledTask::after(self.timeout, tx, on_timeout));
        }
    }

    /// Disarm the timeout
    pub fn pong_received(&mut self) {
        self.pending = None;
    }

    /// Called when the timeout command arrives; true if we were still waiting
    pub fn timeout_fired(&mut self) -> bool {
        self.pending.take().is_some()
    }

    #[inline]
    pub fn is_awaiting_pong(&self) -> bool {
        self.pending.is_some()
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_without_pong() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = PongTracker::new(Duration::from_secs(3));
        tracker.ping_sent(tx, ());
        assert!(tracker.is_awaiting_pong());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_ok());
        assert!(tracker.timeout_fired());
        assert!(!tracker.is_awaiting_pong());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_disarms_timeout() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = PongTracker::new(Duration::from_secs(3));
        tracker.ping_sent(tx, ());
        tracker.pong_received();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert!(!tracker.timeout_fired());
    }
}
