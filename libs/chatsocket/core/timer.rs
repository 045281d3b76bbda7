//! Cancelable delayed delivery onto the client's serial queue
//!
//! Timers never run client logic themselves. When they fire they post a
//! command into the same queue that carries socket callbacks, so a timer
//! can never race a connect/disconnect transition.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// A one-shot message delivery scheduled after a delay
///
/// Dropping the task cancels it.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Deliver `message` into `tx` after `delay`
    pub fn after<T: Send + 'static>(delay: Duration, tx: UnboundedSender<T>, message: T) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(message);
        });
        Self { handle }
    }

    /// Cancel the delivery if it has not happened yet
    pub fn cancel(self) {
        // Drop aborts
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _task = ScheduledTask::after(Duration::from_secs(5), tx, 7u32);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_delivery() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = ScheduledTask::after(Duration::from_secs(5), tx, 7u32);
        task.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
