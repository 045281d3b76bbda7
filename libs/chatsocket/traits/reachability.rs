use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trait for answering "is there a network path right now?"
///
/// Consulted before every handshake and before scheduling a reconnect.
/// While it reports `false` the client parks in a no-network state
/// instead of burning through its backoff schedule.
pub trait Reachability: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Reachability that always reports a network path
pub struct AlwaysReachable;

impl Reachability for AlwaysReachable {
    fn is_available(&self) -> bool {
        true
    }
}

/// Reachability backed by a shared flag
///
/// The host application flips the flag from its own network monitor and
/// then calls `WebSocketClient::reachability_changed`.
#[derive(Debug, Clone)]
pub struct ReachabilityFlag {
    available: Arc<AtomicBool>,
}

impl ReachabilityFlag {
    pub fn new(available: bool) -> Self {
        Self {
            available: Arc::new(AtomicBool::new(available)),
        }
    }

    pub fn set(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }
}

impl Reachability for ReachabilityFlag {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }
}
