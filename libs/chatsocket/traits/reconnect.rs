use rand::Rng;
use std::time::Duration;

/// Upper cap for any reconnection delay, in milliseconds
const MAX_RECONNECT_DELAY_MS: u64 = 25_000;

/// Trait for defining reconnection strategies
///
/// Implement this trait to control how the client should
/// behave when reconnecting after a disconnection.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - Number of consecutive failures so far (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, _attempt: usize) -> bool {
        true
    }
}

/// Default jittered backoff
///
/// For `n` consecutive failures the delay is drawn uniformly from
/// `[min(n), max(n)]` where
///
/// ```text
/// max(n) = min(500 + n * 2000, 25000) ms
/// min(n) = min(max(250, (n - 1) * 2000), 25000) ms
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultBackoff {
    max_attempts: Option<usize>,
}

impl DefaultBackoff {
    /// Unlimited retries
    pub fn new() -> Self {
        Self { max_attempts: None }
    }

    /// Give up after `max_attempts` consecutive failures
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// Lower and upper delay bound for the given failure count
    pub fn delay_bounds(attempt: usize) -> (Duration, Duration) {
        let n = attempt as u64;
        let max_ms = n
            .saturating_mul(2000)
            .saturating_add(500)
            .min(MAX_RECONNECT_DELAY_MS);
        let min_ms = n
            .saturating_sub(1)
            .saturating_mul(2000)
            .max(250)
            .min(MAX_RECONNECT_DELAY_MS);
        (Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }
}

impl ReconnectionStrategy for DefaultBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let (min, max) = Self::delay_bounds(attempt);
        let spread = (max - min).as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=spread);
        Some(min + Duration::from_millis(jitter))
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    /// Create a new fixed delay strategy
    ///
    /// # Arguments
    /// * `delay` - The fixed delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// The client will not attempt to reconnect after disconnection
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}
