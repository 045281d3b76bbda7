//! Reconnection bookkeeping and disconnect classification

use crate::core::connection_state::DisconnectReason;
use crate::traits::{ReconnectionStrategy, ServerError, NORMAL_CLOSURE_CODE};
use std::time::Duration;

/// Consecutive failure counter owned by the transport client
#[derive(Debug, Default)]
pub struct ReconnectionContext {
    consecutive_failures: usize,
}

impl ReconnectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures
    }

    /// Ask the strategy for the next delay; every call counts as a failure
    pub fn next_delay(&mut self, strategy: &dyn ReconnectionStrategy) -> Option<Duration> {
        let delay = strategy.next_delay(self.consecutive_failures);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }
}

/// What to do after the socket went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectDisposition {
    /// Terminal; never schedule a reconnect
    Stop(Option<DisconnectReason>),
    /// Retry according to the reconnection strategy
    Retry,
}

/// Classify a disconnect from its close code and the last cached server error
pub fn classify_disconnect(
    close_code: Option<u16>,
    last_error: Option<&ServerError>,
) -> DisconnectDisposition {
    if let Some(error) = last_error {
        if error.is_token_expired() {
            return DisconnectDisposition::Stop(Some(DisconnectReason::TokenExpired(error.clone())));
        }
        if error.is_normal_closure() {
            return DisconnectDisposition::Stop(Some(DisconnectReason::ServerError(error.clone())));
        }
    }

    if close_code.map(i64::from) == Some(NORMAL_CLOSURE_CODE) {
        return DisconnectDisposition::Stop(
            last_error.cloned().map(DisconnectReason::ServerError),
        );
    }

    DisconnectDisposition::Retry
}
