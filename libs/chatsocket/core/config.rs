use std::time::Duration;

/// Ping interval once a session is established
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a pong after a ping
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(3);

/// How long a backgrounded process keeps its connection
pub const DEFAULT_BACKGROUND_GRACE: Duration = Duration::from_secs(300);

/// Settings for a transport client
///
/// Built through `WebSocketClientBuilder`; the strategy, decoder, engine
/// and reachability objects live next to it in the client task.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Interval between heartbeat pings
    pub(crate) heartbeat_interval: Duration,

    /// Pong watchdog timeout
    pub(crate) pong_timeout: Duration,

    /// Grace window in background before the connection is closed
    pub(crate) background_grace: Duration,

    /// Keep the connection for `background_grace` when backgrounded;
    /// otherwise close it immediately
    pub(crate) stays_connected_in_background: bool,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            background_grace: DEFAULT_BACKGROUND_GRACE,
            stays_connected_in_background: true,
        }
    }

    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn pong_timeout(&self) -> Duration {
        self.pong_timeout
    }

    pub fn background_grace(&self) -> Duration {
        self.background_grace
    }

    pub fn stays_connected_in_background(&self) -> bool {
        self.stays_connected_in_background
    }
}
