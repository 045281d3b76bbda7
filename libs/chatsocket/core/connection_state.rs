use crate::traits::ServerError;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a connection ended up in `Disconnected`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the session on purpose
    #[error("closed by server: {0}")]
    ServerError(ServerError),

    /// The auth token expired; refresh credentials before reconnecting
    #[error("token expired: {0}")]
    TokenExpired(ServerError),

    /// No network path; the client reconnects when reachability returns
    #[error("no network connection")]
    NoNetwork,

    /// The transport failed and the reconnection strategy gave up
    #[error("transport error: {0}")]
    Transport(String),
}

/// Who asked for a disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectSource {
    /// `WebSocketClient::disconnect`
    UserInitiated,
    /// Background grace window elapsed
    SystemInitiated,
    /// Pong watchdog fired
    NoPongReceived,
    /// Reachability was lost
    NoNetwork,
}

/// Foreground/background lifecycle of the host process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Foreground,
    Background,
}

/// Externally observable state of a transport connection
///
/// Equality compares the variant only, except for `Disconnected` whose
/// reasons are compared by description. `Connected` payloads are ignored.
#[derive(Debug, Clone)]
pub enum ConnectionState<U> {
    NotConnected,
    Connecting,
    Connected {
        connection_id: String,
        user: Option<U>,
    },
    Reconnecting,
    Disconnecting,
    Disconnected(Option<DisconnectReason>),
}

impl<U> ConnectionState<U> {
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    /// Connecting, connected, or waiting to reconnect
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::Connected { .. }
                | ConnectionState::Reconnecting
        )
    }

    /// A socket exists (or is being opened) that would need closing
    #[inline]
    pub(crate) fn has_socket(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::Connected { .. }
                | ConnectionState::Disconnecting
        )
    }

    pub fn connection_id(&self) -> Option<&str> {
        match self {
            ConnectionState::Connected { connection_id, .. } => Some(connection_id),
            _ => None,
        }
    }

    pub fn disconnect_reason(&self) -> Option<&DisconnectReason> {
        match self {
            ConnectionState::Disconnected(reason) => reason.as_ref(),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::NotConnected => "not-connected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected { .. } => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Disconnected(_) => "disconnected",
        }
    }
}

impl<U> PartialEq for ConnectionState<U> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConnectionState::Disconnected(a), ConnectionState::Disconnected(b)) => {
                a.as_ref().map(ToString::to_string) == b.as_ref().map(ToString::to_string)
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl<U> fmt::Display for ConnectionState<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected { connection_id, .. } => {
                write!(f, "connected({})", connection_id)
            }
            ConnectionState::Disconnected(Some(reason)) => write!(f, "disconnected({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// Connection state shared between the client task and its handles
///
/// Only the client task writes; any number of handles read.
#[derive(Debug)]
pub struct SharedConnectionState<U> {
    inner: Arc<RwLock<ConnectionState<U>>>,
}

impl<U> Clone for SharedConnectionState<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U: Clone> SharedConnectionState<U> {
    pub fn new(state: ConnectionState<U>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState<U> {
        self.inner.read().clone()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.inner.read().is_connected()
    }

    pub fn connection_id(&self) -> Option<String> {
        self.inner.read().connection_id().map(str::to_string)
    }

    pub(crate) fn set(&self, state: ConnectionState<U>) {
        *self.inner.write() = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type State = ConnectionState<String>;

    fn server_error(code: i64) -> ServerError {
        ServerError {
            code,
            message: "boom".to_string(),
            status_code: 500,
        }
    }

    #[test]
    fn test_connected_equality_ignores_payload() {
        let a: State = ConnectionState::Connected {
            connection_id: "a".into(),
            user: Some("alice".into()),
        };
        let b: State = ConnectionState::Connected {
            connection_id: "b".into(),
            user: None,
        };
        assert_eq!(a, b);
        assert_ne!(a, State::Connecting);
    }

    #[test]
    fn test_disconnected_equality_compares_reason() {
        assert_eq!(State::Disconnected(None), State::Disconnected(None));
        assert_eq!(
            State::Disconnected(Some(DisconnectReason::NoNetwork)),
            State::Disconnected(Some(DisconnectReason::NoNetwork))
        );
        assert_ne!(
            State::Disconnected(None),
            State::Disconnected(Some(DisconnectReason::NoNetwork))
        );
        assert_ne!(
            State::Disconnected(Some(DisconnectReason::ServerError(server_error(1000)))),
            State::Disconnected(Some(DisconnectReason::TokenExpired(server_error(40))))
        );
    }

    #[test]
    fn test_state_helpers() {
        let connected: State = ConnectionState::Connected {
            connection_id: "conn".into(),
            user: None,
        };
        assert!(connected.is_connected());
        assert!(connected.is_active());
        assert_eq!(connected.connection_id(), Some("conn"));
        assert_eq!(connected.to_string(), "connected(conn)");

        assert!(State::Reconnecting.is_active());
        assert!(!State::Reconnecting.has_socket());
        assert!(State::Disconnecting.has_socket());
        assert!(!State::NotConnected.is_active());

        let offline = State::Disconnected(Some(DisconnectReason::NoNetwork));
        assert_eq!(offline.disconnect_reason(), Some(&DisconnectReason::NoNetwork));
        assert_eq!(offline.to_string(), "disconnected(no network connection)");
    }

    #[test]
    fn test_shared_state() {
        let shared: SharedConnectionState<String> =
            SharedConnectionState::new(ConnectionState::NotConnected);
        let reader = shared.clone();
        shared.set(ConnectionState::Connected {
            connection_id: "xyz".into(),
            user: None,
        });
        assert!(reader.is_connected());
        assert_eq!(reader.connection_id().as_deref(), Some("xyz"));
    }
}
