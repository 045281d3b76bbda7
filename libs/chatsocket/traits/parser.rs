use crate::traits::error::{ChatSocketError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Close code (and server error code) for a normal, expected closure
pub const NORMAL_CLOSURE_CODE: i64 = 1000;

/// Server error code reported when the auth token has expired
pub const TOKEN_EXPIRED_CODE: i64 = 40;

/// Type alias for WebSocket messages
/// Can be Text or Binary data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Text(_) => None,
            WsMessage::Binary(b) => Some(b),
        }
    }

    /// Text payload of the frame; binary frames must be valid UTF-8
    pub fn text_payload(&self) -> Result<Cow<'_, str>> {
        match self {
            WsMessage::Text(s) => Ok(Cow::Borrowed(s.as_str())),
            WsMessage::Binary(b) => std::str::from_utf8(b)
                .map(Cow::Borrowed)
                .map_err(|e| ChatSocketError::Decode(format!("binary frame is not UTF-8: {}", e))),
        }
    }
}

/// Structured error pushed by the server before it closes the socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "StatusCode", default)]
    pub status_code: i64,
}

impl ServerError {
    pub fn is_normal_closure(&self) -> bool {
        self.code == NORMAL_CLOSURE_CODE
    }

    pub fn is_token_expired(&self) -> bool {
        self.code == TOKEN_EXPIRED_CODE
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "server error {} (status {}): {}",
            self.code, self.status_code, self.message
        )
    }
}

impl std::error::Error for ServerError {}

/// Envelope of a server error frame: `{"error": {...}}`
#[derive(Debug, Deserialize)]
pub struct ServerErrorFrame {
    pub error: ServerError,
}

impl ServerErrorFrame {
    /// Try to read a server error out of a raw text frame
    pub fn parse(text: &str) -> Option<ServerError> {
        serde_json::from_str::<ServerErrorFrame>(text)
            .ok()
            .map(|frame| frame.error)
    }
}

/// Outcome of decoding one inbound frame
#[derive(Debug, Clone)]
pub enum DecodedFrame<E, U> {
    /// Health check; the first one after a handshake establishes the session
    HealthCheck {
        connection_id: String,
        user: Option<U>,
        event: E,
    },
    /// Ordinary domain event
    Event(E),
    /// Structured server error
    ServerError(ServerError),
    /// Application-level pong
    Pong,
}

/// Trait for turning raw frames into typed frames
///
/// Implementations decide the wire format. The transport client only needs
/// to know which frames are health checks, errors and pongs; everything
/// else is forwarded to observers untouched.
///
/// Decoding runs on the client's serial task, so keep it fast.
pub trait FrameDecoder: Send + Sync + 'static {
    /// Domain event type produced by the decoder
    type Event: Send + Clone + fmt::Debug + 'static;

    /// Current-user payload carried by health checks
    type User: Send + Sync + Clone + fmt::Debug + 'static;

    /// Decode a single frame
    ///
    /// # Returns
    /// * `Ok(frame)` - Frame decoded
    /// * `Err(ChatSocketError::Decode)` - Malformed frame; the client drops it
    fn decode(&self, message: &WsMessage) -> Result<DecodedFrame<Self::Event, Self::User>>;
}
