use thiserror::Error;

/// Main error type for chatsocket
#[derive(Error, Debug)]
pub enum ChatSocketError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// A frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation requires a connected session
    #[error("Not connected: {0}")]
    NotConnected(String),
}

impl From<serde_json::Error> for ChatSocketError {
    fn from(err: serde_json::Error) -> Self {
        ChatSocketError::Decode(err.to_string())
    }
}

/// Result type for chatsocket operations
pub type Result<T> = std::result::Result<T, ChatSocketError>;
