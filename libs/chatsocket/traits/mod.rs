//! # ChatSocket Traits
//!
//! Seams of the transport client:
//!
//! - **FrameDecoder**: Turn raw frames into health checks, events, errors, pongs
//! - **ReconnectionStrategy**: Control reconnection delays
//! - **Reachability**: Gate handshakes and retries on a network path
//! - **HeaderProvider**: Supply handshake headers

pub mod error;
pub mod headers;
pub mod parser;
pub mod reachability;
pub mod reconnect;

// Re-export commonly used types
pub use error::{ChatSocketError, Result};
pub use headers::{HeaderProvider, Headers, NoHeaders, StaticHeaders};
pub use parser::{
    DecodedFrame, FrameDecoder, ServerError, ServerErrorFrame, WsMessage, NORMAL_CLOSURE_CODE,
    TOKEN_EXPIRED_CODE,
};
pub use reachability::{AlwaysReachable, Reachability, ReachabilityFlag};
pub use reconnect::{DefaultBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
