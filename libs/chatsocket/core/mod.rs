//! # ChatSocket core
//!
//! The transport client and the pieces it is assembled from.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chatsocket::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = chatsocket::builder()
//!         .url("wss://chat.example.com/connect")
//!         .decoder(MyDecoder)
//!         .headers(StaticHeaders::new().with("Authorization", token))
//!         .reconnect_strategy(DefaultBackoff::new())
//!         .build()
//!         .await?;
//!
//!     client.connect()?;
//!
//!     while let Ok(event) = client.recv_event() {
//!         match event {
//!             ClientEvent::StateChanged(state) => println!("state: {}", state),
//!             ClientEvent::Event(event) => println!("event: {:?}", event),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod engine;
pub mod heartbeat;
pub mod metrics;
pub mod pong_tracker;
pub mod reconnection;
pub mod timer;

// Re-export main types
pub use builder::{states, WebSocketClientBuilder};
pub use client::{ClientEvent, WebSocketClient};
pub use config::ClientConfig;
pub use connection_state::{
    AppState, ConnectionState, DisconnectReason, DisconnectSource, SharedConnectionState,
};
pub use engine::{EngineEvent, EngineEventSink, TungsteniteEngine, WebSocketEngine};
pub use metrics::{AtomicMetrics, Metrics};
pub use pong_tracker::PongTracker;
pub use reconnection::{classify_disconnect, DisconnectDisposition, ReconnectionContext};
pub use timer::ScheduledTask;

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new WebSocket client builder
///
/// # Example
/// ```ignore
/// let client = chatsocket::builder()
///     .url("wss://chat.example.com/connect")
///     .decoder(MyDecoder)
///     .heartbeat_interval(Duration::from_secs(30))
///     .build()
///     .await?;
/// ```
pub fn builder() -> WebSocketClientBuilder<builder::states::NoUrl, builder::states::NoDecoder, ()>
{
    WebSocketClientBuilder::new()
}
