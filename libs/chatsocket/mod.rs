//! # ChatSocket
//!
//! Real-time transport for the chat core: one WebSocket connection per
//! client, driven by a single serial task.
//!
//! ## Features
//!
//! - **Observable state machine**: `ConnectionState` with typed disconnect reasons
//! - **Jittered backoff**: pluggable `ReconnectionStrategy`, terminal close detection
//! - **Heartbeat and pong watchdog**: suspended the moment the session drops
//! - **Lifecycle aware**: background grace window, reachability gating
//! - **Type-state builder**: URL and frame decoder enforced at compile time
//! - **Engine seam**: tokio-tungstenite by default, scriptable in tests

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    builder,
    builder::{states, WebSocketClientBuilder},
    classify_disconnect, client,
    client::{ClientEvent, WebSocketClient},
    config,
    config::ClientConfig,
    connection_state,
    connection_state::{
        AppState, ConnectionState, DisconnectReason, DisconnectSource, SharedConnectionState,
    },
    engine,
    engine::{EngineEvent, EngineEventSink, TungsteniteEngine, WebSocketEngine},
    heartbeat, metrics,
    metrics::{AtomicMetrics, Metrics},
    reconnection,
    reconnection::{DisconnectDisposition, ReconnectionContext},
    timer,
    timer::ScheduledTask,
};

// Convenience function
pub use core::builder as client_builder;
