//! chat-sync - real-time connection and sync core of a chat SDK
//!
//! ## Architecture
//!
//! - **chatsocket**: WebSocket transport with reconnection, heartbeat and
//!   lifecycle handling (re-exported from workspace)
//! - **chatcore**: chat domain, event dispatch, message pagination and the
//!   client facade (re-exported from workspace)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chat_sync::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ChatConfig::from_env()?;
//! init_tracing(&config.log_level);
//!
//! let client = ChatClient::from_config(&config).await?;
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

// Re-export workspace libraries for convenience
pub use chatcore;
pub use chatsocket;

/// Types most applications need
pub mod prelude {
    pub use chatcore::{
        init_tracing, ChannelId, ChatClient, ChatConfig, ChatEvent, DomainEvent, EventFilter,
        EventType, Message, MessageListController, MessagesPagination, PaginationError, User,
    };
    pub use chatsocket::{AppState, ConnectionState, DisconnectReason};
}
