//! # ChatCore
//!
//! Chat domain on top of `chatsocket`: entities, the event union and its
//! dispatch, message pagination state, and the collaborators (REST, local
//! store) that feed a message list.
//!
//! ## Layers
//!
//! - **domain**: plain entities (`Message`, `User`, `ChannelId`, ...)
//! - **events**: `ChatEvent` decoding and the `EventNotificationCenter`
//! - **pagination**: `MessagesPaginationStateHandler`
//! - **infrastructure**: config, logging, `ChatApi`, `Database`
//! - **application**: `MessageListController`, `ChatClient`
//!
//! ```no_run
//! use chatcore::{ChatClient, ChatConfig, ChannelId};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ChatConfig::from_env()?;
//! chatcore::init_tracing(&config.log_level);
//!
//! let client = ChatClient::from_config(&config).await?;
//! client.connect()?;
//!
//! let list = client.message_list(ChannelId::new("messaging", "general")).await;
//! list.load_first_page().await?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod events;
pub mod infrastructure;
pub mod pagination;

pub use application::{ChatClient, MessageListController, PaginationError};
pub use domain::*;
pub use events::{
    ChatEvent, ChatFrameDecoder, DecodeError, DomainEvent, EventFilter, EventNotificationCenter,
    EventSubscriber, EventType, ScopeContext, Subscription, SubscriptionId,
};
pub use infrastructure::{
    init_tracing, ApiError, CacheHint, ChatApi, ChatConfig, ConfigError, Database, DatabaseError,
    DatabaseSession, InMemoryDatabase, RestClient,
};
pub use pagination::{
    MessagesPagination, MessagesPaginationState, MessagesPaginationStateHandler,
    PaginationParameter, DEFAULT_PAGE_SIZE,
};
