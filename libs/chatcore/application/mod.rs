//! Application Layer
//!
//! Use cases built on the domain and infrastructure layers.

pub mod chat_client;
pub mod message_list;

pub use chat_client::ChatClient;
pub use message_list::{MessageListController, PaginationError};
