//! REST collaborator
//!
//! The sync core only needs one endpoint: a page of channel messages.

pub mod rest;

use crate::domain::{ChannelId, Message};
use crate::pagination::MessagesPagination;
use async_trait::async_trait;
use thiserror::Error;

pub use rest::RestClient;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Deserialization failed: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Message history source
///
/// Pages come back ordered oldest to newest.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn query_messages(
        &self,
        cid: &ChannelId,
        pagination: &MessagesPagination,
    ) -> Result<Vec<Message>>;

    /// Attach (or drop) the live connection so the server can tie
    /// queries to the watching socket
    fn set_connection_id(&self, connection_id: Option<String>);
}
