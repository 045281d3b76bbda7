use super::{ApiError, ChatApi, Result};
use crate::domain::{ChannelId, Message};
use crate::pagination::MessagesPagination;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<Message>,
}

/// reqwest-backed `ChatApi`
pub struct RestClient {
    base_url: String,
    api_key: String,
    user_token: String,
    connection_id: RwLock<Option<String>>,
    client: Client,
}

impl RestClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        user_token: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            user_token: user_token.into(),
            connection_id: RwLock::new(None),
            client,
        })
    }

    pub fn connection_id(&self) -> Option<String> {
        self.connection_id.read().clone()
    }

    fn messages_url(&self, cid: &ChannelId) -> String {
        format!("{}/channels/{}/{}/messages", self.base_url, cid.kind(), cid.id())
    }
}

#[async_trait]
impl ChatApi for RestClient {
    async fn query_messages(
        &self,
        cid: &ChannelId,
        pagination: &MessagesPagination,
    ) -> Result<Vec<Message>> {
        let url = self.messages_url(cid);

        let mut params = pagination.query_items();
        params.push(("api_key", self.api_key.clone()));
        if let Some(connection_id) = self.connection_id() {
            params.push(("connection_id", connection_id));
        }

        debug!("GET {} with {} params", url, params.len());

        let response = self
            .client
            .get(&url)
            .query(&params)
            .header("Authorization", &self.user_token)
            .header("stream-auth-type", "jwt")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Message query for {} failed with {}", cid, status);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

        debug!("Fetched {} messages for {}", parsed.messages.len(), cid);
        Ok(parsed.messages)
    }

    fn set_connection_id(&self, connection_id: Option<String>) {
        *self.connection_id.write() = connection_id;
    }
}
