use async_trait::async_trait;
use std::collections::HashMap;

/// HTTP headers to send with the WebSocket handshake
pub type Headers = HashMap<String, String>;

/// Trait for providing handshake headers dynamically
///
/// Called on every connection attempt, including reconnections, so
/// implementations can hand out a freshly refreshed auth token.
///
/// # Example
/// ```ignore
/// struct TokenHeaders {
///     tokens: Arc<RwLock<String>>,
/// }
///
/// #[async_trait::async_trait]
/// impl HeaderProvider for TokenHeaders {
///     async fn get_headers(&self) -> Headers {
///         let mut headers = HashMap::new();
///         headers.insert("Authorization".to_string(), self.tokens.read().clone());
///         headers
///     }
/// }
/// ```
#[async_trait]
pub trait HeaderProvider: Send + Sync {
    /// Generate headers for the next handshake
    async fn get_headers(&self) -> Headers;
}

/// A header provider that doesn't add any headers
pub struct NoHeaders;

#[async_trait]
impl HeaderProvider for NoHeaders {
    async fn get_headers(&self) -> Headers {
        HashMap::new()
    }
}

/// A header provider with a fixed header set
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: Headers,
}

impl StaticHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl HeaderProvider for StaticHeaders {
    async fn get_headers(&self) -> Headers {
        self.headers.clone()
    }
}
