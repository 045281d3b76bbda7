pub mod states;

use crate::core::client::WebSocketClient;
use crate::core::config::ClientConfig;
use crate::core::engine::{TungsteniteEngine, WebSocketEngine};
use crate::traits::*;
use states::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for WebSocketClient
///
/// This builder uses Rust's type system to enforce that required
/// fields (URL and frame decoder) are set before the client can be built.
pub struct WebSocketClientBuilder<U, Dc, D>
where
    U: UrlState,
    Dc: DecoderState,
{
    _state: TypeState<U, Dc>,
    _decoder_type: PhantomData<D>,
    url: Option<String>,
    decoder: Option<D>,
    headers: Option<Arc<dyn HeaderProvider>>,
    heartbeat_interval: Duration,
    pong_timeout: Duration,
    background_grace: Duration,
    stays_connected_in_background: bool,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    reachability: Option<Arc<dyn Reachability>>,
    engine: Option<Box<dyn WebSocketEngine>>,
}

impl WebSocketClientBuilder<NoUrl, NoDecoder, ()> {
    /// Create a new builder instance
    pub fn new() -> Self {
        let defaults = ClientConfig::new("");
        Self {
            _state: TypeState::new(),
            _decoder_type: PhantomData,
            url: None,
            decoder: None,
            headers: None,
            heartbeat_interval: defaults.heartbeat_interval(),
            pong_timeout: defaults.pong_timeout(),
            background_grace: defaults.background_grace(),
            stays_connected_in_background: defaults.stays_connected_in_background(),
            reconnect_strategy: None,
            reachability: None,
            engine: None,
        }
    }
}

impl Default for WebSocketClientBuilder<NoUrl, NoDecoder, ()> {
    fn default() -> Self {
        Self::new()
    }
}

// URL setting
impl<Dc, D> WebSocketClientBuilder<NoUrl, Dc, D>
where
    Dc: DecoderState,
{
    pub fn url(self, url: impl Into<String>) -> WebSocketClientBuilder<HasUrl, Dc, D> {
        WebSocketClientBuilder {
            _state: TypeState::new(),
            _decoder_type: PhantomData,
            url: Some(url.into()),
            decoder: self.decoder,
            headers: self.headers,
            heartbeat_interval: self.heartbeat_interval,
            pong_timeout: self.pong_timeout,
            background_grace: self.background_grace,
            stays_connected_in_background: self.stays_connected_in_background,
            reconnect_strategy: self.reconnect_strategy,
            reachability: self.reachability,
            engine: self.engine,
        }
    }
}

// Decoder setting
impl<U> WebSocketClientBuilder<U, NoDecoder, ()>
where
    U: UrlState,
{
    pub fn decoder<NewD>(self, decoder: NewD) -> WebSocketClientBuilder<U, HasDecoder, NewD>
    where
        NewD: FrameDecoder,
    {
        WebSocketClientBuilder {
            _state: TypeState::new(),
            _decoder_type: PhantomData,
            url: self.url,
            decoder: Some(decoder),
            headers: self.headers,
            heartbeat_interval: self.heartbeat_interval,
            pong_timeout: self.pong_timeout,
            background_grace: self.background_grace,
            stays_connected_in_background: self.stays_connected_in_background,
            reconnect_strategy: self.reconnect_strategy,
            reachability: self.reachability,
            engine: self.engine,
        }
    }
}

// Optional settings, available in any state
impl<U, Dc, D> WebSocketClientBuilder<U, Dc, D>
where
    U: UrlState,
    Dc: DecoderState,
{
    /// Handshake headers (auth tokens etc.)
    ///
    /// Applied by the default engine only; combining them with `engine`
    /// fails at build time.
    pub fn headers<H: HeaderProvider + 'static>(mut self, provider: H) -> Self {
        self.headers = Some(Arc::new(provider));
        self
    }

    /// Interval between pings once connected (default 30s)
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// How long to wait for a pong after each ping (default 3s)
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    /// Grace window while backgrounded (default 300s)
    pub fn background_grace(mut self, grace: Duration) -> Self {
        self.background_grace = grace;
        self
    }

    /// Keep the connection in background for the grace window (default true)
    pub fn stays_connected_in_background(mut self, stays: bool) -> Self {
        self.stays_connected_in_background = stays;
        self
    }

    /// Reconnection strategy (default `DefaultBackoff`)
    pub fn reconnect_strategy<S: ReconnectionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Network reachability source (default `AlwaysReachable`)
    pub fn reachability<Re: Reachability + 'static>(mut self, reachability: Re) -> Self {
        self.reachability = Some(Arc::new(reachability));
        self
    }

    /// Replace the socket engine (default `TungsteniteEngine`)
    ///
    /// A custom engine performs its own handshake, headers included.
    pub fn engine<E: WebSocketEngine>(mut self, engine: E) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }
}

// Build - only available when URL and decoder are set
impl<D> WebSocketClientBuilder<HasUrl, HasDecoder, D>
where
    D: FrameDecoder,
{
    /// Build the client and spawn its task
    ///
    /// Must be called inside a Tokio runtime. The client starts in
    /// `NotConnected`; call `connect()` to open the socket.
    pub async fn build(self) -> Result<WebSocketClient<D>> {
        let url = self
            .url
            .ok_or_else(|| ChatSocketError::Configuration("URL is required".to_string()))?;
        let decoder = self
            .decoder
            .ok_or_else(|| ChatSocketError::Configuration("Decoder is required".to_string()))?;

        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            return Err(ChatSocketError::Configuration(format!(
                "URL must use ws:// or wss://, got {}",
                url
            )));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ChatSocketError::Configuration(
                "Heartbeat interval must be > 0".to_string(),
            ));
        }

        let engine: Box<dyn WebSocketEngine> = match (self.engine, self.headers) {
            (Some(_), Some(_)) => {
                return Err(ChatSocketError::Configuration(
                    "Handshake headers cannot be applied to a custom engine".to_string(),
                ))
            }
            (Some(engine), None) => engine,
            (None, headers) => Box::new(TungsteniteEngine::new(url.clone(), headers)),
        };

        let config = ClientConfig {
            url,
            heartbeat_interval: self.heartbeat_interval,
            pong_timeout: self.pong_timeout,
            background_grace: self.background_grace,
            stays_connected_in_background: self.stays_connected_in_background,
        };

        Ok(WebSocketClient::new(
            config,
            decoder,
            engine,
            self.reconnect_strategy
                .unwrap_or_else(|| Box::new(DefaultBackoff::new())),
            self.reachability.unwrap_or_else(|| Arc::new(AlwaysReachable)),
        ))
    }
}
