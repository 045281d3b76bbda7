//! Common test utilities for ChatSocket integration tests
//!
//! - `MockEngine` / `EngineProbe`: scripted engine driven from the test body
//! - `TestDecoder`: tiny JSON wire format
//! - `MockWsServer`: real localhost WebSocket server for the tungstenite engine

#![allow(dead_code)]

use chatsocket::*;
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

// ============================================================================
// Scripted engine
// ============================================================================

/// One call made by the client into its engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Connect(u64),
    Disconnect(u16),
    Send(WsMessage),
    Ping,
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<EngineCall>,
    sink: Option<EngineEventSink>,
    auto_pong: bool,
}

/// Test-side handle onto a `MockEngine`
#[derive(Clone, Default)]
pub struct EngineProbe {
    inner: Arc<Mutex<ProbeState>>,
}

impl EngineProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every ping with a protocol pong
    pub fn with_auto_pong(self) -> Self {
        self.inner.lock().auto_pong = true;
        self
    }

    pub fn set_auto_pong(&self, auto_pong: bool) {
        self.inner.lock().auto_pong = auto_pong;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.lock().calls.clone()
    }

    pub fn connects(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Connect(_)))
    }

    pub fn pings(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Ping))
    }

    pub fn disconnects(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Disconnect(_)))
    }

    pub fn sent(&self) -> Vec<WsMessage> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Send(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Sink of the most recent `connect`
    pub fn sink(&self) -> Option<EngineEventSink> {
        self.inner.lock().sink.clone()
    }

    /// Report an event on the current socket
    pub fn emit(&self, event: EngineEvent) {
        let sink = self.sink().expect("engine was never connected");
        assert!(sink.send(event), "client task is gone");
    }

    pub fn emit_text(&self, text: &str) {
        self.emit(EngineEvent::Message(WsMessage::Text(text.to_string())));
    }

    /// Complete the handshake and authenticate the session
    pub fn establish(&self, connection_id: &str) {
        self.emit(EngineEvent::Connected);
        self.emit_text(&health_check(connection_id));
    }

    /// Server closes the socket
    pub fn close(&self, code: u16) {
        self.emit(EngineEvent::Disconnected {
            code: Some(code),
            error: None,
        });
    }

    /// Socket dies without a close frame
    pub fn drop_connection(&self) {
        self.emit(EngineEvent::Disconnected {
            code: None,
            error: Some("connection reset".to_string()),
        });
    }
}

/// Engine that records calls and lets the test play the server
pub struct MockEngine {
    probe: EngineProbe,
}

impl MockEngine {
    pub fn new(probe: &EngineProbe) -> Self {
        Self {
            probe: probe.clone(),
        }
    }
}

impl WebSocketEngine for MockEngine {
    fn connect(&mut self, sink: EngineEventSink) {
        let mut state = self.probe.inner.lock();
        state.calls.push(EngineCall::Connect(sink.generation()));
        state.sink = Some(sink);
    }

    fn disconnect(&mut self, code: u16) {
        self.probe.inner.lock().calls.push(EngineCall::Disconnect(code));
    }

    fn send(&mut self, message: WsMessage) {
        self.probe.inner.lock().calls.push(EngineCall::Send(message));
    }

    fn send_ping(&mut self) {
        let mut state = self.probe.inner.lock();
        state.calls.push(EngineCall::Ping);
        if state.auto_pong {
            if let Some(sink) = &state.sink {
                sink.send(EngineEvent::Pong);
            }
        }
    }
}

// ============================================================================
// Test wire format
// ============================================================================

/// Event produced by `TestDecoder`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEvent {
    pub kind: String,
    pub text: Option<String>,
}

/// Decoder for `{"type": ..}` frames
///
/// - `health.check` carries `connection_id` and optional `me`
/// - `pong` is a heartbeat reply
/// - `{"error": {..}}` is a server error
/// - anything else with a `type` is an event
pub struct TestDecoder;

impl FrameDecoder for TestDecoder {
    type Event = TestEvent;
    type User = String;

    fn decode(&self, message: &WsMessage) -> Result<DecodedFrame<TestEvent, String>> {
        let text = message.text_payload()?;
        if let Some(error) = ServerErrorFrame::parse(&text) {
            return Ok(DecodedFrame::ServerError(error));
        }

        let value: Value = serde_json::from_str(&text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ChatSocketError::Decode("missing type".to_string()))?
            .to_string();

        let event = TestEvent {
            kind: kind.clone(),
            text: value.get("text").and_then(Value::as_str).map(str::to_string),
        };

        match kind.as_str() {
            "pong" => Ok(DecodedFrame::Pong),
            "health.check" => {
                let connection_id = value
                    .get("connection_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ChatSocketError::Decode("missing connection_id".to_string()))?
                    .to_string();
                let user = value.get("me").and_then(Value::as_str).map(str::to_string);
                Ok(DecodedFrame::HealthCheck {
                    connection_id,
                    user,
                    event,
                })
            }
            _ => Ok(DecodedFrame::Event(event)),
        }
    }
}

pub fn health_check(connection_id: &str) -> String {
    format!(
        r#"{{"type":"health.check","connection_id":"{}","me":"alice"}}"#,
        connection_id
    )
}

pub fn server_error(code: i64) -> String {
    format!(
        r#"{{"error":{{"code":{},"message":"rejected","StatusCode":401}}}}"#,
        code
    )
}

/// Client wired to a scripted engine
pub async fn mock_client(
    probe: &EngineProbe,
    strategy: impl ReconnectionStrategy + 'static,
) -> WebSocketClient<TestDecoder> {
    chatsocket::builder()
        .url("wss://chat.test/connect")
        .decoder(TestDecoder)
        .engine(MockEngine::new(probe))
        .reconnect_strategy(strategy)
        .build()
        .await
        .expect("client builds")
}

/// Let the client task drain its queue
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Drain pending state changes and domain events
pub fn drain(
    client: &WebSocketClient<TestDecoder>,
) -> (Vec<ConnectionState<String>>, Vec<TestEvent>) {
    let mut states = Vec::new();
    let mut events = Vec::new();
    while let Some(event) = client.try_recv_event() {
        match event {
            ClientEvent::StateChanged(state) => states.push(state),
            ClientEvent::Event(event) => events.push(event),
        }
    }
    (states, events)
}

/// Drain pending state changes
pub fn states(client: &WebSocketClient<TestDecoder>) -> Vec<ConnectionState<String>> {
    let mut out = Vec::new();
    while let Some(event) = client.try_recv_event() {
        if let ClientEvent::StateChanged(state) = event {
            out.push(state);
        }
    }
    out
}

/// Drain pending domain events
pub fn events(client: &WebSocketClient<TestDecoder>) -> Vec<TestEvent> {
    let mut out = Vec::new();
    while let Some(event) = client.try_recv_event() {
        if let ClientEvent::Event(event) = event {
            out.push(event);
        }
    }
    out
}

// ============================================================================
// Localhost server
// ============================================================================

/// A simple mock WebSocket server for testing
///
/// Every accepted socket gets a health check with connection id
/// `conn-<n>`. Text frames are echoed, except `{"type":"close","code":N}`
/// which makes the server close the socket with code `N`.
pub struct MockWsServer {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let accepted = Arc::new(AtomicUsize::new(0));
        let shutdown_clone = shutdown.clone();
        let accepted_clone = accepted.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let n = accepted_clone.fetch_add(1, Ordering::SeqCst) + 1;
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, n, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            accepted,
            shutdown,
        }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, n: usize, shutdown: Arc<Notify>) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
        use tokio_tungstenite::tungstenite::protocol::CloseFrame;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        if write
            .send(Message::Text(health_check(&format!("conn-{}", n))))
            .await
            .is_err()
        {
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let close_code = serde_json::from_str::<Value>(&text)
                                .ok()
                                .filter(|v| v.get("type").and_then(Value::as_str) == Some("close"))
                                .and_then(|v| v.get("code").and_then(Value::as_u64));
                            if let Some(code) = close_code {
                                let frame = CloseFrame {
                                    code: CloseCode::from(code as u16),
                                    reason: "".into(),
                                };
                                let _ = write.send(Message::Close(Some(frame))).await;
                                break;
                            }
                            if write.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if write.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of sockets accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
