//! Physical socket engines
//!
//! The transport client never touches a socket directly. It drives a
//! `WebSocketEngine` and receives `EngineEvent`s back through an
//! `EngineEventSink`, which feeds the client's serial command queue.
//! Each connection attempt gets a fresh sink tagged with a generation
//! number, so late callbacks from an abandoned socket are recognised and
//! ignored.

use crate::core::client::Command;
use crate::traits::{HeaderProvider, WsMessage};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Callbacks from an engine to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Handshake completed; the session is not authenticated yet
    Connected,
    /// Text or binary frame received
    Message(WsMessage),
    /// Protocol-level pong received
    Pong,
    /// The socket is gone
    Disconnected {
        code: Option<u16>,
        error: Option<String>,
    },
}

/// Handle an engine uses to report back to its client
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    tx: UnboundedSender<Command>,
    generation: u64,
}

impl EngineEventSink {
    pub(crate) fn new(tx: UnboundedSender<Command>, generation: u64) -> Self {
        Self { tx, generation }
    }

    /// Report an event; false if the client is gone
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx
            .send(Command::Engine {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The physical connection
///
/// All methods are called from the client's serial task and must not
/// block. Results are reported asynchronously through the sink given to
/// `connect`.
pub trait WebSocketEngine: Send + 'static {
    /// Open a new socket, abandoning any previous one
    fn connect(&mut self, sink: EngineEventSink);

    /// Close the socket with the given close code
    fn disconnect(&mut self, code: u16);

    /// Send a frame
    fn send(&mut self, message: WsMessage);

    /// Send a protocol-level ping
    fn send_ping(&mut self);
}

#[derive(Debug)]
enum Outbound {
    Message(WsMessage),
    Ping,
    Close(u16),
}

/// Default engine built on tokio-tungstenite
pub struct TungsteniteEngine {
    url: String,
    headers: Option<Arc<dyn HeaderProvider>>,
    outbound: Option<UnboundedSender<Outbound>>,
    task: Option<JoinHandle<()>>,
}

impl TungsteniteEngine {
    pub fn new(url: impl Into<String>, headers: Option<Arc<dyn HeaderProvider>>) -> Self {
        Self {
            url: url.into(),
            headers,
            outbound: None,
            task: None,
        }
    }

    fn queue(&self, outbound: Outbound) {
        match &self.outbound {
            Some(tx) => {
                if tx.send(outbound).is_err() {
                    debug!("Socket task already finished, dropping outbound frame");
                }
            }
            None => debug!("No socket open, dropping outbound frame"),
        }
    }
}

impl WebSocketEngine for TungsteniteEngine {
    fn connect(&mut self, sink: EngineEventSink) {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);

        let url = self.url.clone();
        let headers = self.headers.clone();
        self.task = Some(tokio::spawn(async move {
            run_socket(url, headers, rx, sink).await;
        }));
    }

    fn disconnect(&mut self, code: u16) {
        self.queue(Outbound::Close(code));
    }

    fn send(&mut self, message: WsMessage) {
        self.queue(Outbound::Message(message));
    }

    fn send_ping(&mut self) {
        self.queue(Outbound::Ping);
    }
}

impl Drop for TungsteniteEngine {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn build_request(
    url: &str,
    headers: Option<Arc<dyn HeaderProvider>>,
) -> Result<http::Request<()>, String> {
    let mut request = url
        .into_client_request()
        .map_err(|e| format!("Failed to create request: {}", e))?;

    if let Some(provider) = headers {
        for (key, value) in provider.get_headers().await {
            match (
                key.parse::<http::header::HeaderName>(),
                value.parse::<http::header::HeaderValue>(),
            ) {
                (Ok(name), Ok(value)) => {
                    request.headers_mut().insert(name, value);
                }
                (Err(_), _) => warn!("Invalid header name: {}", key),
                (_, Err(_)) => warn!("Invalid header value for key '{}'", key),
            }
        }
    }

    Ok(request)
}

/// One socket's lifetime: handshake, pump frames both ways, report the close
async fn run_socket(
    url: String,
    headers: Option<Arc<dyn HeaderProvider>>,
    mut outbound: UnboundedReceiver<Outbound>,
    sink: EngineEventSink,
) {
    let request = match build_request(&url, headers).await {
        Ok(request) => request,
        Err(e) => {
            error!("{}", e);
            sink.send(EngineEvent::Disconnected {
                code: None,
                error: Some(e),
            });
            return;
        }
    };

    let ws_stream = match connect_async(request).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            error!("Failed to connect to {}: {}", url, e);
            sink.send(EngineEvent::Disconnected {
                code: None,
                error: Some(e.to_string()),
            });
            return;
        }
    };

    info!("Socket open to {}", url);
    sink.send(EngineEvent::Connected);

    let (mut write, mut read) = ws_stream.split();
    let mut close_code: Option<u16> = None;
    let mut failure: Option<String> = None;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        sink.send(EngineEvent::Message(WsMessage::Text(text)));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        sink.send(EngineEvent::Message(WsMessage::Binary(data)));
                    }
                    Some(Ok(Message::Pong(_))) => {
                        sink.send(EngineEvent::Pong);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        close_code = frame.map(|f| u16::from(f.code));
                        debug!("Server closed the socket with code {:?}", close_code);
                        break;
                    }
                    // Pings are answered by tungstenite itself
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        failure = Some(e.to_string());
                        break;
                    }
                    None => {
                        warn!("WebSocket stream closed");
                        failure = Some("stream ended".to_string());
                        break;
                    }
                }
            }

            out = outbound.recv() => {
                let result = match out {
                    Some(Outbound::Message(message)) => write.send(to_tungstenite(message)).await,
                    Some(Outbound::Ping) => write.send(Message::Ping(Vec::new())).await,
                    Some(Outbound::Close(code)) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "".into(),
                        };
                        let _ = write.send(Message::Close(Some(frame))).await;
                        close_code = Some(code);
                        break;
                    }
                    None => {
                        debug!("Engine dropped, closing socket");
                        let _ = write.close().await;
                        return;
                    }
                };

                if let Err(e) = result {
                    error!("Failed to write frame: {}", e);
                    failure = Some(e.to_string());
                    break;
                }
            }
        }
    }

    sink.send(EngineEvent::Disconnected {
        code: close_code,
        error: failure,
    });
}

/// Convert WsMessage to tungstenite Message
fn to_tungstenite(message: WsMessage) -> Message {
    match message {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}
