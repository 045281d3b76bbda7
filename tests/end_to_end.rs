//! Integration test: ChatClient over a real WebSocket against a localhost
//! chat server

use async_trait::async_trait;
use chat_sync::chatcore::infrastructure::api::Result as ApiResult;
use chat_sync::chatcore::{ChatApi, ChatFrameDecoder, InMemoryDatabase};
use chat_sync::prelude::*;
use chrono::{TimeZone, Utc};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsFrame;

const WAIT: Duration = Duration::from_secs(5);

/// What the server saw during one handshake
#[derive(Debug, Clone)]
struct Handshake {
    uri: String,
    authorization: Option<String>,
}

/// Minimal chat server: authenticates every socket with a health check,
/// then relays whatever frames the test pushes
struct ChatServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    frames: broadcast::Sender<String>,
}

impl ChatServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let (frames, _) = broadcast::channel(64);

        let server = Self {
            addr,
            accepted: Arc::clone(&accepted),
            handshakes: Arc::clone(&handshakes),
            frames: frames.clone(),
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let n = accepted.fetch_add(1, Ordering::SeqCst) + 1;
                let handshakes = Arc::clone(&handshakes);
                let mut outbound = frames.subscribe();

                tokio::spawn(async move {
                    let record = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                        handshakes.lock().push(Handshake {
                            uri: request.uri().to_string(),
                            authorization: request
                                .headers()
                                .get("Authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                        });
                        Ok(response)
                    };
                    let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, record).await else {
                        return;
                    };
                    let (mut write, mut read) = ws.split();

                    let hello = json!({
                        "type": "health.check",
                        "connection_id": format!("conn-{}", n),
                        "me": {"id": "alice"}
                    });
                    if write.send(WsFrame::Text(hello.to_string())).await.is_err() {
                        return;
                    }

                    loop {
                        tokio::select! {
                            frame = outbound.recv() => {
                                let Ok(frame) = frame else { break };
                                if frame == "close" {
                                    let close = CloseFrame { code: CloseCode::Normal, reason: "".into() };
                                    let _ = write.send(WsFrame::Close(Some(close))).await;
                                    break;
                                }
                                if write.send(WsFrame::Text(frame)).await.is_err() {
                                    break;
                                }
                            }
                            incoming = read.next() => {
                                match incoming {
                                    Some(Ok(WsFrame::Close(_))) | None | Some(Err(_)) => break,
                                    _ => {}
                                }
                            }
                        }
                    }
                });
            }
        });

        server
    }

    fn url(&self) -> String {
        format!("ws://{}/connect", self.addr)
    }

    fn push(&self, frame: serde_json::Value) {
        let _ = self.frames.send(frame.to_string());
    }

    fn close_normally(&self) {
        let _ = self.frames.send("close".to_string());
    }

    fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

fn message(index: usize) -> Message {
    let mut message = Message::new(
        format!("m{:03}", index),
        format!("message {}", index),
        Utc.timestamp_opt(1_700_000_000 + index as i64, 0).unwrap(),
    );
    message.user = Some(User::new("bob"));
    message
}

fn message_new(message: &Message) -> serde_json::Value {
    json!({
        "type": "message.new",
        "cid": "messaging:general",
        "message": message,
        "user": {"id": "bob"},
        "watcher_count": 2,
        "unread_count": 1,
        "total_unread_count": 1
    })
}

/// REST stand-in serving a fixed history
struct FixedHistory {
    messages: Vec<Message>,
    connection_id: Mutex<Option<String>>,
}

#[async_trait]
impl ChatApi for FixedHistory {
    async fn query_messages(
        &self,
        _cid: &ChannelId,
        pagination: &MessagesPagination,
    ) -> ApiResult<Vec<Message>> {
        let start = self.messages.len().saturating_sub(pagination.page_size);
        Ok(self.messages[start..].to_vec())
    }

    fn set_connection_id(&self, connection_id: Option<String>) {
        *self.connection_id.lock() = connection_id;
    }
}

async fn wait_for<F: FnMut() -> bool>(mut condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

fn config_for(server: &ChatServer) -> ChatConfig {
    let yaml = format!(
        "api:\n  base_url: http://127.0.0.1:9\n  ws_url: {}\n",
        server.url()
    );
    let mut config: ChatConfig = serde_yaml::from_str(&yaml).unwrap();
    config.api_key = "key-123".to_string();
    config.user_token = "jwt-token".to_string();
    config.validate().unwrap();
    config
}

#[tokio::test]
async fn test_from_config_connects_and_dispatches() {
    let server = ChatServer::start().await;
    let client = ChatClient::from_config(&config_for(&server)).await.unwrap();
    let (_subscription, events) = client
        .events()
        .subscribe_channel(Some(EventFilter::event_types([EventType::MessageNew])));

    client.connect().unwrap();
    assert!(wait_for(|| client.connection_state().is_connected()).await);
    assert_eq!(client.connection_state().connection_id(), Some("conn-1"));

    let handshake = server.handshakes.lock()[0].clone();
    assert!(handshake.uri.contains("api_key=key-123"));
    assert_eq!(handshake.authorization.as_deref(), Some("jwt-token"));

    server.push(json!({"type": "typing.start", "cid": "messaging:general", "user": {"id": "bob"}}));
    server.push(message_new(&message(1)));

    let event = tokio::task::spawn_blocking(move || events.recv_timeout(WAIT))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.event.message().map(|m| m.id.as_str()), Some("m001"));
    assert_eq!(event.cid, Some(ChannelId::new("messaging", "general")));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_normal_closure_is_terminal() {
    let server = ChatServer::start().await;
    let client = ChatClient::from_config(&config_for(&server)).await.unwrap();
    let states = client.state_changes();

    client.connect().unwrap();
    assert!(wait_for(|| client.connection_state().is_connected()).await);

    server.close_normally();
    assert!(wait_for(|| !client.connection_state().is_active()).await);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.accepted(), 1);
    let observed: Vec<&'static str> = states.try_iter().map(|s| s.name()).collect();
    assert!(!observed.contains(&"reconnecting"));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_message_list_syncs_history_and_live_tail() {
    let server = ChatServer::start().await;
    let api = Arc::new(FixedHistory {
        messages: (0..30).map(message).collect(),
        connection_id: Mutex::new(None),
    });

    let socket = chat_sync::chatsocket::builder()
        .url(server.url())
        .decoder(ChatFrameDecoder)
        .build()
        .await
        .unwrap();
    let client = ChatClient::new(socket, api.clone(), Arc::new(InMemoryDatabase::new()), 25);

    let list = client
        .message_list(ChannelId::new("messaging", "general"))
        .await;
    assert_eq!(list.load_first_page().await.unwrap(), 25);
    assert!(!list.pagination_state().await.has_loaded_all_previous_messages);

    client.connect().unwrap();
    assert!(wait_for(|| api.connection_id.lock().as_deref() == Some("conn-1")).await);

    server.push(message_new(&message(30)));
    let mut synced = false;
    for _ in 0..250 {
        if list.messages().await.last().map(|m| m.id.as_str()) == Some("m030") {
            synced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(synced);
    assert_eq!(list.messages().await.len(), 26);
    assert_eq!(list.cached_messages().len(), 26);

    client.shutdown().await.unwrap();
}
