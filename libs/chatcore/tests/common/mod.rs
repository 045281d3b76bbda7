//! Common test utilities for ChatCore integration tests
//!
//! - `ScriptedApi`: in-process message history answering page queries
//! - `ScriptedEngine` / `EngineHandle`: transport engine played by the test
//! - JSON frame builders for the chat wire format

#![allow(dead_code)]

use async_trait::async_trait;
use chatcore::*;
use chatsocket::{EngineEvent, EngineEventSink, WebSocketEngine, WsMessage};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

pub fn general() -> ChannelId {
    ChannelId::new("messaging", "general")
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

pub fn message_id(index: usize) -> String {
    format!("m{:03}", index)
}

pub fn message(index: usize) -> Message {
    let mut message = Message::new(message_id(index), format!("message {}", index), at(index as i64));
    message.cid = Some(general());
    message.user = Some(User::new("alice"));
    message
}

/// `count` messages ordered oldest to newest
pub fn history(count: usize) -> Vec<Message> {
    (0..count).map(message).collect()
}

pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.id.clone()).collect()
}

// ============================================================================
// Scripted REST collaborator
// ============================================================================

#[derive(Default)]
struct ApiState {
    history: Vec<Message>,
    requests: Vec<MessagesPagination>,
    failures: usize,
    connection_id: Option<String>,
}

/// Answers page queries from an in-memory history, like the server would
#[derive(Clone)]
pub struct ScriptedApi {
    inner: Arc<Mutex<ApiState>>,
    gate: Arc<Semaphore>,
}

impl ScriptedApi {
    pub fn new(history: Vec<Message>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ApiState {
                history,
                ..Default::default()
            })),
            gate: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
        }
    }

    /// Hold every response until `release` is called
    pub fn gated(history: Vec<Message>) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            ..Self::new(history)
        }
    }

    pub fn release(&self, responses: usize) {
        self.gate.add_permits(responses);
    }

    pub fn fail_next(&self, count: usize) {
        self.inner.lock().failures = count;
    }

    pub fn push(&self, message: Message) {
        self.inner.lock().history.push(message);
    }

    pub fn requests(&self) -> Vec<MessagesPagination> {
        self.inner.lock().requests.clone()
    }

    pub fn connection_id(&self) -> Option<String> {
        self.inner.lock().connection_id.clone()
    }

    fn page(history: &[Message], pagination: &MessagesPagination) -> Vec<Message> {
        let size = pagination.page_size;
        let position = |id: &str| history.iter().position(|m| m.id == id);

        match &pagination.parameter {
            None => history[history.len().saturating_sub(size)..].to_vec(),
            Some(PaginationParameter::LessThan(id)) => {
                let end = position(id).unwrap_or(0);
                history[end.saturating_sub(size)..end].to_vec()
            }
            Some(PaginationParameter::GreaterThan(id)) => {
                let start = position(id).map(|i| i + 1).unwrap_or(history.len());
                history[start..(start + size).min(history.len())].to_vec()
            }
            Some(PaginationParameter::Around(id)) => {
                let Some(anchor) = position(id) else {
                    return history[..size.min(history.len())].to_vec();
                };
                let after_available = history.len() - anchor - 1;
                let mut before = (size / 2).min(anchor);
                let after = (size - 1 - before).min(after_available);
                // Fill the window from the other side near the edges
                before = (size - 1 - after).min(anchor);
                history[anchor - before..=anchor + after].to_vec()
            }
        }
    }
}

#[async_trait]
impl ChatApi for ScriptedApi {
    async fn query_messages(
        &self,
        _cid: &ChannelId,
        pagination: &MessagesPagination,
    ) -> chatcore::infrastructure::api::Result<Vec<Message>> {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();

        let mut state = self.inner.lock();
        state.requests.push(pagination.clone());
        if state.failures > 0 {
            state.failures -= 1;
            return Err(ApiError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(Self::page(&state.history, pagination))
    }

    fn set_connection_id(&self, connection_id: Option<String>) {
        self.inner.lock().connection_id = connection_id;
    }
}

// ============================================================================
// Scripted transport engine
// ============================================================================

#[derive(Default)]
struct EngineState {
    sink: Option<EngineEventSink>,
    connects: usize,
    disconnects: Vec<u16>,
}

/// Test-side handle onto a `ScriptedEngine`
#[derive(Clone, Default)]
pub struct EngineHandle {
    inner: Arc<Mutex<EngineState>>,
}

impl EngineHandle {
    pub fn connects(&self) -> usize {
        self.inner.lock().connects
    }

    pub fn disconnects(&self) -> Vec<u16> {
        self.inner.lock().disconnects.clone()
    }

    pub fn emit(&self, event: EngineEvent) {
        let sink = self.inner.lock().sink.clone().expect("engine was never connected");
        assert!(sink.send(event), "client task is gone");
    }

    pub fn emit_json(&self, frame: serde_json::Value) {
        self.emit(EngineEvent::Message(WsMessage::Text(frame.to_string())));
    }

    /// Complete the handshake and authenticate as `user_id`
    pub fn establish(&self, connection_id: &str, user_id: &str) {
        self.emit(EngineEvent::Connected);
        self.emit_json(health_check_frame(connection_id, user_id));
    }
}

/// Engine that answers pings and lets the test play the server
pub struct ScriptedEngine {
    handle: EngineHandle,
}

impl ScriptedEngine {
    pub fn new(handle: &EngineHandle) -> Self {
        Self {
            handle: handle.clone(),
        }
    }
}

impl WebSocketEngine for ScriptedEngine {
    fn connect(&mut self, sink: EngineEventSink) {
        let mut state = self.handle.inner.lock();
        state.connects += 1;
        state.sink = Some(sink);
    }

    fn disconnect(&mut self, code: u16) {
        self.handle.inner.lock().disconnects.push(code);
    }

    fn send(&mut self, _message: WsMessage) {}

    fn send_ping(&mut self) {
        if let Some(sink) = &self.handle.inner.lock().sink {
            sink.send(EngineEvent::Pong);
        }
    }
}

// ============================================================================
// Wire frames
// ============================================================================

pub fn health_check_frame(connection_id: &str, user_id: &str) -> serde_json::Value {
    json!({
        "type": "health.check",
        "connection_id": connection_id,
        "me": {"id": user_id},
        "created_at": "2024-03-01T10:00:00Z"
    })
}

pub fn message_new_frame(message: &Message) -> serde_json::Value {
    json!({
        "type": "message.new",
        "cid": general().to_string(),
        "created_at": message.created_at,
        "message": message,
        "user": message.user,
        "watcher_count": 2,
        "unread_count": 1,
        "total_unread_count": 3
    })
}

pub fn message_updated_frame(message: &Message) -> serde_json::Value {
    json!({
        "type": "message.updated",
        "cid": general().to_string(),
        "message": message,
        "user": message.user
    })
}

pub fn reaction_new_frame(message: &Message, kind: &str, user_id: &str) -> serde_json::Value {
    json!({
        "type": "reaction.new",
        "cid": general().to_string(),
        "message": message,
        "reaction": {"message_id": message.id, "type": kind, "user": {"id": user_id}},
        "user": {"id": user_id}
    })
}

pub fn message_deleted_frame(message: &Message) -> serde_json::Value {
    json!({
        "type": "message.deleted",
        "cid": general().to_string(),
        "message": message
    })
}

pub fn reaction_deleted_frame(message: &Message, kind: &str, user_id: &str) -> serde_json::Value {
    let mut frame = reaction_new_frame(message, kind, user_id);
    frame["type"] = json!("reaction.deleted");
    frame
}

pub fn typing_frame(user_id: &str) -> serde_json::Value {
    json!({
        "type": "typing.start",
        "cid": general().to_string(),
        "user": {"id": user_id}
    })
}

pub fn event_for(frame: serde_json::Value) -> ChatEvent {
    ChatEvent::from_value(&frame).expect("frame decodes")
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_for<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
