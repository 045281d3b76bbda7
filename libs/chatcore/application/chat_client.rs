//! Chat client facade
//!
//! Wires the transport client to event dispatch, the REST collaborator and
//! the local store.

use super::message_list::MessageListController;
use crate::domain::{ChannelId, User};
use crate::events::{ChatFrameDecoder, EventFilter, EventNotificationCenter};
use crate::infrastructure::api::{ChatApi, RestClient};
use crate::infrastructure::config::ChatConfig;
use crate::infrastructure::database::{Database, InMemoryDatabase};
use chatsocket::{
    AppState, ClientEvent, ConnectionState, DefaultBackoff, StaticHeaders, WebSocketClient,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

type StateObservers = Arc<Mutex<Vec<Sender<ConnectionState<User>>>>>;

pub struct ChatClient {
    socket: Option<WebSocketClient<ChatFrameDecoder>>,
    center: EventNotificationCenter,
    api: Arc<dyn ChatApi>,
    database: Arc<dyn Database>,
    page_size: usize,
    observers: StateObservers,
    pump: Option<JoinHandle<()>>,
}

impl ChatClient {
    /// Assemble a client around an already built transport
    pub fn new(
        socket: WebSocketClient<ChatFrameDecoder>,
        api: Arc<dyn ChatApi>,
        database: Arc<dyn Database>,
        page_size: usize,
    ) -> Self {
        let center = EventNotificationCenter::new();
        let observers: StateObservers = Arc::new(Mutex::new(Vec::new()));

        let pump = spawn_pump(
            socket.event_receiver(),
            center.clone(),
            Arc::clone(&api),
            Arc::clone(&observers),
        );

        Self {
            socket: Some(socket),
            center,
            api,
            database,
            page_size,
            observers,
            pump,
        }
    }

    /// Build the REST client, in-memory store and transport from config
    pub async fn from_config(config: &ChatConfig) -> anyhow::Result<Self> {
        config.log();

        let api = Arc::new(RestClient::new(
            &config.api.base_url,
            &config.api_key,
            &config.user_token,
        )?);

        let socket = chatsocket::builder()
            .url(config.websocket_url())
            .decoder(ChatFrameDecoder)
            .headers(
                StaticHeaders::new()
                    .with("Authorization", &config.user_token)
                    .with("stream-auth-type", "jwt"),
            )
            .heartbeat_interval(config.connection.heartbeat_interval())
            .pong_timeout(config.connection.pong_timeout())
            .background_grace(config.connection.background_grace())
            .stays_connected_in_background(config.connection.stays_connected_in_background)
            .reconnect_strategy(DefaultBackoff::new())
            .build()
            .await?;

        Ok(Self::new(
            socket,
            api,
            Arc::new(InMemoryDatabase::new()),
            config.pagination.page_size,
        ))
    }

    fn socket(&self) -> chatsocket::Result<&WebSocketClient<ChatFrameDecoder>> {
        self.socket
            .as_ref()
            .ok_or_else(|| chatsocket::ChatSocketError::NotConnected("client shut down".to_string()))
    }

    pub fn connect(&self) -> chatsocket::Result<()> {
        self.socket()?.connect()
    }

    pub fn disconnect(&self) -> chatsocket::Result<()> {
        self.socket()?.disconnect()
    }

    pub fn set_app_state(&self, app_state: AppState) -> chatsocket::Result<()> {
        self.socket()?.set_app_state(app_state)
    }

    pub fn reachability_changed(&self, available: bool) -> chatsocket::Result<()> {
        self.socket()?.reachability_changed(available)
    }

    pub fn connection_state(&self) -> ConnectionState<User> {
        match &self.socket {
            Some(socket) => socket.connection_state(),
            None => ConnectionState::Disconnected(None),
        }
    }

    /// Stream of connection state transitions from now on
    pub fn state_changes(&self) -> Receiver<ConnectionState<User>> {
        let (tx, rx) = unbounded();
        self.observers.lock().push(tx);
        rx
    }

    /// Dispatch center for decoded events
    pub fn events(&self) -> &EventNotificationCenter {
        &self.center
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    /// Message list for `cid`, fed by this client's live events
    ///
    /// The controller owns its subscription, so the feed stops as soon as
    /// the returned controller is dropped.
    pub async fn message_list(&self, cid: ChannelId) -> Arc<MessageListController> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = self
            .center
            .subscribe(Some(EventFilter::channel(cid.clone())), move |event| {
                let _ = tx.send(event.clone());
            });

        let controller = Arc::new(
            MessageListController::new(
                cid.clone(),
                self.page_size,
                Arc::clone(&self.api),
                Arc::clone(&self.database),
            )
            .with_feed(subscription),
        );

        // Ends once the subscription, and with it the sender, is dropped
        let weak = Arc::downgrade(&controller);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                controller.handle_event(&event).await;
            }
            debug!("Message list feed for {} ended", cid);
        });

        controller
    }

    /// Close the connection and stop the transport task
    pub async fn shutdown(mut self) -> chatsocket::Result<()> {
        if let Some(socket) = self.socket.take() {
            socket.shutdown().await?;
        }
        if let Some(pump) = self.pump.take() {
            let _ = tokio::task::spawn_blocking(move || pump.join()).await;
        }
        info!("[ChatClient] Shut down");
        Ok(())
    }
}

/// Forward transport output on a dedicated thread until the transport
/// task is gone
fn spawn_pump(
    events: Receiver<ClientEvent<crate::events::ChatEvent, User>>,
    center: EventNotificationCenter,
    api: Arc<dyn ChatApi>,
    observers: StateObservers,
) -> Option<JoinHandle<()>> {
    let spawned = std::thread::Builder::new()
        .name("chat-event-pump".to_string())
        .spawn(move || {
            for event in events.iter() {
                match event {
                    ClientEvent::StateChanged(state) => {
                        observers
                            .lock()
                            .retain(|observer| observer.send(state.clone()).is_ok());
                        apply_state(&state, &center, api.as_ref());
                    }
                    ClientEvent::Event(event) => {
                        let delivered = center.process(&event);
                        debug!("Dispatched {} to {} subscribers", event.event.raw_type(), delivered);
                    }
                }
            }
            debug!("[ChatClient] Event pump stopped");
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("[ChatClient] Failed to start event pump: {}", e);
            None
        }
    }
}

fn apply_state(state: &ConnectionState<User>, center: &EventNotificationCenter, api: &dyn ChatApi) {
    match state {
        ConnectionState::Connected {
            connection_id,
            user,
        } => {
            info!("[ChatClient] Connected as {:?} ({})", user.as_ref().map(|u| &u.id), connection_id);
            center.set_connection_id(Some(connection_id.clone()));
            center.set_current_user_id(user.as_ref().map(|u| u.id.clone()));
            api.set_connection_id(Some(connection_id.clone()));
        }
        ConnectionState::Disconnected(_) => {
            center.set_connection_id(None);
            center.set_current_user_id(None);
            api.set_connection_id(None);
        }
        ConnectionState::Reconnecting => {
            center.set_connection_id(None);
            api.set_connection_id(None);
        }
        _ => {}
    }
}
