use crate::core::config::ClientConfig;
use crate::core::connection_state::{
    AppState, ConnectionState, DisconnectReason, DisconnectSource, SharedConnectionState,
};
use crate::core::engine::{EngineEvent, EngineEventSink, WebSocketEngine};
use crate::core::heartbeat::Heartbeat;
use crate::core::metrics::{AtomicMetrics, Metrics};
use crate::core::pong_tracker::PongTracker;
use crate::core::reconnection::{classify_disconnect, DisconnectDisposition, ReconnectionContext};
use crate::core::timer::ScheduledTask;
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Everything the client task reacts to
///
/// Public calls, engine callbacks and timer firings all arrive through the
/// same queue, so they are processed one at a time in arrival order.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    Connect,
    Disconnect(DisconnectSource),
    AppState(AppState),
    Reachability(bool),
    Send(WsMessage),
    Engine { generation: u64, event: EngineEvent },
    HeartbeatTick,
    PongTimeout,
    ReconnectDue,
    BackgroundExpired,
    Shutdown,
}

/// Events emitted by the client to its observer
#[derive(Debug, Clone)]
pub enum ClientEvent<E, U> {
    /// Connection state changed
    StateChanged(ConnectionState<U>),
    /// Domain event received while connected
    Event(E),
}

/// Real-time transport client
///
/// All connection state lives in a single tokio task; this handle only
/// posts commands to it and reads the shared state snapshot. Observers
/// receive `ClientEvent`s over an unbounded crossbeam channel in the order
/// frames arrived on the socket.
///
/// # Type Parameters
/// - `D`: FrameDecoder implementation (decides the wire format)
pub struct WebSocketClient<D: FrameDecoder> {
    url: String,
    state: SharedConnectionState<D::User>,
    metrics: Arc<AtomicMetrics>,
    command_tx: UnboundedSender<Command>,
    event_rx: Receiver<ClientEvent<D::Event, D::User>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl<D: FrameDecoder> WebSocketClient<D> {
    /// Spawn the client task
    ///
    /// Called by the builder's `build()` method.
    /// Use `chatsocket::builder()` to create a client.
    pub(crate) fn new(
        config: ClientConfig,
        decoder: D,
        engine: Box<dyn WebSocketEngine>,
        strategy: Box<dyn ReconnectionStrategy>,
        reachability: Arc<dyn Reachability>,
    ) -> Self {
        let state = SharedConnectionState::new(ConnectionState::NotConnected);
        let metrics = Arc::new(AtomicMetrics::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();
        let url = config.url.clone();

        let driver = ConnectionDriver {
            heartbeat: Heartbeat::new(config.heartbeat_interval),
            pong: PongTracker::new(config.pong_timeout),
            config,
            decoder,
            engine,
            strategy,
            reachability,
            network_reported: true,
            current: ConnectionState::NotConnected,
            shared: state.clone(),
            metrics: Arc::clone(&metrics),
            event_tx,
            command_tx: command_tx.clone(),
            generation: 0,
            reconnection: ReconnectionContext::new(),
            reconnect_task: None,
            background_task: None,
            last_error: None,
            app_state: AppState::Foreground,
            disconnected_in_background: false,
        };

        let task_handle = tokio::spawn(driver.run(command_rx));

        Self {
            url,
            state,
            metrics,
            command_tx,
            event_rx,
            task_handle: Some(task_handle),
        }
    }

    fn command(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| ChatSocketError::ChannelSend(format!("client task stopped: {:?}", e.0)))
    }

    /// Open the connection
    ///
    /// No-op while connecting, connected, or waiting for a scheduled
    /// reconnect. Without a network path the state moves straight to
    /// `Disconnected(NoNetwork)`.
    pub fn connect(&self) -> Result<()> {
        self.command(Command::Connect)
    }

    /// Deliberately close the connection
    ///
    /// Resets the failure counter and cancels heartbeat, background grace
    /// and any pending reconnect, whatever the current state.
    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect(DisconnectSource::UserInitiated))
    }

    /// Report a foreground/background transition of the host application
    pub fn set_app_state(&self, app_state: AppState) -> Result<()> {
        self.command(Command::AppState(app_state))
    }

    /// Report a change of network reachability
    pub fn reachability_changed(&self, available: bool) -> Result<()> {
        self.command(Command::Reachability(available))
    }

    /// Send a frame through the WebSocket
    pub fn send(&self, message: WsMessage) -> Result<()> {
        if !self.state.is_connected() {
            return Err(ChatSocketError::NotConnected(format!(
                "cannot send to {} before the session is established",
                self.url
            )));
        }
        self.command(Command::Send(message))
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState<D::User> {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Connection id of the current session, if connected
    pub fn connection_id(&self) -> Option<String> {
        self.state.connection_id()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent<D::Event, D::User>> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(
        &self,
    ) -> std::result::Result<ClientEvent<D::Event, D::User>, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Receive an event, giving up after `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ClientEvent<D::Event, D::User>> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Clone of the event receiver, for a dedicated consumer thread
    pub fn event_receiver(&self) -> Receiver<ClientEvent<D::Event, D::User>> {
        self.event_rx.clone()
    }

    /// Shutdown the client and wait for its task to finish
    pub async fn shutdown(mut self) -> Result<()> {
        info!("[ChatSocket] Shutting down client for {}", self.url);
        let _ = self.command_tx.send(Command::Shutdown);

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| ChatSocketError::ConnectionClosed(format!("client task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl<D: FrameDecoder> Drop for WebSocketClient<D> {
    fn drop(&mut self) {
        if self.task_handle.is_some() {
            let _ = self.command_tx.send(Command::Shutdown);
        }
    }
}

/// Owner of all mutable connection state; runs inside the client task
struct ConnectionDriver<D: FrameDecoder> {
    config: ClientConfig,
    decoder: D,
    engine: Box<dyn WebSocketEngine>,
    strategy: Box<dyn ReconnectionStrategy>,
    reachability: Arc<dyn Reachability>,
    /// Last value passed to `reachability_changed`
    network_reported: bool,
    current: ConnectionState<D::User>,
    shared: SharedConnectionState<D::User>,
    metrics: Arc<AtomicMetrics>,
    event_tx: Sender<ClientEvent<D::Event, D::User>>,
    command_tx: UnboundedSender<Command>,
    /// Bumped for every socket; events tagged with an older value are stale
    generation: u64,
    reconnection: ReconnectionContext,
    heartbeat: Heartbeat,
    pong: PongTracker,
    /// Pending reconnect; `Some` means a reconnect is already scheduled
    reconnect_task: Option<ScheduledTask>,
    background_task: Option<ScheduledTask>,
    last_error: Option<ServerError>,
    app_state: AppState,
    disconnected_in_background: bool,
}

impl<D: FrameDecoder> ConnectionDriver<D> {
    async fn run(mut self, mut commands: UnboundedReceiver<Command>) {
        debug!("[ChatSocket] Client task started for {}", self.config.url);

        while let Some(command) = commands.recv().await {
            if !self.handle(command) {
                break;
            }
        }

        self.teardown();
        debug!("[ChatSocket] Client task exited");
    }

    /// Process one command; false stops the task
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Connect => self.connect(),
            Command::Disconnect(source) => self.disconnect(source),
            Command::AppState(app_state) => self.app_state_changed(app_state),
            Command::Reachability(available) => self.reachability_changed(available),
            Command::Send(message) => self.send(message),
            Command::Engine { generation, event } => {
                if generation != self.generation {
                    debug!(
                        "[ChatSocket] Ignoring {:?} from abandoned socket #{}",
                        event, generation
                    );
                } else {
                    self.engine_event(event);
                }
            }
            Command::HeartbeatTick => self.heartbeat_tick(),
            Command::PongTimeout => {
                if self.pong.timeout_fired() {
                    warn!(
                        "[ChatSocket] No pong within {:?}, dropping connection",
                        self.config.pong_timeout
                    );
                    self.disconnect(DisconnectSource::NoPongReceived);
                }
            }
            Command::ReconnectDue => self.reconnect_due(),
            Command::BackgroundExpired => {
                if self.background_task.take().is_some() {
                    info!(
                        "[ChatSocket] Background grace of {:?} elapsed, disconnecting",
                        self.config.background_grace
                    );
                    self.disconnected_in_background = true;
                    self.disconnect(DisconnectSource::SystemInitiated);
                }
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn is_network_available(&self) -> bool {
        self.network_reported && self.reachability.is_available()
    }

    fn set_state(&mut self, state: ConnectionState<D::User>) {
        if state == self.current {
            return;
        }

        info!("[ChatSocket] {} -> {}", self.current, state);

        if matches!(state, ConnectionState::Disconnected(_)) {
            self.background_task = None;
        }

        self.current = state.clone();
        self.shared.set(state.clone());
        if self.event_tx.send(ClientEvent::StateChanged(state)).is_err() {
            debug!("[ChatSocket] No observer for state change");
        }
    }

    fn connect(&mut self) {
        if self.current.is_active() || self.reconnect_task.is_some() {
            debug!("[ChatSocket] connect() ignored in state {}", self.current);
            return;
        }

        if !self.is_network_available() {
            info!("[ChatSocket] No network path, not connecting");
            self.reconnection.reset();
            self.set_state(ConnectionState::Disconnected(Some(DisconnectReason::NoNetwork)));
            return;
        }

        self.open_socket();
    }

    fn open_socket(&mut self) {
        self.generation += 1;
        self.last_error = None;
        self.set_state(ConnectionState::Connecting);
        self.engine
            .connect(EngineEventSink::new(self.command_tx.clone(), self.generation));
    }

    /// Stop heartbeat and watchdog and forget the socket
    fn close_socket(&mut self) {
        self.heartbeat.suspend();
        self.pong.reset();
        if self.current.has_socket() {
            self.engine.disconnect(NORMAL_CLOSURE_CODE as u16);
        }
        // Whatever the old socket reports from now on is stale
        self.generation += 1;
    }

    fn disconnect(&mut self, source: DisconnectSource) {
        debug!("[ChatSocket] Disconnect requested ({:?})", source);

        self.reconnect_task = None;
        if source != DisconnectSource::SystemInitiated {
            self.background_task = None;
        }

        let had_session = self.current.is_active() || self.current.has_socket();
        if self.current.has_socket() {
            self.set_state(ConnectionState::Disconnecting);
        }
        self.close_socket();
        self.last_error = None;

        match source {
            DisconnectSource::UserInitiated | DisconnectSource::SystemInitiated => {
                self.reconnection.reset();
                if had_session {
                    self.set_state(ConnectionState::Disconnected(None));
                }
            }
            DisconnectSource::NoNetwork => {
                self.reconnection.reset();
                self.set_state(ConnectionState::Disconnected(Some(DisconnectReason::NoNetwork)));
            }
            DisconnectSource::NoPongReceived => {
                // Our own close code must not count as a terminal closure
                self.socket_closed(None, Some("no pong received".to_string()));
            }
        }
    }

    fn socket_closed(&mut self, code: Option<u16>, failure: Option<String>) {
        self.heartbeat.suspend();
        self.pong.reset();
        let last_error = self.last_error.take();

        match classify_disconnect(code, last_error.as_ref()) {
            DisconnectDisposition::Stop(reason) => {
                info!("[ChatSocket] Connection closed for good (code {:?})", code);
                self.reconnection.reset();
                self.set_state(ConnectionState::Disconnected(reason));
            }
            DisconnectDisposition::Retry => self.schedule_reconnect(failure),
        }
    }

    fn schedule_reconnect(&mut self, failure: Option<String>) {
        if self.reconnect_task.is_some() {
            debug!("[ChatSocket] Reconnect already scheduled");
            return;
        }

        if !self.is_network_available() {
            info!("[ChatSocket] No network path, parking until reachability returns");
            self.reconnection.reset();
            self.set_state(ConnectionState::Disconnected(Some(DisconnectReason::NoNetwork)));
            return;
        }

        if self.app_state == AppState::Background && !self.config.stays_connected_in_background {
            debug!("[ChatSocket] In background, deferring reconnect until foreground");
            self.disconnected_in_background = true;
            self.set_state(ConnectionState::Disconnected(failure.map(DisconnectReason::Transport)));
            return;
        }

        let attempt = self.reconnection.consecutive_failures();
        match self.reconnection.next_delay(self.strategy.as_ref()) {
            Some(delay) => {
                info!(
                    "[ChatSocket] Reconnecting in {:?} (attempt {})",
                    delay,
                    attempt + 1
                );
                self.set_state(ConnectionState::Reconnecting);
                self.reconnect_task = Some(ScheduledTask::after(
                    delay,
                    self.command_tx.clone(),
                    Command::ReconnectDue,
                ));
            }
            None => {
                let failure =
                    failure.unwrap_or_else(|| "reconnection attempts exhausted".to_string());
                error!("[ChatSocket] Giving up after {} attempts: {}", attempt, failure);
                self.reconnection.reset();
                self.set_state(ConnectionState::Disconnected(Some(DisconnectReason::Transport(
                    failure,
                ))));
            }
        }
    }

    fn reconnect_due(&mut self) {
        if self.reconnect_task.take().is_none() {
            debug!("[ChatSocket] Reconnect timer fired after cancellation");
            return;
        }

        if !self.is_network_available() {
            self.reconnection.reset();
            self.set_state(ConnectionState::Disconnected(Some(DisconnectReason::NoNetwork)));
            return;
        }

        self.metrics.increment_reconnects();
        self.open_socket();
    }

    fn engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Connected => {
                debug!("[ChatSocket] Handshake complete, waiting for health check");
            }
            EngineEvent::Message(message) => {
                self.metrics.increment_received();
                self.frame(message);
            }
            EngineEvent::Pong => self.pong.pong_received(),
            EngineEvent::Disconnected { code, error } => {
                if let Some(ref e) = error {
                    warn!("[ChatSocket] Socket dropped (code {:?}): {}", code, e);
                }
                self.socket_closed(code, error);
            }
        }
    }

    fn frame(&mut self, message: WsMessage) {
        let decoded = match self.decoder.decode(&message) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("[ChatSocket] Dropping malformed frame: {}", e);
                return;
            }
        };

        // Only the error preceding a close decides how it is classified
        if !matches!(decoded, DecodedFrame::ServerError(_)) {
            self.last_error = None;
        }

        match decoded {
            DecodedFrame::Pong => self.pong.pong_received(),
            DecodedFrame::ServerError(server_error) => {
                warn!("[ChatSocket] {}", server_error);
                self.last_error = Some(server_error);
            }
            DecodedFrame::HealthCheck {
                connection_id,
                user,
                event,
            } => {
                self.pong.pong_received();
                if self.current.is_connected() {
                    self.forward(event);
                    return;
                }

                self.reconnection.reset();
                self.set_state(ConnectionState::Connected {
                    connection_id,
                    user,
                });
                self.heartbeat
                    .resume(self.command_tx.clone(), Command::HeartbeatTick);
            }
            DecodedFrame::Event(event) => {
                if self.current.is_connected() {
                    self.forward(event);
                } else {
                    debug!(
                        "[ChatSocket] Dropping event received in state {}",
                        self.current
                    );
                }
            }
        }
    }

    fn forward(&self, event: D::Event) {
        if self.event_tx.send(ClientEvent::Event(event)).is_err() {
            debug!("[ChatSocket] No observer for event");
        }
    }

    fn heartbeat_tick(&mut self) {
        if !self.heartbeat.is_running() || !self.current.is_connected() {
            return;
        }

        debug!("[ChatSocket] Sending ping");
        self.engine.send_ping();
        self.metrics.increment_sent();
        self.pong
            .ping_sent(self.command_tx.clone(), Command::PongTimeout);
    }

    fn send(&mut self, message: WsMessage) {
        if !self.current.is_connected() {
            warn!("[ChatSocket] Dropping outbound frame, not connected");
            return;
        }
        self.engine.send(message);
        self.metrics.increment_sent();
    }

    fn app_state_changed(&mut self, app_state: AppState) {
        if self.app_state == app_state {
            return;
        }
        self.app_state = app_state;

        match app_state {
            AppState::Background => {
                if !self.current.is_active() {
                    return;
                }
                if self.config.stays_connected_in_background {
                    debug!(
                        "[ChatSocket] Backgrounded, staying connected for {:?}",
                        self.config.background_grace
                    );
                    self.background_task = Some(ScheduledTask::after(
                        self.config.background_grace,
                        self.command_tx.clone(),
                        Command::BackgroundExpired,
                    ));
                } else {
                    self.disconnected_in_background = true;
                    self.disconnect(DisconnectSource::SystemInitiated);
                }
            }
            AppState::Foreground => {
                self.background_task = None;
                if self.disconnected_in_background {
                    self.disconnected_in_background = false;
                    info!("[ChatSocket] Foregrounded, reconnecting");
                    self.connect();
                }
            }
        }
    }

    fn reachability_changed(&mut self, available: bool) {
        self.network_reported = available;

        if !available {
            if self.current.is_active() || self.current.has_socket() {
                info!("[ChatSocket] Network lost");
                self.disconnect(DisconnectSource::NoNetwork);
            }
            return;
        }

        if self.current.disconnect_reason() == Some(&DisconnectReason::NoNetwork)
            && self.is_network_available()
        {
            info!("[ChatSocket] Network back, reconnecting");
            self.connect();
        }
    }

    fn teardown(&mut self) {
        self.reconnect_task = None;
        self.background_task = None;
        let had_session = self.current.is_active() || self.current.has_socket();
        self.close_socket();
        if had_session {
            self.set_state(ConnectionState::Disconnected(None));
        }
    }
}
