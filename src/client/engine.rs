use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use crate::backoff::ReconnectState;
use crate::client::ConnectionListener;
use crate::config::{ConnectOptions, ConnectionType};
use crate::failover::ServerList;
use crate::infrastructure::TaskManager;
use crate::queue::{PendingRequest, RequestQueue};
use crate::session::Session;
use crate::topics::{TopicListener, TopicRegistry, TopicSet};
use crate::transport::{
    RequestKind, RequestUrls, Transport, TransportEvent, TransportFactory,
};
use crate::types::constants::{
    INITIAL_CONFIRMATION_TIMEOUT_MILLIS, REQUEST_RETRY_DELAY_MILLIS,
};
use crate::types::{Result, TopicMessage};

/// The engine-wide connection lifecycle phase. Exactly one value at a time;
/// transitions drive all side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    /// Physical channel open, waiting for the application-level
    /// confirmation that data flows end to end.
    AwaitingInitialConfirmation,
    Connected,
    Lost,
    Reconnecting,
    /// Entered by `disconnect()`; no automatic transitions leave it.
    DeliberatelyDisconnected,
}

/// Everything the engine reacts to, funnelled through one channel so state
/// transitions never run concurrently with each other.
#[derive(Debug)]
pub(crate) enum EngineEvent {
    Transport(TransportEvent),
    /// The streaming variant failed to confirm in time; demote to polling.
    ConfirmationTimeout { epoch: u64 },
    ReconnectTimer { epoch: u64 },
    /// Re-attempt dispatch after a synchronous send failure.
    RetryDispatch,
    /// Polling-mode cadence tick.
    PollTick,
    /// A message recovered from a poll response body.
    Inbound(TopicMessage),
}

struct EngineState {
    phase: ConnectionPhase,
    options: ConnectOptions,
    session: Option<Session>,
    servers: Option<ServerList>,
    urls: Option<RequestUrls>,
    current_endpoint: Option<Url>,
    reconnect: ReconnectState,
    topics: TopicRegistry,
    queue: RequestQueue,
    listeners: Vec<Arc<dyn ConnectionListener>>,
    transport: Option<Arc<dyn Transport>>,
    /// Forwards the active transport's events into the engine channel.
    /// Aborted when the transport is replaced, so a zombie transport can
    /// never feed events into a newer connection.
    transport_pump: Option<JoinHandle<()>>,
    tasks: TaskManager,
    /// Bumped to invalidate every armed timer; a timer firing with a stale
    /// epoch is a guaranteed no-op.
    epoch: u64,
    reconnect_timer_armed: bool,
    /// The streaming-to-polling fallback fires at most once per session.
    confirmation_monitor_used: bool,
    deliberate_disconnect: bool,
}

impl EngineState {
    fn new() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            options: ConnectOptions::default(),
            session: None,
            servers: None,
            urls: None,
            current_endpoint: None,
            reconnect: ReconnectState::from_options(&ConnectOptions::default()),
            topics: TopicRegistry::new(),
            queue: RequestQueue::new(),
            listeners: Vec::new(),
            transport: None,
            transport_pump: None,
            tasks: TaskManager::new(),
            epoch: 0,
            reconnect_timer_armed: false,
            confirmation_monitor_used: false,
            deliberate_disconnect: false,
        }
    }
}

/// The connection & reconnection engine: owns the failover walk, back-off
/// state, topic registry and request queue, and drives the transport
/// through its lifecycle.
pub(crate) struct Engine {
    factory: Arc<dyn TransportFactory>,
    state: RwLock<EngineState>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl Engine {
    /// Creates the engine and spawns its event loop. The loop holds only a
    /// weak handle, so dropping the last client tears everything down.
    pub(crate) fn spawn(factory: Arc<dyn TransportFactory>) -> Arc<Self> {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            factory,
            state: RwLock::new(EngineState::new()),
            events_tx,
        });
        let weak = Arc::downgrade(&engine);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(engine) = weak.upgrade() else { break };
                engine.handle_event(event).await;
            }
            tracing::debug!("engine event loop finished");
        });
        engine
    }

    pub(crate) async fn phase(&self) -> ConnectionPhase {
        self.state.read().await.phase
    }

    pub(crate) async fn session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub(crate) async fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) {
        self.state.write().await.listeners.push(listener);
    }

    pub(crate) async fn connect(&self, options: ConnectOptions) -> Result<()> {
        options.validate()?;
        let servers = ServerList::new(&options.server_list, options.failover_algorithm)?;

        let mut guard = self.state.write().await;
        let st = &mut *guard;
        match st.phase {
            ConnectionPhase::Connecting
            | ConnectionPhase::AwaitingInitialConfirmation
            | ConnectionPhase::Connected => {
                tracing::debug!("connect called while already {:?}", st.phase);
                return Ok(());
            }
            _ => {}
        }

        let endpoint = servers.initial().clone();
        let session = Session::new(
            options.static_uid.clone(),
            &endpoint,
            options.connection_type,
        );
        tracing::info!(uid = %session.uid, "connecting to {}", endpoint);

        st.epoch += 1;
        st.tasks.abort_all();
        st.reconnect = ReconnectState::from_options(&options);
        st.reconnect_timer_armed = false;
        st.confirmation_monitor_used = false;
        st.deliberate_disconnect = false;
        st.session = Some(session);
        st.servers = Some(servers);
        st.options = options;
        self.open_endpoint(st, endpoint).await;
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        if matches!(
            st.phase,
            ConnectionPhase::Idle | ConnectionPhase::DeliberatelyDisconnected
        ) {
            return;
        }
        tracing::info!("disconnecting");

        st.deliberate_disconnect = true;
        st.epoch += 1;
        st.reconnect_timer_armed = false;
        st.tasks.abort_all();
        if let Some(pump) = st.transport_pump.take() {
            pump.abort();
        }
        st.queue.clear();
        st.phase = ConnectionPhase::DeliberatelyDisconnected;

        let transport = st.transport.take();
        let notice = st
            .urls
            .as_ref()
            .and_then(|urls| urls.resolve(RequestKind::Disconnect, "disconnect", None).ok());
        drop(guard);

        if let Some(transport) = transport {
            if let Some(descriptor) = notice {
                if let Err(e) = transport.send(&descriptor).await {
                    tracing::debug!("best-effort disconnect notice failed: {}", e);
                }
            }
            transport.close().await;
        }
    }

    pub(crate) async fn subscribe(&self, topics: TopicSet, listener: TopicListener) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        st.topics.subscribe(&topics, listener);
        // Not connected yet: the registry entry is enough, the subscription
        // is replayed to the server on the next entry into Connected.
        if st.phase == ConnectionPhase::Connected {
            let list = topics.to_wire_list();
            if !list.is_empty() {
                self.enqueue_topic_request(st, RequestKind::Subscribe, list);
                self.drain_queue(st).await;
            }
        }
    }

    pub(crate) async fn unsubscribe(&self, topics: TopicSet) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        st.topics.unsubscribe(&topics);
        if st.phase == ConnectionPhase::Connected {
            let list = topics.to_wire_list();
            if !list.is_empty() {
                self.enqueue_topic_request(st, RequestKind::Unsubscribe, list);
                self.drain_queue(st).await;
            }
        }
    }

    pub(crate) async fn publish(&self, topic: String, payload: String) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        st.queue.enqueue(PendingRequest {
            kind: RequestKind::Publish,
            topic,
            payload: Some(payload),
            on_complete: Box::new(|topic, raw| {
                tracing::debug!("publish response for '{}': {}", topic, raw);
            }),
        });
        self.drain_queue(st).await;
    }

    async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Transport(TransportEvent::ChannelOpen) => self.on_channel_open().await,
            EngineEvent::Transport(TransportEvent::ChannelConfirmed) => {
                self.on_channel_confirmed().await
            }
            EngineEvent::Transport(TransportEvent::Data { topic, payload }) => {
                self.dispatch_inbound(&topic, &payload).await
            }
            EngineEvent::Transport(TransportEvent::ChannelLost) => self.on_channel_lost().await,
            EngineEvent::Transport(TransportEvent::RequestCompleted { raw }) => {
                self.on_request_completed(raw).await
            }
            EngineEvent::ConfirmationTimeout { epoch } => {
                self.on_confirmation_timeout(epoch).await
            }
            EngineEvent::ReconnectTimer { epoch } => self.on_reconnect_timer(epoch).await,
            EngineEvent::RetryDispatch => {
                let mut guard = self.state.write().await;
                self.drain_queue(&mut *guard).await;
            }
            EngineEvent::PollTick => self.on_poll_tick().await,
            EngineEvent::Inbound(message) => {
                self.dispatch_inbound(&message.topic, &message.payload).await
            }
        }
    }

    async fn on_channel_open(&self) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        if st.phase != ConnectionPhase::Connecting {
            tracing::debug!("channel open in phase {:?}, ignoring", st.phase);
            return;
        }
        st.phase = ConnectionPhase::AwaitingInitialConfirmation;

        let streaming = matches!(
            st.session.as_ref().map(|s| s.connection_type),
            Some(ConnectionType::Streaming)
        );
        if streaming && !st.confirmation_monitor_used {
            st.confirmation_monitor_used = true;
            let epoch = st.epoch;
            self.arm_timer(
                st,
                Duration::from_millis(INITIAL_CONFIRMATION_TIMEOUT_MILLIS),
                EngineEvent::ConfirmationTimeout { epoch },
            );
        }
    }

    async fn on_channel_confirmed(&self) {
        let listeners;
        {
            let mut guard = self.state.write().await;
            let st = &mut *guard;
            match st.phase {
                ConnectionPhase::Connected => {
                    tracing::debug!("duplicate channel confirmation, ignoring");
                    return;
                }
                ConnectionPhase::Idle | ConnectionPhase::DeliberatelyDisconnected => return,
                _ => {}
            }

            // Cancels the initial-confirmation timer and any pending
            // reconnect timer.
            st.epoch += 1;
            st.reconnect_timer_armed = false;
            st.phase = ConnectionPhase::Connected;
            st.reconnect.reset();
            if let Some(servers) = st.servers.as_mut() {
                servers.reset_walk();
            }
            tracing::info!("connection established");

            // Replay the registry so no subscription is lost across
            // reconnects.
            let topics = st.topics.topics();
            if !topics.is_empty() {
                self.enqueue_topic_request(st, RequestKind::Subscribe, topics.to_wire_list());
            }

            if matches!(
                st.session.as_ref().map(|s| s.connection_type),
                Some(ConnectionType::Polling)
            ) {
                self.start_polling(st);
            }

            self.drain_queue(st).await;
            listeners = st.listeners.clone();
        }
        for listener in listeners {
            listener.on_connection_established();
        }
    }

    async fn on_channel_lost(&self) {
        let notified;
        {
            let mut guard = self.state.write().await;
            let st = &mut *guard;
            match st.phase {
                ConnectionPhase::Connected => {
                    tracing::warn!("lost connection to server");
                    st.phase = ConnectionPhase::Lost;
                    st.tasks.abort_all();
                    // The in-flight request died with the channel; keep it
                    // queued for redispatch after reconnection.
                    st.queue.release_head();
                    self.schedule_reconnect(st);
                    notified = Some(st.listeners.clone());
                }
                ConnectionPhase::Connecting | ConnectionPhase::AwaitingInitialConfirmation => {
                    tracing::debug!("connection attempt failed");
                    st.queue.release_head();
                    self.schedule_reconnect(st);
                    notified = None;
                }
                _ => notified = None,
            }
        }
        if let Some(listeners) = notified {
            for listener in listeners {
                listener.on_connection_lost();
            }
        }
    }

    async fn on_request_completed(&self, raw: String) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        match st.queue.complete_head() {
            Some(request) => {
                (request.on_complete)(&request.topic, &raw);
                self.drain_queue(st).await;
            }
            None => tracing::debug!("request completion with nothing in flight"),
        }
    }

    async fn on_confirmation_timeout(&self, epoch: u64) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        if epoch != st.epoch {
            return;
        }
        if !matches!(
            st.phase,
            ConnectionPhase::Connecting | ConnectionPhase::AwaitingInitialConfirmation
        ) {
            return;
        }
        let streaming = match st.session.as_mut() {
            Some(session) if session.connection_type == ConnectionType::Streaming => {
                // One-way downgrade; streaming is never re-probed.
                session.connection_type = ConnectionType::Polling;
                true
            }
            _ => false,
        };
        if !streaming {
            return;
        }
        tracing::warn!(
            "no end-to-end confirmation within {}ms, falling back to polling connection",
            INITIAL_CONFIRMATION_TIMEOUT_MILLIS
        );
        // The epoch bump invalidates any pending reconnect timer, so the
        // armed flag must drop with it or the reconnect loop stays blocked.
        st.epoch += 1;
        st.reconnect_timer_armed = false;
        if let Some(endpoint) = st.current_endpoint.clone() {
            self.open_endpoint(st, endpoint).await;
        }
    }

    async fn on_reconnect_timer(&self, epoch: u64) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        if epoch != st.epoch {
            tracing::debug!("stale reconnect timer, ignoring");
            return;
        }
        st.reconnect_timer_armed = false;
        // The state may have changed during the wait; re-check the guard.
        if st.deliberate_disconnect || st.phase == ConnectionPhase::Connected {
            return;
        }
        if st.reconnect.budget_exhausted() {
            st.phase = ConnectionPhase::Lost;
            return;
        }
        st.reconnect.record_attempt();
        let Some(endpoint) = st.servers.as_mut().map(|servers| servers.pick_next()) else {
            return;
        };
        tracing::info!(
            "reconnecting (attempt {}), trying {}",
            st.reconnect.attempts(),
            endpoint
        );
        self.open_endpoint(st, endpoint).await;
        // Liveness loop: keep an attempt armed until a confirmation cancels
        // it, so a connect that silently stalls is retried too.
        self.schedule_reconnect(st);
    }

    async fn on_poll_tick(&self) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        if st.phase != ConnectionPhase::Connected {
            return;
        }
        if !matches!(
            st.session.as_ref().map(|s| s.connection_type),
            Some(ConnectionType::Polling)
        ) {
            return;
        }
        let events_tx = self.events_tx.clone();
        st.queue.enqueue(PendingRequest {
            kind: RequestKind::Poll,
            topic: "poll".to_string(),
            payload: None,
            on_complete: Box::new(move |_, raw| match TopicMessage::parse_batch(raw) {
                Ok(messages) => {
                    for message in messages {
                        let _ = events_tx.send(EngineEvent::Inbound(message));
                    }
                }
                Err(e) => tracing::error!("undecodable poll response: {}", e),
            }),
        });
        self.drain_queue(st).await;
    }

    async fn dispatch_inbound(&self, topic: &str, payload: &serde_json::Value) {
        // Snapshot the listener so user code never runs under the state
        // lock.
        let listener = self.state.read().await.topics.listener_for(topic);
        match listener {
            Some(listener) => listener(topic, payload),
            None => tracing::debug!("no listener for topic '{}', dropping message", topic),
        }
    }

    /// Opens a fresh transport towards `endpoint`, replacing any previous
    /// one.
    async fn open_endpoint(&self, st: &mut EngineState, endpoint: Url) {
        let Some(session) = st.session.clone() else {
            return;
        };
        if let Some(old) = st.transport.take() {
            old.close().await;
        }
        let transport = self.new_transport(st, session.connection_type);
        st.urls = Some(RequestUrls::new(&endpoint, &session));
        st.current_endpoint = Some(endpoint.clone());
        st.phase = ConnectionPhase::Connecting;
        st.transport = Some(Arc::clone(&transport));
        if let Err(e) = transport.open(&endpoint, &session).await {
            tracing::warn!("failed to open transport to {}: {}", endpoint, e);
            self.schedule_reconnect(st);
        }
    }

    /// Creates a transport with a dedicated event channel pumped into the
    /// engine loop. Replacing the pump cuts the previous transport off.
    fn new_transport(
        &self,
        st: &mut EngineState,
        connection_type: ConnectionType,
    ) -> Arc<dyn Transport> {
        if let Some(pump) = st.transport_pump.take() {
            pump.abort();
        }
        let (transport_tx, mut transport_rx) = mpsc::unbounded_channel();
        let engine_tx = self.events_tx.clone();
        st.transport_pump = Some(tokio::spawn(async move {
            while let Some(event) = transport_rx.recv().await {
                if engine_tx.send(EngineEvent::Transport(event)).is_err() {
                    break;
                }
            }
        }));
        self.factory.create(connection_type, transport_tx)
    }

    /// Arms the next reconnect attempt, if the guard allows one.
    fn schedule_reconnect(&self, st: &mut EngineState) {
        if st.deliberate_disconnect
            || st.phase == ConnectionPhase::Connected
            || st.reconnect_timer_armed
        {
            return;
        }
        if st.reconnect.budget_exhausted() {
            tracing::warn!(
                "reconnect budget exhausted after {} attempts, staying disconnected",
                st.reconnect.attempts()
            );
            st.phase = ConnectionPhase::Lost;
            return;
        }
        let delay = st.reconnect.next_delay();
        tracing::info!("attempting reconnect in {}ms", delay.as_millis());
        if st.phase == ConnectionPhase::Lost {
            st.phase = ConnectionPhase::Reconnecting;
        }
        st.reconnect_timer_armed = true;
        let epoch = st.epoch;
        self.arm_timer(st, delay, EngineEvent::ReconnectTimer { epoch });
    }

    /// Dispatches the queue head when the logical channel is ready and
    /// nothing is in flight. A synchronous send failure releases the head
    /// and retries after a fixed delay; the request is never dropped.
    async fn drain_queue(&self, st: &mut EngineState) {
        if st.phase != ConnectionPhase::Connected {
            return;
        }
        let Some(transport) = st.transport.clone() else {
            return;
        };
        let Some(urls) = st.urls.clone() else {
            return;
        };
        loop {
            let Some((kind, topic, payload)) = st.queue.claim_head() else {
                break;
            };
            let descriptor = match urls.resolve(kind, &topic, payload.as_deref()) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    tracing::error!("failed to resolve request URL, dropping request: {}", e);
                    st.queue.complete_head();
                    continue;
                }
            };
            tracing::debug!("dispatching {:?} request to {}", kind, descriptor.url);
            match transport.send(&descriptor).await {
                // In flight now; the completion event resumes the drain.
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(
                        "request dispatch failed: {}, retrying in {}ms",
                        e,
                        REQUEST_RETRY_DELAY_MILLIS
                    );
                    st.queue.release_head();
                    let events_tx = self.events_tx.clone();
                    st.tasks.spawn(async move {
                        tokio::time::sleep(Duration::from_millis(REQUEST_RETRY_DELAY_MILLIS))
                            .await;
                        let _ = events_tx.send(EngineEvent::RetryDispatch);
                    });
                    break;
                }
            }
        }
    }

    fn enqueue_topic_request(&self, st: &mut EngineState, kind: RequestKind, topic_list: String) {
        st.queue.enqueue(PendingRequest {
            kind,
            topic: topic_list,
            payload: None,
            on_complete: Box::new(move |topic, raw| {
                tracing::debug!("{:?} response for '{}': {}", kind, topic, raw);
            }),
        });
    }

    fn start_polling(&self, st: &mut EngineState) {
        let events_tx = self.events_tx.clone();
        let interval_millis = st.options.poll_interval_millis;
        tracing::info!("starting polling every {}ms", interval_millis);
        st.tasks.spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(interval_millis.max(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; the cadence starts one
            // interval after connect.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if events_tx.send(EngineEvent::PollTick).is_err() {
                    break;
                }
            }
        });
    }

    fn arm_timer(&self, st: &mut EngineState, delay: Duration, event: EngineEvent) {
        let events_tx = self.events_tx.clone();
        st.tasks.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events_tx.send(event);
        });
    }
}
