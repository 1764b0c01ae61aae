use std::sync::Arc;

use serde_json::Value;

use crate::client::engine::Engine;
use crate::client::{ConnectionListener, ConnectionPhase};
use crate::config::ConnectOptions;
use crate::session::Session;
use crate::topics::{TopicListener, TopicSet};
use crate::transport::TransportFactory;
use crate::types::Result;

/// The main entry point: one client manages exactly one logical session
/// with a push server.
///
/// `PushClient` drives an abstract [`Transport`](crate::Transport) through
/// its lifecycle, fails over across the configured server list with
/// back-off, replays topic subscriptions after reconnection, and serializes
/// every outbound operation through a single-in-flight request queue.
///
/// Cloning is cheap and clones share the same session.
#[derive(Clone)]
pub struct PushClient {
    engine: Arc<Engine>,
}

impl PushClient {
    /// Creates an unconnected client. The factory resolves the transport
    /// variant once per `connect` (and again if a streaming session is
    /// demoted to polling).
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            engine: Engine::spawn(factory),
        }
    }

    /// Connects to the server described by `options`.
    ///
    /// Validation failures (empty server list, malformed endpoint URL)
    /// surface synchronously as
    /// [`PushError::Configuration`](crate::PushError::Configuration); all
    /// later transport trouble is handled by the reconnection loop and
    /// reported through connection listeners instead. Calling `connect`
    /// while already connecting or connected is a no-op.
    pub async fn connect(&self, options: ConnectOptions) -> Result<()> {
        self.engine.connect(options).await
    }

    /// Disconnects deliberately. Idempotent. Cancels every pending
    /// reconnect and confirmation timer, sends a best-effort disconnect
    /// notice and closes the transport. No automatic reconnection happens
    /// afterwards; a new `connect` call is required to resume.
    pub async fn disconnect(&self) {
        self.engine.disconnect().await
    }

    /// Subscribes to one topic or several.
    ///
    /// The listener is invoked with the topic name and decoded payload of
    /// each message published on a subscribed topic. Subscribing again to
    /// the same topic replaces the listener. Subscriptions survive
    /// reconnects: the engine replays them to the server every time the
    /// connection is re-established.
    pub async fn subscribe<T, F>(&self, topics: T, listener: F)
    where
        T: Into<TopicSet>,
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        let listener: TopicListener = Arc::new(listener);
        self.engine.subscribe(topics.into(), listener).await
    }

    /// Unsubscribes from one topic or several. Data that still arrives for
    /// an unsubscribed topic is silently dropped.
    pub async fn unsubscribe<T: Into<TopicSet>>(&self, topics: T) {
        self.engine.unsubscribe(topics.into()).await
    }

    /// Publishes a payload on a topic. The request is queued and sent in
    /// FIFO order with at most one request in flight; if the connection is
    /// down it waits until the session is re-established.
    pub async fn publish(&self, topic: impl Into<String>, payload: impl Into<String>) {
        self.engine.publish(topic.into(), payload.into()).await
    }

    /// Adds a listener notified on connection established/lost edges.
    pub async fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) {
        self.engine.add_connection_listener(listener).await
    }

    pub async fn phase(&self) -> ConnectionPhase {
        self.engine.phase().await
    }

    pub async fn is_connected(&self) -> bool {
        self.engine.phase().await == ConnectionPhase::Connected
    }

    /// The current session identity, if `connect` has been called.
    pub async fn session(&self) -> Option<Session> {
        self.engine.session().await
    }
}
