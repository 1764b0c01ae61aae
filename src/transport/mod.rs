//! The abstract channel mechanism the engine drives.
//!
//! The engine never assumes any particular wire mechanism; it consumes this
//! capability and reacts to the events the transport pushes back. Physical
//! implementations (streaming HTTP, polling cycles, sockets) live outside
//! this crate.

pub mod descriptor;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use crate::config::ConnectionType;
use crate::session::Session;
use crate::types::Result;

pub use descriptor::{RequestDescriptor, RequestKind, RequestUrls};

/// Events a transport delivers to the engine.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The physical channel is open (socket connected, stream established).
    ChannelOpen,
    /// Application-level confirmation that the channel delivers end to end.
    /// Distinct from the raw channel opening.
    ChannelConfirmed,
    /// Inbound data for a topic.
    Data { topic: String, payload: Value },
    /// The transport detected that its channel is gone.
    ChannelLost,
    /// The in-flight request's response arrived.
    RequestCompleted { raw: String },
}

/// One logical channel to a server.
///
/// Implementations report asynchronous activity through the
/// [`TransportEvent`] sender handed to their factory; these methods only
/// cover the engine-initiated half of the conversation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the channel towards `endpoint` for the given session.
    async fn open(&self, endpoint: &Url, session: &Session) -> Result<()>;

    /// Dispatches one request. A synchronous `Err` here is retried by the
    /// engine's request queue; an application-level failure arrives later as
    /// a [`TransportEvent::RequestCompleted`] response.
    async fn send(&self, request: &RequestDescriptor) -> Result<()>;

    /// Closes the channel. Best effort; must not fail loudly.
    async fn close(&self);
}

/// Creates the transport variant for a connection type, resolved once per
/// (re)configuration: at `connect` time and again if the session is demoted
/// from streaming to polling.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        connection_type: ConnectionType,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Arc<dyn Transport>;
}
