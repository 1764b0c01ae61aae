//! # PushHub
//!
//! A client-side connection engine for topic-based push servers. The crate
//! owns everything between the application and the wire: server failover,
//! reconnection with back-off, streaming-to-polling fallback, subscription
//! replay and an ordered single-in-flight request queue. The wire itself is
//! pluggable through the [`Transport`] trait.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio::sync::mpsc;
//! use url::Url;
//! use pushhub::{
//!     ConnectOptions, ConnectionType, PushClient, RequestDescriptor, Session,
//!     Transport, TransportEvent, TransportFactory,
//! };
//!
//! struct MyTransport {
//!     events: mpsc::UnboundedSender<TransportEvent>,
//! }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn open(&self, endpoint: &Url, session: &Session) -> pushhub::Result<()> {
//!         // Open the physical channel, then report progress through
//!         // `self.events` (ChannelOpen, ChannelConfirmed, Data, ...).
//!         Ok(())
//!     }
//!
//!     async fn send(&self, request: &RequestDescriptor) -> pushhub::Result<()> {
//!         // Issue `request.url` on the wire; emit RequestCompleted with the
//!         // response body once it lands.
//!         Ok(())
//!     }
//!
//!     async fn close(&self) {}
//! }
//!
//! struct MyFactory;
//!
//! impl TransportFactory for MyFactory {
//!     fn create(
//!         &self,
//!         _connection_type: ConnectionType,
//!         events: mpsc::UnboundedSender<TransportEvent>,
//!     ) -> Arc<dyn Transport> {
//!         Arc::new(MyTransport { events })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PushClient::new(Arc::new(MyFactory));
//!     client
//!         .subscribe("Prices", |topic, payload| {
//!             println!("{}: {}", topic, payload);
//!         })
//!         .await;
//!     client
//!         .connect(ConnectOptions::server("http://push.example.com/"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod failover;
pub mod infrastructure;
pub mod queue;
pub mod session;
pub mod topics;
pub mod transport;
pub mod types;

pub use client::{ConnectionListener, ConnectionPhase, PushClient};
pub use config::{ConnectOptions, ConnectionType, FailoverAlgorithm};
pub use session::Session;
pub use topics::TopicSet;
pub use transport::{
    RequestDescriptor, RequestKind, Transport, TransportEvent, TransportFactory,
};
pub use types::{PushError, Result, TopicMessage};
