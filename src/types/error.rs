use thiserror::Error;

/// Errors that can occur when using the push client.
#[derive(Error, Debug)]
pub enum PushError {
    /// Invalid configuration (empty server list, unparsable endpoint).
    /// Surfaced synchronously from `connect`.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Synchronous failure dispatching a request to the transport.
    /// Recovered internally by the request queue's fixed-delay retry.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// A dead channel, for transport implementations to return from `open`
    /// or `send`. The engine itself signals loss through
    /// `TransportEvent::ChannelLost` and recovers via the reconnection
    /// loop, so this variant is never constructed inside the crate.
    #[error("channel lost")]
    ChannelLost,

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Convenience type alias for `Result<T, PushError>`.
pub type Result<T> = std::result::Result<T, PushError>;
