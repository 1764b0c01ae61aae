use serde::Deserialize;

use crate::types::constants::{
    DEFAULT_BACK_OFF_MULTIPLIER, DEFAULT_INITIAL_RECONNECT_DELAY_MILLIS,
    DEFAULT_POLL_INTERVAL_MILLIS, UNBOUNDED,
};
use crate::types::{PushError, Result};

/// The transport variant a session prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Long-lived receive channel plus short-lived request channel
    Streaming,
    /// Periodic short-lived request/response cycles
    Polling,
    /// Bidirectional persistent channel
    Socket,
}

/// How the next server is picked from the list after a connection loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailoverAlgorithm {
    /// Round-robin walk from the current server down the list
    Ordered,
    /// Uniformly random pick over the whole list
    Random,
    /// Like ordered, but the walk restarts from the top server every time
    /// the connection is re-established
    Priority,
}

/// Configuration accepted by [`connect`](crate::PushClient::connect).
///
/// Field names deserialize from the camelCase keys of the wire config
/// (`serverList`, `failoverAlgorithm`, ...), so a JSON config document can be
/// fed straight in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectOptions {
    /// Server endpoints to connect to, in failover order. Required, non-empty.
    pub server_list: Vec<String>,
    pub failover_algorithm: FailoverAlgorithm,
    /// How long to wait before the first reconnect attempt (ms)
    pub initial_reconnect_delay_millis: u64,
    /// Upper bound on the delay between reconnect attempts; -1 = unbounded
    pub max_reconnect_delay_millis: i64,
    /// Maximum number of reconnect attempts; -1 = unbounded
    pub max_reconnect_attempts: i64,
    pub use_exponential_back_off: bool,
    pub back_off_multiplier: f64,
    pub connection_type: ConnectionType,
    /// Use a static session uid instead of a generated one
    pub static_uid: Option<String>,
    /// Polling-mode request cadence (ms)
    pub poll_interval_millis: u64,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            server_list: Vec::new(),
            failover_algorithm: FailoverAlgorithm::Ordered,
            initial_reconnect_delay_millis: DEFAULT_INITIAL_RECONNECT_DELAY_MILLIS,
            max_reconnect_delay_millis: UNBOUNDED,
            max_reconnect_attempts: UNBOUNDED,
            use_exponential_back_off: false,
            back_off_multiplier: DEFAULT_BACK_OFF_MULTIPLIER,
            connection_type: ConnectionType::Streaming,
            static_uid: None,
            poll_interval_millis: DEFAULT_POLL_INTERVAL_MILLIS,
        }
    }
}

impl ConnectOptions {
    /// Shorthand for connecting to a single server with defaults, mirroring
    /// the plain-URL form of the wire config.
    pub fn server(url: impl Into<String>) -> Self {
        Self {
            server_list: vec![url.into()],
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_list.is_empty() {
            return Err(PushError::Configuration(
                "server list must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectOptions::default();
        assert_eq!(options.failover_algorithm, FailoverAlgorithm::Ordered);
        assert_eq!(options.initial_reconnect_delay_millis, 1000);
        assert_eq!(options.max_reconnect_delay_millis, -1);
        assert_eq!(options.max_reconnect_attempts, -1);
        assert!(!options.use_exponential_back_off);
        assert_eq!(options.back_off_multiplier, 1.0);
        assert_eq!(options.connection_type, ConnectionType::Streaming);
        assert_eq!(options.poll_interval_millis, 1000);
    }

    #[test]
    fn test_empty_server_list_is_rejected() {
        let options = ConnectOptions::default();
        assert!(matches!(
            options.validate(),
            Err(PushError::Configuration(_))
        ));
    }

    #[test]
    fn test_deserializes_camel_case_config() {
        let options: ConnectOptions = serde_json::from_str(
            r#"{
                "serverList": ["http://primary.example.com/", "http://backup.example.com/"],
                "failoverAlgorithm": "priority",
                "initialReconnectDelayMillis": 500,
                "maxReconnectDelayMillis": 30000,
                "maxReconnectAttempts": 10,
                "useExponentialBackOff": true,
                "backOffMultiplier": 2,
                "connectionType": "polling"
            }"#,
        )
        .unwrap();
        assert_eq!(options.server_list.len(), 2);
        assert_eq!(options.failover_algorithm, FailoverAlgorithm::Priority);
        assert_eq!(options.initial_reconnect_delay_millis, 500);
        assert_eq!(options.max_reconnect_delay_millis, 30000);
        assert_eq!(options.max_reconnect_attempts, 10);
        assert!(options.use_exponential_back_off);
        assert_eq!(options.back_off_multiplier, 2.0);
        assert_eq!(options.connection_type, ConnectionType::Polling);
    }

    #[test]
    fn test_server_shorthand() {
        let options = ConnectOptions::server("http://localhost:7979/");
        assert_eq!(options.server_list, vec!["http://localhost:7979/"]);
        assert!(options.validate().is_ok());
    }
}
