/// Sentinel for "no bound" on reconnect delay and attempt budgets.
pub const UNBOUNDED: i64 = -1;

/// Default delay before the first reconnect attempt (milliseconds)
pub const DEFAULT_INITIAL_RECONNECT_DELAY_MILLIS: u64 = 1000;

/// Default exponential back-off multiplier
pub const DEFAULT_BACK_OFF_MULTIPLIER: f64 = 1.0;

/// Default polling-mode request cadence (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 1000;

/// How long a streaming connection gets to confirm end-to-end delivery
/// before the session is demoted to polling (milliseconds)
pub const INITIAL_CONFIRMATION_TIMEOUT_MILLIS: u64 = 2000;

/// Delay before retrying a request whose dispatch failed (milliseconds)
pub const REQUEST_RETRY_DELAY_MILLIS: u64 = 1000;

/// Wire paths for the request/response endpoints (magic strings layer)
pub mod endpoints {
    pub const SUBSCRIBE: &str = "subscribe/";
    pub const UNSUBSCRIBE: &str = "unsubscribe/";
    pub const PUBLISH: &str = "publish/";
    pub const POLL: &str = "poll/";
    pub const DISCONNECT: &str = "disconnect/";
}
