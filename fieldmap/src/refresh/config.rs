//! Configuration for periodic overlay refresh.

use std::time::Duration;

/// Default refresh interval (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Default per-request HTTP timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Configuration for the refresh scheduler and its HTTP source.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshConfig {
    /// Time between scheduled fetches.
    pub interval: Duration,

    /// Backend base URL.
    pub api_url: String,

    /// Bearer token sent with every request.
    pub api_token: Option<String>,

    /// HTTP timeout per list request.
    pub request_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl RefreshConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}
