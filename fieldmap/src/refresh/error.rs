//! Error types for overlay fetching.

use thiserror::Error;

/// Errors that can occur while pulling overlay lists from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The backend rejected our credentials.
    #[error("Not authorized (HTTP {0})")]
    Unauthorized(u16),

    /// The backend answered with a non-success status.
    #[error("Unexpected HTTP status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    /// The request could not be sent or the connection failed.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The request did not finish in time.
    #[error("Request timed out")]
    Timeout,

    /// The body was not a JSON array.
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// The HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Returns true for errors that will not go away without user action.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
