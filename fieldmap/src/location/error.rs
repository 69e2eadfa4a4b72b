//! Error types for location acquisition.

use thiserror::Error;

/// Reasons a location request can fail.
///
/// Each variant maps to a distinct status message for the host's indicator
/// UI. None of them is fatal: the engine keeps showing the default center.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user or platform refused access to the location sensor.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The sensor could not produce a position.
    #[error("Position unavailable")]
    PositionUnavailable,

    /// No position arrived before the request timeout.
    #[error("Location request timed out")]
    Timeout,
}

impl LocationError {
    /// User-facing status string for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location access denied. Enable location permissions to center the map on you."
            }
            Self::PositionUnavailable => {
                "Your location is currently unavailable. Showing the default area."
            }
            Self::Timeout => "Finding your location took too long. Try again.",
        }
    }
}
