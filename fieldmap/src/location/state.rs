//! Core state types for location acquisition.
//!
//! - [`Fix`] - One timestamped position reading with an accuracy radius
//! - [`Provenance`] - Which acquisition phase produced the fix
//! - [`FixQuality`] - Coarse good/poor banding for status display
//! - [`SensorState`] - The state machine's externally visible state

use std::fmt;

use chrono::{DateTime, Utc};

use super::error::LocationError;
use crate::geo::GeoPoint;

/// Accuracy at or below which a fix is reported as [`FixQuality::Good`].
pub const DEFAULT_GOOD_ACCURACY_M: f64 = 100.0;

/// Which acquisition phase produced a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provenance {
    /// From the initial single-shot request.
    #[default]
    Coarse,
    /// From the continuous watch that refines a coarse fix.
    Refined,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coarse => write!(f, "Coarse"),
            Self::Refined => write!(f, "Refined"),
        }
    }
}

/// Coarse quality band of a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixQuality {
    /// Accuracy within the "good" threshold.
    Good,
    /// Accuracy worse than the "good" threshold.
    Poor,
}

impl fmt::Display for FixQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Poor => write!(f, "Poor"),
        }
    }
}

/// A single position reading.
///
/// Within one acquisition episode a newer fix replaces the previous one
/// outright; fixes are never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Measured position.
    pub position: GeoPoint,

    /// Accuracy radius in meters (lower is better).
    pub accuracy_m: f64,

    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,

    /// Which acquisition phase produced this fix.
    pub provenance: Provenance,
}

impl Fix {
    /// Create a coarse fix.
    pub fn new(position: GeoPoint, accuracy_m: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            accuracy_m,
            timestamp,
            provenance: Provenance::Coarse,
        }
    }

    /// Create a coarse fix stamped with the current time.
    pub fn now(position: GeoPoint, accuracy_m: f64) -> Self {
        Self::new(position, accuracy_m, Utc::now())
    }

    /// Returns the fix tagged with a different provenance.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Returns true if position and accuracy are usable.
    pub fn is_valid(&self) -> bool {
        self.position.is_valid() && self.accuracy_m.is_finite() && self.accuracy_m >= 0.0
    }

    /// Quality band against the given "good" threshold.
    pub fn quality(&self, good_accuracy_m: f64) -> FixQuality {
        if self.accuracy_m <= good_accuracy_m {
            FixQuality::Good
        } else {
            FixQuality::Poor
        }
    }
}

/// State of the location sensor.
///
/// ```text
/// Idle → Acquiring → Settled
///                  → Refining → Settled
///                  → Failed
/// ```
///
/// `retry()` re-enters `Acquiring` from any state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SensorState {
    /// No acquisition has been requested.
    #[default]
    Idle,
    /// Waiting for the single-shot request.
    Acquiring,
    /// Watching for a better reading than `baseline`.
    Refining {
        /// The single-shot fix that is kept if no better reading arrives.
        baseline: Fix,
    },
    /// Terminal success for the episode.
    Settled(Fix),
    /// Terminal failure for the episode.
    Failed(LocationError),
}

impl SensorState {
    /// The settled fix, if the episode ended successfully.
    pub fn settled_fix(&self) -> Option<&Fix> {
        match self {
            Self::Settled(fix) => Some(fix),
            _ => None,
        }
    }

    /// The error, if the episode failed.
    pub fn error(&self) -> Option<&LocationError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Returns true for `Settled` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled(_) | Self::Failed(_))
    }

    /// Short name of the state for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Refining { .. } => "refining",
            Self::Settled(_) => "settled",
            Self::Failed(_) => "failed",
        }
    }

    /// User-facing status line for the host's location indicator.
    pub fn status_message(&self) -> String {
        match self {
            Self::Idle => "Location not requested".to_string(),
            Self::Acquiring => "Finding your location...".to_string(),
            Self::Refining { baseline } => format!(
                "Improving location accuracy (currently ±{:.0} m)...",
                baseline.accuracy_m
            ),
            Self::Settled(fix) => format!("Location found (±{:.0} m)", fix.accuracy_m),
            Self::Failed(error) => error.user_message().to_string(),
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(accuracy_m: f64) -> Fix {
        Fix::now(GeoPoint::new(53.5, 10.0).unwrap(), accuracy_m)
    }

    #[test]
    fn test_fix_defaults_to_coarse() {
        assert_eq!(fix(30.0).provenance, Provenance::Coarse);
        assert_eq!(
            fix(30.0).with_provenance(Provenance::Refined).provenance,
            Provenance::Refined
        );
    }

    #[test]
    fn test_fix_quality_band() {
        assert_eq!(fix(100.0).quality(DEFAULT_GOOD_ACCURACY_M), FixQuality::Good);
        assert_eq!(fix(100.5).quality(DEFAULT_GOOD_ACCURACY_M), FixQuality::Poor);
    }

    #[test]
    fn test_fix_validity() {
        assert!(fix(0.0).is_valid());
        assert!(!fix(-1.0).is_valid());
        assert!(!fix(f64::NAN).is_valid());

        let mut bad = fix(10.0);
        bad.position.latitude = 95.0;
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_state_accessors() {
        let settled = SensorState::Settled(fix(20.0));
        assert!(settled.is_terminal());
        assert_eq!(settled.settled_fix().map(|f| f.accuracy_m), Some(20.0));
        assert!(settled.error().is_none());

        let failed = SensorState::Failed(LocationError::Timeout);
        assert!(failed.is_terminal());
        assert_eq!(failed.error(), Some(&LocationError::Timeout));

        assert!(!SensorState::Acquiring.is_terminal());
        assert!(!SensorState::Refining { baseline: fix(80.0) }.is_terminal());
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            SensorState::Settled(fix(40.0)).status_message(),
            "Location found (±40 m)"
        );
        assert_eq!(
            SensorState::Refining { baseline: fix(120.0) }.status_message(),
            "Improving location accuracy (currently ±120 m)..."
        );
        assert_eq!(
            SensorState::Failed(LocationError::PermissionDenied).status_message(),
            LocationError::PermissionDenied.user_message()
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SensorState::Idle.to_string(), "idle");
        assert_eq!(SensorState::Acquiring.to_string(), "acquiring");
    }
}
