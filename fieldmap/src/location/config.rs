//! Configuration for location acquisition.

use std::time::Duration;

use super::state::DEFAULT_GOOD_ACCURACY_M;

/// Default single-shot timeout (15 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default maximum age of a cached reading the host may return (60 seconds).
pub const DEFAULT_MAXIMUM_AGE_SECS: u64 = 60;

/// Default refinement window (10 seconds).
pub const DEFAULT_WATCH_WINDOW_SECS: u64 = 10;

/// Default accuracy at or below which a fix settles immediately (50 meters).
pub const DEFAULT_SETTLE_ACCURACY_M: f64 = 50.0;

/// Default ratio a watch reading must reach against the baseline accuracy.
pub const DEFAULT_IMPROVEMENT_FACTOR: f64 = 0.5;

/// Options passed to the host location provider for one request or watch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionOptions {
    /// Ask the platform for its most accurate source (GPS over Wi-Fi/cell).
    pub high_accuracy: bool,

    /// Give up after this long.
    pub timeout: Duration,

    /// Accept a cached reading no older than this.
    pub maximum_age: Duration,
}

/// Configuration for the location sensor state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationConfig {
    /// Timeout for the single-shot request.
    pub request_timeout: Duration,

    /// Maximum staleness of the single-shot result.
    pub maximum_age: Duration,

    /// How long the refinement watch may run.
    pub watch_window: Duration,

    /// A fix at or below this accuracy settles the episode immediately.
    pub settle_accuracy_m: f64,

    /// Threshold separating good from poor fixes in status reports.
    pub good_accuracy_m: f64,

    /// A watch reading also settles when its accuracy is at most this
    /// fraction of the baseline accuracy.
    pub improvement_factor: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            maximum_age: Duration::from_secs(DEFAULT_MAXIMUM_AGE_SECS),
            watch_window: Duration::from_secs(DEFAULT_WATCH_WINDOW_SECS),
            settle_accuracy_m: DEFAULT_SETTLE_ACCURACY_M,
            good_accuracy_m: DEFAULT_GOOD_ACCURACY_M,
            improvement_factor: DEFAULT_IMPROVEMENT_FACTOR,
        }
    }
}

impl LocationConfig {
    /// Options for the initial single-shot request.
    pub fn single_shot_options(&self) -> AcquisitionOptions {
        AcquisitionOptions {
            high_accuracy: true,
            timeout: self.request_timeout,
            maximum_age: self.maximum_age,
        }
    }

    /// Options for the refinement watch.
    ///
    /// The watch never accepts cached readings; the baseline already is one.
    pub fn watch_options(&self) -> AcquisitionOptions {
        AcquisitionOptions {
            high_accuracy: true,
            timeout: self.watch_window,
            maximum_age: Duration::ZERO,
        }
    }
}
