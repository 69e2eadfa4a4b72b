//! Device location acquisition.
//!
//! Obtains the user's position with an accuracy-refinement protocol: one
//! high-accuracy single-shot request, and if that reading is coarse, a
//! bounded watch that keeps the baseline unless a clearly better reading
//! arrives.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  commands   ┌──────────────────┐
//! │  LocationSensor  │────────────►│  LocationDriver  │──► status channel
//! │  (pure machine)  │◄────────────│  (tokio task)    │
//! └──────────────────┘   events    └────────┬─────────┘
//!                                           │
//!                                           ▼
//!                                  ┌──────────────────┐
//!                                  │ LocationProvider │
//!                                  └──────────────────┘
//! ```
//!
//! Status transitions: `Idle → Acquiring → (Refining →)? Settled | Failed`.

mod config;
mod driver;
mod error;
mod machine;
mod provider;
pub mod scripted;
mod state;

pub use config::{
    AcquisitionOptions, LocationConfig, DEFAULT_IMPROVEMENT_FACTOR, DEFAULT_MAXIMUM_AGE_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SETTLE_ACCURACY_M, DEFAULT_WATCH_WINDOW_SECS,
};
pub use driver::{LocationControl, LocationDriver};
pub use error::LocationError;
pub use machine::{EpisodeId, LocationSensor, SensorCommand, SensorEvent};
pub use provider::{LocationProvider, WatchHandle, WatchReading, WatchSubscription};
pub use scripted::{ScriptedLocationProvider, WatchStep};
pub use state::{Fix, FixQuality, Provenance, SensorState, DEFAULT_GOOD_ACCURACY_M};
