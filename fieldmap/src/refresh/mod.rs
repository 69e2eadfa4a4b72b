//! Periodic overlay refresh from the backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   fetch_snapshot   ┌────────────────┐
//! │ RefreshScheduler │───────────────────►│ OverlaySource  │
//! │ (interval, guard)│                    │ (HTTP / static)│
//! └────────┬─────────┘                    └────────────────┘
//!          │ RefreshOutcome
//!          ▼
//!     engine event loop
//! ```

mod config;
mod error;
mod scheduler;
mod source;
pub mod wire;

pub use config::{
    RefreshConfig, DEFAULT_API_URL, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REFRESH_INTERVAL_SECS,
};
pub use error::FetchError;
pub use scheduler::{fetch_snapshot, RefreshHandle, RefreshOutcome, RefreshScheduler, RefreshStats};
pub use source::{
    HttpOverlaySource, OverlaySource, StaticOverlaySource, GEOFENCES_PATH, INCIDENTS_PATH,
    PERSONS_PATH,
};
pub use wire::{
    GeofenceRecord, IncidentRecord, Listing, OverlayLists, PersonRecord, RecordId,
};
