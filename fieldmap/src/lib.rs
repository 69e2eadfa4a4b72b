//! Fieldmap - live geospatial map engine for field-safety dashboards
//!
//! The engine keeps a map surface in sync with three inputs:
//!
//! - the device location, acquired as a coarse fix and refined through a
//!   bounded watch ([`location`])
//! - overlay entities (incidents, geofence zones, tracked persons) fetched
//!   periodically from a backend ([`refresh`]) and reconciled onto the
//!   surface by identity ([`overlay`])
//! - user clicks on rendered entities, routed to the current snapshot
//!   ([`interaction`])
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use fieldmap::engine::{EngineRuntime, MapEngine, RecordingHost};
//! use fieldmap::surface::RecordingCanvas;
//!
//! let engine = MapEngine::new(RecordingCanvas::new(), config.viewport_config(), RecordingHost::default());
//! let handle = EngineRuntime::start(engine, provider, source, config.location_config(), config.refresh_config())?;
//! // ...
//! let engine = handle.shutdown().await?;
//! ```

pub mod config;
pub mod engine;
pub mod geo;
pub mod interaction;
pub mod location;
pub mod logging;
pub mod overlay;
pub mod refresh;
pub mod surface;
pub mod viewport;

/// Version of the fieldmap library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
