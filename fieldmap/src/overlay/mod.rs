//! Overlay entities and their reconciliation onto the map.
//!
//! - [`model`] - typed entities keyed by `(kind, id)`
//! - [`OverlaySnapshot`] - the versioned set delivered by each refresh
//! - [`style`] / [`popup`] - how each kind is drawn and described
//! - [`OverlayReconciler`] - minimal add/update/remove against the surface

pub mod model;
pub mod popup;
mod reconciler;
mod snapshot;
pub mod style;

pub use model::{
    AlertType, EntityError, EntityKey, EntityKind, GeofenceZone, IncidentMarker, IncidentStatus,
    OverlayEntity, Severity, TrackedPerson,
};
pub use reconciler::{OverlayReconciler, ReconcileReport};
pub use snapshot::OverlaySnapshot;
