//! Overlay entity types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{validate_radius, GeoError, GeoPoint};

/// Kind of overlay entity. Part of the identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Incident,
    Geofence,
    TrackedPerson,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incident => write!(f, "incident"),
            Self::Geofence => write!(f, "geofence"),
            Self::TrackedPerson => write!(f, "tracked_person"),
        }
    }
}

/// Identity of an overlay entity: `(kind, id)`.
///
/// Ids are only unique within a kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Incident severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Incident handling status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Reported,
    #[serde(alias = "inProgress")]
    InProgress,
    Resolved,
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reported => write!(f, "Reported"),
            Self::InProgress => write!(f, "In progress"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}

/// Geofence alert level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Warning,
    Danger,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "Warning"),
            Self::Danger => write!(f, "Danger"),
        }
    }
}

/// A reported incident, drawn as a point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentMarker {
    pub id: String,
    pub location: GeoPoint,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub description: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// A hazard zone, drawn as a circle.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceZone {
    pub id: String,
    pub name: String,
    pub center: GeoPoint,
    pub radius_m: f64,
    pub alert_type: AlertType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A person whose position is tracked, drawn as an initials badge.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPerson {
    pub id: String,
    pub name: String,
    pub position: Option<GeoPoint>,
    pub active: bool,
    pub last_updated: DateTime<Utc>,
}

/// Why an entity cannot be drawn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    /// The entity has no position.
    #[error("Entity has no position")]
    MissingPosition,

    /// The entity's geometry is out of range.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(#[from] GeoError),
}

/// Anything the engine can draw on the map.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEntity {
    Incident(IncidentMarker),
    Geofence(GeofenceZone),
    TrackedPerson(TrackedPerson),
}

impl OverlayEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Incident(_) => EntityKind::Incident,
            Self::Geofence(_) => EntityKind::Geofence,
            Self::TrackedPerson(_) => EntityKind::TrackedPerson,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Incident(incident) => &incident.id,
            Self::Geofence(zone) => &zone.id,
            Self::TrackedPerson(person) => &person.id,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.kind(), self.id())
    }

    /// Anchor position (marker location, zone center or person position).
    pub fn position(&self) -> Option<GeoPoint> {
        match self {
            Self::Incident(incident) => Some(incident.location),
            Self::Geofence(zone) => Some(zone.center),
            Self::TrackedPerson(person) => person.position,
        }
    }

    /// Check that the entity can be drawn.
    pub fn validate(&self) -> Result<(), EntityError> {
        let position = self.position().ok_or(EntityError::MissingPosition)?;
        position.validate()?;
        if let Self::Geofence(zone) = self {
            validate_radius(zone.radius_m)?;
        }
        Ok(())
    }

    pub fn is_renderable(&self) -> bool {
        self.validate().is_ok()
    }
}

impl From<IncidentMarker> for OverlayEntity {
    fn from(incident: IncidentMarker) -> Self {
        Self::Incident(incident)
    }
}

impl From<GeofenceZone> for OverlayEntity {
    fn from(zone: GeofenceZone) -> Self {
        Self::Geofence(zone)
    }
}

impl From<TrackedPerson> for OverlayEntity {
    fn from(person: TrackedPerson) -> Self {
        Self::TrackedPerson(person)
    }
}
