//! Backend JSON records and snapshot assembly.
//!
//! Each list endpoint returns a JSON array with camelCase keys. Records are
//! decoded one by one so a single bad record never fails a whole fetch;
//! records that don't decode or lack a required field are dropped and
//! counted on the snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::geo::GeoPoint;
use crate::overlay::{
    AlertType, GeofenceZone, IncidentMarker, IncidentStatus, OverlaySnapshot, Severity,
    TrackedPerson,
};

use super::error::FetchError;

/// Record identifier; the backend sends either numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A required field was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, MissingField> {
    value.ok_or(MissingField(field))
}

/// One decoded list plus the number of records that failed to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub records: Vec<T>,
    pub dropped: usize,
}

impl<T> Listing<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            dropped: 0,
        }
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Decode a JSON array body record by record.
pub fn decode_listing<T: DeserializeOwned>(body: &[u8]) -> Result<Listing<T>, FetchError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let mut listing = Listing::new(Vec::with_capacity(values.len()));
    for value in values {
        match serde_json::from_value(value) {
            Ok(record) => listing.records.push(record),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping undecodable record");
                listing.dropped += 1;
            }
        }
    }
    Ok(listing)
}

/// Incident as delivered by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub id: Option<RecordId>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub severity: Option<Severity>,
    pub status: Option<IncidentStatus>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl IncidentRecord {
    pub fn into_entity(self) -> Result<IncidentMarker, MissingField> {
        Ok(IncidentMarker {
            id: required(self.id, "id")?.to_string(),
            location: GeoPoint {
                latitude: required(self.latitude, "latitude")?,
                longitude: required(self.longitude, "longitude")?,
            },
            severity: required(self.severity, "severity")?,
            status: self.status.unwrap_or(IncidentStatus::Reported),
            description: self.description.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            created_at: required(self.created_at, "createdAt")?,
        })
    }
}

/// Geofence as delivered by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceRecord {
    pub id: Option<RecordId>,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
    pub alert_type: Option<AlertType>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl GeofenceRecord {
    pub fn into_entity(self) -> Result<GeofenceZone, MissingField> {
        Ok(GeofenceZone {
            id: required(self.id, "id")?.to_string(),
            name: required(self.name, "name")?,
            center: GeoPoint {
                latitude: required(self.latitude, "latitude")?,
                longitude: required(self.longitude, "longitude")?,
            },
            radius_m: required(self.radius, "radius")?,
            alert_type: required(self.alert_type, "alertType")?,
            active: self.is_active.unwrap_or(true),
            created_at: required(self.created_at, "createdAt")?,
        })
    }
}

/// Tracked person as delivered by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub id: Option<RecordId>,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: Option<bool>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl PersonRecord {
    pub fn into_entity(self) -> Result<TrackedPerson, MissingField> {
        let position = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(TrackedPerson {
            id: required(self.id, "id")?.to_string(),
            name: required(self.name, "name")?,
            position,
            active: self.is_active.unwrap_or(true),
            last_updated: required(self.last_updated, "lastUpdated")?,
        })
    }
}

/// The three lists of one refresh attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayLists {
    pub incidents: Listing<IncidentRecord>,
    pub geofences: Listing<GeofenceRecord>,
    pub persons: Listing<PersonRecord>,
}

impl OverlayLists {
    /// Convert the lists into a snapshot, dropping incomplete records.
    pub fn into_snapshot(self, version: u64) -> OverlaySnapshot {
        let mut dropped = self.incidents.dropped + self.geofences.dropped + self.persons.dropped;
        let mut snapshot = OverlaySnapshot::new(version);

        for record in self.incidents.records {
            match record.into_entity() {
                Ok(entity) => {
                    snapshot.insert(entity.into());
                }
                Err(MissingField(field)) => {
                    tracing::debug!(field, "Dropping incident record");
                    dropped += 1;
                }
            }
        }
        for record in self.geofences.records {
            match record.into_entity() {
                Ok(entity) => {
                    snapshot.insert(entity.into());
                }
                Err(MissingField(field)) => {
                    tracing::debug!(field, "Dropping geofence record");
                    dropped += 1;
                }
            }
        }
        for record in self.persons.records {
            match record.into_entity() {
                Ok(entity) => {
                    snapshot.insert(entity.into());
                }
                Err(MissingField(field)) => {
                    tracing::debug!(field, "Dropping tracked person record");
                    dropped += 1;
                }
            }
        }

        snapshot.with_dropped(dropped)
    }
}
