//! Geographic type definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Valid latitude range
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Smallest span (degrees) a padded bounding box is allowed to collapse to.
///
/// A box around a single point would otherwise have zero area and the
/// canvas could not derive a zoom level from it.
pub const MIN_BOUNDS_SPAN: f64 = 0.002;

/// Errors that can occur when constructing geographic values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude is outside -90..=90 or not finite
    #[error("Invalid latitude: {0} (must be between {} and {})", MIN_LAT, MAX_LAT)]
    InvalidLatitude(f64),

    /// Longitude is outside -180..=180 or not finite
    #[error("Invalid longitude: {0} (must be between {} and {})", MIN_LON, MAX_LON)]
    InvalidLongitude(f64),

    /// Radius is zero, negative or not finite
    #[error("Invalid radius: {0}m (must be a positive number of meters)")]
    InvalidRadius(f64),
}

/// A position on the globe in decimal degrees.
///
/// Fields are public so wire records can be mapped without ceremony; use
/// [`GeoPoint::new`] or [`GeoPoint::validate`] wherever the range invariant
/// matters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a validated point.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Checks the latitude/longitude range invariant.
    pub fn validate(&self) -> Result<(), GeoError> {
        if !self.latitude.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&self.latitude) {
            return Err(GeoError::InvalidLatitude(self.latitude));
        }
        if !self.longitude.is_finite() || !(MIN_LON..=MAX_LON).contains(&self.longitude) {
            return Err(GeoError::InvalidLongitude(self.longitude));
        }
        Ok(())
    }

    /// Returns true if the point satisfies the range invariant.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// An axis-aligned bounding box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Southern edge (minimum latitude)
    pub south: f64,
    /// Western edge (minimum longitude)
    pub west: f64,
    /// Northern edge (maximum latitude)
    pub north: f64,
    /// Eastern edge (maximum longitude)
    pub east: f64,
}

impl GeoBounds {
    /// Creates a zero-area box containing a single point.
    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            south: point.latitude,
            west: point.longitude,
            north: point.latitude,
            east: point.longitude,
        }
    }

    /// Creates the smallest box containing every point.
    ///
    /// Returns `None` when the iterator is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut points = points.into_iter();
        let mut bounds = Self::from_point(points.next()?);
        for point in points {
            bounds.expand(point);
        }
        Some(bounds)
    }

    /// Grows the box to include a point.
    pub fn expand(&mut self, point: GeoPoint) {
        self.south = self.south.min(point.latitude);
        self.north = self.north.max(point.latitude);
        self.west = self.west.min(point.longitude);
        self.east = self.east.max(point.longitude);
    }

    /// Returns a copy grown on every side by `ratio` of the box's span.
    ///
    /// Spans narrower than [`MIN_BOUNDS_SPAN`] are widened first. The result
    /// is clamped to the valid coordinate range.
    pub fn padded(&self, ratio: f64) -> Self {
        let lat_span = (self.north - self.south).max(MIN_BOUNDS_SPAN);
        let lon_span = (self.east - self.west).max(MIN_BOUNDS_SPAN);
        let (center_lat, center_lon) = self.center();

        let half_lat = lat_span / 2.0 + lat_span * ratio;
        let half_lon = lon_span / 2.0 + lon_span * ratio;

        Self {
            south: (center_lat - half_lat).max(MIN_LAT),
            west: (center_lon - half_lon).max(MIN_LON),
            north: (center_lat + half_lat).min(MAX_LAT),
            east: (center_lon + half_lon).min(MAX_LON),
        }
    }

    /// Center of the box as (latitude, longitude).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Returns true if the point lies inside or on the edge of the box.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }
}
