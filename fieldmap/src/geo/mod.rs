//! Geographic primitives
//!
//! Points, bounding boxes and the validation rules shared by the location
//! sensor, the overlay model and the viewport controller.

mod types;

pub use types::{GeoBounds, GeoError, GeoPoint, MAX_LAT, MAX_LON, MIN_BOUNDS_SPAN, MIN_LAT, MIN_LON};

/// Validates a circle radius in meters.
#[inline]
pub fn validate_radius(radius_m: f64) -> Result<f64, GeoError> {
    if radius_m.is_finite() && radius_m > 0.0 {
        Ok(radius_m)
    } else {
        Err(GeoError::InvalidRadius(radius_m))
    }
}
