//! Geometry and style for each overlay kind.
//!
//! | entity           | geometry | colour                                  |
//! |------------------|----------|-----------------------------------------|
//! | incident         | point    | severity: low green, medium yellow, high red |
//! | geofence         | circle   | alert: warning yellow, danger red       |
//! | tracked person   | point    | active blue, inactive gray              |
//!
//! Inactive geofences are drawn dashed; tracked persons carry their initials.

use crate::surface::{Color, Geometry, LayerStyle};

use super::model::{AlertType, EntityError, OverlayEntity, Severity};

/// Fill opacity of geofence circles.
pub const ZONE_FILL_OPACITY: f64 = 0.2;

/// Fill opacity of an inactive geofence.
pub const INACTIVE_ZONE_FILL_OPACITY: f64 = 0.1;

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Low => Color::Green,
        Severity::Medium => Color::Yellow,
        Severity::High => Color::Red,
    }
}

pub fn alert_color(alert_type: AlertType) -> Color {
    match alert_type {
        AlertType::Warning => Color::Yellow,
        AlertType::Danger => Color::Red,
    }
}

pub fn activity_color(active: bool) -> Color {
    if active {
        Color::Blue
    } else {
        Color::Gray
    }
}

/// Up to two uppercase initials from a display name ("?" when empty).
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();

    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}

/// Geometry of a renderable entity.
pub fn geometry_for(entity: &OverlayEntity) -> Result<Geometry, EntityError> {
    entity.validate()?;
    let geometry = match entity {
        OverlayEntity::Incident(incident) => Geometry::Point(incident.location),
        OverlayEntity::Geofence(zone) => Geometry::Circle {
            center: zone.center,
            radius_m: zone.radius_m,
        },
        OverlayEntity::TrackedPerson(person) => {
            Geometry::Point(person.position.ok_or(EntityError::MissingPosition)?)
        }
    };
    Ok(geometry)
}

/// Visual style of an entity.
pub fn style_for(entity: &OverlayEntity) -> LayerStyle {
    match entity {
        OverlayEntity::Incident(incident) => LayerStyle::new(severity_color(incident.severity)),
        OverlayEntity::Geofence(zone) => {
            let opacity = if zone.active {
                ZONE_FILL_OPACITY
            } else {
                INACTIVE_ZONE_FILL_OPACITY
            };
            LayerStyle::new(alert_color(zone.alert_type))
                .with_fill_opacity(opacity)
                .with_dashed(!zone.active)
        }
        OverlayEntity::TrackedPerson(person) => {
            LayerStyle::new(activity_color(person.active)).with_label(initials(&person.name))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::geo::GeoPoint;
    use crate::overlay::model::{GeofenceZone, TrackedPerson};

    #[test]
    fn test_initials() {
        assert_eq!(initials("Maria Souza"), "MS");
        assert_eq!(initials("  jo  "), "J");
        assert_eq!(initials("Ana Paula de Lima"), "AP");
        assert_eq!(initials(""), "?");
    }

    #[test]
    fn test_severity_palette() {
        assert_eq!(severity_color(Severity::Low), Color::Green);
        assert_eq!(severity_color(Severity::Medium), Color::Yellow);
        assert_eq!(severity_color(Severity::High), Color::Red);
    }

    #[test]
    fn test_inactive_zone_is_dashed() {
        let zone: OverlayEntity = GeofenceZone {
            id: "z".to_string(),
            name: "Dock".to_string(),
            center: GeoPoint::new(0.0, 0.0).unwrap(),
            radius_m: 50.0,
            alert_type: AlertType::Warning,
            active: false,
            created_at: Utc::now(),
        }
        .into();

        let style = style_for(&zone);
        assert_eq!(style.color, Color::Yellow);
        assert!(style.dashed);
        assert_eq!(
            geometry_for(&zone).unwrap(),
            Geometry::Circle {
                center: GeoPoint::new(0.0, 0.0).unwrap(),
                radius_m: 50.0
            }
        );
    }

    #[test]
    fn test_person_badge() {
        let person: OverlayEntity = TrackedPerson {
            id: "p".to_string(),
            name: "carla dias".to_string(),
            position: Some(GeoPoint::new(1.0, 2.0).unwrap()),
            active: false,
            last_updated: Utc::now(),
        }
        .into();

        let style = style_for(&person);
        assert_eq!(style.color, Color::Gray);
        assert_eq!(style.label.as_deref(), Some("CD"));
    }
}
