//! Popup content per entity kind.

use chrono::{DateTime, Utc};

use crate::surface::PopupContent;

use super::model::OverlayEntity;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Build the popup shown for an entity.
pub fn popup_for(entity: &OverlayEntity) -> PopupContent {
    match entity {
        OverlayEntity::Incident(incident) => PopupContent::new(format!("Incident #{}", incident.id))
            .row("Severity", incident.severity.to_string())
            .row("Status", incident.status.to_string())
            .row("Description", incident.description.clone())
            .row("Address", incident.address.clone())
            .row("Reported", format_time(&incident.created_at)),
        OverlayEntity::Geofence(zone) => PopupContent::new(zone.name.clone())
            .row("Alert", zone.alert_type.to_string())
            .row("Radius", format!("{:.0} m", zone.radius_m))
            .row("Active", if zone.active { "Yes" } else { "No" }),
        OverlayEntity::TrackedPerson(person) => PopupContent::new(person.name.clone())
            .row("Status", if person.active { "Active" } else { "Inactive" })
            .row("Last update", format_time(&person.last_updated)),
    }
}
