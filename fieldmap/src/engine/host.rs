//! Upward interface to the embedding application.

use crate::location::SensorState;
use crate::overlay::OverlayEntity;
use crate::refresh::FetchError;

/// Callbacks the engine makes into its host.
///
/// All calls happen on the engine's event loop, never after teardown.
pub trait EngineHost: Send + 'static {
    /// The user clicked a rendered entity.
    fn on_entity_click(&mut self, entity: OverlayEntity);

    /// The location sensor changed state. The state carries the fix or error.
    fn on_location_status_change(&mut self, state: &SensorState);

    /// A refresh attempt failed. Rendered overlays are left as they were.
    fn on_refresh_failed(&mut self, _error: &FetchError) {}
}

/// Host that records every callback, for tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingHost {
    pub clicks: Vec<OverlayEntity>,
    pub statuses: Vec<SensorState>,
    pub refresh_failures: Vec<FetchError>,
}

impl EngineHost for RecordingHost {
    fn on_entity_click(&mut self, entity: OverlayEntity) {
        self.clicks.push(entity);
    }

    fn on_location_status_change(&mut self, state: &SensorState) {
        self.statuses.push(state.clone());
    }

    fn on_refresh_failed(&mut self, error: &FetchError) {
        self.refresh_failures.push(error.clone());
    }
}
