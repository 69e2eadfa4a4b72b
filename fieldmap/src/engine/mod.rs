//! The map engine component.
//!
//! [`MapEngine`] is the single owner of the map surface, the reconciler and
//! its identity → layer map, the viewport controller and the interaction
//! router. It is synchronous: each input (a sensor transition, a refresh
//! outcome, a click) is handled to completion before the next.
//! [`EngineRuntime`] wires it to the location driver and refresh scheduler
//! on a tokio event loop.
//!
//! After [`MapEngine::teardown`] every input is ignored, so late deliveries
//! never reach the surface or the host.

mod host;
mod runtime;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::interaction::InteractionRouter;
use crate::location::SensorState;
use crate::overlay::{OverlayEntity, OverlayReconciler, OverlaySnapshot, ReconcileReport};
use crate::refresh::{FetchError, RefreshOutcome};
use crate::surface::{MapCanvas, MapSurface, SurfaceError};
use crate::viewport::{ViewportConfig, ViewportController};

pub use host::{EngineHost, RecordingHost};
pub use runtime::{EngineHandle, EngineRuntime};

/// Live geospatial map component.
pub struct MapEngine<H: EngineHost> {
    surface: MapSurface,
    reconciler: OverlayReconciler,
    viewport: ViewportController,
    router: InteractionRouter,
    clicks_rx: mpsc::UnboundedReceiver<OverlayEntity>,
    host: H,
    current: Arc<OverlaySnapshot>,
    location: SensorState,
}

impl<H: EngineHost> MapEngine<H> {
    /// Create an unmounted engine drawing on `canvas`.
    pub fn new(canvas: impl MapCanvas + 'static, config: ViewportConfig, host: H) -> Self {
        let (clicks_tx, clicks_rx) = mpsc::unbounded_channel();
        let router = InteractionRouter::new(Arc::new(move |entity: OverlayEntity| {
            // The receiver lives as long as the engine.
            let _ = clicks_tx.send(entity);
        }));

        Self {
            surface: MapSurface::new(canvas),
            reconciler: OverlayReconciler::new(),
            viewport: ViewportController::new(config),
            router,
            clicks_rx,
            host,
            current: Arc::new(OverlaySnapshot::default()),
            location: SensorState::Idle,
        }
    }

    /// Create the map at the default view.
    pub fn mount(&mut self) -> Result<(), SurfaceError> {
        let (center, zoom) = self.viewport.target_view();
        self.surface.mount(center, zoom)
    }

    pub fn is_alive(&self) -> bool {
        self.surface.is_alive()
    }

    /// Handle a location sensor transition.
    pub fn handle_location(&mut self, state: SensorState) {
        if !self.is_alive() {
            trace!(state = %state, "Location update after teardown ignored");
            return;
        }

        debug!(state = %state, "Location status changed");
        if let Err(e) = self.viewport.on_location_state(&mut self.surface, &state) {
            warn!(error = %e, "Failed to recentre map");
        }
        self.host.on_location_status_change(&state);
        self.location = state;
    }

    /// Reconcile a freshly fetched snapshot onto the surface.
    ///
    /// Returns the pass report, or `None` after teardown.
    pub fn apply_snapshot(&mut self, snapshot: Arc<OverlaySnapshot>) -> Option<ReconcileReport> {
        if !self.is_alive() {
            trace!(version = snapshot.version(), "Snapshot after teardown ignored");
            return None;
        }

        let report = match self
            .reconciler
            .reconcile(&mut self.surface, &snapshot, &self.router)
        {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Reconciliation aborted");
                return None;
            }
        };
        self.router.rebind(Arc::clone(&snapshot));

        let persons = snapshot.tracked_person_positions();
        if !persons.is_empty() {
            if let Err(e) = self.viewport.fit_to_bounds(&mut self.surface, persons) {
                warn!(error = %e, "Failed to fit view to tracked persons");
            }
        }

        info!(
            version = snapshot.version(),
            rendered = self.reconciler.rendered_count(),
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            skipped = report.skipped,
            "Overlays refreshed"
        );
        self.current = snapshot;
        Some(report)
    }

    /// Report a failed refresh to the host. Overlays stay as they are.
    pub fn report_fetch_error(&mut self, error: FetchError) {
        if !self.is_alive() {
            trace!(error = %error, "Fetch error after teardown ignored");
            return;
        }
        self.host.on_refresh_failed(&error);
    }

    /// Dispatch one refresh outcome.
    pub fn handle_refresh(&mut self, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::Snapshot(snapshot) => {
                self.apply_snapshot(snapshot);
            }
            RefreshOutcome::Failed { error, .. } => self.report_fetch_error(error),
        }
    }

    /// Forward a resolved click to the host.
    pub fn handle_click(&mut self, entity: OverlayEntity) {
        if !self.is_alive() {
            trace!(key = %entity.key(), "Click after teardown ignored");
            return;
        }
        self.host.on_entity_click(entity);
    }

    /// Wait for the next resolved click.
    pub async fn next_click(&mut self) -> Option<OverlayEntity> {
        self.clicks_rx.recv().await
    }

    /// Forward every click queued so far. Returns how many were handled.
    pub fn dispatch_clicks(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(entity) = self.clicks_rx.try_recv() {
            self.handle_click(entity);
            handled += 1;
        }
        handled
    }

    /// Destroy the map. Idempotent.
    pub fn teardown(&mut self) {
        if !self.is_alive() {
            return;
        }
        self.surface.unmount();
        self.reconciler.forget();
        self.location = SensorState::Idle;
        info!("Map engine torn down");
    }

    pub fn location_state(&self) -> &SensorState {
        &self.location
    }

    pub fn current_snapshot(&self) -> &Arc<OverlaySnapshot> {
        &self.current
    }

    pub fn reconciler(&self) -> &OverlayReconciler {
        &self.reconciler
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn router(&self) -> &InteractionRouter {
        &self.router
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Consume the engine and return its host.
    pub fn into_host(mut self) -> H {
        self.teardown();
        let Self { host, .. } = self;
        host
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::geo::GeoPoint;
    use crate::location::{Fix, LocationError};
    use crate::overlay::{EntityKind, IncidentMarker, IncidentStatus, Severity, TrackedPerson};
    use crate::surface::{CanvasOp, RecordingCanvas};

    fn incident(id: &str, severity: Severity) -> OverlayEntity {
        IncidentMarker {
            id: id.to_string(),
            location: GeoPoint::new(-22.9, -43.2).unwrap(),
            severity,
            status: IncidentStatus::Reported,
            description: "Landslide".to_string(),
            address: "Morro".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
        .into()
    }

    fn person(id: &str, lat: f64, lon: f64) -> OverlayEntity {
        TrackedPerson {
            id: id.to_string(),
            name: "Field Agent".to_string(),
            position: Some(GeoPoint::new(lat, lon).unwrap()),
            active: true,
            last_updated: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
        .into()
    }

    fn mounted() -> (MapEngine<RecordingHost>, RecordingCanvas) {
        let canvas = RecordingCanvas::new();
        let mut engine = MapEngine::new(
            canvas.clone(),
            ViewportConfig::default(),
            RecordingHost::default(),
        );
        engine.mount().unwrap();
        (engine, canvas)
    }

    #[test]
    fn test_mount_uses_default_view() {
        let (_engine, canvas) = mounted();
        let defaults = ViewportConfig::default();
        assert_eq!(
            canvas.ops(),
            vec![CanvasOp::Create {
                center: defaults.default_center,
                zoom: defaults.default_zoom
            }]
        );
    }

    #[test]
    fn test_settled_location_recentres_and_notifies_host() {
        let (mut engine, canvas) = mounted();
        let here = GeoPoint::new(-22.9, -43.2).unwrap();

        engine.handle_location(SensorState::Acquiring);
        engine.handle_location(SensorState::Settled(Fix::now(here, 12.0)));

        assert_eq!(engine.host().statuses.len(), 2);
        assert_eq!(canvas.view(), Some((here, ViewportConfig::default().fix_zoom)));
    }

    #[test]
    fn test_click_resolves_to_entity() {
        let (mut engine, canvas) = mounted();
        engine.apply_snapshot(Arc::new(OverlaySnapshot::from_entities(
            1,
            vec![incident("1", Severity::High)],
        )));

        let handle = canvas.find_layer(EntityKind::Incident, "1").unwrap();
        assert!(canvas.click(handle));
        assert_eq!(engine.dispatch_clicks(), 1);
        assert_eq!(engine.host().clicks, vec![incident("1", Severity::High)]);
    }

    #[test]
    fn test_tracked_persons_trigger_fit_bounds() {
        let (mut engine, canvas) = mounted();
        engine.apply_snapshot(Arc::new(OverlaySnapshot::from_entities(
            1,
            vec![person("a", 1.0, 1.0), person("b", 2.0, 3.0)],
        )));

        let fitted = canvas.fitted_bounds().unwrap();
        assert!(fitted.contains(&GeoPoint::new(1.0, 1.0).unwrap()));
        assert!(fitted.contains(&GeoPoint::new(2.0, 3.0).unwrap()));
    }

    #[test]
    fn test_fetch_error_keeps_overlays() {
        let (mut engine, canvas) = mounted();
        engine.apply_snapshot(Arc::new(OverlaySnapshot::from_entities(
            1,
            vec![incident("1", Severity::Low)],
        )));
        canvas.clear_ops();

        engine.report_fetch_error(FetchError::Timeout);
        assert_eq!(engine.host().refresh_failures, vec![FetchError::Timeout]);
        assert_eq!(canvas.op_count(), 0);
        assert_eq!(canvas.layer_count(), 1);
    }

    #[test]
    fn test_inputs_after_teardown_touch_nothing() {
        let (mut engine, canvas) = mounted();
        let snapshot = Arc::new(OverlaySnapshot::from_entities(
            1,
            vec![incident("1", Severity::Low)],
        ));
        engine.apply_snapshot(Arc::clone(&snapshot));
        let handle = canvas.find_layer(EntityKind::Incident, "1").unwrap();
        let late_click = canvas.click_handler(handle).unwrap();

        engine.teardown();
        canvas.clear_ops();
        let statuses = engine.host().statuses.len();

        engine.handle_location(SensorState::Settled(Fix::now(
            GeoPoint::new(0.0, 0.0).unwrap(),
            5.0,
        )));
        engine.handle_location(SensorState::Failed(LocationError::Timeout));
        assert!(engine.apply_snapshot(snapshot).is_none());
        engine.report_fetch_error(FetchError::Timeout);
        late_click();
        engine.dispatch_clicks();

        assert_eq!(canvas.op_count(), 0);
        assert_eq!(engine.host().statuses.len(), statuses);
        assert!(engine.host().refresh_failures.is_empty());
        assert!(engine.host().clicks.is_empty());
    }
}
