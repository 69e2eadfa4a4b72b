//! Snapshot-to-surface reconciliation.
//!
//! Diffs the entities currently drawn against the next snapshot and issues
//! the minimal set of layer operations:
//!
//! - identity gone (or no longer drawable) → remove its layer
//! - identity new → add a layer with popup and click binding
//! - identity kept, fields changed → remove and re-add
//! - identity kept, fields equal → untouched
//!
//! A pass over an unchanged snapshot performs no surface operations.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

use crate::interaction::InteractionRouter;
use crate::surface::{Geometry, LayerHandle, MapSurface, SurfaceError};

use super::model::{EntityKey, OverlayEntity};
use super::popup::popup_for;
use super::snapshot::OverlaySnapshot;
use super::style::{geometry_for, style_for};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Entities in the snapshot that could not be drawn.
    pub skipped: usize,
}

impl ReconcileReport {
    /// Returns true when the pass changed nothing on the surface.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ~{} -{} (skipped {})",
            self.added, self.updated, self.removed, self.skipped
        )
    }
}

/// A layer on the surface and the entity value it was drawn from.
#[derive(Debug)]
struct RenderedLayer {
    handle: LayerHandle,
    entity: OverlayEntity,
}

/// Keeps the surface's layer set in step with the latest snapshot.
///
/// Sole writer of the identity → layer mapping.
#[derive(Debug, Default)]
pub struct OverlayReconciler {
    rendered: BTreeMap<EntityKey, RenderedLayer>,
}

impl OverlayReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities currently drawn.
    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }

    /// Identities currently drawn, in key order.
    pub fn rendered_keys(&self) -> Vec<EntityKey> {
        self.rendered.keys().cloned().collect()
    }

    pub fn is_rendered(&self, key: &EntityKey) -> bool {
        self.rendered.contains_key(key)
    }

    /// Layer handle of a drawn identity.
    pub fn handle_for(&self, key: &EntityKey) -> Option<LayerHandle> {
        self.rendered.get(key).map(|layer| layer.handle)
    }

    /// Bring the surface in line with `next`.
    ///
    /// Fails only if the surface has been torn down; malformed entities are
    /// skipped and counted.
    pub fn reconcile(
        &mut self,
        surface: &mut MapSurface,
        next: &OverlaySnapshot,
        router: &InteractionRouter,
    ) -> Result<ReconcileReport, SurfaceError> {
        let mut report = ReconcileReport::default();

        let stale: Vec<EntityKey> = self
            .rendered
            .keys()
            .filter(|key| !next.get(key).is_some_and(OverlayEntity::is_renderable))
            .cloned()
            .collect();

        for key in stale {
            if let Some(layer) = self.rendered.remove(&key) {
                surface.remove_layer(layer.handle)?;
                trace!(key = %key, handle = %layer.handle, "Layer removed");
                report.removed += 1;
            }
        }

        for (key, entity) in next.iter() {
            let geometry = match geometry_for(entity) {
                Ok(geometry) => geometry,
                Err(error) => {
                    debug!(key = %key, %error, "Skipping malformed entity");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.rendered.get(key) {
                Some(layer) if layer.entity == *entity => {}
                Some(layer) => {
                    let handle = layer.handle;
                    self.rendered.remove(key);
                    surface.remove_layer(handle)?;
                    self.attach(surface, key, entity, &geometry, router)?;
                    trace!(key = %key, "Layer updated");
                    report.updated += 1;
                }
                None => {
                    self.attach(surface, key, entity, &geometry, router)?;
                    trace!(key = %key, "Layer added");
                    report.added += 1;
                }
            }
        }

        debug!(version = next.version(), report = %report, "Reconciliation pass complete");
        Ok(report)
    }

    fn attach(
        &mut self,
        surface: &mut MapSurface,
        key: &EntityKey,
        entity: &OverlayEntity,
        geometry: &Geometry,
        router: &InteractionRouter,
    ) -> Result<(), SurfaceError> {
        let handle = surface.add_layer(key.kind, &key.id, geometry, &style_for(entity))?;
        surface.bind_popup(handle, &popup_for(entity))?;
        surface.on_click(handle, router.binding_for(key.clone()))?;

        self.rendered.insert(
            key.clone(),
            RenderedLayer {
                handle,
                entity: entity.clone(),
            },
        );
        Ok(())
    }

    /// Drop every mapping without touching the surface.
    ///
    /// Used at teardown, when unmounting has already destroyed the layers.
    pub fn forget(&mut self) {
        self.rendered.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::geo::GeoPoint;
    use crate::overlay::model::{
        AlertType, EntityKind, GeofenceZone, IncidentMarker, IncidentStatus, Severity,
        TrackedPerson,
    };
    use crate::surface::{CanvasOp, Color, RecordingCanvas};

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap()
    }

    fn incident(id: &str, severity: Severity) -> OverlayEntity {
        IncidentMarker {
            id: id.to_string(),
            location: GeoPoint::new(48.85, 2.35).unwrap(),
            severity,
            status: IncidentStatus::Reported,
            description: "Fallen tree".to_string(),
            address: "Rue de Rivoli".to_string(),
            created_at: stamp(),
        }
        .into()
    }

    fn zone(id: &str, radius_m: f64) -> OverlayEntity {
        GeofenceZone {
            id: id.to_string(),
            name: "Depot".to_string(),
            center: GeoPoint::new(48.86, 2.34).unwrap(),
            radius_m,
            alert_type: AlertType::Warning,
            active: true,
            created_at: stamp(),
        }
        .into()
    }

    fn setup() -> (MapSurface, RecordingCanvas, InteractionRouter) {
        let canvas = RecordingCanvas::new();
        let mut surface = MapSurface::new(canvas.clone());
        surface
            .mount(GeoPoint::new(48.85, 2.35).unwrap(), 13)
            .unwrap();
        canvas.clear_ops();
        let router = InteractionRouter::new(Arc::new(|_entity: OverlayEntity| {}));
        (surface, canvas, router)
    }

    #[test]
    fn test_add_then_remove_one() {
        let (mut surface, canvas, router) = setup();
        let mut reconciler = OverlayReconciler::new();

        let first = OverlaySnapshot::from_entities(
            1,
            vec![incident("1", Severity::High), incident("2", Severity::Low)],
        );
        let report = reconciler.reconcile(&mut surface, &first, &router).unwrap();
        assert_eq!(report.added, 2);

        let one = canvas.find_layer(EntityKind::Incident, "1").unwrap();
        let two = canvas.find_layer(EntityKind::Incident, "2").unwrap();
        assert_eq!(canvas.layer(one).unwrap().style.color, Color::Red);
        assert_eq!(canvas.layer(two).unwrap().style.color, Color::Green);

        canvas.clear_ops();
        let second = OverlaySnapshot::from_entities(2, vec![incident("2", Severity::Low)]);
        let report = reconciler.reconcile(&mut surface, &second, &router).unwrap();

        assert_eq!(
            report,
            ReconcileReport {
                added: 0,
                updated: 0,
                removed: 1,
                skipped: 0
            }
        );
        assert_eq!(canvas.ops(), vec![CanvasOp::RemoveLayer(one)]);
        assert_eq!(
            reconciler.rendered_keys(),
            vec![EntityKey::new(EntityKind::Incident, "2")]
        );
    }

    #[test]
    fn test_unchanged_snapshot_is_noop() {
        let (mut surface, canvas, router) = setup();
        let mut reconciler = OverlayReconciler::new();
        let snapshot = OverlaySnapshot::from_entities(
            1,
            vec![incident("1", Severity::Medium), zone("z", 120.0)],
        );

        reconciler.reconcile(&mut surface, &snapshot, &router).unwrap();
        canvas.clear_ops();

        let report = reconciler.reconcile(&mut surface, &snapshot, &router).unwrap();
        assert!(report.is_noop());
        assert_eq!(canvas.op_count(), 0);
    }

    #[test]
    fn test_changed_fields_recreate_layer() {
        let (mut surface, canvas, router) = setup();
        let mut reconciler = OverlayReconciler::new();

        reconciler
            .reconcile(
                &mut surface,
                &OverlaySnapshot::from_entities(1, vec![incident("1", Severity::Low)]),
                &router,
            )
            .unwrap();
        let before = reconciler
            .handle_for(&EntityKey::new(EntityKind::Incident, "1"))
            .unwrap();

        let report = reconciler
            .reconcile(
                &mut surface,
                &OverlaySnapshot::from_entities(2, vec![incident("1", Severity::High)]),
                &router,
            )
            .unwrap();
        assert_eq!(report.updated, 1);

        let after = reconciler
            .handle_for(&EntityKey::new(EntityKind::Incident, "1"))
            .unwrap();
        assert_ne!(before, after);
        assert_eq!(canvas.layer_count(), 1);
        assert_eq!(canvas.layer(after).unwrap().style.color, Color::Red);
    }

    #[test]
    fn test_malformed_entities_are_skipped() {
        let (mut surface, canvas, router) = setup();
        let mut reconciler = OverlayReconciler::new();

        let homeless: OverlayEntity = TrackedPerson {
            id: "p".to_string(),
            name: "No Fix".to_string(),
            position: None,
            active: true,
            last_updated: stamp(),
        }
        .into();
        let snapshot = OverlaySnapshot::from_entities(
            1,
            vec![incident("1", Severity::Low), zone("z", 0.0), homeless],
        );

        let report = reconciler.reconcile(&mut surface, &snapshot, &router).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(canvas.layer_count(), 1);
    }

    #[test]
    fn test_entity_turning_malformed_is_removed() {
        let (mut surface, canvas, router) = setup();
        let mut reconciler = OverlayReconciler::new();

        reconciler
            .reconcile(
                &mut surface,
                &OverlaySnapshot::from_entities(1, vec![zone("z", 100.0)]),
                &router,
            )
            .unwrap();
        let report = reconciler
            .reconcile(
                &mut surface,
                &OverlaySnapshot::from_entities(2, vec![zone("z", -1.0)]),
                &router,
            )
            .unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(reconciler.rendered_count(), 0);
        assert_eq!(canvas.layer_count(), 0);
    }

    #[test]
    fn test_added_layer_gets_popup_and_click() {
        let (mut surface, canvas, router) = setup();
        let mut reconciler = OverlayReconciler::new();

        reconciler
            .reconcile(
                &mut surface,
                &OverlaySnapshot::from_entities(1, vec![zone("z", 80.0)]),
                &router,
            )
            .unwrap();

        let handle = canvas.find_layer(EntityKind::Geofence, "z").unwrap();
        assert_eq!(
            canvas.ops(),
            vec![
                CanvasOp::AddLayer {
                    handle,
                    kind: EntityKind::Geofence,
                    id: "z".to_string()
                },
                CanvasOp::BindPopup(handle),
                CanvasOp::OnClick(handle),
            ]
        );
        assert_eq!(
            canvas.layer(handle).unwrap().popup.unwrap().title,
            "Depot"
        );
    }

    #[test]
    fn test_dead_surface_fails_pass() {
        let (mut surface, _canvas, router) = setup();
        let mut reconciler = OverlayReconciler::new();
        surface.unmount();

        let result = reconciler.reconcile(
            &mut surface,
            &OverlaySnapshot::from_entities(1, vec![incident("1", Severity::Low)]),
            &router,
        );
        assert_eq!(result, Err(SurfaceError::NotMounted));
    }
}
