//! Click routing from rendered layers back to domain entities.
//!
//! Every layer registers one click closure at creation that captures only its
//! [`EntityKey`]. The router resolves the key against the snapshot it is
//! currently bound to and hands the entity to the host sink. The reconciler
//! rebinds the router after every pass, so a click always resolves against
//! what is on screen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::overlay::{EntityKey, OverlayEntity, OverlaySnapshot};
use crate::surface::ClickCallback;

/// Receives the entity behind a click.
pub type ClickSink = Arc<dyn Fn(OverlayEntity) + Send + Sync>;

struct RouterInner {
    snapshot: RwLock<Arc<OverlaySnapshot>>,
    sink: ClickSink,
    routed: AtomicU64,
    unresolved: AtomicU64,
}

/// Routes layer clicks to the host.
///
/// Cheap to clone; clones share the bound snapshot.
#[derive(Clone)]
pub struct InteractionRouter {
    inner: Arc<RouterInner>,
}

impl std::fmt::Debug for InteractionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionRouter")
            .field("bound_version", &self.bound_version())
            .field("routed", &self.routed_count())
            .finish()
    }
}

impl InteractionRouter {
    /// Create a router bound to an empty snapshot.
    pub fn new(sink: ClickSink) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                snapshot: RwLock::new(Arc::new(OverlaySnapshot::default())),
                sink,
                routed: AtomicU64::new(0),
                unresolved: AtomicU64::new(0),
            }),
        }
    }

    /// Bind lookups to a newly rendered snapshot.
    pub fn rebind(&self, snapshot: Arc<OverlaySnapshot>) {
        trace!(version = snapshot.version(), "Interaction router rebound");
        let mut bound = self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *bound = snapshot;
    }

    /// Version of the bound snapshot.
    pub fn bound_version(&self) -> u64 {
        self.bound().version()
    }

    fn bound(&self) -> Arc<OverlaySnapshot> {
        let bound = self
            .inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*bound)
    }

    /// Look up an entity in the bound snapshot.
    pub fn resolve(&self, key: &EntityKey) -> Option<OverlayEntity> {
        self.bound().get(key).cloned()
    }

    /// Resolve a click and forward the entity to the sink.
    ///
    /// Returns false when the key is not in the bound snapshot.
    pub fn route(&self, key: &EntityKey) -> bool {
        match self.resolve(key) {
            Some(entity) => {
                debug!(key = %key, "Entity clicked");
                self.inner.routed.fetch_add(1, Ordering::Relaxed);
                (self.inner.sink)(entity);
                true
            }
            None => {
                debug!(key = %key, "Click on entity missing from bound snapshot");
                self.inner.unresolved.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// The click closure registered for a layer.
    pub fn binding_for(&self, key: EntityKey) -> ClickCallback {
        let router = self.clone();
        Arc::new(move || {
            router.route(&key);
        })
    }

    /// Clicks delivered to the sink.
    pub fn routed_count(&self) -> u64 {
        self.inner.routed.load(Ordering::Relaxed)
    }

    /// Clicks that did not resolve.
    pub fn unresolved_count(&self) -> u64 {
        self.inner.unresolved.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::geo::GeoPoint;
    use crate::overlay::{EntityKind, IncidentMarker, IncidentStatus, Severity};

    fn incident(id: &str, description: &str) -> OverlayEntity {
        IncidentMarker {
            id: id.to_string(),
            location: GeoPoint::new(0.0, 0.0).unwrap(),
            severity: Severity::Low,
            status: IncidentStatus::Reported,
            description: description.to_string(),
            address: String::new(),
            created_at: Utc::now(),
        }
        .into()
    }

    fn recording_router() -> (InteractionRouter, Arc<Mutex<Vec<OverlayEntity>>>) {
        let clicks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&clicks);
        let router = InteractionRouter::new(Arc::new(move |entity: OverlayEntity| {
            sink.lock().unwrap().push(entity);
        }));
        (router, clicks)
    }

    #[test]
    fn test_binding_resolves_against_current_snapshot() {
        let (router, clicks) = recording_router();
        let key = EntityKey::new(EntityKind::Incident, "1");
        let binding = router.binding_for(key.clone());

        router.rebind(Arc::new(OverlaySnapshot::from_entities(
            1,
            vec![incident("1", "first")],
        )));
        binding();

        router.rebind(Arc::new(OverlaySnapshot::from_entities(
            2,
            vec![incident("1", "second")],
        )));
        binding();

        let clicks = clicks.lock().unwrap();
        assert_eq!(clicks.len(), 2);
        assert!(matches!(&clicks[0], OverlayEntity::Incident(i) if i.description == "first"));
        assert!(matches!(&clicks[1], OverlayEntity::Incident(i) if i.description == "second"));
        assert_eq!(router.bound_version(), 2);
    }

    #[test]
    fn test_unknown_key_is_not_routed() {
        let (router, clicks) = recording_router();
        assert!(!router.route(&EntityKey::new(EntityKind::Geofence, "9")));
        assert!(clicks.lock().unwrap().is_empty());
        assert_eq!(router.unresolved_count(), 1);
    }
}
