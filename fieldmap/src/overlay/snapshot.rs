//! Versioned overlay snapshots.

use std::collections::BTreeMap;

use tracing::debug;

use crate::geo::GeoPoint;

use super::model::{EntityKey, EntityKind, OverlayEntity};

/// The full set of entities to display, keyed by identity.
///
/// Snapshots are replaced wholesale on every refresh; the reconciler diffs
/// consecutive snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySnapshot {
    version: u64,
    entities: BTreeMap<EntityKey, OverlayEntity>,
    dropped: usize,
}

impl OverlaySnapshot {
    /// An empty snapshot with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Build a snapshot from entities. A later entity with an existing key
    /// replaces the earlier one.
    pub fn from_entities<I>(version: u64, entities: I) -> Self
    where
        I: IntoIterator<Item = OverlayEntity>,
    {
        let mut snapshot = Self::new(version);
        for entity in entities {
            snapshot.insert(entity);
        }
        snapshot
    }

    /// Record how many backend records were dropped while building this.
    pub fn with_dropped(mut self, dropped: usize) -> Self {
        self.dropped = dropped;
        self
    }

    /// Insert an entity, returning the one it replaced.
    pub fn insert(&mut self, entity: OverlayEntity) -> Option<OverlayEntity> {
        let key = entity.key();
        let previous = self.entities.insert(key.clone(), entity);
        if previous.is_some() {
            debug!(key = %key, "Duplicate entity id in snapshot, keeping latest");
        }
        previous
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&OverlayEntity> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entities.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &OverlayEntity)> {
        self.entities.iter()
    }

    /// Number of entities of one kind.
    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.entities.keys().filter(|key| key.kind == kind).count()
    }

    /// Valid positions of every tracked person that has one.
    pub fn tracked_person_positions(&self) -> Vec<GeoPoint> {
        self.entities
            .values()
            .filter_map(|entity| match entity {
                OverlayEntity::TrackedPerson(person) => person.position,
                _ => None,
            })
            .filter(GeoPoint::is_valid)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::overlay::model::{IncidentMarker, IncidentStatus, Severity, TrackedPerson};

    fn incident(id: &str, severity: Severity) -> OverlayEntity {
        IncidentMarker {
            id: id.to_string(),
            location: GeoPoint::new(1.0, 1.0).unwrap(),
            severity,
            status: IncidentStatus::Reported,
            description: String::new(),
            address: String::new(),
            created_at: Utc::now(),
        }
        .into()
    }

    fn person(id: &str, position: Option<GeoPoint>) -> OverlayEntity {
        TrackedPerson {
            id: id.to_string(),
            name: "X".to_string(),
            position,
            active: true,
            last_updated: Utc::now(),
        }
        .into()
    }

    #[test]
    fn test_duplicate_ids_keep_latest() {
        let snapshot = OverlaySnapshot::from_entities(
            1,
            vec![incident("1", Severity::Low), incident("1", Severity::High)],
        );

        assert_eq!(snapshot.len(), 1);
        let key = EntityKey::new(EntityKind::Incident, "1");
        assert!(matches!(
            snapshot.get(&key),
            Some(OverlayEntity::Incident(i)) if i.severity == Severity::High
        ));
    }

    #[test]
    fn test_same_id_different_kind_are_distinct() {
        let snapshot = OverlaySnapshot::from_entities(
            1,
            vec![incident("1", Severity::Low), person("1", None)],
        );
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.count_of(EntityKind::Incident), 1);
        assert_eq!(snapshot.count_of(EntityKind::TrackedPerson), 1);
    }

    #[test]
    fn test_tracked_person_positions_skip_missing() {
        let here = GeoPoint::new(5.0, 6.0).unwrap();
        let snapshot = OverlaySnapshot::from_entities(
            3,
            vec![
                person("a", Some(here)),
                person("b", None),
                incident("c", Severity::Medium),
            ],
        );

        assert_eq!(snapshot.tracked_person_positions(), vec![here]);
        assert_eq!(snapshot.version(), 3);
    }
}
