use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::prelude::*;

use super::matrix::{TargetIndex, WorldMatrix};

/// Latest pose per target for the current tracking session.
///
/// Entries appear on the first update for an index and then always hold
/// either a live matrix or [`WorldMatrix::INVISIBLE`]. Writes are
/// copy-on-write, so a snapshot taken before a write never observes it.
#[derive(Resource, Debug, Default, Clone)]
pub struct AnchorStateStore {
    targets: Arc<BTreeMap<TargetIndex, WorldMatrix>>,
    version: u64,
}

impl AnchorStateStore {
    /// Record the tracker's latest result for one target. `None` means the
    /// tracker lost it and stores the sentinel.
    pub fn update(&mut self, index: TargetIndex, matrix: Option<WorldMatrix>) {
        let value = matrix.unwrap_or(WorldMatrix::INVISIBLE);
        Arc::make_mut(&mut self.targets).insert(index, value);
        self.version += 1;
    }

    /// Discard any stale pose for `index`. Only the view-mode switch writes
    /// through this path; everything else comes from the tracker.
    pub fn force_invisible(&mut self, index: TargetIndex) {
        self.update(index, None);
    }

    /// Drop every entry on session teardown.
    pub fn clear(&mut self) {
        if self.targets.is_empty() {
            return;
        }
        self.targets = Arc::default();
        self.version += 1;
    }

    pub fn snapshot(&self) -> AnchorSnapshot {
        AnchorSnapshot {
            targets: Arc::clone(&self.targets),
            version: self.version,
        }
    }

    pub fn get(&self, index: TargetIndex) -> Option<WorldMatrix> {
        self.targets.get(&index).copied()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_any_target_visible(&self) -> bool {
        self.targets.values().any(|matrix| !matrix.is_invisible())
    }
}

/// How a snapshot sees a single target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetTracking {
    /// No update has arrived for this index yet.
    Unseen,
    /// The latest update was the invisible sentinel.
    Lost,
    Tracked(WorldMatrix),
}

/// Immutable view of the store at one version.
#[derive(Debug, Clone, Default)]
pub struct AnchorSnapshot {
    targets: Arc<BTreeMap<TargetIndex, WorldMatrix>>,
    version: u64,
}

impl AnchorSnapshot {
    pub fn get(&self, index: TargetIndex) -> Option<&WorldMatrix> {
        self.targets.get(&index)
    }

    pub fn tracking_state(&self, index: TargetIndex) -> TargetTracking {
        match self.targets.get(&index) {
            None => TargetTracking::Unseen,
            Some(matrix) if matrix.is_invisible() => TargetTracking::Lost,
            Some(matrix) => TargetTracking::Tracked(*matrix),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetIndex, &WorldMatrix)> {
        self.targets.iter().map(|(index, matrix)| (*index, matrix))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Whether any target currently has a live pose. Drives the scanning hint
/// and gates the switch into 3D browsing.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnyTargetVisible(pub bool);

pub fn track_any_target_visible(
    store: Res<AnchorStateStore>,
    mut any_visible: ResMut<AnyTargetVisible>,
) {
    if store.is_changed() {
        any_visible.set_if_neq(AnyTargetVisible(store.is_any_target_visible()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(seed: f32) -> WorldMatrix {
        let mut values = WorldMatrix::IDENTITY.to_cols_array();
        values[12] = seed;
        WorldMatrix::from_cols_array(values)
    }

    #[test]
    fn last_write_wins_per_index() {
        let mut store = AnchorStateStore::default();
        store.update(0, Some(live(1.0)));
        store.update(1, Some(live(10.0)));
        store.update(0, None);
        store.update(2, Some(live(20.0)));
        store.update(1, Some(live(11.0)));
        store.update(0, Some(live(2.0)));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get(0), Some(&live(2.0)));
        assert_eq!(snapshot.get(1), Some(&live(11.0)));
        assert_eq!(snapshot.get(2), Some(&live(20.0)));
    }

    #[test]
    fn update_round_trips_exactly_and_leaves_others_alone() {
        let mut store = AnchorStateStore::default();
        store.update(1, Some(live(5.0)));
        store.update(7, None);

        let m = WorldMatrix::from_cols_array([
            0.1, -0.2, 0.3, 0.0, 1e-7, 2.5, -3.25, 0.0, 0.0, 0.5, 0.75, 0.0, 12.0, -4.0, 9.5, 1.0,
        ]);
        store.update(3, Some(m));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.get(3).map(|m| m.to_cols_array()), Some(m.to_cols_array()));
        assert_eq!(snapshot.get(1), Some(&live(5.0)));
        assert_eq!(snapshot.get(7), Some(&WorldMatrix::INVISIBLE));
    }

    #[test]
    fn null_update_stores_sentinel() {
        let mut store = AnchorStateStore::default();
        store.update(4, None);
        assert_eq!(store.get(4), Some(WorldMatrix::INVISIBLE));
        assert_eq!(store.snapshot().tracking_state(4), TargetTracking::Lost);
        assert_eq!(store.snapshot().tracking_state(5), TargetTracking::Unseen);
    }

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let mut store = AnchorStateStore::default();
        store.update(0, Some(live(1.0)));
        let before = store.snapshot();

        store.update(0, None);
        store.update(1, Some(live(2.0)));

        assert_eq!(before.get(0), Some(&live(1.0)));
        assert!(before.get(1).is_none());
        assert!(before.version() < store.version());
    }

    #[test]
    fn version_counts_writes_and_clears() {
        let mut store = AnchorStateStore::default();
        assert_eq!(store.version(), 0);
        store.update(0, None);
        store.force_invisible(0);
        assert_eq!(store.version(), 2);

        store.clear();
        assert_eq!(store.version(), 3);
        assert!(store.snapshot().is_empty());

        // Clearing an empty store is not a change.
        store.clear();
        assert_eq!(store.version(), 3);
    }

    #[test]
    fn any_visible_ignores_sentinels() {
        let mut store = AnchorStateStore::default();
        assert!(!store.is_any_target_visible());
        store.update(0, None);
        assert!(!store.is_any_target_visible());
        store.update(1, Some(live(0.0)));
        assert!(store.is_any_target_visible());
    }
}
