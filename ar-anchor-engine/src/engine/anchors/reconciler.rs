use bevy::prelude::*;

use crate::engine::tracking::anchor_state::{AnchorSnapshot, TargetTracking};
use crate::engine::tracking::matrix::{TargetIndex, WorldMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorTransition {
    Found,
    Lost,
}

/// Result of reconciling one anchor against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub visible: bool,
    /// Pose to apply. `None` leaves the last pose in place.
    pub pose: Option<WorldMatrix>,
    /// Set only when visibility flipped.
    pub transition: Option<AnchorTransition>,
}

/// Content bound to one image target.
///
/// Starts hidden. Visibility follows the store: a live matrix shows the
/// anchor, while an absent entry or the invisible sentinel hides it.
/// Transitions are reported once per flip.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct TrackedAnchor {
    index: TargetIndex,
    visible: bool,
    seen_version: Option<u64>,
}

impl TrackedAnchor {
    pub fn new(index: TargetIndex) -> Self {
        Self {
            index,
            visible: false,
            seen_version: None,
        }
    }

    pub fn index(&self) -> TargetIndex {
        self.index
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the store changed since this anchor last looked at it.
    pub fn needs_reconcile(&self, store_version: u64) -> bool {
        self.seen_version != Some(store_version)
    }

    pub fn reconcile(&mut self, snapshot: &AnchorSnapshot) -> Reconciliation {
        self.seen_version = Some(snapshot.version());

        match snapshot.tracking_state(self.index) {
            TargetTracking::Tracked(pose) => Reconciliation {
                visible: true,
                pose: Some(pose),
                transition: self.flip(true),
            },
            // Never seen and explicitly lost are the same to an anchor.
            TargetTracking::Unseen | TargetTracking::Lost => Reconciliation {
                visible: false,
                pose: None,
                transition: self.flip(false),
            },
        }
    }

    /// Mark the anchor lost without consulting the store.
    pub fn force_lost(&mut self) -> Option<AnchorTransition> {
        self.flip(false)
    }

    fn flip(&mut self, visible: bool) -> Option<AnchorTransition> {
        if self.visible == visible {
            return None;
        }
        self.visible = visible;
        Some(if visible {
            AnchorTransition::Found
        } else {
            AnchorTransition::Lost
        })
    }
}
