use bevy::prelude::*;

use super::reconciler::{AnchorTransition, TrackedAnchor};
use crate::engine::tracking::anchor_state::AnchorStateStore;
use crate::engine::tracking::matrix::TargetIndex;

/// A target came into view. Sent as a global event and triggered on the
/// anchor entity for per-anchor observers.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorFound {
    pub anchor: Entity,
    pub index: TargetIndex,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorLost {
    pub anchor: Entity,
    pub index: TargetIndex,
}

/// Parent of a [`TrackedAnchor`]. Carries the selfie-camera mirroring so the
/// anchor's own transform is exactly the tracked pose.
#[derive(Component, Debug, Default)]
pub struct AnchorRoot;

/// Spawn an anchor for `index` under a fresh [`AnchorRoot`]. Returns the
/// anchor entity, which content should be parented to.
pub fn spawn_anchor(commands: &mut Commands, index: TargetIndex) -> Entity {
    let root = commands
        .spawn((
            AnchorRoot,
            Transform::default(),
            Visibility::default(),
            Name::new(format!("Anchor root {}", index)),
        ))
        .id();

    commands
        .spawn((
            TrackedAnchor::new(index),
            Transform::default(),
            Visibility::Hidden,
            Name::new(format!("Anchor {}", index)),
            ChildOf(root),
        ))
        .id()
}

pub fn anchor_visibility(visible: bool) -> Visibility {
    if visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

/// Deliver a transition to global readers and the anchor's observers.
pub fn announce_transition(
    commands: &mut Commands,
    found: &mut EventWriter<AnchorFound>,
    lost: &mut EventWriter<AnchorLost>,
    anchor: Entity,
    index: TargetIndex,
    transition: AnchorTransition,
) {
    match transition {
        AnchorTransition::Found => {
            info!("Target {} found", index);
            let event = AnchorFound { anchor, index };
            found.write(event);
            commands.trigger_targets(event, anchor);
        }
        AnchorTransition::Lost => {
            info!("Target {} lost", index);
            let event = AnchorLost { anchor, index };
            lost.write(event);
            commands.trigger_targets(event, anchor);
        }
    }
}

/// Bring every anchor up to date with the store. Anchors that already saw
/// the current version are skipped.
pub fn reconcile_anchors(
    mut commands: Commands,
    store: Res<AnchorStateStore>,
    mut anchors: Query<(Entity, &mut TrackedAnchor, &mut Transform, &mut Visibility)>,
    mut found: EventWriter<AnchorFound>,
    mut lost: EventWriter<AnchorLost>,
) {
    let version = store.version();
    let mut snapshot = None;

    for (entity, mut anchor, mut transform, mut visibility) in &mut anchors {
        if !anchor.needs_reconcile(version) {
            continue;
        }
        let snapshot = snapshot.get_or_insert_with(|| store.snapshot());
        let outcome = anchor.reconcile(snapshot);

        if let Some(pose) = outcome.pose {
            *transform = pose.to_transform();
        }
        visibility.set_if_neq(anchor_visibility(outcome.visible));

        if let Some(transition) = outcome.transition {
            announce_transition(
                &mut commands,
                &mut found,
                &mut lost,
                entity,
                anchor.index(),
                transition,
            );
        }
    }
}
