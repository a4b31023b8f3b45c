use bevy::prelude::*;
use constants::camera::{AR_CAMERA_POSITION, BROWSE_CAMERA_LOOK_AT, BROWSE_CAMERA_POSITION};

use super::anchor_systems::{AnchorFound, AnchorLost, announce_transition, anchor_visibility};
use super::reconciler::TrackedAnchor;
use crate::engine::core::app_state::{ArCamera, ViewMode};
use crate::engine::tracking::anchor_state::{AnchorStateStore, AnyTargetVisible};
use crate::engine::tracking::driver::SessionRequest;

/// Freeze whatever is in view at the origin and stop tracking, so the
/// content can be inspected without the camera feed.
pub fn enter_browse_mode(
    mut anchors: Query<(&TrackedAnchor, &mut Transform)>,
    mut any_visible: ResMut<AnyTargetVisible>,
    mut requests: EventWriter<SessionRequest>,
) {
    for (anchor, mut transform) in &mut anchors {
        if anchor.is_visible() {
            *transform = Transform::IDENTITY;
        }
    }
    any_visible.set_if_neq(AnyTargetVisible(false));
    requests.write(SessionRequest::Stop);
}

/// Discard the frozen poses before tracking resumes: each anchor that was
/// showing gets the sentinel written through to the store, is hidden and
/// reports lost.
pub fn leave_browse_mode(
    mut commands: Commands,
    mut store: ResMut<AnchorStateStore>,
    mut anchors: Query<(Entity, &mut TrackedAnchor, &mut Visibility)>,
    mut found: EventWriter<AnchorFound>,
    mut lost: EventWriter<AnchorLost>,
    mut requests: EventWriter<SessionRequest>,
) {
    for (entity, mut anchor, mut visibility) in &mut anchors {
        let Some(transition) = anchor.force_lost() else {
            continue;
        };
        store.force_invisible(anchor.index());
        visibility.set_if_neq(anchor_visibility(false));
        announce_transition(
            &mut commands,
            &mut found,
            &mut lost,
            entity,
            anchor.index(),
            transition,
        );
    }
    requests.write(SessionRequest::Start);
}

pub fn apply_camera_preset(
    mode: Res<State<ViewMode>>,
    mut cameras: Query<&mut Transform, With<ArCamera>>,
) {
    let preset = match mode.get() {
        ViewMode::Ar => Transform::from_translation(AR_CAMERA_POSITION),
        ViewMode::Browse3D => Transform::from_translation(BROWSE_CAMERA_POSITION)
            .looking_at(BROWSE_CAMERA_LOOK_AT, Vec3::Y),
    };
    for mut transform in &mut cameras {
        *transform = preset;
    }
}
