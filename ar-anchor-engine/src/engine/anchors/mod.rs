//! Anchored content: entities whose visibility and pose follow one image
//! target.
//!
//! Each [`reconciler::TrackedAnchor`] compares the store against what it
//! last saw and reports found/lost exactly on edges. The view-mode and
//! camera-facing systems are the only code that writes to the store besides
//! the tracker itself.

use bevy::prelude::*;

use crate::engine::core::app_state::{ViewMode, ViewModeRequest, transition_view_mode};
use crate::engine::tracking::TrackingSystems;
use crate::engine::tracking::anchor_state::{
    AnchorStateStore, AnyTargetVisible, track_any_target_visible,
};
use crate::engine::tracking::channel::{TrackingChannel, apply_tracker_updates};
use crate::engine::tracking::driver::SessionRequest;

pub mod anchor_systems;
pub mod camera_facing;
pub mod reconciler;
pub mod view_mode;

use anchor_systems::{AnchorFound, AnchorLost, reconcile_anchors};
use camera_facing::{CameraFacing, SwitchCamera, handle_switch_camera, mirror_anchor_roots};
use view_mode::{apply_camera_preset, enter_browse_mode, leave_browse_mode};

/// Store ingestion, anchor reconciliation and the view-mode switch.
///
/// Works without a session plugin, in which case tracker results must be
/// sent through [`TrackingChannel`] directly.
pub struct AnchorTrackingPlugin;

impl Plugin for AnchorTrackingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AnchorStateStore>()
            .init_resource::<TrackingChannel>()
            .init_resource::<AnyTargetVisible>()
            .init_resource::<CameraFacing>()
            .init_state::<ViewMode>()
            .add_event::<AnchorFound>()
            .add_event::<AnchorLost>()
            .add_event::<ViewModeRequest>()
            .add_event::<SwitchCamera>()
            .add_event::<SessionRequest>();

        app.configure_sets(
            Update,
            (
                TrackingSystems::Session,
                TrackingSystems::Ingest,
                TrackingSystems::Reconcile,
                TrackingSystems::Notify,
            )
                .chain(),
        );

        app.add_systems(
            Update,
            (handle_switch_camera, mirror_anchor_roots)
                .chain()
                .before(TrackingSystems::Session),
        )
        .add_systems(
            Update,
            (apply_tracker_updates, track_any_target_visible)
                .chain()
                .in_set(TrackingSystems::Ingest),
        )
        .add_systems(
            Update,
            (
                reconcile_anchors.run_if(in_state(ViewMode::Ar)),
                transition_view_mode,
            )
                .in_set(TrackingSystems::Reconcile),
        )
        .add_systems(
            OnEnter(ViewMode::Browse3D),
            (enter_browse_mode, apply_camera_preset),
        )
        .add_systems(
            OnTransition {
                exited: ViewMode::Browse3D,
                entered: ViewMode::Ar,
            },
            leave_browse_mode,
        )
        .add_systems(OnEnter(ViewMode::Ar), apply_camera_preset);
    }
}
