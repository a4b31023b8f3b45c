use bevy::prelude::*;

use super::anchor_systems::AnchorRoot;
use crate::engine::tracking::driver::SessionRequest;

/// Which camera feeds the tracker. The selfie camera shows a mirrored
/// image, so anchored content is mirrored with it.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CameraFacing {
    pub facing_user: bool,
}

impl CameraFacing {
    pub fn is_mirrored(&self) -> bool {
        self.facing_user
    }

    /// `facingMode` constraint for `getUserMedia`.
    pub fn facing_mode(&self) -> &'static str {
        if self.facing_user { "user" } else { "environment" }
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCamera;

/// Flip the camera and restart tracking on the new stream. The host reopens
/// the camera and reports `CameraReady` before the tracker is rebuilt.
pub fn handle_switch_camera(
    mut switches: EventReader<SwitchCamera>,
    mut facing: ResMut<CameraFacing>,
    mut requests: EventWriter<SessionRequest>,
) {
    let count = switches.read().count();
    if count % 2 == 0 {
        return;
    }

    facing.facing_user = !facing.facing_user;
    info!("Switching to the {} camera", facing.facing_mode());
    requests.write(SessionRequest::Restart);
}

pub fn mirror_anchor_roots(
    facing: Res<CameraFacing>,
    mut roots: Query<&mut Transform, With<AnchorRoot>>,
) {
    let scale_x = if facing.is_mirrored() { -1.0 } else { 1.0 };
    for mut transform in &mut roots {
        if transform.scale.x != scale_x {
            transform.scale.x = scale_x;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::anchors::AnchorTrackingPlugin;
    use crate::engine::anchors::anchor_systems::spawn_anchor;
    use bevy::ecs::system::RunSystemOnce;
    use bevy::state::app::StatesPlugin;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin, AnchorTrackingPlugin));
        app
    }

    fn requests(app: &mut App) -> Vec<SessionRequest> {
        app.world_mut()
            .resource_mut::<Events<SessionRequest>>()
            .drain()
            .collect()
    }

    #[test]
    fn switching_mirrors_roots_and_restarts() {
        let mut app = app();
        let anchor = app
            .world_mut()
            .run_system_once(|mut commands: Commands| spawn_anchor(&mut commands, 0))
            .unwrap();
        let root = app.world().get::<ChildOf>(anchor).unwrap().parent();
        app.update();
        assert_eq!(app.world().get::<Transform>(root).unwrap().scale.x, 1.0);

        app.world_mut().send_event(SwitchCamera);
        app.update();

        assert!(app.world().resource::<CameraFacing>().facing_user);
        assert_eq!(app.world().get::<Transform>(root).unwrap().scale.x, -1.0);
        assert_eq!(requests(&mut app), vec![SessionRequest::Restart]);
    }

    #[test]
    fn double_switch_in_one_frame_cancels_out() {
        let mut app = app();
        app.world_mut().send_event(SwitchCamera);
        app.world_mut().send_event(SwitchCamera);
        app.update();

        assert_eq!(
            *app.world().resource::<CameraFacing>(),
            CameraFacing::default()
        );
        assert!(requests(&mut app).is_empty());
    }

    #[test]
    fn facing_mode_names() {
        assert_eq!(CameraFacing::default().facing_mode(), "environment");
        assert_eq!(CameraFacing { facing_user: true }.facing_mode(), "user");
    }
}
