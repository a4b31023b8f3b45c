use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use constants::camera::AR_CAMERA_POSITION;

use crate::content::ContentPlugin;
use crate::engine::anchors::AnchorTrackingPlugin;
use crate::engine::core::app_state::ArCamera;
use crate::engine::core::settings::ArSettings;
use crate::engine::core::window_config::create_window_config;
use crate::engine::systems::fatal_error::FatalErrorPlugin;
use crate::engine::tracking::driver::TrackingSessionPlugin;
use crate::rpc::tracker_bridge::{BridgeLink, PostMessageTracker};
use crate::rpc::web_rpc::WebRpcPlugin;

pub fn create_app() -> App {
    let mut app = App::new();
    let bridge = BridgeLink::default();

    app.add_plugins(create_default_plugins())
        // The camera feed shows through the canvas.
        .insert_resource(ClearColor(Color::NONE))
        .init_resource::<ArSettings>()
        .insert_resource(bridge.clone());

    app.add_plugins(WebRpcPlugin)
        .add_plugins(AnchorTrackingPlugin)
        .add_plugins(TrackingSessionPlugin::<PostMessageTracker>::new(
            bridge.factory(),
        ))
        .add_plugins(FatalErrorPlugin)
        .add_plugins(ContentPlugin);

    app.add_systems(Startup, setup);

    app
}

fn spawn_lighting(commands: &mut Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

fn spawn_ar_camera(commands: &mut Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(AR_CAMERA_POSITION),
        ArCamera,
    ));
}

// Startup system that only handles basic initialisation
fn setup(mut commands: Commands) {
    spawn_lighting(&mut commands);
    spawn_ar_camera(&mut commands);
    info!("AR anchor engine ready, waiting for the camera stream");
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
