use bevy::prelude::*;

use crate::engine::tracking::anchor_state::AnyTargetVisible;

/// What the canvas shows: anchored content over the camera feed, or the
/// same content frozen for free 3D browsing.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum ViewMode {
    #[default]
    Ar,
    Browse3D,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ar => Self::Browse3D,
            Self::Browse3D => Self::Ar,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ar" => Some(Self::Ar),
            "3d" | "browse" => Some(Self::Browse3D),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::Browse3D => "3d",
        }
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewModeRequest {
    Toggle,
    Set(ViewMode),
}

/// The single scene camera, repositioned on view-mode changes.
#[derive(Component)]
pub struct ArCamera;

/// Apply view-mode requests. Browsing is only offered while a target is
/// in view, so there is something to browse.
pub fn transition_view_mode(
    mut requests: EventReader<ViewModeRequest>,
    current: Res<State<ViewMode>>,
    any_visible: Res<AnyTargetVisible>,
    mut next_state: ResMut<NextState<ViewMode>>,
) {
    let mut target = *current.get();
    for request in requests.read() {
        target = match request {
            ViewModeRequest::Toggle => target.toggled(),
            ViewModeRequest::Set(mode) => *mode,
        };
    }
    if target == *current.get() {
        return;
    }

    if target == ViewMode::Browse3D && !any_visible.0 {
        warn!("Ignoring switch to 3D browsing, no target in view");
        return;
    }

    info!("→ Transitioning to {:?} view", target);
    next_state.set(target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::state::app::StatesPlugin;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .init_state::<ViewMode>()
            .init_resource::<AnyTargetVisible>()
            .add_event::<ViewModeRequest>()
            .add_systems(Update, transition_view_mode);
        app
    }

    fn mode(app: &App) -> ViewMode {
        *app.world().resource::<State<ViewMode>>().get()
    }

    #[test]
    fn browsing_requires_a_visible_target() {
        let mut app = app();
        app.world_mut().send_event(ViewModeRequest::Toggle);
        app.update();
        app.update();
        assert_eq!(mode(&app), ViewMode::Ar);

        app.insert_resource(AnyTargetVisible(true));
        app.world_mut().send_event(ViewModeRequest::Toggle);
        app.update();
        app.update();
        assert_eq!(mode(&app), ViewMode::Browse3D);
    }

    #[test]
    fn returning_to_ar_is_always_allowed() {
        let mut app = app();
        app.insert_resource(AnyTargetVisible(true));
        app.world_mut()
            .send_event(ViewModeRequest::Set(ViewMode::Browse3D));
        app.update();
        app.update();

        app.insert_resource(AnyTargetVisible(false));
        app.world_mut().send_event(ViewModeRequest::Set(ViewMode::Ar));
        app.update();
        app.update();
        assert_eq!(mode(&app), ViewMode::Ar);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(ViewMode::from_name("3d"), Some(ViewMode::Browse3D));
        assert_eq!(ViewMode::from_name("ar"), Some(ViewMode::Ar));
        assert_eq!(ViewMode::from_name("vr"), None);
        assert_eq!(ViewMode::Browse3D.toggled().name(), "ar");
    }
}
