use std::fmt::Display;
use std::time::Duration;

use bevy::prelude::*;
use constants::session::{CAMERA_PERMISSION_MESSAGE, TARGET_LOAD_MESSAGE};
use serde::Serialize;

use crate::engine::core::settings::ArSettings;
use crate::engine::tracking::anchor_state::AnchorStateStore;
use crate::engine::tracking::driver::SessionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalErrorKind {
    Camera,
    TargetLoad,
    Tracker,
}

/// A session-level failure. The only recovery is a page reload.
#[derive(Event, Debug, Clone, PartialEq, Serialize)]
pub struct FatalError {
    pub kind: FatalErrorKind,
    /// Message shown to the user.
    pub description: String,
    /// Underlying cause, for logs and the host page.
    pub detail: String,
}

impl FatalError {
    pub fn camera(reason: impl Display) -> Self {
        Self {
            kind: FatalErrorKind::Camera,
            description: CAMERA_PERMISSION_MESSAGE.to_string(),
            detail: reason.to_string(),
        }
    }

    pub fn target_load(reason: impl Display) -> Self {
        Self {
            kind: FatalErrorKind::TargetLoad,
            description: TARGET_LOAD_MESSAGE.to_string(),
            detail: reason.to_string(),
        }
    }

    pub fn tracker(reason: impl Display) -> Self {
        let detail = reason.to_string();
        Self {
            kind: FatalErrorKind::Tracker,
            description: detail.clone(),
            detail,
        }
    }
}

struct ActiveFatalError {
    error: FatalError,
    countdown: Timer,
    reload_sent: bool,
}

/// The first fatal error of the page and its reload countdown. Later errors
/// are logged but do not restart the countdown.
#[derive(Resource, Default)]
pub struct FatalErrorState {
    active: Option<ActiveFatalError>,
}

impl FatalErrorState {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn error(&self) -> Option<&FatalError> {
        self.active.as_ref().map(|active| &active.error)
    }

    /// Seconds left before reload, rounded up for display.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.active
            .as_ref()
            .map(|active| active.countdown.remaining_secs().ceil() as u32)
    }
}

/// Asks the host to reload the page.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadRequested;

pub struct FatalErrorPlugin;

impl Plugin for FatalErrorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FatalErrorState>()
            .init_resource::<AnchorStateStore>()
            .add_event::<FatalError>()
            .add_event::<ReloadRequested>()
            .add_event::<SessionRequest>()
            .add_systems(
                Update,
                (handle_fatal_errors, tick_reload_countdown, reload_page).chain(),
            );
    }
}

pub fn handle_fatal_errors(
    mut errors: EventReader<FatalError>,
    mut state: ResMut<FatalErrorState>,
    settings: Option<Res<ArSettings>>,
    mut requests: EventWriter<SessionRequest>,
    mut store: ResMut<AnchorStateStore>,
) {
    for error in errors.read() {
        if state.is_active() {
            warn!("Additional fatal error ignored: {}", error.detail);
            continue;
        }

        error!("Fatal {:?} error: {}", error.kind, error.detail);
        let countdown_secs = settings
            .as_ref()
            .map(|settings| settings.reload_countdown_secs)
            .unwrap_or_else(|| ArSettings::default().reload_countdown_secs);

        state.active = Some(ActiveFatalError {
            error: error.clone(),
            countdown: Timer::new(Duration::from_secs_f32(countdown_secs), TimerMode::Once),
            reload_sent: false,
        });
        requests.write(SessionRequest::Stop);
        store.clear();
    }
}

pub fn tick_reload_countdown(
    time: Res<Time>,
    mut state: ResMut<FatalErrorState>,
    mut reloads: EventWriter<ReloadRequested>,
) {
    let Some(active) = state.active.as_mut() else {
        return;
    };
    if active.reload_sent {
        return;
    }

    active.countdown.tick(time.delta());
    if active.countdown.finished() {
        info!("Reload countdown elapsed, reloading");
        active.reload_sent = true;
        reloads.write(ReloadRequested);
    }
}

fn reload_page(mut reloads: EventReader<ReloadRequested>) {
    if reloads.read().last().is_none() {
        return;
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.location().reload() {
                error!("Failed to reload page: {:?}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        debug!("Page reload requested on a native build, nothing to do");
    }
}
