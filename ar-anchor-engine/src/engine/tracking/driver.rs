use bevy::prelude::*;
use bevy::tasks::futures_lite::future;

use super::TrackingSystems;
use super::anchor_state::AnchorStateStore;
use super::channel::TrackingChannel;
use super::session::{SessionError, SessionPhase, StartFuture, TrackingSession};
use super::tracker::{ImageTargetTracker, TrackerFactory, VideoSource};
use crate::content::ExperienceReady;
use crate::engine::core::app_state::ViewMode;
use crate::engine::core::settings::ArSettings;
use crate::engine::systems::fatal_error::{FatalError, FatalErrorState};

/// Requests to the session owner. Sent by the view-mode switch, the camera
/// switch and fatal error handling.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRequest {
    Start,
    Stop,
    /// Stop, then start again once a fresh camera stream is ready.
    Restart,
}

/// The camera stream is playing and its size is known.
#[derive(Event, Debug, Clone)]
pub struct CameraReady(pub VideoSource);

/// Camera permission was refused or the device is unusable.
#[derive(Event, Debug, Clone)]
pub struct CameraFailed {
    pub reason: String,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPhaseChanged {
    pub phase: SessionPhase,
}

/// Copy of the session phase readable from any system.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackingPhase(pub SessionPhase);

/// Owns the session and its in-flight start. Lives in the non-send world
/// because tracker futures may hold browser handles.
pub struct SessionDriver<T: ImageTargetTracker> {
    session: TrackingSession<T>,
    pending: Option<StartFuture<T>>,
    video: Option<VideoSource>,
    start_wanted: bool,
    /// Target URL pinned by settings; experiences may not replace it.
    fixed_target: bool,
    /// Set once a fatal error was raised. Only a page reload recovers.
    halted: bool,
}

impl<T: ImageTargetTracker> SessionDriver<T> {
    pub fn new(session: TrackingSession<T>) -> Self {
        let fixed_target = session.target_url().is_some();
        Self {
            session,
            pending: None,
            video: None,
            start_wanted: false,
            fixed_target,
            halted: false,
        }
    }

    fn stop(&mut self) {
        self.start_wanted = false;
        // Dropping the future halts the half-started tracker inside it.
        self.pending = None;
        self.session.stop();
    }

    fn halt(&mut self, fatal: &mut EventWriter<FatalError>, error: FatalError) {
        self.halted = true;
        self.start_wanted = false;
        fatal.write(error);
    }
}

/// Runs one [`TrackingSession`] per app, driven by [`SessionRequest`] and
/// camera events.
pub struct TrackingSessionPlugin<T: ImageTargetTracker> {
    factory: TrackerFactory<T>,
}

impl<T: ImageTargetTracker> TrackingSessionPlugin<T> {
    pub fn new(factory: TrackerFactory<T>) -> Self {
        Self { factory }
    }
}

impl<T: ImageTargetTracker> Plugin for TrackingSessionPlugin<T> {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrackingChannel>()
            .init_resource::<AnchorStateStore>()
            .init_resource::<TrackingPhase>()
            .add_event::<SessionRequest>()
            .add_event::<CameraReady>()
            .add_event::<CameraFailed>()
            .add_event::<SessionPhaseChanged>()
            .add_event::<ExperienceReady>()
            .add_event::<FatalError>();

        let settings = app
            .world()
            .get_resource::<ArSettings>()
            .cloned()
            .unwrap_or_default();
        let channel = app.world().resource::<TrackingChannel>().clone();

        let mut session = TrackingSession::new(settings.tracker, channel, self.factory.clone());
        if let Some(url) = settings.target_url {
            session.set_target_url(url);
        }
        app.insert_non_send_resource(SessionDriver::new(session));

        app.configure_sets(Update, TrackingSystems::Session.before(TrackingSystems::Ingest))
            .add_systems(
                Update,
                (
                    handle_session_requests::<T>,
                    handle_camera_events::<T>,
                    adopt_experience_target::<T>,
                    launch_pending_start::<T>,
                    poll_session_start::<T>,
                    publish_session_phase::<T>,
                )
                    .chain()
                    .in_set(TrackingSystems::Session),
            );
    }
}

fn handle_session_requests<T: ImageTargetTracker>(
    mut driver: NonSendMut<SessionDriver<T>>,
    mut requests: EventReader<SessionRequest>,
    mut store: ResMut<AnchorStateStore>,
) {
    for request in requests.read() {
        debug!("Session request: {:?}", request);
        match request {
            SessionRequest::Start => match driver.session.phase() {
                SessionPhase::Idle | SessionPhase::Stopped => driver.start_wanted = true,
                phase => debug!("Ignoring start while {:?}", phase),
            },
            SessionRequest::Stop => {
                driver.stop();
                store.clear();
            }
            SessionRequest::Restart => {
                driver.stop();
                store.clear();
                // The old stream is gone; wait for the new one.
                driver.video = None;
                driver.start_wanted = true;
            }
        }
    }
}

fn handle_camera_events<T: ImageTargetTracker>(
    mut driver: NonSendMut<SessionDriver<T>>,
    mut ready: EventReader<CameraReady>,
    mut failed: EventReader<CameraFailed>,
    mut fatal: EventWriter<FatalError>,
) {
    for CameraReady(video) in ready.read() {
        info!(
            "Camera ready: {} ({}x{})",
            video.element_id, video.width, video.height
        );
        driver.video = Some(video.clone());
        driver.start_wanted = true;
    }

    for CameraFailed { reason } in failed.read() {
        error!("Camera failure: {}", reason);
        driver.halt(&mut fatal, FatalError::camera(reason));
    }
}

fn adopt_experience_target<T: ImageTargetTracker>(
    mut driver: NonSendMut<SessionDriver<T>>,
    mut experiences: EventReader<ExperienceReady>,
) {
    for experience in experiences.read() {
        if driver.fixed_target {
            debug!(
                "Keeping configured targets over those of \"{}\"",
                experience.name
            );
            continue;
        }
        driver.session.set_target_url(experience.target_url.clone());
    }
}

fn launch_pending_start<T: ImageTargetTracker>(
    mut driver: NonSendMut<SessionDriver<T>>,
    mut fatal: EventWriter<FatalError>,
    view_mode: Option<Res<State<ViewMode>>>,
    fatal_state: Option<Res<FatalErrorState>>,
) {
    let driver = &mut *driver;
    if !driver.start_wanted || driver.pending.is_some() {
        return;
    }
    if driver.halted || fatal_state.is_some_and(|state| state.is_active()) {
        debug!("Ignoring start request while a fatal error awaits reload");
        driver.start_wanted = false;
        return;
    }
    // Browsing suspends tracking; leaving it sends a fresh start request.
    if view_mode.is_some_and(|mode| *mode.get() != ViewMode::Ar) {
        driver.start_wanted = false;
        return;
    }
    if !matches!(
        driver.session.phase(),
        SessionPhase::Idle | SessionPhase::Stopped
    ) {
        driver.start_wanted = false;
        return;
    }
    // Wait until both the camera and the target descriptors are known.
    let Some(video) = driver.video.clone() else {
        return;
    };
    if driver.session.target_url().is_none() {
        return;
    }

    driver.start_wanted = false;
    match driver.session.begin_start(video) {
        Ok(boot) => driver.pending = Some(boot),
        Err(error) => driver.halt(&mut fatal, FatalError::from_session(&error)),
    }
}

fn poll_session_start<T: ImageTargetTracker>(
    mut driver: NonSendMut<SessionDriver<T>>,
    mut fatal: EventWriter<FatalError>,
) {
    let driver = &mut *driver;
    let Some(boot) = driver.pending.as_mut() else {
        return;
    };
    let Some(outcome) = future::block_on(future::poll_once(boot)) else {
        return;
    };

    driver.pending = None;
    if let Err(error) = driver.session.finish_start(outcome) {
        driver.halt(&mut fatal, FatalError::from_session(&error));
    }
}

fn publish_session_phase<T: ImageTargetTracker>(
    driver: NonSend<SessionDriver<T>>,
    mut phase: ResMut<TrackingPhase>,
    mut changes: EventWriter<SessionPhaseChanged>,
) {
    let current = driver.session.phase();
    if phase.0 != current {
        phase.0 = current;
        changes.write(SessionPhaseChanged { phase: current });
    }
}

impl FatalError {
    pub fn from_session(error: &SessionError) -> Self {
        match error {
            SessionError::TargetLoad { .. }
            | SessionError::NoTargets(_)
            | SessionError::MissingTargetUrl => Self::target_load(error.to_string()),
            SessionError::WarmUp(_) | SessionError::InvalidPhase(_) => {
                Self::tracker(error.to_string())
            }
        }
    }
}
