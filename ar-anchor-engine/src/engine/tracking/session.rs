use std::future::Future;
use std::pin::Pin;

use bevy::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::channel::{TrackerSink, TrackingChannel};
use super::matrix::TargetDimensions;
use super::tracker::{ImageTargetTracker, TrackerError, TrackerFactory, TrackerOptions, VideoSource};

/// Lifecycle of a tracking session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No tracker exists yet.
    #[default]
    Idle,
    /// Tracker constructed; descriptors loading or warm-up running.
    Starting,
    /// Tracker is fed frames by its own loop.
    Tracking,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("cannot start a session that is {0:?}")]
    InvalidPhase(SessionPhase),
    #[error("no image target URL configured")]
    MissingTargetUrl,
    #[error("failed to load image targets from {url}: {source}")]
    TargetLoad {
        url: String,
        #[source]
        source: TrackerError,
    },
    #[error("target file {0} contains no image targets")]
    NoTargets(String),
    #[error("tracker warm-up failed: {0}")]
    WarmUp(#[source] TrackerError),
}

/// A tracker that is halted when dropped, unless it was stopped already.
///
/// A start future owns one of these, so cancelling the start or failing it
/// part way still sends the engine its `stop_process_video`.
struct TrackerHandle<T: ImageTargetTracker> {
    tracker: T,
    stopped: bool,
}

impl<T: ImageTargetTracker> TrackerHandle<T> {
    fn new(tracker: T) -> Self {
        Self {
            tracker,
            stopped: false,
        }
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.tracker.stop_process_video();
        }
    }
}

impl<T: ImageTargetTracker> Drop for TrackerHandle<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A started tracker, produced by the start future.
pub struct BootedTracker<T: ImageTargetTracker> {
    tracker: TrackerHandle<T>,
    dimensions: Vec<TargetDimensions>,
    generation: u64,
}

pub type StartFuture<T> = Pin<Box<dyn Future<Output = Result<BootedTracker<T>, SessionError>>>>;

/// One tracker's lifetime from construction to `stop_process_video`.
///
/// Only one tracker feeds the [`TrackingChannel`] at a time: every start
/// opens a fresh sink generation and every stop closes it.
pub struct TrackingSession<T: ImageTargetTracker> {
    options: TrackerOptions,
    target_url: Option<String>,
    channel: TrackingChannel,
    factory: TrackerFactory<T>,
    phase: SessionPhase,
    tracker: Option<TrackerHandle<T>>,
    dimensions: Vec<TargetDimensions>,
    pending_generation: Option<u64>,
}

impl<T: ImageTargetTracker> TrackingSession<T> {
    pub fn new(options: TrackerOptions, channel: TrackingChannel, factory: TrackerFactory<T>) -> Self {
        Self {
            options,
            target_url: None,
            channel,
            factory,
            phase: SessionPhase::Idle,
            tracker: None,
            dimensions: Vec::new(),
            pending_generation: None,
        }
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    /// Takes effect on the next start.
    pub fn set_target_url(&mut self, url: impl Into<String>) {
        self.target_url = Some(url.into());
    }

    pub fn target_url(&self) -> Option<&str> {
        self.target_url.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    /// Sizes of the loaded targets, in target-index order.
    pub fn target_dimensions(&self) -> &[TargetDimensions] {
        &self.dimensions
    }

    pub fn projection_matrix(&self) -> Option<[f32; 16]> {
        self.tracker.as_ref()?.tracker.projection_matrix()
    }

    /// Construct the tracker and return the future that loads targets and
    /// warms it up. The caller awaits it and hands the result to
    /// [`Self::finish_start`].
    pub fn begin_start(&mut self, video: VideoSource) -> Result<StartFuture<T>, SessionError> {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Stopped => {}
            phase => return Err(SessionError::InvalidPhase(phase)),
        }
        let target_url = self
            .target_url
            .clone()
            .ok_or(SessionError::MissingTargetUrl)?;

        // The tracker reads frames at the stream's native size.
        self.options.input_width = video.width;
        self.options.input_height = video.height;

        let sink = self.channel.open_sink();
        let tracker = (self.factory)(&self.options, sink.clone());

        self.pending_generation = Some(sink.generation());
        self.dimensions.clear();
        self.phase = SessionPhase::Starting;
        info!("Starting image tracking with targets from {}", target_url);

        Ok(Box::pin(boot_tracker(
            TrackerHandle::new(tracker),
            target_url,
            video,
            sink,
        )))
    }

    /// Adopt the outcome of a start future.
    ///
    /// Outcomes from a start that has since been stopped or superseded are
    /// discarded and their tracker halted. Dropping the future instead has
    /// the same effect on the tracker.
    pub fn finish_start(
        &mut self,
        outcome: Result<BootedTracker<T>, SessionError>,
    ) -> Result<(), SessionError> {
        match outcome {
            Ok(mut booted) => {
                if self.phase != SessionPhase::Starting
                    || self.pending_generation != Some(booted.generation)
                {
                    debug!("Discarding tracker from a cancelled start");
                    booted.tracker.stop();
                    return Ok(());
                }
                info!(
                    "Image tracking started with {} target(s)",
                    booted.dimensions.len()
                );
                self.pending_generation = None;
                self.dimensions = booted.dimensions;
                self.tracker = Some(booted.tracker);
                self.phase = SessionPhase::Tracking;
                Ok(())
            }
            Err(error) => {
                if self.phase == SessionPhase::Starting {
                    error!("Image tracking failed to start: {}", error);
                    self.pending_generation = None;
                    self.channel.close();
                    self.phase = SessionPhase::Stopped;
                }
                Err(error)
            }
        }
    }

    pub async fn start(&mut self, video: VideoSource) -> Result<(), SessionError> {
        let boot = self.begin_start(video)?;
        let outcome = boot.await;
        self.finish_start(outcome)
    }

    /// Halt processing. Safe to call repeatedly and before any start.
    pub fn stop(&mut self) {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Stopped => return,
            SessionPhase::Starting | SessionPhase::Tracking => {}
        }

        if let Some(mut tracker) = self.tracker.take() {
            tracker.stop();
        }
        self.channel.close();
        self.pending_generation = None;
        self.phase = SessionPhase::Stopped;
        info!("Image tracking stopped");
    }

    /// Tear down and start again, strictly in sequence.
    pub async fn restart(&mut self, video: VideoSource) -> Result<(), SessionError> {
        self.stop();
        self.start(video).await
    }
}

async fn boot_tracker<T: ImageTargetTracker>(
    mut handle: TrackerHandle<T>,
    target_url: String,
    video: VideoSource,
    sink: TrackerSink,
) -> Result<BootedTracker<T>, SessionError> {
    let tracker = &mut handle.tracker;

    let dimensions = tracker
        .add_image_targets(&target_url)
        .await
        .map_err(|source| SessionError::TargetLoad {
            url: target_url.clone(),
            source,
        })?;
    if dimensions.is_empty() {
        return Err(SessionError::NoTargets(target_url));
    }
    sink.set_target_dimensions(&dimensions);

    tracker.dummy_run(&video).await.map_err(SessionError::WarmUp)?;
    tracker.process_video(&video);

    Ok(BootedTracker {
        tracker: handle,
        dimensions,
        generation: sink.generation(),
    })
}

#[cfg(test)]
mod tests {
    use bevy::tasks::futures_lite::future::block_on;

    use super::*;
    use crate::engine::tracking::channel::TrackerUpdate;
    use crate::engine::tracking::matrix::WorldMatrix;
    use crate::engine::tracking::testing::{ScriptedTracker, TrackerCall, TrackerScript, video};

    fn session(script: TrackerScript) -> TrackingSession<ScriptedTracker> {
        TrackingSession::new(
            TrackerOptions::default(),
            TrackingChannel::default(),
            script.factory(),
        )
        .with_target_url("/targets.mind")
    }

    #[test]
    fn start_loads_targets_warms_up_then_tracks() {
        let script = TrackerScript::with_targets(2);
        let mut session = session(script.clone());

        block_on(session.start(video(1280, 720))).unwrap();

        assert_eq!(session.phase(), SessionPhase::Tracking);
        assert_eq!(session.target_dimensions().len(), 2);
        assert_eq!(session.options().input_width, 1280);
        assert_eq!(
            script.calls(),
            vec![
                TrackerCall::Created { input_width: 1280 },
                TrackerCall::AddImageTargets("/targets.mind".into()),
                TrackerCall::DummyRun,
                TrackerCall::ProcessVideo,
            ]
        );
    }

    #[test]
    fn target_load_failure_is_fatal_not_stuck_starting() {
        let script = TrackerScript::failing_targets(TrackerError::Network("404".into()));
        let mut session = session(script.clone());

        let error = block_on(session.start(video(640, 480))).unwrap_err();

        assert!(matches!(error, SessionError::TargetLoad { .. }));
        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert!(!script.calls().contains(&TrackerCall::ProcessVideo));
    }

    #[test]
    fn empty_target_file_is_rejected() {
        let mut session = session(TrackerScript::with_targets(0));
        let error = block_on(session.start(video(640, 480))).unwrap_err();
        assert_eq!(error, SessionError::NoTargets("/targets.mind".into()));
        assert_eq!(session.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn warm_up_failure_stops_session() {
        let script = TrackerScript::with_targets(1).with_warmup_error(TrackerError::Unavailable);
        let mut session = session(script);
        let error = block_on(session.start(video(640, 480))).unwrap_err();
        assert_eq!(error, SessionError::WarmUp(TrackerError::Unavailable));
        assert_eq!(session.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn stop_is_idempotent_and_safe_before_start() {
        let script = TrackerScript::with_targets(1);
        let mut session = session(script.clone());

        session.stop();
        session.stop();
        assert_eq!(session.phase(), SessionPhase::Idle);

        block_on(session.start(video(640, 480))).unwrap();
        session.stop();
        session.stop();

        assert_eq!(session.phase(), SessionPhase::Stopped);
        let stops = script
            .calls()
            .into_iter()
            .filter(|call| *call == TrackerCall::StopProcessVideo)
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn start_requires_idle_or_stopped() {
        let mut session = session(TrackerScript::with_targets(1));
        block_on(session.start(video(640, 480))).unwrap();
        let error = block_on(session.start(video(640, 480))).unwrap_err();
        assert_eq!(error, SessionError::InvalidPhase(SessionPhase::Tracking));
    }

    #[test]
    fn start_without_target_url_fails_fast() {
        let script = TrackerScript::with_targets(1);
        let mut session = TrackingSession::new(
            TrackerOptions::default(),
            TrackingChannel::default(),
            script.factory(),
        );
        let error = block_on(session.start(video(640, 480))).unwrap_err();
        assert_eq!(error, SessionError::MissingTargetUrl);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(script.calls().is_empty());
    }

    #[test]
    fn restart_silences_previous_tracker() {
        let script = TrackerScript::with_targets(1);
        let channel = TrackingChannel::default();
        let mut session =
            TrackingSession::new(TrackerOptions::default(), channel.clone(), script.factory())
                .with_target_url("/targets.mind");

        block_on(session.start(video(640, 480))).unwrap();
        let first_sink = script.last_sink().unwrap();

        block_on(session.restart(video(480, 640))).unwrap();
        let second_sink = script.last_sink().unwrap();

        let pose = TrackerUpdate::UpdateMatrix {
            target_index: 0,
            world_matrix: Some(WorldMatrix::IDENTITY.to_cols_array().to_vec()),
        };
        assert!(!first_sink.send(pose.clone()));
        assert!(second_sink.send(pose));
        assert_eq!(channel.drain().len(), 1);
        assert_eq!(session.options().input_height, 640);
    }

    #[test]
    fn cancelled_start_discards_its_tracker() {
        let script = TrackerScript::with_targets(1);
        let mut session = session(script.clone());

        let boot = session.begin_start(video(640, 480)).unwrap();
        assert_eq!(session.phase(), SessionPhase::Starting);
        session.stop();

        let outcome = block_on(boot);
        session.finish_start(outcome).unwrap();

        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert!(session.projection_matrix().is_none());
        assert_eq!(script.calls().last(), Some(&TrackerCall::StopProcessVideo));
    }

    #[test]
    fn superseded_start_does_not_replace_newer_one() {
        let script = TrackerScript::with_targets(1);
        let mut session = session(script.clone());

        let stale = session.begin_start(video(640, 480)).unwrap();
        session.stop();
        let fresh = session.begin_start(video(640, 480)).unwrap();

        let stale_outcome = block_on(stale);
        session.finish_start(stale_outcome).unwrap();
        assert_eq!(session.phase(), SessionPhase::Starting);

        let fresh_outcome = block_on(fresh);
        session.finish_start(fresh_outcome).unwrap();
        assert_eq!(session.phase(), SessionPhase::Tracking);
    }

    #[test]
    fn dropping_a_start_in_flight_halts_its_tracker() {
        let script = TrackerScript::with_targets(1).with_pending_polls(3);
        let mut session = session(script.clone());

        let boot = session.begin_start(video(640, 480)).unwrap();
        session.stop();
        drop(boot);

        assert_eq!(
            script.calls(),
            vec![
                TrackerCall::Created { input_width: 640 },
                TrackerCall::StopProcessVideo,
            ]
        );
    }

    #[test]
    fn failed_start_halts_its_tracker_once() {
        let script = TrackerScript::failing_targets(TrackerError::Network("404".into()));
        let mut session = session(script.clone());

        block_on(session.start(video(640, 480))).unwrap_err();
        session.stop();

        let stops = script
            .calls()
            .into_iter()
            .filter(|call| *call == TrackerCall::StopProcessVideo)
            .count();
        assert_eq!(stops, 1);
    }
}
