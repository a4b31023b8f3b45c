use std::future::Future;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::tracking::channel::{TrackerSink, TrackerUpdate};
use crate::engine::tracking::matrix::TargetDimensions;
use crate::engine::tracking::tracker::{
    ImageTargetTracker, TrackerError, TrackerFactory, TrackerOptions, VideoSource,
};

/// Instruction for the page-side tracking engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TrackerCommand {
    Create { options: TrackerOptions },
    AddImageTargets { url: String },
    DummyRun { video: VideoSource },
    ProcessVideo { video: VideoSource },
    Stop,
}

/// A command tagged with the tracker instance it is meant for. Replies
/// echo the generation so late answers for a replaced tracker are dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerCommandMessage {
    pub generation: u64,
    #[serde(flatten)]
    pub command: TrackerCommand,
}

/// Failure reported by the page for an async tracker call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BridgeFailure {
    #[serde(default)]
    pub kind: Option<String>,
    pub message: String,
}

impl From<BridgeFailure> for TrackerError {
    fn from(failure: BridgeFailure) -> Self {
        match failure.kind.as_deref() {
            Some("network") => TrackerError::Network(failure.message),
            Some("malformed") => TrackerError::MalformedTargets(failure.message),
            _ => TrackerError::Rejected(failure.message),
        }
    }
}

#[derive(Default)]
struct BridgeState {
    generation: u64,
    sink: Option<TrackerSink>,
    commands: Vec<TrackerCommandMessage>,
    targets_reply: Option<Result<Vec<TargetDimensions>, TrackerError>>,
    warmup_reply: Option<Result<(), TrackerError>>,
    projection: Option<[f32; 16]>,
    waker: Option<Waker>,
}

impl BridgeState {
    fn accepts(&self, generation: Option<u64>) -> bool {
        generation.is_none_or(|generation| generation == self.generation)
    }

    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

/// Shared state between [`PostMessageTracker`] and the RPC handlers that
/// carry the page's replies.
#[derive(Resource, Clone, Default)]
pub struct BridgeLink {
    inner: Arc<Mutex<BridgeState>>,
}

impl BridgeLink {
    pub fn factory(&self) -> TrackerFactory<PostMessageTracker> {
        let link = self.clone();
        Arc::new(move |options: &TrackerOptions, sink: TrackerSink| {
            let generation = sink.generation();
            if let Ok(mut state) = link.inner.lock() {
                state.generation = generation;
                state.sink = Some(sink);
                state.targets_reply = None;
                state.warmup_reply = None;
                state.projection = None;
            }
            link.push(
                generation,
                TrackerCommand::Create {
                    options: options.clone(),
                },
            );
            PostMessageTracker {
                link: link.clone(),
                generation,
            }
        })
    }

    /// Commands queued since the last call, oldest first.
    pub fn take_commands(&self) -> Vec<TrackerCommandMessage> {
        match self.inner.lock() {
            Ok(mut state) => std::mem::take(&mut state.commands),
            Err(_) => Vec::new(),
        }
    }

    /// Pass an `onUpdate` payload to the current tracker's sink.
    pub fn forward_update(&self, update: TrackerUpdate) -> bool {
        let sink = match self.inner.lock() {
            Ok(state) => state.sink.clone(),
            Err(_) => None,
        };
        sink.is_some_and(|sink| sink.send(update))
    }

    /// Returns false when the reply belongs to a replaced tracker.
    pub fn resolve_targets(
        &self,
        generation: Option<u64>,
        reply: Result<Vec<TargetDimensions>, TrackerError>,
    ) -> bool {
        let Ok(mut state) = self.inner.lock() else {
            return false;
        };
        if !state.accepts(generation) {
            return false;
        }
        state.targets_reply = Some(reply);
        state.wake();
        true
    }

    pub fn resolve_warmup(
        &self,
        generation: Option<u64>,
        reply: Result<(), TrackerError>,
        projection: Option<[f32; 16]>,
    ) -> bool {
        let Ok(mut state) = self.inner.lock() else {
            return false;
        };
        if !state.accepts(generation) {
            return false;
        }
        if projection.is_some() {
            state.projection = projection;
        }
        state.warmup_reply = Some(reply);
        state.wake();
        true
    }

    fn push(&self, generation: u64, command: TrackerCommand) {
        if let Ok(mut state) = self.inner.lock() {
            state.commands.push(TrackerCommandMessage {
                generation,
                command,
            });
        }
    }

    fn poll_reply<R>(
        &self,
        generation: u64,
        cx: &mut Context<'_>,
        take: impl Fn(&mut BridgeState) -> Option<Result<R, TrackerError>>,
    ) -> Poll<Result<R, TrackerError>> {
        let Ok(mut state) = self.inner.lock() else {
            return Poll::Ready(Err(TrackerError::Unavailable));
        };
        if state.generation != generation {
            return Poll::Ready(Err(TrackerError::Unavailable));
        }
        match take(&mut state) {
            Some(reply) => Poll::Ready(reply),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// [`ImageTargetTracker`] backed by the engine running in the host page.
pub struct PostMessageTracker {
    link: BridgeLink,
    generation: u64,
}

impl ImageTargetTracker for PostMessageTracker {
    fn add_image_targets(
        &mut self,
        target_url: &str,
    ) -> impl Future<Output = Result<Vec<TargetDimensions>, TrackerError>> {
        let link = self.link.clone();
        let generation = self.generation;
        if let Ok(mut state) = link.inner.lock() {
            state.targets_reply = None;
        }
        link.push(
            generation,
            TrackerCommand::AddImageTargets {
                url: target_url.to_string(),
            },
        );
        std::future::poll_fn(move |cx| {
            link.poll_reply(generation, cx, |state| state.targets_reply.take())
        })
    }

    fn dummy_run(&mut self, video: &VideoSource) -> impl Future<Output = Result<(), TrackerError>> {
        let link = self.link.clone();
        let generation = self.generation;
        if let Ok(mut state) = link.inner.lock() {
            state.warmup_reply = None;
        }
        link.push(
            generation,
            TrackerCommand::DummyRun {
                video: video.clone(),
            },
        );
        std::future::poll_fn(move |cx| {
            link.poll_reply(generation, cx, |state| state.warmup_reply.take())
        })
    }

    fn process_video(&mut self, video: &VideoSource) {
        self.link.push(
            self.generation,
            TrackerCommand::ProcessVideo {
                video: video.clone(),
            },
        );
    }

    fn stop_process_video(&mut self) {
        self.link.push(self.generation, TrackerCommand::Stop);
    }

    fn projection_matrix(&self) -> Option<[f32; 16]> {
        let state = self.link.inner.lock().ok()?;
        if state.generation != self.generation {
            return None;
        }
        state.projection
    }
}
