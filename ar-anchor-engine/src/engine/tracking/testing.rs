//! Scripted tracker double shared by the session and driver tests.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::task::Poll;

use super::channel::TrackerSink;
use super::matrix::TargetDimensions;
use super::tracker::{ImageTargetTracker, TrackerError, TrackerFactory, TrackerOptions, VideoSource};

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerCall {
    Created { input_width: u32 },
    AddImageTargets(String),
    DummyRun,
    ProcessVideo,
    StopProcessVideo,
}

#[derive(Default)]
struct ScriptState {
    calls: Vec<TrackerCall>,
    sinks: Vec<TrackerSink>,
}

/// Canned responses plus a shared call log.
#[derive(Clone)]
pub struct TrackerScript {
    targets: Result<Vec<TargetDimensions>, TrackerError>,
    warmup: Result<(), TrackerError>,
    /// Polls each async step stays pending before resolving.
    pending_polls: usize,
    state: Arc<Mutex<ScriptState>>,
}

impl TrackerScript {
    pub fn with_targets(count: usize) -> Self {
        let targets = (0..count)
            .map(|i| TargetDimensions {
                width: 1.0 + i as f32,
                height: 1.0,
            })
            .collect();
        Self {
            targets: Ok(targets),
            warmup: Ok(()),
            pending_polls: 0,
            state: Arc::default(),
        }
    }

    pub fn failing_targets(error: TrackerError) -> Self {
        Self {
            targets: Err(error),
            ..Self::with_targets(0)
        }
    }

    pub fn with_warmup_error(mut self, error: TrackerError) -> Self {
        self.warmup = Err(error);
        self
    }

    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn factory(&self) -> TrackerFactory<ScriptedTracker> {
        let script = self.clone();
        Arc::new(move |options: &TrackerOptions, sink: TrackerSink| {
            script.record(TrackerCall::Created {
                input_width: options.input_width,
            });
            if let Ok(mut state) = script.state.lock() {
                state.sinks.push(sink);
            }
            ScriptedTracker {
                script: script.clone(),
            }
        })
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.state.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn last_sink(&self) -> Option<TrackerSink> {
        self.state.lock().ok()?.sinks.last().cloned()
    }

    fn record(&self, call: TrackerCall) {
        if let Ok(mut state) = self.state.lock() {
            state.calls.push(call);
        }
    }
}

pub struct ScriptedTracker {
    script: TrackerScript,
}

fn after_polls<T>(polls: usize, value: T) -> impl Future<Output = T> {
    let mut remaining = polls;
    let mut value = Some(value);
    std::future::poll_fn(move |cx| {
        if remaining == 0 {
            match value.take() {
                Some(value) => Poll::Ready(value),
                None => Poll::Pending,
            }
        } else {
            remaining -= 1;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
}

impl ImageTargetTracker for ScriptedTracker {
    fn add_image_targets(
        &mut self,
        target_url: &str,
    ) -> impl Future<Output = Result<Vec<TargetDimensions>, TrackerError>> {
        self.script
            .record(TrackerCall::AddImageTargets(target_url.to_string()));
        after_polls(self.script.pending_polls, self.script.targets.clone())
    }

    fn dummy_run(&mut self, _video: &VideoSource) -> impl Future<Output = Result<(), TrackerError>> {
        self.script.record(TrackerCall::DummyRun);
        after_polls(self.script.pending_polls, self.script.warmup.clone())
    }

    fn process_video(&mut self, _video: &VideoSource) {
        self.script.record(TrackerCall::ProcessVideo);
    }

    fn stop_process_video(&mut self) {
        self.script.record(TrackerCall::StopProcessVideo);
    }

    fn projection_matrix(&self) -> Option<[f32; 16]> {
        Some([0.0; 16])
    }
}

pub fn video(width: u32, height: u32) -> VideoSource {
    VideoSource {
        element_id: "camera".into(),
        width,
        height,
    }
}
