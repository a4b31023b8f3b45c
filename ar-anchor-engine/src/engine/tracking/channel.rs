use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::anchor_state::AnchorStateStore;
use super::matrix::{
    TargetDimensions, TargetIndex, WorldMatrix, apply_post_transform, post_transform,
};

/// Payload of the tracker's `onUpdate` callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrackerUpdate {
    #[serde(rename_all = "camelCase")]
    UpdateMatrix {
        target_index: TargetIndex,
        #[serde(default)]
        world_matrix: Option<Vec<f32>>,
    },
    ProcessDone,
    #[serde(other)]
    Other,
}

#[derive(Default)]
struct ChannelState {
    generation: u64,
    pending: Vec<(TargetIndex, Option<WorldMatrix>)>,
    post_transforms: Vec<Mat4>,
}

/// Hand-off between the tracker callback, which may fire from a worker, and
/// the frame loop that owns [`AnchorStateStore`].
///
/// Each tracker instance writes through a [`TrackerSink`] bound to the
/// generation that was current when it was created; opening a new sink or
/// closing the channel silences every older one.
#[derive(Resource, Clone, Default)]
pub struct TrackingChannel {
    inner: Arc<Mutex<ChannelState>>,
}

impl TrackingChannel {
    /// Start a new generation for a freshly constructed tracker.
    pub fn open_sink(&self) -> TrackerSink {
        let generation = match self.inner.lock() {
            Ok(mut state) => {
                state.generation += 1;
                state.pending.clear();
                state.post_transforms.clear();
                state.generation
            }
            Err(_) => {
                error!("Tracking channel poisoned, tracker updates will be dropped");
                u64::MAX
            }
        };

        TrackerSink {
            inner: Arc::clone(&self.inner),
            generation,
        }
    }

    /// Reject everything the current tracker sends from now on.
    pub fn close(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.generation += 1;
            state.pending.clear();
        }
    }

    /// Take pending updates in arrival order.
    pub fn drain(&self) -> Vec<(TargetIndex, Option<WorldMatrix>)> {
        match self.inner.lock() {
            Ok(mut state) => std::mem::take(&mut state.pending),
            Err(_) => Vec::new(),
        }
    }
}

/// Write end handed to one tracker instance.
#[derive(Clone)]
pub struct TrackerSink {
    inner: Arc<Mutex<ChannelState>>,
    generation: u64,
}

impl TrackerSink {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.inner
            .lock()
            .map(|state| state.generation == self.generation)
            .unwrap_or(false)
    }

    /// Install per-target post-transforms once target dimensions are known.
    pub fn set_target_dimensions(&self, dimensions: &[TargetDimensions]) {
        if let Ok(mut state) = self.inner.lock() {
            if state.generation == self.generation {
                state.post_transforms = dimensions.iter().copied().map(post_transform).collect();
            }
        }
    }

    /// Forward one tracker callback. Returns whether it was queued.
    pub fn send(&self, update: TrackerUpdate) -> bool {
        match update {
            TrackerUpdate::UpdateMatrix {
                target_index,
                world_matrix,
            } => match world_matrix {
                None => self.push(target_index, None),
                Some(values) => match WorldMatrix::from_slice(&values) {
                    Some(matrix) => self.push(target_index, Some(matrix)),
                    None => {
                        warn!(
                            "Dropping pose for target {} with {} values",
                            target_index,
                            values.len()
                        );
                        false
                    }
                },
            },
            TrackerUpdate::ProcessDone | TrackerUpdate::Other => false,
        }
    }

    fn push(&self, index: TargetIndex, raw: Option<WorldMatrix>) -> bool {
        let Ok(mut state) = self.inner.lock() else {
            return false;
        };
        if state.generation != self.generation {
            return false;
        }

        let matrix = raw.map(|raw| match state.post_transforms.get(index) {
            Some(post) => apply_post_transform(raw, *post),
            None => raw,
        });
        state.pending.push((index, matrix));
        true
    }
}

/// Fold queued tracker results into the store, once per frame.
pub fn apply_tracker_updates(channel: Res<TrackingChannel>, mut store: ResMut<AnchorStateStore>) {
    let updates = channel.drain();
    if updates.is_empty() {
        return;
    }

    trace!("Applying {} tracker updates", updates.len());
    for (index, matrix) in updates {
        store.update(index, matrix);
    }
}
