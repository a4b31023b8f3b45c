use std::future::Future;
use std::sync::Arc;

use constants::tracking::{
    DEFAULT_FILTER_BETA, DEFAULT_FILTER_MIN_CF, DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH,
    DEFAULT_MAX_TRACK,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::channel::TrackerSink;
use super::matrix::TargetDimensions;

/// Construction parameters of the image tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerOptions {
    pub input_width: u32,
    pub input_height: u32,
    #[serde(rename = "filterMinCF")]
    pub filter_min_cf: Option<f32>,
    pub filter_beta: Option<f32>,
    pub warmup_tolerance: Option<u32>,
    pub miss_tolerance: Option<u32>,
    pub max_track: u32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            filter_min_cf: Some(DEFAULT_FILTER_MIN_CF),
            filter_beta: Some(DEFAULT_FILTER_BETA),
            warmup_tolerance: None,
            miss_tolerance: None,
            max_track: DEFAULT_MAX_TRACK,
        }
    }
}

/// Handle to the camera stream the tracker pulls frames from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    pub element_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("malformed target descriptors: {0}")]
    MalformedTargets(String),
    #[error("tracker rejected the request: {0}")]
    Rejected(String),
    #[error("tracker is no longer available")]
    Unavailable,
}

/// Contract of the external image-target tracker.
///
/// Feature extraction and matching happen elsewhere; results flow back
/// through the [`TrackerSink`] the tracker was constructed with.
pub trait ImageTargetTracker: 'static {
    /// Load compiled target descriptors and report each target's size.
    fn add_image_targets(
        &mut self,
        target_url: &str,
    ) -> impl Future<Output = Result<Vec<TargetDimensions>, TrackerError>>;

    /// One inference pass to warm up lazy initialisation.
    fn dummy_run(&mut self, video: &VideoSource) -> impl Future<Output = Result<(), TrackerError>>;

    /// Begin continuous tracking, driven by the tracker's own loop.
    fn process_video(&mut self, video: &VideoSource);

    fn stop_process_video(&mut self);

    /// Camera projection reported by the tracker, once it knows the input size.
    fn projection_matrix(&self) -> Option<[f32; 16]>;
}

pub type TrackerFactory<T> = Arc<dyn Fn(&TrackerOptions, TrackerSink) -> T + Send + Sync>;
