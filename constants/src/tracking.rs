/// Reserved "not tracked" pose written by the tracker when a target is lost.
/// Column-major; every element is zero except the bottom-right one.
pub const INVISIBLE_MATRIX: [f32; 16] = [
    0.0, 0.0, 0.0, 0.0, // column 0
    0.0, 0.0, 0.0, 0.0, // column 1
    0.0, 0.0, 0.0, 0.0, // column 2
    0.0, 0.0, 0.0, 1.0, // column 3
];

/// Target descriptor compiled from the bundled demo image.
pub const DEFAULT_TARGET_URL: &str = "/car.mind";

/// One-euro filter cutoff passed to the tracker.
pub const DEFAULT_FILTER_MIN_CF: f32 = 0.001;

/// One-euro filter speed coefficient passed to the tracker.
pub const DEFAULT_FILTER_BETA: f32 = 0.001;

/// Number of targets tracked simultaneously.
pub const DEFAULT_MAX_TRACK: u32 = 1;

/// Input size used until the camera stream reports its real dimensions.
pub const DEFAULT_INPUT_WIDTH: u32 = 640;
pub const DEFAULT_INPUT_HEIGHT: u32 = 480;
