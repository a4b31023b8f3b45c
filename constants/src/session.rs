/// Seconds shown to the user before the page reloads after a fatal error.
pub const ERROR_RELOAD_COUNTDOWN_SECS: f32 = 10.0;

pub const CAMERA_PERMISSION_MESSAGE: &str = "Please give camera permissions to proceed.";

pub const TARGET_LOAD_MESSAGE: &str = "Unable to load the image targets for this experience.";
