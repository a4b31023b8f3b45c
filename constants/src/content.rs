/// `px py pz rx ry rz sx sy sz`
pub const TRANSFORM_FIELD_COUNT: usize = 9;

/// Relative base path of the experience API served next to the app.
pub const DEFAULT_API_BASE: &str = "api";

/// Extension registered for experience documents with the asset server.
pub const EXPERIENCE_EXTENSION: &str = "experience.json";

pub const UPLOADS_DIR: &str = "uploads";

// Bundled demo experience, used whenever no remote configuration is usable.
pub const DEMO_EXPERIENCE_NAME: &str = "Demo XP";
pub const DEMO_SCENE_NAME: &str = "Demo Scene";
pub const DEMO_TARGET_NAME: &str = "Orange Car";
pub const DEMO_TARGET_IMAGE: &str = "/car.jpg";
pub const DEMO_MODEL_NAME: &str = "Orange Car";
pub const DEMO_MODEL_FILE: &str = "/car.glb";
pub const DEMO_MODEL_TRANSFORM: &str = "0 0 0 0 -1.570 0 1 1 1";
