use bevy::math::Vec3;

/// Camera placement while the live AR view is active.
pub const AR_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, 5.0);

/// Camera placement for free 3D browsing of the anchored content.
pub const BROWSE_CAMERA_POSITION: Vec3 = Vec3::new(1.0, 1.0, 3.0);
pub const BROWSE_CAMERA_LOOK_AT: Vec3 = Vec3::ZERO;
