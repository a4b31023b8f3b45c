use bevy::prelude::*;
use constants::tracking::INVISIBLE_MATRIX;
use serde::{Deserialize, Serialize};

/// Index of an image target, in the order targets were handed to the tracker.
pub type TargetIndex = usize;

/// Pose of a tracked target in camera space, column-major.
///
/// Either a live pose or [`WorldMatrix::INVISIBLE`], the tracker's explicit
/// "not currently tracked" marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldMatrix([f32; 16]);

impl WorldMatrix {
    pub const INVISIBLE: Self = Self(INVISIBLE_MATRIX);

    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, //
    ]);

    pub const fn from_cols_array(values: [f32; 16]) -> Self {
        Self(values)
    }

    /// Build from a flat tracker array. Returns `None` unless exactly 16 values are given.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let values: [f32; 16] = values.try_into().ok()?;
        Some(Self(values))
    }

    pub fn from_mat4(matrix: Mat4) -> Self {
        Self(matrix.to_cols_array())
    }

    pub fn to_cols_array(&self) -> [f32; 16] {
        self.0
    }

    pub fn as_mat4(&self) -> Mat4 {
        Mat4::from_cols_array(&self.0)
    }

    /// Exact match against the sentinel. Near-zero poses are still live.
    pub fn is_invisible(&self) -> bool {
        self.0 == INVISIBLE_MATRIX
    }

    pub fn to_transform(&self) -> Transform {
        Transform::from_matrix(self.as_mat4())
    }
}

/// Physical marker size reported by the tracker once targets are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct TargetDimensions {
    pub width: f32,
    pub height: f32,
}

impl From<[f32; 2]> for TargetDimensions {
    fn from([width, height]: [f32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<TargetDimensions> for [f32; 2] {
    fn from(dimensions: TargetDimensions) -> Self {
        [dimensions.width, dimensions.height]
    }
}

/// Per-target correction applied after the tracker pose.
///
/// Moves the origin to the marker centre, stands content up on the marker
/// plane and scales one unit to the marker width.
pub fn post_transform(dimensions: TargetDimensions) -> Mat4 {
    let TargetDimensions { width, height } = dimensions;
    let translation = Vec3::new(width / 2.0, width / 2.0 + (height - width) / 2.0, 0.0);
    let rotation = Quat::from_axis_angle(Vec3::X, std::f32::consts::FRAC_PI_2);
    let scale = Vec3::splat(width);

    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Compose a raw tracker pose with its target's post-transform.
pub fn apply_post_transform(raw: WorldMatrix, post: Mat4) -> WorldMatrix {
    WorldMatrix::from_mat4(raw.as_mat4() * post)
}
