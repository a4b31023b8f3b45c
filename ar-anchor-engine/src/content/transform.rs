use bevy::prelude::*;
use constants::content::TRANSFORM_FIELD_COUNT;
use thiserror::Error;

/// Placement of a scene-graph node relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub position: Vec3,
    /// Euler angles in radians, applied in XYZ order.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl NodeTransform {
    pub fn to_transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                self.rotation.x,
                self.rotation.y,
                self.rotation.z,
            ),
            scale: self.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformParseError {
    #[error("expected {expected} fields, found {0}", expected = TRANSFORM_FIELD_COUNT)]
    FieldCount(usize),
    #[error("field {index} is not a number: {value:?}")]
    NotANumber { index: usize, value: String },
    #[error("field {index} is not finite")]
    NotFinite { index: usize },
}

/// Parse `px py pz rx ry rz sx sy sz`.
pub fn parse_transform(input: &str) -> Result<NodeTransform, TransformParseError> {
    let fields: Vec<&str> = input.split_whitespace().collect();
    if fields.len() != TRANSFORM_FIELD_COUNT {
        return Err(TransformParseError::FieldCount(fields.len()));
    }

    let mut values = [0.0f32; TRANSFORM_FIELD_COUNT];
    for (index, field) in fields.iter().enumerate() {
        let value: f32 = field
            .parse()
            .map_err(|_| TransformParseError::NotANumber {
                index,
                value: field.to_string(),
            })?;
        if !value.is_finite() {
            return Err(TransformParseError::NotFinite { index });
        }
        values[index] = value;
    }

    Ok(NodeTransform {
        position: Vec3::new(values[0], values[1], values[2]),
        rotation: Vec3::new(values[3], values[4], values[5]),
        scale: Vec3::new(values[6], values[7], values[8]),
    })
}
