use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Rotation and horizontal flip applied to one source image.
///
/// Positive angles rotate counter-clockwise. The stored angle is always one of
/// 0, 90, 180, 270.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "TransformRecord", into = "TransformRecord")]
pub struct TransformState {
    rotation_degrees: u16,
    flipped_horizontally: bool,
    modified: bool,
}

/// Persisted form; angles are re-validated on load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct TransformRecord {
    rotation: i32,
    flipped: bool,
}

impl TryFrom<TransformRecord> for TransformState {
    type Error = MergeError;

    fn try_from(record: TransformRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            rotation_degrees: normalize_angle(record.rotation)?,
            flipped_horizontally: record.flipped,
            modified: false,
        })
    }
}

impl From<TransformState> for TransformRecord {
    fn from(state: TransformState) -> Self {
        Self {
            rotation: i32::from(state.rotation_degrees),
            flipped: state.flipped_horizontally,
        }
    }
}

impl TransformState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rotation_degrees(&self) -> u16 {
        self.rotation_degrees
    }

    pub fn flipped_horizontally(&self) -> bool {
        self.flipped_horizontally
    }

    /// Whether any mutator ran since construction or the last `reset`.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Set an absolute rotation, reduced modulo 360.
    pub fn set_rotation(&mut self, angle: i32) -> Result<(), MergeError> {
        self.rotation_degrees = normalize_angle(angle)?;
        self.modified = true;
        Ok(())
    }

    /// Accumulate a rotation delta onto the current angle.
    pub fn add_rotation(&mut self, delta: i32) -> Result<(), MergeError> {
        let delta = normalize_angle(delta)?;
        self.rotation_degrees = (self.rotation_degrees + delta) % 360;
        self.modified = true;
        Ok(())
    }

    /// Rotate the image as it currently appears on screen.
    ///
    /// A mirrored image turns the opposite way in source coordinates, so the
    /// delta is negated while the flip is active.
    pub fn rotate_as_displayed(&mut self, delta: i32) -> Result<(), MergeError> {
        let delta = normalize_angle(delta)?;
        let delta = if self.flipped_horizontally {
            (360 - delta) % 360
        } else {
            delta
        };
        self.rotation_degrees = (self.rotation_degrees + delta) % 360;
        self.modified = true;
        Ok(())
    }

    pub fn toggle_flip(&mut self) {
        self.flipped_horizontally = !self.flipped_horizontally;
        self.modified = true;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_default(&self) -> bool {
        self.rotation_degrees == 0 && !self.flipped_horizontally
    }
}

fn normalize_angle(angle: i32) -> Result<u16, MergeError> {
    if angle % 90 != 0 {
        return Err(MergeError::InvalidOption(format!(
            "Rotation must be a multiple of 90 degrees, got {}",
            angle
        )));
    }
    Ok(angle.rem_euclid(360) as u16)
}
