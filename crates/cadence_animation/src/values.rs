use glam::{Quat, Vec3};

use cadence_core::TransformState;

/// Key payloads that can be blended between two samples.
pub trait Interpolatable: Copy + Sized {
    /// Interpolates from `start` to `end`. `t` is expected in `[0, 1]`.
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        // glam's slerp flips `end` when the dot product is negative, so this
        // always takes the shortest arc.
        start.slerp(end, t)
    }
}

/// Payload of a transformation key: a full local TRS sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformKey {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl TransformKey {
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Key that only moves the node; identity rotation and unit scale.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Default for TransformKey {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

impl Interpolatable for TransformKey {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        Self {
            position: Vec3::interpolate_linear(start.position, end.position, t),
            rotation: Quat::interpolate_linear(start.rotation, end.rotation, t),
            scale: Vec3::interpolate_linear(start.scale, end.scale, t),
        }
    }
}

impl From<TransformKey> for TransformState {
    fn from(key: TransformKey) -> Self {
        TransformState::new(key.position, key.rotation, key.scale)
    }
}

impl From<TransformState> for TransformKey {
    fn from(state: TransformState) -> Self {
        TransformKey::new(state.position, state.rotation, state.scale)
    }
}
