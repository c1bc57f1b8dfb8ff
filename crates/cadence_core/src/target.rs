use glam::{Quat, Vec3};

use crate::NodeHandle;

/// Local TRS state of a node, as read and written by animation controllers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformState {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl TransformState {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Destination of computed animation values.
///
/// The scene graph implements this; the animation core only ever reads a
/// node's current local state and writes a new one back. It never creates,
/// destroys or reparents nodes.
pub trait TransformTarget {
    /// Current local transform of `node`, or `None` if the node is gone.
    fn local_transform(&self, node: NodeHandle) -> Option<TransformState>;

    /// Rest pose used as the reference for additive blending.
    ///
    /// Bones report their bind pose; plain nodes default to their current
    /// local transform.
    fn bind_pose(&self, node: NodeHandle) -> Option<TransformState> {
        self.local_transform(node)
    }

    /// Writes a computed transform to `node`. Unknown handles are ignored.
    fn apply_computed_transform(&mut self, node: NodeHandle, state: TransformState);
}
