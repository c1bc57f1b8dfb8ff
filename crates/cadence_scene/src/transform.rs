use glam::{Affine3A, EulerRot, Quat, Vec3};

use cadence_core::TransformState;

/// Local TRS of a node with a cached matrix and shadow-state dirty check.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,

    last_position: Vec3,
    last_rotation: Quat,
    last_scale: Vec3,
    force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,

            last_position: Vec3::ZERO,
            last_rotation: Quat::IDENTITY,
            last_scale: Vec3::ONE,
            force_update: true,
        }
    }

    #[must_use]
    pub fn from_state(state: TransformState) -> Self {
        let mut transform = Self::new();
        transform.apply_state(state);
        transform
    }

    /// Recomputes the local matrix if TRS changed since the last call.
    /// Returns whether it did.
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix =
                Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position);

            self.last_position = self.position;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    /// Current TRS as the animation core sees it.
    #[inline]
    #[must_use]
    pub fn state(&self) -> TransformState {
        TransformState::new(self.position, self.rotation, self.scale)
    }

    /// Overwrites TRS with a computed value and forces a matrix refresh.
    pub fn apply_state(&mut self, state: TransformState) {
        self.position = state.position;
        self.rotation = state.rotation;
        self.scale = state.scale;
        self.mark_dirty();
    }

    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    }

    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    /// Valid after [`Scene::update_matrix_world`](crate::Scene::update_matrix_world).
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.force_update
            || self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
    }

    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
