//! Key controllers.
//!
//! A controller binds one shared key set to one scene node. Each frame the
//! mixer drives it through a short cycle per animation set:
//!
//! ```text
//! Idle --animation_start--> Animating --animate_to_key | animate_forward--> Animating
//! Animating --animation_end--> Idle
//! ```
//!
//! `animation_end` commits the pending value to the node, combined with what
//! the node already holds this frame, so several animation sets can stack
//! their contributions by running the cycle repeatedly.
//!
//! Calls that break the cycle are logged and ignored; they never leave the
//! controller or the node half-updated.

use std::sync::Arc;

use glam::{Quat, Vec3};

use cadence_core::{NodeHandle, TransformState, TransformTarget};

use crate::animation_set::BlendMode;
use crate::key_set::{KeySet, TransformKeySet};
use crate::search::KeyBounds;
use crate::values::{Interpolatable, TransformKey};

/// The kinds of property a controller can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerKind {
    /// Local translation, rotation and scale of a node.
    Transformation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    Animating,
}

/// Read-only, type-erased view of a key set's timing.
pub trait KeyTimeline {
    fn key_count(&self) -> usize;

    fn frame_of(&self, key: usize) -> Option<u32>;

    fn last_frame(&self) -> Option<u32>;

    fn frame_bounds_cached(&self, frame: u32, playing_in_reverse: bool, last: KeyBounds)
    -> KeyBounds;
}

impl<K> KeyTimeline for KeySet<K> {
    fn key_count(&self) -> usize {
        KeySet::key_count(self)
    }

    fn frame_of(&self, key: usize) -> Option<u32> {
        KeySet::frame_of(self, key)
    }

    fn last_frame(&self) -> Option<u32> {
        KeySet::last_frame(self)
    }

    fn frame_bounds_cached(
        &self,
        frame: u32,
        playing_in_reverse: bool,
        last: KeyBounds,
    ) -> KeyBounds {
        KeySet::frame_bounds_cached(self, frame, playing_in_reverse, last)
    }
}

/// Capability interface every controller kind implements.
pub trait AnimateKeys {
    /// The bound key set.
    fn key_set(&self) -> &dyn KeyTimeline;

    /// The node this controller writes to.
    fn owner(&self) -> NodeHandle;

    fn kind(&self) -> ControllerKind;

    fn state(&self) -> ControllerState;

    /// Opens a batch of interpolation calls for the current frame.
    fn animation_start(&mut self);

    /// Sets the pending output to exactly the value stored at `key`.
    fn animate_to_key(&mut self, key: usize);

    /// Sets the pending output to the interpolation between two keys.
    /// `amount` is clamped to `[0, 1]`.
    fn animate_forward(&mut self, from_key: usize, to_key: usize, amount: f32);

    /// Commits the pending output to the owner node.
    fn animation_end(
        &mut self,
        blend: BlendMode,
        blend_amount: f32,
        target: &mut dyn TransformTarget,
    );
}

/// Drives a node's local TRS from a [`TransformKeySet`].
#[derive(Debug, Clone)]
pub struct TransformController {
    key_set: Arc<TransformKeySet>,
    owner: NodeHandle,
    bind_pose: TransformState,
    inverse_bind_rotation: Quat,
    pending: Option<TransformKey>,
    state: ControllerState,
}

impl TransformController {
    /// `bind_pose` is the node's rest pose, the reference for additive blending.
    #[must_use]
    pub fn new(key_set: Arc<TransformKeySet>, owner: NodeHandle, bind_pose: TransformState) -> Self {
        Self {
            key_set,
            owner,
            bind_pose,
            inverse_bind_rotation: bind_pose.rotation.inverse(),
            pending: None,
            state: ControllerState::Idle,
        }
    }

    #[inline]
    #[must_use]
    pub fn transform_keys(&self) -> &Arc<TransformKeySet> {
        &self.key_set
    }

    #[inline]
    #[must_use]
    pub fn bind_pose(&self) -> &TransformState {
        &self.bind_pose
    }

    fn is_animating(&self, call: &str) -> bool {
        if self.state == ControllerState::Animating {
            return true;
        }
        log::warn!(
            "TransformController for {:?}: {call} outside animation_start/animation_end, ignored",
            self.owner
        );
        false
    }

    fn blend(current: TransformState, pending: TransformKey, amount: f32) -> TransformState {
        TransformState {
            position: current.position.lerp(pending.position, amount),
            rotation: current.rotation.slerp(pending.rotation, amount),
            scale: current.scale.lerp(pending.scale, amount),
        }
    }

    fn add(&self, current: TransformState, pending: TransformKey, amount: f32) -> TransformState {
        let position_offset: Vec3 = (pending.position - self.bind_pose.position) * amount;
        let scale_offset: Vec3 = (pending.scale - self.bind_pose.scale) * amount;
        let rotation_offset =
            Quat::IDENTITY.slerp(self.inverse_bind_rotation * pending.rotation, amount);

        TransformState {
            position: current.position + position_offset,
            rotation: (current.rotation * rotation_offset).normalize(),
            scale: current.scale + scale_offset,
        }
    }
}

impl AnimateKeys for TransformController {
    fn key_set(&self) -> &dyn KeyTimeline {
        &*self.key_set
    }

    fn owner(&self) -> NodeHandle {
        self.owner
    }

    fn kind(&self) -> ControllerKind {
        ControllerKind::Transformation
    }

    fn state(&self) -> ControllerState {
        self.state
    }

    fn animation_start(&mut self) {
        if self.state == ControllerState::Animating {
            log::warn!(
                "TransformController for {:?}: animation_start called twice, previous batch discarded",
                self.owner
            );
        }
        self.state = ControllerState::Animating;
        self.pending = None;
    }

    fn animate_to_key(&mut self, key: usize) {
        if !self.is_animating("animate_to_key") {
            return;
        }
        match self.key_set.key(key) {
            Some(k) => self.pending = Some(k.value),
            None => log::warn!(
                "TransformController for {:?}: key {key} out of range ({} keys)",
                self.owner,
                self.key_set.key_count()
            ),
        }
    }

    fn animate_forward(&mut self, from_key: usize, to_key: usize, amount: f32) {
        if !self.is_animating("animate_forward") {
            return;
        }
        let (Some(from), Some(to)) = (self.key_set.key(from_key), self.key_set.key(to_key)) else {
            log::warn!(
                "TransformController for {:?}: keys ({from_key}, {to_key}) out of range ({} keys)",
                self.owner,
                self.key_set.key_count()
            );
            return;
        };

        let u = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, 1.0) };
        self.pending = Some(TransformKey::interpolate_linear(from.value, to.value, u));
    }

    fn animation_end(
        &mut self,
        blend: BlendMode,
        blend_amount: f32,
        target: &mut dyn TransformTarget,
    ) {
        if !self.is_animating("animation_end") {
            return;
        }
        self.state = ControllerState::Idle;

        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(current) = target.local_transform(self.owner) else {
            log::warn!("TransformController: owner {:?} no longer exists", self.owner);
            return;
        };

        let amount = if blend_amount.is_nan() {
            0.0
        } else {
            blend_amount.clamp(0.0, 1.0)
        };
        let result = match blend {
            BlendMode::Blend => Self::blend(current, pending, amount),
            BlendMode::Additive => self.add(current, pending, amount),
        };
        target.apply_computed_transform(self.owner, result);
    }
}

/// Closed set of controller kinds; new kinds extend this enum.
#[derive(Debug, Clone)]
pub enum KeyController {
    Transformation(TransformController),
}

impl From<TransformController> for KeyController {
    fn from(controller: TransformController) -> Self {
        Self::Transformation(controller)
    }
}

impl AnimateKeys for KeyController {
    fn key_set(&self) -> &dyn KeyTimeline {
        match self {
            Self::Transformation(c) => c.key_set(),
        }
    }

    fn owner(&self) -> NodeHandle {
        match self {
            Self::Transformation(c) => c.owner(),
        }
    }

    fn kind(&self) -> ControllerKind {
        match self {
            Self::Transformation(c) => c.kind(),
        }
    }

    fn state(&self) -> ControllerState {
        match self {
            Self::Transformation(c) => c.state(),
        }
    }

    fn animation_start(&mut self) {
        match self {
            Self::Transformation(c) => c.animation_start(),
        }
    }

    fn animate_to_key(&mut self, key: usize) {
        match self {
            Self::Transformation(c) => c.animate_to_key(key),
        }
    }

    fn animate_forward(&mut self, from_key: usize, to_key: usize, amount: f32) {
        match self {
            Self::Transformation(c) => c.animate_forward(from_key, to_key, amount),
        }
    }

    fn animation_end(
        &mut self,
        blend: BlendMode,
        blend_amount: f32,
        target: &mut dyn TransformTarget,
    ) {
        match self {
            Self::Transformation(c) => c.animation_end(blend, blend_amount, target),
        }
    }
}
