//! Cadence
//!
//! Keyframe animation blending for real-time 3D scenes.
//!
//! - [`core`]: node handles, transform state, playback settings
//! - [`animation`]: key sets, controllers, animation sets, the mixer
//! - [`scene`]: the node table animations are applied to
//!
//! Most applications only need the [`prelude`].

pub use cadence_animation as animation;
pub use cadence_core as core;
pub use cadence_scene as scene;

pub use cadence_animation::{
    AnimationBuffer, AnimationClip, AnimationError, AnimationEvent, AnimationMixer, BlendMode,
    ControllerManager, KeySet, KeySetBuilder, MixerKey, TransformController, TransformKey,
    WrapMode,
};
pub use cadence_core::{AnimationSettings, NodeHandle, PlayOnceEnd, TransformState};
pub use cadence_scene::{Node, Scene, Transform};

pub mod prelude {
    pub use cadence_animation::{
        AnimateKeys, AnimatedHierarchy, AnimationBuffer, AnimationClip, AnimationError,
        AnimationEvent, AnimationMixer, BlendMode, ControllerKind, ControllerManager, KeySet,
        KeySetBuilder, MixerKey, TransformController, TransformKey, TransformKeySet, WrapMode,
    };
    pub use cadence_core::{
        AnimationSettings, NodeHandle, PlayOnceEnd, TransformState, TransformTarget,
    };
    pub use cadence_scene::{Node, Scene, Transform};
    pub use glam::{Quat, Vec3};
}
