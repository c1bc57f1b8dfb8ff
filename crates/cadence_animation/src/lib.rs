//! Cadence Animation
//!
//! Keyframe animation blending for the Cadence engine. Sparse, named sets of
//! keys become per-node transform updates every frame, and any number of
//! simultaneously playing animations are composited into one pose per node.
//!
//! # Layers
//!
//! - [`KeySet`]: immutable, frame-sorted keys for one property, shared by `Arc`
//! - [`search`]: bracket search over key frames, with a temporal-coherence cache
//! - [`KeyController`]: binds a key set to one node and writes interpolated output
//! - [`AnimationSet`]: a named animation with its own playback state
//! - [`AnimationMixer`]: advances, composites and cross-fades animation sets
//! - [`ControllerManager`]: creates and ticks mixers, builds controllers from
//!   per-node [`AnimationBuffer`]s
//!
//! # Example
//!
//! ```rust,ignore
//! let mut keys = KeySetBuilder::new();
//! keys.add_key(0, TransformKey::default())?;
//! keys.add_key(30, TransformKey::from_position(Vec3::X))?;
//!
//! let controller = TransformController::new(keys.build(), node, TransformState::IDENTITY);
//! let mut mixer = AnimationMixer::new();
//! mixer.add_controller("walk", controller)?;
//! mixer.set_weight("walk", 1.0)?;
//! mixer.set_wrap_mode("walk", WrapMode::Loop)?;
//! mixer.play("walk", false)?;
//!
//! // once per frame
//! mixer.tick(dt, &mut scene);
//! ```

pub mod animation_set;
pub mod buffer;
pub mod clip;
pub mod controller;
pub mod error;
pub mod key_set;
pub mod manager;
pub mod mixer;
pub mod search;
pub mod values;

pub use animation_set::{AnimationSet, BlendMode, CallbackTrigger, WrapMode};
pub use buffer::{AnimationBuffer, BufferEntry, SharedKeySet};
pub use clip::AnimationClip;
pub use controller::{
    AnimateKeys, ControllerKind, ControllerState, KeyController, KeyTimeline, TransformController,
};
pub use error::{AnimationError, RejectedController, Result};
pub use key_set::{Key, KeySet, KeySetBuilder, TransformKeySet};
pub use manager::{AnimatedHierarchy, ControllerManager};
pub use mixer::{AnimationEvent, AnimationMixer, AnimationSetKey, CallbackHandler, MixerKey};
pub use search::KeyBounds;
pub use values::{Interpolatable, TransformKey};
