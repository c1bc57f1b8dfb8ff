//! Controller manager.
//!
//! Lifecycle owner of every [`AnimationMixer`]: it creates them, ticks them
//! once per frame and forgets them when they are removed. It also turns the
//! animation buffers stored on scene nodes into controllers.

use std::sync::Arc;

use slotmap::SlotMap;

use cadence_core::{AnimationSettings, NodeHandle, TransformTarget};

use crate::buffer::{AnimationBuffer, SharedKeySet};
use crate::clip::AnimationClip;
use crate::controller::{ControllerKind, TransformController};
use crate::error::{AnimationError, Result};
use crate::key_set::TransformKeySet;
use crate::mixer::{AnimationMixer, MixerKey};

/// A scene graph that stores animation buffers and mixers on its nodes.
pub trait AnimatedHierarchy: TransformTarget {
    fn contains_node(&self, node: NodeHandle) -> bool;

    /// Direct children of `node`; empty for leaves and unknown handles.
    fn children(&self, node: NodeHandle) -> &[NodeHandle];

    fn animation_buffer(&self, node: NodeHandle) -> Option<&Arc<AnimationBuffer>>;

    fn set_animation_buffer(&mut self, node: NodeHandle, buffer: Arc<AnimationBuffer>);

    /// Records which mixer animates the subgraph under `node`.
    fn set_animation_mixer(&mut self, node: NodeHandle, mixer: MixerKey);
}

#[derive(Debug, Default)]
pub struct ControllerManager {
    settings: AnimationSettings,
    mixers: SlotMap<MixerKey, AnimationMixer>,
}

impl ControllerManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `settings` is copied into every mixer created afterwards.
    #[must_use]
    pub fn with_settings(settings: AnimationSettings) -> Self {
        Self {
            settings,
            mixers: SlotMap::with_key(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn create_mixer(&mut self) -> MixerKey {
        let settings = self.settings;
        let key = self.mixers.insert_with_key(|key| {
            let mut mixer = AnimationMixer::with_settings(settings);
            mixer.set_key(key);
            mixer
        });
        log::debug!("Animation mixer {key:?} created");
        key
    }

    #[must_use]
    pub fn mixer(&self, key: MixerKey) -> Option<&AnimationMixer> {
        self.mixers.get(key)
    }

    pub fn mixer_mut(&mut self, key: MixerKey) -> Option<&mut AnimationMixer> {
        self.mixers.get_mut(key)
    }

    #[must_use]
    pub fn mixer_count(&self) -> usize {
        self.mixers.len()
    }

    pub fn mixers(&self) -> impl Iterator<Item = (MixerKey, &AnimationMixer)> {
        self.mixers.iter()
    }

    /// Stops tracking a mixer and hands it back.
    pub fn remove_mixer(&mut self, key: MixerKey) -> Option<AnimationMixer> {
        let mixer = self.mixers.remove(key)?;
        log::debug!("Animation mixer {key:?} removed");
        Some(mixer)
    }

    /// Ticks every live mixer once.
    pub fn update(&mut self, dt: f32, target: &mut dyn TransformTarget) {
        for mixer in self.mixers.values_mut() {
            mixer.tick(dt, target);
        }
    }

    /// Binds `key_set` to `node`, capturing the node's bind pose as the
    /// additive reference.
    pub fn create_transform_controller<T: TransformTarget + ?Sized>(
        &self,
        key_set: Arc<TransformKeySet>,
        node: NodeHandle,
        target: &T,
    ) -> Result<TransformController> {
        if key_set.is_empty() {
            log::error!("Cannot create a transform controller for {node:?} from an empty key set");
            return Err(AnimationError::EmptyKeySet);
        }
        let bind_pose = target
            .bind_pose(node)
            .ok_or(AnimationError::NodeNotFound(node))?;
        Ok(TransformController::new(key_set, node, bind_pose))
    }

    /// Creates a controller for every key set in `node`'s animation buffer
    /// and adds it to `mixer` under the buffer's animation name.
    ///
    /// Returns the number of controllers added.
    pub fn add_animations_to_mixer<H: AnimatedHierarchy + ?Sized>(
        &mut self,
        mixer: MixerKey,
        hierarchy: &H,
        node: NodeHandle,
    ) -> Result<usize> {
        if !self.mixers.contains_key(mixer) {
            return Err(AnimationError::MixerNotFound);
        }
        let Some(buffer) = hierarchy.animation_buffer(node) else {
            return Ok(0);
        };

        let mut added = 0;
        for (name, entries) in buffer.iter() {
            for entry in entries {
                let controller = match (&entry.key_set, entry.kind) {
                    (SharedKeySet::Transform(key_set), ControllerKind::Transformation) => {
                        self.create_transform_controller(Arc::clone(key_set), node, hierarchy)?
                    }
                    (SharedKeySet::Scalar(_), kind) => {
                        return Err(AnimationError::IncompatibleKeySet { kind });
                    }
                };
                let target_mixer = self
                    .mixers
                    .get_mut(mixer)
                    .ok_or(AnimationError::MixerNotFound)?;
                target_mixer
                    .add_controller(name, controller)
                    .map_err(|rejected| rejected.reason)?;
                added += 1;
            }
        }
        Ok(added)
    }

    /// Creates a mixer holding the animations of `root` (and, with
    /// `process_children`, of all its descendants) and attaches it to `root`.
    ///
    /// On failure no mixer is left behind.
    pub fn create_mixer_for_hierarchy<H: AnimatedHierarchy + ?Sized>(
        &mut self,
        hierarchy: &mut H,
        root: NodeHandle,
        process_children: bool,
    ) -> Result<MixerKey> {
        if !hierarchy.contains_node(root) {
            return Err(AnimationError::NodeNotFound(root));
        }

        let key = self.create_mixer();
        for node in collect_nodes(&*hierarchy, root, process_children) {
            if let Err(err) = self.add_animations_to_mixer(key, &*hierarchy, node) {
                self.remove_mixer(key);
                return Err(err);
            }
        }

        hierarchy.set_animation_mixer(root, key);
        Ok(key)
    }

    /// Replaces each node's animation buffer with one chopped into `clips`.
    ///
    /// Run this before creating mixers from the buffers. Either every buffer
    /// is replaced or none is.
    pub fn chop_animation_buffers<H: AnimatedHierarchy + ?Sized>(
        &self,
        hierarchy: &mut H,
        root: NodeHandle,
        clips: &[AnimationClip],
        process_children: bool,
    ) -> Result<()> {
        if !hierarchy.contains_node(root) {
            return Err(AnimationError::NodeNotFound(root));
        }

        let mut chopped = Vec::new();
        for node in collect_nodes(&*hierarchy, root, process_children) {
            if let Some(buffer) = hierarchy.animation_buffer(node) {
                chopped.push((node, buffer.chop(clips)?));
            }
        }
        for (node, buffer) in chopped {
            hierarchy.set_animation_buffer(node, Arc::new(buffer));
        }
        Ok(())
    }
}

/// `root` followed by its descendants in depth-first order.
fn collect_nodes<H: AnimatedHierarchy + ?Sized>(
    hierarchy: &H,
    root: NodeHandle,
    process_children: bool,
) -> Vec<NodeHandle> {
    if !process_children {
        return vec![root];
    }

    let mut nodes = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        nodes.push(node);
        stack.extend(hierarchy.children(node).iter().rev().copied());
    }
    nodes
}
