use std::sync::Arc;

use glam::Affine3A;
use slotmap::{SecondaryMap, SlotMap};

use cadence_animation::{AnimatedHierarchy, AnimationBuffer, MixerKey};
use cadence_core::{NodeHandle, TransformState, TransformTarget};

use crate::node::Node;

/// Node table plus the animation side tables keyed by node.
#[derive(Debug, Default)]
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    animation_buffers: SecondaryMap<NodeHandle, Arc<AnimationBuffer>>,
    animation_mixers: SecondaryMap<NodeHandle, MixerKey>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unnamed root node.
    pub fn create_node(&mut self) -> NodeHandle {
        self.create_node_with_name("")
    }

    /// Adds a root node.
    pub fn create_node_with_name(&mut self, name: &str) -> NodeHandle {
        let handle = self.nodes.insert(Node::new(name));
        self.root_nodes.push(handle);
        handle
    }

    /// Makes `child` a child of `parent`, detaching it from its old parent.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            log::error!("Node not found during attach!");
            return;
        }
        if self.is_ancestor(child, parent) {
            log::warn!("Cannot attach a node below its own descendant");
            return;
        }

        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(n) = self.nodes.get_mut(p)
                && let Some(i) = n.children.iter().position(|&x| x == child)
            {
                n.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == child) {
            self.root_nodes.remove(i);
        }

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
    }

    fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(|n| n.parent);
        }
        false
    }

    /// Removes a node and its whole subtree.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let parent = node.parent;

        if let Some(p) = parent {
            if let Some(n) = self.nodes.get_mut(p)
                && let Some(i) = n.children.iter().position(|&x| x == handle)
            {
                n.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == handle) {
            self.root_nodes.remove(i);
        }

        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
            }
            self.animation_buffers.remove(current);
            self.animation_mixers.remove(current);
        }
    }

    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// First node with this name, in no particular order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find_map(|(handle, node)| (node.name == name).then_some(handle))
    }

    /// Marks `handle` as a bone resting at `pose`.
    pub fn set_bind_pose(&mut self, handle: NodeHandle, pose: TransformState) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.bind_pose = Some(pose);
        }
    }

    // ========================================================================
    // Animation side tables
    // ========================================================================

    #[must_use]
    pub fn animation_buffer(&self, handle: NodeHandle) -> Option<&Arc<AnimationBuffer>> {
        self.animation_buffers.get(handle)
    }

    pub fn set_animation_buffer(&mut self, handle: NodeHandle, buffer: Arc<AnimationBuffer>) {
        if self.nodes.contains_key(handle) {
            self.animation_buffers.insert(handle, buffer);
        }
    }

    #[must_use]
    pub fn animation_mixer(&self, handle: NodeHandle) -> Option<MixerKey> {
        self.animation_mixers.get(handle).copied()
    }

    pub fn set_animation_mixer(&mut self, handle: NodeHandle, mixer: MixerKey) {
        if self.nodes.contains_key(handle) {
            self.animation_mixers.insert(handle, mixer);
        }
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// Refreshes local matrices that changed and recomputes world matrices
    /// top-down. Iterative, so deep hierarchies cannot overflow the stack.
    pub fn update_matrix_world(&mut self) {
        let mut stack: Vec<(NodeHandle, Affine3A, bool)> = self
            .root_nodes
            .iter()
            .rev()
            .map(|&root| (root, Affine3A::IDENTITY, false))
            .collect();

        while let Some((handle, parent_world, parent_changed)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle) else {
                continue;
            };
            let local_changed = node.transform.update_local_matrix();
            let changed = local_changed || parent_changed;
            if changed {
                node.transform.world_matrix = parent_world * node.transform.local_matrix;
            }

            let world = node.transform.world_matrix;
            stack.extend(node.children.iter().rev().map(|&c| (c, world, changed)));
        }
    }
}

impl TransformTarget for Scene {
    fn local_transform(&self, node: NodeHandle) -> Option<TransformState> {
        self.nodes.get(node).map(|n| n.transform.state())
    }

    fn bind_pose(&self, node: NodeHandle) -> Option<TransformState> {
        let node = self.nodes.get(node)?;
        Some(node.bind_pose.unwrap_or_else(|| node.transform.state()))
    }

    fn apply_computed_transform(&mut self, node: NodeHandle, state: TransformState) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.transform.apply_state(state);
        } else {
            log::warn!("Animation wrote to missing node {node:?}");
        }
    }
}

impl AnimatedHierarchy for Scene {
    fn contains_node(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(node)
    }

    fn children(&self, node: NodeHandle) -> &[NodeHandle] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    fn animation_buffer(&self, node: NodeHandle) -> Option<&Arc<AnimationBuffer>> {
        Scene::animation_buffer(self, node)
    }

    fn set_animation_buffer(&mut self, node: NodeHandle, buffer: Arc<AnimationBuffer>) {
        Scene::set_animation_buffer(self, node, buffer);
    }

    fn set_animation_mixer(&mut self, node: NodeHandle, mixer: MixerKey) {
        Scene::set_animation_mixer(self, node, mixer);
    }
}
