use cadence_core::{NodeHandle, TransformState};

use crate::transform::Transform;

/// A scene node: hierarchy links and a transform.
///
/// Animation data (buffers, mixers) lives in the [`Scene`](crate::Scene)'s
/// side tables so nodes stay small.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,

    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    pub transform: Transform,

    /// Rest pose for bones; additive animation offsets are measured from it.
    pub(crate) bind_pose: Option<TransformState>,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            bind_pose: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn bind_pose(&self) -> Option<&TransformState> {
        self.bind_pose.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_bone(&self) -> bool {
        self.bind_pose.is_some()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("")
    }
}
