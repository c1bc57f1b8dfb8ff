//! Per-node animation buffers.
//!
//! An [`AnimationBuffer`] holds every key set one node takes part in,
//! grouped under the name of the animation they belong to. Buffers are
//! filled by the asset side, optionally chopped into clips, and then turned
//! into controllers by the [`ControllerManager`](crate::manager::ControllerManager).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::clip::AnimationClip;
use crate::controller::ControllerKind;
use crate::error::{AnimationError, Result};
use crate::key_set::{KeySet, TransformKeySet};

/// A published key set of any supported key type.
#[derive(Debug, Clone)]
pub enum SharedKeySet {
    Transform(Arc<TransformKeySet>),
    /// Single-channel curve.
    Scalar(Arc<KeySet<f32>>),
}

impl SharedKeySet {
    #[must_use]
    pub fn key_count(&self) -> usize {
        match self {
            Self::Transform(k) => k.key_count(),
            Self::Scalar(k) => k.key_count(),
        }
    }

    #[must_use]
    pub fn first_frame(&self) -> Option<u32> {
        match self {
            Self::Transform(k) => k.first_frame(),
            Self::Scalar(k) => k.first_frame(),
        }
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<u32> {
        match self {
            Self::Transform(k) => k.last_frame(),
            Self::Scalar(k) => k.last_frame(),
        }
    }

    /// Whether a controller of `kind` can be driven by this key set.
    #[must_use]
    pub fn feeds(&self, kind: ControllerKind) -> bool {
        matches!((self, kind), (Self::Transform(_), ControllerKind::Transformation))
    }

    fn chop(&self, clip: &AnimationClip) -> Result<Option<Self>> {
        Ok(match self {
            Self::Transform(k) => k.chop(clip)?.map(Self::Transform),
            Self::Scalar(k) => k.chop(clip)?.map(Self::Scalar),
        })
    }
}

impl From<Arc<TransformKeySet>> for SharedKeySet {
    fn from(key_set: Arc<TransformKeySet>) -> Self {
        Self::Transform(key_set)
    }
}

/// One key set registered under an animation name.
#[derive(Debug, Clone)]
pub struct BufferEntry {
    pub kind: ControllerKind,
    pub key_set: SharedKeySet,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationBuffer {
    animations: BTreeMap<String, Vec<BufferEntry>>,
}

impl AnimationBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key_set` as a `kind` track of animation `name`.
    pub fn add_key_set(
        &mut self,
        name: &str,
        kind: ControllerKind,
        key_set: impl Into<SharedKeySet>,
    ) -> Result<()> {
        let key_set = key_set.into();
        if !key_set.feeds(kind) {
            log::error!("Animation '{name}': key set cannot drive a {kind:?} controller");
            return Err(AnimationError::IncompatibleKeySet { kind });
        }
        if key_set.key_count() == 0 {
            log::error!("Animation '{name}': refusing empty key set");
            return Err(AnimationError::EmptyKeySet);
        }

        self.animations
            .entry(name.to_owned())
            .or_default()
            .push(BufferEntry { kind, key_set });
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    #[must_use]
    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }

    #[must_use]
    pub fn key_sets(&self, name: &str) -> Option<&[BufferEntry]> {
        self.animations.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BufferEntry])> {
        self.animations
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// `(first, last)` frame over all key sets of animation `name`.
    #[must_use]
    pub fn frame_bounds(&self, name: &str) -> Option<(u32, u32)> {
        let entries = self.animations.get(name)?;
        let first = entries.iter().filter_map(|e| e.key_set.first_frame()).min()?;
        let last = entries.iter().filter_map(|e| e.key_set.last_frame()).max()?;
        Some((first, last))
    }

    /// Moves animation `from` to `to`, appending to `to` if it already exists.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let entries = self
            .animations
            .remove(from)
            .ok_or_else(|| AnimationError::AnimationNotFound(from.to_owned()))?;
        self.animations.entry(to.to_owned()).or_default().extend(entries);
        Ok(())
    }

    /// Builds a buffer whose animations are the given clips.
    ///
    /// Every key set of every animation is chopped by every clip and filed
    /// under the clip's name. Clips that contain no keys for some key set
    /// simply leave it out. Any failing chop fails the whole call.
    pub fn chop(&self, clips: &[AnimationClip]) -> Result<Self> {
        let mut chopped = Self::new();
        for entries in self.animations.values() {
            for entry in entries {
                for clip in clips {
                    if let Some(key_set) = entry.key_set.chop(clip)? {
                        chopped
                            .animations
                            .entry(clip.name.clone())
                            .or_default()
                            .push(BufferEntry {
                                kind: entry.kind,
                                key_set,
                            });
                    }
                }
            }
        }
        Ok(chopped)
    }
}
