//! Ordered key storage.
//!
//! A [`KeySet`] is the immutable, frame-sorted sample sequence for one
//! animated property. It is assembled with a [`KeySetBuilder`] and published
//! as an `Arc<KeySet<K>>`, after which it can only be read. Any number of
//! controllers, across any number of mixers, share one published key set;
//! it is freed when the last of them goes away.

use std::sync::Arc;

use crate::clip::AnimationClip;
use crate::error::{AnimationError, Result};
use crate::search::{self, Framed, KeyBounds};
use crate::values::TransformKey;

/// One timestamped sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Key<K> {
    pub frame: u32,
    pub value: K,
}

impl<K> Key<K> {
    #[inline]
    pub fn new(frame: u32, value: K) -> Self {
        Self { frame, value }
    }
}

impl<K> Framed for Key<K> {
    #[inline]
    fn frame(&self) -> u32 {
        self.frame
    }
}

/// Immutable, strictly ascending sequence of keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySet<K> {
    keys: Box<[Key<K>]>,
}

/// Key set driving node transforms.
pub type TransformKeySet = KeySet<TransformKey>;

impl<K> KeySet<K> {
    #[inline]
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn key(&self, index: usize) -> Option<&Key<K>> {
        self.keys.get(index)
    }

    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Key<K>] {
        &self.keys
    }

    #[inline]
    #[must_use]
    pub fn frame_of(&self, index: usize) -> Option<u32> {
        self.keys.get(index).map(|k| k.frame)
    }

    #[must_use]
    pub fn first_frame(&self) -> Option<u32> {
        self.keys.first().map(|k| k.frame)
    }

    /// Frame of the last key; this is the key set's playback length.
    #[must_use]
    pub fn last_frame(&self) -> Option<u32> {
        self.keys.last().map(|k| k.frame)
    }

    /// See [`search::frame_bounds`].
    #[inline]
    #[must_use]
    pub fn frame_bounds(&self, frame: u32) -> KeyBounds {
        search::frame_bounds(&self.keys, frame)
    }

    /// See [`search::frame_bounds_cached`].
    #[inline]
    #[must_use]
    pub fn frame_bounds_cached(
        &self,
        frame: u32,
        playing_in_reverse: bool,
        last: KeyBounds,
    ) -> KeyBounds {
        search::frame_bounds_cached(&self.keys, frame, playing_in_reverse, last)
    }
}

impl<K: Clone> KeySet<K> {
    /// Carves the keys inside `clip` out into a new key set.
    ///
    /// Keys with `clip.start <= frame <= clip.end` are kept and rebased so
    /// that `clip.start` becomes frame 0. Returns `Ok(None)` when no key
    /// falls inside the range.
    pub fn chop(&self, clip: &AnimationClip) -> Result<Option<Arc<Self>>> {
        if clip.end < clip.start {
            log::error!(
                "Animation clip '{}' ends (frame {}) before it starts (frame {}).",
                clip.name,
                clip.end,
                clip.start
            );
            return Err(AnimationError::InvalidClipRange {
                start: clip.start,
                end: clip.end,
            });
        }

        let first = search::lower_bound(&self.keys, clip.start);
        let last = search::upper_bound(&self.keys, clip.end);
        if first >= last {
            return Ok(None);
        }

        let keys: Box<[Key<K>]> = self.keys[first..last]
            .iter()
            .map(|k| Key::new(k.frame - clip.start, k.value.clone()))
            .collect();

        Ok(Some(Arc::new(Self { keys })))
    }
}

/// Mutable staging area for a [`KeySet`].
#[derive(Debug, Clone)]
pub struct KeySetBuilder<K> {
    keys: Vec<Key<K>>,
}

impl<K> KeySetBuilder<K> {
    #[must_use]
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Inserts a key at its sorted position.
    ///
    /// Appending in ascending order is O(1). A key on a frame that already
    /// holds one is rejected and the builder is left unchanged.
    pub fn add_key(&mut self, frame: u32, value: K) -> Result<&mut Self> {
        match self.keys.last() {
            None => self.keys.push(Key::new(frame, value)),
            Some(last) if frame > last.frame => self.keys.push(Key::new(frame, value)),
            Some(_) => {
                let index = search::lower_bound(&self.keys, frame);
                if self.keys.get(index).is_some_and(|k| k.frame == frame) {
                    log::error!("Animation keys in the same set cannot share frame {frame}.");
                    return Err(AnimationError::DuplicateKeyFrame { frame });
                }
                self.keys.insert(index, Key::new(frame, value));
            }
        }
        Ok(self)
    }

    /// Adds many keys at once. Either all of them are added or none are.
    pub fn add_keys<I>(&mut self, keys: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (u32, K)>,
    {
        let rollback = self.keys.len();
        let mut added: Vec<u32> = Vec::new();
        for (frame, value) in keys {
            if let Err(err) = self.add_key(frame, value) {
                // Keys may have been inserted anywhere; remove exactly the
                // frames this call added.
                added.sort_unstable();
                self.keys.retain(|k| added.binary_search(&k.frame).is_err());
                debug_assert_eq!(self.keys.len(), rollback);
                return Err(err);
            }
            added.push(frame);
        }
        Ok(self)
    }

    /// Publishes the keys as an immutable, shareable key set.
    #[must_use]
    pub fn build(self) -> Arc<KeySet<K>> {
        Arc::new(KeySet {
            keys: self.keys.into_boxed_slice(),
        })
    }
}

impl<K> Default for KeySetBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}
