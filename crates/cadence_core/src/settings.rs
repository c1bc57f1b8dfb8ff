//! Animation Playback Settings
//!
//! [`AnimationSettings`] is handed to every mixer at construction time. The
//! defaults match what most content expects (30 fps key data, clips that
//! hold their final pose when they finish).
//!
//! ```rust,ignore
//! use cadence_core::{AnimationSettings, PlayOnceEnd};
//!
//! let settings = AnimationSettings {
//!     frames_per_second: 60,
//!     play_once_end: PlayOnceEnd::Rewind,
//!     ..Default::default()
//! };
//! ```

/// What a `PlayOnce` animation does with its frame counter when it runs off
/// either end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlayOnceEnd {
    /// Clamp to the boundary that was crossed (frame length going forward,
    /// frame 0 going backward).
    #[default]
    HoldLastFrame,
    /// Snap back to frame 0 regardless of direction.
    Rewind,
}

/// Playback configuration shared by mixers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnimationSettings {
    /// Key frames per second of playback time. Values below 1 are treated as 1.
    pub frames_per_second: u32,
    /// The mixer's global frame counter is rebased to zero once it would
    /// pass this value.
    pub epoch_frame_limit: i32,
    /// Overflow policy for `PlayOnce` animations.
    pub play_once_end: PlayOnceEnd,
    /// Weight below which a set faded out by a transition is stopped.
    pub weight_epsilon: f32,
}

impl AnimationSettings {
    /// Frame rate with the lower bound applied.
    #[inline]
    #[must_use]
    pub fn frame_rate(&self) -> u32 {
        self.frames_per_second.max(1)
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            frames_per_second: 30,
            epoch_frame_limit: i32::MAX,
            play_once_end: PlayOnceEnd::HoldLastFrame,
            weight_epsilon: 1e-5,
        }
    }
}
