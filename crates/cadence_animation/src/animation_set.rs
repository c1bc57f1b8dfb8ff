//! Animation sets.
//!
//! An [`AnimationSet`] is one named logical animation ("walk", "lean") inside
//! a mixer: the controllers for every property it animates plus its own
//! playback state. The mixer owns the sets; this module holds the per-set
//! frame arithmetic.
//!
//! # Frame resolution
//!
//! A playing set does not accumulate time itself. Its frame is derived from
//! the mixer's global frame counter `G` and the frame it started on:
//!
//! ```text
//! position = floor((G - start_frame) * speed)
//! frame    = reverse ? frame_length - position : position
//! ```
//!
//! When that runs past either end the wrap mode decides what happens, and
//! `start_frame` is rebased so the next tick continues from the wrapped
//! frame without wrapping again.

use cadence_core::PlayOnceEnd;

use crate::controller::KeyController;
use crate::search::KeyBounds;

/// Policy for playback past the end (or before the start) of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WrapMode {
    /// Stop at the end; the set's weight drops to zero.
    #[default]
    PlayOnce,
    /// Start over from the opposite end.
    Loop,
    /// Reverse direction at each end.
    Bounce,
}

/// How a set's output combines with what is already on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendMode {
    /// Weighted blend, limited by the mixer's weight budget.
    #[default]
    Blend,
    /// Offset from the bind pose stacked on top of the blended result.
    Additive,
}

/// A user callback registered on one frame of an animation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackTrigger {
    pub frame: i32,
    pub user_data: i32,
}

/// One contiguous range of frames passed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    lo: i32,
    hi: i32,
    lo_inclusive: bool,
    hi_inclusive: bool,
}

impl Span {
    fn contains(&self, frame: i32) -> bool {
        let above = if self.lo_inclusive { frame >= self.lo } else { frame > self.lo };
        let below = if self.hi_inclusive { frame <= self.hi } else { frame < self.hi };
        above && below
    }
}

/// Frames a set moved across in one tick. A wrap splits the path in two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Crossing {
    spans: [Option<Span>; 2],
}

impl Crossing {
    fn single(span: Span) -> Self {
        Self {
            spans: [Some(span), None],
        }
    }

    fn pair(first: Span, second: Span) -> Self {
        Self {
            spans: [Some(first), Some(second)],
        }
    }

    /// Forward movement `from -> to`; `from` itself is only included on the
    /// first advance after the set (re)started.
    fn forward(from: i32, to: i32, include_start: bool) -> Span {
        Span {
            lo: from,
            hi: to,
            lo_inclusive: include_start,
            hi_inclusive: true,
        }
    }

    /// Backward movement `from -> to` with `to <= from`.
    fn backward(from: i32, to: i32, include_start: bool) -> Span {
        Span {
            lo: to,
            hi: from,
            lo_inclusive: true,
            hi_inclusive: include_start,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.spans.iter().all(Option::is_none)
    }

    pub(crate) fn contains(&self, frame: i32) -> bool {
        self.spans.iter().flatten().any(|s| s.contains(frame))
    }
}

/// One named animation within a mixer.
#[derive(Debug)]
pub struct AnimationSet {
    pub(crate) name: String,
    pub(crate) controllers: Vec<KeyController>,
    /// Last bracket found per controller, seeds the cached key search.
    pub(crate) key_cache: Vec<KeyBounds>,
    pub(crate) triggers: Vec<CallbackTrigger>,

    pub(crate) wrap_mode: WrapMode,
    pub(crate) blend_mode: BlendMode,
    pub(crate) weight: f32,
    pub(crate) speed: f32,
    pub(crate) track: u32,

    pub(crate) frame: i32,
    pub(crate) last_frame: i32,
    pub(crate) start_frame: i32,
    pub(crate) frame_length: i32,
    pub(crate) playing: bool,
    pub(crate) reverse: bool,

    /// Blend amount handed to the controllers in the last composition pass.
    pub(crate) applied_weight: f32,
    /// Pose reset to the first key requested by `stop`, applied next pass.
    pub(crate) pending_reset: bool,
    /// The next advance also fires triggers on the frame it starts from.
    pub(crate) include_start_frame: bool,
    /// Weight held for one last composition pass after a PlayOnce set ran
    /// out, so its end pose reaches the nodes.
    pub(crate) finishing_weight: Option<f32>,
}

impl AnimationSet {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            controllers: Vec::new(),
            key_cache: Vec::new(),
            triggers: Vec::new(),
            wrap_mode: WrapMode::PlayOnce,
            blend_mode: BlendMode::Blend,
            weight: 0.0,
            speed: 1.0,
            track: 0,
            frame: 0,
            last_frame: 0,
            start_frame: 0,
            frame_length: 0,
            playing: false,
            reverse: false,
            applied_weight: 0.0,
            pending_reset: false,
            include_start_frame: true,
            finishing_weight: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn controllers(&self) -> &[KeyController] {
        &self.controllers
    }

    #[must_use]
    pub fn triggers(&self) -> &[CallbackTrigger] {
        &self.triggers
    }

    #[must_use]
    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[must_use]
    pub fn applied_weight(&self) -> f32 {
        self.applied_weight
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[must_use]
    pub fn track(&self) -> u32 {
        self.track
    }

    #[must_use]
    pub fn frame(&self) -> i32 {
        self.frame
    }

    #[must_use]
    pub fn last_frame(&self) -> i32 {
        self.last_frame
    }

    #[must_use]
    pub fn frame_length(&self) -> i32 {
        self.frame_length
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    pub(crate) fn set_weight(&mut self, weight: f32) {
        self.weight = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
        self.finishing_weight = None;
    }

    /// Weight used by the next composition pass.
    pub(crate) fn blend_weight(&self) -> f32 {
        self.finishing_weight.unwrap_or(self.weight)
    }

    /// Starts playback from the set's first frame (in its current direction).
    pub(crate) fn play(&mut self, global_frame: i32) {
        self.playing = true;
        self.finishing_weight = None;
        self.start_frame = global_frame;
        self.frame = if self.reverse { self.frame_length } else { 0 };
        self.include_start_frame = true;
    }

    pub(crate) fn stop(&mut self, reset_back_to_start: bool) {
        self.playing = false;
        if reset_back_to_start {
            self.frame = 0;
            self.pending_reset = true;
            self.include_start_frame = true;
        }
    }

    /// Changes direction while keeping the current pose. Bounce sets own
    /// their direction, so this does nothing for them.
    pub(crate) fn set_reverse(&mut self, global_frame: i32, reverse: bool) {
        if self.reverse == reverse || self.wrap_mode == WrapMode::Bounce {
            return;
        }
        self.reverse = reverse;
        self.rebase(global_frame, self.frame);
    }

    pub(crate) fn set_frame(&mut self, global_frame: i32, frame: i32) {
        self.frame = frame.clamp(0, self.frame_length.max(0));
        self.rebase(global_frame, self.frame);
        self.include_start_frame = true;
    }

    /// Adjusts `start_frame` so that `G = global_frame` yields `frame`.
    pub(crate) fn rebase(&mut self, global_frame: i32, frame: i32) {
        let position = if self.reverse {
            self.frame_length - frame
        } else {
            frame
        };
        let elapsed = if self.speed == 0.0 {
            0
        } else {
            (f64::from(position) / f64::from(self.speed)).round() as i32
        };
        self.start_frame = global_frame.saturating_sub(elapsed);
    }

    fn raw_frame(&self, global_frame: i32) -> i32 {
        let elapsed = i64::from(global_frame) - i64::from(self.start_frame);
        let position = (elapsed as f64 * f64::from(self.speed)).floor() as i32;
        if self.reverse {
            self.frame_length.saturating_sub(position)
        } else {
            position
        }
    }

    fn finish(&mut self) {
        self.playing = false;
        self.finishing_weight = Some(self.weight);
        self.weight = 0.0;
    }

    /// Moves the set to the frame implied by `global_frame`, applying its
    /// wrap mode, and reports the frames passed on the way.
    pub(crate) fn advance(&mut self, global_frame: i32, play_once_end: PlayOnceEnd) -> Crossing {
        self.last_frame = self.frame;

        let len = self.frame_length;
        if len <= 0 {
            // Static pose: nothing to advance.
            self.frame = 0;
            return Crossing::default();
        }
        if !self.playing || self.speed == 0.0 {
            // Paused sets hold their frame.
            return Crossing::default();
        }

        let from = self.last_frame;
        let include_start = std::mem::take(&mut self.include_start_frame);
        let raw = self.raw_frame(global_frame);

        if raw > len {
            match self.wrap_mode {
                WrapMode::PlayOnce => {
                    self.frame = match play_once_end {
                        PlayOnceEnd::HoldLastFrame => len,
                        PlayOnceEnd::Rewind => 0,
                    };
                    self.finish();
                    Crossing::single(Crossing::forward(from, len, include_start))
                }
                WrapMode::Loop => {
                    let frame = raw % len;
                    self.frame = frame;
                    self.rebase(global_frame, frame);
                    Crossing::pair(
                        Crossing::forward(from, len, include_start),
                        Crossing::forward(0, frame, true),
                    )
                }
                WrapMode::Bounce => {
                    let frame = len - raw % len;
                    self.frame = frame;
                    self.reverse = true;
                    self.rebase(global_frame, frame);
                    Crossing::pair(
                        Crossing::forward(from, len, include_start),
                        Crossing::backward(len, frame, false),
                    )
                }
            }
        } else if raw < 0 {
            match self.wrap_mode {
                WrapMode::PlayOnce => {
                    self.frame = 0;
                    self.finish();
                    Crossing::single(Crossing::backward(from, 0, include_start))
                }
                WrapMode::Loop => {
                    let frame = len - underflow(raw, len);
                    self.frame = frame;
                    self.rebase(global_frame, frame);
                    Crossing::pair(
                        Crossing::backward(from, 0, include_start),
                        Crossing::backward(len, frame, true),
                    )
                }
                WrapMode::Bounce => {
                    let frame = underflow(raw, len);
                    self.frame = frame;
                    self.reverse = false;
                    self.rebase(global_frame, frame);
                    Crossing::pair(
                        Crossing::backward(from, 0, include_start),
                        Crossing::forward(0, frame, false),
                    )
                }
            }
        } else {
            self.frame = raw;
            if raw > from {
                Crossing::single(Crossing::forward(from, raw, include_start))
            } else if raw < from {
                Crossing::single(Crossing::backward(from, raw, include_start))
            } else if include_start {
                Crossing::single(Crossing::forward(from, raw, true))
            } else {
                Crossing::default()
            }
        }
    }
}

/// Distance of a negative `raw` below zero, modulo `len`. Computed in `i64`
/// so a saturated `i32::MIN` stays in range.
fn underflow(raw: i32, len: i32) -> i32 {
    ((-i64::from(raw)) % i64::from(len)) as i32
}
