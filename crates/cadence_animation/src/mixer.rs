//! Animation mixer.
//!
//! The mixer owns every [`AnimationSet`] driving one node subgraph and, once
//! per frame, turns them into a single pose per node:
//!
//! 1. [`advance_time`](AnimationMixer::advance_time) moves the global frame
//!    counter, resolves each weighted set's frame and fires callbacks.
//! 2. [`advance_animation`](AnimationMixer::advance_animation) composites the
//!    sets onto the nodes. Normal sets are grouped by track (highest track
//!    first) and share a total weight budget of 1; additive sets are stacked
//!    on top afterwards.
//! 3. [`advance_transition`](AnimationMixer::advance_transition) steps an
//!    active cross-fade.
//!
//! [`tick`](AnimationMixer::tick) runs the three in order.

use std::cmp::Reverse;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use cadence_core::{AnimationSettings, NodeHandle, TransformTarget};

use crate::animation_set::{AnimationSet, BlendMode, CallbackTrigger, WrapMode};
use crate::controller::{AnimateKeys, KeyController};
use crate::error::{AnimationError, RejectedController, Result};
use crate::search::KeyBounds;

new_key_type! {
    /// Handle to a mixer tracked by a [`ControllerManager`](crate::manager::ControllerManager).
    pub struct MixerKey;

    /// Handle to an animation set inside one mixer.
    pub struct AnimationSetKey;
}

/// Weight under which a transition target is restarted rather than resumed.
const RESTART_WEIGHT: f32 = 1e-4;

/// Sent to the callback handler when a set crosses one of its trigger frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationEvent<'a> {
    /// Mixer that fired the event (null for a mixer created outside a manager).
    pub mixer: MixerKey,
    pub animation_name: &'a str,
    pub frame: i32,
    pub user_data: i32,
}

pub type CallbackHandler = Box<dyn FnMut(&AnimationEvent<'_>)>;

#[derive(Debug, Clone, Copy)]
struct Transition {
    target: AnimationSetKey,
    total_time: f32,
    elapsed_time: f32,
    affect_all_tracks: bool,
}

pub struct AnimationMixer {
    key: MixerKey,
    settings: AnimationSettings,

    sets: SlotMap<AnimationSetKey, AnimationSet>,
    by_name: FxHashMap<String, AnimationSetKey>,
    /// All sets, stably ordered by descending track.
    layers: Vec<AnimationSetKey>,

    /// Seconds since the current epoch began.
    time: f64,
    current_frame: i32,

    transition: Option<Transition>,
    callback: Option<CallbackHandler>,

    // Per-tick scratch, rebuilt on every composition pass.
    layer_scratch: SmallVec<[AnimationSetKey; 8]>,
    additive_scratch: SmallVec<[AnimationSetKey; 8]>,
}

impl fmt::Debug for AnimationMixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationMixer")
            .field("key", &self.key)
            .field("settings", &self.settings)
            .field("sets", &self.sets)
            .field("layers", &self.layers)
            .field("current_frame", &self.current_frame)
            .field("transition", &self.transition)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for AnimationMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationMixer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: AnimationSettings) -> Self {
        Self {
            key: MixerKey::default(),
            settings,
            sets: SlotMap::with_key(),
            by_name: FxHashMap::default(),
            layers: Vec::new(),
            time: 0.0,
            current_frame: 0,
            transition: None,
            callback: None,
            layer_scratch: SmallVec::new(),
            additive_scratch: SmallVec::new(),
        }
    }

    // ========================================================================
    // Identity & configuration
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn key(&self) -> MixerKey {
        self.key
    }

    pub(crate) fn set_key(&mut self, key: MixerKey) {
        self.key = key;
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    /// Values below 1 are raised to 1.
    pub fn set_frame_rate(&mut self, frames_per_second: u32) {
        self.settings.frames_per_second = frames_per_second.max(1);
    }

    /// The global frame counter `G`.
    #[inline]
    #[must_use]
    pub fn current_frame(&self) -> i32 {
        self.current_frame
    }

    #[inline]
    #[must_use]
    pub fn is_transition_active(&self) -> bool {
        self.transition.is_some()
    }

    #[must_use]
    pub fn transition_target(&self) -> Option<&str> {
        let transition = self.transition.as_ref()?;
        self.sets.get(transition.target).map(AnimationSet::name)
    }

    // ========================================================================
    // Set registry
    // ========================================================================

    /// Registers `controller` under animation `name`, creating the set on
    /// first use.
    ///
    /// A controller bound to an empty key set is refused and handed back.
    pub fn add_controller(
        &mut self,
        name: &str,
        controller: impl Into<KeyController>,
    ) -> std::result::Result<(), RejectedController> {
        let controller = controller.into();
        let Some(last_frame) = controller.key_set().last_frame() else {
            log::error!("Animation '{name}': controller has an empty key set and was not added");
            return Err(RejectedController {
                reason: AnimationError::EmptyKeySet,
                controller: Box::new(controller),
            });
        };

        let key = match self.by_name.get(name) {
            Some(&key) => key,
            None => {
                let key = self.sets.insert(AnimationSet::new(name.to_owned()));
                self.by_name.insert(name.to_owned(), key);
                self.layers.push(key);
                self.sort_layers();
                key
            }
        };

        let set = &mut self.sets[key];
        set.frame_length = set.frame_length.max(i32::try_from(last_frame).unwrap_or(i32::MAX));
        set.controllers.push(controller);
        set.key_cache.push(KeyBounds::default());
        Ok(())
    }

    /// Removes a set and everything it owns. A transition towards it is
    /// abandoned.
    pub fn remove_animation_set(&mut self, name: &str) -> Result<AnimationSet> {
        let key = self
            .by_name
            .remove(name)
            .ok_or_else(|| AnimationError::AnimationNotFound(name.to_owned()))?;
        self.layers.retain(|&k| k != key);
        if self.transition.is_some_and(|t| t.target == key) {
            self.transition = None;
        }
        self.sets
            .remove(key)
            .ok_or_else(|| AnimationError::AnimationNotFound(name.to_owned()))
    }

    #[must_use]
    pub fn animation_count(&self) -> usize {
        self.layers.len()
    }

    /// Names of all sets in layer order.
    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.layers
            .iter()
            .filter_map(|&k| self.sets.get(k))
            .map(AnimationSet::name)
    }

    #[must_use]
    pub fn animation_set(&self, name: &str) -> Option<&AnimationSet> {
        self.by_name.get(name).and_then(|&k| self.sets.get(k))
    }

    /// Every node driven by at least one controller, without duplicates.
    #[must_use]
    pub fn affected_nodes(&self) -> Vec<NodeHandle> {
        let mut seen = FxHashSet::default();
        let mut nodes = Vec::new();
        for set in self.layers.iter().filter_map(|&k| self.sets.get(k)) {
            for controller in &set.controllers {
                let owner = controller.owner();
                if seen.insert(owner) {
                    nodes.push(owner);
                }
            }
        }
        nodes
    }

    fn set_mut(&mut self, name: &str) -> Result<&mut AnimationSet> {
        self.by_name
            .get(name)
            .and_then(|&k| self.sets.get_mut(k))
            .ok_or_else(|| AnimationError::AnimationNotFound(name.to_owned()))
    }

    fn sort_layers(&mut self) {
        let sets = &self.sets;
        self.layers
            .sort_by_key(|&k| Reverse(sets.get(k).map_or(0, |s| s.track)));
    }

    // ========================================================================
    // Playback control
    // ========================================================================

    /// Starts a set from its first frame. Does nothing if it is already
    /// playing.
    ///
    /// With `stop_and_reset_all_tracks` every other set is stopped and reset
    /// to its first key; otherwise only sets on the track of an active
    /// transition target are.
    pub fn play(&mut self, name: &str, stop_and_reset_all_tracks: bool) -> Result<()> {
        let key = *self
            .by_name
            .get(name)
            .ok_or_else(|| AnimationError::AnimationNotFound(name.to_owned()))?;
        let frame = self.current_frame;
        let Some(set) = self.sets.get_mut(key) else {
            return Err(AnimationError::AnimationNotFound(name.to_owned()));
        };
        if set.playing {
            return Ok(());
        }
        set.play(frame);

        let transition_track = self
            .transition
            .and_then(|t| self.sets.get(t.target))
            .map(|s| s.track);
        for (other_key, other) in &mut self.sets {
            if other_key == key {
                continue;
            }
            if stop_and_reset_all_tracks || transition_track == Some(other.track) {
                other.stop(true);
            }
        }
        Ok(())
    }

    /// Stops a set. With `reset_back_to_start` its nodes return to the first
    /// key on the next composition pass.
    pub fn stop(&mut self, name: &str, reset_back_to_start: bool) -> Result<()> {
        self.set_mut(name)?.stop(reset_back_to_start);
        Ok(())
    }

    pub fn stop_all(&mut self, reset_back_to_start: bool) {
        for set in self.sets.values_mut() {
            set.stop(reset_back_to_start);
        }
    }

    /// Immediately poses the set's nodes on its first key.
    pub fn reset_back_to_start(
        &mut self,
        name: &str,
        target: &mut dyn TransformTarget,
    ) -> Result<()> {
        let set = self.set_mut(name)?;
        reset_controllers(set, target);
        Ok(())
    }

    /// Frame is clamped to `[0, frame_length]`.
    pub fn set_frame(&mut self, name: &str, frame: i32) -> Result<()> {
        let current = self.current_frame;
        self.set_mut(name)?.set_frame(current, frame);
        Ok(())
    }

    /// Changes playback speed, keeping the current frame.
    pub fn set_speed(&mut self, name: &str, speed: f32) -> Result<()> {
        let current = self.current_frame;
        let set = self.set_mut(name)?;
        set.speed = if speed.is_nan() { 0.0 } else { speed };
        let frame = set.frame;
        set.rebase(current, frame);
        Ok(())
    }

    /// Weight is clamped to `[0, 1]`.
    pub fn set_weight(&mut self, name: &str, weight: f32) -> Result<()> {
        self.set_mut(name)?.set_weight(weight);
        Ok(())
    }

    pub fn set_wrap_mode(&mut self, name: &str, mode: WrapMode) -> Result<()> {
        self.set_mut(name)?.wrap_mode = mode;
        Ok(())
    }

    pub fn set_blend_mode(&mut self, name: &str, mode: BlendMode) -> Result<()> {
        self.set_mut(name)?.blend_mode = mode;
        Ok(())
    }

    /// Higher tracks are composited first and so take precedence.
    pub fn set_track(&mut self, name: &str, track: u32) -> Result<()> {
        self.set_mut(name)?.track = track;
        self.sort_layers();
        Ok(())
    }

    /// Ignored for `Bounce` sets, which manage their own direction.
    pub fn set_reverse(&mut self, name: &str, reverse: bool) -> Result<()> {
        let current = self.current_frame;
        self.set_mut(name)?.set_reverse(current, reverse);
        Ok(())
    }

    // ========================================================================
    // Getters
    // ========================================================================

    #[must_use]
    pub fn is_playing(&self, name: &str) -> Option<bool> {
        self.animation_set(name).map(AnimationSet::is_playing)
    }

    #[must_use]
    pub fn frame(&self, name: &str) -> Option<i32> {
        self.animation_set(name).map(AnimationSet::frame)
    }

    #[must_use]
    pub fn speed(&self, name: &str) -> Option<f32> {
        self.animation_set(name).map(AnimationSet::speed)
    }

    #[must_use]
    pub fn frame_length(&self, name: &str) -> Option<i32> {
        self.animation_set(name).map(AnimationSet::frame_length)
    }

    #[must_use]
    pub fn weight(&self, name: &str) -> Option<f32> {
        self.animation_set(name).map(AnimationSet::weight)
    }

    /// Blend amount the set was applied with in the last composition pass.
    #[must_use]
    pub fn applied_weight(&self, name: &str) -> Option<f32> {
        self.animation_set(name).map(AnimationSet::applied_weight)
    }

    #[must_use]
    pub fn wrap_mode(&self, name: &str) -> Option<WrapMode> {
        self.animation_set(name).map(AnimationSet::wrap_mode)
    }

    #[must_use]
    pub fn blend_mode(&self, name: &str) -> Option<BlendMode> {
        self.animation_set(name).map(AnimationSet::blend_mode)
    }

    #[must_use]
    pub fn track(&self, name: &str) -> Option<u32> {
        self.animation_set(name).map(AnimationSet::track)
    }

    #[must_use]
    pub fn is_reverse(&self, name: &str) -> Option<bool> {
        self.animation_set(name).map(AnimationSet::is_reverse)
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    /// Installs the handler receiving every trigger crossing of this mixer.
    pub fn set_callback_handler(&mut self, handler: impl FnMut(&AnimationEvent<'_>) + 'static) {
        self.callback = Some(Box::new(handler));
    }

    pub fn clear_callback_handler(&mut self) {
        self.callback = None;
    }

    /// Fires the handler with `user_data` whenever set `name` passes `frame`.
    pub fn set_callback_trigger(&mut self, name: &str, frame: i32, user_data: i32) -> Result<()> {
        self.set_mut(name)?
            .triggers
            .push(CallbackTrigger { frame, user_data });
        Ok(())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Cross-fades from the currently weighted sets to `name` over
    /// `duration` seconds.
    ///
    /// Sets on the target's track (or every set, with `affect_all_tracks`)
    /// fade out while the target fades in. Repeating the call for the active
    /// target, targeting a set already playing at full weight, or targeting
    /// an additive set does nothing.
    pub fn transition(&mut self, name: &str, duration: f32, affect_all_tracks: bool) -> Result<()> {
        let key = *self
            .by_name
            .get(name)
            .ok_or_else(|| AnimationError::AnimationNotFound(name.to_owned()))?;
        if self.transition.is_some_and(|t| t.target == key) {
            return Ok(());
        }

        let current = self.current_frame;
        let Some(set) = self.sets.get_mut(key) else {
            return Err(AnimationError::AnimationNotFound(name.to_owned()));
        };
        if set.playing && set.weight >= 1.0 {
            return Ok(());
        }
        if set.blend_mode == BlendMode::Additive {
            log::debug!("Transition to additive animation '{name}' ignored");
            return Ok(());
        }

        if set.weight < RESTART_WEIGHT {
            // Stale phase would pop; start from the beginning.
            set.weight = 0.0;
            set.play(current);
        } else if !set.playing {
            // Mid-fade re-trigger: resume where it is.
            set.playing = true;
            let frame = set.frame;
            set.rebase(current, frame);
        }

        log::debug!("Transition to '{name}' over {duration}s (all tracks: {affect_all_tracks})");
        self.transition = Some(Transition {
            target: key,
            total_time: if duration.is_nan() { 0.0 } else { duration.max(0.0) },
            elapsed_time: 0.0,
            affect_all_tracks,
        });
        Ok(())
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Advances time, composites all sets onto `target` and steps the active
    /// transition.
    pub fn tick(&mut self, dt: f32, target: &mut dyn TransformTarget) {
        self.advance_time(dt);
        self.advance_animation(target);
        self.advance_transition(dt);
    }

    /// Moves the global frame counter by `dt` seconds, resolves the frame of
    /// every weighted set and fires trigger callbacks.
    pub fn advance_time(&mut self, dt: f32) {
        if self.sets.is_empty() {
            return;
        }

        let fps = f64::from(self.settings.frame_rate());
        let limit = f64::from(self.settings.epoch_frame_limit);

        self.time += f64::from(dt);
        let mut frame = (self.time * fps).floor();
        if frame > limit {
            self.reset_epoch(fps);
            frame = (self.time * fps).floor().min(limit);
        }
        self.current_frame = frame as i32;

        let global = self.current_frame;
        let play_once_end = self.settings.play_once_end;
        for &key in &self.layers {
            let Some(set) = self.sets.get_mut(key) else {
                continue;
            };
            if set.weight <= 0.0 {
                continue;
            }

            let crossing = set.advance(global, play_once_end);
            let Some(handler) = self.callback.as_mut() else {
                continue;
            };
            if crossing.is_empty() {
                continue;
            }
            for trigger in &set.triggers {
                if crossing.contains(trigger.frame) {
                    handler(&AnimationEvent {
                        mixer: self.key,
                        animation_name: &set.name,
                        frame: trigger.frame,
                        user_data: trigger.user_data,
                    });
                }
            }
        }
    }

    /// Restarts the epoch at the current frame. Start frames move with it so
    /// every set keeps its phase.
    fn reset_epoch(&mut self, fps: f64) {
        let shift = self.current_frame;
        log::debug!("Mixer {:?}: frame counter epoch reset after {shift} frames", self.key);

        self.time = (self.time - f64::from(shift) / fps).max(0.0);
        self.current_frame = 0;
        for set in self.sets.values_mut() {
            set.start_frame = set.start_frame.saturating_sub(shift);
        }
    }

    /// Composites every weighted set onto `target` at its current frame.
    pub fn advance_animation(&mut self, target: &mut dyn TransformTarget) {
        let mut layer = std::mem::take(&mut self.layer_scratch);
        let mut additive = std::mem::take(&mut self.additive_scratch);
        layer.clear();
        additive.clear();

        for set in self.sets.values_mut() {
            set.applied_weight = 0.0;
            if std::mem::take(&mut set.pending_reset) {
                reset_controllers(set, target);
            }
        }

        let mut remaining = 1.0_f32;
        for &key in &self.layers {
            let Some(set) = self.sets.get(key) else {
                continue;
            };
            if set.blend_weight() <= 0.0 {
                continue;
            }
            if set.blend_mode == BlendMode::Additive {
                additive.push(key);
                continue;
            }
            if remaining <= 0.0 {
                continue;
            }

            let track = set.track;
            let same_track = layer
                .last()
                .and_then(|&back| self.sets.get(back))
                .is_none_or(|back| back.track == track);
            if !same_track {
                flush_track(&mut self.sets, &layer, &mut remaining, target);
                layer.clear();
            }
            layer.push(key);
        }
        if !layer.is_empty() {
            flush_track(&mut self.sets, &layer, &mut remaining, target);
        }

        // Additive output is an offset on top of a base pose; without any
        // normal set contributing there is nothing to offset.
        if remaining < 1.0 && !additive.is_empty() {
            blend_sets(&mut self.sets, &additive, 1.0, target);
        }

        for set in self.sets.values_mut() {
            set.finishing_weight = None;
        }

        self.layer_scratch = layer;
        self.additive_scratch = additive;
    }

    /// Steps the active transition by `dt` seconds.
    pub fn advance_transition(&mut self, dt: f32) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };
        let Some(target_track) = self.sets.get(transition.target).map(|s| s.track) else {
            self.transition = None;
            return;
        };

        let step = if transition.total_time > 0.0 {
            dt / transition.total_time
        } else {
            1.0
        };
        let epsilon = self.settings.weight_epsilon;

        for (key, set) in &mut self.sets {
            if key == transition.target {
                set.set_weight(set.weight + step);
            } else if transition.affect_all_tracks || set.track == target_track {
                set.set_weight(set.weight - step);
                if set.weight < epsilon {
                    set.playing = false;
                    set.frame = 0;
                    set.weight = 0.0;
                }
            }
        }

        // Checked before accumulating so the last step is applied in full.
        let finished = transition.elapsed_time >= transition.total_time;
        transition.elapsed_time += dt;
        if finished {
            log::debug!("Mixer {:?}: transition finished", self.key);
            self.transition = None;
        }
    }
}

/// Blends one track group, renormalising it to a total weight of at most 1
/// and limiting it to the weight budget left by higher tracks.
fn flush_track(
    sets: &mut SlotMap<AnimationSetKey, AnimationSet>,
    layer: &[AnimationSetKey],
    remaining: &mut f32,
    target: &mut dyn TransformTarget,
) {
    let mut total: f32 = layer
        .iter()
        .filter_map(|&k| sets.get(k))
        .map(AnimationSet::blend_weight)
        .sum();
    let mut scale = 1.0;
    if total > 1.0 {
        scale = 1.0 / total;
        total = 1.0;
    }
    if total > *remaining {
        scale *= *remaining / total;
    }

    blend_sets(sets, layer, scale, target);
    *remaining -= total.min(*remaining);
}

/// Runs the controller cycle of every set in `keys` at its current frame.
fn blend_sets(
    sets: &mut SlotMap<AnimationSetKey, AnimationSet>,
    keys: &[AnimationSetKey],
    scale: f32,
    target: &mut dyn TransformTarget,
) {
    for &key in keys {
        let Some(set) = sets.get_mut(key) else {
            continue;
        };
        let amount = set.blend_weight() * scale;
        set.applied_weight = amount;
        let frame = set.frame.max(0).unsigned_abs();

        for (controller, cache) in set.controllers.iter_mut().zip(set.key_cache.iter_mut()) {
            let timeline = controller.key_set();
            if timeline.key_count() == 0 {
                continue;
            }

            let bounds = timeline.frame_bounds_cached(frame, set.reverse, *cache);
            *cache = bounds;
            let from_frame = timeline.frame_of(bounds.from).unwrap_or(0);
            let to_frame = timeline.frame_of(bounds.to).unwrap_or(0);

            controller.animation_start();
            if to_frame > from_frame {
                let u = frame.saturating_sub(from_frame) as f32 / (to_frame - from_frame) as f32;
                controller.animate_forward(bounds.from, bounds.to, u);
            } else {
                controller.animate_to_key(bounds.from);
            }
            controller.animation_end(set.blend_mode, amount, target);
        }
    }
}

/// Poses every controller of `set` on its first key at full strength.
fn reset_controllers(set: &mut AnimationSet, target: &mut dyn TransformTarget) {
    for (controller, cache) in set.controllers.iter_mut().zip(set.key_cache.iter_mut()) {
        if controller.key_set().key_count() == 0 {
            continue;
        }
        controller.animation_start();
        controller.animate_to_key(0);
        controller.animation_end(set.blend_mode, 1.0, target);
        *cache = KeyBounds::default();
    }
    set.frame = 0;
}
