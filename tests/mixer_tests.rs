//! Animation Mixer Tests
//!
//! Tests for:
//! - Setter clamping and name lookup failures
//! - Wrap modes driven through the mixer (PlayOnce, Loop, Bounce, reverse)
//! - Track grouping, weight normalisation and the global weight budget
//! - Additive layering
//! - Cross-fade transitions
//! - Frame callbacks
//! - Epoch reset of the global frame counter

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use cadence::prelude::*;

const EPSILON: f32 = 1e-4;
const FRAME: f32 = 1.0 / 30.0;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

// ============================================================================
// Helpers
// ============================================================================

/// Key set moving a node along X, one unit per frame, over `[0, len]`.
fn ramp(len: u32) -> std::sync::Arc<TransformKeySet> {
    let mut builder = KeySetBuilder::new();
    builder
        .add_keys([
            (0, TransformKey::from_position(Vec3::ZERO)),
            (len, TransformKey::from_position(Vec3::new(len as f32, 0.0, 0.0))),
        ])
        .unwrap();
    builder.build()
}

/// Key set holding a node still at `x`.
fn hold(x: f32, len: u32) -> std::sync::Arc<TransformKeySet> {
    let mut builder = KeySetBuilder::new();
    builder
        .add_keys([
            (0, TransformKey::from_position(Vec3::new(x, 0.0, 0.0))),
            (len, TransformKey::from_position(Vec3::new(x, 0.0, 0.0))),
        ])
        .unwrap();
    builder.build()
}

struct Rig {
    scene: Scene,
    node: NodeHandle,
    mixer: AnimationMixer,
}

impl Rig {
    fn new() -> Self {
        let mut scene = Scene::new();
        let node = scene.create_node_with_name("hips");
        Self {
            scene,
            node,
            mixer: AnimationMixer::new(),
        }
    }

    fn add(&mut self, name: &str, keys: std::sync::Arc<TransformKeySet>) {
        let controller = TransformController::new(keys, self.node, TransformState::IDENTITY);
        self.mixer.add_controller(name, controller).unwrap();
    }

    /// Adds a set at full weight and starts it.
    fn add_playing(&mut self, name: &str, keys: std::sync::Arc<TransformKeySet>, mode: WrapMode) {
        self.add(name, keys);
        self.mixer.set_weight(name, 1.0).unwrap();
        self.mixer.set_wrap_mode(name, mode).unwrap();
        self.mixer.play(name, false).unwrap();
    }

    fn tick_frames(&mut self, frames: u32) {
        for _ in 0..frames {
            self.mixer.tick(FRAME, &mut self.scene);
        }
    }

    fn x(&self) -> f32 {
        self.scene.get_node(self.node).unwrap().transform.position.x
    }

    fn frame(&self, name: &str) -> i32 {
        self.mixer.frame(name).unwrap()
    }
}

// ============================================================================
// Setters & Lookup
// ============================================================================

#[test]
fn set_weight_is_clamped() {
    let mut rig = Rig::new();
    rig.add("walk", ramp(30));

    rig.mixer.set_weight("walk", 5.0).unwrap();
    assert_eq!(rig.mixer.weight("walk"), Some(1.0));

    rig.mixer.set_weight("walk", -3.0).unwrap();
    assert_eq!(rig.mixer.weight("walk"), Some(0.0));
}

#[test]
fn unknown_set_fails_without_side_effects() {
    let mut rig = Rig::new();
    rig.add("walk", ramp(30));

    let err = rig.mixer.set_speed("run", 2.0).unwrap_err();
    assert_eq!(err, AnimationError::AnimationNotFound("run".to_string()));
    assert_eq!(rig.mixer.speed("walk"), Some(1.0));
    assert_eq!(rig.mixer.animation_count(), 1);
}

#[test]
fn new_sets_have_documented_defaults() {
    let mut rig = Rig::new();
    rig.add("walk", ramp(30));

    assert_eq!(rig.mixer.weight("walk"), Some(0.0));
    assert_eq!(rig.mixer.wrap_mode("walk"), Some(WrapMode::PlayOnce));
    assert_eq!(rig.mixer.blend_mode("walk"), Some(BlendMode::Blend));
    assert_eq!(rig.mixer.track("walk"), Some(0));
    assert_eq!(rig.mixer.is_playing("walk"), Some(false));
    assert_eq!(rig.mixer.frame_length("walk"), Some(30));
}

#[test]
fn frame_length_is_longest_controller() {
    let mut scene = Scene::new();
    let a = scene.create_node();
    let b = scene.create_node();

    let mut mixer = AnimationMixer::new();
    mixer
        .add_controller("walk", TransformController::new(ramp(20), a, TransformState::IDENTITY))
        .unwrap();
    mixer
        .add_controller("walk", TransformController::new(ramp(45), b, TransformState::IDENTITY))
        .unwrap();

    assert_eq!(mixer.frame_length("walk"), Some(45));
    assert_eq!(mixer.affected_nodes(), vec![a, b]);
}

#[test]
fn empty_key_set_controller_is_handed_back() {
    let mut rig = Rig::new();
    let empty = KeySetBuilder::<TransformKey>::new().build();
    let controller = TransformController::new(empty, rig.node, TransformState::IDENTITY);

    let rejected = rig.mixer.add_controller("walk", controller).unwrap_err();
    assert_eq!(rejected.reason, AnimationError::EmptyKeySet);
    assert_eq!(rejected.controller.owner(), rig.node);
    assert_eq!(rig.mixer.animation_count(), 0);
}

#[test]
fn set_frame_clamps_to_length() {
    let mut rig = Rig::new();
    rig.add("walk", ramp(30));

    rig.mixer.set_frame("walk", 99).unwrap();
    assert_eq!(rig.frame("walk"), 30);
    rig.mixer.set_frame("walk", -4).unwrap();
    assert_eq!(rig.frame("walk"), 0);
}

#[test]
fn set_frame_while_playing_continues_from_there() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.tick_frames(5);

    rig.mixer.set_frame("walk", 20).unwrap();
    rig.tick_frames(1);
    assert_eq!(rig.frame("walk"), 21);
    assert!(approx(rig.x(), 21.0), "got {}", rig.x());
}

// ============================================================================
// Wrap Modes
// ============================================================================

#[test]
fn play_once_holds_last_frame_after_end() {
    let mut rig = Rig::new();
    rig.add_playing("wave", ramp(30), WrapMode::PlayOnce);

    rig.tick_frames(31);
    assert_eq!(rig.frame("wave"), 30);
    assert_eq!(rig.mixer.is_playing("wave"), Some(false));
    assert_eq!(rig.mixer.weight("wave"), Some(0.0));

    for _ in 0..10 {
        rig.tick_frames(1);
        assert_eq!(rig.frame("wave"), 30);
    }
}

#[test]
fn play_once_end_pose_reaches_the_node() {
    let mut rig = Rig::new();
    rig.add_playing("wave", ramp(30), WrapMode::PlayOnce);
    rig.tick_frames(20);
    assert!(approx(rig.x(), 20.0));

    // Overrun the end in a single tick.
    rig.mixer.tick(15.0 * FRAME, &mut rig.scene);
    assert_eq!(rig.frame("wave"), 30);
    assert_eq!(rig.mixer.weight("wave"), Some(0.0));
    assert_eq!(rig.mixer.applied_weight("wave"), Some(1.0));
    assert!(approx(rig.x(), 30.0));

    rig.tick_frames(5);
    assert_eq!(rig.mixer.applied_weight("wave"), Some(0.0));
    assert!(approx(rig.x(), 30.0));
}

#[test]
fn play_once_rewind_policy_poses_first_key() {
    let settings = AnimationSettings {
        play_once_end: PlayOnceEnd::Rewind,
        ..Default::default()
    };
    let mut rig = Rig::new();
    rig.mixer = AnimationMixer::with_settings(settings);
    rig.add_playing("wave", ramp(30), WrapMode::PlayOnce);
    rig.tick_frames(20);

    rig.mixer.tick(15.0 * FRAME, &mut rig.scene);
    assert_eq!(rig.frame("wave"), 0);
    assert!(approx(rig.x(), 0.0));
}

#[test]
fn play_once_rewind_policy_snaps_to_start() {
    let settings = AnimationSettings {
        play_once_end: PlayOnceEnd::Rewind,
        ..Default::default()
    };
    let mut rig = Rig::new();
    rig.mixer = AnimationMixer::with_settings(settings);
    rig.add_playing("wave", ramp(30), WrapMode::PlayOnce);

    rig.tick_frames(31);
    assert_eq!(rig.frame("wave"), 0);
    assert_eq!(rig.mixer.is_playing("wave"), Some(false));
}

#[test]
fn loop_steps_across_the_wrap() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);

    rig.tick_frames(29);
    assert_eq!(rig.frame("walk"), 29);

    rig.mixer.tick(2.0 * FRAME, &mut rig.scene);
    assert_eq!(rig.frame("walk"), 1);
}

#[test]
fn loop_has_no_pop_at_the_wrap() {
    // 0 -> 15 -> 0: a cyclic motion, one unit per frame in either direction.
    let mut builder = KeySetBuilder::new();
    builder
        .add_keys([
            (0, TransformKey::from_position(Vec3::ZERO)),
            (15, TransformKey::from_position(Vec3::new(15.0, 0.0, 0.0))),
            (30, TransformKey::from_position(Vec3::ZERO)),
        ])
        .unwrap();

    let mut rig = Rig::new();
    rig.add_playing("walk", builder.build(), WrapMode::Loop);
    rig.tick_frames(26);

    let mut previous = rig.x();
    for _ in 0..8 {
        rig.tick_frames(1);
        let x = rig.x();
        assert!((x - previous).abs() <= 1.0 + EPSILON, "jump {previous} -> {x}");
        previous = x;
    }
}

#[test]
fn bounce_turns_around_at_the_end() {
    let mut rig = Rig::new();
    rig.add_playing("sway", ramp(30), WrapMode::Bounce);

    rig.tick_frames(30);
    assert_eq!(rig.frame("sway"), 30);
    assert_eq!(rig.mixer.is_reverse("sway"), Some(false));

    rig.tick_frames(2);
    assert_eq!(rig.frame("sway"), 28);
    assert_eq!(rig.mixer.is_reverse("sway"), Some(true));

    rig.tick_frames(1);
    assert_eq!(rig.frame("sway"), 27);
    assert!(approx(rig.x(), 27.0));
}

#[test]
fn set_reverse_is_ignored_for_bounce() {
    let mut rig = Rig::new();
    rig.add_playing("sway", ramp(30), WrapMode::Bounce);

    rig.mixer.set_reverse("sway", true).unwrap();
    assert_eq!(rig.mixer.is_reverse("sway"), Some(false));
}

#[test]
fn reverse_playback_runs_backwards_from_current_frame() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.tick_frames(20);

    rig.mixer.set_reverse("walk", true).unwrap();
    rig.tick_frames(5);
    assert_eq!(rig.frame("walk"), 15);
    assert!(approx(rig.x(), 15.0));
}

#[test]
fn zero_speed_pauses_on_current_frame() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.tick_frames(10);

    rig.mixer.set_speed("walk", 0.0).unwrap();
    rig.tick_frames(5);
    assert_eq!(rig.frame("walk"), 10);
    assert!(approx(rig.x(), 10.0));

    rig.mixer.set_speed("walk", 1.0).unwrap();
    rig.tick_frames(3);
    assert_eq!(rig.frame("walk"), 13);
}

#[test]
fn speed_scales_playback() {
    let mut rig = Rig::new();
    rig.add_playing("run", ramp(30), WrapMode::Loop);
    rig.mixer.set_speed("run", 2.0).unwrap();

    rig.tick_frames(5);
    assert_eq!(rig.frame("run"), 10);
}

#[test]
fn zero_length_set_is_a_static_pose() {
    let mut builder = KeySetBuilder::new();
    builder
        .add_key(0, TransformKey::from_position(Vec3::new(4.0, 0.0, 0.0)))
        .unwrap();

    let mut rig = Rig::new();
    rig.add_playing("pose", builder.build(), WrapMode::Loop);
    rig.tick_frames(10);

    assert_eq!(rig.frame("pose"), 0);
    assert!(approx(rig.x(), 4.0));
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn same_track_weights_are_normalised() {
    let mut rig = Rig::new();
    for name in ["a", "b", "c"] {
        rig.add(name, hold(1.0, 30));
        rig.mixer.set_weight(name, 0.5).unwrap();
        rig.mixer.play(name, false).unwrap();
    }

    rig.tick_frames(1);
    for name in ["a", "b", "c"] {
        let applied = rig.mixer.applied_weight(name).unwrap();
        assert!(approx(applied, 1.0 / 3.0), "{name}: {applied}");
    }
}

#[test]
fn weights_under_one_are_not_scaled_up() {
    let mut rig = Rig::new();
    rig.add("a", hold(1.0, 30));
    rig.add("b", hold(2.0, 30));
    rig.mixer.set_weight("a", 0.25).unwrap();
    rig.mixer.set_weight("b", 0.5).unwrap();

    rig.tick_frames(1);
    assert!(approx(rig.mixer.applied_weight("a").unwrap(), 0.25));
    assert!(approx(rig.mixer.applied_weight("b").unwrap(), 0.5));
}

#[test]
fn higher_track_consumes_budget_first() {
    let mut rig = Rig::new();
    rig.add("base", hold(1.0, 30));
    rig.add("overlay", hold(5.0, 30));
    rig.mixer.set_track("overlay", 2).unwrap();
    rig.mixer.set_weight("base", 1.0).unwrap();
    rig.mixer.set_weight("overlay", 0.6).unwrap();

    let order: Vec<_> = rig.mixer.animation_names().collect();
    assert_eq!(order, ["overlay", "base"]);

    rig.tick_frames(1);
    assert!(approx(rig.mixer.applied_weight("overlay").unwrap(), 0.6));
    assert!(approx(rig.mixer.applied_weight("base").unwrap(), 0.4));
}

#[test]
fn exhausted_budget_skips_lower_tracks() {
    let mut rig = Rig::new();
    rig.add("base", hold(1.0, 30));
    rig.add("overlay", hold(5.0, 30));
    rig.mixer.set_track("overlay", 1).unwrap();
    rig.mixer.set_weight("base", 1.0).unwrap();
    rig.mixer.set_weight("overlay", 1.0).unwrap();

    rig.tick_frames(1);
    assert_eq!(rig.mixer.applied_weight("base"), Some(0.0));
    assert!(approx(rig.x(), 5.0));
}

#[test]
fn additive_needs_a_base_pose() {
    let mut rig = Rig::new();
    rig.add("flinch", hold(2.0, 30));
    rig.mixer.set_blend_mode("flinch", BlendMode::Additive).unwrap();
    rig.mixer.set_weight("flinch", 1.0).unwrap();

    rig.tick_frames(1);
    assert_eq!(rig.mixer.applied_weight("flinch"), Some(0.0));
    assert!(approx(rig.x(), 0.0));

    rig.add("idle", hold(1.0, 30));
    rig.mixer.set_weight("idle", 1.0).unwrap();
    rig.tick_frames(1);
    assert_eq!(rig.mixer.applied_weight("flinch"), Some(1.0));
    // Base pose 1.0 plus an offset of 2.0 from the bind pose at the origin.
    assert!(approx(rig.x(), 3.0), "got {}", rig.x());
}

#[test]
fn additive_ignores_the_weight_budget() {
    let mut rig = Rig::new();
    rig.add("idle", hold(1.0, 30));
    rig.add("lean", hold(4.0, 30));
    rig.mixer.set_blend_mode("lean", BlendMode::Additive).unwrap();
    rig.mixer.set_weight("idle", 1.0).unwrap();
    rig.mixer.set_weight("lean", 0.5).unwrap();

    rig.tick_frames(1);
    assert_eq!(rig.mixer.applied_weight("lean"), Some(0.5));
    assert!(approx(rig.x(), 3.0), "got {}", rig.x());
}

#[test]
fn stopped_set_still_contributes_its_held_pose() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.tick_frames(10);

    rig.mixer.stop("walk", false).unwrap();
    rig.tick_frames(5);
    assert_eq!(rig.frame("walk"), 10);
    assert!(approx(rig.x(), 10.0));
}

#[test]
fn stop_with_reset_returns_to_first_key() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.tick_frames(10);

    rig.mixer.stop("walk", true).unwrap();
    assert_eq!(rig.mixer.is_playing("walk"), Some(false));
    assert_eq!(rig.frame("walk"), 0);

    rig.mixer.set_weight("walk", 0.0).unwrap();
    rig.tick_frames(1);
    assert!(approx(rig.x(), 0.0));
}

#[test]
fn reset_back_to_start_is_immediate() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.tick_frames(12);
    assert!(approx(rig.x(), 12.0));

    rig.mixer.reset_back_to_start("walk", &mut rig.scene).unwrap();
    assert!(approx(rig.x(), 0.0));
    assert_eq!(rig.frame("walk"), 0);
}

#[test]
fn play_can_stop_and_reset_everything_else() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.add("run", ramp(30));
    rig.tick_frames(5);

    rig.mixer.play("run", true).unwrap();
    assert_eq!(rig.mixer.is_playing("walk"), Some(false));
    assert_eq!(rig.frame("walk"), 0);
    assert_eq!(rig.mixer.is_playing("run"), Some(true));
}

#[test]
fn stop_all_stops_every_set() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.add_playing("wave", ramp(30), WrapMode::Loop);

    rig.mixer.stop_all(false);
    assert_eq!(rig.mixer.is_playing("walk"), Some(false));
    assert_eq!(rig.mixer.is_playing("wave"), Some(false));
}

// ============================================================================
// Transitions
// ============================================================================

fn idle_and_walk() -> Rig {
    let mut rig = Rig::new();
    rig.add_playing("idle", hold(0.0, 30), WrapMode::Loop);
    rig.add("walk", ramp(30));
    rig.mixer.set_wrap_mode("walk", WrapMode::Loop).unwrap();
    rig
}

#[test]
fn transition_cross_fades_over_duration() {
    let mut rig = idle_and_walk();
    rig.mixer.transition("walk", 1.0, false).unwrap();
    assert!(rig.mixer.is_transition_active());
    assert_eq!(rig.mixer.is_playing("walk"), Some(true));

    for _ in 0..10 {
        rig.mixer.tick(0.1, &mut rig.scene);
    }

    assert!(approx(rig.mixer.weight("walk").unwrap(), 1.0));
    assert!(approx(rig.mixer.weight("idle").unwrap(), 0.0));
    assert_eq!(rig.mixer.is_playing("idle"), Some(false));
    assert_eq!(rig.frame("idle"), 0);

    rig.mixer.tick(0.1, &mut rig.scene);
    assert!(!rig.mixer.is_transition_active());
}

#[test]
fn transition_is_halfway_at_half_time() {
    let mut rig = idle_and_walk();
    rig.mixer.transition("walk", 1.0, false).unwrap();
    for _ in 0..5 {
        rig.mixer.tick(0.1, &mut rig.scene);
    }
    assert!(approx(rig.mixer.weight("walk").unwrap(), 0.5));
    assert!(approx(rig.mixer.weight("idle").unwrap(), 0.5));
}

#[test]
fn zero_length_transition_snaps() {
    let mut rig = idle_and_walk();
    rig.mixer.transition("walk", 0.0, false).unwrap();
    rig.mixer.tick(FRAME, &mut rig.scene);

    assert_eq!(rig.mixer.weight("walk"), Some(1.0));
    assert_eq!(rig.mixer.weight("idle"), Some(0.0));
    assert!(!rig.mixer.is_transition_active());
}

#[test]
fn transition_leaves_other_tracks_alone() {
    let mut rig = idle_and_walk();
    rig.add_playing("wave", hold(0.0, 30), WrapMode::Loop);
    rig.mixer.set_track("wave", 3).unwrap();

    rig.mixer.transition("walk", 0.0, false).unwrap();
    rig.mixer.tick(FRAME, &mut rig.scene);
    assert_eq!(rig.mixer.weight("wave"), Some(1.0));

    let mut rig = idle_and_walk();
    rig.add_playing("wave", hold(0.0, 30), WrapMode::Loop);
    rig.mixer.set_track("wave", 3).unwrap();
    rig.mixer.transition("walk", 0.0, true).unwrap();
    rig.mixer.tick(FRAME, &mut rig.scene);
    assert_eq!(rig.mixer.weight("wave"), Some(0.0));
}

#[test]
fn transition_to_additive_set_is_ignored() {
    let mut rig = idle_and_walk();
    rig.mixer.set_blend_mode("walk", BlendMode::Additive).unwrap();

    rig.mixer.transition("walk", 1.0, false).unwrap();
    assert!(!rig.mixer.is_transition_active());
    assert_eq!(rig.mixer.is_playing("walk"), Some(false));
}

#[test]
fn transition_to_fully_playing_set_is_ignored() {
    let mut rig = idle_and_walk();
    rig.mixer.transition("idle", 1.0, false).unwrap();
    assert!(!rig.mixer.is_transition_active());
}

#[test]
fn repeated_transition_does_not_restart() {
    let mut rig = idle_and_walk();
    rig.mixer.transition("walk", 1.0, false).unwrap();
    for _ in 0..3 {
        rig.mixer.tick(0.1, &mut rig.scene);
    }
    let frame = rig.frame("walk");

    rig.mixer.transition("walk", 1.0, false).unwrap();
    rig.mixer.tick(0.1, &mut rig.scene);
    assert!(rig.frame("walk") > frame);
    assert!(approx(rig.mixer.weight("walk").unwrap(), 0.4));
}

#[test]
fn fresh_transition_target_starts_from_zero() {
    let mut rig = idle_and_walk();
    rig.mixer.set_frame("walk", 17).unwrap();

    rig.mixer.transition("walk", 1.0, false).unwrap();
    assert_eq!(rig.frame("walk"), 0);
}

#[test]
fn removing_target_cancels_transition() {
    let mut rig = idle_and_walk();
    rig.mixer.transition("walk", 1.0, false).unwrap();
    assert_eq!(rig.mixer.transition_target(), Some("walk"));

    let removed = rig.mixer.remove_animation_set("walk").unwrap();
    assert_eq!(removed.name(), "walk");
    assert!(!rig.mixer.is_transition_active());
    assert!(rig.mixer.weight("walk").is_none());
}

// ============================================================================
// Callbacks
// ============================================================================

fn recorder(mixer: &mut AnimationMixer) -> Rc<RefCell<Vec<(String, i32, i32)>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    mixer.set_callback_handler(move |event| {
        sink.borrow_mut()
            .push((event.animation_name.to_string(), event.frame, event.user_data));
    });
    events
}

#[test]
fn callback_fires_once_per_crossing() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.mixer.set_callback_trigger("walk", 15, 7).unwrap();
    let events = recorder(&mut rig.mixer);

    rig.tick_frames(10);
    assert!(events.borrow().is_empty());

    rig.mixer.tick(10.0 * FRAME, &mut rig.scene);
    assert_eq!(rig.frame("walk"), 20);
    assert_eq!(*events.borrow(), vec![("walk".to_string(), 15, 7)]);

    rig.mixer.tick(10.0 * FRAME, &mut rig.scene);
    assert_eq!(events.borrow().len(), 1);
}

#[test]
fn callback_fires_across_loop_wrap() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.mixer.set_callback_trigger("walk", 2, 0).unwrap();
    let events = recorder(&mut rig.mixer);

    rig.tick_frames(28);
    events.borrow_mut().clear();

    // 28 -> wraps -> 3
    rig.mixer.tick(5.0 * FRAME, &mut rig.scene);
    assert_eq!(rig.frame("walk"), 3);
    assert_eq!(events.borrow().len(), 1);
}

#[test]
fn callback_on_start_frame_fires_on_first_advance() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.mixer.set_callback_trigger("walk", 0, 1).unwrap();
    let events = recorder(&mut rig.mixer);

    rig.tick_frames(3);
    assert_eq!(*events.borrow(), vec![("walk".to_string(), 0, 1)]);
}

#[test]
fn callback_fires_once_in_reverse() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.tick_frames(20);
    rig.mixer.set_callback_trigger("walk", 15, 3).unwrap();
    let events = recorder(&mut rig.mixer);

    rig.mixer.set_reverse("walk", true).unwrap();
    rig.tick_frames(10);
    assert_eq!(rig.frame("walk"), 10);
    assert_eq!(*events.borrow(), vec![("walk".to_string(), 15, 3)]);
}

#[test]
fn callback_fires_once_across_bounce_turn() {
    let mut rig = Rig::new();
    rig.add_playing("sway", ramp(30), WrapMode::Bounce);
    rig.mixer.set_callback_trigger("sway", 29, 1).unwrap();
    rig.mixer.set_callback_trigger("sway", 30, 2).unwrap();
    let events = recorder(&mut rig.mixer);

    rig.tick_frames(27);
    assert!(events.borrow().is_empty());

    // 27 -> 30 -> 28: frame 29 is passed twice in one tick, 30 once.
    rig.mixer.tick(5.0 * FRAME, &mut rig.scene);
    assert_eq!(rig.frame("sway"), 28);
    assert_eq!(
        *events.borrow(),
        vec![("sway".to_string(), 29, 1), ("sway".to_string(), 30, 2)]
    );

    rig.tick_frames(1);
    assert_eq!(rig.frame("sway"), 27);
    assert_eq!(events.borrow().len(), 2);
}

#[test]
fn callback_fires_on_tail_after_reverse_loop_wrap() {
    let mut rig = Rig::new();
    rig.add_playing("walk", ramp(30), WrapMode::Loop);
    rig.tick_frames(5);
    rig.mixer.set_reverse("walk", true).unwrap();
    rig.tick_frames(3);
    assert_eq!(rig.frame("walk"), 2);

    rig.mixer.set_callback_trigger("walk", 1, 1).unwrap();
    rig.mixer.set_callback_trigger("walk", 2, 2).unwrap();
    rig.mixer.set_callback_trigger("walk", 28, 28).unwrap();
    let events = recorder(&mut rig.mixer);

    // 2 -> 0 -> wraps -> 27
    rig.mixer.tick(5.0 * FRAME, &mut rig.scene);
    assert_eq!(rig.frame("walk"), 27);
    assert_eq!(
        *events.borrow(),
        vec![("walk".to_string(), 1, 1), ("walk".to_string(), 28, 28)]
    );
}

#[test]
fn callbacks_report_the_mixer() {
    let mut scene = Scene::new();
    let node = scene.create_node();
    let mut manager = ControllerManager::new();
    let key = manager.create_mixer();

    let mixers = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&mixers);
    {
        let mixer = manager.mixer_mut(key).unwrap();
        mixer
            .add_controller("walk", TransformController::new(ramp(30), node, TransformState::IDENTITY))
            .unwrap();
        mixer.set_weight("walk", 1.0).unwrap();
        mixer.play("walk", false).unwrap();
        mixer.set_callback_trigger("walk", 1, 0).unwrap();
        mixer.set_callback_handler(move |event| sink.borrow_mut().push(event.mixer));
    }

    manager.update(FRAME, &mut scene);
    manager.update(FRAME, &mut scene);
    assert_eq!(*mixers.borrow(), vec![key]);
}

// ============================================================================
// Epoch Reset
// ============================================================================

#[test]
fn epoch_reset_preserves_phase() {
    let settings = AnimationSettings {
        epoch_frame_limit: 100,
        ..Default::default()
    };
    let mut rig = Rig::new();
    rig.mixer = AnimationMixer::with_settings(settings);
    rig.add_playing("walk", ramp(30), WrapMode::Loop);

    rig.tick_frames(95);
    assert_eq!(rig.frame("walk"), 5);

    rig.tick_frames(6);
    assert!(rig.mixer.current_frame() < 100);
    assert_eq!(rig.frame("walk"), 11);

    rig.tick_frames(1);
    assert_eq!(rig.frame("walk"), 12);
}
