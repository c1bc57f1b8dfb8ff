//! Headless blend demo.
//!
//! Builds a two-bone rig, records one long take on it, chops the take into
//! "idle", "walk" and "wave" clips and then drives a mixer through a
//! cross-fade with a frame callback attached. Run with `RUST_LOG=info`.

use std::sync::Arc;

use anyhow::Context;
use glam::{Quat, Vec3};

use cadence::prelude::*;

const FPS: u32 = 30;
const DT: f32 = 1.0 / FPS as f32;

/// One take: idle sway over 0..=30, a stride over 40..=70, a wave over 80..=100.
fn hips_take() -> anyhow::Result<Arc<TransformKeySet>> {
    let mut builder = KeySetBuilder::new();
    builder.add_keys([
        (0, TransformKey::from_position(Vec3::ZERO)),
        (15, TransformKey::from_position(Vec3::new(0.0, 0.05, 0.0))),
        (30, TransformKey::from_position(Vec3::ZERO)),
        (40, TransformKey::from_position(Vec3::ZERO)),
        (55, TransformKey::from_position(Vec3::new(0.0, 0.0, 0.5))),
        (70, TransformKey::from_position(Vec3::new(0.0, 0.0, 1.0))),
    ])?;
    Ok(builder.build())
}

fn arm_take() -> anyhow::Result<Arc<TransformKeySet>> {
    let raised = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    let mut builder = KeySetBuilder::new();
    builder.add_keys([
        (0, TransformKey::default()),
        (30, TransformKey::default()),
        (40, TransformKey::default()),
        (70, TransformKey::default()),
        (80, TransformKey::new(Vec3::ZERO, raised, Vec3::ONE)),
        (90, TransformKey::new(Vec3::ZERO, raised * Quat::from_rotation_x(0.4), Vec3::ONE)),
        (100, TransformKey::new(Vec3::ZERO, raised, Vec3::ONE)),
    ])?;
    Ok(builder.build())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut scene = Scene::new();
    let hips = scene.create_node_with_name("hips");
    let arm = scene.create_node_with_name("arm");
    scene.attach(arm, hips);
    scene.set_bind_pose(arm, TransformState::from_position(Vec3::new(0.3, 1.4, 0.0)));

    let mut hips_buffer = AnimationBuffer::new();
    hips_buffer.add_key_set("take", ControllerKind::Transformation, hips_take()?)?;
    scene.set_animation_buffer(hips, Arc::new(hips_buffer));

    let mut arm_buffer = AnimationBuffer::new();
    arm_buffer.add_key_set("take", ControllerKind::Transformation, arm_take()?)?;
    scene.set_animation_buffer(arm, Arc::new(arm_buffer));

    let mut manager = ControllerManager::with_settings(AnimationSettings {
        frames_per_second: FPS,
        ..Default::default()
    });

    let clips = [
        AnimationClip::new("idle", 0, 30),
        AnimationClip::new("walk", 40, 70),
        AnimationClip::new("wave", 80, 100),
    ];
    manager.chop_animation_buffers(&mut scene, hips, &clips, true)?;
    let key = manager.create_mixer_for_hierarchy(&mut scene, hips, true)?;

    let mixer = manager.mixer_mut(key).context("mixer vanished")?;
    log::info!(
        "Mixer holds {} animations: {:?}",
        mixer.animation_count(),
        mixer.animation_names().collect::<Vec<_>>()
    );

    mixer.set_wrap_mode("idle", WrapMode::Loop)?;
    mixer.set_wrap_mode("walk", WrapMode::Loop)?;
    mixer.set_weight("idle", 1.0)?;
    mixer.play("idle", false)?;

    // The wave rides on a higher track on top of whatever the body does.
    mixer.set_track("wave", 1)?;
    mixer.set_blend_mode("wave", BlendMode::Additive)?;
    mixer.set_wrap_mode("wave", WrapMode::Bounce)?;
    mixer.set_weight("wave", 0.5)?;

    mixer.set_callback_trigger("walk", 15, 1)?;
    mixer.set_callback_handler(|event| {
        log::info!(
            "[{:?}] '{}' reached frame {} (user data {})",
            event.mixer,
            event.animation_name,
            event.frame,
            event.user_data
        );
    });

    for tick in 0..150 {
        if tick == 20 {
            let mixer = manager.mixer_mut(key).context("mixer vanished")?;
            mixer.transition("walk", 0.5, false)?;
            log::info!("Cross-fading idle -> walk");
        }
        if tick == 60 {
            let mixer = manager.mixer_mut(key).context("mixer vanished")?;
            mixer.play("wave", false)?;
            log::info!("Layering wave on top");
        }

        manager.update(DT, &mut scene);
        scene.update_matrix_world();

        if tick % 15 == 0 {
            let mixer = manager.mixer(key).context("mixer vanished")?;
            let hips_state = scene.local_transform(hips).context("hips removed")?;
            log::info!(
                "tick {tick:3}: idle {:.2} walk {:.2} wave {:.2} | hips at {:?}",
                mixer.applied_weight("idle").unwrap_or_default(),
                mixer.applied_weight("walk").unwrap_or_default(),
                mixer.applied_weight("wave").unwrap_or_default(),
                hips_state.position
            );
        }
    }

    let arm_world = scene
        .get_node(arm)
        .context("arm removed")?
        .transform
        .world_matrix()
        .translation;
    log::info!("Final arm world position: {arm_world:?}");
    Ok(())
}
