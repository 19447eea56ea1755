//! Weapon viewer - first-person presentation of a rifle and bare fists
//!
//! Drives the shared presentation controllers from keyboard and mouse and renders what
//! they ask for: clips, sounds, weapon pose, camera FOV, muzzle flash, tracers and
//! dropped magazines.

mod audio;
mod effects;
mod hud;
mod input;
mod presentation;
mod profiles;
mod rig;
mod viewmodel;

use std::path::PathBuf;

use bevy::asset::AssetPlugin;
use bevy::audio::{AudioPlugin, SpatialScale};
use bevy::prelude::*;
use bevy::window::WindowResolution;
use shared::ConfigError;

use presentation::{PresentationCommand, PresentationQueue};
use profiles::Armory;

/// Get the asset path - for bundled macOS apps, use path relative to executable
fn get_asset_path() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let bundled_assets = exe_dir.join("assets");
            if bundled_assets.exists() {
                return bundled_assets;
            }
        }
    }
    // Fall back to the crate's assets folder (for development)
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}

fn main() -> Result<(), ConfigError> {
    let asset_path = get_asset_path();
    let armory = Armory::load(&asset_path)?;

    let prefabs = [
        armory.rifle.effects.tracer.as_ref().map(|tracer| tracer.prefab.clone()),
        armory.rifle.effects.magazine.as_ref().map(|magazine| magazine.prefab.clone()),
    ];
    let queue = PresentationQueue::new(armory.clip_lengths.clone(), prefabs.into_iter().flatten());

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Weapon Viewer".to_string(),
                    resolution: WindowResolution::new(1280, 720),
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: asset_path.to_string_lossy().to_string(),
                ..default()
            })
            // World units are meters; scale down so rodio's falloff stays audible
            .set(AudioPlugin {
                default_spatial_scale: SpatialScale::new(0.2),
                ..default()
            }),
    );
    app.add_plugins(audio::PresentationAudioPlugin);

    app.add_message::<PresentationCommand>();
    app.insert_resource(armory);
    app.insert_resource(queue);
    app.init_resource::<input::InputState>();
    app.init_resource::<rig::ClipPlayback>();
    app.init_resource::<effects::BodyRegistry>();
    app.init_resource::<effects::EmissionSettings>();

    app.add_systems(
        Startup,
        (
            (rig::spawn_view_rig, rig::setup_view_model).chain(),
            effects::setup_effect_assets,
            hud::spawn_weapon_hud,
        ),
    );

    // Input -> controllers -> queued commands -> engine, in that order every frame
    app.add_systems(
        Update,
        (
            input::handle_keyboard_input,
            input::handle_mouse_input,
            input::update_camera_look,
            rig::sync_rig_snapshot,
            viewmodel::drive_view_model,
            presentation::flush_presentation_queue,
            (rig::apply_rig_commands, effects::apply_effect_commands),
        )
            .chain(),
    );

    app.add_systems(
        Update,
        (
            rig::advance_clip,
            rig::update_mount_visibility,
            effects::update_bodies,
            effects::update_particles,
            hud::update_weapon_hud,
        )
            .after(presentation::flush_presentation_queue),
    );

    info!("Starting weapon viewer with assets at {:?}", asset_path);
    app.run();
    Ok(())
}
