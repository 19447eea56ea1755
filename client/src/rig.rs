//! Camera, weapon mounts and the clip/pose/FOV side of the presentation commands

use std::collections::HashMap;

use bevy::audio::SpatialListener;
use bevy::prelude::*;
use shared::{EffectAnchor, Pose};

use crate::effects::ParticleEmitter;
use crate::presentation::{PresentationCommand, PresentationQueue};
use crate::profiles::Armory;
use crate::viewmodel::{Slot, SwayPivot, ViewModel};

pub const DEFAULT_FOV_DEGREES: f32 = 70.0;
pub const EYE_HEIGHT: f32 = 1.7;

/// Rest position of the rifle relative to the sway pivot
pub const RIFLE_HIP: Vec3 = Vec3::new(0.25, -0.2, -0.5);
const FISTS_REST: Vec3 = Vec3::new(0.0, -0.25, -0.4);

/// Transform the rifle controller poses (aim/run/slide blend)
#[derive(Component)]
pub struct WeaponMount;

#[derive(Component)]
pub struct FistsMount;

/// Transform an [`EffectAnchor`] resolves to
#[derive(Component)]
pub struct AnchorPoint(pub EffectAnchor);

/// What the rig is currently playing
#[derive(Resource, Debug)]
pub struct ClipPlayback {
    pub clip: Option<String>,
    pub elapsed: f32,
    /// Crossfade window of the last transition, `None` for a hard cut
    pub blend: Option<f32>,
    pub playback_speed: f32,
    pub parameters: HashMap<String, f32>,
}

impl Default for ClipPlayback {
    fn default() -> Self {
        Self {
            clip: None,
            elapsed: 0.0,
            blend: None,
            playback_speed: 1.0,
            parameters: HashMap::new(),
        }
    }
}

impl ClipPlayback {
    /// Combined rate of the rig speed and the named speed parameter
    pub fn rate(&self, speed_parameter: &str) -> f32 {
        self.playback_speed * self.parameters.get(speed_parameter).copied().unwrap_or(1.0)
    }

    pub fn apply(&mut self, command: &PresentationCommand) {
        match command {
            PresentationCommand::PlayClip { clip, blend } => {
                self.clip = Some(clip.clone());
                self.blend = *blend;
                self.elapsed = 0.0;
            }
            PresentationCommand::SetParameter { name, value } => {
                self.parameters.insert(name.clone(), *value);
            }
            PresentationCommand::SetPlaybackSpeed(speed) => self.playback_speed = *speed,
            _ => {}
        }
    }
}

/// Camera with the sway pivot, rifle and fists hanging from it
pub fn spawn_view_rig(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(40.0, 40.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.55, 0.5, 0.42))),
    ));

    let metal = materials.add(StandardMaterial {
        base_color: Color::srgb(0.15, 0.15, 0.17),
        metallic: 0.8,
        perceptual_roughness: 0.35,
        ..default()
    });
    let grip = materials.add(StandardMaterial {
        base_color: Color::srgb(0.08, 0.06, 0.04),
        perceptual_roughness: 0.8,
        ..default()
    });
    let skin = materials.add(Color::srgb(0.85, 0.65, 0.5));

    let camera = commands
        .spawn((
            Camera3d::default(),
            Projection::from(PerspectiveProjection {
                fov: DEFAULT_FOV_DEGREES.to_radians(),
                ..default()
            }),
            Transform::from_xyz(0.0, EYE_HEIGHT, 0.0),
            SpatialListener::new(0.1),
        ))
        .id();

    let pivot = commands
        .spawn((SwayPivot, Transform::default(), Visibility::Inherited, ChildOf(camera)))
        .id();

    commands
        .spawn((
            WeaponMount,
            Transform::from_translation(RIFLE_HIP),
            Visibility::Hidden,
            ChildOf(pivot),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(meshes.add(Cuboid::new(0.04, 0.06, 0.35))),
                MeshMaterial3d(metal.clone()),
                Transform::default(),
            ));
            parent.spawn((
                Mesh3d(meshes.add(Cylinder::new(0.01, 0.2))),
                MeshMaterial3d(metal.clone()),
                Transform::from_xyz(0.0, 0.015, -0.27)
                    .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2)),
            ));
            parent.spawn((
                Mesh3d(meshes.add(Cuboid::new(0.02, 0.08, 0.025))),
                MeshMaterial3d(grip.clone()),
                Transform::from_xyz(0.0, -0.07, -0.05),
            ));
            parent.spawn((
                AnchorPoint(EffectAnchor::TracerOrigin),
                Transform::from_xyz(0.0, 0.015, -0.38),
            ));
            parent.spawn((
                AnchorPoint(EffectAnchor::MagazineDrop),
                Transform::from_xyz(0.0, -0.1, -0.05),
            ));
            parent.spawn((
                ParticleEmitter("Muzzle Flash".to_string()),
                Transform::from_xyz(0.0, 0.015, -0.38),
            ));
            parent.spawn((
                ParticleEmitter("Shell Ejection".to_string()),
                Transform::from_xyz(0.03, 0.02, -0.02),
            ));
        });

    commands
        .spawn((
            FistsMount,
            Transform::from_translation(FISTS_REST),
            Visibility::Hidden,
            ChildOf(pivot),
        ))
        .with_children(|parent| {
            for x in [-0.18, 0.18] {
                parent.spawn((
                    Mesh3d(meshes.add(Sphere::new(0.05))),
                    MeshMaterial3d(skin.clone()),
                    Transform::from_xyz(x, 0.0, 0.0),
                ));
            }
        });

    info!("View rig spawned");
}

/// Build the controllers once profiles and the rig exist, then bring the rifle up
pub fn setup_view_model(
    mut commands: Commands,
    armory: Res<Armory>,
    queue: Res<PresentationQueue>,
) {
    let mut view_model = ViewModel::new(
        &armory,
        &queue,
        Pose::new(RIFLE_HIP, Quat::IDENTITY),
        DEFAULT_FOV_DEGREES,
    );
    view_model.draw();
    commands.insert_resource(view_model);
}

/// Publish the camera and anchor transforms the controllers read back
pub fn sync_rig_snapshot(
    queue: Res<PresentationQueue>,
    camera: Query<&GlobalTransform, With<Camera3d>>,
    anchors: Query<(&AnchorPoint, &GlobalTransform)>,
) {
    if let Ok(camera) = camera.single() {
        queue.set_camera_position(camera.translation());
    }
    for (anchor, transform) in &anchors {
        let transform = transform.compute_transform();
        queue.set_anchor(anchor.0, transform.translation, transform.rotation);
    }
}

pub fn apply_rig_commands(
    mut messages: MessageReader<PresentationCommand>,
    mut playback: ResMut<ClipPlayback>,
    mut mount: Query<&mut Transform, With<WeaponMount>>,
    mut projection: Query<&mut Projection, With<Camera3d>>,
) {
    for command in messages.read() {
        match command {
            PresentationCommand::SetWeaponPose(pose) => {
                if let Ok(mut transform) = mount.single_mut() {
                    transform.translation = pose.position;
                    transform.rotation = pose.rotation;
                }
            }
            PresentationCommand::SetFieldOfView(degrees) => {
                let Ok(mut projection) = projection.single_mut() else {
                    continue;
                };
                if let Projection::Perspective(ref mut perspective) = *projection {
                    perspective.fov = degrees.to_radians();
                }
            }
            other => playback.apply(other),
        }
    }
}

pub fn advance_clip(time: Res<Time>, armory: Res<Armory>, mut playback: ResMut<ClipPlayback>) {
    let Some(clip) = playback.clip.clone() else {
        return;
    };
    let rate = playback.rate(&armory.rifle.gun.speed_parameter);
    playback.elapsed += time.delta_secs() * rate;
    let length = armory.clip_lengths.get(&clip).copied().unwrap_or(0.0);
    if playback.elapsed >= length {
        playback.clip = None;
    }
}

/// Only the active weapon is visible, and nothing while holstered
pub fn update_mount_visibility(
    view_model: Res<ViewModel>,
    mut rifle: Query<&mut Visibility, (With<WeaponMount>, Without<FistsMount>)>,
    mut fists: Query<&mut Visibility, (With<FistsMount>, Without<WeaponMount>)>,
) {
    let shown = |slot: Slot| {
        if view_model.active() == slot && !view_model.is_holstered() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        }
    };
    if let Ok(mut visibility) = rifle.single_mut() {
        *visibility = shown(Slot::Rifle);
    }
    if let Ok(mut visibility) = fists.single_mut() {
        *visibility = shown(Slot::Fists);
    }
}
