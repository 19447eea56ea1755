//! Muzzle flash, shell casings, tracers and dropped magazines
//!
//! Bodies are simple kinematic meshes: magazines fall under gravity until they hit the
//! ground, tracers fly straight until their lifetime runs out.

use std::collections::HashMap;

use bevy::prelude::*;
use shared::{BodyId, Emission, GRAVITY};

use crate::presentation::PresentationCommand;

/// Casings and flashes live this long (seconds)
const FLASH_LIFETIME: f32 = 0.05;
const SHELL_LIFETIME: f32 = 1.2;
/// Bodies stop once they reach this height
const GROUND_HEIGHT: f32 = 0.02;

/// Named particle system on the weapon
#[derive(Component)]
pub struct ParticleEmitter(pub String);

/// A spawned prefab the controllers can relaunch
#[derive(Component, Debug)]
pub struct Body {
    pub id: BodyId,
    pub velocity: Vec3,
    pub gravity: bool,
    /// Remaining seconds before despawn, `None` to keep forever
    pub lifetime: Option<f32>,
}

impl Body {
    /// Integrate one step; returns false once the body should be despawned
    pub fn step(&mut self, transform: &mut Transform, dt: f32) -> bool {
        if let Some(lifetime) = self.lifetime.as_mut() {
            *lifetime -= dt;
            if *lifetime <= 0.0 {
                return false;
            }
        }
        if self.gravity {
            self.velocity += GRAVITY * dt;
        }
        transform.translation += self.velocity * dt;
        if self.gravity && transform.translation.y <= GROUND_HEIGHT {
            transform.translation.y = GROUND_HEIGHT;
            self.velocity = Vec3::ZERO;
        }
        true
    }
}

#[derive(Component)]
pub struct Particle {
    /// Hidden until this reaches zero
    pub delay: f32,
    pub lifetime: f32,
    pub velocity: Vec3,
}

/// Body handle to entity
#[derive(Resource, Default)]
pub struct BodyRegistry(pub HashMap<BodyId, Entity>);

/// Last emission pushed into each particle system
#[derive(Resource, Default)]
pub struct EmissionSettings(pub HashMap<String, Emission>);

/// Pre-made meshes and materials for every prefab
#[derive(Resource)]
pub struct EffectAssets {
    pub magazine: (Handle<Mesh>, Handle<StandardMaterial>),
    pub tracer: (Handle<Mesh>, Handle<StandardMaterial>),
    pub flash: (Handle<Mesh>, Handle<StandardMaterial>),
    pub shell: (Handle<Mesh>, Handle<StandardMaterial>),
}

pub fn setup_effect_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let glow = |color: Color| StandardMaterial {
        base_color: color,
        emissive: color.to_linear() * 8.0,
        unlit: true,
        ..default()
    };

    commands.insert_resource(EffectAssets {
        magazine: (
            meshes.add(Cuboid::new(0.02, 0.08, 0.025)),
            materials.add(Color::srgb(0.1, 0.1, 0.1)),
        ),
        tracer: (
            meshes.add(Cuboid::new(0.01, 0.01, 0.6)),
            materials.add(glow(Color::srgb(1.0, 0.7, 0.3))),
        ),
        flash: (
            meshes.add(Sphere::new(0.04)),
            materials.add(glow(Color::srgb(1.0, 0.85, 0.5))),
        ),
        shell: (
            meshes.add(Cylinder::new(0.004, 0.02)),
            materials.add(StandardMaterial {
                base_color: Color::srgb(0.8, 0.6, 0.2),
                metallic: 0.9,
                ..default()
            }),
        ),
    });
}

pub fn apply_effect_commands(
    mut commands: Commands,
    mut messages: MessageReader<PresentationCommand>,
    assets: Res<EffectAssets>,
    mut registry: ResMut<BodyRegistry>,
    mut emissions: ResMut<EmissionSettings>,
    emitters: Query<(&ParticleEmitter, &GlobalTransform)>,
    mut bodies: Query<(&mut Body, &mut Transform)>,
) {
    // Bodies spawned this frame stay here until every command has been seen
    let mut spawned: Vec<(Body, String, Transform)> = Vec::new();

    for command in messages.read() {
        match command {
            PresentationCommand::SpawnBody {
                body,
                prefab,
                position,
                rotation,
                velocity,
            } => {
                let state = Body {
                    id: *body,
                    velocity: *velocity,
                    gravity: prefab != "Tracer",
                    lifetime: None,
                };
                let transform = Transform::from_translation(*position).with_rotation(*rotation);
                spawned.push((state, prefab.clone(), transform));
            }
            PresentationCommand::LaunchBody {
                body,
                position,
                rotation,
                velocity,
            } => {
                let relaunched = Transform::from_translation(*position).with_rotation(*rotation);
                if let Some((state, _, transform)) =
                    spawned.iter_mut().find(|(state, ..)| state.id == *body)
                {
                    state.velocity = *velocity;
                    *transform = relaunched;
                    continue;
                }
                let Some((mut state, mut transform)) =
                    registry.0.get(body).and_then(|entity| bodies.get_mut(*entity).ok())
                else {
                    warn!("Relaunch of unknown body {:?}", body);
                    continue;
                };
                state.velocity = *velocity;
                *transform = relaunched;
            }
            PresentationCommand::IgnoreCollision { body, collider } => {
                debug!("Body {:?} ignores collider {:?}", body, collider);
            }
            PresentationCommand::DespawnAfter { body, seconds } => {
                if let Some((state, ..)) =
                    spawned.iter_mut().find(|(state, ..)| state.id == *body)
                {
                    state.lifetime = Some(*seconds);
                } else if let Some((mut state, _)) =
                    registry.0.get(body).and_then(|entity| bodies.get_mut(*entity).ok())
                {
                    state.lifetime = Some(*seconds);
                }
            }
            PresentationCommand::ConfigureEmission { system, emission } => {
                emissions.0.insert(system.clone(), *emission);
            }
            PresentationCommand::PlayParticles(system) => {
                let Some((_, origin)) = emitters.iter().find(|(emitter, _)| &emitter.0 == system)
                else {
                    debug!("No emitter named {:?} on the weapon", system);
                    continue;
                };
                let origin = origin.compute_transform();
                let emission = emissions.0.get(system).copied();
                spawn_particle(&mut commands, &assets, system, origin, emission);
            }
            _ => {}
        }
    }

    for (state, prefab, transform) in spawned {
        let (mesh, material) = match prefab.as_str() {
            "Tracer" => assets.tracer.clone(),
            _ => assets.magazine.clone(),
        };
        let id = state.id;
        let entity = commands
            .spawn((state, Mesh3d(mesh), MeshMaterial3d(material), transform))
            .id();
        registry.0.insert(id, entity);
    }
}

fn spawn_particle(
    commands: &mut Commands,
    assets: &EffectAssets,
    system: &str,
    origin: Transform,
    emission: Option<Emission>,
) {
    let delay = emission.map_or(0.0, |emission| emission.start_delay);
    let (mesh, material, lifetime, velocity) = match emission {
        // Casings leave to the right and slightly up
        Some(emission) => (
            assets.shell.0.clone(),
            assets.shell.1.clone(),
            SHELL_LIFETIME,
            origin.rotation * Vec3::new(1.0, 0.6, 0.0).normalize() * emission.start_speed,
        ),
        None => (assets.flash.0.clone(), assets.flash.1.clone(), FLASH_LIFETIME, Vec3::ZERO),
    };
    let visibility = if delay > 0.0 {
        Visibility::Hidden
    } else {
        Visibility::Inherited
    };
    trace!("Particles {:?} at {:?}", system, origin.translation);
    commands.spawn((
        Particle {
            delay,
            lifetime,
            velocity,
        },
        Mesh3d(mesh),
        MeshMaterial3d(material),
        Transform::from_translation(origin.translation).with_rotation(origin.rotation),
        visibility,
    ));
}

pub fn update_bodies(
    mut commands: Commands,
    time: Res<Time>,
    mut registry: ResMut<BodyRegistry>,
    mut bodies: Query<(Entity, &mut Body, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (entity, mut body, mut transform) in bodies.iter_mut() {
        if !body.step(&mut transform, dt) {
            registry.0.remove(&body.id);
            commands.entity(entity).despawn();
        }
    }
}

pub fn update_particles(
    mut commands: Commands,
    time: Res<Time>,
    mut particles: Query<(Entity, &mut Particle, &mut Transform, &mut Visibility)>,
) {
    let dt = time.delta_secs();
    for (entity, mut particle, mut transform, mut visibility) in particles.iter_mut() {
        if particle.delay > 0.0 {
            particle.delay -= dt;
            if particle.delay <= 0.0 {
                *visibility = Visibility::Inherited;
            }
            continue;
        }
        particle.lifetime -= dt;
        if particle.lifetime <= 0.0 {
            commands.entity(entity).despawn();
            continue;
        }
        particle.velocity += GRAVITY * dt;
        transform.translation += particle.velocity * dt;
    }
}
