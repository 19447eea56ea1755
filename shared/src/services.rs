//! Engine services the presentation core calls into
//!
//! Animation playback, audio, camera/view transforms and particle/physics effects are
//! owned by the engine. Controllers only hold boxed handles to these traits, so the same
//! logic runs against Bevy entities in the client and against recorders in tests.

use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Named audio asset reference
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioHandle(pub String);

impl AudioHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

/// Clip playback on the weapon/arms rig.
pub trait AnimationClips: Send + Sync {
    /// Hard cut to `clip` from the start
    fn play(&mut self, clip: &str);

    /// Blend from whatever is playing into `clip`; retargets an in-flight blend
    fn cross_fade(&mut self, clip: &str, blend_seconds: f32);

    /// Set a named float parameter (playback speed multiplier, locomotion velocity)
    fn set_parameter(&mut self, name: &str, value: f32);

    /// Global playback speed of the rig
    fn set_playback_speed(&mut self, speed: f32);

    /// Length of `clip` in seconds at speed 1, `None` for unknown clips
    fn clip_duration(&self, clip: &str) -> Option<f32>;
}

/// A pooled audio channel.
pub trait AudioEmitter: Send + Sync {
    /// Start `clip` unless the channel is already busy, fading in over `fade_in` seconds
    fn play(&mut self, clip: &AudioHandle, fade_in: f32);

    /// Interrupt whatever is playing and start `clip`
    fn force_play(&mut self, clip: &AudioHandle, volume: f32);

    fn stop(&mut self);
}

/// Where a registered audio source is parented
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceAnchor {
    /// Root of the character
    Character,
    /// Parent of the weapon transform
    Weapon,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCategory {
    Sfx,
    Voice,
    Ambient,
}

/// Parameters for registering a persistent audio channel
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSettings {
    pub name: &'static str,
    pub anchor: SourceAnchor,
    pub category: Option<AudioCategory>,
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    /// 0 = 2D, 1 = fully spatialized
    pub spatial_blend: f32,
}

impl SourceSettings {
    /// Non-spatial channel without a category or falloff
    pub fn flat(name: &'static str, anchor: SourceAnchor) -> Self {
        Self {
            name,
            anchor,
            category: None,
            min_distance: None,
            max_distance: None,
            spatial_blend: 0.0,
        }
    }
}

/// Parameters for a transient sound at a world position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointSettings {
    pub min_distance: f32,
    pub max_distance: f32,
    pub volume: f32,
    pub spatial_blend: f32,
}

/// Audio subsystem: channel registration and fire-and-forget positional sounds.
pub trait AudioBackend: Send + Sync {
    fn register_source(&mut self, settings: &SourceSettings) -> Box<dyn AudioEmitter>;

    fn play_clip_at_point(&mut self, clip: &AudioHandle, position: Vec3, settings: PointSettings);
}

/// The weapon transform and the camera it hangs from.
pub trait ViewRig: Send + Sync {
    fn set_local_pose(&mut self, pose: Pose);

    fn set_field_of_view(&mut self, fov_degrees: f32);

    fn camera_position(&self) -> Vec3;
}

/// Engine handle of a spawned physics body
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyId(pub u64);

/// Engine handle of a collider (the firing character's capsule)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColliderId(pub u64);

/// Transforms on the weapon that effects are emitted from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectAnchor {
    TracerOrigin,
    MagazineDrop,
}

/// Start parameters pushed into a particle system before it plays
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Emission {
    /// Applied to the root system only
    pub start_speed: f32,
    /// Applied to the root system and every child system
    pub start_delay: f32,
}

/// Particle and physics-body effects.
pub trait EffectBackend: Send + Sync {
    /// World pose of an anchor, `None` when the weapon has no such transform
    fn anchor(&self, anchor: EffectAnchor) -> Option<(Vec3, Quat)>;

    fn play_particles(&mut self, system: &str);

    fn configure_emission(&mut self, system: &str, emission: Emission);

    /// Instantiate `prefab`; `None` when the prefab is unknown
    fn spawn_body(
        &mut self,
        prefab: &str,
        position: Vec3,
        rotation: Quat,
        velocity: Vec3,
    ) -> Option<BodyId>;

    /// Move an existing body and reset its velocity
    fn launch_body(&mut self, body: BodyId, position: Vec3, rotation: Quat, velocity: Vec3);

    fn ignore_collision(&mut self, body: BodyId, collider: ColliderId);

    fn despawn_after(&mut self, body: BodyId, seconds: f32);
}
