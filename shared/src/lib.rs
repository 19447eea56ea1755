//! Shared weapon presentation core
//!
//! Orchestrates which clip, sound and effect fires when for first-person weapons.
//! Everything engine-facing goes through the traits in [`services`]; the client binds
//! those to Bevy entities.

pub mod arms;
pub mod config;
pub mod effects;
pub mod gun;
pub mod pose;
pub mod selection;
pub mod services;
pub mod swing;

#[cfg(test)]
pub(crate) mod testing;

pub use arms::{ArmsAnimator, Locomotion};
pub use config::{
    ActionConfig, AimProfile, ArmsAnimationConfig, ArmsProfile, ConfigError, EffectsConfig,
    GunAnimationConfig, PosePreset, SelectionPolicy, SwingConfig, WeaponProfile,
};
pub use effects::{GunEffects, MagazinePool, PoolSlot};
pub use gun::{GunAnimator, GunBindings};
pub use pose::{AimCue, Pose, PoseBlender};
pub use services::{
    AnimationClips, AudioBackend, AudioCategory, AudioEmitter, AudioHandle, BodyId, ColliderId,
    EffectAnchor, EffectBackend, Emission, PointSettings, SourceAnchor, SourceSettings, ViewRig,
};
pub use swing::{SwingInput, WeaponSwing};

/// Blend window used by every crossfaded trigger (seconds)
pub const CROSSFADE_SECONDS: f32 = 0.1;

/// Fade-in applied to the one-shot aim in/out cues (seconds)
pub const AIM_CUE_FADE_SECONDS: f32 = 0.1;

/// Audible falloff for hit sounds played at a world position
pub const HIT_MIN_DISTANCE: f32 = 3.0;
pub const HIT_MAX_DISTANCE: f32 = 10.0;

/// Audible falloff for the weapon channel and additive shots
pub const WEAPON_MIN_DISTANCE: f32 = 10.0;
pub const WEAPON_MAX_DISTANCE: f32 = 25.0;

/// Gravity applied to dropped magazines (m/s²)
pub const GRAVITY: bevy::math::Vec3 = bevy::math::Vec3::new(0.0, -9.81, 0.0);

/// Shared capability of every first-person weapon controller.
///
/// Each trigger is a silent no-op when the controller is not initialized, the action is
/// disabled, or its clip is empty.
pub trait WeaponAnimator {
    fn is_initialized(&self) -> bool;

    fn draw(&mut self);

    fn hide(&mut self);

    /// Primary attack: a regular (non-last-round) shot or a right-hand swing
    fn attack(&mut self);

    fn hit(&mut self, position: bevy::math::Vec3);

    fn interact(&mut self);

    fn vault(&mut self);

    fn draw_duration(&self) -> f32;

    fn hide_duration(&self) -> f32;

    fn interact_duration(&self) -> f32;

    /// Time before the interaction signal should reach the target object
    fn interact_delay(&self) -> f32;
}
