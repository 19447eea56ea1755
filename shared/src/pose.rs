//! Procedural weapon pose blending
//!
//! Each tick the blender picks a target local pose (hip, aim, run or slide) and a target
//! camera FOV, then moves the current values toward them with `t = speed * dt`.
//! `dt` is always passed in so the blend is deterministic without an engine loop.

use bevy::prelude::*;

use crate::config::{AimProfile, PosePreset, DEFAULT_BLEND_SPEED};
use crate::services::AudioHandle;

/// Squared distance under which the weapon counts as at the aim position
const AIM_POSITION_EPSILON_SQ: f32 = 1e-4;
/// Squared angle (degrees²) under which the weapon counts as at the aim rotation
const AIM_ROTATION_EPSILON_SQ: f32 = 1e-3;
/// FOV distance (degrees) under which the camera counts as zoomed in
const AIM_FOV_EPSILON: f32 = 0.1;
/// Aim targets this close to rest are treated as "no aim pose at all"
const DEGENERATE_EPSILON_SQ: f32 = 1e-3;
const DEGENERATE_FOV_EPSILON: f32 = 1e-3;

/// Local position + rotation of the weapon transform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Build from Euler angles in degrees (Z, then X, then Y)
    pub fn from_euler_degrees(position: Vec3, degrees: Vec3) -> Self {
        Self {
            position,
            rotation: euler_degrees(degrees),
        }
    }

    /// Move toward `target` by fraction `t` (clamped to 0..1)
    pub fn blend_toward(&self, target: &Pose, t: f32) -> Pose {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 {
            return *self;
        }
        Pose {
            position: self.position.lerp(target.position, t),
            rotation: self.rotation.slerp(target.rotation, t),
        }
    }
}

pub(crate) fn euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

fn lerp_f32(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

/// One-shot aim cue the caller should play on the character channel
#[derive(Clone, Debug, PartialEq)]
pub enum AimCue {
    In(Option<AudioHandle>),
    Out(Option<AudioHandle>),
}

impl AimCue {
    pub fn sound(&self) -> Option<&AudioHandle> {
        match self {
            AimCue::In(sound) | AimCue::Out(sound) => sound.as_ref(),
        }
    }
}

/// Continuous aim/run/slide blending of one weapon instance.
#[derive(Clone, Debug)]
pub struct PoseBlender {
    aim: Option<AimProfile>,
    run: Option<PosePreset>,
    slide: Option<PosePreset>,
    hip: Pose,
    default_fov: f32,
    current: Pose,
    fov: f32,
    has_played_aim_in: bool,
    has_played_aim_out: bool,
}

impl PoseBlender {
    pub fn new(
        aim: Option<AimProfile>,
        run: Option<PosePreset>,
        slide: Option<PosePreset>,
    ) -> Self {
        Self {
            aim,
            run,
            slide,
            hip: Pose::IDENTITY,
            default_fov: 60.0,
            current: Pose::IDENTITY,
            fov: 60.0,
            has_played_aim_in: false,
            has_played_aim_out: false,
        }
    }

    /// Capture the rest pose and camera FOV; blending starts from there
    pub fn bind(&mut self, hip: Pose, default_fov: f32) {
        self.hip = hip;
        self.current = hip;
        self.default_fov = default_fov;
        self.fov = default_fov;
        self.has_played_aim_in = false;
        self.has_played_aim_out = false;
    }

    pub fn current(&self) -> Pose {
        self.current
    }

    pub fn field_of_view(&self) -> f32 {
        self.fov
    }

    pub fn hip(&self) -> Pose {
        self.hip
    }

    /// Camera FOV used outside of aiming; follows the player's settings
    pub fn set_default_fov(&mut self, fov: f32) {
        self.default_fov = fov;
    }

    /// Swap in the sight of a newly attached scope or iron sight
    pub fn update_aiming(&mut self, position: Vec3, rotation_degrees: Vec3, zoom: bool, fov: f32) {
        if let Some(aim) = self.aim.as_mut() {
            aim.position = position;
            aim.rotation = rotation_degrees;
            aim.zoom = zoom;
            aim.fov = fov;
        }
    }

    fn aim_speed(&self) -> f32 {
        self.aim.as_ref().map_or(DEFAULT_BLEND_SPEED, |aim| aim.speed)
    }

    fn run_speed(&self) -> f32 {
        self.run.as_ref().map_or(DEFAULT_BLEND_SPEED, |run| run.speed)
    }

    /// Blend toward the aim pose while `is_aiming`, back to hip otherwise.
    ///
    /// Returns the aim-in cue on the first tick of an aim request and the aim-out cue on
    /// the first tick after it.
    pub fn aim(&mut self, is_aiming: bool, dt: f32) -> Option<AimCue> {
        let mut cue = None;
        let speed = self.aim_speed();

        match self.aim.clone() {
            Some(aim) if is_aiming => {
                if !self.is_aiming() && !self.has_played_aim_in {
                    self.has_played_aim_in = true;
                    self.has_played_aim_out = false;
                    cue = Some(AimCue::In(aim.aim_in_sound.clone()));
                }
                let target = Pose::from_euler_degrees(aim.position, aim.rotation);
                self.current = self.current.blend_toward(&target, dt * speed);
                if aim.zoom {
                    self.fov = lerp_f32(self.fov, aim.fov, dt * speed);
                }
            }
            _ => {
                if self.has_played_aim_in || self.is_aiming() {
                    cue = self.release_aim();
                }
                self.current = self.current.blend_toward(&self.hip, dt * speed);
                self.fov = lerp_f32(self.fov, self.default_fov, dt * speed);
            }
        }
        cue
    }

    /// Exit edge of an aim request: re-arms aim-in, returns aim-out once
    fn release_aim(&mut self) -> Option<AimCue> {
        self.has_played_aim_in = false;
        if self.has_played_aim_out {
            return None;
        }
        self.has_played_aim_out = true;
        self.aim.as_ref().map(|aim| AimCue::Out(aim.aim_out_sound.clone()))
    }

    /// Blend toward the run or slide posture, or back to hip.
    ///
    /// Returns the aim-out cue when this tick ends an aim request.
    pub fn sprint(&mut self, is_running: bool, is_sliding: bool, dt: f32) -> Option<AimCue> {
        let aim_speed = self.aim_speed();
        // Sampled before anything moves so a settled aim still counts
        let was_aiming = self.is_aiming();
        let preset = match (&self.run, &self.slide) {
            (Some(run), _) if is_running => Some(run.clone()),
            (_, Some(slide)) if is_sliding => Some(slide.clone()),
            _ => None,
        };

        self.fov = lerp_f32(self.fov, self.default_fov, dt * aim_speed);

        if let Some(preset) = preset {
            let target = Pose::from_euler_degrees(preset.position, preset.rotation);
            self.current = self.current.blend_toward(&target, dt * preset.speed);
            // Running out of an aim re-arms the aim-in cue without an aim-out
            self.has_played_aim_in = false;
            return None;
        }

        self.current = self.current.blend_toward(&self.hip, dt * self.run_speed());

        if was_aiming || self.has_played_aim_in {
            self.release_aim()
        } else {
            None
        }
    }

    /// True once the blend has visually settled on the aim pose.
    ///
    /// Position, rotation and (for zooming sights) FOV must all be within epsilon of the
    /// aim target. An aim target identical to the rest pose never reports aiming.
    pub fn is_aiming(&self) -> bool {
        let Some(aim) = &self.aim else {
            return false;
        };
        let aim_rotation = euler_degrees(aim.rotation);

        let pose_is_rest = aim.position.distance_squared(self.hip.position) < DEGENERATE_EPSILON_SQ
            && angle_degrees_sq(aim_rotation, self.hip.rotation) < DEGENERATE_EPSILON_SQ;
        let fov_is_rest = !aim.zoom || (aim.fov - self.default_fov).abs() < DEGENERATE_FOV_EPSILON;
        if pose_is_rest && fov_is_rest {
            return false;
        }

        let position =
            aim.position.distance_squared(self.current.position) < AIM_POSITION_EPSILON_SQ;
        let rotation =
            angle_degrees_sq(aim_rotation, self.current.rotation) < AIM_ROTATION_EPSILON_SQ;
        let zoom = !aim.zoom || (aim.fov - self.fov).abs() < AIM_FOV_EPSILON;
        position && rotation && zoom
    }
}

fn angle_degrees_sq(a: Quat, b: Quat) -> f32 {
    angle_degrees(a, b).powi(2)
}

/// Shortest angle between two rotations, precise for nearly equal ones
pub(crate) fn angle_degrees(a: Quat, b: Quat) -> f32 {
    let delta = a.inverse() * b;
    (2.0 * delta.xyz().length().min(1.0).asin()).to_degrees()
}
