//! Mouse and strafe driven weapon sway
//!
//! Runs on its own pivot between the camera and the weapon, so it stacks on top of the
//! aim/run/slide blend instead of fighting it.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{SwingConfig, SwingTarget};
use crate::pose::{euler_degrees, Pose};

/// Per-tick character state the sway reacts to
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SwingInput {
    /// Raw mouse motion this tick
    pub mouse_delta: Vec2,
    pub mouse_sensitivity: f32,
    /// Horizontal movement input, -1 (left) to 1 (right)
    pub strafe: f32,
    pub velocity: Vec3,
    pub sliding: bool,
    pub aiming: bool,
    /// Character is shaken (low health, explosion nearby)
    pub tremor: bool,
}

pub struct WeaponSwing {
    config: Option<SwingConfig>,
    scale_factor: f32,
    current: Pose,
    rng: StdRng,
}

impl WeaponSwing {
    pub fn new(config: Option<SwingConfig>) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: Option<SwingConfig>, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut config: Option<SwingConfig>, rng: StdRng) -> Self {
        if let Some(config) = config.as_mut() {
            config.sanitize();
        }
        Self {
            config,
            scale_factor: 1.0,
            current: Pose::IDENTITY,
            rng,
        }
    }

    /// Start from the pivot's current pose; `scale_factor` scales the positional sway
    pub fn init(&mut self, pivot: Pose, scale_factor: f32) {
        self.current = pivot;
        self.scale_factor = scale_factor;
    }

    pub fn current(&self) -> Pose {
        self.current
    }

    /// Advance the sway by `dt` and return the new pivot pose
    pub fn swing(&mut self, input: &SwingInput, dt: f32) -> Pose {
        if dt <= 0.0 {
            return self.current;
        }

        let target = match &self.config {
            Some(config) => target_pose(config, input, &mut self.rng),
            None => Pose::IDENTITY,
        };
        let speed = self.config.as_ref().map_or(0.5, |config| config.speed);
        let t = (dt * speed * 10.0).clamp(0.0, 1.0);

        self.current = Pose {
            position: self.current.position.lerp(target.position * self.scale_factor, t),
            rotation: self.current.rotation.slerp(target.rotation, t),
        };
        self.current
    }
}

fn target_pose(config: &SwingConfig, input: &SwingInput, rng: &mut impl Rng) -> Pose {
    let sensitivity = input.mouse_sensitivity;
    let swing = config.swing_angle;

    let mut y = (input.mouse_delta.x * -swing.x * sensitivity).clamp(-swing.y, swing.y);
    let mut x = (input.mouse_delta.y * -swing.x * sensitivity).clamp(-swing.y, swing.y);

    let z = if input.velocity.length_squared() > 1.0 && !input.sliding {
        (input.strafe * -config.tilt_angle.x).clamp(-config.tilt_angle.y, config.tilt_angle.y)
    } else {
        0.0
    };
    let boost = if config.animate_all_axes {
        (input.mouse_delta.x * sensitivity * -config.tilt_boost.x)
            .clamp(-config.tilt_boost.y, config.tilt_boost.y)
    } else {
        0.0
    };

    if input.tremor {
        y += rng.gen_range(-1.0f32..=1.0) * config.tremor_amount;
        x += rng.gen_range(-1.0f32..=1.0) * config.tremor_amount;
    }

    let roll = z + boost;
    match config.target {
        SwingTarget::Fist => {
            let mut position = Vec3::new(-y / 100.0 + roll / 500.0, x / 100.0, 0.0);
            if input.aiming {
                position /= 2.0;
            }
            Pose::new(position, euler_degrees(Vec3::new(x, y, roll)))
        }
        SwingTarget::Weapon => Pose::new(
            Vec3::new(roll / 500.0, 0.0, 0.0),
            euler_degrees(Vec3::new(-x, y, roll)),
        ),
    }
}
