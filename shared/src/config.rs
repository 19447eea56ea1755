//! Weapon presentation configuration
//!
//! Every optional action is an `Option<...>`: `None` means the weapon has no such
//! animation and the matching trigger is a no-op. Profiles are authored in RON.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::AudioHandle;

/// Smallest playback speed a clip may run at (durations divide by it)
pub const MIN_PLAYBACK_SPEED: f32 = 0.01;

/// Upper bound of the dropped-magazine pool
pub const MAX_MAGAZINE_PREFABS: usize = 10;

/// Default interpolation speed of aim/run/slide blends
pub const DEFAULT_BLEND_SPEED: f32 = 10.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read profile {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse profile: {source}")]
    Parse {
        #[from]
        source: ron::error::SpannedError,
    },
}

/// Order in which clips of a multi-clip action are picked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Round-robin through the list
    #[default]
    Sequential,
    /// Uniform pick on every trigger
    Random,
}

/// One gameplay action: the clip to play, how fast, and the sound that goes with it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub clip: String,
    pub speed: f32,
    pub sound: Option<AudioHandle>,
    pub volume: f32,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            clip: String::new(),
            speed: 1.0,
            sound: None,
            volume: 0.25,
        }
    }
}

impl ActionConfig {
    pub fn new(clip: impl Into<String>, volume: f32) -> Self {
        Self {
            clip: clip.into(),
            volume,
            ..Default::default()
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(AudioHandle::new(sound));
        self
    }

    pub fn has_clip(&self) -> bool {
        !self.clip.is_empty()
    }

    fn sanitize(&mut self, label: &str) {
        clamp_speed(label, &mut self.speed);
        clamp_volume(label, &mut self.volume);
    }
}

/// Firing animations and sounds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireConfig {
    pub clips: Vec<String>,
    /// Played instead of `clips` once the aim blend has settled
    pub aimed_clips: Vec<String>,
    pub policy: SelectionPolicy,
    pub speed: f32,
    pub aimed_speed: f32,
    /// Slide-lock clip replacing the shot that empties the magazine
    pub last_round_clip: Option<String>,
    pub sounds: Vec<AudioHandle>,
    pub volume: f32,
    /// Spawn a new positional source per shot instead of cutting the weapon channel
    pub additive_sound: bool,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            clips: Vec::new(),
            aimed_clips: Vec::new(),
            policy: SelectionPolicy::Sequential,
            speed: 1.0,
            aimed_speed: 1.0,
            last_round_clip: None,
            sounds: Vec::new(),
            volume: 0.5,
            additive_sound: true,
        }
    }
}

/// Magazine and bullet-by-bullet reload phases
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Faster reload while a round is still chambered
    pub tactical: ActionConfig,
    /// Reload from an empty chamber
    pub full: ActionConfig,
    /// Brings the weapon into position to receive rounds
    pub start: ActionConfig,
    /// Chambers a round directly when starting from empty
    pub insert_in_chamber: ActionConfig,
    pub insert: ActionConfig,
    pub stop: ActionConfig,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            tactical: ActionConfig::new("Reload", 0.25),
            full: ActionConfig::new("FullReload", 0.25),
            start: ActionConfig::new("Start Reload", 0.25),
            insert_in_chamber: ActionConfig::new("Insert Chamber", 0.25),
            insert: ActionConfig::new("Insert Reload", 0.25),
            stop: ActionConfig::new("Stop Reload", 0.25),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeConfig {
    pub action: ActionConfig,
    /// Time until the hit signal reaches the target
    pub hit_delay: f32,
}

impl Default for MeleeConfig {
    fn default() -> Self {
        Self {
            action: ActionConfig::new("Melee", 0.2),
            hit_delay: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractConfig {
    pub action: ActionConfig,
    /// Time until the activation signal reaches the object
    pub signal_delay: f32,
}

impl Default for InteractConfig {
    fn default() -> Self {
        Self {
            action: ActionConfig::new("Interact", 0.2),
            signal_delay: 0.25,
        }
    }
}

/// Impact sounds played where an attack lands
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitSounds {
    pub sounds: Vec<AudioHandle>,
    pub volume: f32,
}

impl Default for HitSounds {
    fn default() -> Self {
        Self {
            sounds: Vec::new(),
            volume: 0.3,
        }
    }
}

/// Aim-down-sights pose and camera zoom. Attachments replace it at runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimProfile {
    pub position: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
    pub zoom: bool,
    pub fov: f32,
    pub speed: f32,
    pub aim_in_sound: Option<AudioHandle>,
    pub aim_out_sound: Option<AudioHandle>,
    pub hold_breath: bool,
}

impl Default for AimProfile {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            zoom: false,
            fov: 50.0,
            speed: DEFAULT_BLEND_SPEED,
            aim_in_sound: None,
            aim_out_sound: None,
            hold_breath: false,
        }
    }
}

/// Static run or slide posture
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosePreset {
    pub position: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
    pub speed: f32,
}

impl Default for PosePreset {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            speed: DEFAULT_BLEND_SPEED,
        }
    }
}

/// Immutable presentation config of a firearm
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GunAnimationConfig {
    /// Animator parameter that scales clip playback
    pub speed_parameter: String,
    pub draw: Option<ActionConfig>,
    pub hide: Option<ActionConfig>,
    pub fire: Option<FireConfig>,
    /// Dry-fire click, played at the fire volume
    pub out_of_ammo: Option<AudioHandle>,
    pub reload: Option<ReloadConfig>,
    pub melee: Option<MeleeConfig>,
    pub hit: HitSounds,
    pub switch_mode: Option<ActionConfig>,
    pub interact: Option<InteractConfig>,
    pub vault: Option<ActionConfig>,
    pub aim: Option<AimProfile>,
    pub run: Option<PosePreset>,
    pub slide: Option<PosePreset>,
}

impl Default for GunAnimationConfig {
    fn default() -> Self {
        Self {
            speed_parameter: "Speed".to_string(),
            draw: None,
            hide: None,
            fire: None,
            out_of_ammo: None,
            reload: None,
            melee: None,
            hit: HitSounds::default(),
            switch_mode: None,
            interact: None,
            vault: None,
            aim: None,
            run: None,
            slide: None,
        }
    }
}

impl GunAnimationConfig {
    /// Every action enabled with the stock clip names
    pub fn standard() -> Self {
        Self {
            draw: Some(ActionConfig::new("Draw", 0.25)),
            hide: Some(ActionConfig::new("Hide", 0.25)),
            fire: Some(FireConfig {
                last_round_clip: Some("Last Fire".to_string()),
                ..Default::default()
            }),
            reload: Some(ReloadConfig::default()),
            melee: Some(MeleeConfig::default()),
            switch_mode: Some(ActionConfig::new("SwitchMode", 0.2)),
            interact: Some(InteractConfig::default()),
            vault: Some(ActionConfig::new("Vault", 0.2)),
            aim: Some(AimProfile::default()),
            run: Some(PosePreset::default()),
            slide: Some(PosePreset::default()),
            ..Default::default()
        }
    }

    /// Clamp speeds, volumes and blend rates into their valid ranges
    pub fn sanitize(&mut self) {
        for (label, action) in [
            ("draw", self.draw.as_mut()),
            ("hide", self.hide.as_mut()),
            ("switch_mode", self.switch_mode.as_mut()),
            ("vault", self.vault.as_mut()),
        ] {
            if let Some(action) = action {
                action.sanitize(label);
            }
        }
        if let Some(fire) = self.fire.as_mut() {
            clamp_speed("fire", &mut fire.speed);
            clamp_speed("aimed fire", &mut fire.aimed_speed);
            clamp_volume("fire", &mut fire.volume);
        }
        if let Some(reload) = self.reload.as_mut() {
            reload.tactical.sanitize("reload");
            reload.full.sanitize("full reload");
            reload.start.sanitize("start reload");
            reload.insert_in_chamber.sanitize("insert in chamber");
            reload.insert.sanitize("insert");
            reload.stop.sanitize("stop reload");
        }
        if let Some(melee) = self.melee.as_mut() {
            melee.action.sanitize("melee");
            melee.hit_delay = melee.hit_delay.max(0.0);
        }
        if let Some(interact) = self.interact.as_mut() {
            interact.action.sanitize("interact");
            interact.signal_delay = interact.signal_delay.max(0.0);
        }
        clamp_volume("hit", &mut self.hit.volume);
        if let Some(aim) = self.aim.as_mut() {
            clamp_speed("aim", &mut aim.speed);
        }
        if let Some(run) = self.run.as_mut() {
            clamp_speed("run", &mut run.speed);
        }
        if let Some(slide) = self.slide.as_mut() {
            clamp_speed("slide", &mut slide.speed);
        }
    }
}

/// Left/right hand attack clips of the unarmed arms
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    pub right: Vec<String>,
    pub left: Vec<String>,
    pub policy: SelectionPolicy,
    pub sounds: Vec<AudioHandle>,
    pub volume: f32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            right: Vec::new(),
            left: Vec::new(),
            policy: SelectionPolicy::Sequential,
            sounds: Vec::new(),
            volume: 0.5,
        }
    }
}

/// Immutable presentation config of the arms (melee) archetype
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmsAnimationConfig {
    /// Animator parameter blending walk and run
    pub velocity_parameter: String,
    pub draw: Option<ActionConfig>,
    pub hide: Option<ActionConfig>,
    pub attack: Option<AttackConfig>,
    pub hit: HitSounds,
    pub interact: Option<InteractConfig>,
    pub vault: Option<ActionConfig>,
}

impl Default for ArmsAnimationConfig {
    fn default() -> Self {
        Self {
            velocity_parameter: "Velocity".to_string(),
            draw: None,
            hide: None,
            attack: None,
            hit: HitSounds::default(),
            interact: None,
            vault: None,
        }
    }
}

impl ArmsAnimationConfig {
    pub fn sanitize(&mut self) {
        for (label, action) in [
            ("draw", self.draw.as_mut()),
            ("hide", self.hide.as_mut()),
            ("vault", self.vault.as_mut()),
        ] {
            if let Some(action) = action {
                action.sanitize(label);
            }
        }
        if let Some(attack) = self.attack.as_mut() {
            clamp_volume("attack", &mut attack.volume);
        }
        if let Some(interact) = self.interact.as_mut() {
            interact.action.sanitize("interact");
            interact.signal_delay = interact.signal_delay.max(0.0);
        }
        clamp_volume("hit", &mut self.hit.volume);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellEjection {
    pub particle: String,
    /// Start speed is drawn uniformly from `x..=y`
    pub speed_range: Vec2,
    pub start_delay: f32,
}

impl Default for ShellEjection {
    fn default() -> Self {
        Self {
            particle: String::new(),
            speed_range: Vec2::new(1.0, 3.0),
            start_delay: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub prefab: String,
    pub speed: f32,
    pub duration: f32,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            prefab: String::new(),
            speed: 450.0,
            duration: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagazineDrop {
    pub prefab: String,
    /// Drop a magazine on a tactical reload (round still chambered)
    pub tactical_drop: bool,
    pub full_drop: bool,
    pub tactical_delay: f32,
    pub full_delay: f32,
    pub max_prefabs: usize,
}

impl Default for MagazineDrop {
    fn default() -> Self {
        Self {
            prefab: String::new(),
            tactical_drop: true,
            full_drop: true,
            tactical_delay: 0.0,
            full_delay: 0.0,
            max_prefabs: 5,
        }
    }
}

/// Muzzle flash, shell ejection, tracer and magazine drop
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub muzzle_flash: Option<String>,
    pub shell: Option<ShellEjection>,
    pub tracer: Option<TracerConfig>,
    pub magazine: Option<MagazineDrop>,
}

impl EffectsConfig {
    pub fn sanitize(&mut self) {
        if let Some(shell) = self.shell.as_mut() {
            let defaults = ShellEjection::default();
            finite_or("shell min speed", &mut shell.speed_range.x, defaults.speed_range.x);
            finite_or("shell max speed", &mut shell.speed_range.y, defaults.speed_range.y);
            if shell.speed_range.x > shell.speed_range.y {
                warn!("shell speed range {:?} is inverted, swapping", shell.speed_range);
                shell.speed_range = Vec2::new(shell.speed_range.y, shell.speed_range.x);
            }
            finite_or("shell start delay", &mut shell.start_delay, 0.0);
            shell.start_delay = shell.start_delay.max(0.0);
        }
        if let Some(tracer) = self.tracer.as_mut() {
            let defaults = TracerConfig::default();
            finite_or("tracer speed", &mut tracer.speed, defaults.speed);
            finite_or("tracer duration", &mut tracer.duration, defaults.duration);
            tracer.duration = tracer.duration.max(0.0);
        }
        if let Some(magazine) = self.magazine.as_mut() {
            finite_or("tactical drop delay", &mut magazine.tactical_delay, 0.0);
            finite_or("full drop delay", &mut magazine.full_delay, 0.0);
            magazine.tactical_delay = magazine.tactical_delay.max(0.0);
            magazine.full_delay = magazine.full_delay.max(0.0);
            if magazine.max_prefabs > MAX_MAGAZINE_PREFABS {
                warn!(
                    "magazine pool of {} exceeds {}, clamping",
                    magazine.max_prefabs, MAX_MAGAZINE_PREFABS
                );
                magazine.max_prefabs = MAX_MAGAZINE_PREFABS;
            }
        }
    }
}

/// Which rig the sway drives; fists sway in position too
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingTarget {
    Fist,
    #[default]
    Weapon,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// x: degrees per unit of strafe input, y: limit
    pub tilt_angle: Vec2,
    /// x: degrees per unit of mouse motion, y: limit
    pub swing_angle: Vec2,
    pub speed: f32,
    /// Roll with horizontal mouse motion as well
    pub animate_all_axes: bool,
    pub tilt_boost: Vec2,
    pub tremor_amount: f32,
    pub target: SwingTarget,
}

impl SwingConfig {
    /// Limits are magnitudes; a negative or non-finite value would invert the clamp
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        for (label, value, default) in [
            ("tilt angle", &mut self.tilt_angle, defaults.tilt_angle),
            ("swing angle", &mut self.swing_angle, defaults.swing_angle),
            ("tilt boost", &mut self.tilt_boost, defaults.tilt_boost),
        ] {
            finite_or(label, &mut value.x, default.x);
            finite_or(label, &mut value.y, default.y);
            if value.y < 0.0 {
                warn!("{label} limit {} is negative, using its magnitude", value.y);
                value.y = value.y.abs();
            }
        }
        finite_or("swing speed", &mut self.speed, defaults.speed);
        self.speed = self.speed.max(0.0);
        finite_or("tremor amount", &mut self.tremor_amount, defaults.tremor_amount);
    }
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            tilt_angle: Vec2::new(5.0, 10.0),
            swing_angle: Vec2::new(4.0, 8.0),
            speed: 0.5,
            animate_all_axes: false,
            tilt_boost: Vec2::new(2.5, 5.0),
            tremor_amount: 1.0,
            target: SwingTarget::Weapon,
        }
    }
}

/// Everything a firearm needs to be presented
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponProfile {
    pub name: String,
    pub gun: GunAnimationConfig,
    pub effects: EffectsConfig,
    pub swing: Option<SwingConfig>,
}

/// Everything the unarmed arms need to be presented
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmsProfile {
    pub name: String,
    pub arms: ArmsAnimationConfig,
    pub swing: Option<SwingConfig>,
}

pub fn load_weapon_profile_from_str(text: &str) -> Result<WeaponProfile, ConfigError> {
    Ok(ron::from_str(text)?)
}

pub fn load_weapon_profile_from_file(path: impl AsRef<Path>) -> Result<WeaponProfile, ConfigError> {
    load_weapon_profile_from_str(&read_profile(path.as_ref())?)
}

pub fn load_arms_profile_from_str(text: &str) -> Result<ArmsProfile, ConfigError> {
    Ok(ron::from_str(text)?)
}

pub fn load_arms_profile_from_file(path: impl AsRef<Path>) -> Result<ArmsProfile, ConfigError> {
    load_arms_profile_from_str(&read_profile(path.as_ref())?)
}

fn read_profile(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn clamp_speed(label: &str, speed: &mut f32) {
    if speed.is_nan() || *speed < MIN_PLAYBACK_SPEED {
        warn!("{label} speed {speed} is below {MIN_PLAYBACK_SPEED}, clamping");
        *speed = MIN_PLAYBACK_SPEED;
    }
}

fn finite_or(label: &str, value: &mut f32, default: f32) {
    if !value.is_finite() {
        warn!("{label} {value} is not finite, using {default}");
        *value = default;
    }
}

fn clamp_volume(label: &str, volume: &mut f32) {
    let clamped = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
    if clamped != *volume {
        warn!("{label} volume {volume} is outside [0, 1], clamping");
        *volume = clamped;
    }
}
