//! Unarmed arms controller (fists and melee swings)

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ActionConfig, ArmsAnimationConfig};
use crate::gun::CHARACTER_BODY_CHANNEL;
use crate::selection::{rotate_sound, select_clip, SequentialCursor};
use crate::services::{
    AnimationClips, AudioBackend, AudioEmitter, AudioHandle, PointSettings, SourceAnchor,
    SourceSettings,
};
use crate::{WeaponAnimator, CROSSFADE_SECONDS, HIT_MAX_DISTANCE, HIT_MIN_DISTANCE};

/// Rate at which the walk/run velocity blend moves (units per second)
const VELOCITY_BLEND_RATE: f32 = 5.0;

/// Character movement state sampled each tick
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Locomotion {
    pub running: bool,
    pub sliding: bool,
    /// Force the character controller is currently accelerating with
    pub target_force: f32,
    /// The controller's motion state is Running (can lag behind `running`)
    pub running_state: bool,
}

struct Bound {
    clips: Option<Box<dyn AnimationClips>>,
    audio: Box<dyn AudioBackend>,
    body: Box<dyn AudioEmitter>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hand {
    Left,
    Right,
}

pub struct ArmsAnimator {
    config: ArmsAnimationConfig,
    /// One cursor for both hands
    cursor: SequentialCursor,
    attack_sounds: Vec<AudioHandle>,
    velocity: f32,
    rng: StdRng,
    bound: Option<Bound>,
}

impl ArmsAnimator {
    pub fn new(config: ArmsAnimationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: ArmsAnimationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut config: ArmsAnimationConfig, rng: StdRng) -> Self {
        config.sanitize();
        let attack_sounds = config
            .attack
            .as_ref()
            .map(|attack| attack.sounds.clone())
            .unwrap_or_default();
        Self {
            config,
            cursor: SequentialCursor::default(),
            attack_sounds,
            velocity: 0.0,
            rng,
            bound: None,
        }
    }

    pub fn init(
        &mut self,
        clips: Option<Box<dyn AnimationClips>>,
        mut audio: Box<dyn AudioBackend>,
    ) {
        let body = audio.register_source(&SourceSettings::flat(
            CHARACTER_BODY_CHANNEL,
            SourceAnchor::Character,
        ));
        debug!("arms animator bound (animator: {})", clips.is_some());
        self.bound = Some(Bound { clips, audio, body });
    }

    pub fn config(&self) -> &ArmsAnimationConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.bound.is_some()
    }

    /// Current walk/run blend in `0..=1`
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Advance the walk/run blend and scale playback with the movement force.
    pub fn set_locomotion(&mut self, locomotion: Locomotion, dt: f32) {
        let Some(clips) = self.bound.as_mut().and_then(|bound| bound.clips.as_mut()) else {
            return;
        };
        let target = if locomotion.sliding {
            0.0
        } else if locomotion.running {
            1.0
        } else {
            0.0
        };
        self.velocity = move_towards(self.velocity, target, dt * VELOCITY_BLEND_RATE);
        clips.set_parameter(&self.config.velocity_parameter, self.velocity);

        let speed = if locomotion.running_state {
            (locomotion.target_force / 10.0).max(0.8)
        } else {
            1.0
        };
        clips.set_playback_speed(speed);
    }

    pub fn left_attack(&mut self) {
        self.attack_with(Hand::Left);
    }

    pub fn right_attack(&mut self) {
        self.attack_with(Hand::Right);
    }

    fn attack_with(&mut self, hand: Hand) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let Some(clips) = bound.clips.as_mut() else {
            return;
        };
        let Some(attack) = self.config.attack.as_ref() else {
            return;
        };
        clips.set_playback_speed(1.0);

        let list = match hand {
            Hand::Left => &attack.left,
            Hand::Right => &attack.right,
        };
        if let Some(clip) = select_clip(list, attack.policy, &mut self.cursor, &mut self.rng) {
            if !clip.is_empty() {
                clips.cross_fade(clip, CROSSFADE_SECONDS);
            }
        }

        if let Some(sound) = rotate_sound(&mut self.attack_sounds, &mut self.rng) {
            bound.body.force_play(sound, attack.volume);
        }
    }

    pub fn draw(&mut self) {
        let Some(action) = self.config.draw.as_ref() else {
            return;
        };
        let Some((clips, body)) = Self::playable(&mut self.bound, action) else {
            return;
        };
        clips.play(&action.clip);
        if let Some(sound) = &action.sound {
            body.force_play(sound, action.volume);
        }
    }

    pub fn hide(&mut self) {
        let Some(action) = self.config.hide.as_ref() else {
            return;
        };
        let Some((clips, body)) = Self::playable(&mut self.bound, action) else {
            return;
        };
        clips.cross_fade(&action.clip, CROSSFADE_SECONDS);
        body.stop();
        if let Some(sound) = &action.sound {
            body.force_play(sound, action.volume);
        }
    }

    pub fn interact(&mut self) {
        let Some(interact) = self.config.interact.as_ref() else {
            return;
        };
        Self::cross_fade_action(&mut self.bound, &interact.action);
    }

    pub fn vault(&mut self) {
        let Some(action) = self.config.vault.as_ref() else {
            return;
        };
        Self::cross_fade_action(&mut self.bound, action);
    }

    pub fn hit(&mut self, position: Vec3) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let sounds = &self.config.hit.sounds;
        if sounds.is_empty() {
            return;
        }
        let sound = &sounds[self.rng.gen_range(0..sounds.len())];
        bound.audio.play_clip_at_point(
            sound,
            position,
            PointSettings {
                min_distance: HIT_MIN_DISTANCE,
                max_distance: HIT_MAX_DISTANCE,
                volume: self.config.hit.volume,
                spatial_blend: 1.0,
            },
        );
    }

    /// Resolve the animator and body channel for `action`, resetting playback speed
    fn playable<'a>(
        bound: &'a mut Option<Bound>,
        action: &ActionConfig,
    ) -> Option<(&'a mut Box<dyn AnimationClips>, &'a mut Box<dyn AudioEmitter>)> {
        let bound = bound.as_mut()?;
        let clips = bound.clips.as_mut()?;
        if !action.has_clip() {
            return None;
        }
        clips.set_playback_speed(action.speed);
        Some((clips, &mut bound.body))
    }

    fn cross_fade_action(bound: &mut Option<Bound>, action: &ActionConfig) {
        let Some((clips, body)) = Self::playable(bound, action) else {
            return;
        };
        clips.cross_fade(&action.clip, CROSSFADE_SECONDS);
        if let Some(sound) = &action.sound {
            body.force_play(sound, action.volume);
        }
    }

    fn duration(&self, action: Option<&ActionConfig>) -> f32 {
        let Some(clips) = self.bound.as_ref().and_then(|bound| bound.clips.as_ref()) else {
            return 0.0;
        };
        action
            .filter(|action| action.has_clip())
            .and_then(|action| Some(clips.clip_duration(&action.clip)? / action.speed))
            .unwrap_or(0.0)
    }

    pub fn draw_duration(&self) -> f32 {
        self.duration(self.config.draw.as_ref())
    }

    pub fn hide_duration(&self) -> f32 {
        self.duration(self.config.hide.as_ref())
    }

    pub fn interact_duration(&self) -> f32 {
        self.duration(self.config.interact.as_ref().map(|interact| &interact.action))
    }

    pub fn interact_delay(&self) -> f32 {
        self.config
            .interact
            .as_ref()
            .map_or(0.0, |interact| interact.signal_delay)
    }
}

fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

impl WeaponAnimator for ArmsAnimator {
    fn is_initialized(&self) -> bool {
        ArmsAnimator::is_initialized(self)
    }

    fn draw(&mut self) {
        ArmsAnimator::draw(self);
    }

    fn hide(&mut self) {
        ArmsAnimator::hide(self);
    }

    fn attack(&mut self) {
        self.right_attack();
    }

    fn hit(&mut self, position: Vec3) {
        ArmsAnimator::hit(self, position);
    }

    fn interact(&mut self) {
        ArmsAnimator::interact(self);
    }

    fn vault(&mut self) {
        ArmsAnimator::vault(self);
    }

    fn draw_duration(&self) -> f32 {
        ArmsAnimator::draw_duration(self)
    }

    fn hide_duration(&self) -> f32 {
        ArmsAnimator::hide_duration(self)
    }

    fn interact_duration(&self) -> f32 {
        ArmsAnimator::interact_duration(self)
    }

    fn interact_delay(&self) -> f32 {
        ArmsAnimator::interact_delay(self)
    }
}
