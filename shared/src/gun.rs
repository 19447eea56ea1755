//! Firearm presentation controller
//!
//! Maps discrete gameplay events (shot, reload phases, melee...) to a clip, a playback
//! speed and a sound, and drives the procedural aim/run/slide blend every tick.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ActionConfig, GunAnimationConfig};
use crate::pose::{AimCue, Pose, PoseBlender};
use crate::selection::{rotate_sound, select_clip, SequentialCursor};
use crate::services::{
    AnimationClips, AudioBackend, AudioCategory, AudioEmitter, AudioHandle, PointSettings,
    SourceAnchor, SourceSettings, ViewRig,
};
use crate::{
    WeaponAnimator, AIM_CUE_FADE_SECONDS, CROSSFADE_SECONDS, HIT_MAX_DISTANCE, HIT_MIN_DISTANCE,
    WEAPON_MAX_DISTANCE, WEAPON_MIN_DISTANCE,
};

pub const CHARACTER_BODY_CHANNEL: &str = "CharacterBody";
pub const WEAPON_GENERIC_CHANNEL: &str = "WeaponGeneric";
pub const WEAPON_CHANNEL: &str = "Weapon";

/// Engine handles handed to [`GunAnimator::init`]
pub struct GunBindings {
    /// `None` when the weapon model has no animator; clip triggers then do nothing
    pub clips: Option<Box<dyn AnimationClips>>,
    pub audio: Box<dyn AudioBackend>,
    pub view: Box<dyn ViewRig>,
}

struct Channels {
    body: Box<dyn AudioEmitter>,
    generic: Box<dyn AudioEmitter>,
    weapon: Box<dyn AudioEmitter>,
}

struct Bound {
    clips: Option<Box<dyn AnimationClips>>,
    audio: Box<dyn AudioBackend>,
    view: Box<dyn ViewRig>,
    channels: Channels,
}

/// Which channel a triggered sound goes to
#[derive(Clone, Copy)]
enum Channel {
    Body,
    Generic,
}

pub struct GunAnimator {
    config: GunAnimationConfig,
    blender: PoseBlender,
    cursor: SequentialCursor,
    /// Reordered on every shot by the anti-repeat shuffle
    fire_sounds: Vec<AudioHandle>,
    rng: StdRng,
    bound: Option<Bound>,
}

impl GunAnimator {
    pub fn new(config: GunAnimationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic clip and sound picks
    pub fn with_seed(config: GunAnimationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut config: GunAnimationConfig, rng: StdRng) -> Self {
        config.sanitize();
        let blender =
            PoseBlender::new(config.aim.clone(), config.run.clone(), config.slide.clone());
        let fire_sounds = config
            .fire
            .as_ref()
            .map(|fire| fire.sounds.clone())
            .unwrap_or_default();
        Self {
            config,
            blender,
            cursor: SequentialCursor::default(),
            fire_sounds,
            rng,
            bound: None,
        }
    }

    /// Bind the engine services and capture the weapon's rest pose and the camera FOV.
    pub fn init(&mut self, bindings: GunBindings, hip: Pose, default_fov: f32) {
        let GunBindings { clips, mut audio, view } = bindings;

        let channels = Channels {
            body: audio.register_source(&SourceSettings::flat(
                CHARACTER_BODY_CHANNEL,
                SourceAnchor::Character,
            )),
            generic: audio.register_source(&SourceSettings::flat(
                WEAPON_GENERIC_CHANNEL,
                SourceAnchor::Weapon,
            )),
            weapon: audio.register_source(&SourceSettings {
                category: Some(AudioCategory::Sfx),
                min_distance: Some(WEAPON_MIN_DISTANCE),
                max_distance: Some(WEAPON_MAX_DISTANCE),
                ..SourceSettings::flat(WEAPON_CHANNEL, SourceAnchor::Weapon)
            }),
        };

        self.blender.bind(hip, default_fov);
        debug!(
            "gun animator bound (animator: {}, hip: {:?}, fov: {})",
            clips.is_some(),
            hip.position,
            default_fov
        );
        self.bound = Some(Bound {
            clips,
            audio,
            view,
            channels,
        });
    }

    pub fn config(&self) -> &GunAnimationConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.bound.is_some()
    }

    /// True once the weapon has settled on the aim pose, see [`PoseBlender::is_aiming`]
    pub fn is_aiming(&self) -> bool {
        self.bound.is_some() && self.blender.is_aiming()
    }

    pub fn can_hold_breath(&self) -> bool {
        self.config.aim.as_ref().is_some_and(|aim| aim.hold_breath)
    }

    pub fn can_melee_attack(&self) -> bool {
        self.config.melee.is_some()
    }

    pub fn field_of_view(&self) -> f32 {
        self.blender.field_of_view()
    }

    pub fn set_default_fov(&mut self, fov: f32) {
        self.blender.set_default_fov(fov);
    }

    // Customization

    /// Replace the aim target after a sight attachment changed
    pub fn update_aiming(&mut self, position: Vec3, rotation_degrees: Vec3, zoom: bool, fov: f32) {
        self.blender.update_aiming(position, rotation_degrees, zoom, fov);
    }

    /// Replace the shot sounds after a muzzle attachment changed
    pub fn update_fire_sounds(&mut self, sounds: impl IntoIterator<Item = AudioHandle>) {
        self.fire_sounds = sounds.into_iter().collect();
    }

    // Continuous blending

    pub fn aim(&mut self, is_aiming: bool, dt: f32) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let cue = self.blender.aim(is_aiming, dt);
        Self::finish_blend(bound, &self.blender, cue);
    }

    pub fn sprint(&mut self, is_running: bool, is_sliding: bool, dt: f32) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let cue = self.blender.sprint(is_running, is_sliding, dt);
        Self::finish_blend(bound, &self.blender, cue);
    }

    fn finish_blend(bound: &mut Bound, blender: &PoseBlender, cue: Option<AimCue>) {
        if let Some(sound) = cue.as_ref().and_then(AimCue::sound) {
            bound.channels.body.play(sound, AIM_CUE_FADE_SECONDS);
        }
        bound.view.set_local_pose(blender.current());
        bound.view.set_field_of_view(blender.field_of_view());
    }

    // Triggers

    pub fn draw(&mut self) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let Some(action) = self.config.draw.as_ref().filter(|action| action.has_clip()) else {
            return;
        };
        let Some(clips) = bound.clips.as_mut() else {
            return;
        };
        clips.set_parameter(&self.config.speed_parameter, action.speed);
        clips.play(&action.clip);
        if let Some(sound) = &action.sound {
            bound.channels.body.force_play(sound, action.volume);
        }
    }

    pub fn hide(&mut self) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let Some(action) = self.config.hide.as_ref().filter(|action| action.has_clip()) else {
            return;
        };
        let Some(clips) = bound.clips.as_mut() else {
            return;
        };
        clips.set_parameter(&self.config.speed_parameter, action.speed);
        clips.cross_fade(&action.clip, CROSSFADE_SECONDS);
        bound.channels.weapon.stop();
        bound.channels.generic.stop();
        if let Some(sound) = &action.sound {
            bound.channels.body.force_play(sound, action.volume);
        }
    }

    /// Fire one round; `last_round` switches to the slide-lock clip when configured
    pub fn shot(&mut self, last_round: bool) {
        let aiming = self.is_aiming();
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let Some(clips) = bound.clips.as_mut() else {
            return;
        };
        let Some(fire) = self.config.fire.as_ref() else {
            return;
        };

        match fire.last_round_clip.as_deref() {
            Some(last_clip) if last_round => {
                clips.set_parameter(&self.config.speed_parameter, fire.speed);
                if !last_clip.is_empty() {
                    clips.cross_fade(last_clip, CROSSFADE_SECONDS);
                }
            }
            _ => {
                // Sights without aimed clips fall back to the hip list
                let (list, speed) = if aiming && !fire.aimed_clips.is_empty() {
                    (&fire.aimed_clips, fire.aimed_speed)
                } else {
                    (&fire.clips, fire.speed)
                };
                if !list.is_empty() {
                    clips.set_parameter(&self.config.speed_parameter, speed);
                    let selected = select_clip(list, fire.policy, &mut self.cursor, &mut self.rng);
                    if let Some(clip) = selected.filter(|clip| !clip.is_empty()) {
                        clips.cross_fade(clip, CROSSFADE_SECONDS);
                    }
                }
            }
        }

        let Some(sound) = rotate_sound(&mut self.fire_sounds, &mut self.rng) else {
            return;
        };
        if fire.additive_sound {
            let position = bound.view.camera_position();
            bound.audio.play_clip_at_point(
                sound,
                position,
                PointSettings {
                    min_distance: WEAPON_MIN_DISTANCE,
                    max_distance: WEAPON_MAX_DISTANCE,
                    volume: fire.volume,
                    spatial_blend: 0.0,
                },
            );
        } else {
            bound.channels.weapon.force_play(sound, fire.volume);
        }
    }

    /// Dry-fire click
    pub fn out_of_ammo(&mut self) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let volume = self.config.fire.as_ref().map_or(0.5, |fire| fire.volume);
        if let Some(sound) = &self.config.out_of_ammo {
            bound.channels.body.force_play(sound, volume);
        }
    }

    pub fn reload(&mut self, round_in_chamber: bool) {
        let Some(reload) = self.config.reload.as_ref() else {
            return;
        };
        let action = if round_in_chamber {
            &reload.tactical
        } else {
            &reload.full
        };
        Self::trigger(&mut self.bound, &self.config.speed_parameter, action, Channel::Generic);
    }

    /// Begin a bullet-by-bullet reload; an empty chamber is loaded directly first
    pub fn start_reload(&mut self, round_in_chamber: bool) {
        let Some(reload) = self.config.reload.as_ref() else {
            return;
        };
        let action = if round_in_chamber {
            &reload.start
        } else {
            &reload.insert_in_chamber
        };
        if !action.has_clip() {
            return;
        }
        if let Some(bound) = self.bound.as_mut().filter(|bound| bound.clips.is_some()) {
            bound.channels.weapon.stop();
        }
        Self::trigger(&mut self.bound, &self.config.speed_parameter, action, Channel::Generic);
    }

    pub fn insert(&mut self) {
        let Some(reload) = self.config.reload.as_ref() else {
            return;
        };
        let speed_parameter = &self.config.speed_parameter;
        Self::trigger(&mut self.bound, speed_parameter, &reload.insert, Channel::Generic);
    }

    pub fn stop_reload(&mut self) {
        let Some(reload) = self.config.reload.as_ref() else {
            return;
        };
        let speed_parameter = &self.config.speed_parameter;
        Self::trigger(&mut self.bound, speed_parameter, &reload.stop, Channel::Generic);
    }

    pub fn melee(&mut self) {
        let Some(melee) = self.config.melee.as_ref() else {
            return;
        };
        Self::trigger(&mut self.bound, &self.config.speed_parameter, &melee.action, Channel::Body);
    }

    pub fn switch_mode(&mut self) {
        let Some(action) = self.config.switch_mode.as_ref() else {
            return;
        };
        Self::trigger(&mut self.bound, &self.config.speed_parameter, action, Channel::Body);
    }

    pub fn interact(&mut self) {
        let Some(interact) = self.config.interact.as_ref() else {
            return;
        };
        let speed_parameter = &self.config.speed_parameter;
        Self::trigger(&mut self.bound, speed_parameter, &interact.action, Channel::Body);
    }

    pub fn vault(&mut self) {
        let Some(action) = self.config.vault.as_ref() else {
            return;
        };
        Self::trigger(&mut self.bound, &self.config.speed_parameter, action, Channel::Body);
    }

    /// Random impact sound at `position`; plays without an animator
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

    /// Set speed, crossfade and force-play the sound of a single-clip action
    fn trigger(
        bound: &mut Option<Bound>,
        speed_parameter: &str,
        action: &ActionConfig,
        channel: Channel,
    ) {
        let Some(bound) = bound.as_mut() else {
            return;
        };
        let Some(clips) = bound.clips.as_mut() else {
            return;
        };
        if !action.has_clip() {
            return;
        }
        clips.set_parameter(speed_parameter, action.speed);
        clips.cross_fade(&action.clip, CROSSFADE_SECONDS);
        let Some(sound) = &action.sound else {
            return;
        };
        let emitter = match channel {
            Channel::Body => &mut bound.channels.body,
            Channel::Generic => &mut bound.channels.generic,
        };
        emitter.force_play(sound, action.volume);
    }

    // Durations

    /// Clip length divided by playback speed; 0 when anything is missing
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

    pub fn reload_duration(&self) -> f32 {
        self.duration(self.config.reload.as_ref().map(|reload| &reload.tactical))
    }

    pub fn full_reload_duration(&self) -> f32 {
        self.duration(self.config.reload.as_ref().map(|reload| &reload.full))
    }

    pub fn start_reload_duration(&self) -> f32 {
        self.duration(self.config.reload.as_ref().map(|reload| &reload.start))
    }

    pub fn insert_in_chamber_duration(&self) -> f32 {
        self.duration(self.config.reload.as_ref().map(|reload| &reload.insert_in_chamber))
    }

    pub fn insert_duration(&self) -> f32 {
        self.duration(self.config.reload.as_ref().map(|reload| &reload.insert))
    }

    pub fn stop_reload_duration(&self) -> f32 {
        self.duration(self.config.reload.as_ref().map(|reload| &reload.stop))
    }

    pub fn melee_duration(&self) -> f32 {
        self.duration(self.config.melee.as_ref().map(|melee| &melee.action))
    }

    pub fn switch_mode_duration(&self) -> f32 {
        self.duration(self.config.switch_mode.as_ref())
    }

    pub fn interact_duration(&self) -> f32 {
        self.duration(self.config.interact.as_ref().map(|interact| &interact.action))
    }

    /// Time until the melee hit lands, never longer than the swing itself
    pub fn melee_delay(&self) -> f32 {
        self.config
            .melee
            .as_ref()
            .map_or(0.0, |melee| melee.hit_delay.min(self.melee_duration()))
    }

    pub fn interact_delay(&self) -> f32 {
        self.config
            .interact
            .as_ref()
            .map_or(0.0, |interact| interact.signal_delay)
    }
}

impl WeaponAnimator for GunAnimator {
    fn is_initialized(&self) -> bool {
        GunAnimator::is_initialized(self)
    }

    fn draw(&mut self) {
        GunAnimator::draw(self);
    }

    fn hide(&mut self) {
        GunAnimator::hide(self);
    }

    fn attack(&mut self) {
        self.shot(false);
    }

    fn hit(&mut self, position: Vec3) {
        GunAnimator::hit(self, position);
    }

    fn interact(&mut self) {
        GunAnimator::interact(self);
    }

    fn vault(&mut self) {
        GunAnimator::vault(self);
    }

    fn draw_duration(&self) -> f32 {
        GunAnimator::draw_duration(self)
    }

    fn hide_duration(&self) -> f32 {
        GunAnimator::hide_duration(self)
    }

    fn interact_duration(&self) -> f32 {
        GunAnimator::interact_duration(self)
    }

    fn interact_delay(&self) -> f32 {
        GunAnimator::interact_delay(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AimProfile, FireConfig, HitSounds, MeleeConfig, SelectionPolicy};
    use crate::testing::{Call, CallLog, FakeAudio, FakeClips, FakeView};

    const CAMERA: Vec3 = Vec3::new(0.0, 1.7, 0.0);
    const DT: f32 = 1.0 / 60.0;

    fn fire(clips: &[&str], sounds: &[&str]) -> FireConfig {
        FireConfig {
            clips: clips.iter().map(|clip| clip.to_string()).collect(),
            aimed_clips: vec!["Aimed Fire".to_string()],
            aimed_speed: 0.5,
            sounds: sounds.iter().map(|sound| AudioHandle::new(*sound)).collect(),
            ..Default::default()
        }
    }

    fn bound(config: GunAnimationConfig, log: &CallLog) -> GunAnimator {
        let mut gun = GunAnimator::with_seed(config, 11);
        gun.init(
            GunBindings {
                clips: Some(Box::new(
                    FakeClips::new(log)
                        .with_duration("Draw", 1.2)
                        .with_duration("Melee", 0.6),
                )),
                audio: Box::new(FakeAudio::new(log)),
                view: Box::new(FakeView::new(log, CAMERA)),
            },
            Pose::IDENTITY,
            60.0,
        );
        log.take();
        gun
    }

    #[test]
    fn test_init_registers_channels() {
        let log = CallLog::default();
        let audio = FakeAudio::new(&log);
        let registered = audio.registered.clone();
        let mut gun = GunAnimator::new(GunAnimationConfig::standard());
        assert!(!gun.is_initialized());

        gun.init(
            GunBindings {
                clips: None,
                audio: Box::new(audio),
                view: Box::new(FakeView::new(&log, CAMERA)),
            },
            Pose::IDENTITY,
            60.0,
        );
        assert!(gun.is_initialized());
        assert_eq!(
            log.calls(),
            vec![
                Call::Register(CHARACTER_BODY_CHANNEL),
                Call::Register(WEAPON_GENERIC_CHANNEL),
                Call::Register(WEAPON_CHANNEL),
            ]
        );

        let registered = registered.lock().unwrap();
        let weapon = &registered[2];
        assert_eq!(weapon.category, Some(AudioCategory::Sfx));
        assert_eq!(weapon.min_distance, Some(WEAPON_MIN_DISTANCE));
        assert_eq!(weapon.max_distance, Some(WEAPON_MAX_DISTANCE));
        assert_eq!(weapon.spatial_blend, 0.0);
    }

    #[test]
    fn test_triggers_before_init_are_noops() {
        let mut gun = GunAnimator::new(GunAnimationConfig::standard());
        gun.draw();
        gun.shot(true);
        gun.reload(false);
        gun.hit(Vec3::ZERO);
        gun.aim(true, DT);
        gun.out_of_ammo();
        assert!(!gun.is_initialized());
        assert!(!gun.is_aiming());
        assert_eq!(gun.draw_duration(), 0.0);
    }

    #[test]
    fn test_disabled_reload_makes_no_calls() {
        let log = CallLog::default();
        let config = GunAnimationConfig {
            reload: None,
            ..GunAnimationConfig::standard()
        };
        let mut gun = bound(config, &log);

        gun.reload(true);
        gun.reload(false);
        gun.start_reload(true);
        gun.start_reload(false);
        gun.insert();
        gun.stop_reload();
        assert!(log.is_empty());
    }

    #[test]
    fn test_sequential_fire_at_standard_speed() {
        let log = CallLog::default();
        let config = GunAnimationConfig {
            fire: Some(fire(&["A", "B"], &[])),
            ..GunAnimationConfig::standard()
        };
        let mut gun = bound(config, &log);

        for _ in 0..3 {
            gun.shot(false);
        }
        let calls = log.calls();
        assert_eq!(log.clips(), vec!["A", "B", "A"]);
        assert!(calls
            .iter()
            .filter_map(|call| match call {
                Call::SetParameter(name, value) => Some((name.as_str(), *value)),
                _ => None,
            })
            .all(|(name, value)| name == "Speed" && value == 1.0));
        assert!(calls.contains(&Call::CrossFade("A".to_string(), CROSSFADE_SECONDS)));
    }

    #[test]
    fn test_last_round_overrides_selection() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig {
            fire: Some(FireConfig {
                policy: SelectionPolicy::Random,
                last_round_clip: Some("Last Fire".to_string()),
                ..fire(&["A", "B"], &[])
            }),
            ..GunAnimationConfig::standard()
        };
        config.aim = Some(AimProfile {
            position: Vec3::new(0.0, -0.1, 0.2),
            ..Default::default()
        });
        let mut gun = bound(config, &log);

        for _ in 0..300 {
            gun.aim(true, DT);
        }
        assert!(gun.is_aiming());
        log.take();

        gun.shot(true);
        assert_eq!(
            log.calls(),
            vec![
                Call::SetParameter("Speed".to_string(), 1.0),
                Call::CrossFade("Last Fire".to_string(), CROSSFADE_SECONDS),
            ]
        );
    }

    #[test]
    fn test_aimed_fire_uses_aimed_list_and_speed() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig {
            fire: Some(fire(&["A"], &[])),
            ..GunAnimationConfig::standard()
        };
        config.aim = Some(AimProfile {
            position: Vec3::new(0.0, -0.1, 0.2),
            ..Default::default()
        });
        let mut gun = bound(config, &log);

        // Not settled yet: standard clip
        gun.aim(true, DT);
        gun.shot(false);
        assert_eq!(log.clips(), vec!["A"]);

        for _ in 0..300 {
            gun.aim(true, DT);
        }
        log.take();
        gun.shot(false);
        assert_eq!(
            log.calls(),
            vec![
                Call::SetParameter("Speed".to_string(), 0.5),
                Call::CrossFade("Aimed Fire".to_string(), CROSSFADE_SECONDS),
            ]
        );
    }

    #[test]
    fn test_aimed_fire_falls_back_to_standard_list() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig {
            fire: Some(FireConfig {
                aimed_clips: Vec::new(),
                ..fire(&["A"], &[])
            }),
            ..GunAnimationConfig::standard()
        };
        config.aim = Some(AimProfile {
            position: Vec3::new(0.0, -0.1, 0.2),
            ..Default::default()
        });
        let mut gun = bound(config, &log);

        for _ in 0..300 {
            gun.aim(true, DT);
        }
        assert!(gun.is_aiming());
        log.take();

        gun.shot(false);
        assert_eq!(
            log.calls(),
            vec![
                Call::SetParameter("Speed".to_string(), 1.0),
                Call::CrossFade("A".to_string(), CROSSFADE_SECONDS),
            ]
        );
    }

    #[test]
    fn test_replace_fire_sound_cuts_weapon_channel() {
        let log = CallLog::default();
        let config = GunAnimationConfig {
            fire: Some(FireConfig {
                additive_sound: false,
                ..fire(&["A"], &["shot"])
            }),
            ..GunAnimationConfig::standard()
        };
        let mut gun = bound(config, &log);

        gun.shot(false);
        assert!(log.calls().contains(&Call::ForcePlay {
            channel: WEAPON_CHANNEL,
            clip: "shot".to_string(),
            volume: 0.5,
        }));
    }

    #[test]
    fn test_additive_fire_sound_plays_at_camera() {
        let log = CallLog::default();
        let config = GunAnimationConfig {
            fire: Some(fire(&[], &["shot_a", "shot_b"])),
            ..GunAnimationConfig::standard()
        };
        let mut gun = bound(config, &log);

        gun.shot(false);
        gun.shot(false);
        let points: Vec<_> = log
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PlayAtPoint { clip, position, settings } => Some((clip, position, settings)),
                _ => None,
            })
            .collect();
        assert_eq!(points.len(), 2);
        // Two sounds: the shuffle alternates them
        assert_ne!(points[0].0, points[1].0);
        let (_, position, settings) = &points[0];
        assert_eq!(*position, CAMERA);
        assert_eq!(settings.min_distance, 10.0);
        assert_eq!(settings.max_distance, 25.0);
        assert_eq!(settings.spatial_blend, 0.0);
        // No fire clips configured: sounds still play, no animation
        assert!(log.clips().is_empty());
    }

    #[test]
    fn test_hide_stops_weapon_channels() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig::standard();
        config.hide = Some(ActionConfig::new("Hide", 0.25).with_sound("holster"));
        let mut gun = bound(config, &log);

        gun.hide();
        assert_eq!(
            log.calls(),
            vec![
                Call::SetParameter("Speed".to_string(), 1.0),
                Call::CrossFade("Hide".to_string(), CROSSFADE_SECONDS),
                Call::Stop(WEAPON_CHANNEL),
                Call::Stop(WEAPON_GENERIC_CHANNEL),
                Call::ForcePlay {
                    channel: CHARACTER_BODY_CHANNEL,
                    clip: "holster".to_string(),
                    volume: 0.25,
                },
            ]
        );
    }

    #[test]
    fn test_draw_is_a_hard_cut() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig::standard();
        config.draw = Some(ActionConfig::new("Draw", 0.25).with_speed(2.0));
        let mut gun = bound(config, &log);

        gun.draw();
        assert_eq!(
            log.calls(),
            vec![
                Call::SetParameter("Speed".to_string(), 2.0),
                Call::Play("Draw".to_string()),
            ]
        );
        assert_eq!(gun.draw_duration(), 0.6);
    }

    #[test]
    fn test_reload_variants_pick_clip_and_channel() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig::standard();
        if let Some(reload) = config.reload.as_mut() {
            reload.full = reload.full.clone().with_sound("mag_full");
        }
        let mut gun = bound(config, &log);

        gun.reload(true);
        gun.reload(false);
        gun.start_reload(false);
        gun.start_reload(true);
        assert_eq!(
            log.clips(),
            vec!["Reload", "FullReload", "Insert Chamber", "Start Reload"]
        );
        let calls = log.calls();
        assert!(calls.contains(&Call::ForcePlay {
            channel: WEAPON_GENERIC_CHANNEL,
            clip: "mag_full".to_string(),
            volume: 0.25,
        }));
        assert_eq!(
            calls.iter().filter(|call| **call == Call::Stop(WEAPON_CHANNEL)).count(),
            2
        );
    }

    #[test]
    fn test_empty_clip_name_is_skipped() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig::standard();
        config.vault = Some(ActionConfig::new("", 0.2).with_sound("vault"));
        let mut gun = bound(config, &log);

        gun.vault();
        assert!(log.is_empty());
    }

    #[test]
    fn test_hit_without_animator() {
        let log = CallLog::default();
        let mut gun = GunAnimator::with_seed(
            GunAnimationConfig {
                hit: HitSounds {
                    sounds: vec![AudioHandle::new("impact")],
                    volume: 0.3,
                },
                ..Default::default()
            },
            5,
        );
        gun.init(
            GunBindings {
                clips: None,
                audio: Box::new(FakeAudio::new(&log)),
                view: Box::new(FakeView::new(&log, CAMERA)),
            },
            Pose::IDENTITY,
            60.0,
        );
        log.take();

        let target = Vec3::new(4.0, 0.0, -2.0);
        gun.hit(target);
        assert_eq!(
            log.calls(),
            vec![Call::PlayAtPoint {
                clip: "impact".to_string(),
                position: target,
                settings: PointSettings {
                    min_distance: 3.0,
                    max_distance: 10.0,
                    volume: 0.3,
                    spatial_blend: 1.0,
                },
            }]
        );
    }

    #[test]
    fn test_out_of_ammo_uses_fire_volume() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig::standard();
        config.out_of_ammo = Some(AudioHandle::new("dry"));
        let mut gun = bound(config, &log);

        gun.out_of_ammo();
        assert_eq!(
            log.calls(),
            vec![Call::ForcePlay {
                channel: CHARACTER_BODY_CHANNEL,
                clip: "dry".to_string(),
                volume: 0.5,
            }]
        );
    }

    #[test]
    fn test_melee_delay_is_capped_by_duration() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig::standard();
        config.melee = Some(MeleeConfig {
            hit_delay: 2.0,
            ..Default::default()
        });
        let gun = bound(config, &log);

        assert_eq!(gun.melee_duration(), 0.6);
        assert_eq!(gun.melee_delay(), 0.6);
        assert!(gun.can_melee_attack());
        // Unknown clip length
        assert_eq!(gun.switch_mode_duration(), 0.0);
    }

    #[test]
    fn test_hold_breath_follows_sight() {
        let mut config = GunAnimationConfig::standard();
        config.aim = None;
        assert!(!GunAnimator::new(config.clone()).can_hold_breath());

        config.aim = Some(AimProfile {
            hold_breath: true,
            ..Default::default()
        });
        assert!(GunAnimator::new(config).can_hold_breath());
    }

    #[test]
    fn test_blend_writes_view_and_aim_cue() {
        let log = CallLog::default();
        let mut config = GunAnimationConfig::standard();
        config.aim = Some(AimProfile {
            position: Vec3::new(0.0, -0.1, 0.2),
            aim_in_sound: Some(AudioHandle::new("aim_in")),
            ..Default::default()
        });
        let mut gun = bound(config, &log);

        gun.aim(true, DT);
        let calls = log.take();
        assert_eq!(
            calls[0],
            Call::EmitterPlay {
                channel: CHARACTER_BODY_CHANNEL,
                clip: "aim_in".to_string(),
                fade_in: AIM_CUE_FADE_SECONDS,
            }
        );
        assert!(matches!(calls[1], Call::SetPose(_)));
        assert_eq!(calls[2], Call::SetFov(60.0));

        gun.aim(true, DT);
        assert_eq!(log.sounds().len(), 0);
    }

    #[test]
    fn test_update_fire_sounds_replaces_list() {
        let log = CallLog::default();
        let config = GunAnimationConfig {
            fire: Some(fire(&[], &["loud"])),
            ..GunAnimationConfig::standard()
        };
        let mut gun = bound(config, &log);

        gun.update_fire_sounds([AudioHandle::new("suppressed")]);
        gun.shot(false);
        assert_eq!(log.sounds(), vec!["suppressed"]);
    }
}
