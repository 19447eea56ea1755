//! Recording fakes of the engine services

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bevy::math::{Quat, Vec3};

use crate::pose::Pose;
use crate::services::{
    AnimationClips, AudioBackend, AudioEmitter, AudioHandle, BodyId, ColliderId, EffectAnchor,
    EffectBackend, Emission, PointSettings, SourceSettings, ViewRig,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Play(String),
    CrossFade(String, f32),
    SetParameter(String, f32),
    PlaybackSpeed(f32),
    Register(&'static str),
    EmitterPlay { channel: &'static str, clip: String, fade_in: f32 },
    ForcePlay { channel: &'static str, clip: String, volume: f32 },
    Stop(&'static str),
    PlayAtPoint { clip: String, position: Vec3, settings: PointSettings },
    SetPose(Pose),
    SetFov(f32),
    Particles(String),
    ConfigureEmission(String, Emission),
    Spawn { prefab: String, body: BodyId, position: Vec3, velocity: Vec3 },
    Launch { body: BodyId, position: Vec3, velocity: Vec3 },
    IgnoreCollision(BodyId, ColliderId),
    DespawnAfter(BodyId, f32),
}

/// Shared call log handed to every fake of one test
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// Drain the log, returning what was recorded since the last take
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }

    /// Clips started by `play` or `cross_fade`, in order
    pub fn clips(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Play(clip) | Call::CrossFade(clip, _) => Some(clip),
                _ => None,
            })
            .collect()
    }

    /// Audio clips sent to any channel or point, in order
    pub fn sounds(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::EmitterPlay { clip, .. }
                | Call::ForcePlay { clip, .. }
                | Call::PlayAtPoint { clip, .. } => Some(clip),
                _ => None,
            })
            .collect()
    }
}

pub struct FakeClips {
    log: CallLog,
    durations: HashMap<String, f32>,
}

impl FakeClips {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            durations: HashMap::new(),
        }
    }

    pub fn with_duration(mut self, clip: &str, seconds: f32) -> Self {
        self.durations.insert(clip.to_string(), seconds);
        self
    }
}

impl AnimationClips for FakeClips {
    fn play(&mut self, clip: &str) {
        self.log.push(Call::Play(clip.to_string()));
    }

    fn cross_fade(&mut self, clip: &str, blend_seconds: f32) {
        self.log.push(Call::CrossFade(clip.to_string(), blend_seconds));
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        self.log.push(Call::SetParameter(name.to_string(), value));
    }

    fn set_playback_speed(&mut self, speed: f32) {
        self.log.push(Call::PlaybackSpeed(speed));
    }

    fn clip_duration(&self, clip: &str) -> Option<f32> {
        self.durations.get(clip).copied()
    }
}

struct FakeEmitter {
    log: CallLog,
    channel: &'static str,
}

impl AudioEmitter for FakeEmitter {
    fn play(&mut self, clip: &AudioHandle, fade_in: f32) {
        self.log.push(Call::EmitterPlay {
            channel: self.channel,
            clip: clip.path().to_string(),
            fade_in,
        });
    }

    fn force_play(&mut self, clip: &AudioHandle, volume: f32) {
        self.log.push(Call::ForcePlay {
            channel: self.channel,
            clip: clip.path().to_string(),
            volume,
        });
    }

    fn stop(&mut self) {
        self.log.push(Call::Stop(self.channel));
    }
}

pub struct FakeAudio {
    log: CallLog,
    pub registered: Arc<Mutex<Vec<SourceSettings>>>,
}

impl FakeAudio {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            registered: Arc::default(),
        }
    }
}

impl AudioBackend for FakeAudio {
    fn register_source(&mut self, settings: &SourceSettings) -> Box<dyn AudioEmitter> {
        self.log.push(Call::Register(settings.name));
        self.registered.lock().unwrap().push(settings.clone());
        Box::new(FakeEmitter {
            log: self.log.clone(),
            channel: settings.name,
        })
    }

    fn play_clip_at_point(&mut self, clip: &AudioHandle, position: Vec3, settings: PointSettings) {
        self.log.push(Call::PlayAtPoint {
            clip: clip.path().to_string(),
            position,
            settings,
        });
    }
}

pub struct FakeView {
    log: CallLog,
    camera: Vec3,
}

impl FakeView {
    pub fn new(log: &CallLog, camera: Vec3) -> Self {
        Self {
            log: log.clone(),
            camera,
        }
    }
}

impl ViewRig for FakeView {
    fn set_local_pose(&mut self, pose: Pose) {
        self.log.push(Call::SetPose(pose));
    }

    fn set_field_of_view(&mut self, fov_degrees: f32) {
        self.log.push(Call::SetFov(fov_degrees));
    }

    fn camera_position(&self) -> Vec3 {
        self.camera
    }
}

pub struct FakeEffects {
    log: CallLog,
    anchors: HashMap<&'static str, (Vec3, Quat)>,
    next_body: u64,
}

impl FakeEffects {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            anchors: HashMap::new(),
            next_body: 0,
        }
    }

    pub fn with_anchor(mut self, anchor: EffectAnchor, position: Vec3) -> Self {
        self.anchors.insert(anchor_key(anchor), (position, Quat::IDENTITY));
        self
    }
}

fn anchor_key(anchor: EffectAnchor) -> &'static str {
    match anchor {
        EffectAnchor::TracerOrigin => "tracer",
        EffectAnchor::MagazineDrop => "magazine",
    }
}

impl EffectBackend for FakeEffects {
    fn anchor(&self, anchor: EffectAnchor) -> Option<(Vec3, Quat)> {
        self.anchors.get(anchor_key(anchor)).copied()
    }

    fn play_particles(&mut self, system: &str) {
        self.log.push(Call::Particles(system.to_string()));
    }

    fn configure_emission(&mut self, system: &str, emission: Emission) {
        self.log.push(Call::ConfigureEmission(system.to_string(), emission));
    }

    fn spawn_body(
        &mut self,
        prefab: &str,
        position: Vec3,
        _rotation: Quat,
        velocity: Vec3,
    ) -> Option<BodyId> {
        let body = BodyId(self.next_body);
        self.next_body += 1;
        self.log.push(Call::Spawn {
            prefab: prefab.to_string(),
            body,
            position,
            velocity,
        });
        Some(body)
    }

    fn launch_body(&mut self, body: BodyId, position: Vec3, _rotation: Quat, velocity: Vec3) {
        self.log.push(Call::Launch {
            body,
            position,
            velocity,
        });
    }

    fn ignore_collision(&mut self, body: BodyId, collider: ColliderId) {
        self.log.push(Call::IgnoreCollision(body, collider));
    }

    fn despawn_after(&mut self, body: BodyId, seconds: f32) {
        self.log.push(Call::DespawnAfter(body, seconds));
    }
}
