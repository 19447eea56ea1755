//! Bridge between the presentation core and the ECS
//!
//! The controllers call the service traits synchronously from inside a system; every call
//! is recorded as a [`PresentationCommand`] in a shared queue and replayed as messages
//! after the controllers ran. Values the core reads back (clip lengths, camera position,
//! effect anchors) come from snapshots refreshed once per frame.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;
use shared::{
    AnimationClips, AudioBackend, AudioEmitter, AudioHandle, BodyId, ColliderId, EffectAnchor,
    EffectBackend, Emission, PointSettings, Pose, SourceSettings, ViewRig,
};

/// One engine-side effect requested by a controller
#[derive(Message, Clone, Debug, PartialEq)]
pub enum PresentationCommand {
    PlayClip { clip: String, blend: Option<f32> },
    SetParameter { name: String, value: f32 },
    SetPlaybackSpeed(f32),
    PlaySound {
        channel: &'static str,
        clip: AudioHandle,
        volume: f32,
        fade_in: f32,
        /// Cut whatever the channel is playing instead of skipping when busy
        interrupt: bool,
    },
    StopChannel(&'static str),
    PlayAtPoint {
        clip: AudioHandle,
        position: Vec3,
        settings: PointSettings,
    },
    SetWeaponPose(Pose),
    SetFieldOfView(f32),
    PlayParticles(String),
    ConfigureEmission { system: String, emission: Emission },
    SpawnBody {
        body: BodyId,
        prefab: String,
        position: Vec3,
        rotation: Quat,
        velocity: Vec3,
    },
    LaunchBody {
        body: BodyId,
        position: Vec3,
        rotation: Quat,
        velocity: Vec3,
    },
    IgnoreCollision { body: BodyId, collider: ColliderId },
    DespawnAfter { body: BodyId, seconds: f32 },
}

/// World state the core reads back synchronously
#[derive(Default)]
struct Snapshot {
    camera_position: Vec3,
    anchors: HashMap<EffectAnchor, (Vec3, Quat)>,
}

/// Shared command sink handed (cloned) to every service implementation
#[derive(Resource, Clone)]
pub struct PresentationQueue {
    commands: Arc<Mutex<Vec<PresentationCommand>>>,
    snapshot: Arc<Mutex<Snapshot>>,
    clip_lengths: Arc<HashMap<String, f32>>,
    prefabs: Arc<HashSet<String>>,
    next_body: Arc<AtomicU64>,
}

/// A poisoned lock only means a panicking system; the data is still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PresentationQueue {
    pub fn new(
        clip_lengths: HashMap<String, f32>,
        prefabs: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            commands: Arc::default(),
            snapshot: Arc::default(),
            clip_lengths: Arc::new(clip_lengths),
            prefabs: Arc::new(prefabs.into_iter().collect()),
            next_body: Arc::new(AtomicU64::new(0)),
        }
    }

    fn push(&self, command: PresentationCommand) {
        lock(&self.commands).push(command);
    }

    pub fn drain(&self) -> Vec<PresentationCommand> {
        std::mem::take(&mut *lock(&self.commands))
    }

    pub fn set_camera_position(&self, position: Vec3) {
        lock(&self.snapshot).camera_position = position;
    }

    pub fn set_anchor(&self, anchor: EffectAnchor, position: Vec3, rotation: Quat) {
        lock(&self.snapshot).anchors.insert(anchor, (position, rotation));
    }

    pub fn clips(&self) -> Box<dyn AnimationClips> {
        Box::new(QueueClips(self.clone()))
    }

    pub fn audio(&self) -> Box<dyn AudioBackend> {
        Box::new(QueueAudio(self.clone()))
    }

    pub fn view(&self) -> Box<dyn ViewRig> {
        Box::new(QueueView(self.clone()))
    }

    pub fn effects(&self) -> Box<dyn EffectBackend> {
        Box::new(QueueEffects(self.clone()))
    }
}

struct QueueClips(PresentationQueue);

impl AnimationClips for QueueClips {
    fn play(&mut self, clip: &str) {
        self.0.push(PresentationCommand::PlayClip {
            clip: clip.to_string(),
            blend: None,
        });
    }

    fn cross_fade(&mut self, clip: &str, blend_seconds: f32) {
        self.0.push(PresentationCommand::PlayClip {
            clip: clip.to_string(),
            blend: Some(blend_seconds),
        });
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        self.0.push(PresentationCommand::SetParameter {
            name: name.to_string(),
            value,
        });
    }

    fn set_playback_speed(&mut self, speed: f32) {
        self.0.push(PresentationCommand::SetPlaybackSpeed(speed));
    }

    fn clip_duration(&self, clip: &str) -> Option<f32> {
        self.0.clip_lengths.get(clip).copied()
    }
}

struct QueueEmitter {
    queue: PresentationQueue,
    channel: &'static str,
}

impl AudioEmitter for QueueEmitter {
    fn play(&mut self, clip: &AudioHandle, fade_in: f32) {
        self.queue.push(PresentationCommand::PlaySound {
            channel: self.channel,
            clip: clip.clone(),
            volume: 1.0,
            fade_in,
            interrupt: false,
        });
    }

    fn force_play(&mut self, clip: &AudioHandle, volume: f32) {
        self.queue.push(PresentationCommand::PlaySound {
            channel: self.channel,
            clip: clip.clone(),
            volume,
            fade_in: 0.0,
            interrupt: true,
        });
    }

    fn stop(&mut self) {
        self.queue.push(PresentationCommand::StopChannel(self.channel));
    }
}

struct QueueAudio(PresentationQueue);

impl AudioBackend for QueueAudio {
    fn register_source(&mut self, settings: &SourceSettings) -> Box<dyn AudioEmitter> {
        debug!("registered audio channel {} ({:?})", settings.name, settings.anchor);
        Box::new(QueueEmitter {
            queue: self.0.clone(),
            channel: settings.name,
        })
    }

    fn play_clip_at_point(&mut self, clip: &AudioHandle, position: Vec3, settings: PointSettings) {
        self.0.push(PresentationCommand::PlayAtPoint {
            clip: clip.clone(),
            position,
            settings,
        });
    }
}

struct QueueView(PresentationQueue);

impl ViewRig for QueueView {
    fn set_local_pose(&mut self, pose: Pose) {
        self.0.push(PresentationCommand::SetWeaponPose(pose));
    }

    fn set_field_of_view(&mut self, fov_degrees: f32) {
        self.0.push(PresentationCommand::SetFieldOfView(fov_degrees));
    }

    fn camera_position(&self) -> Vec3 {
        lock(&self.0.snapshot).camera_position
    }
}

struct QueueEffects(PresentationQueue);

impl EffectBackend for QueueEffects {
    fn anchor(&self, anchor: EffectAnchor) -> Option<(Vec3, Quat)> {
        lock(&self.0.snapshot).anchors.get(&anchor).copied()
    }

    fn play_particles(&mut self, system: &str) {
        self.0.push(PresentationCommand::PlayParticles(system.to_string()));
    }

    fn configure_emission(&mut self, system: &str, emission: Emission) {
        self.0.push(PresentationCommand::ConfigureEmission {
            system: system.to_string(),
            emission,
        });
    }

    fn spawn_body(
        &mut self,
        prefab: &str,
        position: Vec3,
        rotation: Quat,
        velocity: Vec3,
    ) -> Option<BodyId> {
        if !self.0.prefabs.contains(prefab) {
            return None;
        }
        let body = BodyId(self.0.next_body.fetch_add(1, Ordering::Relaxed));
        self.0.push(PresentationCommand::SpawnBody {
            body,
            prefab: prefab.to_string(),
            position,
            rotation,
            velocity,
        });
        Some(body)
    }

    fn launch_body(&mut self, body: BodyId, position: Vec3, rotation: Quat, velocity: Vec3) {
        self.0.push(PresentationCommand::LaunchBody {
            body,
            position,
            rotation,
            velocity,
        });
    }

    fn ignore_collision(&mut self, body: BodyId, collider: ColliderId) {
        self.0.push(PresentationCommand::IgnoreCollision { body, collider });
    }

    fn despawn_after(&mut self, body: BodyId, seconds: f32) {
        self.0.push(PresentationCommand::DespawnAfter { body, seconds });
    }
}

/// Replay everything the controllers queued this frame as messages
pub fn flush_presentation_queue(
    queue: Res<PresentationQueue>,
    mut writer: MessageWriter<PresentationCommand>,
) {
    for command in queue.drain() {
        writer.write(command);
    }
}
