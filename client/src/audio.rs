//! Audio channels and one-shot positional sounds
//!
//! Every registered channel plays at most one sound at a time: `play` leaves a busy
//! channel alone, `force_play` cuts it.

use std::collections::HashSet;

use bevy::audio::Volume;
use bevy::prelude::*;
use shared::PointSettings;

use crate::presentation::PresentationCommand;

/// Sound playing on a named channel
#[derive(Component)]
pub struct AudioChannel(pub &'static str);

/// Ramps a freshly started sound up to its target volume
#[derive(Component)]
pub struct FadeIn {
    pub target: f32,
    pub duration: f32,
    pub elapsed: f32,
}

impl FadeIn {
    pub fn volume(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.target;
        }
        self.target * (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

pub fn apply_audio_commands(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut messages: MessageReader<PresentationCommand>,
    playing: Query<(Entity, &AudioChannel)>,
) {
    // Channels started by this system run; their entities are not queryable yet
    let mut started: HashSet<&'static str> = HashSet::new();
    let mut stopped: HashSet<Entity> = HashSet::new();

    for command in messages.read() {
        match command {
            PresentationCommand::PlaySound {
                channel,
                clip,
                volume,
                fade_in,
                interrupt,
            } => {
                let busy = started.contains(channel)
                    || playing.iter().any(|(entity, playing)| {
                        playing.0 == *channel && !stopped.contains(&entity)
                    });
                if busy && !interrupt {
                    continue;
                }
                if *interrupt {
                    for (entity, playing) in &playing {
                        if playing.0 == *channel && stopped.insert(entity) {
                            commands.entity(entity).despawn();
                        }
                    }
                }

                let source: Handle<AudioSource> = asset_server.load(clip.path().to_string());
                let mut sound = commands.spawn((AudioChannel(*channel), AudioPlayer::new(source)));
                if *fade_in > 0.0 {
                    sound.insert((
                        PlaybackSettings::DESPAWN.with_volume(Volume::Linear(0.0)),
                        FadeIn {
                            target: *volume,
                            duration: *fade_in,
                            elapsed: 0.0,
                        },
                    ));
                } else {
                    sound.insert(PlaybackSettings::DESPAWN.with_volume(Volume::Linear(*volume)));
                }
                started.insert(*channel);
            }
            PresentationCommand::StopChannel(channel) => {
                for (entity, playing) in &playing {
                    if playing.0 == *channel && stopped.insert(entity) {
                        commands.entity(entity).despawn();
                    }
                }
            }
            PresentationCommand::PlayAtPoint {
                clip,
                position,
                settings,
            } => {
                let source: Handle<AudioSource> = asset_server.load(clip.path().to_string());
                commands.spawn((
                    AudioPlayer::new(source),
                    point_playback(settings),
                    Transform::from_translation(*position),
                ));
            }
            _ => {}
        }
    }
}

/// Fire-and-forget sound; spatialized whenever the blend asks for any 3D
fn point_playback(settings: &PointSettings) -> PlaybackSettings {
    PlaybackSettings::DESPAWN
        .with_volume(Volume::Linear(settings.volume))
        .with_spatial(settings.spatial_blend > 0.0)
}

pub fn update_fade_ins(
    mut commands: Commands,
    time: Res<Time>,
    mut fading: Query<(Entity, &mut FadeIn, &mut AudioSink)>,
) {
    for (entity, mut fade, mut sink) in fading.iter_mut() {
        fade.elapsed += time.delta_secs();
        sink.set_volume(Volume::Linear(fade.volume()));
        if fade.elapsed >= fade.duration {
            commands.entity(entity).remove::<FadeIn>();
        }
    }
}

/// Channel playback and fades, fed by the presentation queue
pub struct PresentationAudioPlugin;

impl Plugin for PresentationAudioPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                apply_audio_commands.after(crate::presentation::flush_presentation_queue),
                update_fade_ins,
            ),
        );
    }
}
