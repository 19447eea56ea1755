//! First-person view model: the equipped weapon, its controllers and the timed
//! follow-ups (magazine drop, melee hit, refills) that trail each action.

use bevy::prelude::*;
use shared::{
    ArmsAnimator, ColliderId, GunAnimator, GunBindings, GunEffects, Locomotion, Pose, SwingInput,
    WeaponAnimator, WeaponSwing,
};

use crate::input::InputState;
use crate::presentation::PresentationQueue;
use crate::profiles::Armory;

pub const MAGAZINE_CAPACITY: u32 = 30;

/// Collider of the local character; dropped magazines never hit it
pub const PLAYER_COLLIDER: ColliderId = ColliderId(0);

/// Seconds between two rifle shots
const FIRE_INTERVAL: f32 = 0.1;
/// Seconds between two punches
const PUNCH_INTERVAL: f32 = 0.35;
/// Time from the start of a punch until the fist connects
const PUNCH_CONTACT: f32 = 0.15;
/// Distance in front of the camera where melee hits land
const MELEE_REACH: f32 = 1.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Rifle,
    Fists,
}

impl Slot {
    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Slot::Rifle),
            1 => Some(Slot::Fists),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FollowUp {
    DropMagazine,
    MeleeHit,
    InteractSignal,
    Refill,
    Equip(Slot),
}

#[derive(Clone, Copy, Debug)]
struct Scheduled {
    remaining: f32,
    follow_up: FollowUp,
}

#[derive(Resource)]
pub struct ViewModel {
    rifle: GunAnimator,
    effects: GunEffects,
    fists: ArmsAnimator,
    rifle_swing: WeaponSwing,
    fists_swing: WeaponSwing,
    active: Slot,
    holstered: bool,
    rounds: u32,
    /// Seconds until the current action lets go of the weapon
    busy: f32,
    scheduled: Vec<Scheduled>,
    camera: (Vec3, Quat),
    interactions: u32,
}

impl ViewModel {
    /// Bind every controller to `queue`, with the rifle at rest at `hip`
    pub fn new(armory: &Armory, queue: &PresentationQueue, hip: Pose, default_fov: f32) -> Self {
        let mut rifle = GunAnimator::new(armory.rifle.gun.clone());
        rifle.init(
            GunBindings {
                clips: Some(queue.clips()),
                audio: queue.audio(),
                view: queue.view(),
            },
            hip,
            default_fov,
        );
        let mut effects = GunEffects::new(armory.rifle.effects.clone());
        effects.init(queue.effects());
        let mut fists = ArmsAnimator::new(armory.fists.arms.clone());
        fists.init(Some(queue.clips()), queue.audio());

        Self {
            rifle,
            effects,
            fists,
            rifle_swing: WeaponSwing::new(armory.rifle.swing.clone()),
            fists_swing: WeaponSwing::new(armory.fists.swing.clone()),
            active: Slot::Rifle,
            holstered: true,
            rounds: MAGAZINE_CAPACITY,
            busy: 0.0,
            scheduled: Vec::new(),
            camera: (Vec3::ZERO, Quat::IDENTITY),
            interactions: 0,
        }
    }

    pub fn active(&self) -> Slot {
        self.active
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn is_holstered(&self) -> bool {
        self.holstered
    }

    pub fn is_aiming(&self) -> bool {
        self.active == Slot::Rifle && self.rifle.is_aiming()
    }

    pub fn interactions(&self) -> u32 {
        self.interactions
    }

    pub fn name<'a>(&self, armory: &'a Armory) -> &'a str {
        match self.active {
            Slot::Rifle => &armory.rifle.name,
            Slot::Fists => &armory.fists.name,
        }
    }

    fn animator(&mut self) -> &mut dyn WeaponAnimator {
        match self.active {
            Slot::Rifle => &mut self.rifle,
            Slot::Fists => &mut self.fists,
        }
    }

    fn schedule(&mut self, delay: f32, follow_up: FollowUp) {
        self.scheduled.push(Scheduled {
            remaining: delay,
            follow_up,
        });
    }

    /// Bring the active weapon up
    pub fn draw(&mut self) {
        self.holstered = false;
        self.animator().draw();
        self.busy = self.animator().draw_duration();
    }

    fn hide(&mut self) {
        self.animator().hide();
        self.busy = self.animator().hide_duration();
    }

    /// Advance one frame and return the sway pose of the pivot the weapon hangs from
    pub fn update(&mut self, input: &InputState, camera: (Vec3, Quat), dt: f32) -> Pose {
        self.camera = camera;
        self.busy = (self.busy - dt).max(0.0);
        self.run_follow_ups(dt);

        if self.busy <= 0.0 {
            self.handle_triggers(input);
        }
        self.blend(input, dt);

        let swing_input = SwingInput {
            mouse_delta: input.mouse_delta,
            mouse_sensitivity: 1.0,
            strafe: input.strafe(),
            velocity: input.velocity(),
            sliding: input.sliding,
            aiming: self.is_aiming(),
            tremor: false,
        };
        match self.active {
            Slot::Rifle => self.rifle_swing.swing(&swing_input, dt),
            Slot::Fists => self.fists_swing.swing(&swing_input, dt),
        }
    }

    fn run_follow_ups(&mut self, dt: f32) {
        let mut due = Vec::new();
        self.scheduled.retain_mut(|scheduled| {
            scheduled.remaining -= dt;
            if scheduled.remaining <= 0.0 {
                due.push(scheduled.follow_up);
                false
            } else {
                true
            }
        });

        for follow_up in due {
            match follow_up {
                FollowUp::DropMagazine => self.effects.drop_magazine(PLAYER_COLLIDER),
                FollowUp::MeleeHit => {
                    let (position, rotation) = self.camera;
                    let target = position + rotation * Vec3::NEG_Z * MELEE_REACH;
                    self.animator().hit(target);
                }
                FollowUp::InteractSignal => {
                    self.interactions += 1;
                    info!("Interaction signal sent ({} total)", self.interactions);
                }
                FollowUp::Refill => self.rounds = MAGAZINE_CAPACITY,
                FollowUp::Equip(slot) => {
                    self.active = slot;
                    self.draw();
                }
            }
        }
    }

    fn handle_triggers(&mut self, input: &InputState) {
        let triggers = input.triggers;

        if let Some(slot) = triggers.equip.and_then(Slot::from_index) {
            if slot != self.active {
                if self.holstered {
                    self.active = slot;
                    self.draw();
                } else {
                    self.hide();
                    let delay = self.busy;
                    self.schedule(delay, FollowUp::Equip(slot));
                }
                return;
            }
        }

        if triggers.toggle_holster {
            if self.holstered {
                self.draw();
            } else {
                self.hide();
                self.holstered = true;
            }
            return;
        }
        if self.holstered {
            return;
        }

        match self.active {
            Slot::Rifle => self.rifle_triggers(input),
            Slot::Fists => self.fists_triggers(input),
        }

        if triggers.interact {
            self.animator().interact();
            self.busy = self.animator().interact_duration();
            let delay = self.animator().interact_delay();
            self.schedule(delay, FollowUp::InteractSignal);
        }
        if triggers.vault {
            self.animator().vault();
        }
    }

    fn rifle_triggers(&mut self, input: &InputState) {
        let triggers = input.triggers;

        if triggers.fire {
            if self.rounds == 0 {
                self.rifle.out_of_ammo();
            } else {
                self.rifle.shot(self.rounds == 1);
                self.effects.play();
                let (_, rotation) = self.camera;
                let duration = self.effects.tracer_duration();
                self.effects.create_tracer(rotation, rotation * Vec3::NEG_Z, duration);
                self.rounds -= 1;
                self.busy = FIRE_INTERVAL;
            }
        } else if triggers.reload && self.rounds < MAGAZINE_CAPACITY {
            let round_in_chamber = self.rounds > 0;
            self.rifle.reload(round_in_chamber);
            self.busy = if round_in_chamber {
                self.rifle.reload_duration()
            } else {
                self.rifle.full_reload_duration()
            };
            if let Some(delay) = self.effects.drop_delay(round_in_chamber) {
                self.schedule(delay, FollowUp::DropMagazine);
            }
            let refill = self.busy;
            self.schedule(refill, FollowUp::Refill);
        } else if triggers.melee && self.rifle.can_melee_attack() {
            self.rifle.melee();
            self.busy = self.rifle.melee_duration();
            let delay = self.rifle.melee_delay();
            self.schedule(delay, FollowUp::MeleeHit);
        } else if triggers.switch_mode {
            self.rifle.switch_mode();
            self.busy = self.rifle.switch_mode_duration();
        }
    }

    fn fists_triggers(&mut self, input: &InputState) {
        let triggers = input.triggers;
        let punched = if triggers.fire {
            self.fists.right_attack();
            true
        } else if triggers.melee {
            self.fists.left_attack();
            true
        } else {
            false
        };
        if punched {
            self.busy = PUNCH_INTERVAL;
            self.schedule(PUNCH_CONTACT, FollowUp::MeleeHit);
        }
    }

    fn blend(&mut self, input: &InputState, dt: f32) {
        match self.active {
            Slot::Rifle => {
                if input.running || input.sliding {
                    self.rifle.sprint(input.running, input.sliding, dt);
                } else if input.aiming && !self.holstered {
                    self.rifle.aim(true, dt);
                } else {
                    self.rifle.sprint(false, false, dt);
                }
            }
            Slot::Fists => self.fists.set_locomotion(
                Locomotion {
                    running: input.running,
                    sliding: input.sliding,
                    target_force: input.velocity().length(),
                    running_state: input.running,
                },
                dt,
            ),
        }
    }
}

/// Marker for the entity the sway drives; the weapons hang below it
#[derive(Component)]
pub struct SwayPivot;

pub fn drive_view_model(
    time: Res<Time>,
    input_state: Res<InputState>,
    mut view_model: ResMut<ViewModel>,
    camera: Query<&GlobalTransform, With<Camera3d>>,
    mut pivot: Query<&mut Transform, With<SwayPivot>>,
) {
    let Ok(camera) = camera.single() else {
        return;
    };
    let camera = camera.compute_transform();
    let sway = view_model.update(
        &input_state,
        (camera.translation, camera.rotation),
        time.delta_secs(),
    );

    if let Ok(mut transform) = pivot.single_mut() {
        transform.translation = sway.position;
        transform.rotation = sway.rotation;
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::input::Triggers;
    use crate::presentation::PresentationCommand;
    use shared::BodyId;

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (ViewModel, PresentationQueue) {
        let armory = Armory::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join("assets"))
            .expect("bundled profiles should parse");
        let queue = PresentationQueue::new(
            armory.clip_lengths.clone(),
            ["Magazine".to_string(), "Tracer".to_string()],
        );
        queue.set_anchor(
            shared::EffectAnchor::MagazineDrop,
            Vec3::new(0.2, -0.3, -0.4),
            Quat::IDENTITY,
        );
        queue.set_anchor(
            shared::EffectAnchor::TracerOrigin,
            Vec3::new(0.2, -0.1, -0.9),
            Quat::IDENTITY,
        );
        let view_model = ViewModel::new(&armory, &queue, Pose::IDENTITY, 70.0);
        queue.drain();
        (view_model, queue)
    }

    fn press(triggers: Triggers) -> InputState {
        InputState {
            triggers,
            ..Default::default()
        }
    }

    /// Run idle frames until the current action is over
    fn settle(view_model: &mut ViewModel, seconds: f32) {
        let idle = InputState::default();
        let frames = (seconds / DT).ceil() as usize + 1;
        for _ in 0..frames {
            view_model.update(&idle, (Vec3::ZERO, Quat::IDENTITY), DT);
        }
    }

    fn drawn() -> (ViewModel, PresentationQueue) {
        let (mut view_model, queue) = setup();
        view_model.draw();
        settle(&mut view_model, 1.0);
        queue.drain();
        (view_model, queue)
    }

    fn played_clips(commands: &[PresentationCommand]) -> Vec<String> {
        commands
            .iter()
            .filter_map(|command| match command {
                PresentationCommand::PlayClip { clip, .. } => Some(clip.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_holstered_weapon_ignores_fire() {
        let (mut view_model, queue) = setup();
        let fire = press(Triggers {
            fire: true,
            ..Default::default()
        });
        view_model.update(&fire, (Vec3::ZERO, Quat::IDENTITY), DT);
        assert!(played_clips(&queue.drain()).is_empty());
        assert_eq!(view_model.rounds(), MAGAZINE_CAPACITY);
    }

    #[test]
    fn test_shot_spends_a_round_and_spawns_tracer() {
        let (mut view_model, queue) = drawn();
        let fire = press(Triggers {
            fire: true,
            ..Default::default()
        });
        view_model.update(&fire, (Vec3::ZERO, Quat::IDENTITY), DT);

        let commands = queue.drain();
        assert_eq!(played_clips(&commands), vec!["Fire".to_string()]);
        assert!(commands.iter().any(|command| matches!(
            command,
            PresentationCommand::SpawnBody { prefab, .. } if prefab == "Tracer"
        )));
        assert!(commands.iter().any(|command| matches!(
            command,
            PresentationCommand::PlayParticles(name) if name == "Muzzle Flash"
        )));
        assert_eq!(view_model.rounds(), MAGAZINE_CAPACITY - 1);
    }

    #[test]
    fn test_tactical_reload_drops_magazine_then_refills() {
        let (mut view_model, queue) = drawn();
        let fire = press(Triggers {
            fire: true,
            ..Default::default()
        });
        view_model.update(&fire, (Vec3::ZERO, Quat::IDENTITY), DT);
        settle(&mut view_model, 0.2);
        queue.drain();

        let reload = press(Triggers {
            reload: true,
            ..Default::default()
        });
        view_model.update(&reload, (Vec3::ZERO, Quat::IDENTITY), DT);
        assert_eq!(played_clips(&queue.drain()), vec!["Tactical Reload".to_string()]);

        settle(&mut view_model, 2.2);
        let commands = queue.drain();
        assert!(commands.iter().any(|command| matches!(
            command,
            PresentationCommand::SpawnBody { body: BodyId(_), prefab, .. } if prefab == "Magazine"
        )));
        assert!(commands.contains(&PresentationCommand::IgnoreCollision {
            body: BodyId(1),
            collider: PLAYER_COLLIDER,
        }));
        assert_eq!(view_model.rounds(), MAGAZINE_CAPACITY);
    }

    #[test]
    fn test_empty_magazine_clicks() {
        let (mut view_model, queue) = drawn();
        view_model.rounds = 0;
        let fire = press(Triggers {
            fire: true,
            ..Default::default()
        });
        view_model.update(&fire, (Vec3::ZERO, Quat::IDENTITY), DT);
        let commands = queue.drain();
        assert!(played_clips(&commands).is_empty());
        assert!(commands.iter().any(|command| matches!(
            command,
            PresentationCommand::PlaySound { clip, .. } if clip.path() == "audio/rifle/dry_fire.ogg"
        )));
    }

    #[test]
    fn test_switch_hides_then_draws_fists() {
        let (mut view_model, queue) = drawn();
        let equip = press(Triggers {
            equip: Some(1),
            ..Default::default()
        });
        view_model.update(&equip, (Vec3::ZERO, Quat::IDENTITY), DT);
        assert_eq!(view_model.active(), Slot::Rifle);
        assert_eq!(played_clips(&queue.drain()), vec!["Hide".to_string()]);

        settle(&mut view_model, 0.6);
        assert_eq!(view_model.active(), Slot::Fists);
        assert!(played_clips(&queue.drain()).contains(&"Arms Draw".to_string()));
    }

    #[test]
    fn test_melee_hit_lands_in_front_of_camera() {
        let (mut view_model, queue) = drawn();
        let melee = press(Triggers {
            melee: true,
            ..Default::default()
        });
        view_model.update(&melee, (Vec3::ZERO, Quat::IDENTITY), DT);
        assert_eq!(played_clips(&queue.drain()), vec!["Melee".to_string()]);

        settle(&mut view_model, 0.3);
        let hit = queue.drain().into_iter().find_map(|command| match command {
            PresentationCommand::PlayAtPoint { position, .. } => Some(position),
            _ => None,
        });
        assert_eq!(hit, Some(Vec3::new(0.0, 0.0, -MELEE_REACH)));
    }

    #[test]
    fn test_interaction_signal_is_delayed() {
        let (mut view_model, _queue) = drawn();
        let interact = press(Triggers {
            interact: true,
            ..Default::default()
        });
        view_model.update(&interact, (Vec3::ZERO, Quat::IDENTITY), DT);
        assert_eq!(view_model.interactions(), 0);
        settle(&mut view_model, 0.35);
        assert_eq!(view_model.interactions(), 1);
    }
}
