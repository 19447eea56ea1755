//! Muzzle flash, shell ejection, tracers and dropped magazines

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EffectsConfig;
use crate::services::{BodyId, ColliderId, EffectAnchor, EffectBackend, Emission};
use crate::GRAVITY;

/// What the next dropped magazine should do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolSlot {
    /// Pool is still growing: instantiate a new body
    Spawn,
    /// Pool is full: move this body back to the drop origin
    Recycle(BodyId),
    /// Capacity 0
    Disabled,
}

/// Fixed-size ring of magazine bodies, recycled oldest-first once full
#[derive(Clone, Debug, Default)]
pub struct MagazinePool {
    capacity: usize,
    bodies: Vec<BodyId>,
    next: usize,
}

impl MagazinePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            bodies: Vec::with_capacity(capacity),
            next: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn live(&self) -> &[BodyId] {
        &self.bodies
    }

    pub fn next_slot(&mut self) -> PoolSlot {
        if self.capacity == 0 {
            return PoolSlot::Disabled;
        }
        if self.bodies.len() < self.capacity {
            return PoolSlot::Spawn;
        }
        let index = self.next % self.capacity;
        self.next += 1;
        PoolSlot::Recycle(self.bodies[index])
    }

    /// Register a freshly spawned body; ignored once the pool is full
    pub fn push(&mut self, body: BodyId) {
        if self.bodies.len() < self.capacity {
            self.bodies.push(body);
        }
    }
}

pub struct GunEffects {
    config: EffectsConfig,
    pool: MagazinePool,
    rng: StdRng,
    backend: Option<Box<dyn EffectBackend>>,
}

impl GunEffects {
    pub fn new(config: EffectsConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: EffectsConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut config: EffectsConfig, rng: StdRng) -> Self {
        config.sanitize();
        let capacity = config.magazine.as_ref().map_or(0, |magazine| magazine.max_prefabs);
        Self {
            config,
            pool: MagazinePool::new(capacity),
            rng,
            backend: None,
        }
    }

    pub fn init(&mut self, backend: Box<dyn EffectBackend>) {
        self.backend = Some(backend);
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }

    pub fn pool(&self) -> &MagazinePool {
        &self.pool
    }

    /// Swap the muzzle flash when a muzzle attachment changes
    pub fn update_muzzle_particle(&mut self, particle: impl Into<String>) {
        self.config.muzzle_flash = Some(particle.into());
    }

    pub fn tracer_speed(&self) -> f32 {
        self.config.tracer.as_ref().map_or(0.0, |tracer| tracer.speed)
    }

    pub fn tracer_duration(&self) -> f32 {
        self.config.tracer.as_ref().map_or(0.0, |tracer| tracer.duration)
    }

    /// Seconds into the reload at which the magazine falls, `None` when it stays in hand
    pub fn drop_delay(&self, round_in_chamber: bool) -> Option<f32> {
        let magazine = self.config.magazine.as_ref()?;
        match round_in_chamber {
            true if magazine.tactical_drop => Some(magazine.tactical_delay),
            false if magazine.full_drop => Some(magazine.full_delay),
            _ => None,
        }
    }

    /// Muzzle flash and shell ejection for one shot
    pub fn play(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        if let Some(flash) = self.config.muzzle_flash.as_deref().filter(|name| !name.is_empty()) {
            backend.play_particles(flash);
        }
        if let Some(shell) = self.config.shell.as_ref().filter(|shell| !shell.particle.is_empty()) {
            let range = shell.speed_range;
            backend.configure_emission(
                &shell.particle,
                Emission {
                    start_speed: self.rng.gen_range(range.x..=range.y),
                    start_delay: shell.start_delay,
                },
            );
            backend.play_particles(&shell.particle);
        }
    }

    /// Drop the magazine at the weapon's drop origin, ignoring collisions with `character`
    pub fn drop_magazine(&mut self, character: ColliderId) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let Some(magazine) = self
            .config
            .magazine
            .as_ref()
            .filter(|magazine| !magazine.prefab.is_empty())
        else {
            return;
        };
        let Some((position, rotation)) = backend.anchor(EffectAnchor::MagazineDrop) else {
            return;
        };

        match self.pool.next_slot() {
            PoolSlot::Disabled => {}
            PoolSlot::Recycle(body) => backend.launch_body(body, position, rotation, GRAVITY),
            PoolSlot::Spawn => {
                let Some(body) =
                    backend.spawn_body(&magazine.prefab, position, rotation, GRAVITY)
                else {
                    warn!("magazine prefab {:?} could not be spawned", magazine.prefab);
                    return;
                };
                backend.ignore_collision(body, character);
                self.pool.push(body);
            }
        }
    }

    /// Fire-and-forget tracer from the tracer origin along `direction`
    pub fn create_tracer(&mut self, rotation: Quat, direction: Vec3, duration: f32) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let Some(tracer) = self.config.tracer.as_ref().filter(|tracer| !tracer.prefab.is_empty())
        else {
            return;
        };
        let Some((origin, _)) = backend.anchor(EffectAnchor::TracerOrigin) else {
            return;
        };
        let velocity = direction * tracer.speed;
        if let Some(body) = backend.spawn_body(&tracer.prefab, origin, rotation, velocity) {
            backend.despawn_after(body, duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MagazineDrop, ShellEjection, TracerConfig};
    use crate::testing::{Call, CallLog, FakeEffects};

    const DROP: Vec3 = Vec3::new(0.3, -0.2, 0.5);
    const MUZZLE: Vec3 = Vec3::new(0.0, 0.0, -1.0);
    const CHARACTER: ColliderId = ColliderId(99);

    fn rifle_effects(max_prefabs: usize) -> EffectsConfig {
        EffectsConfig {
            muzzle_flash: Some("Muzzle".to_string()),
            shell: Some(ShellEjection {
                particle: "Shell".to_string(),
                speed_range: Vec2::new(1.0, 3.0),
                start_delay: 0.05,
            }),
            tracer: Some(TracerConfig {
                prefab: "Tracer".to_string(),
                ..Default::default()
            }),
            magazine: Some(MagazineDrop {
                prefab: "Magazine".to_string(),
                tactical_delay: 0.4,
                full_drop: false,
                max_prefabs,
                ..Default::default()
            }),
        }
    }

    fn bound(config: EffectsConfig, log: &CallLog) -> GunEffects {
        let mut effects = GunEffects::with_seed(config, 4);
        effects.init(Box::new(
            FakeEffects::new(log)
                .with_anchor(EffectAnchor::MagazineDrop, DROP)
                .with_anchor(EffectAnchor::TracerOrigin, MUZZLE),
        ));
        effects
    }

    #[test]
    fn test_pool_recycles_oldest_once_full() {
        let log = CallLog::default();
        let mut effects = bound(rifle_effects(2), &log);

        for _ in 0..3 {
            effects.drop_magazine(CHARACTER);
        }
        assert_eq!(effects.pool().live(), &[BodyId(0), BodyId(1)]);
        assert_eq!(
            log.calls(),
            vec![
                Call::Spawn {
                    prefab: "Magazine".to_string(),
                    body: BodyId(0),
                    position: DROP,
                    velocity: GRAVITY,
                },
                Call::IgnoreCollision(BodyId(0), CHARACTER),
                Call::Spawn {
                    prefab: "Magazine".to_string(),
                    body: BodyId(1),
                    position: DROP,
                    velocity: GRAVITY,
                },
                Call::IgnoreCollision(BodyId(1), CHARACTER),
                Call::Launch {
                    body: BodyId(0),
                    position: DROP,
                    velocity: GRAVITY,
                },
            ]
        );
    }

    #[test]
    fn test_pool_round_robin() {
        let mut pool = MagazinePool::new(3);
        for id in 0..3 {
            assert_eq!(pool.next_slot(), PoolSlot::Spawn);
            pool.push(BodyId(id));
        }
        let recycled: Vec<_> = (0..4).map(|_| pool.next_slot()).collect();
        assert_eq!(
            recycled,
            vec![
                PoolSlot::Recycle(BodyId(0)),
                PoolSlot::Recycle(BodyId(1)),
                PoolSlot::Recycle(BodyId(2)),
                PoolSlot::Recycle(BodyId(0)),
            ]
        );
        pool.push(BodyId(7));
        assert_eq!(pool.live().len(), 3);
    }

    #[test]
    fn test_zero_capacity_drops_nothing() {
        let log = CallLog::default();
        let mut effects = bound(rifle_effects(0), &log);
        effects.drop_magazine(CHARACTER);
        assert!(log.is_empty());
        assert!(effects.pool().live().is_empty());
    }

    #[test]
    fn test_play_emits_flash_and_shell() {
        let log = CallLog::default();
        let mut effects = bound(rifle_effects(2), &log);

        effects.play();
        let calls = log.calls();
        assert_eq!(calls[0], Call::Particles("Muzzle".to_string()));
        match &calls[1] {
            Call::ConfigureEmission(system, emission) => {
                assert_eq!(system, "Shell");
                assert!((1.0..=3.0).contains(&emission.start_speed));
                assert_eq!(emission.start_delay, 0.05);
            }
            other => panic!("unexpected call {other:?}"),
        }
        assert_eq!(calls[2], Call::Particles("Shell".to_string()));
    }

    #[test]
    fn test_play_with_non_finite_speed_range_uses_defaults() {
        let log = CallLog::default();
        let mut config = rifle_effects(2);
        if let Some(shell) = config.shell.as_mut() {
            shell.speed_range = Vec2::new(f32::NAN, f32::INFINITY);
        }
        let mut effects = bound(config, &log);

        effects.play();
        match &log.calls()[1] {
            Call::ConfigureEmission(_, emission) => {
                assert!((1.0..=3.0).contains(&emission.start_speed));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_tracer_flies_from_origin() {
        let log = CallLog::default();
        let mut effects = bound(rifle_effects(2), &log);

        effects.create_tracer(Quat::IDENTITY, Vec3::NEG_Z, 0.5);
        assert_eq!(
            log.calls(),
            vec![
                Call::Spawn {
                    prefab: "Tracer".to_string(),
                    body: BodyId(0),
                    position: MUZZLE,
                    velocity: Vec3::new(0.0, 0.0, -450.0),
                },
                Call::DespawnAfter(BodyId(0), 0.5),
            ]
        );
        assert_eq!(effects.tracer_speed(), 450.0);
        assert_eq!(effects.tracer_duration(), 1.0);
    }

    #[test]
    fn test_missing_anchor_or_backend_degrades_silently() {
        let log = CallLog::default();
        let mut effects = GunEffects::with_seed(rifle_effects(2), 4);
        effects.play();
        effects.drop_magazine(CHARACTER);
        assert!(!effects.is_initialized());

        effects.init(Box::new(FakeEffects::new(&log)));
        effects.drop_magazine(CHARACTER);
        effects.create_tracer(Quat::IDENTITY, Vec3::X, 1.0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_drop_delay_per_reload_kind() {
        let effects = GunEffects::new(rifle_effects(2));
        assert_eq!(effects.drop_delay(true), Some(0.4));
        assert_eq!(effects.drop_delay(false), None);
        assert_eq!(GunEffects::new(EffectsConfig::default()).drop_delay(true), None);
    }

    #[test]
    fn test_update_muzzle_particle() {
        let log = CallLog::default();
        let mut effects = bound(EffectsConfig::default(), &log);
        effects.play();
        assert!(log.is_empty());

        effects.update_muzzle_particle("Suppressed Muzzle");
        effects.play();
        assert_eq!(log.calls(), vec![Call::Particles("Suppressed Muzzle".to_string())]);
    }
}
