//! Boss AI: a teleporting caster.
//!
//! The boss sits dormant until something starts its cycle (usually a
//! [`BossTrigger`]). The cycle repeats forever:
//!
//! teleport, wait, cast, wait, cast, wait
//!
//! A teleport is itself a short sequence: the boss vanishes, relocates to a
//! teleport point other than the last one used, and reappears. After
//! reappearing it cannot hurt the player by touch for a grace period, which
//! keeps running while the rest of the cycle continues.
//!
//! Every timed step is an explicit [`BossPhase`] with its remaining time,
//! advanced from the frame tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use runefall_common::EntityId;

use crate::actor::Actor;
use crate::events::{EventBus, GameEvent};
use crate::physics::{BodyControl, AABB};
use crate::player::TargetSnapshot;
use crate::projectile::{Projectile, ProjectileKind};

/// Upper bound on phase transitions processed in one tick.
const MAX_TRANSITIONS_PER_TICK: usize = 16;

/// Boss tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    /// Seconds between the teleport cue and vanishing
    pub vanish_delay: f32,
    /// Seconds spent hidden after relocating
    pub hidden_duration: f32,
    /// Seconds between the arrival cue and reappearing
    pub appear_delay: f32,
    /// Wait after a teleport
    pub post_teleport_wait: f32,
    /// Wait after each cast
    pub post_attack_wait: f32,
    /// Seconds between starting a cast and releasing the projectile
    pub cast_delay: f32,
    /// Seconds after reappearing without contact damage
    pub grace_period: f32,
    /// Projectile speed
    pub projectile_speed: f32,
    /// Projectile lifetime
    pub projectile_lifetime: f32,
    /// Projectile damage
    pub projectile_damage: f32,
    /// Projectile collision radius
    pub projectile_radius: f32,
    /// Projectile spawn point relative to the boss center
    pub projectile_spawn_offset: Vec2,
    /// Damage dealt on contact outside the grace period
    pub contact_damage: f32,
    /// Maximum health
    pub max_health: f32,
    /// Half width and half height of the body
    pub half_extents: Vec2,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            vanish_delay: 0.5,
            hidden_duration: 0.5,
            appear_delay: 0.5,
            post_teleport_wait: 1.0,
            post_attack_wait: 1.5,
            cast_delay: 0.5,
            grace_period: 3.0,
            projectile_speed: 10.0,
            projectile_lifetime: 5.0,
            projectile_damage: 1.0,
            projectile_radius: 0.25,
            projectile_spawn_offset: Vec2::new(0.0, 0.5),
            contact_damage: 1.0,
            max_health: 20.0,
            half_extents: Vec2::new(0.6, 1.0),
        }
    }
}

/// Boss phases. Timed phases carry their remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BossPhase {
    /// Cycle not started
    Dormant,
    /// Teleport cue shown, about to vanish
    Vanishing {
        /// Seconds left
        remaining: f32,
    },
    /// Relocated and invisible
    Hidden {
        /// Seconds left
        remaining: f32,
    },
    /// Arrival cue shown, about to reappear
    Appearing {
        /// Seconds left
        remaining: f32,
    },
    /// Idle between actions
    Waiting {
        /// Seconds left
        remaining: f32,
    },
    /// Winding up a cast
    Casting {
        /// Seconds left
        remaining: f32,
    },
    /// Stopped for good
    Dead,
}

/// One step of the repeating cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CycleStep {
    /// Vanish, relocate, reappear
    Teleport,
    /// Do nothing for a while
    Wait(f32),
    /// Fire a projectile at the target
    Cast,
}

/// Boss decision state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossAI {
    config: BossConfig,
    phase: BossPhase,
    cycle_index: usize,
    teleport_points: Vec<Vec2>,
    last_teleport_index: Option<usize>,
    grace_remaining: f32,
    immune_to_contact_damage: bool,
    hidden: bool,
}

impl BossAI {
    /// Creates a dormant boss with the given teleport points.
    #[must_use]
    pub fn new(config: BossConfig, teleport_points: Vec<Vec2>) -> Self {
        Self {
            config,
            phase: BossPhase::Dormant,
            cycle_index: 0,
            teleport_points,
            last_teleport_index: None,
            grace_remaining: 0.0,
            immune_to_contact_damage: false,
            hidden: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> BossPhase {
        self.phase
    }

    /// Tuning.
    #[must_use]
    pub fn config(&self) -> &BossConfig {
        &self.config
    }

    /// Index of the last teleport point used.
    #[must_use]
    pub fn last_teleport_index(&self) -> Option<usize> {
        self.last_teleport_index
    }

    /// Whether contact damage is suppressed by the grace period.
    #[must_use]
    pub fn is_immune_to_contact_damage(&self) -> bool {
        self.immune_to_contact_damage
    }

    /// Whether the boss is currently invisible.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Teleport destinations.
    #[must_use]
    pub fn teleport_points(&self) -> &[Vec2] {
        &self.teleport_points
    }

    /// The cycle step at `index`, wrapping.
    #[must_use]
    pub fn cycle_step(&self, index: usize) -> CycleStep {
        match index % 6 {
            0 => CycleStep::Teleport,
            1 => CycleStep::Wait(self.config.post_teleport_wait),
            2 | 4 => CycleStep::Cast,
            _ => CycleStep::Wait(self.config.post_attack_wait),
        }
    }

    /// (Re)starts the cycle from the teleport step.
    ///
    /// Immunity is cleared before anything else so a restart can never
    /// leave the boss permanently immune. Dead bosses ignore this.
    pub fn start_cycle(&mut self, actor: &mut Actor, events: &EventBus) {
        if self.phase == BossPhase::Dead || !actor.is_alive() {
            return;
        }

        self.set_immune(actor, false);
        self.grace_remaining = 0.0;
        self.hidden = false;
        actor.body.set_collider_enabled(true);

        info!("{} starting attack cycle", actor.id);
        events.publish(GameEvent::BossCycleStarted { actor: actor.id });
        self.cycle_index = 0;
        self.begin_step(actor, events);
    }

    fn set_immune(&mut self, actor: &mut Actor, immune: bool) {
        self.immune_to_contact_damage = immune;
        actor.set_contact_damage_enabled(!immune && actor.contact_damage() > 0.0);
    }

    fn begin_step(&mut self, actor: &mut Actor, events: &EventBus) {
        self.phase = match self.cycle_step(self.cycle_index) {
            CycleStep::Teleport => {
                actor.body.set_collider_enabled(false);
                events.publish(GameEvent::TeleportCue {
                    actor: actor.id,
                    position: actor.position(),
                });
                BossPhase::Vanishing {
                    remaining: self.config.vanish_delay,
                }
            },
            CycleStep::Wait(remaining) => BossPhase::Waiting { remaining },
            CycleStep::Cast => {
                events.publish(GameEvent::CastStarted { actor: actor.id });
                BossPhase::Casting {
                    remaining: self.config.cast_delay,
                }
            },
        };
    }

    fn next_step(&mut self, actor: &mut Actor, events: &EventBus) {
        self.cycle_index = (self.cycle_index + 1) % 6;
        self.begin_step(actor, events);
    }

    /// Picks the next teleport point: never the last one when there is a
    /// choice.
    fn choose_teleport_index(&self, rng: &mut fastrand::Rng) -> Option<usize> {
        let count = self.teleport_points.len();
        match count {
            0 => None,
            1 => Some(0),
            _ => match self.last_teleport_index {
                Some(last) if last < count => {
                    let pick = rng.usize(0..count - 1);
                    Some(if pick >= last { pick + 1 } else { pick })
                },
                _ => Some(rng.usize(0..count)),
            },
        }
    }

    /// Advances grace and phase timers.
    ///
    /// Projectiles released by casts are pushed to `spawned`.
    pub fn frame_tick(
        &mut self,
        actor: &mut Actor,
        target: Option<&TargetSnapshot>,
        dt: f32,
        rng: &mut fastrand::Rng,
        spawned: &mut Vec<Projectile>,
        events: &EventBus,
    ) {
        if matches!(self.phase, BossPhase::Dormant | BossPhase::Dead) {
            return;
        }

        if self.grace_remaining > 0.0 {
            self.grace_remaining -= dt;
            if self.grace_remaining <= 0.0 {
                self.grace_remaining = 0.0;
                self.set_immune(actor, false);
                debug!("{} grace period over", actor.id);
                events.publish(GameEvent::GraceEnded { actor: actor.id });
            }
        }

        let mut budget = dt;
        for _ in 0..MAX_TRANSITIONS_PER_TICK {
            let remaining = match &mut self.phase {
                BossPhase::Vanishing { remaining }
                | BossPhase::Hidden { remaining }
                | BossPhase::Appearing { remaining }
                | BossPhase::Waiting { remaining }
                | BossPhase::Casting { remaining } => remaining,
                BossPhase::Dormant | BossPhase::Dead => return,
            };
            if *remaining > budget {
                *remaining -= budget;
                return;
            }
            budget -= *remaining;
            *remaining = 0.0;
            self.complete_phase(actor, target, rng, spawned, events);
        }
    }

    fn complete_phase(
        &mut self,
        actor: &mut Actor,
        target: Option<&TargetSnapshot>,
        rng: &mut fastrand::Rng,
        spawned: &mut Vec<Projectile>,
        events: &EventBus,
    ) {
        match self.phase {
            BossPhase::Vanishing { .. } => {
                self.hidden = true;
                match self.choose_teleport_index(rng) {
                    Some(index) => {
                        self.last_teleport_index = Some(index);
                        actor.body.teleport(self.teleport_points[index]);
                        debug!("{} teleported to point {}", actor.id, index);
                    },
                    None => warn!("{} has no teleport points, reappearing in place", actor.id),
                }
                actor.body.set_velocity(Vec2::ZERO);
                events.publish(GameEvent::BossHidden {
                    actor: actor.id,
                    position: actor.position(),
                });
                self.phase = BossPhase::Hidden {
                    remaining: self.config.hidden_duration,
                };
            },
            BossPhase::Hidden { .. } => {
                events.publish(GameEvent::TeleportCue {
                    actor: actor.id,
                    position: actor.position(),
                });
                self.phase = BossPhase::Appearing {
                    remaining: self.config.appear_delay,
                };
            },
            BossPhase::Appearing { .. } => {
                self.hidden = false;
                actor.body.set_collider_enabled(true);
                self.set_immune(actor, true);
                self.grace_remaining = self.config.grace_period;
                events.publish(GameEvent::BossRevealed {
                    actor: actor.id,
                    position: actor.position(),
                });
                self.next_step(actor, events);
            },
            BossPhase::Waiting { .. } => self.next_step(actor, events),
            BossPhase::Casting { .. } => {
                if let Some(projectile) = self.release_projectile(actor, target) {
                    spawned.push(projectile);
                }
                self.next_step(actor, events);
            },
            BossPhase::Dormant | BossPhase::Dead => {},
        }
    }

    fn release_projectile(
        &self,
        actor: &mut Actor,
        target: Option<&TargetSnapshot>,
    ) -> Option<Projectile> {
        let target = target.filter(|t| t.active)?;
        let origin = actor.position() + self.config.projectile_spawn_offset;
        let direction = (target.aim_point - origin).normalize_or_zero();
        if direction == Vec2::ZERO {
            return None;
        }
        actor.face(direction.x);
        Some(
            Projectile::new(
                actor.id,
                ProjectileKind::BossBolt,
                origin,
                direction * self.config.projectile_speed,
                self.config.projectile_damage,
                self.config.projectile_lifetime,
            )
            .with_radius(self.config.projectile_radius),
        )
    }

    /// Stops everything immediately.
    pub fn on_death(&mut self, actor: &mut Actor) {
        self.phase = BossPhase::Dead;
        self.grace_remaining = 0.0;
        actor.body.set_velocity(Vec2::ZERO);
        actor.body.set_dynamic(false);
    }
}

/// A volume that starts a boss cycle the first time the player enters it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossTrigger {
    /// Unique ID
    pub id: EntityId,
    /// Boss to start
    pub boss: EntityId,
    /// Trigger volume
    pub volume: AABB,
    fired: bool,
}

impl BossTrigger {
    /// Creates an armed trigger.
    #[must_use]
    pub fn new(boss: EntityId, volume: AABB) -> Self {
        Self {
            id: EntityId::new(),
            boss,
            volume,
            fired: false,
        }
    }

    /// Whether the trigger has been used.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Fires on the first overlap. Returns the boss to start.
    pub fn check(&mut self, bounds: &AABB) -> Option<EntityId> {
        if self.fired || !self.volume.overlaps(bounds) {
            return None;
        }
        self.fired = true;
        Some(self.boss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorKind, EnemyKind};
    use crate::collision_response::{CollisionResolver, HitOutcome, HitSource, IgnoreReason};
    use crate::physics::Body;
    use crate::player::{Player, PlayerConfig};

    const DT: f32 = 1.0 / 60.0;

    fn boss(points: Vec<Vec2>) -> (Actor, BossAI) {
        let config = BossConfig::default();
        let actor = Actor::new(
            ActorKind::Enemy(EnemyKind::Boss),
            "Boss",
            Body::new(Vec2::ZERO, config.half_extents).with_gravity_scale(0.0),
            config.max_health,
        )
        .with_contact_damage(config.contact_damage);
        (actor, BossAI::new(config, points))
    }

    fn run(
        actor: &mut Actor,
        ai: &mut BossAI,
        seconds: f32,
        target: Option<&TargetSnapshot>,
        rng: &mut fastrand::Rng,
        spawned: &mut Vec<Projectile>,
        bus: &EventBus,
    ) {
        let frames = (seconds / DT).round() as usize;
        for _ in 0..frames {
            ai.frame_tick(actor, target, DT, rng, spawned, bus);
        }
    }

    fn one_cycle_length(config: &BossConfig) -> f32 {
        config.vanish_delay
            + config.hidden_duration
            + config.appear_delay
            + config.post_teleport_wait
            + 2.0 * (config.cast_delay + config.post_attack_wait)
    }

    #[test]
    fn test_dormant_until_started() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(1);
        let mut spawned = Vec::new();
        let (mut actor, mut ai) = boss(vec![Vec2::new(5.0, 0.0)]);

        run(&mut actor, &mut ai, 5.0, None, &mut rng, &mut spawned, &bus);
        assert_eq!(ai.phase(), BossPhase::Dormant);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_teleport_sequence() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(1);
        let mut spawned = Vec::new();
        let (mut actor, mut ai) = boss(vec![Vec2::new(5.0, 2.0)]);

        ai.start_cycle(&mut actor, &bus);
        assert!(matches!(ai.phase(), BossPhase::Vanishing { .. }));
        assert!(!actor.body.collider_enabled());

        run(&mut actor, &mut ai, 0.6, None, &mut rng, &mut spawned, &bus);
        assert!(ai.is_hidden());
        assert_eq!(actor.position(), Vec2::new(5.0, 2.0));

        run(&mut actor, &mut ai, 1.0, None, &mut rng, &mut spawned, &bus);
        assert!(!ai.is_hidden());
        assert!(actor.body.collider_enabled());
        assert!(ai.is_immune_to_contact_damage());
        assert!(matches!(ai.phase(), BossPhase::Waiting { .. }));

        let names: Vec<_> = bus.drain().iter().map(GameEvent::name).collect();
        assert_eq!(
            names,
            vec![
                "boss_cycle_started",
                "teleport_cue",
                "boss_hidden",
                "teleport_cue",
                "boss_revealed"
            ]
        );
    }

    #[test]
    fn test_teleport_never_repeats_point() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(42);
        let mut spawned = Vec::new();
        let points = vec![
            Vec2::new(-5.0, 2.0),
            Vec2::new(0.0, 4.0),
            Vec2::new(5.0, 2.0),
        ];
        let (mut actor, mut ai) = boss(points);
        let cycle = one_cycle_length(ai.config());

        ai.start_cycle(&mut actor, &bus);
        let mut last = None;
        let mut teleports = 0;
        let mut visited = [0usize; 3];
        // one cycle per call keeps each cycle's teleport observable
        for _ in 0..1000 {
            ai.frame_tick(&mut actor, None, cycle, &mut rng, &mut spawned, &bus);
            let current = ai.last_teleport_index();
            assert_ne!(current, None);
            if let (Some(prev), Some(now)) = (last, current) {
                assert_ne!(prev, now, "teleported to the same point twice in a row");
            }
            if let Some(index) = current {
                visited[index] += 1;
            }
            last = current;
            teleports += 1;
            bus.drain();
        }
        assert_eq!(teleports, 1000);
        assert!(visited.iter().all(|&count| count > 0));
    }

    #[test]
    fn test_no_teleport_points_stays_in_place() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(3);
        let mut spawned = Vec::new();
        let (mut actor, mut ai) = boss(Vec::new());
        actor.body.teleport(Vec2::new(3.0, 3.0));

        ai.start_cycle(&mut actor, &bus);
        run(&mut actor, &mut ai, 2.0, None, &mut rng, &mut spawned, &bus);
        assert_eq!(actor.position(), Vec2::new(3.0, 3.0));
        assert!(!ai.is_hidden());
        assert_eq!(ai.last_teleport_index(), None);
    }

    #[test]
    fn test_cast_aims_at_head() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(5);
        let mut spawned = Vec::new();
        let (mut actor, mut ai) = boss(vec![Vec2::new(10.0, 0.0)]);
        let player = Player::new(Vec2::ZERO, &PlayerConfig::default());
        let target = player.snapshot();

        ai.start_cycle(&mut actor, &bus);
        // teleport + post-teleport wait + first cast
        run(&mut actor, &mut ai, 3.2, Some(&target), &mut rng, &mut spawned, &bus);
        assert_eq!(spawned.len(), 1);

        let bolt = &spawned[0];
        assert_eq!(bolt.kind, ProjectileKind::BossBolt);
        assert!((bolt.velocity.length() - 10.0).abs() < 1e-3);
        let expected = (target.aim_point - bolt.position).normalize();
        assert!(bolt.velocity.normalize().dot(expected) > 0.999);
    }

    #[test]
    fn test_cast_without_target_fires_nothing() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(5);
        let mut spawned = Vec::new();
        let (mut actor, mut ai) = boss(vec![Vec2::new(10.0, 0.0)]);
        ai.start_cycle(&mut actor, &bus);
        run(&mut actor, &mut ai, 10.0, None, &mut rng, &mut spawned, &bus);
        assert!(spawned.is_empty());
    }

    #[test]
    fn test_grace_period_blocks_contact_damage() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(9);
        let mut spawned = Vec::new();
        let resolver = CollisionResolver::default();
        let (mut actor, mut ai) = boss(vec![Vec2::new(2.0, 0.0), Vec2::new(-2.0, 0.0)]);
        let mut player = Player::new(Vec2::ZERO, &PlayerConfig::default());

        ai.start_cycle(&mut actor, &bus);
        let reveal = ai.config().vanish_delay + ai.config().hidden_duration + ai.config().appear_delay;
        run(&mut actor, &mut ai, reveal + 0.05, None, &mut rng, &mut spawned, &bus);
        assert!(ai.is_immune_to_contact_damage());

        let mut now = 0.0;
        let mut elapsed = 0.05;
        while elapsed < 2.9 {
            let outcome = resolver.resolve_hit(HitSource::contact(&actor), &mut player, now, &bus);
            assert_eq!(outcome, HitOutcome::Ignored(IgnoreReason::ContactDisabled));
            ai.frame_tick(&mut actor, None, DT, &mut rng, &mut spawned, &bus);
            now += DT;
            elapsed += DT;
        }

        run(&mut actor, &mut ai, 0.2, None, &mut rng, &mut spawned, &bus);
        assert!(!ai.is_immune_to_contact_damage());
        let outcome = resolver.resolve_hit(HitSource::contact(&actor), &mut player, now + 1.0, &bus);
        assert!(outcome.is_damage());
        assert_eq!(player.actor.health().current(), 4.0);
    }

    #[test]
    fn test_restart_clears_immunity() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(9);
        let mut spawned = Vec::new();
        let (mut actor, mut ai) = boss(vec![Vec2::new(2.0, 0.0)]);

        ai.start_cycle(&mut actor, &bus);
        run(&mut actor, &mut ai, 1.6, None, &mut rng, &mut spawned, &bus);
        assert!(ai.is_immune_to_contact_damage());

        ai.start_cycle(&mut actor, &bus);
        assert!(!ai.is_immune_to_contact_damage());
        assert!(matches!(ai.phase(), BossPhase::Vanishing { .. }));
    }

    #[test]
    fn test_death_stops_cycle() {
        let bus = EventBus::default();
        let mut rng = fastrand::Rng::with_seed(9);
        let mut spawned = Vec::new();
        let (mut actor, mut ai) = boss(vec![Vec2::new(2.0, 0.0)]);

        ai.start_cycle(&mut actor, &bus);
        run(&mut actor, &mut ai, 0.7, None, &mut rng, &mut spawned, &bus);
        ai.on_death(&mut actor);
        assert_eq!(ai.phase(), BossPhase::Dead);

        run(&mut actor, &mut ai, 10.0, None, &mut rng, &mut spawned, &bus);
        assert_eq!(ai.phase(), BossPhase::Dead);
        ai.start_cycle(&mut actor, &bus);
        assert_eq!(ai.phase(), BossPhase::Dead);
    }

    #[test]
    fn test_trigger_fires_once() {
        let boss_id = EntityId::from_raw(77);
        let mut trigger = BossTrigger::new(boss_id, AABB::new(0.0, 0.0, 2.0, 2.0));
        let outside = AABB::new(5.0, 5.0, 6.0, 6.0);
        let inside = AABB::new(1.0, 1.0, 1.5, 1.5);

        assert_eq!(trigger.check(&outside), None);
        assert_eq!(trigger.check(&inside), Some(boss_id));
        assert!(trigger.has_fired());
        assert_eq!(trigger.check(&inside), None);
    }
}
