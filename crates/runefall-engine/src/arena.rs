//! Demo arena.
//!
//! A fixed level on [`StaticWorld`]: a long floor with a ledge, three
//! ability pickups, a walking enemy on the floor and one on the ledge, a
//! rune, and a boss behind a trigger volume. A scripted player walks
//! through it, jumping, casting whatever it has learned and raising the
//! shield whenever the boss starts a cast.
//!
//! The arena also plays the part of the host physics engine: after every
//! physics step it finds player/enemy overlaps and reports them to the
//! encounter as contacts.

use glam::Vec2;
use serde::Serialize;
use tracing::{debug, info, trace};

use runefall_common::EntityId;
use runefall_gameplay::{
    AbilityKind, BodyControl, CombatTuning, Contact, ContactOutcome, Damageable, Encounter,
    EnemyKind, GameEvent, LayerMask, PhysicsWorld, StaticWorld, AABB,
};

use crate::timing::FixedStepClock;

/// Seconds a dead enemy stays in the level before it is removed.
const CORPSE_TIME: f32 = 1.0;

/// Half size of the region the rune can "see".
const VIEW_HALF_EXTENTS: Vec2 = Vec2::new(10.0, 6.0);

/// Scripted player input.
#[derive(Debug, Clone)]
pub struct PlayerScript {
    /// Walking speed
    pub walk_speed: f32,
    /// Vertical launch speed
    pub jump_speed: f32,
    /// Seconds between jumps
    pub jump_interval: f32,
    /// Seconds between boulder drops
    pub boulder_interval: f32,
    /// Walk range (min x, max x)
    pub walk_range: (f32, f32),
    /// Range at which enemies are fired upon
    pub attack_range: f32,
    jump_timer: f32,
    boulder_timer: f32,
    shield_requested: bool,
}

impl Default for PlayerScript {
    fn default() -> Self {
        Self {
            walk_speed: 3.0,
            jump_speed: 6.0,
            jump_interval: 2.5,
            boulder_interval: 3.0,
            walk_range: (-18.0, 28.0),
            attack_range: 8.0,
            jump_timer: 2.5,
            boulder_timer: 0.0,
            shield_requested: false,
        }
    }
}

impl PlayerScript {
    /// Reacts to events from the last frame.
    pub fn observe(&mut self, event: &GameEvent) {
        if let GameEvent::CastStarted { .. } = event {
            self.shield_requested = true;
        }
    }

    /// Steers the player and casts abilities for one frame.
    pub fn drive(&mut self, encounter: &mut Encounter, world: &StaticWorld, dt: f32) {
        self.jump_timer -= dt;
        self.boulder_timer -= dt;

        let Some(player) = encounter.player_mut() else {
            return;
        };
        if !player.actor.is_alive() {
            player.actor.body.set_velocity(Vec2::ZERO);
            return;
        }

        let position = player.actor.position();
        if position.x >= self.walk_range.1 {
            player.actor.face(-1.0);
        } else if position.x <= self.walk_range.0 {
            player.actor.face(1.0);
        }
        let facing = player.actor.facing;

        let mut velocity = player.actor.body.velocity;
        velocity.x = facing * self.walk_speed;
        let body = &player.actor.body;
        if self.jump_timer <= 0.0 && is_grounded(world, body.feet(), body.half_extents.x) {
            velocity.y = self.jump_speed;
            self.jump_timer = self.jump_interval;
            trace!("scripted jump at {}", position);
        }
        player.actor.body.set_velocity(velocity);

        if std::mem::take(&mut self.shield_requested) {
            self.try_cast(encounter, AbilityKind::IceShield, None);
        }

        let mut enemy_ahead = false;
        let mut boss_target = None;
        for enemy in encounter.enemies() {
            let actor = enemy.actor();
            if !actor.is_alive() || !actor.body.collider_enabled() {
                continue;
            }
            let offset = actor.position() - position;
            if offset.x * facing > 0.0
                && offset.x.abs() < self.attack_range
                && offset.y.abs() < 1.5
            {
                enemy_ahead = true;
            }
            if enemy.kind() == EnemyKind::Boss && offset.x.abs() < self.attack_range {
                boss_target = Some(actor.position() + Vec2::new(0.0, 4.0));
            }
        }

        if enemy_ahead {
            self.try_cast(encounter, AbilityKind::Fireball, None);
        }
        if let Some(drop_point) = boss_target {
            if self.boulder_timer <= 0.0 {
                self.boulder_timer = self.boulder_interval;
                self.try_cast(encounter, AbilityKind::Boulder, Some(drop_point));
            }
        }
    }

    fn try_cast(&self, encounter: &mut Encounter, kind: AbilityKind, target: Option<Vec2>) {
        match encounter.cast_ability(kind, target) {
            Ok(Some(projectile)) => debug!("cast {} as {}", kind.display_name(), projectile),
            Ok(None) => debug!("cast {}", kind.display_name()),
            Err(e) => trace!("cast {} refused: {e}", kind.display_name()),
        }
    }
}

fn is_grounded(world: &StaticWorld, feet: Vec2, half_width: f32) -> bool {
    let probe = AABB::new(
        feet.x - half_width * 0.9,
        feet.y - 0.05,
        feet.x + half_width * 0.9,
        feet.y + 0.01,
    );
    world.overlaps_at(probe, LayerMask::GROUND).is_some()
}

/// Contact normal pointing from `enemy` toward `player`, along the axis of
/// least penetration. `None` when the boxes do not overlap.
#[must_use]
pub fn contact_normal(player: &AABB, enemy: &AABB) -> Option<Vec2> {
    if !player.overlaps(enemy) {
        return None;
    }

    let overlap_x = player.max_x.min(enemy.max_x) - player.min_x.max(enemy.min_x);
    let overlap_y = player.max_y.min(enemy.max_y) - player.min_y.max(enemy.min_y);
    let delta = player.center() - enemy.center();

    let normal = if overlap_y < overlap_x {
        Vec2::new(0.0, if delta.y >= 0.0 { 1.0 } else { -1.0 })
    } else {
        Vec2::new(if delta.x >= 0.0 { 1.0 } else { -1.0 }, 0.0)
    };
    Some(normal)
}

/// Counters collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArenaStats {
    /// Frames simulated
    pub frames: u64,
    /// Physics steps simulated
    pub fixed_steps: u64,
    /// Events drained
    pub events: u64,
    /// Hits that damaged the player
    pub player_hits: u32,
    /// Hits absorbed by the shield
    pub shields_broken: u32,
    /// Enemies killed
    pub enemies_killed: u32,
    /// Times the player landed on an enemy
    pub landings: u32,
    /// Projectiles spawned
    pub projectiles_spawned: u32,
    /// Abilities picked up
    pub abilities_learned: u32,
}

/// The demo level plus its driver.
#[derive(Debug)]
pub struct Arena {
    world: StaticWorld,
    encounter: Encounter,
    script: PlayerScript,
    clock: FixedStepClock,
    corpses: Vec<(EntityId, f32)>,
    stats: ArenaStats,
}

impl Arena {
    /// Creates an arena from parts.
    #[must_use]
    pub fn new(
        world: StaticWorld,
        encounter: Encounter,
        script: PlayerScript,
        clock: FixedStepClock,
    ) -> Self {
        Self {
            world,
            encounter,
            script,
            clock,
            corpses: Vec::new(),
            stats: ArenaStats::default(),
        }
    }

    /// Builds the demo level.
    #[must_use]
    pub fn demo(tuning: CombatTuning, seed: u64, clock: FixedStepClock) -> Self {
        let mut world = StaticWorld::new(9.81);
        world.add_platform(AABB::new(-20.0, -1.0, 30.0, 0.0));
        world.add_platform(AABB::new(4.0, 2.0, 9.0, 2.5));
        world.add_platform(AABB::new(-21.0, -1.0, -20.0, 10.0));
        world.add_platform(AABB::new(30.0, -1.0, 31.0, 10.0));

        let mut encounter = Encounter::new(tuning, seed);
        encounter.spawn_player(Vec2::new(-12.0, 0.8));

        encounter.add_pickup(AbilityKind::Fireball, AABB::new(-10.0, 0.0, -9.0, 2.0));
        encounter.add_pickup(AbilityKind::IceShield, AABB::new(-6.0, 0.0, -5.0, 2.0));
        encounter.add_pickup(AbilityKind::Boulder, AABB::new(-2.0, 0.0, -1.0, 2.0));

        encounter.spawn_ground_patrol(Vec2::new(1.0, 0.5));
        encounter.spawn_ground_patrol(Vec2::new(6.5, 3.0));
        encounter.spawn_homing_charge(Vec2::new(12.0, 4.0));

        let boss = encounter.spawn_boss(
            Vec2::new(22.0, 1.0),
            vec![Vec2::new(18.0, 1.0), Vec2::new(22.0, 1.0), Vec2::new(26.0, 1.0)],
        );
        encounter.add_boss_trigger(boss, AABB::new(15.0, 0.0, 16.0, 4.0));

        info!("demo arena ready: {} enemies", encounter.enemies().len());
        Self::new(world, encounter, PlayerScript::default(), clock)
    }

    /// The encounter.
    #[must_use]
    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Mutable encounter access.
    pub fn encounter_mut(&mut self) -> &mut Encounter {
        &mut self.encounter
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }

    /// Simulated time.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    /// Whether the fight is decided: player dead or every enemy gone.
    #[must_use]
    pub fn is_over(&self) -> bool {
        let player_alive = self
            .encounter
            .player()
            .is_some_and(|p| p.actor.is_alive());
        !player_alive || self.encounter.enemies().is_empty()
    }

    /// Runs one frame: script, frame tick, then as many physics steps as the
    /// clock allows. Returns the events produced.
    pub fn advance(&mut self, frame_dt: f32) -> Vec<GameEvent> {
        let steps = self.clock.accumulate(frame_dt);
        let dt = self.clock.clamp_dt(frame_dt);

        if let Some(player) = self.encounter.player() {
            let center = player.actor.position();
            self.world
                .set_viewport(Some(AABB::from_center(center, VIEW_HALF_EXTENTS)));
        }

        self.script.drive(&mut self.encounter, &self.world, dt);
        self.encounter.frame_tick(dt, &self.world);

        let fixed_dt = self.clock.fixed_dt();
        for _ in 0..steps {
            self.encounter.fixed_tick(fixed_dt, &self.world);
            self.detect_contacts();
        }

        self.remove_corpses(dt);

        let events = self.encounter.drain_events();
        for event in &events {
            self.record(event);
            self.script.observe(event);
        }

        self.stats.frames += 1;
        self.stats.fixed_steps += u64::from(steps);
        events
    }

    /// Reports every player/enemy overlap to the encounter.
    pub fn detect_contacts(&mut self) -> Vec<(EntityId, ContactOutcome)> {
        let Some(player) = self.encounter.player() else {
            return Vec::new();
        };
        if !player.actor.is_alive() {
            return Vec::new();
        }
        let player_bounds = player.actor.bounds();

        let touching: Vec<(EntityId, Vec2)> = self
            .encounter
            .enemies()
            .iter()
            .filter(|e| e.actor().body.collider_enabled())
            .filter_map(|e| {
                contact_normal(&player_bounds, &e.actor().bounds()).map(|n| (e.actor().id, n))
            })
            .collect();

        touching
            .into_iter()
            .filter_map(|(enemy, normal)| {
                self.encounter
                    .report_contact(enemy, Contact::new(normal))
                    .map(|outcome| (enemy, outcome))
            })
            .collect()
    }

    fn remove_corpses(&mut self, dt: f32) {
        let mut expired = Vec::new();
        for (id, remaining) in &mut self.corpses {
            *remaining -= dt;
            if *remaining <= 0.0 {
                expired.push(*id);
            }
        }
        self.corpses.retain(|(_, remaining)| *remaining > 0.0);
        for id in expired {
            self.encounter.despawn(id);
        }
    }

    fn record(&mut self, event: &GameEvent) {
        self.stats.events += 1;
        let player = self.encounter.player().map(|p| p.actor.id);
        match event {
            GameEvent::ActorHit { target, .. } if Some(*target) == player => {
                self.stats.player_hits += 1;
            },
            GameEvent::ShieldBroken { .. } => self.stats.shields_broken += 1,
            GameEvent::Died { actor } if Some(*actor) != player => {
                self.stats.enemies_killed += 1;
                self.corpses.push((*actor, CORPSE_TIME));
            },
            GameEvent::PlayerLanded { .. } => self.stats.landings += 1,
            GameEvent::ProjectileSpawned { .. } => self.stats.projectiles_spawned += 1,
            GameEvent::AbilityLearned { .. } => self.stats.abilities_learned += 1,
            _ => {},
        }
    }
}
