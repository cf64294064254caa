//! The encounter: top-level simulation context.
//!
//! An [`Encounter`] owns everything that takes part in a fight: the player,
//! enemies, projectiles, pickups and boss triggers, plus the clock, the
//! event bus, the shared attack cooldowns and the collision resolver.
//!
//! The host drives it with two calls:
//! - [`Encounter::frame_tick`] once per rendered frame (timers, decisions)
//! - [`Encounter::fixed_tick`] once per physics step (movement, overlaps)
//!
//! Player/enemy body contacts come from the host's physics through
//! [`Encounter::report_contact`].

use glam::Vec2;
use tracing::{debug, info};

use runefall_common::EntityId;

use crate::ability::{AbilityError, AbilityKind, AbilityPickup};
use crate::actor::Damageable;
use crate::boss::BossTrigger;
use crate::collision_response::{
    CollisionResolver, Contact, ContactOutcome, HitOutcome, HitSource, IgnoredPairs,
};
use crate::cooldown::FactionCooldowns;
use crate::enemy::{Enemy, FixedContext, FrameContext};
use crate::events::{EventBus, GameEvent};
use crate::physics::{PhysicsWorld, AABB};
use crate::player::{Player, TargetSnapshot};
use crate::projectile::{DestroyReason, Projectile, TargetFaction};
use crate::tuning::CombatTuning;

/// Default event bus capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Top-level simulation context for one fight.
#[derive(Debug)]
pub struct Encounter {
    tuning: CombatTuning,
    clock: f32,
    events: EventBus,
    faction_cooldowns: FactionCooldowns,
    resolver: CollisionResolver,
    ignored_pairs: IgnoredPairs,
    player: Option<Player>,
    enemies: Vec<Enemy>,
    projectiles: Vec<Projectile>,
    pickups: Vec<AbilityPickup>,
    triggers: Vec<BossTrigger>,
    rng: fastrand::Rng,
}

impl Encounter {
    /// Creates an empty encounter. `seed` drives boss teleport choices.
    #[must_use]
    pub fn new(tuning: CombatTuning, seed: u64) -> Self {
        Self::with_event_capacity(tuning, seed, DEFAULT_EVENT_CAPACITY)
    }

    /// Creates an empty encounter with a custom event bus capacity.
    #[must_use]
    pub fn with_event_capacity(tuning: CombatTuning, seed: u64, capacity: usize) -> Self {
        Self {
            resolver: CollisionResolver::new(tuning.resolver),
            tuning,
            clock: 0.0,
            events: EventBus::new(capacity),
            faction_cooldowns: FactionCooldowns::new(),
            ignored_pairs: IgnoredPairs::new(),
            player: None,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            triggers: Vec::new(),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Simulation time in seconds.
    #[must_use]
    pub fn now(&self) -> f32 {
        self.clock
    }

    /// Active tuning.
    #[must_use]
    pub fn tuning(&self) -> &CombatTuning {
        &self.tuning
    }

    /// Event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drains all pending events.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// The player, if spawned.
    #[must_use]
    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    /// Mutable player access for the input layer.
    pub fn player_mut(&mut self) -> Option<&mut Player> {
        self.player.as_mut()
    }

    /// All enemies.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Looks up an enemy.
    #[must_use]
    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.actor().id == id)
    }

    /// Looks up an enemy mutably.
    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.actor().id == id)
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Pickups still in the level.
    #[must_use]
    pub fn pickups(&self) -> &[AbilityPickup] {
        &self.pickups
    }

    /// Boss triggers that have not fired.
    #[must_use]
    pub fn triggers(&self) -> &[BossTrigger] {
        &self.triggers
    }

    /// Shared attack cooldowns.
    #[must_use]
    pub fn faction_cooldowns(&self) -> &FactionCooldowns {
        &self.faction_cooldowns
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Spawns (or replaces) the player.
    pub fn spawn_player(&mut self, position: Vec2) -> EntityId {
        let player = Player::new(position, &self.tuning.player);
        let id = player.actor.id;
        info!("spawned player {} at {}", id, position);
        self.player = Some(player);
        id
    }

    fn push_enemy(&mut self, enemy: Enemy) -> EntityId {
        let id = enemy.actor().id;
        info!("spawned {} {} at {}", enemy.actor().name, id, enemy.actor().position());
        self.enemies.push(enemy);
        id
    }

    /// Spawns a walking enemy.
    pub fn spawn_ground_patrol(&mut self, position: Vec2) -> EntityId {
        self.push_enemy(Enemy::ground_patrol(position, self.tuning.ground_patrol))
    }

    /// Spawns a rune.
    pub fn spawn_homing_charge(&mut self, position: Vec2) -> EntityId {
        self.push_enemy(Enemy::homing_charge(position, self.tuning.homing_charge))
    }

    /// Spawns a dormant boss with its teleport points.
    pub fn spawn_boss(&mut self, position: Vec2, teleport_points: Vec<Vec2>) -> EntityId {
        self.push_enemy(Enemy::boss(position, teleport_points, self.tuning.boss))
    }

    /// Places an ability pickup.
    pub fn add_pickup(&mut self, kind: AbilityKind, volume: AABB) -> EntityId {
        let pickup = AbilityPickup::new(kind, volume);
        let id = pickup.id;
        self.pickups.push(pickup);
        id
    }

    /// Places a trigger volume that starts `boss` on first player entry.
    pub fn add_boss_trigger(&mut self, boss: EntityId, volume: AABB) -> EntityId {
        let trigger = BossTrigger::new(boss, volume);
        let id = trigger.id;
        self.triggers.push(trigger);
        id
    }

    fn add_projectile(&mut self, projectile: Projectile) -> EntityId {
        let id = projectile.id;
        self.events.publish(GameEvent::ProjectileSpawned {
            projectile: id,
            kind: projectile.kind,
            owner: projectile.owner,
            position: projectile.position,
        });
        self.projectiles.push(projectile);
        id
    }

    /// Removes an actor or projectile. Returns whether anything was removed.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if let Some(index) = self.enemies.iter().position(|e| e.actor().id == id) {
            self.enemies.swap_remove(index);
        } else if self.player.as_ref().is_some_and(|p| p.actor.id == id) {
            self.player = None;
        } else if let Some(index) = self.projectiles.iter().position(|p| p.id == id) {
            self.projectiles.swap_remove(index);
            self.events.publish(GameEvent::ProjectileDestroyed {
                projectile: id,
                reason: DestroyReason::Despawned,
            });
            return true;
        } else {
            return false;
        }

        self.ignored_pairs.forget(id);
        self.events.publish(GameEvent::ActorDespawned { actor: id });
        debug!("despawned {}", id);
        true
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Starts (or restarts) a boss's cycle.
    pub fn start_boss(&mut self, id: EntityId) -> bool {
        let events = &self.events;
        self.enemies
            .iter_mut()
            .find(|e| e.actor().id == id)
            .is_some_and(|boss| boss.start_cycle(events))
    }

    /// Casts a player ability. `target` is the boulder drop point.
    pub fn cast_ability(
        &mut self,
        kind: AbilityKind,
        target: Option<Vec2>,
    ) -> Result<Option<EntityId>, AbilityError> {
        let player = self.player.as_mut().ok_or(AbilityError::PlayerDead)?;
        let projectile =
            player.cast(kind, self.clock, target, &self.tuning.abilities, &self.events)?;
        Ok(projectile.map(|p| self.add_projectile(p)))
    }

    /// Resolves a body contact between the player and an enemy.
    ///
    /// Returns `None` when either side is missing.
    pub fn report_contact(&mut self, enemy: EntityId, contact: Contact) -> Option<ContactOutcome> {
        let player = self.player.as_mut()?;
        let enemy = self.enemies.iter_mut().find(|e| e.actor().id == enemy)?;
        Some(self.resolver.resolve_player_contact(
            player,
            enemy,
            contact,
            &mut self.ignored_pairs,
            self.clock,
            &self.events,
        ))
    }

    // ========================================================================
    // Ticking
    // ========================================================================

    fn snapshot(&self) -> Option<TargetSnapshot> {
        self.player.as_ref().map(Player::snapshot)
    }

    /// Per-frame update: clock, timers, decisions, pickups and triggers.
    pub fn frame_tick(&mut self, dt: f32, world: &dyn PhysicsWorld) {
        let dt = dt.max(0.0);
        self.clock += dt;
        let target = self.snapshot();

        if let Some(player) = self.player.as_mut() {
            player.actor.tick_timers(dt, &self.events);
        }
        for enemy in &mut self.enemies {
            enemy.actor_mut().tick_timers(dt, &self.events);
        }

        let mut spawned = Vec::new();
        {
            let mut ctx = FrameContext {
                dt,
                now: self.clock,
                target: target.as_ref(),
                world,
                faction_cooldowns: &mut self.faction_cooldowns,
                rng: &mut self.rng,
                spawned: &mut spawned,
                events: &self.events,
            };
            for enemy in &mut self.enemies {
                enemy.frame_tick(&mut ctx);
            }
        }
        for projectile in spawned {
            self.add_projectile(projectile);
        }

        self.ignored_pairs.tick(dt);
        self.update_volumes();
    }

    fn update_volumes(&mut self) {
        let Some(player) = self.player.as_mut().filter(|p| p.actor.is_alive()) else {
            return;
        };
        let bounds = player.actor.bounds();

        for pickup in &mut self.pickups {
            pickup.try_collect(&bounds, &mut player.abilities, &self.events);
        }
        self.pickups.retain(|p| !p.is_collected());

        let fired: Vec<EntityId> = self
            .triggers
            .iter_mut()
            .filter_map(|trigger| trigger.check(&bounds))
            .collect();
        self.triggers.retain(|t| !t.has_fired());
        for boss in fired {
            self.start_boss(boss);
        }
    }

    /// Per-physics-step update: movement, strikes, integration, projectiles.
    pub fn fixed_tick(&mut self, dt: f32, world: &dyn PhysicsWorld) {
        let dt = dt.max(0.0);
        let target = self.snapshot();

        let mut strikes = Vec::new();
        {
            let ctx = FixedContext {
                dt,
                target: target.as_ref(),
                world,
                events: &self.events,
            };
            for enemy in &mut self.enemies {
                if let Some(strike) = enemy.fixed_tick(&ctx) {
                    strikes.push(strike);
                }
            }
        }

        if let Some(player) = self.player.as_mut() {
            let player_id = player.actor.id;
            for strike in strikes.into_iter().filter(|s| s.target == player_id) {
                let source = HitSource::Strike {
                    attacker: strike.attacker,
                    amount: strike.damage,
                };
                let outcome = self.resolver.resolve_hit(source, player, self.clock, &self.events);
                debug!("strike from {}: {:?}", strike.attacker, outcome);
            }
            world.integrate(&mut player.actor.body, dt);
        }
        for enemy in &mut self.enemies {
            world.integrate(&mut enemy.actor_mut().body, dt);
        }

        self.update_projectiles(dt, world);
        self.remove_finished();
    }

    fn update_projectiles(&mut self, dt: f32, world: &dyn PhysicsWorld) {
        let gravity = world.gravity();
        for projectile in &mut self.projectiles {
            projectile.update(dt, gravity);
            projectile.check_terrain(world);
            if !projectile.is_dangerous() {
                continue;
            }

            let bounds = projectile.bounds();
            match projectile.target {
                TargetFaction::Player => {
                    let Some(player) = self.player.as_mut() else {
                        continue;
                    };
                    if player.actor.body.collider_enabled()
                        && player.actor.bounds().overlaps(&bounds)
                        && projectile.can_hit(player.actor.id)
                    {
                        self.resolver
                            .resolve_projectile_hit(projectile, player, self.clock, &self.events);
                    }
                },
                TargetFaction::Enemies => {
                    for enemy in &mut self.enemies {
                        if !projectile.is_dangerous() {
                            break;
                        }
                        let actor = enemy.actor();
                        if !actor.is_alive()
                            || !actor.body.collider_enabled()
                            || !actor.bounds().overlaps(&bounds)
                            || !projectile.can_hit(actor.id)
                        {
                            continue;
                        }
                        let outcome = self.resolver.resolve_projectile_hit(
                            projectile,
                            enemy,
                            self.clock,
                            &self.events,
                        );
                        if let HitOutcome::Damaged { died: true, .. } = outcome {
                            debug!("{:?} killed {}", projectile.kind, enemy.actor().id);
                        }
                    }
                },
            }
        }
    }

    fn remove_finished(&mut self) {
        let events = &self.events;
        self.projectiles.retain(|p| match p.destroyed() {
            Some(reason) => {
                events.publish(GameEvent::ProjectileDestroyed {
                    projectile: p.id,
                    reason,
                });
                false
            },
            None => true,
        });

        let spent: Vec<EntityId> = self
            .enemies
            .iter()
            .filter(|e| e.is_spent())
            .map(|e| e.actor().id)
            .collect();
        for id in spent {
            self.despawn(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground_patrol::PatrolState;
    use crate::physics::StaticWorld;

    const DT: f32 = 1.0 / 60.0;

    fn arena() -> StaticWorld {
        let mut world = StaticWorld::new(9.81);
        world.add_platform(AABB::new(-30.0, -1.0, 30.0, 0.0));
        world
    }

    fn step(encounter: &mut Encounter, world: &StaticWorld) {
        encounter.frame_tick(DT, world);
        encounter.fixed_tick(DT, world);
    }

    fn player_health(encounter: &Encounter) -> f32 {
        encounter
            .player()
            .map_or(0.0, |p| p.actor.health().current())
    }

    #[test]
    fn test_contact_damage_through_encounter() {
        let world = arena();
        let mut encounter = Encounter::new(CombatTuning::default(), 1);
        encounter.spawn_player(Vec2::new(0.0, 0.8));
        let zombie = encounter.spawn_ground_patrol(Vec2::new(1.0, 0.5));

        let outcome = encounter
            .report_contact(zombie, Contact::new(Vec2::NEG_X))
            .expect("both sides exist");
        assert!(matches!(outcome, ContactOutcome::Hit(HitOutcome::Damaged { .. })));
        assert_eq!(player_health(&encounter), 4.0);

        // still invincible on the next frame
        step(&mut encounter, &world);
        let outcome = encounter
            .report_contact(zombie, Contact::new(Vec2::NEG_X))
            .expect("both sides exist");
        assert!(matches!(outcome, ContactOutcome::Hit(HitOutcome::Ignored(_))));
    }

    #[test]
    fn test_rune_strike_and_despawn() {
        let world = arena();
        let mut encounter = Encounter::new(CombatTuning::default(), 1);
        encounter.spawn_player(Vec2::new(0.0, 0.8));
        let rune = encounter.spawn_homing_charge(Vec2::new(6.0, 3.0));

        for _ in 0..(5.0 / DT) as usize {
            step(&mut encounter, &world);
        }
        assert!(encounter.enemy(rune).is_none());
        assert_eq!(player_health(&encounter), 3.0);

        let events = encounter.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::ActorDespawned { actor } if *actor == rune)));
        assert!(encounter
            .faction_cooldowns()
            .last_attack(crate::actor::EnemyKind::HomingCharge)
            .is_some());
    }

    #[test]
    fn test_homing_strike_costs_exactly_its_damage() {
        let world = arena();
        let mut tuning = CombatTuning::default();
        tuning.homing_charge.damage = 1.5;
        let mut encounter = Encounter::new(tuning, 1);
        encounter.spawn_player(Vec2::new(0.0, 0.8));
        let rune = encounter.spawn_homing_charge(Vec2::new(4.0, 2.0));

        let mut struck_at = None;
        for frame in 0..(5.0 / DT) as usize {
            step(&mut encounter, &world);
            if player_health(&encounter) < 5.0 {
                struck_at = Some(frame);
                break;
            }
        }
        assert!(struck_at.is_some(), "rune never reached the player");
        assert_eq!(player_health(&encounter), 3.5);

        let events = encounter.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::HealthChanged { current, .. } if *current == 3.5
        )));
        for _ in 0..30 {
            step(&mut encounter, &world);
        }
        assert!(encounter.enemy(rune).is_none());
        assert_eq!(player_health(&encounter), 3.5);
    }

    #[test]
    fn test_fireball_kills_zombie() {
        let world = arena();
        let mut tuning = CombatTuning::default();
        tuning.ground_patrol.max_health = 1.0;
        tuning.ground_patrol.detection_radius = 0.0;
        let mut encounter = Encounter::new(tuning, 1);
        encounter.spawn_player(Vec2::new(0.0, 0.8));
        let zombie = encounter.spawn_ground_patrol(Vec2::new(5.0, 0.5));
        encounter.add_pickup(AbilityKind::Fireball, AABB::new(-1.0, 0.0, 1.0, 2.0));

        assert_eq!(
            encounter.cast_ability(AbilityKind::Fireball, None),
            Err(AbilityError::NotLearned(AbilityKind::Fireball))
        );
        step(&mut encounter, &world);
        assert!(encounter.pickups().is_empty());

        let fireball = encounter
            .cast_ability(AbilityKind::Fireball, None)
            .expect("fireball learned")
            .expect("fireball spawned");
        for _ in 0..60 {
            step(&mut encounter, &world);
        }

        let enemy = encounter.enemy(zombie).expect("dead zombies stay until despawned");
        assert!(!enemy.is_alive());
        match enemy {
            Enemy::GroundPatrol { ai, .. } => assert_eq!(ai.state(), PatrolState::Dead),
            other => panic!("unexpected enemy {other:?}"),
        }
        assert!(encounter.projectiles().iter().all(|p| p.id != fireball));

        assert!(encounter.despawn(zombie));
        assert!(encounter.enemies().is_empty());
        assert!(!encounter.despawn(zombie));
    }

    #[test]
    fn test_trigger_starts_boss_and_bolt_hits_player() {
        let world = arena();
        let mut encounter = Encounter::new(CombatTuning::default(), 7);
        encounter.spawn_player(Vec2::new(0.0, 0.8));
        let boss = encounter.spawn_boss(Vec2::new(6.0, 1.0), vec![Vec2::new(6.0, 0.8)]);
        encounter.add_boss_trigger(boss, AABB::new(-1.0, 0.0, 1.0, 2.0));

        step(&mut encounter, &world);
        assert!(encounter.triggers().is_empty());

        let mut bolts = 0;
        for _ in 0..(6.0 / DT) as usize {
            step(&mut encounter, &world);
            for event in encounter.drain_events() {
                if let GameEvent::ProjectileSpawned { .. } = event {
                    bolts += 1;
                }
            }
        }
        assert!(bolts >= 1);
        assert!(player_health(&encounter) < 5.0);
    }

    #[test]
    fn test_cast_without_player() {
        let mut encounter = Encounter::new(CombatTuning::default(), 1);
        assert_eq!(
            encounter.cast_ability(AbilityKind::Fireball, None),
            Err(AbilityError::PlayerDead)
        );
        assert!(encounter
            .report_contact(EntityId::from_raw(u64::MAX), Contact::new(Vec2::Y))
            .is_none());
    }

    #[test]
    fn test_ai_runs_without_player() {
        let world = arena();
        let mut encounter = Encounter::new(CombatTuning::default(), 1);
        let zombie = encounter.spawn_ground_patrol(Vec2::new(0.0, 2.0));
        encounter.spawn_homing_charge(Vec2::new(3.0, 3.0));

        for _ in 0..120 {
            step(&mut encounter, &world);
        }
        match encounter.enemy(zombie) {
            Some(Enemy::GroundPatrol { ai, .. }) => assert_eq!(ai.state(), PatrolState::Walking),
            other => panic!("unexpected enemy {other:?}"),
        }
        assert_eq!(encounter.enemies().len(), 2);
    }
}
