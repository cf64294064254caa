//! Enemy variants behind one interface.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorKind, Damageable, EnemyKind};
use crate::boss::{BossAI, BossConfig};
use crate::cooldown::FactionCooldowns;
use crate::events::EventBus;
use crate::ground_patrol::{GroundPatrolAI, GroundPatrolConfig};
use crate::health::HealthChange;
use crate::homing_charge::{HomingChargeAI, HomingChargeConfig, Strike};
use crate::physics::{Body, PhysicsWorld};
use crate::player::TargetSnapshot;
use crate::projectile::Projectile;

/// Everything an enemy may read or write during a frame tick.
pub struct FrameContext<'a> {
    /// Frame delta
    pub dt: f32,
    /// Simulation time
    pub now: f32,
    /// Player snapshot for this tick
    pub target: Option<&'a TargetSnapshot>,
    /// World queries
    pub world: &'a dyn PhysicsWorld,
    /// Shared per-kind attack cooldowns
    pub faction_cooldowns: &'a mut FactionCooldowns,
    /// Random source for boss teleports
    pub rng: &'a mut fastrand::Rng,
    /// Projectiles spawned this tick
    pub spawned: &'a mut Vec<Projectile>,
    /// Event sink
    pub events: &'a EventBus,
}

/// Everything an enemy may read or write during a physics step.
pub struct FixedContext<'a> {
    /// Step length
    pub dt: f32,
    /// Player snapshot for this step
    pub target: Option<&'a TargetSnapshot>,
    /// World queries
    pub world: &'a dyn PhysicsWorld,
    /// Event sink
    pub events: &'a EventBus,
}

/// An enemy: shared damage state plus its decision logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Enemy {
    /// Walking melee enemy
    GroundPatrol {
        /// Damage-taking state
        actor: Actor,
        /// Decisions
        ai: GroundPatrolAI,
    },
    /// Floating rune
    HomingCharge {
        /// Damage-taking state
        actor: Actor,
        /// Decisions
        ai: HomingChargeAI,
    },
    /// Teleporting caster
    Boss {
        /// Damage-taking state
        actor: Actor,
        /// Decisions
        ai: BossAI,
    },
}

impl Enemy {
    /// Creates a ground patrol enemy. It starts falling and walks once it
    /// lands.
    #[must_use]
    pub fn ground_patrol(position: Vec2, config: GroundPatrolConfig) -> Self {
        let actor = Actor::new(
            ActorKind::Enemy(EnemyKind::GroundPatrol),
            EnemyKind::GroundPatrol.display_name(),
            Body::new(position, config.half_extents),
            config.max_health,
        )
        .with_cooldown(config.damage_cooldown)
        .with_contact_damage(config.contact_damage);
        Self::GroundPatrol {
            actor,
            ai: GroundPatrolAI::new(position, config),
        }
    }

    /// Creates a floating rune.
    #[must_use]
    pub fn homing_charge(position: Vec2, config: HomingChargeConfig) -> Self {
        let actor = Actor::new(
            ActorKind::Enemy(EnemyKind::HomingCharge),
            EnemyKind::HomingCharge.display_name(),
            Body::new(position, config.half_extents).with_gravity_scale(0.0),
            config.max_health,
        )
        .with_contact_damage(config.damage);
        Self::HomingCharge {
            actor,
            ai: HomingChargeAI::new(config),
        }
    }

    /// Creates a dormant boss.
    #[must_use]
    pub fn boss(position: Vec2, teleport_points: Vec<Vec2>, config: BossConfig) -> Self {
        let actor = Actor::new(
            ActorKind::Enemy(EnemyKind::Boss),
            EnemyKind::Boss.display_name(),
            Body::new(position, config.half_extents).with_gravity_scale(0.0),
            config.max_health,
        )
        .with_contact_damage(config.contact_damage);
        Self::Boss {
            actor,
            ai: BossAI::new(config, teleport_points),
        }
    }

    /// Enemy kind.
    #[must_use]
    pub fn kind(&self) -> EnemyKind {
        match self {
            Self::GroundPatrol { .. } => EnemyKind::GroundPatrol,
            Self::HomingCharge { .. } => EnemyKind::HomingCharge,
            Self::Boss { .. } => EnemyKind::Boss,
        }
    }

    /// Whether a rune has used itself up and should be removed.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        match self {
            Self::HomingCharge { ai, .. } => ai.is_spent(),
            _ => false,
        }
    }

    /// Frame-rate decisions.
    pub fn frame_tick(&mut self, ctx: &mut FrameContext<'_>) {
        match self {
            Self::GroundPatrol { actor, ai } => {
                if actor.is_alive() {
                    ai.frame_tick(actor, ctx.target, ctx.dt, ctx.events);
                }
            },
            Self::HomingCharge { actor, ai } => {
                if actor.is_alive() {
                    ai.frame_tick(
                        actor,
                        ctx.world,
                        ctx.target,
                        ctx.now,
                        ctx.dt,
                        ctx.faction_cooldowns,
                        ctx.events,
                    );
                }
            },
            Self::Boss { actor, ai } => {
                ai.frame_tick(actor, ctx.target, ctx.dt, ctx.rng, ctx.spawned, ctx.events);
            },
        }
    }

    /// Physics-step decisions. Returns a strike if a rune reached its target.
    pub fn fixed_tick(&mut self, ctx: &FixedContext<'_>) -> Option<Strike> {
        match self {
            Self::GroundPatrol { actor, ai } => {
                ai.fixed_tick(actor, ctx.world, ctx.target, ctx.dt, ctx.events);
                None
            },
            Self::HomingCharge { actor, ai } => {
                if actor.is_alive() {
                    ai.fixed_tick(actor, ctx.target)
                } else {
                    None
                }
            },
            Self::Boss { .. } => None,
        }
    }

    /// Called after the player touched this enemy.
    pub fn on_player_contact(&mut self) {
        if let Self::HomingCharge { actor, ai } = self {
            ai.on_player_contact(actor);
        }
    }

    /// Starts a boss cycle. Other enemies ignore this.
    pub fn start_cycle(&mut self, events: &EventBus) -> bool {
        match self {
            Self::Boss { actor, ai } => {
                ai.start_cycle(actor, events);
                true
            },
            _ => false,
        }
    }
}

impl Damageable for Enemy {
    fn actor(&self) -> &Actor {
        match self {
            Self::GroundPatrol { actor, .. }
            | Self::HomingCharge { actor, .. }
            | Self::Boss { actor, .. } => actor,
        }
    }

    fn actor_mut(&mut self) -> &mut Actor {
        match self {
            Self::GroundPatrol { actor, .. }
            | Self::HomingCharge { actor, .. }
            | Self::Boss { actor, .. } => actor,
        }
    }

    fn take_damage(&mut self, amount: f32, events: &EventBus) -> HealthChange {
        let change = self.actor_mut().apply_damage(amount, events);
        match self {
            Self::GroundPatrol { actor, ai } => match change {
                HealthChange::Died => ai.on_death(actor, events),
                HealthChange::Damaged { .. } => ai.on_damaged(actor, true, events),
                _ => {},
            },
            Self::HomingCharge { actor, ai } => {
                if change == HealthChange::Died {
                    ai.on_death(actor);
                }
            },
            Self::Boss { actor, ai } => {
                if change == HealthChange::Died {
                    ai.on_death(actor);
                }
            },
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision_response::{CollisionResolver, HitSource};
    use crate::ground_patrol::PatrolState;
    use crate::physics::StaticWorld;
    use runefall_common::EntityId;

    #[test]
    fn test_hit_provokes_chase() {
        let bus = EventBus::default();
        let mut enemy = Enemy::ground_patrol(Vec2::ZERO, GroundPatrolConfig::default());
        let change = enemy.take_damage(1.0, &bus);
        assert_eq!(change, HealthChange::Damaged { current: 2.0 });
        match &enemy {
            Enemy::GroundPatrol { ai, .. } => assert_eq!(ai.state(), PatrolState::Chasing),
            other => panic!("unexpected enemy {other:?}"),
        }
    }

    #[test]
    fn test_lethal_projectile_kills_patrol() {
        let bus = EventBus::default();
        let resolver = CollisionResolver::default();
        let mut enemy = Enemy::ground_patrol(Vec2::ZERO, GroundPatrolConfig::default());
        let mut boulder = Projectile::new(
            EntityId::from_raw(u64::MAX),
            crate::projectile::ProjectileKind::Boulder,
            Vec2::ZERO,
            Vec2::ZERO,
            3.0,
            5.0,
        )
        .passing_through();

        let outcome = resolver.resolve_projectile_hit(&mut boulder, &mut enemy, 0.0, &bus);
        assert!(matches!(
            outcome,
            crate::collision_response::HitOutcome::Damaged { died: true, .. }
        ));
        assert!(!enemy.is_alive());
        assert!(!enemy.actor().body.collider_enabled());
        assert!(boulder.destroyed().is_none());
    }

    #[test]
    fn test_boss_killed_mid_cycle() {
        let bus = EventBus::default();
        let resolver = CollisionResolver::default();
        let mut boss = Enemy::boss(Vec2::ZERO, vec![Vec2::X], BossConfig::default());
        assert!(boss.start_cycle(&bus));

        let strike = HitSource::Strike {
            attacker: EntityId::from_raw(1),
            amount: 100.0,
        };
        assert!(resolver.resolve_hit(strike, &mut boss, 0.0, &bus).is_damage());
        match &boss {
            Enemy::Boss { ai, .. } => assert_eq!(ai.phase(), crate::boss::BossPhase::Dead),
            other => panic!("unexpected enemy {other:?}"),
        }
    }

    #[test]
    fn test_fixed_tick_dispatch() {
        let bus = EventBus::default();
        let world = StaticWorld::new(9.81);
        let mut rune = Enemy::homing_charge(Vec2::ZERO, HomingChargeConfig::default());
        let ctx = FixedContext {
            dt: 1.0 / 60.0,
            target: None,
            world: &world,
            events: &bus,
        };
        assert!(rune.fixed_tick(&ctx).is_none());
        assert!(!rune.is_spent());
        assert_eq!(rune.kind(), EnemyKind::HomingCharge);
    }
}
