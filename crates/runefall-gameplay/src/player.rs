//! The player actor.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use runefall_common::EntityId;

use crate::ability::{AbilityBook, AbilityConfig, AbilityError, AbilityKind};
use crate::actor::{Actor, ActorKind, Damageable};
use crate::events::{EventBus, GameEvent};
use crate::physics::{Body, AABB};
use crate::projectile::{Projectile, ProjectileKind};

/// Player tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Maximum health
    pub max_health: f32,
    /// Invincibility after taking a hit
    pub post_hit_invincibility: f32,
    /// Minimum gap between two hits
    pub damage_cooldown: f32,
    /// Half width and half height of the body
    pub half_extents: Vec2,
    /// Offset from the body center that enemies aim at
    pub head_offset: Vec2,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 5.0,
            post_hit_invincibility: 1.0,
            damage_cooldown: 0.1,
            half_extents: Vec2::new(0.4, 0.8),
            head_offset: Vec2::new(0.0, 0.6),
        }
    }
}

/// What enemies see of the player during one tick.
///
/// Every enemy ticking in the same step observes the same snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Player ID
    pub id: EntityId,
    /// Body center
    pub position: Vec2,
    /// Point ranged attacks aim at
    pub aim_point: Vec2,
    /// Collision bounds
    pub bounds: AABB,
    /// Whether the player can still be targeted
    pub active: bool,
}

/// The player: an actor that can learn and cast abilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Damage-taking state
    pub actor: Actor,
    /// Learned abilities
    pub abilities: AbilityBook,
    head_offset: Vec2,
}

impl Player {
    /// Creates a player at `position`.
    #[must_use]
    pub fn new(position: Vec2, config: &PlayerConfig) -> Self {
        let actor = Actor::new(
            ActorKind::Player,
            "Player",
            Body::new(position, config.half_extents),
            config.max_health,
        )
        .with_invincibility(config.post_hit_invincibility)
        .with_cooldown(config.damage_cooldown)
        .with_shield();

        Self {
            actor,
            abilities: AbilityBook::new(),
            head_offset: config.head_offset,
        }
    }

    /// Point ranged attacks aim at.
    #[must_use]
    pub fn aim_point(&self) -> Vec2 {
        self.actor.position() + self.head_offset
    }

    /// Snapshot for enemy decisions.
    #[must_use]
    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            id: self.actor.id,
            position: self.actor.position(),
            aim_point: self.aim_point(),
            bounds: self.actor.bounds(),
            active: self.actor.is_alive(),
        }
    }

    /// Casts an ability.
    ///
    /// Fireballs and boulders return the projectile for the caller to add
    /// to the world. `target` is the boulder drop point; without one the
    /// boulder drops ahead of the player.
    pub fn cast(
        &mut self,
        kind: AbilityKind,
        now: f32,
        target: Option<Vec2>,
        config: &AbilityConfig,
        events: &EventBus,
    ) -> Result<Option<Projectile>, AbilityError> {
        if !self.actor.is_alive() {
            return Err(AbilityError::PlayerDead);
        }
        self.abilities.check(kind, now, config)?;

        let projectile = match kind {
            AbilityKind::Fireball => {
                let origin = self.actor.position()
                    + Vec2::new(self.actor.facing * config.fireball_spawn_offset, 0.0);
                self.abilities.record_fireball(now);
                Some(
                    Projectile::new(
                        self.actor.id,
                        ProjectileKind::Fireball,
                        origin,
                        Vec2::new(self.actor.facing * config.fireball_speed, 0.0),
                        config.fireball_damage,
                        config.fireball_lifetime,
                    )
                    .with_radius(config.fireball_radius)
                    .stopping_on_terrain(),
                )
            },
            AbilityKind::IceShield => {
                let shield = self
                    .actor
                    .shield_mut()
                    .ok_or(AbilityError::NoShield)?;
                shield.raise(config.shield_duration, config.shield_fade)?;
                events.publish(GameEvent::ShieldRaised {
                    actor: self.actor.id,
                });
                None
            },
            AbilityKind::Boulder => {
                let drop_point = target.unwrap_or_else(|| {
                    self.actor.position()
                        + Vec2::new(
                            self.actor.facing * config.boulder_default_offset.x,
                            config.boulder_default_offset.y,
                        )
                });
                Some(
                    Projectile::new(
                        self.actor.id,
                        ProjectileKind::Boulder,
                        drop_point,
                        Vec2::ZERO,
                        config.boulder_damage,
                        config.boulder_lifetime,
                    )
                    .with_radius(config.boulder_radius)
                    .with_gravity_scale(1.0)
                    .with_arm_delay(config.boulder_arm_delay)
                    .passing_through()
                    .landing_on_terrain(config.boulder_linger),
                )
            },
        };

        events.publish(GameEvent::AbilityCast { ability: kind });
        Ok(projectile)
    }
}

impl Damageable for Player {
    fn actor(&self) -> &Actor {
        &self.actor
    }

    fn actor_mut(&mut self) -> &mut Actor {
        &mut self.actor
    }
}
