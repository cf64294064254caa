//! Collision-to-damage resolution.
//!
//! The physics world only reports that two things touched. This module
//! decides whether that touch hurts, who it hurts and what else happens:
//! shields break, projectiles are consumed, players landing on a walker
//! are pushed off instead of hurt.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use runefall_common::EntityId;

use crate::actor::{Actor, Damageable, EnemyKind};
use crate::enemy::Enemy;
use crate::events::{EventBus, GameEvent};
use crate::health::HealthChange;
use crate::invincibility::InvincibilitySource;
use crate::physics::BodyControl;
use crate::player::Player;
use crate::projectile::Projectile;

/// Configuration for collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Invincibility granted when a shield absorbs a hit
    pub shield_break_invincibility: f32,
    /// Minimum upward contact normal that counts as landing on an enemy
    pub landing_normal_threshold: f32,
    /// Horizontal push-off speed after landing on an enemy
    pub slide_force: f32,
    /// Downward push-off speed after landing on an enemy
    pub downward_force: f32,
    /// How long the player and the enemy ignore each other after a landing
    pub landing_ignore_duration: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            shield_break_invincibility: 1.0,
            landing_normal_threshold: 0.7,
            slide_force: 8.0,
            downward_force: 6.0,
            landing_ignore_duration: 0.1,
        }
    }
}

/// Where incoming damage comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HitSource {
    /// Body contact with another actor
    Contact {
        /// Attacking actor
        attacker: EntityId,
        /// Damage amount
        amount: f32,
        /// Whether the attacker could deal contact damage at the time
        enabled: bool,
    },
    /// Projectile overlap
    Projectile {
        /// Projectile ID
        projectile: EntityId,
        /// Actor that fired it
        owner: EntityId,
        /// Damage amount
        amount: f32,
    },
    /// Guaranteed proximity strike from a homing enemy
    Strike {
        /// Attacking actor
        attacker: EntityId,
        /// Damage amount
        amount: f32,
    },
}

impl HitSource {
    /// Contact hit from `attacker`, capturing its current contact damage.
    #[must_use]
    pub fn contact(attacker: &Actor) -> Self {
        Self::Contact {
            attacker: attacker.id,
            amount: attacker.contact_damage(),
            enabled: attacker.can_deal_contact_damage(),
        }
    }

    /// Hit from a projectile.
    #[must_use]
    pub fn projectile(projectile: &Projectile) -> Self {
        Self::Projectile {
            projectile: projectile.id,
            owner: projectile.owner,
            amount: projectile.damage,
        }
    }

    /// Damage carried by the source.
    #[must_use]
    pub fn amount(&self) -> f32 {
        match *self {
            Self::Contact { amount, .. }
            | Self::Projectile { amount, .. }
            | Self::Strike { amount, .. } => amount,
        }
    }

    /// Actor responsible for the hit.
    #[must_use]
    pub fn attacker(&self) -> EntityId {
        match *self {
            Self::Contact { attacker, .. } | Self::Strike { attacker, .. } => attacker,
            Self::Projectile { owner, .. } => owner,
        }
    }
}

/// Why a hit had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// Target already dead
    TargetDead,
    /// Target invincible
    Invincible,
    /// Attacker cannot currently deal contact damage
    ContactDisabled,
    /// Target was hit too recently
    Cooldown,
    /// Zero, negative or non-finite damage
    NoDamage,
    /// Projectile already hit this target or is not dangerous
    AlreadyHit,
}

/// Result of resolving a hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HitOutcome {
    /// Nothing happened
    Ignored(IgnoreReason),
    /// A shield absorbed the hit
    ShieldBroken,
    /// Damage was applied
    Damaged {
        /// Damage dealt
        amount: f32,
        /// Whether the hit was lethal
        died: bool,
    },
}

impl HitOutcome {
    /// Returns true if health was reduced.
    #[must_use]
    pub fn is_damage(&self) -> bool {
        matches!(self, Self::Damaged { .. })
    }
}

/// Contact reported by the physics world between the player and an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Surface normal pointing from the enemy toward the player
    pub normal: Vec2,
}

impl Contact {
    /// Creates a contact with the given normal.
    #[must_use]
    pub fn new(normal: Vec2) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
        }
    }
}

/// Result of a player/enemy contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ContactOutcome {
    /// The pair is temporarily ignoring each other
    PairIgnored,
    /// The player landed on the enemy and was pushed off
    Landed,
    /// The enemy's contact damage was resolved
    Hit(HitOutcome),
}

/// Timed collision suppression between pairs of actors.
#[derive(Debug, Clone, Default)]
pub struct IgnoredPairs {
    pairs: HashMap<(EntityId, EntityId), f32>,
}

impl IgnoredPairs {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Ignores contacts between `a` and `b` for `duration` seconds.
    pub fn insert(&mut self, a: EntityId, b: EntityId, duration: f32) {
        if duration > 0.0 {
            self.pairs.insert(Self::key(a, b), duration);
        }
    }

    /// Whether contacts between `a` and `b` are currently ignored.
    #[must_use]
    pub fn is_ignored(&self, a: EntityId, b: EntityId) -> bool {
        self.pairs.contains_key(&Self::key(a, b))
    }

    /// Counts down and forgets expired pairs.
    pub fn tick(&mut self, dt: f32) {
        self.pairs.retain(|_, remaining| {
            *remaining -= dt;
            *remaining > 0.0
        });
    }

    /// Forgets every pair involving `actor`.
    pub fn forget(&mut self, actor: EntityId) {
        self.pairs.retain(|(a, b), _| *a != actor && *b != actor);
    }

    /// Number of ignored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pairs are ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Applies the damage policy.
#[derive(Debug, Clone, Default)]
pub struct CollisionResolver {
    config: ResolverConfig,
}

impl CollisionResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves a single hit against `target`.
    ///
    /// Guards run in order: dead target, shield, invincibility, disabled
    /// contact damage, empty damage, hit cooldown. Only a hit that passes
    /// all of them reduces health and starts post-hit invincibility.
    pub fn resolve_hit<T: Damageable + ?Sized>(
        &self,
        source: HitSource,
        target: &mut T,
        now: f32,
        events: &EventBus,
    ) -> HitOutcome {
        if !target.is_alive() {
            return HitOutcome::Ignored(IgnoreReason::TargetDead);
        }

        if target.actor().shield_up() {
            let actor = target.actor_mut();
            actor.break_shield(events);
            actor.grant_invincibility(
                self.config.shield_break_invincibility,
                InvincibilitySource::Shield,
                events,
            );
            debug!("{} shield absorbed hit from {}", actor.id, source.attacker());
            return HitOutcome::ShieldBroken;
        }

        if target.actor().blocks_damage() {
            return HitOutcome::Ignored(IgnoreReason::Invincible);
        }

        if let HitSource::Contact { enabled: false, .. } = source {
            return HitOutcome::Ignored(IgnoreReason::ContactDisabled);
        }

        let amount = source.amount();
        if !amount.is_finite() || amount <= 0.0 {
            return HitOutcome::Ignored(IgnoreReason::NoDamage);
        }

        if !target.actor_mut().try_consume_cooldown(now) {
            return HitOutcome::Ignored(IgnoreReason::Cooldown);
        }

        events.publish(GameEvent::ActorHit {
            target: target.actor().id,
            source: source.attacker(),
            amount,
        });
        let died = target.take_damage(amount, events) == HealthChange::Died;

        if !died {
            let actor = target.actor_mut();
            let window = actor.post_hit_invincibility();
            actor.grant_invincibility(window, InvincibilitySource::Damage, events);
        }

        HitOutcome::Damaged { amount, died }
    }

    /// Resolves a projectile overlapping `target`.
    ///
    /// The projectile is consumed whatever the outcome unless it passes
    /// through, in which case it never hits the same actor twice.
    pub fn resolve_projectile_hit<T: Damageable + ?Sized>(
        &self,
        projectile: &mut Projectile,
        target: &mut T,
        now: f32,
        events: &EventBus,
    ) -> HitOutcome {
        let target_id = target.actor().id;
        if !projectile.can_hit(target_id) {
            return HitOutcome::Ignored(IgnoreReason::AlreadyHit);
        }

        let outcome = self.resolve_hit(HitSource::projectile(projectile), target, now, events);
        projectile.register_hit(target_id);
        outcome
    }

    /// Resolves body contact between the player and an enemy.
    pub fn resolve_player_contact(
        &self,
        player: &mut Player,
        enemy: &mut Enemy,
        contact: Contact,
        ignored: &mut IgnoredPairs,
        now: f32,
        events: &EventBus,
    ) -> ContactOutcome {
        let player_id = player.actor.id;
        let enemy_id = enemy.actor().id;
        if ignored.is_ignored(player_id, enemy_id) {
            return ContactOutcome::PairIgnored;
        }

        if self.is_landing(player, enemy, contact) {
            let dx = player.actor.position().x - enemy.actor().position().x;
            let side = if dx.abs() > f32::EPSILON {
                dx.signum()
            } else {
                enemy.actor().facing
            };
            player.actor.body.set_velocity(Vec2::new(
                side * self.config.slide_force,
                -self.config.downward_force,
            ));
            ignored.insert(player_id, enemy_id, self.config.landing_ignore_duration);
            events.publish(GameEvent::PlayerLanded {
                player: player_id,
                enemy: enemy_id,
            });
            debug!("player landed on {}, pushing off", enemy_id);
            return ContactOutcome::Landed;
        }

        let outcome = self.resolve_hit(HitSource::contact(enemy.actor()), player, now, events);
        enemy.on_player_contact();
        ContactOutcome::Hit(outcome)
    }

    fn is_landing(&self, player: &Player, enemy: &Enemy, contact: Contact) -> bool {
        enemy.kind() == EnemyKind::GroundPatrol
            && enemy.actor().is_alive()
            && contact.normal.y >= self.config.landing_normal_threshold
            && player.actor.body.velocity.y < 0.0
    }
}
