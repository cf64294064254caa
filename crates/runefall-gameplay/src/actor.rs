//! Actors: the damage-taking half of every player and enemy.
//!
//! An [`Actor`] composes a [`Health`] pool with the optional damage gates
//! (invincibility, hit cooldown, shield) and the body the physics world
//! integrates. It turns raw state changes into [`GameEvent`]s.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::info;

use runefall_common::EntityId;

use crate::cooldown::DamageCooldown;
use crate::events::{EventBus, GameEvent};
use crate::health::{Health, HealthChange};
use crate::invincibility::{Invincibility, InvincibilitySource};
use crate::physics::{Body, BodyControl, AABB};
use crate::shield::Shield;

/// Enemy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Walks platforms and chases the player
    GroundPatrol,
    /// Floating rune that charges and homes in on the player
    HomingCharge,
    /// Teleporting ranged boss
    Boss,
}

impl EnemyKind {
    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::GroundPatrol => "Zombie",
            Self::HomingCharge => "Rune",
            Self::Boss => "Boss",
        }
    }
}

/// Which side an actor fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// The player character
    Player,
    /// An enemy
    Enemy(EnemyKind),
}

/// Damage-taking state shared by the player and enemies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    /// Unique ID
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Player or enemy kind
    pub kind: ActorKind,
    /// Physics body
    pub body: Body,
    /// Horizontal facing: `1.0` right, `-1.0` left
    pub facing: f32,
    health: Health,
    invincibility: Option<Invincibility>,
    cooldown: Option<DamageCooldown>,
    shield: Option<Shield>,
    contact_damage: f32,
    contact_damage_enabled: bool,
    post_hit_invincibility: f32,
}

impl Actor {
    /// Creates an actor with full health and no damage gates.
    #[must_use]
    pub fn new(kind: ActorKind, name: impl Into<String>, body: Body, max_health: f32) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            kind,
            body,
            facing: 1.0,
            health: Health::new(max_health),
            invincibility: None,
            cooldown: None,
            shield: None,
            contact_damage: 0.0,
            contact_damage_enabled: false,
            post_hit_invincibility: 0.0,
        }
    }

    /// Adds an invincibility controller granted for `duration` after each hit.
    #[must_use]
    pub fn with_invincibility(mut self, duration: f32) -> Self {
        self.invincibility = Some(Invincibility::new());
        self.post_hit_invincibility = duration.max(0.0);
        self
    }

    /// Adds a hit cooldown with the given window.
    #[must_use]
    pub fn with_cooldown(mut self, window: f32) -> Self {
        self.cooldown = Some(DamageCooldown::new(window));
        self
    }

    /// Adds a (lowered) shield.
    #[must_use]
    pub fn with_shield(mut self) -> Self {
        self.shield = Some(Shield::new());
        self
    }

    /// Deals `amount` damage to whatever this actor touches.
    #[must_use]
    pub fn with_contact_damage(mut self, amount: f32) -> Self {
        self.contact_damage = amount;
        self.contact_damage_enabled = amount > 0.0;
        self
    }

    /// Health pool.
    #[must_use]
    pub fn health(&self) -> &Health {
        &self.health
    }

    /// Whether health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    /// Position of the body.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.body.position()
    }

    /// Collision bounds of the body.
    #[must_use]
    pub fn bounds(&self) -> AABB {
        self.body.bounds()
    }

    /// Contact damage amount.
    #[must_use]
    pub fn contact_damage(&self) -> f32 {
        self.contact_damage
    }

    /// Turns contact damage on or off without changing the amount.
    pub fn set_contact_damage_enabled(&mut self, enabled: bool) {
        self.contact_damage_enabled = enabled;
    }

    /// True only when the flag is set, the actor is alive and its collider
    /// is enabled.
    #[must_use]
    pub fn can_deal_contact_damage(&self) -> bool {
        self.contact_damage_enabled && self.is_alive() && self.body.collider_enabled()
    }

    /// Post-hit invincibility duration.
    #[must_use]
    pub fn post_hit_invincibility(&self) -> f32 {
        self.post_hit_invincibility
    }

    /// Invincibility controller, if the actor has one.
    #[must_use]
    pub fn invincibility(&self) -> Option<&Invincibility> {
        self.invincibility.as_ref()
    }

    /// Whether an invincibility window is running.
    #[must_use]
    pub fn blocks_damage(&self) -> bool {
        self.invincibility
            .as_ref()
            .is_some_and(Invincibility::blocks_damage)
    }

    /// Shield, if the actor has one.
    #[must_use]
    pub fn shield(&self) -> Option<&Shield> {
        self.shield.as_ref()
    }

    /// Mutable shield access.
    pub fn shield_mut(&mut self) -> Option<&mut Shield> {
        self.shield.as_mut()
    }

    /// Whether a shield is currently absorbing hits.
    #[must_use]
    pub fn shield_up(&self) -> bool {
        self.shield.as_ref().is_some_and(Shield::is_up)
    }

    /// Breaks a raised shield. Returns whether one was up.
    pub fn break_shield(&mut self, events: &EventBus) -> bool {
        let broke = self.shield.as_mut().is_some_and(Shield::break_shield);
        if broke {
            events.publish(GameEvent::ShieldBroken { actor: self.id });
        }
        broke
    }

    /// Consumes the hit cooldown. Actors without one always accept.
    pub fn try_consume_cooldown(&mut self, now: f32) -> bool {
        self.cooldown
            .as_mut()
            .map_or(true, |cooldown| cooldown.try_consume(now))
    }

    /// Starts an invincibility window if the actor has a controller.
    pub fn grant_invincibility(
        &mut self,
        duration: f32,
        source: InvincibilitySource,
        events: &EventBus,
    ) -> bool {
        let Some(invincibility) = self.invincibility.as_mut() else {
            return false;
        };
        let started = invincibility.grant(duration, source);
        if started {
            events.publish(GameEvent::InvincibilityStarted {
                actor: self.id,
                source,
            });
        }
        started
    }

    /// Applies damage to the health pool and reports the change.
    pub fn apply_damage(&mut self, amount: f32, events: &EventBus) -> HealthChange {
        let change = self.health.take_damage(amount);
        self.publish_change(change, events);
        change
    }

    fn publish_change(&self, change: HealthChange, events: &EventBus) {
        match change {
            HealthChange::Damaged { .. } | HealthChange::Healed { .. } => {
                events.publish(GameEvent::HealthChanged {
                    actor: self.id,
                    current: self.health.current(),
                    max: self.health.max(),
                });
            },
            HealthChange::Died => {
                info!("{} {} died", self.name, self.id);
                events.publish(GameEvent::HealthChanged {
                    actor: self.id,
                    current: 0.0,
                    max: self.health.max(),
                });
                events.publish(GameEvent::Died { actor: self.id });
            },
            HealthChange::Unchanged => {},
        }
    }

    /// Advances invincibility and shield timers.
    pub fn tick_timers(&mut self, dt: f32, events: &EventBus) {
        if self.invincibility.as_mut().is_some_and(|inv| inv.tick(dt)) {
            events.publish(GameEvent::InvincibilityEnded { actor: self.id });
        }
        if self.shield.as_mut().is_some_and(|shield| shield.tick(dt)) {
            events.publish(GameEvent::ShieldExpired { actor: self.id });
        }
    }

    /// Sets facing from the sign of a horizontal velocity or offset.
    pub fn face(&mut self, dx: f32) {
        if dx > 0.0 {
            self.facing = 1.0;
        } else if dx < 0.0 {
            self.facing = -1.0;
        }
    }
}

/// Anything the collision resolver can damage.
///
/// Implementors may override [`Damageable::take_damage`] to react to hits
/// (enemies switch state or die).
pub trait Damageable {
    /// Shared damage state.
    fn actor(&self) -> &Actor;

    /// Mutable shared damage state.
    fn actor_mut(&mut self) -> &mut Actor;

    /// Applies damage.
    fn take_damage(&mut self, amount: f32, events: &EventBus) -> HealthChange {
        self.actor_mut().apply_damage(amount, events)
    }

    /// Whether the target is alive.
    fn is_alive(&self) -> bool {
        self.actor().is_alive()
    }
}

impl Damageable for Actor {
    fn actor(&self) -> &Actor {
        self
    }

    fn actor_mut(&mut self) -> &mut Actor {
        self
    }
}
