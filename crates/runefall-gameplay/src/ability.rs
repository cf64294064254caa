//! Player abilities: fireball, ice shield and boulder.
//!
//! Abilities are learned from pickups placed in the level. Casting checks
//! are pure: a failed cast returns an [`AbilityError`] and leaves the
//! simulation untouched.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use runefall_common::EntityId;

use crate::events::{EventBus, GameEvent};
use crate::physics::AABB;

/// Learnable abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Straight-flying projectile
    Fireball,
    /// Absorbs one hit
    IceShield,
    /// Heavy rock dropped onto a point
    Boulder,
}

impl AbilityKind {
    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fireball => "Fireball",
            Self::IceShield => "Ice Shield",
            Self::Boulder => "Boulder",
        }
    }
}

/// Why a cast was refused.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AbilityError {
    /// The player has not picked up this ability
    #[error("{} has not been learned", .0.display_name())]
    NotLearned(AbilityKind),
    /// The ability is recharging
    #[error("ability on cooldown for {remaining:.2}s")]
    OnCooldown {
        /// Seconds until ready
        remaining: f32,
    },
    /// The shield is still up or fading
    #[error("shield is already active")]
    ShieldAlreadyActive,
    /// The caster carries no shield to raise
    #[error("no shield to raise")]
    NoShield,
    /// Dead players cannot cast
    #[error("player is dead")]
    PlayerDead,
}

/// Tuning for player abilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    /// Fireball speed
    pub fireball_speed: f32,
    /// Fireball lifetime
    pub fireball_lifetime: f32,
    /// Seconds between fireballs
    pub fireball_cooldown: f32,
    /// Fireball damage
    pub fireball_damage: f32,
    /// Fireball collision radius
    pub fireball_radius: f32,
    /// Horizontal spawn distance in front of the player
    pub fireball_spawn_offset: f32,
    /// Seconds the shield is fully up
    pub shield_duration: f32,
    /// Seconds the shield takes to fade
    pub shield_fade: f32,
    /// Boulder damage
    pub boulder_damage: f32,
    /// Seconds the boulder hangs before falling
    pub boulder_arm_delay: f32,
    /// Boulder lifetime while falling
    pub boulder_lifetime: f32,
    /// Seconds a landed boulder stays before vanishing
    pub boulder_linger: f32,
    /// Boulder collision radius
    pub boulder_radius: f32,
    /// Default drop point relative to the player when no target is given
    pub boulder_default_offset: Vec2,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            fireball_speed: 10.0,
            fireball_lifetime: 3.0,
            fireball_cooldown: 2.0,
            fireball_damage: 1.0,
            fireball_radius: 0.25,
            fireball_spawn_offset: 0.6,
            shield_duration: 1.0,
            shield_fade: 1.0,
            boulder_damage: 3.0,
            boulder_arm_delay: 0.5,
            boulder_lifetime: 5.0,
            boulder_linger: 1.0,
            boulder_radius: 0.5,
            boulder_default_offset: Vec2::new(3.0, 4.0),
        }
    }
}

/// Abilities the player knows, plus the fireball recharge clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbilityBook {
    learned: HashSet<AbilityKind>,
    last_fireball: Option<f32>,
}

impl AbilityBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Learns an ability. Returns `true` the first time only.
    pub fn learn(&mut self, kind: AbilityKind, events: &EventBus) -> bool {
        let learned = self.learned.insert(kind);
        if learned {
            info!("learned ability {}", kind.display_name());
            events.publish(GameEvent::AbilityLearned { ability: kind });
        }
        learned
    }

    /// Whether the ability has been learned.
    #[must_use]
    pub fn knows(&self, kind: AbilityKind) -> bool {
        self.learned.contains(&kind)
    }

    /// Seconds until the fireball is ready again.
    #[must_use]
    pub fn fireball_cooldown_remaining(&self, now: f32, cooldown: f32) -> f32 {
        self.last_fireball
            .map_or(0.0, |last| (cooldown - (now - last)).max(0.0))
    }

    /// Checks that `kind` is learned and not recharging.
    pub fn check(
        &self,
        kind: AbilityKind,
        now: f32,
        config: &AbilityConfig,
    ) -> Result<(), AbilityError> {
        if !self.knows(kind) {
            return Err(AbilityError::NotLearned(kind));
        }
        if kind == AbilityKind::Fireball {
            let remaining = self.fireball_cooldown_remaining(now, config.fireball_cooldown);
            if remaining > 0.0 {
                return Err(AbilityError::OnCooldown { remaining });
            }
        }
        Ok(())
    }

    /// Starts the fireball recharge.
    pub fn record_fireball(&mut self, now: f32) {
        self.last_fireball = Some(now);
    }
}

/// A volume that teaches one ability to the first player touching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityPickup {
    /// Unique ID
    pub id: EntityId,
    /// Ability granted
    pub kind: AbilityKind,
    /// Trigger volume
    pub volume: AABB,
    collected: bool,
}

impl AbilityPickup {
    /// Creates a pickup.
    #[must_use]
    pub fn new(kind: AbilityKind, volume: AABB) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            volume,
            collected: false,
        }
    }

    /// Whether the pickup has been used.
    #[must_use]
    pub fn is_collected(&self) -> bool {
        self.collected
    }

    /// Teaches the ability if `bounds` overlaps the volume.
    ///
    /// Returns `true` when the pickup was consumed.
    pub fn try_collect(
        &mut self,
        bounds: &AABB,
        book: &mut AbilityBook,
        events: &EventBus,
    ) -> bool {
        if self.collected || !self.volume.overlaps(bounds) {
            return false;
        }
        self.collected = true;
        book.learn(self.kind, events);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learn_once() {
        let bus = EventBus::default();
        let mut book = AbilityBook::new();
        assert!(book.learn(AbilityKind::Fireball, &bus));
        assert!(!book.learn(AbilityKind::Fireball, &bus));
        assert_eq!(bus.drain().len(), 1);
        assert!(book.knows(AbilityKind::Fireball));
        assert!(!book.knows(AbilityKind::Boulder));
    }

    #[test]
    fn test_fireball_cooldown() {
        let bus = EventBus::default();
        let config = AbilityConfig::default();
        let mut book = AbilityBook::new();
        assert_eq!(
            book.check(AbilityKind::Fireball, 0.0, &config),
            Err(AbilityError::NotLearned(AbilityKind::Fireball))
        );

        book.learn(AbilityKind::Fireball, &bus);
        assert!(book.check(AbilityKind::Fireball, 0.0, &config).is_ok());
        book.record_fireball(0.0);

        match book.check(AbilityKind::Fireball, 1.5, &config) {
            Err(AbilityError::OnCooldown { remaining }) => assert!((remaining - 0.5).abs() < 1e-5),
            other => panic!("expected cooldown, got {other:?}"),
        }
        assert!(book.check(AbilityKind::Fireball, 2.0, &config).is_ok());
    }

    #[test]
    fn test_pickup_consumed_once() {
        let bus = EventBus::default();
        let mut book = AbilityBook::new();
        let mut pickup = AbilityPickup::new(AbilityKind::Boulder, AABB::new(0.0, 0.0, 1.0, 1.0));

        let far = AABB::new(5.0, 5.0, 6.0, 6.0);
        assert!(!pickup.try_collect(&far, &mut book, &bus));

        let near = AABB::new(0.5, 0.5, 1.5, 1.5);
        assert!(pickup.try_collect(&near, &mut book, &bus));
        assert!(pickup.is_collected());
        assert!(book.knows(AbilityKind::Boulder));
        assert!(!pickup.try_collect(&near, &mut book, &bus));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AbilityError::NotLearned(AbilityKind::IceShield).to_string(),
            "Ice Shield has not been learned"
        );
        assert_eq!(
            AbilityError::OnCooldown { remaining: 1.25 }.to_string(),
            "ability on cooldown for 1.25s"
        );
    }
}
