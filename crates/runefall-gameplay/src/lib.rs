//! # Runefall Gameplay
//!
//! Combat and enemy AI for Runefall.
//!
//! This crate provides the simulation side of a fight:
//! - Health, invincibility windows, hit cooldowns and the ice shield
//! - Collision response (who damages whom, landing on enemies)
//! - Enemy behaviour: walking patrol, homing rune, teleporting boss
//! - Player abilities and projectiles
//! - Encounter driver and event bus for inter-system communication
//!
//! Physics is abstracted behind [`PhysicsWorld`]; [`StaticWorld`] is a
//! small platform world for hosts without their own engine.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ability;
pub mod actor;
pub mod boss;
pub mod collision_response;
pub mod cooldown;
pub mod encounter;
pub mod enemy;
pub mod events;
pub mod ground_patrol;
pub mod health;
pub mod homing_charge;
pub mod invincibility;
pub mod physics;
pub mod player;
pub mod projectile;
pub mod shield;
pub mod tuning;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ability::*;
    pub use crate::actor::*;
    pub use crate::boss::*;
    pub use crate::collision_response::*;
    pub use crate::cooldown::*;
    pub use crate::encounter::*;
    pub use crate::enemy::*;
    pub use crate::events::*;
    pub use crate::ground_patrol::*;
    pub use crate::health::*;
    pub use crate::homing_charge::*;
    pub use crate::invincibility::*;
    pub use crate::physics::*;
    pub use crate::player::*;
    pub use crate::projectile::*;
    pub use crate::shield::*;
    pub use crate::tuning::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_prelude_exposes_encounter() {
        let mut encounter = Encounter::new(CombatTuning::default(), 3);
        let player = encounter.spawn_player(Vec2::ZERO);
        assert_eq!(encounter.player().map(|p| p.actor.id), Some(player));
        assert!(encounter.drain_events().is_empty());
    }

    #[test]
    fn test_shield_absorbs_one_hit_then_player_takes_damage() {
        let bus = EventBus::default();
        let resolver = CollisionResolver::default();
        let mut player = Player::new(Vec2::ZERO, &PlayerConfig::default());
        player.abilities.learn(AbilityKind::IceShield, &bus);
        let config = AbilityConfig::default();
        assert_eq!(player.cast(AbilityKind::IceShield, 0.0, None, &config, &bus), Ok(None));

        let strike = HitSource::Strike {
            attacker: runefall_common::EntityId::from_raw(u64::MAX),
            amount: 2.0,
        };
        assert_eq!(resolver.resolve_hit(strike, &mut player, 0.0, &bus), HitOutcome::ShieldBroken);
        assert_eq!(player.actor.health().current(), 5.0);

        // shield break grants a short window
        assert!(matches!(
            resolver.resolve_hit(strike, &mut player, 0.5, &bus),
            HitOutcome::Ignored(IgnoreReason::Invincible)
        ));

        let mut timers = 0.0;
        while timers < 1.1 {
            player.actor.tick_timers(0.1, &bus);
            timers += 0.1;
        }
        assert!(resolver.resolve_hit(strike, &mut player, 2.0, &bus).is_damage());
        assert_eq!(player.actor.health().current(), 3.0);
    }
}
