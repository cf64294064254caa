//! Homing charge AI for rune enemies.
//!
//! A rune floats in place until it is on screen and no other rune has
//! attacked recently. It then charges up, launches itself at the player
//! and strikes once it gets close enough, destroying itself either way.
//! The strike does not rely on the physics world reporting a contact: a
//! fast rune can tunnel through a thin target between steps.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use runefall_common::EntityId;

use crate::actor::{Actor, EnemyKind};
use crate::cooldown::FactionCooldowns;
use crate::events::{EventBus, GameEvent};
use crate::physics::{BodyControl, PhysicsWorld};
use crate::player::TargetSnapshot;

/// Homing charge tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomingChargeConfig {
    /// Homing speed
    pub charge_speed: f32,
    /// Seconds spent charging before launching
    pub charge_delay: f32,
    /// Distance at which the strike lands
    pub proximity_threshold: f32,
    /// Seconds between charges across every rune
    pub attack_cooldown: f32,
    /// Strike and contact damage
    pub damage: f32,
    /// Maximum health
    pub max_health: f32,
    /// Half width and half height of the body
    pub half_extents: Vec2,
}

impl Default for HomingChargeConfig {
    fn default() -> Self {
        Self {
            charge_speed: 15.0,
            charge_delay: 3.0,
            proximity_threshold: 0.5,
            attack_cooldown: 5.0,
            damage: 2.0,
            max_health: 1.0,
            half_extents: Vec2::splat(0.3),
        }
    }
}

/// Homing charge states.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChargeState {
    /// Waiting for a chance to attack
    Idle,
    /// Charging up
    Charging {
        /// Seconds until launch
        remaining: f32,
    },
    /// Flying at the target
    Homing,
    /// Finished; waiting to be removed
    Spent,
}

/// A guaranteed hit produced by a rune reaching its target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strike {
    /// Rune that struck
    pub attacker: EntityId,
    /// Actor struck
    pub target: EntityId,
    /// Damage
    pub damage: f32,
}

/// Homing charge decision state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomingChargeAI {
    config: HomingChargeConfig,
    state: ChargeState,
}

impl HomingChargeAI {
    /// Creates an idle rune.
    #[must_use]
    pub fn new(config: HomingChargeConfig) -> Self {
        Self {
            config,
            state: ChargeState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ChargeState {
        self.state
    }

    /// Tuning.
    #[must_use]
    pub fn config(&self) -> &HomingChargeConfig {
        &self.config
    }

    /// Whether the rune is done and should be removed.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.state == ChargeState::Spent
    }

    /// Frame-rate decisions: trigger and charge countdown.
    #[allow(clippy::too_many_arguments)]
    pub fn frame_tick<W: PhysicsWorld + ?Sized>(
        &mut self,
        actor: &Actor,
        world: &W,
        target: Option<&TargetSnapshot>,
        now: f32,
        dt: f32,
        cooldowns: &mut FactionCooldowns,
        events: &EventBus,
    ) {
        match self.state {
            ChargeState::Idle => {
                let Some(_target) = target.filter(|t| t.active) else {
                    return;
                };
                if !world.in_view(&actor.bounds()) {
                    return;
                }
                if !cooldowns.try_claim(EnemyKind::HomingCharge, now, self.config.attack_cooldown) {
                    return;
                }
                debug!("{} charging", actor.id);
                self.state = ChargeState::Charging {
                    remaining: self.config.charge_delay,
                };
                events.publish(GameEvent::ChargeStarted { actor: actor.id });
            },
            ChargeState::Charging { remaining } => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    self.state = ChargeState::Homing;
                    events.publish(GameEvent::ChargeReleased { actor: actor.id });
                } else {
                    self.state = ChargeState::Charging { remaining };
                }
            },
            ChargeState::Homing | ChargeState::Spent => {},
        }
    }

    /// Physics-step homing. Returns a strike when the rune reaches its target.
    pub fn fixed_tick(
        &mut self,
        actor: &mut Actor,
        target: Option<&TargetSnapshot>,
    ) -> Option<Strike> {
        match self.state {
            ChargeState::Homing => {},
            ChargeState::Spent => return None,
            ChargeState::Idle | ChargeState::Charging { .. } => {
                actor.body.set_velocity(Vec2::ZERO);
                return None;
            },
        }

        let Some(target) = target.filter(|t| t.active) else {
            warn!("{} lost its target, self-destructing", actor.id);
            self.spend(actor);
            return None;
        };

        let offset = target.position - actor.position();
        if offset.length() < self.config.proximity_threshold {
            self.spend(actor);
            return Some(Strike {
                attacker: actor.id,
                target: target.id,
                damage: self.config.damage,
            });
        }

        let direction = offset.normalize_or_zero();
        actor.face(direction.x);
        actor.body.set_velocity(direction * self.config.charge_speed);
        None
    }

    /// Any contact with the player uses the rune up.
    pub fn on_player_contact(&mut self, actor: &mut Actor) {
        self.spend(actor);
    }

    /// Death uses the rune up.
    pub fn on_death(&mut self, actor: &mut Actor) {
        self.spend(actor);
    }

    fn spend(&mut self, actor: &mut Actor) {
        self.state = ChargeState::Spent;
        actor.body.set_velocity(Vec2::ZERO);
        actor.body.set_collider_enabled(false);
        actor.set_contact_damage_enabled(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorKind;
    use crate::physics::{Body, StaticWorld, AABB};

    fn rune(position: Vec2) -> (Actor, HomingChargeAI) {
        let config = HomingChargeConfig::default();
        let actor = Actor::new(
            ActorKind::Enemy(EnemyKind::HomingCharge),
            "Rune",
            Body::new(position, config.half_extents).with_gravity_scale(0.0),
            config.max_health,
        )
        .with_contact_damage(config.damage);
        (actor, HomingChargeAI::new(config))
    }

    fn target_at(position: Vec2) -> TargetSnapshot {
        TargetSnapshot {
            id: EntityId::from_raw(1),
            position,
            aim_point: position,
            bounds: AABB::from_center(position, Vec2::splat(0.4)),
            active: true,
        }
    }

    #[test]
    fn test_charge_then_home_then_strike() {
        let bus = EventBus::default();
        let world = StaticWorld::new(0.0);
        let mut cooldowns = FactionCooldowns::new();
        let (mut actor, mut ai) = rune(Vec2::new(5.0, 0.0));
        let target = target_at(Vec2::ZERO);

        ai.frame_tick(&actor, &world, Some(&target), 0.0, 0.1, &mut cooldowns, &bus);
        assert!(matches!(ai.state(), ChargeState::Charging { .. }));

        ai.frame_tick(&actor, &world, Some(&target), 2.0, 2.0, &mut cooldowns, &bus);
        assert!(ai.fixed_tick(&mut actor, Some(&target)).is_none());
        assert_eq!(actor.body.velocity, Vec2::ZERO);

        ai.frame_tick(&actor, &world, Some(&target), 3.1, 1.1, &mut cooldowns, &bus);
        assert_eq!(ai.state(), ChargeState::Homing);

        let mut strike = None;
        for _ in 0..120 {
            strike = ai.fixed_tick(&mut actor, Some(&target));
            if strike.is_some() {
                break;
            }
            world.integrate(&mut actor.body, 1.0 / 60.0);
        }
        let strike = strike.expect("rune should reach the target");
        assert_eq!(strike.damage, 2.0);
        assert!(ai.is_spent());

        let names: Vec<_> = bus.drain().iter().map(GameEvent::name).collect();
        assert_eq!(names, vec!["charge_started", "charge_released"]);
    }

    #[test]
    fn test_kind_cooldown_blocks_siblings() {
        let bus = EventBus::default();
        let world = StaticWorld::new(0.0);
        let mut cooldowns = FactionCooldowns::new();
        let (first_actor, mut first) = rune(Vec2::new(5.0, 0.0));
        let (second_actor, mut second) = rune(Vec2::new(-5.0, 0.0));
        let target = target_at(Vec2::ZERO);

        first.frame_tick(&first_actor, &world, Some(&target), 0.0, 0.1, &mut cooldowns, &bus);
        second.frame_tick(&second_actor, &world, Some(&target), 0.0, 0.1, &mut cooldowns, &bus);
        assert!(matches!(first.state(), ChargeState::Charging { .. }));
        assert_eq!(second.state(), ChargeState::Idle);

        second.frame_tick(&second_actor, &world, Some(&target), 4.9, 0.1, &mut cooldowns, &bus);
        assert_eq!(second.state(), ChargeState::Idle);
        second.frame_tick(&second_actor, &world, Some(&target), 5.0, 0.1, &mut cooldowns, &bus);
        assert!(matches!(second.state(), ChargeState::Charging { .. }));
    }

    #[test]
    fn test_offscreen_rune_waits() {
        let bus = EventBus::default();
        let mut world = StaticWorld::new(0.0);
        world.set_viewport(Some(AABB::new(-2.0, -2.0, 2.0, 2.0)));
        let mut cooldowns = FactionCooldowns::new();
        let (actor, mut ai) = rune(Vec2::new(10.0, 0.0));
        let target = target_at(Vec2::ZERO);

        ai.frame_tick(&actor, &world, Some(&target), 0.0, 0.1, &mut cooldowns, &bus);
        assert_eq!(ai.state(), ChargeState::Idle);
        // the shared cooldown was not claimed
        assert!(cooldowns.ready(EnemyKind::HomingCharge, 0.0, 5.0));
    }

    #[test]
    fn test_no_target_no_charge() {
        let bus = EventBus::default();
        let world = StaticWorld::new(0.0);
        let mut cooldowns = FactionCooldowns::new();
        let (actor, mut ai) = rune(Vec2::ZERO);
        ai.frame_tick(&actor, &world, None, 0.0, 0.1, &mut cooldowns, &bus);
        assert_eq!(ai.state(), ChargeState::Idle);
    }

    #[test]
    fn test_lost_target_self_destructs() {
        let (mut actor, mut ai) = rune(Vec2::ZERO);
        ai.state = ChargeState::Homing;
        let mut gone = target_at(Vec2::new(3.0, 0.0));
        gone.active = false;
        assert!(ai.fixed_tick(&mut actor, Some(&gone)).is_none());
        assert!(ai.is_spent());
        assert!(!actor.can_deal_contact_damage());
    }
}
