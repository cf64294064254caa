//! Projectiles fired by the boss and by player abilities.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use runefall_common::EntityId;

use crate::physics::{LayerMask, PhysicsWorld, AABB};

/// Projectile types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Boss ranged attack
    BossBolt,
    /// Player fireball
    Fireball,
    /// Player boulder dropped from above
    Boulder,
}

impl ProjectileKind {
    /// Which side this projectile damages.
    #[must_use]
    pub fn target_faction(self) -> TargetFaction {
        match self {
            Self::BossBolt => TargetFaction::Player,
            Self::Fireball | Self::Boulder => TargetFaction::Enemies,
        }
    }
}

/// Who a projectile can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetFaction {
    /// Only the player
    Player,
    /// Only enemies
    Enemies,
}

/// Why a projectile was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestroyReason {
    /// Lifetime ran out
    Expired,
    /// Hit terrain
    Terrain,
    /// Consumed by a hit
    Hit,
    /// Removed by the encounter
    Despawned,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique ID
    pub id: EntityId,
    /// Actor that fired it
    pub owner: EntityId,
    /// Projectile type
    pub kind: ProjectileKind,
    /// Center position
    pub position: Vec2,
    /// Velocity in units per second
    pub velocity: Vec2,
    /// Collision radius
    pub radius: f32,
    /// Seconds until expiry
    pub lifetime: f32,
    /// Damage per hit
    pub damage: f32,
    /// Who it can hit
    pub target: TargetFaction,
    /// Survives hits instead of being consumed
    pub pass_through: bool,
    /// Destroyed when touching ground
    pub stops_on_terrain: bool,
    /// Multiplier on world gravity
    pub gravity_scale: f32,
    /// Seconds spent motionless and harmless before launching
    pub arm_delay: f32,
    landing_linger: Option<f32>,
    landed: bool,
    hit: HashSet<EntityId>,
    destroyed: Option<DestroyReason>,
}

impl Projectile {
    /// Creates a projectile with a straight, gravity-free flight.
    #[must_use]
    pub fn new(
        owner: EntityId,
        kind: ProjectileKind,
        position: Vec2,
        velocity: Vec2,
        damage: f32,
        lifetime: f32,
    ) -> Self {
        Self {
            id: EntityId::new(),
            owner,
            kind,
            position,
            velocity,
            radius: 0.25,
            lifetime,
            damage,
            target: kind.target_faction(),
            pass_through: false,
            stops_on_terrain: false,
            gravity_scale: 0.0,
            arm_delay: 0.0,
            landing_linger: None,
            landed: false,
            hit: HashSet::new(),
            destroyed: None,
        }
    }

    /// Set collision radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Set gravity scale.
    #[must_use]
    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    /// Hold still for `delay` seconds before moving or dealing damage.
    #[must_use]
    pub fn with_arm_delay(mut self, delay: f32) -> Self {
        self.arm_delay = delay.max(0.0);
        self
    }

    /// Survive hits; each actor is still hit at most once.
    #[must_use]
    pub fn passing_through(mut self) -> Self {
        self.pass_through = true;
        self
    }

    /// Destroy on contact with ground.
    #[must_use]
    pub fn stopping_on_terrain(mut self) -> Self {
        self.stops_on_terrain = true;
        self
    }

    /// Come to rest on ground and linger harmlessly for `linger` seconds.
    #[must_use]
    pub fn landing_on_terrain(mut self, linger: f32) -> Self {
        self.landing_linger = Some(linger.max(0.0));
        self
    }

    /// Collision bounds.
    #[must_use]
    pub fn bounds(&self) -> AABB {
        AABB::from_center(self.position, Vec2::splat(self.radius))
    }

    /// Whether the arming delay has elapsed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.arm_delay <= 0.0
    }

    /// Whether the projectile has come to rest.
    #[must_use]
    pub fn has_landed(&self) -> bool {
        self.landed
    }

    /// Whether the projectile can currently deal damage.
    #[must_use]
    pub fn is_dangerous(&self) -> bool {
        self.destroyed.is_none() && self.is_armed() && !self.landed
    }

    /// Whether the projectile may hit this actor.
    #[must_use]
    pub fn can_hit(&self, actor: EntityId) -> bool {
        self.is_dangerous() && actor != self.owner && !self.hit.contains(&actor)
    }

    /// Records contact with an actor, consuming the projectile unless it
    /// passes through.
    pub fn register_hit(&mut self, actor: EntityId) {
        self.hit.insert(actor);
        if !self.pass_through {
            self.destroy(DestroyReason::Hit);
        }
    }

    /// Marks the projectile for removal. The first reason sticks.
    pub fn destroy(&mut self, reason: DestroyReason) {
        if self.destroyed.is_none() {
            self.destroyed = Some(reason);
        }
    }

    /// Removal reason, if marked.
    #[must_use]
    pub fn destroyed(&self) -> Option<DestroyReason> {
        self.destroyed
    }

    /// Advances flight by `dt` under `gravity`.
    pub fn update(&mut self, dt: f32, gravity: f32) {
        if self.destroyed.is_some() || dt <= 0.0 {
            return;
        }

        let mut dt_left = dt;
        if self.arm_delay > 0.0 {
            let armed_by = self.arm_delay.min(dt_left);
            self.arm_delay -= armed_by;
            dt_left -= armed_by;
        }

        if !self.landed && dt_left > 0.0 {
            self.velocity.y -= gravity * self.gravity_scale * dt_left;
            self.position += self.velocity * dt_left;
        }

        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            self.destroy(DestroyReason::Expired);
        }
    }

    /// Applies terrain contact: destroys, lands or ignores.
    pub fn check_terrain<W: PhysicsWorld + ?Sized>(&mut self, world: &W) {
        if self.destroyed.is_some() || self.landed || !self.is_armed() {
            return;
        }
        if world.overlaps_at(self.bounds(), LayerMask::GROUND).is_none() {
            return;
        }

        if let Some(linger) = self.landing_linger {
            self.landed = true;
            self.velocity = Vec2::ZERO;
            self.gravity_scale = 0.0;
            self.lifetime = linger;
        } else if self.stops_on_terrain {
            self.destroy(DestroyReason::Terrain);
        }
    }
}
