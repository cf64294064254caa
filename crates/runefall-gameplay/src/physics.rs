//! Physics seam between the combat core and the host engine.
//!
//! The core never steps physics itself. It asks the world a handful of
//! synchronous questions (raycasts, overlap tests, visibility) and hands
//! bodies back to the world for integration. [`StaticWorld`] is a small
//! platform-only implementation used by tests and the headless runner.
//!
//! Coordinates are y-up: gravity pulls toward negative y.

use glam::Vec2;
use runefall_common::ColliderId;
use serde::{Deserialize, Serialize};

/// Vertical skin used when sweeping bodies sideways so that a body resting
/// exactly on a floor does not register the floor as a wall.
const SKIN_WIDTH: f32 = 0.01;

/// Axis-aligned bounding box for collision detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Minimum X coordinate
    pub min_x: f32,
    /// Minimum Y coordinate
    pub min_y: f32,
    /// Maximum X coordinate
    pub max_x: f32,
    /// Maximum Y coordinate
    pub max_y: f32,
}

impl AABB {
    /// Creates a new AABB.
    #[must_use]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates an AABB from center and half-extents.
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min_x: center.x - half_extents.x,
            min_y: center.y - half_extents.y,
            max_x: center.x + half_extents.x,
            max_y: center.y + half_extents.y,
        }
    }

    /// Returns the center of the AABB.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Checks if this AABB overlaps with another.
    #[must_use]
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Returns the AABB translated by a vector.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }

    /// Intersects a ray with this box using the slab method.
    ///
    /// Returns the entry distance and the surface normal at the entry point.
    /// A ray that starts inside the box hits at distance zero.
    #[must_use]
    pub fn ray_intersection(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
    ) -> Option<(f32, Vec2)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        let mut normal = -direction;

        for (o, d, lo, hi, axis) in [
            (origin.x, direction.x, self.min_x, self.max_x, Vec2::X),
            (origin.y, direction.y, self.min_y, self.max_y, Vec2::Y),
        ] {
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let t1 = (lo - o) / d;
            let t2 = (hi - o) / d;
            let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
            if near > t_min {
                t_min = near;
                normal = if d > 0.0 { -axis } else { axis };
            }
            t_max = t_max.min(far);
        }

        if t_max < t_min || t_max < 0.0 {
            return None;
        }
        if t_min < 0.0 {
            return Some((0.0, -direction));
        }
        (t_min <= max_distance).then_some((t_min, normal))
    }
}

/// Bit set selecting which collision layers a query considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Static terrain: floors, platforms, walls.
    pub const GROUND: Self = Self(1);

    /// Returns true if any bit of `other` is set in this mask.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// Nearest surface reported by a raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Collider that was hit
    pub collider: ColliderId,
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Distance from the ray origin
    pub distance: f32,
}

/// Kinematic state of a simulated body.
///
/// The combat core writes desired velocity and toggles the dynamic/collider
/// flags; the host world owns integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Center position
    pub position: Vec2,
    /// Current velocity in units per second
    pub velocity: Vec2,
    /// Half width and half height of the collision box
    pub half_extents: Vec2,
    /// Multiplier on world gravity (0 = floats)
    pub gravity_scale: f32,
    dynamic: bool,
    collider_enabled: bool,
}

impl Body {
    /// Creates a dynamic body with an enabled collider.
    #[must_use]
    pub fn new(position: Vec2, half_extents: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            half_extents,
            gravity_scale: 1.0,
            dynamic: true,
            collider_enabled: true,
        }
    }

    /// Sets the gravity scale.
    #[must_use]
    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    /// Returns the collision box at the current position.
    #[must_use]
    pub fn bounds(&self) -> AABB {
        AABB::from_center(self.position, self.half_extents)
    }

    /// Returns the point at the bottom center of the body.
    #[must_use]
    pub fn feet(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.y - self.half_extents.y)
    }

    /// Whether the body responds to gravity and velocity.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Whether the body's collider takes part in contacts.
    #[must_use]
    pub fn collider_enabled(&self) -> bool {
        self.collider_enabled
    }
}

/// Control surface over a body that AI code is allowed to touch.
pub trait BodyControl {
    /// Current position.
    fn position(&self) -> Vec2;
    /// Current velocity.
    fn velocity(&self) -> Vec2;
    /// Overwrites the velocity.
    fn set_velocity(&mut self, velocity: Vec2);
    /// Enables or disables dynamic response (gravity and integration).
    fn set_dynamic(&mut self, dynamic: bool);
    /// Enables or disables the collider.
    fn set_collider_enabled(&mut self, enabled: bool);
    /// Moves the body instantly.
    fn teleport(&mut self, position: Vec2);
}

impl BodyControl for Body {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    fn set_dynamic(&mut self, dynamic: bool) {
        self.dynamic = dynamic;
    }

    fn set_collider_enabled(&mut self, enabled: bool) {
        self.collider_enabled = enabled;
    }

    fn teleport(&mut self, position: Vec2) {
        self.position = position;
    }
}

/// World query interface supplied by the physics engine.
///
/// All queries are synchronous and deterministic within a tick.
pub trait PhysicsWorld {
    /// Casts a ray and reports the nearest surface on the given layers.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RaycastHit>;

    /// Reports a collider overlapping the volume, if any.
    fn overlaps_at(&self, volume: AABB, mask: LayerMask) -> Option<ColliderId>;

    /// Distance between two points.
    fn distance(&self, a: Vec2, b: Vec2) -> f32 {
        a.distance(b)
    }

    /// Whether a volume is inside the active viewer frustum.
    fn in_view(&self, bounds: &AABB) -> bool;

    /// Downward gravity acceleration applied to projectiles.
    fn gravity(&self) -> f32;

    /// Integrates a body's velocity over a timestep.
    fn integrate(&self, body: &mut Body, dt: f32);
}

/// A static collider in [`StaticWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    /// Collider identifier
    pub id: ColliderId,
    /// Collider bounds
    pub bounds: AABB,
    /// Layer the collider lives on
    pub layer: LayerMask,
}

/// Platform-only physics world.
///
/// Bodies fall under gravity, land on platform tops and are stopped by
/// platform sides. There are no body-vs-body collisions; the caller
/// reports those as contacts.
#[derive(Debug, Clone)]
pub struct StaticWorld {
    platforms: Vec<Platform>,
    gravity: f32,
    viewport: Option<AABB>,
    next_collider: u32,
}

impl Default for StaticWorld {
    fn default() -> Self {
        Self::new(9.81)
    }
}

impl StaticWorld {
    /// Creates an empty world with the given gravity (positive = down).
    #[must_use]
    pub fn new(gravity: f32) -> Self {
        Self {
            platforms: Vec::new(),
            gravity,
            viewport: None,
            next_collider: 1,
        }
    }

    /// Adds a ground collider and returns its ID.
    pub fn add_platform(&mut self, bounds: AABB) -> ColliderId {
        let id = ColliderId::new(self.next_collider);
        self.next_collider += 1;
        self.platforms.push(Platform {
            id,
            bounds,
            layer: LayerMask::GROUND,
        });
        id
    }

    /// Restricts [`PhysicsWorld::in_view`] to a rectangle. `None` means
    /// everything is visible.
    pub fn set_viewport(&mut self, viewport: Option<AABB>) {
        self.viewport = viewport;
    }

    fn blocked(&self, volume: &AABB) -> bool {
        self.platforms
            .iter()
            .any(|p| p.layer.intersects(LayerMask::GROUND) && p.bounds.overlaps(volume))
    }
}

impl PhysicsWorld for StaticWorld {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RaycastHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO {
            return None;
        }

        self.platforms
            .iter()
            .filter(|p| p.layer.intersects(mask))
            .filter_map(|p| {
                p.bounds
                    .ray_intersection(origin, direction, max_distance)
                    .map(|(distance, normal)| RaycastHit {
                        collider: p.id,
                        point: origin + direction * distance,
                        normal,
                        distance,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn overlaps_at(&self, volume: AABB, mask: LayerMask) -> Option<ColliderId> {
        self.platforms
            .iter()
            .find(|p| p.layer.intersects(mask) && p.bounds.overlaps(&volume))
            .map(|p| p.id)
    }

    fn in_view(&self, bounds: &AABB) -> bool {
        self.viewport.map_or(true, |view| view.overlaps(bounds))
    }

    fn gravity(&self) -> f32 {
        self.gravity
    }

    fn integrate(&self, body: &mut Body, dt: f32) {
        if !body.is_dynamic() || dt <= 0.0 {
            return;
        }

        body.velocity.y -= self.gravity * body.gravity_scale * dt;

        if !body.collider_enabled() {
            body.position += body.velocity * dt;
            return;
        }

        // Horizontal sweep against walls.
        let dx = body.velocity.x * dt;
        if dx != 0.0 {
            let mut moved = body.bounds().translated(Vec2::new(dx, 0.0));
            moved.min_y += SKIN_WIDTH;
            moved.max_y -= SKIN_WIDTH;
            if self.blocked(&moved) {
                body.velocity.x = 0.0;
            } else {
                body.position.x += dx;
            }
        }

        // Vertical move with landing on platform tops.
        let dy = body.velocity.y * dt;
        let feet_before = body.position.y - body.half_extents.y;
        let feet_after = feet_before + dy;
        let min_x = body.position.x - body.half_extents.x;
        let max_x = body.position.x + body.half_extents.x;

        let landing = if dy < 0.0 {
            self.platforms
                .iter()
                .filter(|p| p.layer.intersects(LayerMask::GROUND))
                .filter(|p| min_x < p.bounds.max_x && max_x > p.bounds.min_x)
                .filter(|p| feet_before >= p.bounds.max_y - SKIN_WIDTH && feet_after <= p.bounds.max_y)
                .map(|p| p.bounds.max_y)
                .fold(None, |best: Option<f32>, top| Some(best.map_or(top, |b| b.max(top))))
        } else {
            None
        };

        match landing {
            Some(top) => {
                body.position.y = top + body.half_extents.y;
                body.velocity.y = 0.0;
            },
            None => body.position.y += dy,
        }
    }
}
