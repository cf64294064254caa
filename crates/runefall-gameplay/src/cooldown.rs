//! Re-trigger guards.
//!
//! [`DamageCooldown`] stops one actor from taking damage several times from
//! overlapping contacts in the same instant. [`FactionCooldowns`] rate-limits
//! attacks across every enemy of a kind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::actor::EnemyKind;

/// Default minimum gap between two hits on the same actor, in seconds.
pub const DEFAULT_DAMAGE_COOLDOWN: f32 = 0.1;

/// Per-actor short re-hit guard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageCooldown {
    last_hit: Option<f32>,
    window: f32,
}

impl Default for DamageCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_DAMAGE_COOLDOWN)
    }
}

impl DamageCooldown {
    /// Creates a guard with the given window.
    #[must_use]
    pub fn new(window: f32) -> Self {
        Self {
            last_hit: None,
            window: window.max(0.0),
        }
    }

    /// Records a hit at `now` if the window has elapsed.
    pub fn try_consume(&mut self, now: f32) -> bool {
        if self.is_ready(now) {
            self.last_hit = Some(now);
            true
        } else {
            false
        }
    }

    /// Checks the window without recording anything.
    #[must_use]
    pub fn is_ready(&self, now: f32) -> bool {
        self.last_hit.map_or(true, |last| now - last >= self.window)
    }

    /// Time of the last accepted hit.
    #[must_use]
    pub fn last_hit(&self) -> Option<f32> {
        self.last_hit
    }

    /// Window length in seconds.
    #[must_use]
    pub fn window(&self) -> f32 {
        self.window
    }
}

/// Last attack time for each enemy kind.
///
/// Owned by the encounter and lent to enemies while they tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactionCooldowns {
    last_attack: HashMap<EnemyKind, f32>,
}

impl FactionCooldowns {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the kind may attack at `now`. Kinds that never attacked are ready.
    #[must_use]
    pub fn ready(&self, kind: EnemyKind, now: f32, cooldown: f32) -> bool {
        self.last_attack
            .get(&kind)
            .map_or(true, |last| now - last >= cooldown)
    }

    /// Records an attack by the kind.
    pub fn record(&mut self, kind: EnemyKind, now: f32) {
        self.last_attack.insert(kind, now);
    }

    /// Checks readiness and records the attack in one step.
    pub fn try_claim(&mut self, kind: EnemyKind, now: f32, cooldown: f32) -> bool {
        if self.ready(kind, now, cooldown) {
            self.record(kind, now);
            true
        } else {
            false
        }
    }

    /// Time of the kind's last attack.
    #[must_use]
    pub fn last_attack(&self, kind: EnemyKind) -> Option<f32> {
        self.last_attack.get(&kind).copied()
    }
}
