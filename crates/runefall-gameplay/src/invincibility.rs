//! Timed damage immunity.

use serde::{Deserialize, Serialize};

/// What granted the current invincibility window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvincibilitySource {
    /// Post-hit recovery
    Damage,
    /// Granted when a shield absorbed a hit
    Shield,
}

/// Per-actor damage gate. Dormant until granted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Invincibility {
    remaining: f32,
    source: Option<InvincibilitySource>,
}

impl Invincibility {
    /// Creates a dormant controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a window.
    ///
    /// Returns `true` if the actor was not already invincible. Non-positive
    /// durations are ignored.
    pub fn grant(&mut self, duration: f32, source: InvincibilitySource) -> bool {
        if !duration.is_finite() || duration <= 0.0 {
            return false;
        }
        let newly_started = !self.is_active();
        self.remaining = duration;
        self.source = Some(source);
        newly_started
    }

    /// Counts down. Returns `true` on the tick the window ends.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.remaining -= dt.max(0.0);
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.source = None;
            true
        } else {
            false
        }
    }

    /// Whether the window is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    /// Whether incoming damage should be refused.
    #[must_use]
    pub fn blocks_damage(&self) -> bool {
        self.is_active()
    }

    /// Seconds left in the window.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Source of the running window.
    #[must_use]
    pub fn source(&self) -> Option<InvincibilitySource> {
        self.source
    }

    /// Ends the window immediately without reporting it.
    pub fn clear(&mut self) {
        self.remaining = 0.0;
        self.source = None;
    }
}
