//! Ice shield: absorbs a single hit.
//!
//! The shield holds for its duration, then fades. It still counts as up
//! while fading.

use serde::{Deserialize, Serialize};

use crate::ability::AbilityError;

/// Shield lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ShieldPhase {
    /// No shield
    #[default]
    Down,
    /// Fully raised
    Up {
        /// Seconds until fading starts
        remaining: f32,
    },
    /// Fading out
    Fading {
        /// Seconds until the shield drops
        remaining: f32,
    },
}

/// Shield capability attached to an actor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Shield {
    phase: ShieldPhase,
    fade: f32,
}

impl Shield {
    /// Creates a lowered shield.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the shield for `duration` followed by a `fade`.
    pub fn raise(&mut self, duration: f32, fade: f32) -> Result<(), AbilityError> {
        if self.is_up() {
            return Err(AbilityError::ShieldAlreadyActive);
        }
        self.fade = fade.max(0.0);
        self.phase = ShieldPhase::Up {
            remaining: duration.max(0.0),
        };
        Ok(())
    }

    /// Advances the phases. Returns `true` on the tick the shield drops.
    pub fn tick(&mut self, dt: f32) -> bool {
        match self.phase {
            ShieldPhase::Down => false,
            ShieldPhase::Up { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.phase = ShieldPhase::Up { remaining };
                    false
                } else {
                    // overflow carries into the fade
                    self.phase = ShieldPhase::Fading {
                        remaining: self.fade + remaining,
                    };
                    self.settle_fade()
                }
            },
            ShieldPhase::Fading { remaining } => {
                self.phase = ShieldPhase::Fading {
                    remaining: remaining - dt,
                };
                self.settle_fade()
            },
        }
    }

    fn settle_fade(&mut self) -> bool {
        match self.phase {
            ShieldPhase::Fading { remaining } if remaining <= 0.0 => {
                self.phase = ShieldPhase::Down;
                true
            },
            _ => false,
        }
    }

    /// Drops the shield immediately. Returns whether it was up.
    pub fn break_shield(&mut self) -> bool {
        let was_up = self.is_up();
        self.phase = ShieldPhase::Down;
        was_up
    }

    /// Whether the shield absorbs hits.
    #[must_use]
    pub fn is_up(&self) -> bool {
        !matches!(self.phase, ShieldPhase::Down)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ShieldPhase {
        self.phase
    }
}
