//! Health model shared by the player and every enemy.
//!
//! Health is a clamped `[0, max]` value. Reaching zero is terminal: a dead
//! health pool ignores all further damage and healing.

use serde::{Deserialize, Serialize};

/// Result of a health mutation, translated into events by the owning actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HealthChange {
    /// Health went down but the owner is still alive
    Damaged {
        /// Health after the hit
        current: f32,
    },
    /// This call took the owner from alive to dead
    Died,
    /// Health went up
    Healed {
        /// Health after healing
        current: f32,
    },
    /// Nothing changed
    Unchanged,
}

/// Current and maximum health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Creates a full health pool. A non-positive maximum is raised to 1.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = if max > 0.0 && max.is_finite() { max } else { 1.0 };
        Self { current: max, max }
    }

    /// Current health.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Whether health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Current health as a fraction of max (0.0 - 1.0).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        (self.current / self.max).clamp(0.0, 1.0)
    }

    /// Applies damage.
    ///
    /// Dead pools and non-positive or non-finite amounts are left alone.
    /// Returns [`HealthChange::Died`] only on the call that crosses zero.
    pub fn take_damage(&mut self, amount: f32) -> HealthChange {
        if !self.is_alive() || !amount.is_finite() || amount <= 0.0 {
            return HealthChange::Unchanged;
        }

        self.current = (self.current - amount).max(0.0);
        if self.is_alive() {
            HealthChange::Damaged {
                current: self.current,
            }
        } else {
            HealthChange::Died
        }
    }

    /// Restores health up to max. Dead pools cannot be healed.
    pub fn heal(&mut self, amount: f32) -> HealthChange {
        if !self.is_alive() || !amount.is_finite() || amount <= 0.0 {
            return HealthChange::Unchanged;
        }

        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        if self.current > before {
            HealthChange::Healed {
                current: self.current,
            }
        } else {
            HealthChange::Unchanged
        }
    }

    /// Changes the maximum, clamping current health to it.
    pub fn set_max(&mut self, new_max: f32) {
        if !new_max.is_finite() || new_max <= 0.0 {
            return;
        }
        self.max = new_max;
        self.current = self.current.min(self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_health_is_full() {
        let health = Health::new(5.0);
        assert_eq!(health.current(), 5.0);
        assert_eq!(health.max(), 5.0);
        assert!(health.is_alive());
        assert_eq!(health.fraction(), 1.0);
    }

    #[test]
    fn test_damage_and_death() {
        let mut health = Health::new(5.0);
        assert_eq!(
            health.take_damage(2.0),
            HealthChange::Damaged { current: 3.0 }
        );
        assert_eq!(health.take_damage(10.0), HealthChange::Died);
        assert_eq!(health.current(), 0.0);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_dead_is_terminal() {
        let mut health = Health::new(1.0);
        assert_eq!(health.take_damage(1.0), HealthChange::Died);
        assert_eq!(health.take_damage(1.0), HealthChange::Unchanged);
        assert_eq!(health.heal(5.0), HealthChange::Unchanged);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_invalid_amounts_are_ignored() {
        let mut health = Health::new(5.0);
        assert_eq!(health.take_damage(0.0), HealthChange::Unchanged);
        assert_eq!(health.take_damage(-3.0), HealthChange::Unchanged);
        assert_eq!(health.take_damage(f32::NAN), HealthChange::Unchanged);
        assert_eq!(health.heal(-1.0), HealthChange::Unchanged);
        assert_eq!(health.current(), 5.0);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut health = Health::new(5.0);
        health.take_damage(3.0);
        assert_eq!(health.heal(10.0), HealthChange::Healed { current: 5.0 });
        assert_eq!(health.heal(1.0), HealthChange::Unchanged);
    }

    #[test]
    fn test_set_max() {
        let mut health = Health::new(5.0);
        health.set_max(3.0);
        assert_eq!(health.max(), 3.0);
        assert_eq!(health.current(), 3.0);

        health.set_max(0.0);
        assert_eq!(health.max(), 3.0);

        health.set_max(10.0);
        assert_eq!(health.current(), 3.0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Damage(f32),
        Heal(f32),
        SetMax(f32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-5.0f32..10.0).prop_map(Op::Damage),
            (-5.0f32..10.0).prop_map(Op::Heal),
            (-5.0f32..20.0).prop_map(Op::SetMax),
        ]
    }

    proptest! {
        #[test]
        fn test_health_stays_in_range(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let mut health = Health::new(5.0);
            let mut died_count = 0;
            let mut was_dead = false;

            for op in ops {
                let change = match op {
                    Op::Damage(amount) => health.take_damage(amount),
                    Op::Heal(amount) => health.heal(amount),
                    Op::SetMax(max) => {
                        health.set_max(max);
                        HealthChange::Unchanged
                    },
                };
                if change == HealthChange::Died {
                    died_count += 1;
                }

                prop_assert!(health.current() >= 0.0);
                prop_assert!(health.current() <= health.max());
                prop_assert_eq!(health.is_alive(), health.current() > 0.0);
                if was_dead {
                    prop_assert!(!health.is_alive());
                }
                was_dead = !health.is_alive();
            }

            prop_assert!(died_count <= 1);
            prop_assert_eq!(died_count == 1, !health.is_alive());
        }
    }
}
