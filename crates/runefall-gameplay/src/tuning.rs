//! Combat tuning loaded from RON.
//!
//! Every numeric knob of the combat core lives here. Missing fields fall
//! back to their defaults, so a tuning file only needs the values it
//! changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use runefall_common::{RunefallError, RunefallResult};

use crate::ability::AbilityConfig;
use crate::boss::BossConfig;
use crate::collision_response::ResolverConfig;
use crate::ground_patrol::GroundPatrolConfig;
use crate::homing_charge::HomingChargeConfig;
use crate::player::PlayerConfig;

/// All combat tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Player values
    pub player: PlayerConfig,
    /// Ability values
    pub abilities: AbilityConfig,
    /// Damage resolution values
    pub resolver: ResolverConfig,
    /// Walking enemy values
    pub ground_patrol: GroundPatrolConfig,
    /// Rune values
    pub homing_charge: HomingChargeConfig,
    /// Boss values
    pub boss: BossConfig,
}

fn positive(field: &str, value: f32) -> RunefallResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RunefallError::invalid_tuning(field, format!("must be > 0, got {value}")))
    }
}

fn non_negative(field: &str, value: f32) -> RunefallResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RunefallError::invalid_tuning(field, format!("must be >= 0, got {value}")))
    }
}

impl CombatTuning {
    /// Parses tuning from a RON string and validates it.
    pub fn from_ron_str(source: &str) -> RunefallResult<Self> {
        let tuning: Self =
            ron::from_str(source).map_err(|e| RunefallError::Serialization(e.to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Loads tuning from a RON file.
    pub fn load(path: impl AsRef<Path>) -> RunefallResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let tuning = Self::from_ron_str(&contents)?;
        info!("Loaded combat tuning from {:?}", path);
        Ok(tuning)
    }

    /// Serializes to pretty RON.
    pub fn to_ron_string(&self) -> RunefallResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| RunefallError::Serialization(e.to_string()))
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> RunefallResult<()> {
        let p = &self.player;
        positive("player.max_health", p.max_health)?;
        non_negative("player.post_hit_invincibility", p.post_hit_invincibility)?;
        non_negative("player.damage_cooldown", p.damage_cooldown)?;

        let a = &self.abilities;
        positive("abilities.fireball_speed", a.fireball_speed)?;
        positive("abilities.fireball_lifetime", a.fireball_lifetime)?;
        non_negative("abilities.fireball_cooldown", a.fireball_cooldown)?;
        non_negative("abilities.fireball_damage", a.fireball_damage)?;
        non_negative("abilities.shield_duration", a.shield_duration)?;
        non_negative("abilities.shield_fade", a.shield_fade)?;
        non_negative("abilities.boulder_damage", a.boulder_damage)?;
        non_negative("abilities.boulder_arm_delay", a.boulder_arm_delay)?;
        positive("abilities.boulder_lifetime", a.boulder_lifetime)?;

        let r = &self.resolver;
        non_negative("resolver.shield_break_invincibility", r.shield_break_invincibility)?;
        if !(0.0..=1.0).contains(&r.landing_normal_threshold) {
            return Err(RunefallError::invalid_tuning(
                "resolver.landing_normal_threshold",
                "must be within 0..=1",
            ));
        }
        non_negative("resolver.landing_ignore_duration", r.landing_ignore_duration)?;

        let g = &self.ground_patrol;
        positive("ground_patrol.walk_speed", g.walk_speed)?;
        positive("ground_patrol.chase_speed", g.chase_speed)?;
        non_negative("ground_patrol.detection_radius", g.detection_radius)?;
        positive("ground_patrol.max_patrol_distance", g.max_patrol_distance)?;
        positive("ground_patrol.edge_probe_distance", g.edge_probe_distance)?;
        positive("ground_patrol.stuck_turn_around_time", g.stuck_turn_around_time)?;
        positive("ground_patrol.chase_timeout", g.chase_timeout)?;
        non_negative("ground_patrol.direction_change_cooldown", g.direction_change_cooldown)?;
        positive("ground_patrol.max_health", g.max_health)?;

        let h = &self.homing_charge;
        positive("homing_charge.charge_speed", h.charge_speed)?;
        non_negative("homing_charge.charge_delay", h.charge_delay)?;
        positive("homing_charge.proximity_threshold", h.proximity_threshold)?;
        non_negative("homing_charge.attack_cooldown", h.attack_cooldown)?;
        positive("homing_charge.max_health", h.max_health)?;

        let b = &self.boss;
        non_negative("boss.vanish_delay", b.vanish_delay)?;
        non_negative("boss.hidden_duration", b.hidden_duration)?;
        non_negative("boss.appear_delay", b.appear_delay)?;
        non_negative("boss.post_teleport_wait", b.post_teleport_wait)?;
        non_negative("boss.post_attack_wait", b.post_attack_wait)?;
        non_negative("boss.cast_delay", b.cast_delay)?;
        non_negative("boss.grace_period", b.grace_period)?;
        positive("boss.projectile_speed", b.projectile_speed)?;
        positive("boss.projectile_lifetime", b.projectile_lifetime)?;
        positive("boss.max_health", b.max_health)?;
        let cycle = b.vanish_delay
            + b.hidden_duration
            + b.appear_delay
            + b.post_teleport_wait
            + 2.0 * (b.cast_delay + b.post_attack_wait);
        positive("boss.cycle_length", cycle)?;

        Ok(())
    }
}
