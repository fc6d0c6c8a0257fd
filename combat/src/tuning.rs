//! Gameplay tuning constants
//!
//! Values that are not part of any single weapon record: melee attack shape,
//! the spread used when extra projectiles come purely from upgrades, what the
//! piercing/explosive/homing upgrades grant, and contact damage pacing.

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Shipped tuning file
pub const BUILTIN_TUNING: &str = include_str!("../data/tuning.ron");

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Ticks a melee cone stays active
    pub melee_duration_ticks: u32,
    /// Full cone angle (degrees) for melee weapons without a `MeleeArc` effect
    pub melee_arc_degrees: f32,
    /// Targets per swing for melee weapons without a `MeleeArc` effect
    pub melee_max_targets: u32,
    /// Spread (degrees) for extra projectiles granted only by upgrades
    pub default_spread_degrees: f32,
    /// Aim jitter (degrees) at accuracy 0.0
    pub max_inaccuracy_degrees: f32,

    /// Pierce count granted by the piercing upgrade
    pub upgrade_max_pierce: u32,
    /// Explosion granted by the explosive upgrade
    pub upgrade_explosion_radius: f32,
    pub upgrade_explosion_fraction: f32,
    /// Homing granted by the homing upgrade (radians per tick)
    pub upgrade_turn_rate: f32,
    pub upgrade_tracking_range: f32,

    /// Ticks between player/enemy contact checks
    pub contact_check_interval: u32,
    /// Contact damage for enemies that don't specify their own
    pub default_contact_damage: f32,
    /// Knockback distance applied to the player on contact
    pub contact_knockback: f32,
    /// Ticks the player ignores contact damage after being touched
    pub contact_invulnerability_ticks: u32,

    /// Burn applied when an explosion catches a flammable target
    pub burn_damage_per_tick: f32,
    pub burn_ticks: u32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            melee_duration_ticks: 8,
            melee_arc_degrees: 90.0,
            melee_max_targets: 3,
            default_spread_degrees: 30.0,
            max_inaccuracy_degrees: 20.0,
            upgrade_max_pierce: 3,
            upgrade_explosion_radius: 50.0,
            upgrade_explosion_fraction: 0.5,
            upgrade_turn_rate: 0.08,
            upgrade_tracking_range: 300.0,
            contact_check_interval: 5,
            default_contact_damage: 10.0,
            contact_knockback: 12.0,
            contact_invulnerability_ticks: 30,
            burn_damage_per_tick: 1.0,
            burn_ticks: 60,
        }
    }
}

impl CombatTuning {
    /// Parse tuning from RON; missing fields keep their defaults
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn default_spread(&self) -> f32 {
        self.default_spread_degrees.to_radians()
    }

    pub fn max_inaccuracy(&self) -> f32 {
        self.max_inaccuracy_degrees.to_radians()
    }

    /// Half of the fallback melee cone, radians
    pub fn melee_half_angle(&self) -> f32 {
        (self.melee_arc_degrees * 0.5).to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tuning_matches_defaults() {
        let tuning = CombatTuning::from_ron_str(BUILTIN_TUNING).unwrap();
        assert_eq!(tuning, CombatTuning::default());
    }

    #[test]
    fn test_partial_tuning_keeps_defaults() {
        let tuning = CombatTuning::from_ron_str("(melee_duration_ticks: 4)").unwrap();
        assert_eq!(tuning.melee_duration_ticks, 4);
        assert_eq!(tuning.contact_check_interval, 5);
    }
}
