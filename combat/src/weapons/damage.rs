//! Damage calculation
//!
//! Handles categorical bonuses, armor and explosion falloff.

use serde::{Deserialize, Serialize};

/// Armor points that halve incoming damage.
pub const ARMOR_HALVING_POINT: f32 = 100.0;

/// What kind of creature a target is, as far as damage bonuses care.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageCategory {
    #[default]
    Mortal,
    Demonic,
    Undead,
    Beast,
}

impl DamageCategory {
    pub const ALL: [DamageCategory; 4] = [
        DamageCategory::Mortal,
        DamageCategory::Demonic,
        DamageCategory::Undead,
        DamageCategory::Beast,
    ];

    /// Parameter key used by `CategoryBonus` effects.
    pub fn param_key(&self) -> &'static str {
        match self {
            DamageCategory::Mortal => "mortal",
            DamageCategory::Demonic => "demonic",
            DamageCategory::Undead => "undead",
            DamageCategory::Beast => "beast",
        }
    }
}

/// How a point of damage was delivered. Used for kill attribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageSource {
    Projectile,
    Melee,
    Explosion,
    DamageOverTime,
    Contact,
}

/// Damage modifiers resolved from a weapon's effects at spawn time
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DamageModifiers {
    /// Categories that take bonus damage and the multiplier they take.
    pub bonus: Option<(Vec<DamageCategory>, f32)>,
    /// Fraction of target armor ignored (0.0 to 1.0)
    pub armor_penetration: f32,
}

impl DamageModifiers {
    pub fn category_multiplier(&self, category: DamageCategory) -> f32 {
        match &self.bonus {
            Some((categories, mult)) if categories.contains(&category) => *mult,
            _ => 1.0,
        }
    }
}

/// Armor reduction: `100 / (100 + armor)`, so 100 armor halves damage.
fn armor_multiplier(armor: f32) -> f32 {
    let armor = armor.max(0.0);
    ARMOR_HALVING_POINT / (ARMOR_HALVING_POINT + armor)
}

/// Calculate final damage for a direct hit
///
/// Factors in:
/// - Base projectile damage
/// - Category bonus (e.g. holy weapons vs demonic targets)
/// - Target armor, after armor penetration
pub fn calculate_damage(
    base: f32,
    modifiers: &DamageModifiers,
    category: DamageCategory,
    armor: f32,
) -> f32 {
    let raw = base * modifiers.category_multiplier(category);
    let penetration = modifiers.armor_penetration.clamp(0.0, 1.0);
    let effective_armor = armor * (1.0 - penetration);

    (raw * armor_multiplier(effective_armor)).max(0.0)
}

/// Linear explosion falloff
///
/// Returns 1.0 at the center, 0.0 at and beyond `radius`.
pub fn explosion_falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        0.0
    } else {
        1.0 - distance.max(0.0) / radius
    }
}

/// Area damage dealt at `distance` from an explosion
pub fn explosion_damage(base: f32, damage_fraction: f32, distance: f32, radius: f32) -> f32 {
    base * damage_fraction * explosion_falloff(distance, radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_armor_full_damage() {
        let damage = calculate_damage(20.0, &DamageModifiers::default(), DamageCategory::Mortal, 0.0);
        assert!((damage - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_armor_halving_point() {
        let damage = calculate_damage(
            20.0,
            &DamageModifiers::default(),
            DamageCategory::Mortal,
            ARMOR_HALVING_POINT,
        );
        assert!((damage - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_armor_penetration_applies_before_formula() {
        let modifiers = DamageModifiers {
            bonus: None,
            armor_penetration: 0.5,
        };
        // 200 armor, half ignored -> behaves like 100 armor
        let damage = calculate_damage(20.0, &modifiers, DamageCategory::Mortal, 200.0);
        assert!((damage - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_category_bonus_only_for_listed_categories() {
        let modifiers = DamageModifiers {
            bonus: Some((vec![DamageCategory::Demonic], 2.0)),
            armor_penetration: 0.0,
        };
        let demon = calculate_damage(10.0, &modifiers, DamageCategory::Demonic, 0.0);
        let mortal = calculate_damage(10.0, &modifiers, DamageCategory::Mortal, 0.0);
        assert!((demon - 20.0).abs() < 0.001);
        assert!((mortal - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_explosion_falloff_is_monotonic_and_zero_at_edge() {
        let radius = 50.0;
        let mut previous = f32::INFINITY;
        for step in 0..=60 {
            let value = explosion_damage(40.0, 0.5, step as f32, radius);
            assert!(value <= previous, "falloff increased at distance {}", step);
            previous = value;
        }
        assert_eq!(explosion_damage(40.0, 0.5, radius, radius), 0.0);
        assert_eq!(explosion_damage(40.0, 0.5, 60.0, radius), 0.0);
        assert!((explosion_damage(40.0, 0.5, 0.0, radius) - 20.0).abs() < 0.001);
    }
}
