//! Effect catalog
//!
//! Effects are pure data: a name, a category, a kind and a bag of numeric or
//! boolean parameters. Descriptors are validated once at load into a typed
//! [`Effect`]; unknown parameters and kind/category mismatches are rejected
//! there instead of being ignored later at fire time.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::weapons::damage::DamageCategory;

/// Broad grouping of effects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectCategory {
    DamageModifier,
    ProjectileBehavior,
    OnHit,
}

impl EffectCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectCategory::DamageModifier => "DamageModifier",
            EffectCategory::ProjectileBehavior => "ProjectileBehavior",
            EffectCategory::OnHit => "OnHit",
        }
    }
}

/// The closed set of behaviors an effect can describe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Piercing,
    Homing,
    Explosive,
    MultiShot,
    MeleeArc,
    CategoryBonus,
    ArmorPenetration,
    Corruption,
    Slow,
    DamageOverTime,
}

impl EffectKind {
    pub fn category(&self) -> EffectCategory {
        match self {
            EffectKind::Piercing
            | EffectKind::Homing
            | EffectKind::Explosive
            | EffectKind::MultiShot
            | EffectKind::MeleeArc => EffectCategory::ProjectileBehavior,
            EffectKind::CategoryBonus | EffectKind::ArmorPenetration => {
                EffectCategory::DamageModifier
            }
            EffectKind::Corruption | EffectKind::Slow | EffectKind::DamageOverTime => {
                EffectCategory::OnHit
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Piercing => "Piercing",
            EffectKind::Homing => "Homing",
            EffectKind::Explosive => "Explosive",
            EffectKind::MultiShot => "MultiShot",
            EffectKind::MeleeArc => "MeleeArc",
            EffectKind::CategoryBonus => "CategoryBonus",
            EffectKind::ArmorPenetration => "ArmorPenetration",
            EffectKind::Corruption => "Corruption",
            EffectKind::Slow => "Slow",
            EffectKind::DamageOverTime => "DamageOverTime",
        }
    }
}

/// A single effect parameter value
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f32),
}

/// Effect record as written in the catalog files
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    pub name: String,
    pub category: EffectCategory,
    pub kind: EffectKind,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

/// Validated, typed effect. Angles are stored in radians.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Piercing { max_pierce: u32 },
    Homing { turn_rate: f32, tracking_range: f32 },
    Explosive { radius: f32, damage_fraction: f32 },
    MultiShot { count: u32, spread: f32 },
    MeleeArc { arc: f32, max_targets: u32 },
    CategoryBonus { categories: Vec<DamageCategory>, multiplier: f32 },
    ArmorPenetration { amount: f32 },
    Corruption { chance: f32, amount: f32 },
    Slow { chance: f32, factor: f32, duration: u32 },
    DamageOverTime { chance: f32, damage_per_tick: f32, duration: u32 },
}

/// Tracks which parameters a descriptor has consumed so leftovers can be rejected
struct Params<'a> {
    effect: &'a str,
    values: &'a BTreeMap<String, ParamValue>,
    used: BTreeSet<&'a str>,
}

impl<'a> Params<'a> {
    fn new(descriptor: &'a EffectDescriptor) -> Self {
        Self {
            effect: &descriptor.name,
            values: &descriptor.parameters,
            used: BTreeSet::new(),
        }
    }

    fn lookup(&mut self, key: &'static str) -> Option<ParamValue> {
        let values = self.values;
        let (stored, value) = values.get_key_value(key)?;
        self.used.insert(stored.as_str());
        Some(*value)
    }

    fn number(&mut self, key: &'static str) -> Result<f32> {
        match self.lookup(key) {
            Some(ParamValue::Number(value)) if value.is_finite() => Ok(value),
            Some(_) => Err(self.wrong_type(key, "finite number")),
            None => Err(ConfigError::MissingParameter {
                effect: self.effect.to_string(),
                param: key,
            }),
        }
    }

    fn number_or(&mut self, key: &'static str, default: f32) -> Result<f32> {
        if self.values.contains_key(key) {
            self.number(key)
        } else {
            Ok(default)
        }
    }

    fn flag_or(&mut self, key: &'static str, default: bool) -> Result<bool> {
        match self.lookup(key) {
            Some(ParamValue::Bool(value)) => Ok(value),
            Some(_) => Err(self.wrong_type(key, "boolean")),
            None => Ok(default),
        }
    }

    /// Whole, positive count (e.g. `max_pierce: 2.0`)
    fn count(&mut self, key: &'static str) -> Result<u32> {
        let value = self.number(key)?;
        if value < 1.0 || value.fract() != 0.0 {
            return Err(self.out_of_domain(key, format!("expected whole number >= 1, got {}", value)));
        }
        Ok(value as u32)
    }

    fn ranged(&mut self, key: &'static str, min: f32, max: f32, value: f32) -> Result<f32> {
        if value < min || value > max {
            return Err(self.out_of_domain(key, format!("expected {}..={}, got {}", min, max, value)));
        }
        Ok(value)
    }

    fn positive(&mut self, key: &'static str) -> Result<f32> {
        let value = self.number(key)?;
        if value <= 0.0 {
            return Err(self.out_of_domain(key, format!("expected > 0, got {}", value)));
        }
        Ok(value)
    }

    fn chance(&mut self) -> Result<f32> {
        let value = self.number_or("chance", 1.0)?;
        self.ranged("chance", 0.0, 1.0, value)
    }

    fn wrong_type(&self, key: &'static str, expected: &'static str) -> ConfigError {
        ConfigError::ParameterType {
            effect: self.effect.to_string(),
            param: key,
            expected,
        }
    }

    fn out_of_domain(&self, key: &'static str, reason: String) -> ConfigError {
        ConfigError::out_of_domain(self.effect, key, reason)
    }

    fn finish(self) -> Result<()> {
        match self.values.keys().find(|key| !self.used.contains(key.as_str())) {
            Some(unknown) => Err(ConfigError::UnknownParameter {
                effect: self.effect.to_string(),
                param: unknown.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl EffectDescriptor {
    /// Validate the descriptor against its kind and build the typed effect
    pub fn resolve(&self) -> Result<Effect> {
        if self.kind.category() != self.category {
            return Err(ConfigError::CategoryMismatch {
                effect: self.name.clone(),
                kind: self.kind.as_str(),
                category: self.category.as_str(),
            });
        }

        let mut params = Params::new(self);
        let effect = match self.kind {
            EffectKind::Piercing => Effect::Piercing {
                max_pierce: params.count("max_pierce")?,
            },
            EffectKind::Homing => Effect::Homing {
                turn_rate: params.positive("turn_rate")?,
                tracking_range: params.positive("tracking_range")?,
            },
            EffectKind::Explosive => {
                let radius = params.positive("radius")?;
                let fraction = params.positive("damage_fraction")?;
                Effect::Explosive {
                    radius,
                    damage_fraction: params.ranged("damage_fraction", 0.0, 1.0, fraction)?,
                }
            }
            EffectKind::MultiShot => {
                let count = params.count("count")?;
                let spread = params.number("spread_angle")?;
                let spread = params.ranged("spread_angle", 0.0, 360.0, spread)?;
                Effect::MultiShot {
                    count,
                    spread: spread.to_radians(),
                }
            }
            EffectKind::MeleeArc => {
                let arc = params.positive("arc")?;
                let arc = params.ranged("arc", 0.0, 360.0, arc)?;
                Effect::MeleeArc {
                    arc: arc.to_radians(),
                    max_targets: params.count("max_targets")?,
                }
            }
            EffectKind::CategoryBonus => {
                let multiplier = params.positive("multiplier")?;
                let mut categories = Vec::new();
                for category in DamageCategory::ALL {
                    if params.flag_or(category.param_key(), false)? {
                        categories.push(category);
                    }
                }
                if categories.is_empty() {
                    return Err(params.out_of_domain(
                        "categories",
                        "no damage category flagged".to_string(),
                    ));
                }
                Effect::CategoryBonus {
                    categories,
                    multiplier,
                }
            }
            EffectKind::ArmorPenetration => {
                let amount = params.number("amount")?;
                Effect::ArmorPenetration {
                    amount: params.ranged("amount", 0.0, 1.0, amount)?,
                }
            }
            EffectKind::Corruption => Effect::Corruption {
                chance: params.chance()?,
                amount: params.positive("amount")?,
            },
            EffectKind::Slow => {
                let chance = params.chance()?;
                let factor = params.number("factor")?;
                let factor = params.ranged("factor", 0.0, 1.0, factor)?;
                Effect::Slow {
                    chance,
                    factor,
                    duration: params.count("duration")?,
                }
            }
            EffectKind::DamageOverTime => Effect::DamageOverTime {
                chance: params.chance()?,
                damage_per_tick: params.positive("damage_per_tick")?,
                duration: params.count("duration")?,
            },
        };
        params.finish()?;
        Ok(effect)
    }
}

/// Read-only lookup of named effects
#[derive(Clone, Debug, Default)]
pub struct EffectCatalog {
    effects: HashMap<String, Effect>,
}

impl EffectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a descriptor
    ///
    /// Duplicate names are rejected; the first definition wins.
    pub fn insert(&mut self, descriptor: EffectDescriptor) -> Result<()> {
        if self.effects.contains_key(&descriptor.name) {
            return Err(ConfigError::Duplicate(format!("effect `{}`", descriptor.name)));
        }
        let effect = descriptor.resolve()?;
        self.effects.insert(descriptor.name, effect);
        Ok(())
    }

    /// Register every descriptor, collecting the rejected ones
    pub fn insert_all(
        &mut self,
        descriptors: impl IntoIterator<Item = EffectDescriptor>,
    ) -> Vec<(String, ConfigError)> {
        let mut rejected = Vec::new();
        for descriptor in descriptors {
            let name = descriptor.name.clone();
            if let Err(err) = self.insert(descriptor) {
                warn!("Rejected effect `{}`: {}", name, err);
                rejected.push((name, err));
            }
        }
        rejected
    }

    pub fn get(&self, name: &str) -> Option<&Effect> {
        self.effects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(
        name: &str,
        category: EffectCategory,
        kind: EffectKind,
        params: &[(&str, ParamValue)],
    ) -> EffectDescriptor {
        EffectDescriptor {
            name: name.to_string(),
            category,
            kind,
            parameters: params
                .iter()
                .map(|(key, value)| (key.to_string(), *value))
                .collect(),
        }
    }

    #[test]
    fn test_piercing_resolves() {
        let effect = descriptor(
            "pierce",
            EffectCategory::ProjectileBehavior,
            EffectKind::Piercing,
            &[("max_pierce", ParamValue::Number(2.0))],
        )
        .resolve()
        .unwrap();
        assert_eq!(effect, Effect::Piercing { max_pierce: 2 });
    }

    #[test]
    fn test_category_mismatch_rejected() {
        let err = descriptor(
            "pierce",
            EffectCategory::OnHit,
            EffectKind::Piercing,
            &[("max_pierce", ParamValue::Number(2.0))],
        )
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::CategoryMismatch { .. }));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let err = descriptor(
            "pierce",
            EffectCategory::ProjectileBehavior,
            EffectKind::Piercing,
            &[
                ("max_pierce", ParamValue::Number(2.0)),
                ("max_peirce", ParamValue::Number(3.0)),
            ],
        )
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParameter { ref param, .. } if param == "max_peirce"));
    }

    #[test]
    fn test_missing_and_mistyped_parameters() {
        let missing = descriptor(
            "boom",
            EffectCategory::ProjectileBehavior,
            EffectKind::Explosive,
            &[("radius", ParamValue::Number(50.0))],
        )
        .resolve()
        .unwrap_err();
        assert!(matches!(missing, ConfigError::MissingParameter { param: "damage_fraction", .. }));

        let mistyped = descriptor(
            "boom",
            EffectCategory::ProjectileBehavior,
            EffectKind::Explosive,
            &[
                ("radius", ParamValue::Bool(true)),
                ("damage_fraction", ParamValue::Number(0.5)),
            ],
        )
        .resolve()
        .unwrap_err();
        assert!(matches!(mistyped, ConfigError::ParameterType { param: "radius", .. }));
    }

    #[test]
    fn test_multishot_spread_in_radians() {
        let effect = descriptor(
            "triple",
            EffectCategory::ProjectileBehavior,
            EffectKind::MultiShot,
            &[
                ("count", ParamValue::Number(3.0)),
                ("spread_angle", ParamValue::Number(90.0)),
            ],
        )
        .resolve()
        .unwrap();
        match effect {
            Effect::MultiShot { count, spread } => {
                assert_eq!(count, 3);
                assert!((spread - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_category_bonus_flags() {
        let effect = descriptor(
            "holy",
            EffectCategory::DamageModifier,
            EffectKind::CategoryBonus,
            &[
                ("multiplier", ParamValue::Number(1.5)),
                ("demonic", ParamValue::Bool(true)),
                ("undead", ParamValue::Bool(true)),
            ],
        )
        .resolve()
        .unwrap();
        assert_eq!(
            effect,
            Effect::CategoryBonus {
                categories: vec![DamageCategory::Demonic, DamageCategory::Undead],
                multiplier: 1.5,
            }
        );
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_keeps_first() {
        let mut catalog = EffectCatalog::new();
        let first = descriptor(
            "pierce",
            EffectCategory::ProjectileBehavior,
            EffectKind::Piercing,
            &[("max_pierce", ParamValue::Number(1.0))],
        );
        let second = descriptor(
            "pierce",
            EffectCategory::ProjectileBehavior,
            EffectKind::Piercing,
            &[("max_pierce", ParamValue::Number(5.0))],
        );
        let rejected = catalog.insert_all([first, second]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(catalog.get("pierce"), Some(&Effect::Piercing { max_pierce: 1 }));
    }
}
