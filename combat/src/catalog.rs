//! Weapon catalog - records, validation and loading
//!
//! Weapon and effect records are read from RON files. Each weapon is validated
//! on its own: a bad record makes only that weapon unavailable, and the reason
//! is kept in [`Catalog::rejected`]. If nothing usable survives (or a file
//! cannot be parsed at all) callers can fall back to [`Catalog::fallback`],
//! which holds a single built-in weapon so the game stays playable.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use bevy::prelude::Resource;
use ron::value::RawValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::effects::{EffectCatalog, EffectDescriptor};
use crate::error::{ConfigError, Result};
use crate::weapons::{Upgrades, WeaponInstance};

/// Shipped effect definitions
pub const BUILTIN_EFFECTS: &str = include_str!("../data/catalog/effects.ron");
/// Shipped weapon definitions
pub const BUILTIN_WEAPONS: &str = include_str!("../data/catalog/weapons.ron");

/// Id of the weapon in the fallback catalog
pub const FALLBACK_WEAPON_ID: &str = "sidearm";

/// Ranged weapons fire travelling projectiles; melee weapons sweep a cone
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponClass {
    #[default]
    Ranged,
    Melee,
}

/// Faith/corruption window a wielder must sit in to equip a weapon
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoralityRequirements {
    #[serde(default = "min_bound")]
    pub min_faith: f32,
    #[serde(default = "max_bound")]
    pub max_faith: f32,
    #[serde(default = "min_bound")]
    pub min_corruption: f32,
    #[serde(default = "max_bound")]
    pub max_corruption: f32,
}

fn min_bound() -> f32 {
    f32::NEG_INFINITY
}

fn max_bound() -> f32 {
    f32::INFINITY
}

impl MoralityRequirements {
    pub fn allows(&self, faith: f32, corruption: f32) -> bool {
        (self.min_faith..=self.max_faith).contains(&faith)
            && (self.min_corruption..=self.max_corruption).contains(&corruption)
    }
}

// =============================================================================
// FILE RECORDS
// =============================================================================

/// `stats` block of a weapon record. Tick counts are signed here so negative
/// values surface as per-weapon domain errors instead of whole-file parse errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub damage: f32,
    pub fire_rate: i64,
    pub projectile_speed: f32,
    pub accuracy: f32,
    pub reload_time: i64,
    pub ammo_capacity: i64,
    pub range: f32,
    /// Fraction of damage lost per pierced target. Required, 0.0 for none.
    pub pierce_damage_reduction: f32,
}

/// `projectile` block of a weapon record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileRecord {
    pub size: f32,
    pub color: (u8, u8, u8),
    pub lifetime: i64,
    #[serde(default)]
    pub trail: bool,
}

/// Weapon record as written in the catalog files
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub class: WeaponClass,
    pub stats: StatsRecord,
    pub projectile: ProjectileRecord,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub morality_requirements: Option<MoralityRequirements>,
}

// =============================================================================
// VALIDATED DEFINITIONS
// =============================================================================

/// Base stats of a weapon
#[derive(Clone, Debug, PartialEq)]
pub struct WeaponStats {
    /// Damage per projectile
    pub damage: f32,
    /// Ticks between shots
    pub fire_rate: u32,
    /// Distance per tick; 0 for melee
    pub projectile_speed: f32,
    /// 1.0 = perfectly accurate
    pub accuracy: f32,
    /// Ticks to refill the magazine
    pub reload_time: u32,
    /// `None` = infinite ammo
    pub ammo_capacity: Option<u32>,
    /// Melee reach / homing and AI engagement distance
    pub range: f32,
    pub pierce_damage_reduction: f32,
}

/// How projectiles from this weapon look and how long they live
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileVisual {
    pub size: f32,
    pub color: (u8, u8, u8),
    /// Ticks before the projectile expires
    pub lifetime: u32,
    pub trail: bool,
}

/// Immutable catalog entry
#[derive(Clone, Debug, PartialEq)]
pub struct WeaponDefinition {
    pub id: String,
    pub name: String,
    pub class: WeaponClass,
    pub stats: WeaponStats,
    pub projectile: ProjectileVisual,
    /// Effect names, in the order they were declared
    pub effects: Vec<String>,
    pub morality: Option<MoralityRequirements>,
}

impl WeaponDefinition {
    pub fn is_melee(&self) -> bool {
        self.class == WeaponClass::Melee
    }

    /// Can a wielder with this faith/corruption equip the weapon?
    pub fn allows(&self, faith: f32, corruption: f32) -> bool {
        self.morality
            .map_or(true, |req| req.allows(faith, corruption))
    }

    /// Minimal always-valid weapon used when the catalog cannot be loaded
    pub fn fallback() -> Self {
        Self {
            id: FALLBACK_WEAPON_ID.to_string(),
            name: "Sidearm".to_string(),
            class: WeaponClass::Ranged,
            stats: WeaponStats {
                damage: 10.0,
                fire_rate: 15,
                projectile_speed: 8.0,
                accuracy: 0.95,
                reload_time: 60,
                ammo_capacity: None,
                range: 400.0,
                pierce_damage_reduction: 0.0,
            },
            projectile: ProjectileVisual {
                size: 4.0,
                color: (255, 230, 120),
                lifetime: 90,
                trail: false,
            },
            effects: Vec::new(),
            morality: None,
        }
    }
}

fn check(ok: bool, record: &str, field: &'static str, reason: impl Into<String>) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::out_of_domain(record, field, reason))
    }
}

fn ticks(value: i64, min: i64, record: &str, field: &'static str) -> Result<u32> {
    check(
        value >= min && value <= u32::MAX as i64,
        record,
        field,
        format!("expected whole ticks >= {}, got {}", min, value),
    )?;
    Ok(value as u32)
}

impl WeaponRecord {
    /// Validate the record against the effect catalog
    pub fn validate(self, effects: &EffectCatalog) -> Result<WeaponDefinition> {
        let id = self.id.as_str();
        let stats = &self.stats;

        check(!id.is_empty(), "<unnamed>", "id", "empty id")?;
        check(
            stats.damage.is_finite() && stats.damage >= 0.0,
            id,
            "damage",
            format!("expected >= 0, got {}", stats.damage),
        )?;
        let fire_rate = ticks(stats.fire_rate, 1, id, "fire_rate")?;
        let reload_time = ticks(stats.reload_time, 0, id, "reload_time")?;
        check(
            stats.projectile_speed.is_finite() && stats.projectile_speed >= 0.0,
            id,
            "projectile_speed",
            format!("expected >= 0, got {}", stats.projectile_speed),
        )?;
        match self.class {
            WeaponClass::Melee => check(
                stats.projectile_speed == 0.0,
                id,
                "projectile_speed",
                "melee weapons must have speed 0",
            )?,
            WeaponClass::Ranged => check(
                stats.projectile_speed > 0.0,
                id,
                "projectile_speed",
                "ranged weapons need a positive speed",
            )?,
        }
        check(
            (0.0..=1.0).contains(&stats.accuracy),
            id,
            "accuracy",
            format!("expected 0..=1, got {}", stats.accuracy),
        )?;
        let ammo_capacity = match stats.ammo_capacity {
            -1 => None,
            n if n >= 1 && n <= u32::MAX as i64 => Some(n as u32),
            n => {
                return Err(ConfigError::out_of_domain(
                    id,
                    "ammo_capacity",
                    format!("expected -1 (infinite) or >= 1, got {}", n),
                ))
            }
        };
        check(
            stats.range.is_finite() && stats.range > 0.0,
            id,
            "range",
            format!("expected > 0, got {}", stats.range),
        )?;
        check(
            (0.0..1.0).contains(&stats.pierce_damage_reduction),
            id,
            "pierce_damage_reduction",
            format!("expected 0..1, got {}", stats.pierce_damage_reduction),
        )?;
        check(
            self.projectile.size.is_finite() && self.projectile.size > 0.0,
            id,
            "size",
            format!("expected > 0, got {}", self.projectile.size),
        )?;
        let lifetime = ticks(self.projectile.lifetime, 1, id, "lifetime")?;

        if let Some(req) = &self.morality_requirements {
            check(
                req.min_faith <= req.max_faith,
                id,
                "morality_requirements",
                "min_faith > max_faith",
            )?;
            check(
                req.min_corruption <= req.max_corruption,
                id,
                "morality_requirements",
                "min_corruption > max_corruption",
            )?;
        }

        if let Some(missing) = self.effects.iter().find(|name| !effects.contains(name)) {
            return Err(ConfigError::UnknownEffect {
                weapon: self.id.clone(),
                effect: missing.clone(),
            });
        }

        Ok(WeaponDefinition {
            stats: WeaponStats {
                damage: stats.damage,
                fire_rate,
                projectile_speed: stats.projectile_speed,
                accuracy: stats.accuracy,
                reload_time,
                ammo_capacity,
                range: stats.range,
                pierce_damage_reduction: stats.pierce_damage_reduction,
            },
            projectile: ProjectileVisual {
                size: self.projectile.size,
                color: self.projectile.color,
                lifetime,
                trail: self.projectile.trail,
            },
            id: self.id,
            name: self.name,
            class: self.class,
            effects: self.effects,
            morality: self.morality_requirements,
        })
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Process-wide, read-only weapon and effect catalog
#[derive(Resource, Debug, Default)]
pub struct Catalog {
    effects: EffectCatalog,
    weapons: BTreeMap<String, Arc<WeaponDefinition>>,
    rejected: Vec<(String, ConfigError)>,
}

impl Catalog {
    /// Load from RON sources (`(effects: [...])` and `(weapons: [...])`)
    pub fn load(effects_src: &str, weapons_src: &str) -> Result<Self> {
        let mut loader = CatalogLoader::new();
        loader.load_effects_str(effects_src)?;
        loader.load_weapons_str(weapons_src)?;
        loader.finish()
    }

    /// Load, degrading to [`Catalog::fallback`] when nothing usable loads
    pub fn load_or_fallback(effects_src: &str, weapons_src: &str) -> Self {
        Self::load(effects_src, weapons_src).unwrap_or_else(|err| {
            warn!("Weapon catalog failed to load ({}); using fallback sidearm", err);
            Self::fallback()
        })
    }

    /// The shipped catalog under `data/`
    pub fn builtin() -> Self {
        Self::load_or_fallback(BUILTIN_EFFECTS, BUILTIN_WEAPONS)
    }

    /// Single built-in weapon, no effects
    pub fn fallback() -> Self {
        let weapon = WeaponDefinition::fallback();
        let mut weapons = BTreeMap::new();
        weapons.insert(weapon.id.clone(), Arc::new(weapon));
        Self {
            effects: EffectCatalog::new(),
            weapons,
            rejected: Vec::new(),
        }
    }

    pub fn effects(&self) -> &EffectCatalog {
        &self.effects
    }

    pub fn get(&self, id: &str) -> Option<Arc<WeaponDefinition>> {
        self.weapons.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.weapons.contains_key(id)
    }

    /// Weapon ids in sorted order
    pub fn weapon_ids(&self) -> impl Iterator<Item = &str> {
        self.weapons.keys().map(String::as_str)
    }

    /// Weapons a wielder with this faith/corruption may equip
    pub fn weapons_for(&self, faith: f32, corruption: f32) -> Vec<Arc<WeaponDefinition>> {
        self.weapons
            .values()
            .filter(|weapon| weapon.allows(faith, corruption))
            .cloned()
            .collect()
    }

    /// Records that failed validation, with the reason
    pub fn rejected(&self) -> &[(String, ConfigError)] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Create a fresh instance of a weapon for an owner with `upgrades`
    pub fn instantiate(&self, id: &str, upgrades: &Upgrades) -> Option<WeaponInstance> {
        self.get(id)
            .map(|definition| WeaponInstance::new(definition, upgrades))
    }
}

/// Accumulates effect and weapon records from several sources
pub struct CatalogLoader {
    effects: Vec<EffectDescriptor>,
    weapons: Vec<WeaponRecord>,
    rejected: Vec<(String, ConfigError)>,
}

// Records are kept raw until each one is decoded on its own, so a bad field
// or unknown variant only costs that record.
#[derive(Deserialize)]
struct EffectFile {
    effects: Vec<Box<RawValue>>,
}

#[derive(Deserialize)]
struct WeaponFile {
    weapons: Vec<Box<RawValue>>,
}

/// Just enough of a record to name it in a rejection
#[derive(Deserialize)]
struct RecordKey {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

fn record_label(raw: &RawValue, list: &str, index: usize) -> String {
    match raw.into_rust::<RecordKey>() {
        Ok(key) if !key.id.is_empty() => key.id,
        Ok(key) if !key.name.is_empty() => key.name,
        _ => format!("{}[{}]", list, index),
    }
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
            weapons: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn decode_records<T: DeserializeOwned>(
        &mut self,
        list: &str,
        records: Vec<Box<RawValue>>,
    ) -> Vec<T> {
        let mut decoded = Vec::with_capacity(records.len());
        for (index, raw) in records.iter().enumerate() {
            match raw.into_rust::<T>() {
                Ok(record) => decoded.push(record),
                Err(err) => {
                    let label = record_label(raw, list, index);
                    let err = ConfigError::from(err);
                    warn!("Rejected record `{}`: {}", label, err);
                    self.rejected.push((label, err));
                }
            }
        }
        decoded
    }

    /// Load effect records from a RON string
    ///
    /// Fails only if the outer `(effects: [...])` shape cannot be parsed.
    pub fn load_effects_str(&mut self, content: &str) -> Result<()> {
        let file: EffectFile = ron::from_str(content)?;
        let effects = self.decode_records("effects", file.effects);
        self.effects.extend(effects);
        Ok(())
    }

    /// Load weapon records from a RON string
    ///
    /// Fails only if the outer `(weapons: [...])` shape cannot be parsed.
    pub fn load_weapons_str(&mut self, content: &str) -> Result<()> {
        let file: WeaponFile = ron::from_str(content)?;
        let weapons = self.decode_records("weapons", file.weapons);
        self.weapons.extend(weapons);
        Ok(())
    }

    /// Load a single RON file, picking the record type from its name or content
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        // Weapon records carry their own `effects:` lists, so test for weapons first
        if filename.contains("weapon") || content.contains("weapons:") {
            self.load_weapons_str(&content)
        } else {
            self.load_effects_str(&content)
        }
    }

    /// Load every `.ron` file in a directory (recursively)
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        // Directory order is platform dependent; keep duplicate resolution stable
        entries.sort();

        for file_path in entries {
            if file_path.is_dir() {
                self.load_directory(&file_path)?;
            } else if file_path.extension().map(|e| e == "ron").unwrap_or(false) {
                self.load_file(&file_path)?;
            }
        }

        Ok(())
    }

    /// Validate everything and build the catalog
    ///
    /// Fails only when no weapon survives validation.
    pub fn finish(self) -> Result<Catalog> {
        let mut effects = EffectCatalog::new();
        let mut rejected = self.rejected;
        rejected.extend(effects.insert_all(self.effects));
        let mut weapons = BTreeMap::new();

        for record in self.weapons {
            let id = record.id.clone();
            if weapons.contains_key(&id) {
                let err = ConfigError::Duplicate(format!("weapon `{}`", id));
                warn!("Rejected weapon `{}`: {}", id, err);
                rejected.push((id, err));
                continue;
            }
            match record.validate(&effects) {
                Ok(definition) => {
                    weapons.insert(id, Arc::new(definition));
                }
                Err(err) => {
                    warn!("Rejected weapon `{}`: {}", id, err);
                    rejected.push((id, err));
                }
            }
        }

        if weapons.is_empty() {
            return Err(ConfigError::Empty);
        }

        info!(
            "Loaded weapon catalog: {} weapons, {} effects, {} rejected",
            weapons.len(),
            effects.len(),
            rejected.len()
        );

        Ok(Catalog {
            effects,
            weapons,
            rejected,
        })
    }
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EFFECTS: &str = r#"(
        effects: [
            (
                name: "pierce_two",
                category: ProjectileBehavior,
                kind: Piercing,
                parameters: { "max_pierce": 2.0 },
            ),
        ],
    )"#;

    fn weapon(id: &str, extra_effect: &str, fire_rate: i64, ammo: i64) -> String {
        format!(
            r#"(
                id: "{id}",
                name: "Test {id}",
                type: Ranged,
                stats: (
                    damage: 8.0,
                    fire_rate: {fire_rate},
                    projectile_speed: 6.0,
                    accuracy: 1.0,
                    reload_time: 30,
                    ammo_capacity: {ammo},
                    range: 300.0,
                    pierce_damage_reduction: 0.0,
                ),
                projectile: (size: 4.0, color: (255, 255, 255), lifetime: 60, trail: false),
                effects: [{extra_effect}],
            )"#
        )
    }

    fn weapons(records: &[String]) -> String {
        format!("(weapons: [{}])", records.join(","))
    }

    #[test]
    fn test_builtin_catalog_loads_cleanly() {
        let catalog = Catalog::load(BUILTIN_EFFECTS, BUILTIN_WEAPONS).unwrap();
        assert!(catalog.rejected().is_empty(), "{:?}", catalog.rejected());
        assert!(catalog.len() >= 5);
        assert!(catalog.effects().len() >= 8);
    }

    #[test]
    fn test_load_directory_matches_builtin() {
        let mut loader = CatalogLoader::new();
        loader
            .load_directory(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog"))
            .unwrap();
        let from_disk = loader.finish().unwrap();
        let builtin = Catalog::builtin();
        assert_eq!(
            from_disk.weapon_ids().collect::<Vec<_>>(),
            builtin.weapon_ids().collect::<Vec<_>>()
        );
        assert_eq!(from_disk.effects().len(), builtin.effects().len());
    }

    #[test]
    fn test_unknown_effect_rejects_only_that_weapon() {
        let src = weapons(&[
            weapon("good", "\"pierce_two\"", 10, -1),
            weapon("bad", "\"does_not_exist\"", 10, -1),
        ]);
        let catalog = Catalog::load(EFFECTS, &src).unwrap();
        assert!(catalog.contains("good"));
        assert!(!catalog.contains("bad"));
        assert_eq!(catalog.rejected().len(), 1);
        assert!(matches!(
            catalog.rejected()[0].1,
            ConfigError::UnknownEffect { ref effect, .. } if effect == "does_not_exist"
        ));
    }

    #[test]
    fn test_out_of_domain_fields_rejected() {
        let src = weapons(&[
            weapon("negative_rate", "", -5, -1),
            weapon("zero_ammo", "", 10, 0),
            weapon("fine", "", 10, 5),
        ]);
        let catalog = Catalog::load(EFFECTS, &src).unwrap();
        assert_eq!(catalog.len(), 1);
        let reasons: Vec<_> = catalog
            .rejected()
            .iter()
            .map(|(_, err)| match err {
                ConfigError::OutOfDomain { field, .. } => *field,
                other => panic!("unexpected error {:?}", other),
            })
            .collect();
        assert_eq!(reasons, vec!["fire_rate", "ammo_capacity"]);
    }

    #[test]
    fn test_empty_catalog_falls_back() {
        let src = weapons(&[weapon("broken", "\"missing\"", 10, -1)]);
        assert!(matches!(Catalog::load(EFFECTS, &src), Err(ConfigError::Empty)));

        let catalog = Catalog::load_or_fallback(EFFECTS, &src);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(FALLBACK_WEAPON_ID));
    }

    #[test]
    fn test_unparseable_source_falls_back() {
        let catalog = Catalog::load_or_fallback("not ron at all", "(weapons: [])");
        assert_eq!(catalog.weapon_ids().collect::<Vec<_>>(), vec![FALLBACK_WEAPON_ID]);
    }

    #[test]
    fn test_malformed_weapon_rejects_only_that_weapon() {
        let missing_range = weapon("bad", "", 10, -1).replace("range: 300.0,", "");
        let src = weapons(&[
            weapon("good", "", 10, -1),
            missing_range,
            weapon("also_good", "\"pierce_two\"", 10, -1),
        ]);
        let catalog = Catalog::load(EFFECTS, &src).unwrap();
        assert!(catalog.contains("good"));
        assert!(catalog.contains("also_good"));
        assert!(!catalog.contains("bad"));
        assert_eq!(catalog.rejected().len(), 1);
        assert_eq!(catalog.rejected()[0].0, "bad");
        assert!(matches!(catalog.rejected()[0].1, ConfigError::Ron(_)));

        let degraded = Catalog::load_or_fallback(EFFECTS, &src);
        assert_eq!(
            degraded.weapon_ids().collect::<Vec<_>>(),
            vec!["also_good", "good"]
        );
    }

    #[test]
    fn test_unknown_effect_category_rejects_only_that_effect() {
        let effects = r#"(
            effects: [
                (
                    name: "hex",
                    category: Arcane,
                    kind: Corruption,
                    parameters: { "amount": 5.0 },
                ),
                (
                    name: "pierce_two",
                    category: ProjectileBehavior,
                    kind: Piercing,
                    parameters: { "max_pierce": 2.0 },
                ),
            ],
        )"#;
        let src = weapons(&[
            weapon("plain", "", 10, -1),
            weapon("piercer", "\"pierce_two\"", 10, -1),
        ]);
        let catalog = Catalog::load(effects, &src).unwrap();
        assert!(catalog.contains("plain"));
        assert!(catalog.contains("piercer"));
        assert!(catalog.effects().contains("pierce_two"));
        assert!(!catalog.effects().contains("hex"));
        assert_eq!(catalog.rejected().len(), 1);
        assert_eq!(catalog.rejected()[0].0, "hex");
        assert!(matches!(catalog.rejected()[0].1, ConfigError::Ron(_)));
    }

    #[test]
    fn test_unnamed_malformed_record_is_labelled_by_position() {
        let src = format!("(weapons: [{}, 42])", weapon("good", "", 10, -1));
        let catalog = Catalog::load(EFFECTS, &src).unwrap();
        assert!(catalog.contains("good"));
        assert_eq!(catalog.rejected()[0].0, "weapons[1]");
    }

    #[test]
    fn test_duplicate_weapon_ids() {
        let src = weapons(&[weapon("twin", "", 10, -1), weapon("twin", "", 20, -1)]);
        let catalog = Catalog::load(EFFECTS, &src).unwrap();
        assert_eq!(catalog.get("twin").unwrap().stats.fire_rate, 10);
        assert!(matches!(catalog.rejected()[0].1, ConfigError::Duplicate(_)));
    }

    #[test]
    fn test_morality_gating() {
        let req = MoralityRequirements {
            min_faith: 50.0,
            max_faith: f32::INFINITY,
            min_corruption: f32::NEG_INFINITY,
            max_corruption: 10.0,
        };
        assert!(req.allows(60.0, 0.0));
        assert!(!req.allows(40.0, 0.0));
        assert!(!req.allows(60.0, 20.0));

        let catalog = Catalog::builtin();
        let ids = |weapons: Vec<Arc<WeaponDefinition>>| -> Vec<String> {
            weapons.iter().map(|w| w.id.clone()).collect()
        };
        let saint = ids(catalog.weapons_for(100.0, 0.0));
        let sinner = ids(catalog.weapons_for(0.0, 100.0));
        assert!(saint.contains(&"holy_crossbow".to_string()));
        assert!(!saint.contains(&"hellfire_launcher".to_string()));
        assert!(sinner.contains(&"hellfire_launcher".to_string()));
        assert!(!sinner.contains(&"holy_crossbow".to_string()));
        // Ungated weapons are open to everyone
        assert!(saint.contains(&"pistol".to_string()) && sinner.contains(&"pistol".to_string()));
    }
}
