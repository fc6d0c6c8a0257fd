//! Weapon system - upgrades, equipped weapon state and arsenals
//!
//! A [`WeaponInstance`] wraps one shared catalog definition with the mutable
//! state of a held weapon (ammo, reload, cooldown) and a snapshot of its stats
//! after the owner's global upgrades. Snapshots are rebuilt when an upgrade is
//! granted, never per shot.

pub mod ballistics;
pub mod damage;

use std::sync::Arc;

use bevy::math::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{Catalog, WeaponDefinition};
use crate::effects::EffectCatalog;
use crate::error::EquipError;
use crate::projectile::{Projectile, ProjectileEngine, Shooter};

// =============================================================================
// UPGRADES
// =============================================================================

/// Upper bound on extra projectiles an owner can stack
pub const MAX_EXTRA_PROJECTILES: u32 = 32;

/// Owner-level upgrade, applied to every weapon the owner holds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Flat damage added to every projectile
    Damage(f32),
    /// Multiplies ticks between shots (0.8 = 20% faster)
    FireRate(f32),
    /// Extra projectiles per shot
    MultiShot(u32),
    Piercing,
    Explosive,
    Homing,
    /// Multiplies projectile radius
    BulletSize(f32),
    /// Multiplies the inaccuracy penalty (0.5 = half the jitter)
    Accuracy(f32),
}

/// Accumulated global upgrades of one owner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Upgrades {
    pub damage_bonus: f32,
    pub fire_rate_mult: f32,
    pub extra_projectiles: u32,
    pub piercing: bool,
    pub explosive: bool,
    pub homing: bool,
    pub size_mult: f32,
    pub accuracy_penalty_mult: f32,
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            damage_bonus: 0.0,
            fire_rate_mult: 1.0,
            extra_projectiles: 0,
            piercing: false,
            explosive: false,
            homing: false,
            size_mult: 1.0,
            accuracy_penalty_mult: 1.0,
        }
    }
}

impl Upgrades {
    /// Fold an upgrade into the totals. Returns false if it was ignored.
    pub fn apply(&mut self, kind: UpgradeKind) -> bool {
        match kind {
            UpgradeKind::Damage(amount) if amount.is_finite() => self.damage_bonus += amount,
            UpgradeKind::FireRate(mult) if mult.is_finite() && mult > 0.0 => {
                self.fire_rate_mult *= mult
            }
            UpgradeKind::MultiShot(extra)
                if self.extra_projectiles.saturating_add(extra) <= MAX_EXTRA_PROJECTILES =>
            {
                self.extra_projectiles += extra
            }
            UpgradeKind::Piercing => self.piercing = true,
            UpgradeKind::Explosive => self.explosive = true,
            UpgradeKind::Homing => self.homing = true,
            UpgradeKind::BulletSize(mult) if mult.is_finite() && mult > 0.0 => {
                self.size_mult *= mult
            }
            UpgradeKind::Accuracy(mult) if mult.is_finite() && mult >= 0.0 => {
                self.accuracy_penalty_mult *= mult
            }
            other => {
                warn!("Ignoring out-of-range upgrade {:?}", other);
                return false;
            }
        }
        true
    }
}

/// A weapon's stats after the owner's upgrades
#[derive(Clone, Debug, PartialEq)]
pub struct ModifiedStats {
    pub damage: f32,
    /// Ticks between shots, at least 1
    pub fire_rate: u32,
    pub projectile_speed: f32,
    pub accuracy: f32,
    /// Scales the jitter that `accuracy < 1.0` produces
    pub accuracy_penalty_mult: f32,
    pub reload_time: u32,
    pub ammo_capacity: Option<u32>,
    pub range: f32,
    pub pierce_damage_reduction: f32,
    pub projectile_size: f32,
    pub lifetime: u32,
    pub extra_projectiles: u32,
    pub piercing: bool,
    pub explosive: bool,
    pub homing: bool,
}

impl ModifiedStats {
    pub fn compute(definition: &WeaponDefinition, upgrades: &Upgrades) -> Self {
        let base = &definition.stats;
        let fire_rate = (base.fire_rate as f32 * upgrades.fire_rate_mult).round().max(1.0);

        Self {
            damage: (base.damage + upgrades.damage_bonus).max(0.0),
            fire_rate: fire_rate as u32,
            projectile_speed: base.projectile_speed,
            accuracy: base.accuracy,
            accuracy_penalty_mult: upgrades.accuracy_penalty_mult,
            reload_time: base.reload_time,
            ammo_capacity: base.ammo_capacity,
            range: base.range,
            pierce_damage_reduction: base.pierce_damage_reduction,
            projectile_size: definition.projectile.size * upgrades.size_mult,
            lifetime: definition.projectile.lifetime,
            extra_projectiles: upgrades.extra_projectiles,
            piercing: upgrades.piercing,
            explosive: upgrades.explosive,
            homing: upgrades.homing,
        }
    }
}

// =============================================================================
// WEAPON INSTANCE
// =============================================================================

/// One equipped weapon
#[derive(Clone, Debug)]
pub struct WeaponInstance {
    definition: Arc<WeaponDefinition>,
    stats: ModifiedStats,
    /// `None` = infinite
    ammo: Option<u32>,
    reloading: bool,
    reload_remaining: u32,
    cooldown: u32,
}

impl WeaponInstance {
    pub fn new(definition: Arc<WeaponDefinition>, upgrades: &Upgrades) -> Self {
        let stats = ModifiedStats::compute(&definition, upgrades);
        Self {
            ammo: stats.ammo_capacity,
            stats,
            definition,
            reloading: false,
            reload_remaining: 0,
            cooldown: 0,
        }
    }

    pub fn definition(&self) -> &Arc<WeaponDefinition> {
        &self.definition
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn stats(&self) -> &ModifiedStats {
        &self.stats
    }

    pub fn ammo(&self) -> Option<u32> {
        self.ammo
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    pub fn reload_remaining(&self) -> u32 {
        self.reload_remaining
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Rebuild the stats snapshot after the owner's upgrades changed
    pub fn apply_upgrades(&mut self, upgrades: &Upgrades) {
        self.stats = ModifiedStats::compute(&self.definition, upgrades);
    }

    /// Check if weapon can fire (cooldown passed, not reloading, has ammo)
    pub fn can_fire(&self) -> bool {
        self.cooldown == 0 && !self.reloading && self.ammo.map_or(true, |ammo| ammo > 0)
    }

    /// Fire the weapon toward `target`
    ///
    /// Returns the spawned projectiles, or nothing if the weapon can't fire.
    /// They are not live until handed to [`ProjectileEngine::add`].
    pub fn fire<R: Rng>(
        &mut self,
        engine: &ProjectileEngine,
        effects: &EffectCatalog,
        origin: Vec2,
        target: Vec2,
        owner: Shooter,
        rng: &mut R,
    ) -> Vec<Projectile> {
        if !self.can_fire() {
            return Vec::new();
        }

        if let Some(ammo) = self.ammo.as_mut() {
            *ammo -= 1;
        }
        self.cooldown = self.stats.fire_rate;

        let projectiles = engine.spawn(
            &self.definition,
            &self.stats,
            effects,
            origin,
            target - origin,
            owner,
            rng,
        );

        if self.ammo == Some(0) {
            self.start_reload();
        }
        projectiles
    }

    /// Begin reloading. No-op while reloading, when full, or with infinite ammo.
    pub fn start_reload(&mut self) {
        let Some(capacity) = self.stats.ammo_capacity else {
            return;
        };
        if self.reloading || self.ammo == Some(capacity) {
            return;
        }
        self.reloading = true;
        self.reload_remaining = self.stats.reload_time;
        debug!("{} reloading ({} ticks)", self.definition.id, self.reload_remaining);
    }

    /// Advance cooldown and reload by one tick
    pub fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);

        if self.reloading {
            self.reload_remaining = self.reload_remaining.saturating_sub(1);
            if self.reload_remaining == 0 {
                self.ammo = self.stats.ammo_capacity;
                self.reloading = false;
            }
        }
    }
}

// =============================================================================
// ARSENAL
// =============================================================================

/// Every weapon an owner holds plus the upgrades that apply to all of them
#[derive(Clone, Debug, Default)]
pub struct Arsenal {
    upgrades: Upgrades,
    weapons: Vec<WeaponInstance>,
    active: usize,
}

impl Arsenal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weapons(&self) -> &[WeaponInstance] {
        &self.weapons
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> Option<&WeaponInstance> {
        self.weapons.get(self.active)
    }

    /// Add a weapon if the owner's alignment allows it. Returns its slot.
    pub fn equip(
        &mut self,
        definition: Arc<WeaponDefinition>,
        faith: f32,
        corruption: f32,
    ) -> Result<usize, EquipError> {
        if !definition.allows(faith, corruption) {
            return Err(EquipError::MoralityLocked {
                id: definition.id.clone(),
                faith,
                corruption,
            });
        }
        self.weapons
            .push(WeaponInstance::new(definition, &self.upgrades));
        Ok(self.weapons.len() - 1)
    }

    /// Look a weapon up in the catalog and equip it
    pub fn equip_id(
        &mut self,
        catalog: &Catalog,
        id: &str,
        faith: f32,
        corruption: f32,
    ) -> Result<usize, EquipError> {
        let definition = catalog
            .get(id)
            .ok_or_else(|| EquipError::UnknownWeapon(id.to_string()))?;
        self.equip(definition, faith, corruption)
    }

    /// Grant an upgrade and refresh every weapon's snapshot
    pub fn grant(&mut self, kind: UpgradeKind) {
        if !self.upgrades.apply(kind) {
            return;
        }
        for weapon in &mut self.weapons {
            weapon.apply_upgrades(&self.upgrades);
        }
    }

    pub fn switch_to(&mut self, index: usize) -> bool {
        if index < self.weapons.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Select the next weapon, wrapping around
    pub fn cycle(&mut self) {
        if !self.weapons.is_empty() {
            self.active = (self.active + 1) % self.weapons.len();
        }
    }

    /// Drop a weapon; the active slot stays on the same weapon where possible
    pub fn discard(&mut self, index: usize) -> Option<WeaponInstance> {
        if index >= self.weapons.len() {
            return None;
        }
        let removed = self.weapons.remove(index);
        if index < self.active || self.active >= self.weapons.len() {
            self.active = self.active.saturating_sub(1);
        }
        Some(removed)
    }

    /// Tick every held weapon; reloads continue while holstered
    pub fn tick(&mut self) {
        for weapon in &mut self.weapons {
            weapon.tick();
        }
    }
}
