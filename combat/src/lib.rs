//! Combat core for a top-down arena shooter
//!
//! Data-driven weapons and effects, a projectile engine (linear, homing and
//! melee-cone attacks with piercing and explosions) and the per-tick collision
//! resolver that applies damage and reports kills exactly once.
//!
//! Everything runs on one thread in fixed ticks. Catalogs are read-only after
//! load and shared behind `Arc`.

pub mod arena;
pub mod catalog;
pub mod effects;
pub mod error;
pub mod plugin;
pub mod projectile;
pub mod resolver;
pub mod simulation;
pub mod tuning;
pub mod weapons;

pub use arena::{
    Arena, Body, Combatant, EntityContainer, EntityId, Faction, StatusEffect, StatusKind, Target,
    Wall,
};
pub use catalog::{Catalog, CatalogLoader, WeaponClass, WeaponDefinition};
pub use effects::{Effect, EffectCatalog, EffectCategory, EffectDescriptor, EffectKind};
pub use error::{ConfigError, EquipError};
pub use plugin::CombatPlugin;
pub use projectile::{Projectile, ProjectileEngine, ProjectileId, ProjectileState, Shooter};
pub use resolver::{CollisionEvent, CollisionResolver, CombatObserver, KillReport, TickLedger};
pub use simulation::{Simulation, TickReport};
pub use tuning::CombatTuning;
pub use weapons::damage::{DamageCategory, DamageSource};
pub use weapons::{Arsenal, ModifiedStats, UpgradeKind, Upgrades, WeaponInstance};
