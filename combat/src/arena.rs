//! Entities the combat core can damage, and the container that holds them
//!
//! The combat core never type-tests entities. It talks to them through the
//! [`Target`] capability trait and reaches them through an
//! [`EntityContainer`]. [`Arena`] and [`Combatant`] are the in-memory versions
//! used by the simulation driver and the tests.

use bevy::math::{Rect, Vec2};
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::weapons::damage::DamageCategory;

// =============================================================================
// HANDLES
// =============================================================================

/// Generation-checked entity handle
///
/// Projectiles store these instead of references; a lookup that finds no
/// entity with a matching id means the entity is gone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

/// Hands out entity ids, reusing freed slots with a bumped generation
#[derive(Debug, Default)]
pub struct IdAllocator {
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl IdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            EntityId {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    pub fn release(&mut self, id: EntityId) {
        if self.is_live(id) {
            self.generations[id.index as usize] += 1;
            self.free.push(id.index);
        }
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.generations
            .get(id.index as usize)
            .is_some_and(|generation| *generation == id.generation)
            && !self.free.contains(&id.index)
    }
}

/// Which side an entity fights on. Projectiles only hit the opposing side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    #[default]
    Player,
    Enemy,
}

impl Faction {
    pub fn opponent(self) -> Faction {
        match self {
            Faction::Player => Faction::Enemy,
            Faction::Enemy => Faction::Player,
        }
    }
}

/// Collision circle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub radius: f32,
}

// =============================================================================
// STATUS EFFECTS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Slow,
    DamageOverTime,
    Corruption,
}

/// Lingering effect applied by an on-hit effect or an explosion
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatusEffect {
    /// Movement speed multiplier for `remaining` ticks
    Slow { factor: f32, remaining: u32 },
    /// Raw damage every tick (armor does not apply)
    DamageOverTime { damage_per_tick: f32, remaining: u32 },
    /// Permanent corruption added to the target
    Corruption { amount: f32 },
}

impl StatusEffect {
    pub fn kind(&self) -> StatusKind {
        match self {
            StatusEffect::Slow { .. } => StatusKind::Slow,
            StatusEffect::DamageOverTime { .. } => StatusKind::DamageOverTime,
            StatusEffect::Corruption { .. } => StatusKind::Corruption,
        }
    }
}

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Everything the combat core may ask of, or do to, a damageable entity
pub trait Target {
    fn id(&self) -> EntityId;
    fn faction(&self) -> Faction;
    /// `None` if the entity has no usable position/radius this tick
    fn body(&self) -> Option<Body>;
    fn health(&self) -> f32;

    fn armor(&self) -> f32 {
        0.0
    }
    fn damage_category(&self) -> DamageCategory {
        DamageCategory::Mortal
    }
    fn is_flammable(&self) -> bool {
        false
    }
    fn can_apply_status(&self, _kind: StatusKind) -> bool {
        false
    }
    /// Damage dealt to the player on touch; `None` uses the tuning default
    fn contact_damage(&self) -> Option<f32> {
        None
    }
    /// Experience awarded to the killer
    fn experience_value(&self) -> u32 {
        0
    }

    fn take_damage(&mut self, amount: f32);

    fn apply_status(&mut self, _status: StatusEffect) {}

    fn apply_knockback(&mut self, _offset: Vec2) {}

    /// Advance status effects by one tick, returning damage-over-time dealt
    fn tick_statuses(&mut self) -> f32 {
        0.0
    }

    fn is_alive(&self) -> bool {
        self.health() > 0.0
    }
}

/// Static axis-aligned obstacle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wall {
    pub rect: Rect,
}

impl Wall {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            rect: Rect::from_corners(min, max),
        }
    }
}

/// Mutable registry of the entities combat runs against
pub trait EntityContainer {
    type Entity: Target;

    fn player(&self) -> Option<&Self::Entity>;
    fn player_mut(&mut self) -> Option<&mut Self::Entity>;
    fn enemies(&self) -> &[Self::Entity];
    fn walls(&self) -> &[Wall];
    /// Playable area; projectiles leaving it are destroyed
    fn bounds(&self) -> Rect;

    /// Entities of one faction
    fn members(&self, faction: Faction) -> &[Self::Entity];
    fn members_mut(&mut self, faction: Faction) -> &mut [Self::Entity];
    /// Walls and one faction's entities, borrowed together
    fn walls_and_members_mut(&mut self, faction: Faction) -> (&[Wall], &mut [Self::Entity]);

    fn remove_enemy(&mut self, id: EntityId) -> Option<Self::Entity>;
}

// =============================================================================
// REFERENCE IMPLEMENTATION
// =============================================================================

/// Plain damageable entity: the player or an enemy
#[derive(Clone, Debug, PartialEq)]
pub struct Combatant {
    pub id: EntityId,
    pub faction: Faction,
    pub position: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub armor: f32,
    pub category: DamageCategory,
    pub flammable: bool,
    pub contact_damage: Option<f32>,
    pub experience: u32,
    /// Status kinds this entity shrugs off
    pub immune: Vec<StatusKind>,
    pub statuses: Vec<StatusEffect>,
    pub corruption: f32,
}

impl Combatant {
    pub fn new(faction: Faction, position: Vec2, radius: f32, health: f32) -> Self {
        Self {
            id: EntityId::default(),
            faction,
            position,
            radius,
            health,
            max_health: health,
            armor: 0.0,
            category: DamageCategory::Mortal,
            flammable: false,
            contact_damage: None,
            experience: 0,
            immune: Vec::new(),
            statuses: Vec::new(),
            corruption: 0.0,
        }
    }

    pub fn enemy(position: Vec2, radius: f32, health: f32) -> Self {
        Self::new(Faction::Enemy, position, radius, health)
    }

    pub fn with_armor(mut self, armor: f32) -> Self {
        self.armor = armor;
        self
    }

    pub fn with_category(mut self, category: DamageCategory) -> Self {
        self.category = category;
        self
    }

    pub fn flammable(mut self) -> Self {
        self.flammable = true;
        self
    }

    pub fn with_contact_damage(mut self, damage: f32) -> Self {
        self.contact_damage = Some(damage);
        self
    }

    pub fn with_experience(mut self, experience: u32) -> Self {
        self.experience = experience;
        self
    }

    pub fn immune_to(mut self, kind: StatusKind) -> Self {
        self.immune.push(kind);
        self
    }

    /// Current movement multiplier from the strongest active slow
    pub fn speed_multiplier(&self) -> f32 {
        self.statuses
            .iter()
            .filter_map(|status| match status {
                StatusEffect::Slow { factor, .. } => Some(*factor),
                _ => None,
            })
            .fold(1.0, f32::min)
    }
}

impl Target for Combatant {
    fn id(&self) -> EntityId {
        self.id
    }

    fn faction(&self) -> Faction {
        self.faction
    }

    fn body(&self) -> Option<Body> {
        let valid = self.position.is_finite() && self.radius.is_finite() && self.radius > 0.0;
        valid.then_some(Body {
            position: self.position,
            radius: self.radius,
        })
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn armor(&self) -> f32 {
        self.armor
    }

    fn damage_category(&self) -> DamageCategory {
        self.category
    }

    fn is_flammable(&self) -> bool {
        self.flammable
    }

    fn can_apply_status(&self, kind: StatusKind) -> bool {
        !self.immune.contains(&kind)
    }

    fn contact_damage(&self) -> Option<f32> {
        self.contact_damage
    }

    fn experience_value(&self) -> u32 {
        self.experience
    }

    fn take_damage(&mut self, amount: f32) {
        self.health -= amount.max(0.0);
    }

    /// A new slow or damage-over-time replaces the running one of the same kind
    fn apply_status(&mut self, status: StatusEffect) {
        if let StatusEffect::Corruption { amount } = status {
            self.corruption += amount;
            return;
        }
        let kind = status.kind();
        self.statuses.retain(|existing| existing.kind() != kind);
        self.statuses.push(status);
    }

    fn apply_knockback(&mut self, offset: Vec2) {
        self.position += offset;
    }

    fn tick_statuses(&mut self) -> f32 {
        let mut dealt = 0.0;
        for status in &mut self.statuses {
            match status {
                StatusEffect::Slow { remaining, .. } => {
                    *remaining = remaining.saturating_sub(1);
                }
                StatusEffect::DamageOverTime {
                    damage_per_tick,
                    remaining,
                } => {
                    dealt += *damage_per_tick;
                    *remaining = remaining.saturating_sub(1);
                }
                StatusEffect::Corruption { .. } => {}
            }
        }
        self.statuses.retain(|status| match status {
            StatusEffect::Slow { remaining, .. }
            | StatusEffect::DamageOverTime { remaining, .. } => *remaining > 0,
            StatusEffect::Corruption { .. } => false,
        });
        if dealt > 0.0 {
            self.take_damage(dealt);
        }
        dealt
    }
}

/// In-memory entity container
#[derive(Resource, Debug)]
pub struct Arena {
    ids: IdAllocator,
    player: Option<Combatant>,
    enemies: Vec<Combatant>,
    walls: Vec<Wall>,
    bounds: Rect,
}

impl Arena {
    pub fn new(bounds: Rect) -> Self {
        Self {
            ids: IdAllocator::default(),
            player: None,
            enemies: Vec::new(),
            walls: Vec::new(),
            bounds,
        }
    }

    /// Place the player, replacing any previous one
    pub fn spawn_player(&mut self, mut player: Combatant) -> EntityId {
        if let Some(old) = self.player.take() {
            self.ids.release(old.id);
        }
        player.id = self.ids.allocate();
        player.faction = Faction::Player;
        let id = player.id;
        self.player = Some(player);
        id
    }

    pub fn spawn_enemy(&mut self, mut enemy: Combatant) -> EntityId {
        enemy.id = self.ids.allocate();
        enemy.faction = Faction::Enemy;
        let id = enemy.id;
        self.enemies.push(enemy);
        id
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    pub fn enemy(&self, id: EntityId) -> Option<&Combatant> {
        self.enemies.iter().find(|enemy| enemy.id == id)
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.ids.is_live(id)
    }
}

impl EntityContainer for Arena {
    type Entity = Combatant;

    fn player(&self) -> Option<&Combatant> {
        self.player.as_ref()
    }

    fn player_mut(&mut self) -> Option<&mut Combatant> {
        self.player.as_mut()
    }

    fn enemies(&self) -> &[Combatant] {
        &self.enemies
    }

    fn walls(&self) -> &[Wall] {
        &self.walls
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn members(&self, faction: Faction) -> &[Combatant] {
        match faction {
            Faction::Player => self.player.as_slice(),
            Faction::Enemy => &self.enemies,
        }
    }

    fn members_mut(&mut self, faction: Faction) -> &mut [Combatant] {
        match faction {
            Faction::Player => self.player.as_mut_slice(),
            Faction::Enemy => &mut self.enemies,
        }
    }

    fn walls_and_members_mut(&mut self, faction: Faction) -> (&[Wall], &mut [Combatant]) {
        let members = match faction {
            Faction::Player => self.player.as_mut_slice(),
            Faction::Enemy => self.enemies.as_mut_slice(),
        };
        (&self.walls, members)
    }

    fn remove_enemy(&mut self, id: EntityId) -> Option<Combatant> {
        let index = self.enemies.iter().position(|enemy| enemy.id == id)?;
        self.ids.release(id);
        Some(self.enemies.remove(index))
    }
}
