//! Projectile engine - spawning, movement, hits and explosions
//!
//! Projectiles are plain data owned by [`ProjectileEngine`]. The behavior that
//! acts on them lives in [`ProjectileRules`], which is kept in its own field so
//! the live set can be iterated mutably while the rules are borrowed.
//!
//! Lifecycle: `Flying -> (hit with pierce left) -> Flying -> Destroyed`.
//! Destroyed projectiles stay in the live set until [`ProjectileEngine::compact`]
//! runs after the collision scan.

use std::collections::HashSet;

use bevy::math::{Rect, Vec2};
use bevy::prelude::Resource;
use rand::Rng;
use tracing::{debug, warn};

use crate::arena::{EntityContainer, EntityId, Faction, StatusEffect, StatusKind, Target, Wall};
use crate::catalog::WeaponDefinition;
use crate::effects::{Effect, EffectCatalog};
use crate::resolver::{CollisionEvent, TickLedger};
use crate::tuning::CombatTuning;
use crate::weapons::ballistics::{
    apply_jitter, circle_hits_rect, direction_from_heading, heading, in_cone, spread_headings,
    step_linear, steer_towards,
};
use crate::weapons::damage::{calculate_damage, explosion_damage, DamageModifiers, DamageSource};
use crate::weapons::ModifiedStats;

/// Assigned when the projectile joins the engine's live set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(pub u64);

/// Who fired a projectile. Only used for attribution and faction filtering;
/// the owner may be gone by the time the projectile lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shooter {
    pub id: EntityId,
    pub faction: Faction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestroyReason {
    Expired,
    OutOfBounds,
    Wall,
    /// Used up by a hit with no pierce left
    Consumed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProjectileState {
    #[default]
    Flying,
    Destroyed(DestroyReason),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HomingState {
    /// Max heading change per tick, radians
    pub turn_rate: f32,
    pub tracking_range: f32,
    pub target: Option<EntityId>,
}

/// Stationary cone attack
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeleeCone {
    /// Heading the cone opens toward
    pub facing: f32,
    pub half_angle: f32,
    pub range: f32,
    /// Entities damaged per swing
    pub max_targets: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    Linear,
    Homing(HomingState),
    Melee(MeleeCone),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExplosionSpec {
    pub radius: f32,
    /// Fraction of the projectile's damage dealt at the center
    pub damage_fraction: f32,
}

/// A detonation waiting to be applied
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Explosion {
    pub source: ProjectileId,
    pub position: Vec2,
    pub radius: f32,
    pub base_damage: f32,
    pub damage_fraction: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner: Shooter,
    pub position: Vec2,
    /// Distance per tick; zero for melee
    pub velocity: Vec2,
    pub radius: f32,
    /// Snapshotted at spawn; owner upgrades granted later don't apply
    pub damage: f32,
    pub lifetime: u32,
    pub age: u32,
    /// Entities already damaged by this projectile
    pub hit_set: HashSet<EntityId>,
    pub pierce_count: u32,
    pub max_pierce: u32,
    /// Damage lost per pierced entity
    pub pierce_damage_reduction: f32,
    pub piercing: bool,
    pub explosive: bool,
    pub homing: bool,
    pub explosion: ExplosionSpec,
    pub modifiers: DamageModifiers,
    /// `OnHit` effects applied to every entity struck
    pub on_hit: Vec<Effect>,
    pub motion: Motion,
    pub state: ProjectileState,
    pending_explosion: Option<Explosion>,
}

impl Projectile {
    /// Plain linear projectile with no effects
    pub fn new(
        owner: Shooter,
        position: Vec2,
        velocity: Vec2,
        radius: f32,
        damage: f32,
        lifetime: u32,
    ) -> Self {
        Self {
            id: ProjectileId::default(),
            owner,
            position,
            velocity,
            radius,
            damage,
            lifetime,
            age: 0,
            hit_set: HashSet::new(),
            pierce_count: 0,
            max_pierce: 0,
            pierce_damage_reduction: 0.0,
            piercing: false,
            explosive: false,
            homing: false,
            explosion: ExplosionSpec {
                radius: 0.0,
                damage_fraction: 0.0,
            },
            modifiers: DamageModifiers::default(),
            on_hit: Vec::new(),
            motion: Motion::Linear,
            state: ProjectileState::Flying,
            pending_explosion: None,
        }
    }

    pub fn with_piercing(mut self, max_pierce: u32, damage_reduction: f32) -> Self {
        self.piercing = true;
        self.max_pierce = max_pierce;
        self.pierce_damage_reduction = damage_reduction;
        self
    }

    pub fn with_explosion(mut self, radius: f32, damage_fraction: f32) -> Self {
        self.explosive = true;
        self.explosion = ExplosionSpec {
            radius,
            damage_fraction,
        };
        self
    }

    pub fn with_homing(mut self, turn_rate: f32, tracking_range: f32) -> Self {
        self.homing = true;
        self.motion = Motion::Homing(HomingState {
            turn_rate,
            tracking_range,
            target: None,
        });
        self
    }

    pub fn is_alive(&self) -> bool {
        self.state == ProjectileState::Flying
    }

    pub fn is_melee(&self) -> bool {
        matches!(self.motion, Motion::Melee(_))
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn homing_target(&self) -> Option<EntityId> {
        match self.motion {
            Motion::Homing(homing) => homing.target,
            _ => None,
        }
    }

    pub fn destroy(&mut self, reason: DestroyReason) {
        if self.is_alive() {
            self.state = ProjectileState::Destroyed(reason);
        }
    }

    /// Take a detonation queued by a consuming hit
    pub fn take_explosion(&mut self) -> Option<Explosion> {
        self.pending_explosion.take()
    }

    fn explosion_here(&self) -> Explosion {
        Explosion {
            source: self.id,
            position: self.position,
            radius: self.explosion.radius,
            base_damage: self.damage,
            damage_fraction: self.explosion.damage_fraction,
        }
    }
}

/// Weapon effects folded into what a projectile needs at spawn
#[derive(Default)]
struct Loadout {
    multi_shot: Option<(u32, f32)>,
    max_pierce: Option<u32>,
    explosion: Option<ExplosionSpec>,
    homing: Option<(f32, f32)>,
    melee_arc: Option<(f32, u32)>,
    modifiers: DamageModifiers,
    on_hit: Vec<Effect>,
}

impl Loadout {
    fn resolve(weapon: &WeaponDefinition, effects: &EffectCatalog) -> Self {
        let mut loadout = Loadout::default();
        for name in &weapon.effects {
            let Some(effect) = effects.get(name) else {
                warn!("Weapon `{}` fired with unloaded effect `{}`", weapon.id, name);
                continue;
            };
            match effect {
                Effect::Piercing { max_pierce } => {
                    loadout.max_pierce = Some(loadout.max_pierce.unwrap_or(0).max(*max_pierce));
                }
                Effect::Homing {
                    turn_rate,
                    tracking_range,
                } => loadout.homing = Some((*turn_rate, *tracking_range)),
                Effect::Explosive {
                    radius,
                    damage_fraction,
                } => {
                    loadout.explosion = Some(ExplosionSpec {
                        radius: *radius,
                        damage_fraction: *damage_fraction,
                    })
                }
                Effect::MultiShot { count, spread } => loadout.multi_shot = Some((*count, *spread)),
                Effect::MeleeArc { arc, max_targets } => {
                    loadout.melee_arc = Some((*arc, *max_targets))
                }
                Effect::CategoryBonus {
                    categories,
                    multiplier,
                } => {
                    // First bonus wins; stacking bonuses is not supported
                    if loadout.modifiers.bonus.is_none() {
                        loadout.modifiers.bonus = Some((categories.clone(), *multiplier));
                    }
                }
                Effect::ArmorPenetration { amount } => {
                    loadout.modifiers.armor_penetration += amount;
                }
                Effect::Corruption { .. } | Effect::Slow { .. } | Effect::DamageOverTime { .. } => {
                    loadout.on_hit.push(effect.clone())
                }
            }
        }
        loadout
    }
}

fn roll<R: Rng>(chance: f32, rng: &mut R) -> bool {
    chance >= 1.0 || (chance > 0.0 && rng.gen::<f32>() < chance)
}

/// Projectile behavior, parameterized by tuning
#[derive(Clone, Debug, Default)]
pub struct ProjectileRules {
    pub tuning: CombatTuning,
}

impl ProjectileRules {
    /// Advance one projectile by a tick. Returns false once it is destroyed.
    ///
    /// `targets` are the entities of the faction this projectile can hurt.
    pub fn update<E: Target, R: Rng>(
        &self,
        projectile: &mut Projectile,
        walls: &[Wall],
        bounds: Rect,
        targets: &mut [E],
        rng: &mut R,
        ledger: &mut TickLedger,
    ) -> bool {
        if !projectile.is_alive() {
            return false;
        }

        projectile.age += 1;
        if projectile.age >= projectile.lifetime {
            projectile.destroy(DestroyReason::Expired);
            return false;
        }

        match projectile.motion {
            Motion::Melee(cone) => {
                self.strike(projectile, cone, targets, rng, ledger);
                return true;
            }
            Motion::Homing(_) => steer_homing(projectile, targets),
            Motion::Linear => {}
        }

        projectile.position = step_linear(projectile.position, projectile.velocity);

        if walls
            .iter()
            .any(|wall| circle_hits_rect(projectile.position, projectile.radius, wall.rect))
        {
            if projectile.explosive {
                self.explode(projectile.explosion_here(), targets, ledger);
            }
            projectile.destroy(DestroyReason::Wall);
            return false;
        }

        if !bounds.contains(projectile.position) {
            projectile.destroy(DestroyReason::OutOfBounds);
            return false;
        }

        true
    }

    /// Apply a hit. Returns true if the projectile was consumed.
    ///
    /// An entity already in the hit-set is ignored. A consuming hit on an
    /// explosive projectile queues the explosion; collect it with
    /// [`Projectile::take_explosion`].
    pub fn hit<E: Target, R: Rng>(
        &self,
        projectile: &mut Projectile,
        target: &mut E,
        rng: &mut R,
        ledger: &mut TickLedger,
    ) -> bool {
        if !projectile.is_alive() {
            return false;
        }
        let entity = target.id();
        if !projectile.hit_set.insert(entity) {
            return false;
        }

        let damage = calculate_damage(
            projectile.damage,
            &projectile.modifiers,
            target.damage_category(),
            target.armor(),
        );
        let was_alive = target.is_alive();
        target.take_damage(damage);
        ledger.record(CollisionEvent {
            projectile: projectile.id,
            entity,
            damage,
            killed: was_alive && !target.is_alive(),
            source: if projectile.is_melee() {
                DamageSource::Melee
            } else {
                DamageSource::Projectile
            },
        });

        if target.is_alive() {
            apply_on_hit(&projectile.on_hit, target, rng);
        }

        // Melee swings end by time, never by hits
        if projectile.is_melee() {
            return false;
        }

        if projectile.piercing && projectile.pierce_count < projectile.max_pierce {
            projectile.pierce_count += 1;
            projectile.damage *= 1.0 - projectile.pierce_damage_reduction;
            return false;
        }

        if projectile.explosive {
            projectile.pending_explosion = Some(projectile.explosion_here());
        }
        projectile.destroy(DestroyReason::Consumed);
        true
    }

    /// Area damage with linear falloff. Never spawns projectiles.
    pub fn explode<E: Target>(&self, explosion: Explosion, targets: &mut [E], ledger: &mut TickLedger) {
        ledger.explosion(explosion.position);
        debug!(
            "Explosion at {:?} (radius {}, {} base damage)",
            explosion.position, explosion.radius, explosion.base_damage
        );

        for target in targets.iter_mut() {
            if !target.is_alive() {
                continue;
            }
            let Some(body) = target.body() else {
                continue;
            };
            let distance = explosion.position.distance(body.position);
            let damage = explosion_damage(
                explosion.base_damage,
                explosion.damage_fraction,
                distance,
                explosion.radius,
            );
            if damage <= 0.0 {
                continue;
            }

            target.take_damage(damage);
            ledger.record(CollisionEvent {
                projectile: explosion.source,
                entity: target.id(),
                damage,
                killed: !target.is_alive(),
                source: DamageSource::Explosion,
            });

            if target.is_alive()
                && target.is_flammable()
                && target.can_apply_status(StatusKind::DamageOverTime)
            {
                target.apply_status(StatusEffect::DamageOverTime {
                    damage_per_tick: self.tuning.burn_damage_per_tick,
                    remaining: self.tuning.burn_ticks,
                });
            }
        }
    }

    /// One tick of a melee cone
    fn strike<E: Target, R: Rng>(
        &self,
        projectile: &mut Projectile,
        cone: MeleeCone,
        targets: &mut [E],
        rng: &mut R,
        ledger: &mut TickLedger,
    ) {
        for target in targets.iter_mut() {
            if projectile.hit_set.len() as u32 >= cone.max_targets {
                break;
            }
            if !target.is_alive() || projectile.hit_set.contains(&target.id()) {
                continue;
            }
            let Some(body) = target.body() else {
                continue;
            };
            if in_cone(
                projectile.position,
                cone.facing,
                cone.half_angle,
                cone.range + body.radius,
                body.position,
            ) {
                self.hit(projectile, target, rng, ledger);
            }
        }
    }
}

/// Turn a homing projectile toward its target, re-acquiring if needed
fn steer_homing<E: Target>(projectile: &mut Projectile, targets: &[E]) {
    let Projectile {
        motion,
        position,
        velocity,
        hit_set,
        ..
    } = projectile;
    let Motion::Homing(homing) = motion else {
        return;
    };
    let origin = *position;
    let range = homing.tracking_range;

    let trackable = |target: &E| -> Option<Vec2> {
        if !target.is_alive() || hit_set.contains(&target.id()) {
            return None;
        }
        let body = target.body()?;
        (body.position.distance(origin) <= range).then_some(body.position)
    };

    let locked = homing
        .target
        .and_then(|id| targets.iter().find(|target| target.id() == id))
        .and_then(|target| trackable(target));

    let aim_point = match locked {
        Some(point) => Some(point),
        None => {
            if let Some(lost) = homing.target.take() {
                debug!("Homing target {:?} lost, re-acquiring", lost);
            }
            // Strictly nearest; the first of equally near targets wins
            let mut nearest: Option<(EntityId, Vec2, f32)> = None;
            for target in targets {
                if let Some(point) = trackable(target) {
                    let distance = point.distance(origin);
                    if nearest.map_or(true, |(_, _, best)| distance < best) {
                        nearest = Some((target.id(), point, distance));
                    }
                }
            }
            nearest.map(|(id, point, _)| {
                homing.target = Some(id);
                point
            })
        }
    };

    if let Some(point) = aim_point {
        *velocity = steer_towards(*velocity, heading(point - origin), homing.turn_rate);
    }
}

fn apply_on_hit<E: Target, R: Rng>(effects: &[Effect], target: &mut E, rng: &mut R) {
    for effect in effects {
        let (chance, status) = match *effect {
            Effect::Corruption { chance, amount } => (chance, StatusEffect::Corruption { amount }),
            Effect::Slow {
                chance,
                factor,
                duration,
            } => (
                chance,
                StatusEffect::Slow {
                    factor,
                    remaining: duration,
                },
            ),
            Effect::DamageOverTime {
                chance,
                damage_per_tick,
                duration,
            } => (
                chance,
                StatusEffect::DamageOverTime {
                    damage_per_tick,
                    remaining: duration,
                },
            ),
            _ => continue,
        };
        if target.can_apply_status(status.kind()) && roll(chance, rng) {
            target.apply_status(status);
        }
    }
}

/// Owns every live projectile
#[derive(Resource, Debug, Default)]
pub struct ProjectileEngine {
    pub rules: ProjectileRules,
    live: Vec<Projectile>,
    next_id: u64,
}

impl ProjectileEngine {
    pub fn new(tuning: CombatTuning) -> Self {
        Self {
            rules: ProjectileRules { tuning },
            live: Vec::new(),
            next_id: 1,
        }
    }

    /// Build the projectiles for one trigger pull
    ///
    /// Accuracy jitter is rolled once for the aim, then multi-shot spreads the
    /// projectiles evenly around it. Melee weapons produce a single stationary
    /// cone attack. The result is not live until passed to [`Self::add`].
    #[allow(clippy::too_many_arguments)]
    pub fn spawn<R: Rng>(
        &self,
        weapon: &WeaponDefinition,
        stats: &ModifiedStats,
        effects: &EffectCatalog,
        origin: Vec2,
        aim: Vec2,
        owner: Shooter,
        rng: &mut R,
    ) -> Vec<Projectile> {
        let tuning = &self.rules.tuning;
        let loadout = Loadout::resolve(weapon, effects);
        let aim_heading = heading(aim);
        let template = self.template(stats, &loadout, origin, owner);

        if weapon.is_melee() {
            let (half_angle, max_targets) = loadout
                .melee_arc
                .map(|(arc, targets)| (arc * 0.5, targets))
                .unwrap_or((tuning.melee_half_angle(), tuning.melee_max_targets));
            let mut attack = template;
            attack.velocity = Vec2::ZERO;
            attack.motion = Motion::Melee(MeleeCone {
                facing: aim_heading,
                half_angle,
                range: stats.range,
                max_targets,
            });
            // Strikes on each of the next `melee_duration_ticks` updates
            attack.lifetime = tuning.melee_duration_ticks + 1;
            return vec![attack];
        }

        let max_jitter =
            (1.0 - stats.accuracy).max(0.0) * stats.accuracy_penalty_mult * tuning.max_inaccuracy();
        let aim_heading = apply_jitter(aim_heading, max_jitter, rng);

        let (count, spread) = match loadout.multi_shot {
            Some((count, spread)) => (count.saturating_add(stats.extra_projectiles), spread),
            None if stats.extra_projectiles > 0 => {
                (stats.extra_projectiles.saturating_add(1), tuning.default_spread())
            }
            None => (1, 0.0),
        };

        spread_headings(aim_heading, count, spread)
            .into_iter()
            .map(|angle| {
                let mut projectile = template.clone();
                projectile.velocity = direction_from_heading(angle) * stats.projectile_speed;
                projectile
            })
            .collect()
    }

    fn template(
        &self,
        stats: &ModifiedStats,
        loadout: &Loadout,
        origin: Vec2,
        owner: Shooter,
    ) -> Projectile {
        let tuning = &self.rules.tuning;
        let mut projectile = Projectile::new(
            owner,
            origin,
            Vec2::ZERO,
            stats.projectile_size,
            stats.damage,
            stats.lifetime,
        );

        if loadout.max_pierce.is_some() || stats.piercing {
            let from_upgrade = if stats.piercing { tuning.upgrade_max_pierce } else { 0 };
            projectile = projectile.with_piercing(
                loadout.max_pierce.unwrap_or(0).max(from_upgrade),
                stats.pierce_damage_reduction,
            );
        }

        if let Some(spec) = loadout.explosion {
            projectile = projectile.with_explosion(spec.radius, spec.damage_fraction);
        } else if stats.explosive {
            projectile = projectile.with_explosion(
                tuning.upgrade_explosion_radius,
                tuning.upgrade_explosion_fraction,
            );
        }

        if let Some((turn_rate, tracking_range)) = loadout.homing {
            projectile = projectile.with_homing(turn_rate, tracking_range);
        } else if stats.homing {
            projectile =
                projectile.with_homing(tuning.upgrade_turn_rate, tuning.upgrade_tracking_range);
        }

        projectile.modifiers = loadout.modifiers.clone();
        projectile.on_hit = loadout.on_hit.clone();
        projectile
    }

    /// Make a projectile live, assigning its id
    pub fn add(&mut self, mut projectile: Projectile) -> ProjectileId {
        projectile.id = ProjectileId(self.next_id.max(1));
        self.next_id = projectile.id.0 + 1;
        let id = projectile.id;
        self.live.push(projectile);
        id
    }

    pub fn extend(&mut self, projectiles: impl IntoIterator<Item = Projectile>) -> Vec<ProjectileId> {
        projectiles
            .into_iter()
            .map(|projectile| self.add(projectile))
            .collect()
    }

    pub fn live(&self) -> &[Projectile] {
        &self.live
    }

    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.live.iter().find(|projectile| projectile.id == id)
    }

    /// Rules and the live set, borrowed together
    pub fn parts_mut(&mut self) -> (&ProjectileRules, &mut [Projectile]) {
        (&self.rules, &mut self.live)
    }

    /// Move and age every live projectile; walls are handled here, before
    /// the entity scan
    pub fn update_all<C: EntityContainer, R: Rng>(
        &mut self,
        container: &mut C,
        rng: &mut R,
        ledger: &mut TickLedger,
    ) {
        let bounds = container.bounds();
        for projectile in self.live.iter_mut() {
            if !projectile.is_alive() {
                continue;
            }
            let (walls, targets) =
                container.walls_and_members_mut(projectile.owner.faction.opponent());
            self.rules
                .update(projectile, walls, bounds, targets, rng, ledger);
        }
    }

    /// Drop destroyed projectiles. Returns how many were removed.
    pub fn compact(&mut self) -> usize {
        let before = self.live.len();
        self.live.retain(Projectile::is_alive);
        before - self.live.len()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
