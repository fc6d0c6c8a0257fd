//! Collision resolution - projectiles vs entities, kills and contact damage
//!
//! Hits are collected first and side effects applied afterwards. Dead enemies
//! are never removed while the container is being scanned; they go into a
//! removal batch that runs once per tick in container order, so every kill is
//! counted and announced exactly once.

use std::collections::HashMap;

use bevy::math::Vec2;
use bevy::prelude::Resource;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::arena::{EntityContainer, EntityId, Target};
use crate::projectile::{ProjectileEngine, ProjectileId};
use crate::tuning::CombatTuning;
use crate::weapons::ballistics::circles_overlap;
use crate::weapons::damage::{DamageCategory, DamageSource};

/// One resolved hit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    pub projectile: ProjectileId,
    pub entity: EntityId,
    /// Damage actually applied, after modifiers and armor
    pub damage: f32,
    /// This hit took the entity from alive to dead
    pub killed: bool,
    pub source: DamageSource,
}

/// What the outside world learns about a kill
#[derive(Clone, Debug, PartialEq)]
pub struct KillReport {
    pub entity: EntityId,
    pub category: DamageCategory,
    pub position: Option<Vec2>,
    pub experience: u32,
    /// How the killing blow was delivered
    pub source: DamageSource,
}

/// Fire-and-forget notifications for audio, experience and morality systems
pub trait CombatObserver {
    fn on_enemy_killed(&mut self, _kill: &KillReport) {}
    fn on_player_hit(&mut self, _amount: f32) {}
    fn on_explosion(&mut self, _position: Vec2) {}
}

impl CombatObserver for () {}

/// Everything that happened during one tick, in the order it happened
#[derive(Debug, Default)]
pub struct TickLedger {
    pub events: Vec<CollisionEvent>,
    pub explosions: Vec<Vec2>,
    pub kills: Vec<KillReport>,
    last_source: HashMap<EntityId, DamageSource>,
}

impl TickLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: CollisionEvent) {
        self.last_source.insert(event.entity, event.source);
        self.events.push(event);
    }

    /// Note damage that doesn't produce a collision event (status ticks, contact)
    pub fn attribute(&mut self, entity: EntityId, source: DamageSource) {
        self.last_source.insert(entity, source);
    }

    pub fn explosion(&mut self, position: Vec2) {
        self.explosions.push(position);
    }

    /// Latest damage source for an entity this tick
    pub fn source_of(&self, entity: EntityId) -> DamageSource {
        self.last_source
            .get(&entity)
            .copied()
            .unwrap_or(DamageSource::Projectile)
    }
}

/// Per-tick projectile/entity scan, removal batch and contact damage
#[derive(Resource, Clone, Debug)]
pub struct CollisionResolver {
    contact_check_interval: u32,
    default_contact_damage: f32,
    contact_knockback: f32,
    contact_invulnerability_ticks: u32,
    ticks: u64,
    player_invulnerable: u32,
    kill_count: u64,
}

impl CollisionResolver {
    pub fn new(tuning: &CombatTuning) -> Self {
        Self {
            contact_check_interval: tuning.contact_check_interval.max(1),
            default_contact_damage: tuning.default_contact_damage,
            contact_knockback: tuning.contact_knockback,
            contact_invulnerability_ticks: tuning.contact_invulnerability_ticks,
            ticks: 0,
            player_invulnerable: 0,
            kill_count: 0,
        }
    }

    /// Enemies removed so far
    pub fn kill_count(&self) -> u64 {
        self.kill_count
    }

    /// Ticks left before contact damage can land on the player again
    pub fn player_invulnerable(&self) -> u32 {
        self.player_invulnerable
    }

    /// Test every live projectile against every opposing entity, then run the
    /// removal batch and notifications
    ///
    /// Wall strikes were already settled by [`ProjectileEngine::update_all`].
    /// Returns every collision event of the tick, including melee and
    /// explosion damage recorded earlier in `ledger`.
    pub fn resolve<C, R, O>(
        &mut self,
        engine: &mut ProjectileEngine,
        container: &mut C,
        rng: &mut R,
        ledger: &mut TickLedger,
        observer: &mut O,
    ) -> Vec<CollisionEvent>
    where
        C: EntityContainer,
        R: Rng,
        O: CombatObserver,
    {
        self.scan(engine, container, rng, ledger);
        self.flush(container, ledger, observer);
        ledger.events.clone()
    }

    fn scan<C: EntityContainer, R: Rng>(
        &self,
        engine: &mut ProjectileEngine,
        container: &mut C,
        rng: &mut R,
        ledger: &mut TickLedger,
    ) {
        let (rules, live) = engine.parts_mut();

        for projectile in live.iter_mut() {
            // Melee cones resolve their own hits while updating
            if !projectile.is_alive() || projectile.is_melee() {
                continue;
            }

            let targets = container.members_mut(projectile.owner.faction.opponent());
            for target in targets.iter_mut() {
                let Some(body) = target.body() else {
                    warn!("Skipping malformed entity {:?} in collision scan", target.id());
                    continue;
                };
                if !target.is_alive() {
                    continue;
                }
                if circles_overlap(projectile.position, projectile.radius, body.position, body.radius) {
                    // Consumed projectiles turn every further hit into a no-op
                    rules.hit(projectile, target, rng, ledger);
                }
            }

            if let Some(explosion) = projectile.take_explosion() {
                rules.explode(explosion, targets, ledger);
            }
        }
    }

    /// Notifications and the removal batch
    fn flush<C: EntityContainer, O: CombatObserver>(
        &mut self,
        container: &mut C,
        ledger: &mut TickLedger,
        observer: &mut O,
    ) {
        for position in &ledger.explosions {
            observer.on_explosion(*position);
        }

        if let Some(player) = container.player().map(Target::id) {
            for event in ledger.events.iter().filter(|event| event.entity == player) {
                observer.on_player_hit(event.damage);
            }
        }

        let dead: Vec<KillReport> = container
            .enemies()
            .iter()
            .filter(|enemy| !enemy.is_alive())
            .map(|enemy| KillReport {
                entity: enemy.id(),
                category: enemy.damage_category(),
                position: enemy.body().map(|body| body.position),
                experience: enemy.experience_value(),
                source: ledger.source_of(enemy.id()),
            })
            .collect();

        for kill in dead {
            if container.remove_enemy(kill.entity).is_none() {
                continue;
            }
            self.kill_count += 1;
            debug!(
                "Enemy {:?} killed by {:?} ({} xp, {} total kills)",
                kill.entity, kill.source, kill.experience, self.kill_count
            );
            observer.on_enemy_killed(&kill);
            ledger.kills.push(kill);
        }
    }

    /// Player vs enemy touch damage, checked every `contact_check_interval` ticks
    ///
    /// Returns the damage dealt, if any.
    pub fn contact_damage<C: EntityContainer, O: CombatObserver>(
        &mut self,
        container: &mut C,
        ledger: &mut TickLedger,
        observer: &mut O,
    ) -> Option<f32> {
        self.ticks += 1;
        self.player_invulnerable = self.player_invulnerable.saturating_sub(1);

        if self.ticks % self.contact_check_interval as u64 != 0 || self.player_invulnerable > 0 {
            return None;
        }

        let player = container.player()?;
        if !player.is_alive() {
            return None;
        }
        let player_id = player.id();
        let player_body = player.body()?;

        let (damage, push) = container.enemies().iter().find_map(|enemy| {
            let body = enemy.body()?;
            let touching = enemy.is_alive()
                && circles_overlap(player_body.position, player_body.radius, body.position, body.radius);
            touching.then(|| {
                let damage = enemy.contact_damage().unwrap_or(self.default_contact_damage);
                let away = (player_body.position - body.position).normalize_or_zero();
                let away = if away == Vec2::ZERO { Vec2::X } else { away };
                (damage, away * self.contact_knockback)
            })
        })?;

        let player = container.player_mut()?;
        player.take_damage(damage);
        player.apply_knockback(push);
        self.player_invulnerable = self.contact_invulnerability_ticks;
        ledger.attribute(player_id, DamageSource::Contact);
        observer.on_player_hit(damage);

        if !player.is_alive() {
            info!("Player {:?} died to contact damage", player_id);
        }
        Some(damage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, Combatant, Faction};
    use crate::projectile::{Projectile, Shooter};
    use bevy::math::Rect;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Recorder {
        kills: Vec<KillReport>,
        player_hits: Vec<f32>,
        explosions: Vec<Vec2>,
    }

    impl CombatObserver for Recorder {
        fn on_enemy_killed(&mut self, kill: &KillReport) {
            self.kills.push(kill.clone());
        }
        fn on_player_hit(&mut self, amount: f32) {
            self.player_hits.push(amount);
        }
        fn on_explosion(&mut self, position: Vec2) {
            self.explosions.push(position);
        }
    }

    fn arena() -> Arena {
        Arena::new(Rect::new(-500.0, -500.0, 500.0, 500.0))
    }

    fn player_shot(arena: &Arena, position: Vec2, damage: f32) -> Projectile {
        let owner = Shooter {
            id: arena.player().map(Target::id).unwrap_or_default(),
            faction: Faction::Player,
        };
        Projectile::new(owner, position, Vec2::ZERO, 2.0, damage, 60)
    }

    fn resolve(
        resolver: &mut CollisionResolver,
        engine: &mut ProjectileEngine,
        arena: &mut Arena,
        recorder: &mut Recorder,
    ) -> Vec<CollisionEvent> {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ledger = TickLedger::new();
        resolver.resolve(engine, arena, &mut rng, &mut ledger, recorder)
    }

    #[test]
    fn test_kill_removed_once_after_scan() {
        let mut arena = arena();
        let enemy = arena.spawn_enemy(Combatant::enemy(Vec2::ZERO, 5.0, 10.0).with_experience(7));
        let mut engine = ProjectileEngine::new(CombatTuning::default());
        // Two shots overlapping the same enemy in the same tick
        engine.add(player_shot(&arena, Vec2::ZERO, 20.0));
        engine.add(player_shot(&arena, Vec2::new(1.0, 0.0), 20.0));

        let mut resolver = CollisionResolver::new(&CombatTuning::default());
        let mut recorder = Recorder::default();
        let events = resolve(&mut resolver, &mut engine, &mut arena, &mut recorder);

        assert_eq!(events.len(), 1);
        assert!(events[0].killed);
        assert_eq!(resolver.kill_count(), 1);
        assert_eq!(recorder.kills.len(), 1);
        assert_eq!(recorder.kills[0].entity, enemy);
        assert_eq!(recorder.kills[0].experience, 7);
        assert!(arena.enemies().is_empty());
        // The second shot found nothing alive and is still flying
        assert_eq!(engine.compact(), 1);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_same_faction_ignored() {
        let mut arena = arena();
        arena.spawn_player(Combatant::new(Faction::Player, Vec2::ZERO, 8.0, 100.0));
        let mut engine = ProjectileEngine::new(CombatTuning::default());
        engine.add(player_shot(&arena, Vec2::ZERO, 20.0));

        let mut resolver = CollisionResolver::new(&CombatTuning::default());
        let mut recorder = Recorder::default();
        let events = resolve(&mut resolver, &mut engine, &mut arena, &mut recorder);
        assert!(events.is_empty());
        assert_eq!(arena.player().unwrap().health, 100.0);
    }

    #[test]
    fn test_touching_is_not_overlap() {
        let mut arena = arena();
        arena.spawn_enemy(Combatant::enemy(Vec2::new(7.0, 0.0), 5.0, 10.0));
        let mut engine = ProjectileEngine::new(CombatTuning::default());
        engine.add(player_shot(&arena, Vec2::ZERO, 5.0));

        let mut resolver = CollisionResolver::new(&CombatTuning::default());
        let events = resolve(&mut resolver, &mut engine, &mut arena, &mut Recorder::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_malformed_entity_skipped() {
        let mut arena = arena();
        arena.spawn_enemy(Combatant::enemy(Vec2::new(f32::NAN, 0.0), 5.0, 10.0));
        let healthy = arena.spawn_enemy(Combatant::enemy(Vec2::ZERO, 5.0, 10.0));
        let mut engine = ProjectileEngine::new(CombatTuning::default());
        engine.add(player_shot(&arena, Vec2::ZERO, 4.0));

        let mut resolver = CollisionResolver::new(&CombatTuning::default());
        let events = resolve(&mut resolver, &mut engine, &mut arena, &mut Recorder::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entity, healthy);
        assert_eq!(arena.enemies().len(), 2);
    }

    #[test]
    fn test_enemy_shot_notifies_player_hit() {
        let mut arena = arena();
        arena.spawn_player(Combatant::new(Faction::Player, Vec2::ZERO, 8.0, 100.0));
        let shooter = arena.spawn_enemy(Combatant::enemy(Vec2::new(100.0, 0.0), 5.0, 10.0));
        let mut engine = ProjectileEngine::new(CombatTuning::default());
        engine.add(Projectile::new(
            Shooter {
                id: shooter,
                faction: Faction::Enemy,
            },
            Vec2::new(3.0, 0.0),
            Vec2::ZERO,
            2.0,
            12.0,
            60,
        ));

        let mut resolver = CollisionResolver::new(&CombatTuning::default());
        let mut recorder = Recorder::default();
        resolve(&mut resolver, &mut engine, &mut arena, &mut recorder);
        assert_eq!(recorder.player_hits, vec![12.0]);
        assert_eq!(arena.player().unwrap().health, 88.0);
    }

    #[test]
    fn test_contact_damage_interval_and_invulnerability() {
        let tuning = CombatTuning {
            contact_check_interval: 2,
            contact_invulnerability_ticks: 3,
            contact_knockback: 10.0,
            ..CombatTuning::default()
        };
        let mut arena = arena();
        arena.spawn_player(Combatant::new(Faction::Player, Vec2::ZERO, 8.0, 100.0));
        arena.spawn_enemy(Combatant::enemy(Vec2::new(-5.0, 0.0), 5.0, 10.0).with_contact_damage(15.0));

        let mut resolver = CollisionResolver::new(&tuning);
        let mut recorder = Recorder::default();
        let mut ledger = TickLedger::new();

        assert_eq!(resolver.contact_damage(&mut arena, &mut ledger, &mut recorder), None);
        assert_eq!(resolver.contact_damage(&mut arena, &mut ledger, &mut recorder), Some(15.0));
        let player = arena.player().unwrap();
        assert_eq!(player.health, 85.0);
        // Pushed away from the enemy along +X
        assert!((player.position - Vec2::new(10.0, 0.0)).length() < 1e-4);
        assert_eq!(recorder.player_hits, vec![15.0]);
        assert_eq!(ledger.source_of(player.id), DamageSource::Contact);
    }

    #[test]
    fn test_contact_uses_default_damage() {
        let tuning = CombatTuning {
            contact_check_interval: 1,
            ..CombatTuning::default()
        };
        let mut arena = arena();
        arena.spawn_player(Combatant::new(Faction::Player, Vec2::ZERO, 8.0, 100.0));
        arena.spawn_enemy(Combatant::enemy(Vec2::new(0.0, 4.0), 5.0, 10.0));

        let mut resolver = CollisionResolver::new(&tuning);
        let mut ledger = TickLedger::new();
        let dealt = resolver.contact_damage(&mut arena, &mut ledger, &mut ());
        assert_eq!(dealt, Some(tuning.default_contact_damage));
        assert_eq!(resolver.player_invulnerable(), tuning.contact_invulnerability_ticks);
        // Invulnerable on the next check
        assert_eq!(resolver.contact_damage(&mut arena, &mut ledger, &mut ()), None);
    }
}
