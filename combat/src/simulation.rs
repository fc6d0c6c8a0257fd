//! Fixed-step combat driver
//!
//! Runs one authoritative tick in a fixed order:
//! status effects, projectile movement (walls included), the collision scan
//! with its removal batch, contact damage, then compaction of the live set.

use std::sync::Arc;

use bevy::math::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::arena::{EntityContainer, Faction, Target};
use crate::catalog::Catalog;
use crate::projectile::{ProjectileEngine, ProjectileId, Shooter};
use crate::resolver::{CollisionEvent, CollisionResolver, CombatObserver, KillReport, TickLedger};
use crate::tuning::CombatTuning;
use crate::weapons::damage::DamageSource;
use crate::weapons::WeaponInstance;

/// Summary of one tick, readable by a renderer or UI after the step
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<CollisionEvent>,
    pub kills: Vec<KillReport>,
    pub explosions: Vec<Vec2>,
    pub contact_damage: Option<f32>,
    /// Projectiles dropped by compaction this tick
    pub removed_projectiles: usize,
    pub live_projectiles: usize,
    pub player_alive: bool,
}

pub struct Simulation<C: EntityContainer> {
    catalog: Arc<Catalog>,
    pub engine: ProjectileEngine,
    pub resolver: CollisionResolver,
    pub container: C,
    rng: StdRng,
    tick: u64,
}

impl<C: EntityContainer> Simulation<C> {
    /// `seed` drives accuracy jitter and on-hit chances
    pub fn new(catalog: Arc<Catalog>, tuning: CombatTuning, container: C, seed: u64) -> Self {
        Self {
            catalog,
            resolver: CollisionResolver::new(&tuning),
            engine: ProjectileEngine::new(tuning),
            container,
            rng: StdRng::seed_from_u64(seed),
            tick: 0,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Ticks completed so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Pull the trigger on `weapon` and make the result live
    ///
    /// Returns the new projectile ids; empty if the weapon couldn't fire.
    pub fn fire(
        &mut self,
        weapon: &mut WeaponInstance,
        origin: Vec2,
        target: Vec2,
        owner: Shooter,
    ) -> Vec<ProjectileId> {
        let projectiles = weapon.fire(
            &self.engine,
            self.catalog.effects(),
            origin,
            target,
            owner,
            &mut self.rng,
        );
        self.engine.extend(projectiles)
    }

    /// Advance the simulation by one tick
    pub fn step<O: CombatObserver>(&mut self, observer: &mut O) -> TickReport {
        self.tick += 1;
        let mut ledger = TickLedger::new();

        self.tick_statuses(&mut ledger, observer);
        self.engine
            .update_all(&mut self.container, &mut self.rng, &mut ledger);
        let events = self.resolver.resolve(
            &mut self.engine,
            &mut self.container,
            &mut self.rng,
            &mut ledger,
            observer,
        );
        let contact_damage = self
            .resolver
            .contact_damage(&mut self.container, &mut ledger, observer);
        let removed_projectiles = self.engine.compact();

        if !ledger.kills.is_empty() {
            debug!("Tick {}: {} kills", self.tick, ledger.kills.len());
        }

        TickReport {
            tick: self.tick,
            events,
            kills: ledger.kills,
            explosions: ledger.explosions,
            contact_damage,
            removed_projectiles,
            live_projectiles: self.engine.len(),
            player_alive: self.container.player().is_some_and(Target::is_alive),
        }
    }

    fn tick_statuses<O: CombatObserver>(&mut self, ledger: &mut TickLedger, observer: &mut O) {
        for faction in [Faction::Player, Faction::Enemy] {
            for member in self.container.members_mut(faction) {
                let dealt = member.tick_statuses();
                if dealt > 0.0 {
                    ledger.attribute(member.id(), DamageSource::DamageOverTime);
                    if faction == Faction::Player {
                        observer.on_player_hit(dealt);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, Combatant, EntityId, StatusEffect};
    use crate::weapons::Upgrades;
    use bevy::math::Rect;

    fn simulation() -> (Simulation<Arena>, EntityId) {
        let mut arena = Arena::new(Rect::new(-1000.0, -1000.0, 1000.0, 1000.0));
        let player = arena.spawn_player(Combatant::new(Faction::Player, Vec2::ZERO, 8.0, 100.0));
        let sim = Simulation::new(Arc::new(Catalog::fallback()), CombatTuning::default(), arena, 42);
        (sim, player)
    }

    #[test]
    fn test_damage_over_time_kill_is_attributed() {
        let (mut sim, _) = simulation();
        let mut enemy = Combatant::enemy(Vec2::new(300.0, 0.0), 5.0, 3.0);
        enemy.apply_status(StatusEffect::DamageOverTime {
            damage_per_tick: 2.0,
            remaining: 5,
        });
        let enemy = sim.container.spawn_enemy(enemy);

        let first = sim.step(&mut ());
        assert!(first.kills.is_empty());
        let second = sim.step(&mut ());
        assert_eq!(second.kills.len(), 1);
        assert_eq!(second.kills[0].entity, enemy);
        assert_eq!(second.kills[0].source, DamageSource::DamageOverTime);
        assert_eq!(sim.resolver.kill_count(), 1);
    }

    #[derive(Default)]
    struct PlayerHits(Vec<f32>);

    impl CombatObserver for PlayerHits {
        fn on_player_hit(&mut self, amount: f32) {
            self.0.push(amount);
        }
    }

    #[test]
    fn test_damage_over_time_on_player_is_reported() {
        let (mut sim, _) = simulation();
        sim.container
            .player_mut()
            .unwrap()
            .apply_status(StatusEffect::DamageOverTime {
                damage_per_tick: 3.0,
                remaining: 2,
            });

        let mut hits = PlayerHits::default();
        for _ in 0..4 {
            sim.step(&mut hits);
        }
        assert_eq!(hits.0, vec![3.0, 3.0]);
        assert_eq!(sim.container.player().unwrap().health, 94.0);
    }

    #[test]
    fn test_fired_projectile_travels_and_expires() {
        let (mut sim, player) = simulation();
        let mut weapon = WeaponInstance::new(sim.catalog().get("sidearm").unwrap(), &Upgrades::default());
        let owner = Shooter {
            id: player,
            faction: Faction::Player,
        };
        let ids = sim.fire(&mut weapon, Vec2::ZERO, Vec2::new(0.0, 100.0), owner);
        assert_eq!(ids.len(), 1);
        assert_eq!(sim.engine.live()[0].id, ids[0]);
        // Cooldown still running
        assert!(sim.fire(&mut weapon, Vec2::ZERO, Vec2::new(0.0, 100.0), owner).is_empty());

        let lifetime = weapon.stats().lifetime as u64;
        let mut ticks = 0;
        while sim.engine.get(ids[0]).is_some() {
            let report = sim.step(&mut ());
            assert!(report.player_alive);
            ticks += 1;
            assert!(ticks <= lifetime);
        }
        assert_eq!(ticks, lifetime);
        assert_eq!(sim.tick_count(), lifetime);
    }
}
