//! The battle: unit storage, frame loop, and composition root.
//!
//! A [`Battle`] owns everything a match needs — generational unit
//! storage, the recycle pool, the spatial index, the collaborator
//! services — and advances it one tick at a time. Each tick runs
//! sequentially on the calling thread:
//!
//! 1. index refresh (the index owner is the battle, never the units),
//! 2. per-unit updates in ascending handle order,
//! 3. projectile flight and impacts,
//! 4. recycling of units whose death animation finished,
//! 5. building production.
//!
//! When the game director reports any phase but `Playing`, the tick is a
//! no-op: seeking, movement, attacks, projectiles and production all
//! suspend, and resume transparently once the phase returns to
//! `Playing`.

use crate::config::BattleConfig;
use crate::data::ArchetypeRegistry;
use crate::error::{CoreError, Result};
use crate::handle::UnitHandle;
use crate::index::{IndexEntry, SpatialUnitIndex};
use crate::math::{Fx, Vec2Fx};
use crate::pool::UnitPool;
use crate::producer::{self, BuildingProducer, ProducerConfig, SpawnOrder};
use crate::projectile::Projectile;
use crate::services::{GamePhase, ServiceRegistry};
use crate::stats::{Faction, UnitKind};
use crate::unit::{CombatUnit, UnitSnapshot};

/// Simulation ticks per second.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

// ============================================================================
// Unit storage
// ============================================================================

#[derive(Debug)]
struct Slot {
    generation: u32,
    occupied: bool,
    unit: Option<CombatUnit>,
}

/// Generational slot storage for live units.
///
/// Removal bumps the slot's generation, so handles held by other units
/// (targets, most notably) go stale the moment a slot is recycled and
/// read as absent forever after.
#[derive(Debug, Default)]
pub struct UnitStorage {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl UnitStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit and return its handle.
    pub fn insert(&mut self, unit: CombatUnit) -> UnitHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.occupied = true;
            slot.unit = Some(unit);
            UnitHandle::from_parts(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).expect("unit storage exceeds u32 slots");
            self.slots.push(Slot {
                generation: 1,
                occupied: true,
                unit: Some(unit),
            });
            UnitHandle::from_parts(index, 1)
        }
    }

    fn slot(&self, handle: UnitHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index() as usize)
            .filter(|s| s.occupied && s.generation == handle.generation())
    }

    fn slot_mut(&mut self, handle: UnitHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|s| s.occupied && s.generation == handle.generation())
    }

    /// Resolve a handle. Stale generations read as absent.
    #[must_use]
    pub fn get(&self, handle: UnitHandle) -> Option<&CombatUnit> {
        self.slot(handle)?.unit.as_ref()
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, handle: UnitHandle) -> Option<&mut CombatUnit> {
        self.slot_mut(handle)?.unit.as_mut()
    }

    /// Check whether a handle is live.
    #[must_use]
    pub fn contains(&self, handle: UnitHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Temporarily take a unit out for its update. The slot stays
    /// reserved; [`put_back`](Self::put_back) returns the unit.
    pub fn take(&mut self, handle: UnitHandle) -> Option<CombatUnit> {
        self.slot_mut(handle)?.unit.take()
    }

    /// Return a unit taken with [`take`](Self::take).
    pub fn put_back(&mut self, handle: UnitHandle, unit: CombatUnit) {
        if let Some(slot) = self.slot_mut(handle) {
            debug_assert!(slot.unit.is_none(), "put_back over an occupied slot");
            slot.unit = Some(unit);
        }
    }

    /// Remove a unit permanently, invalidating every handle to the slot.
    pub fn remove(&mut self, handle: UnitHandle) -> Option<CombatUnit> {
        let slot = self
            .slots
            .get_mut(handle.index() as usize)
            .filter(|s| s.occupied && s.generation == handle.generation())?;
        let unit = slot.unit.take()?;
        slot.occupied = false;
        slot.generation += 1;
        self.free.push(handle.index());
        Some(unit)
    }

    /// Handles of all stored units, in ascending slot order.
    #[must_use]
    pub fn live_handles(&self) -> Vec<UnitHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.occupied)
            .map(|(i, s)| UnitHandle::from_parts(i as u32, s.generation))
            .collect()
    }

    /// Number of stored units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.occupied).count()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over stored units in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitHandle, &CombatUnit)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            let unit = s.unit.as_ref()?;
            s.occupied
                .then(|| (UnitHandle::from_parts(i as u32, s.generation), unit))
        })
    }
}

// ============================================================================
// Tick events
// ============================================================================

/// Damage dealt this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Unit that dealt the damage.
    pub attacker: UnitHandle,
    /// Unit that received it.
    pub target: UnitHandle,
    /// Health actually removed.
    pub amount: u32,
}

/// A unit was destroyed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillEvent {
    /// Unit that landed the killing blow.
    pub killer: UnitHandle,
    /// Unit that was destroyed.
    pub victim: UnitHandle,
}

/// Events generated during one tick, for the layers above the core
/// (sound, effects, score displays).
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Damage dealt.
    pub damage_events: Vec<DamageEvent>,
    /// Killing blows.
    pub kills: Vec<KillEvent>,
    /// Units handed back to the pool after their death animation.
    pub deaths: Vec<UnitHandle>,
    /// Units spawned by production buildings.
    pub spawned: Vec<UnitHandle>,
}

/// Per-tick context handed to each unit's update.
pub struct UpdateCtx<'a> {
    /// Battle configuration.
    pub config: &'a BattleConfig,
    /// Spatial index, refreshed at tick start.
    pub index: &'a SpatialUnitIndex,
    /// Every other unit (the updating unit is temporarily absent).
    pub units: &'a mut UnitStorage,
    /// Collaborator services.
    pub services: &'a mut ServiceRegistry,
    /// Event collector for this tick.
    pub events: &'a mut TickEvents,
    /// Projectiles launched so far, including this tick's.
    pub projectiles: &'a mut Vec<Projectile>,
}

// ============================================================================
// Battle
// ============================================================================

/// A running match.
pub struct Battle {
    tick: u64,
    config: BattleConfig,
    archetypes: ArchetypeRegistry,
    units: UnitStorage,
    pool: UnitPool,
    index: SpatialUnitIndex,
    services: ServiceRegistry,
    projectiles: Vec<Projectile>,
}

impl Battle {
    /// Create a battle from configuration, archetypes and services.
    #[must_use]
    pub fn new(
        config: BattleConfig,
        archetypes: ArchetypeRegistry,
        services: ServiceRegistry,
    ) -> Self {
        let pool = UnitPool::new(config.pool_capacity);
        Self {
            tick: 0,
            config,
            archetypes,
            units: UnitStorage::new(),
            pool,
            index: SpatialUnitIndex::new(),
            services,
            projectiles: Vec::new(),
        }
    }

    /// Battle with default configuration, the shipped archetypes, and
    /// stub services (always `Playing`).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            BattleConfig::default(),
            ArchetypeRegistry::with_defaults(),
            ServiceRegistry::new(),
        )
    }

    /// Current tick number.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Battle configuration.
    #[must_use]
    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Unit storage, read only.
    #[must_use]
    pub fn units(&self) -> &UnitStorage {
        &self.units
    }

    /// The recycle pool, read only.
    #[must_use]
    pub fn pool(&self) -> &UnitPool {
        &self.pool
    }

    /// The spatial index as of the last refresh.
    #[must_use]
    pub fn index(&self) -> &SpatialUnitIndex {
        &self.index
    }

    /// Collaborator services.
    pub fn services_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.services
    }

    /// Collaborator services, read only.
    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Resolve a unit by handle.
    #[must_use]
    pub fn unit(&self, handle: UnitHandle) -> Option<&CombatUnit> {
        self.units.get(handle)
    }

    /// Pull-only stat snapshot for the selection UI.
    #[must_use]
    pub fn snapshot(&self, handle: UnitHandle) -> Option<UnitSnapshot> {
        self.units.get(handle).map(CombatUnit::snapshot)
    }

    /// Number of alive units in a faction.
    #[must_use]
    pub fn alive_count(&self, faction: Faction) -> usize {
        self.units
            .iter()
            .filter(|(_, u)| u.faction() == faction && u.is_alive())
            .count()
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Spawn a unit near `nominal`, probing outward for a collision-free
    /// position (lateral, then vertical, then diagonal; bounded; nominal
    /// as a last resort).
    ///
    /// # Errors
    ///
    /// Returns an error when the kind has no registered archetype.
    pub fn spawn_unit(&mut self, kind: UnitKind, nominal: Vec2Fx) -> Result<UnitHandle> {
        let stats = &self.archetypes.get(kind)?.stats;
        let radius = stats.collision_radius;
        let step = radius * Fx::from_num(2) * self.config.avoidance.separation_factor;
        let position = producer::find_spawn_position(
            &self.index,
            nominal,
            radius,
            step,
            3,
            &self.config.arena,
            &self.config.avoidance,
        );
        self.spawn_unit_exact(kind, position)
    }

    /// Spawn a unit at an exact position, skipping placement probing.
    /// Scripted wave entrances use this; overlaps resolve through
    /// push-apart over the following ticks.
    ///
    /// # Errors
    ///
    /// Returns an error when the kind has no registered archetype.
    pub fn spawn_unit_exact(&mut self, kind: UnitKind, position: Vec2Fx) -> Result<UnitHandle> {
        let mut unit = self.pool.checkout(kind, &self.archetypes)?;
        unit.activate(position, &self.services);
        let entry_stats = unit.live_stats().collision_radius;
        let faction = unit.faction();
        let handle = self.units.insert(unit);
        // Same-tick spawns must see each other during placement probing.
        self.index.insert_entry(IndexEntry {
            handle,
            kind,
            faction,
            position,
            collision_radius: entry_stats,
            alive: true,
        });
        tracing::debug!(?kind, %handle, "unit spawned");
        Ok(handle)
    }

    /// Attach production state to a building unit.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle is stale or the unit is not a
    /// structure.
    pub fn set_production(&mut self, handle: UnitHandle, config: ProducerConfig) -> Result<()> {
        let unit = self
            .units
            .get_mut(handle)
            .ok_or(CoreError::UnitNotFound(handle))?;
        if !unit.kind().is_structure() {
            return Err(CoreError::InvalidCommand(format!(
                "{:?} cannot produce units",
                unit.kind()
            )));
        }
        unit.set_production(Some(BuildingProducer::new(config)));
        Ok(())
    }

    /// Set or clear a producer's rally point.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle is stale or the unit has no
    /// production state.
    pub fn set_rally_point(&mut self, handle: UnitHandle, rally: Option<Vec2Fx>) -> Result<()> {
        let unit = self
            .units
            .get_mut(handle)
            .ok_or(CoreError::UnitNotFound(handle))?;
        let producer = unit.production_mut().ok_or_else(|| {
            CoreError::InvalidCommand("unit has no production state".to_string())
        })?;
        producer.set_rally_point(rally);
        Ok(())
    }

    /// Issue a manual move order.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle is stale.
    pub fn issue_move(&mut self, handle: UnitHandle, destination: Vec2Fx) -> Result<()> {
        let unit = self
            .units
            .get_mut(handle)
            .ok_or(CoreError::UnitNotFound(handle))?;
        unit.order_move(destination);
        Ok(())
    }

    /// Toggle a unit's defend stance.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle is stale.
    pub fn set_defending(&mut self, handle: UnitHandle, defending: bool) -> Result<()> {
        let unit = self
            .units
            .get_mut(handle)
            .ok_or(CoreError::UnitNotFound(handle))?;
        unit.set_defending(defending);
        Ok(())
    }

    // ========================================================================
    // Frame loop
    // ========================================================================

    /// Advance the battle one tick.
    ///
    /// A no-op (including the tick counter) while the director reports
    /// any phase but `Playing`.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();

        if self.services.phase() != GamePhase::Playing {
            return events;
        }

        self.refresh_index();

        for handle in self.units.live_handles() {
            let Some(mut unit) = self.units.take(handle) else {
                continue;
            };
            {
                let mut ctx = UpdateCtx {
                    config: &self.config,
                    index: &self.index,
                    units: &mut self.units,
                    services: &mut self.services,
                    events: &mut events,
                    projectiles: &mut self.projectiles,
                };
                unit.update(handle, &mut ctx);
            }
            self.units.put_back(handle, unit);
        }

        self.advance_projectiles(&mut events);
        self.collect_recycled(&mut events);
        self.run_production(&mut events);

        self.tick += 1;
        events
    }

    /// Rebuild the spatial index from current unit state. The battle is
    /// the index owner; units only ever read it.
    fn refresh_index(&mut self) {
        let entries: Vec<IndexEntry> = self
            .units
            .iter()
            .map(|(handle, unit)| IndexEntry {
                handle,
                kind: unit.kind(),
                faction: unit.faction(),
                position: unit.position(),
                collision_radius: unit.live_stats().collision_radius,
                alive: unit.is_alive(),
            })
            .collect();
        self.index.refresh(entries);
    }

    fn advance_projectiles(&mut self, events: &mut TickEvents) {
        let mut in_flight = std::mem::take(&mut self.projectiles);
        in_flight.retain_mut(|shot| {
            if !shot.advance() {
                return true;
            }
            resolve_impact(
                &mut self.units,
                &mut self.services,
                &self.config,
                shot,
                events,
            );
            false
        });
        self.projectiles = in_flight;
    }

    /// Hand units whose death animation finished back to the pool.
    fn collect_recycled(&mut self, events: &mut TickEvents) {
        for handle in self.units.live_handles() {
            let awaiting = self
                .units
                .get(handle)
                .is_some_and(CombatUnit::awaiting_recycle);
            if !awaiting {
                continue;
            }
            if let Some(unit) = self.units.remove(handle) {
                tracing::debug!(unit = %unit.name(), %handle, "unit recycled");
                events.deaths.push(handle);
                self.pool.checkin(unit);
            }
        }
    }

    /// Tick every producer building and execute its spawn orders.
    fn run_production(&mut self, events: &mut TickEvents) {
        for handle in self.units.live_handles() {
            let Some(mut unit) = self.units.take(handle) else {
                continue;
            };

            let order: Option<SpawnOrder> = if unit.is_alive() {
                let origin = unit.position();
                let faction = unit.faction();
                let index = &self.index;
                let resources = self.services.resources();
                unit.production_mut()
                    .and_then(|producer| producer.tick(origin, faction, index, resources))
            } else {
                None
            };

            self.units.put_back(handle, unit);

            if let Some(order) = order {
                match self.spawn_unit(order.kind, order.nominal) {
                    Ok(spawned) => {
                        if let Some(rally) = order.rally {
                            if let Some(unit) = self.units.get_mut(spawned) {
                                unit.order_move(rally);
                            }
                        }
                        events.spawned.push(spawned);
                    }
                    Err(err) => {
                        tracing::warn!(%err, "production spawn failed");
                    }
                }
            }
        }
    }
}

/// Apply an arrived projectile to its target, if the target is still
/// valid, alive, and near the aim point (fast targets dodge).
fn resolve_impact(
    units: &mut UnitStorage,
    services: &mut ServiceRegistry,
    config: &BattleConfig,
    shot: &Projectile,
    events: &mut TickEvents,
) {
    let Some(target) = units.get_mut(shot.target) else {
        return;
    };
    if !target.is_alive() {
        return;
    }
    let hit_radius = config.combat.projectile_hit_radius;
    if target.position().distance_squared(shot.aim_point) > hit_radius * hit_radius {
        return;
    }

    let dealt = target.take_damage(shot.damage, services.damage_sink(), &config.combat);
    services
        .damage_sink()
        .record_damage(shot.shooter_kind, &shot.shooter_name, dealt);
    events.damage_events.push(DamageEvent {
        attacker: shot.shooter,
        target: shot.target,
        amount: dealt,
    });
    if target.is_destroyed() {
        events.kills.push(KillEvent {
            killer: shot.shooter,
            victim: shot.target,
        });
    }
}
