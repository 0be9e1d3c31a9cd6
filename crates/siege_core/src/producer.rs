//! Production buildings: timed spawning with collision-free placement.
//!
//! A producer accumulates a timer; when it elapses and the population
//! budget allows, it emits one spawn order. Placement starts from a
//! nominal offset next to the building and probes outward for a
//! collision-free spot, so a burst of spawns fans out instead of
//! stacking. The battle executes the order: pool checkout, activation,
//! and (with a rally point) a move order toward the rally.

use serde::{Deserialize, Serialize};

use crate::config::{ArenaBounds, AvoidanceTuning};
use crate::index::SpatialUnitIndex;
use crate::math::{fx_serde, Fx, Vec2Fx};
use crate::services::ResourceLedger;
use crate::stats::{Faction, UnitKind};

/// Static configuration of one producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Kind of unit this building produces.
    pub produces: UnitKind,
    /// Ticks between productions.
    pub interval_ticks: u32,
    /// Number of units produced before costs start being charged.
    pub free_units: u32,
    /// Resource cost per unit once past the free allowance.
    pub unit_cost: u32,
    /// Maximum live units of the produced kind this building sustains.
    pub population_cap: usize,
    /// Nominal spawn offset from the building's position.
    pub spawn_offset: Vec2Fx,
    /// Step between placement probe rings. Defaults to the produced
    /// unit's minimum separation when zero.
    #[serde(default, with = "fx_serde")]
    pub probe_step: Fx,
    /// Placement probe rings tried before falling back to the nominal
    /// position.
    #[serde(default = "default_probe_rings")]
    pub probe_rings: u32,
}

fn default_probe_rings() -> u32 {
    3
}

/// Production state attached to a building unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingProducer {
    config: ProducerConfig,
    timer: u32,
    produced: u32,
    rally_point: Option<Vec2Fx>,
}

/// A spawn the battle should perform this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnOrder {
    /// Kind to spawn.
    pub kind: UnitKind,
    /// Nominal position; the battle runs placement probing from here.
    pub nominal: Vec2Fx,
    /// Rally point the spawned unit should move toward, if any.
    pub rally: Option<Vec2Fx>,
}

impl BuildingProducer {
    /// Create a producer from its configuration.
    #[must_use]
    pub fn new(config: ProducerConfig) -> Self {
        Self {
            config,
            timer: 0,
            produced: 0,
            rally_point: None,
        }
    }

    /// The kind this producer spawns.
    #[must_use]
    pub fn produces(&self) -> UnitKind {
        self.config.produces
    }

    /// Units produced so far this activation.
    #[must_use]
    pub fn produced(&self) -> u32 {
        self.produced
    }

    /// Current rally point.
    #[must_use]
    pub fn rally_point(&self) -> Option<Vec2Fx> {
        self.rally_point
    }

    /// Set or clear the rally point.
    pub fn set_rally_point(&mut self, point: Option<Vec2Fx>) {
        self.rally_point = point;
    }

    /// Reset timer and production counter. Called on (re)activation of
    /// the owning building.
    pub fn reset(&mut self) {
        self.timer = 0;
        self.produced = 0;
        self.rally_point = None;
    }

    /// Advance the production timer one tick and emit a spawn order when
    /// one is due and affordable.
    ///
    /// Population is counted against the live units of the produced kind
    /// in the building's faction. The resource charge only applies past
    /// the free allowance; an unaffordable unit stays queued (the timer
    /// holds at its cap) until the ledger can cover it.
    pub fn tick(
        &mut self,
        origin: Vec2Fx,
        faction: Faction,
        index: &SpatialUnitIndex,
        resources: &mut ResourceLedger,
    ) -> Option<SpawnOrder> {
        self.timer = self.timer.saturating_add(1);
        if self.timer < self.config.interval_ticks {
            return None;
        }

        let live = index
            .of_kind(self.config.produces)
            .filter(|e| e.alive && e.faction == faction)
            .count();
        if live >= self.config.population_cap {
            return None;
        }

        if self.produced >= self.config.free_units
            && !resources.try_charge(self.config.unit_cost)
        {
            tracing::debug!(
                kind = ?self.config.produces,
                cost = self.config.unit_cost,
                "production stalled on resources"
            );
            return None;
        }

        self.timer = 0;
        let nominal = self.placement_target(origin, faction, index);
        self.produced += 1;

        Some(SpawnOrder {
            kind: self.config.produces,
            nominal,
            rally: self.rally_point,
        })
    }

    /// Nominal placement for the next spawn.
    ///
    /// With a rally point, the spot is biased away from the nearest
    /// existing friendly unit toward the rally so a burst of spawns fans
    /// out. Without one, spawns alternate left/right by production
    /// parity.
    fn placement_target(
        &self,
        origin: Vec2Fx,
        faction: Faction,
        index: &SpatialUnitIndex,
    ) -> Vec2Fx {
        let base = origin + self.config.spawn_offset;

        if let Some(rally) = self.rally_point {
            let separation = self.probe_step_or_default();
            if let Some(nearest) = index.nearest_of_faction(base, faction, None) {
                let away = (rally - nearest.position).normalize();
                if away != Vec2Fx::ZERO {
                    return base + away.scale(separation);
                }
            }
            let toward = (rally - base).normalize();
            return base + toward.scale(separation);
        }

        let side = if self.produced % 2 == 0 {
            self.probe_step_or_default()
        } else {
            -self.probe_step_or_default()
        };
        base + Vec2Fx::new(side, Fx::ZERO)
    }

    fn probe_step_or_default(&self) -> Fx {
        if self.config.probe_step > Fx::ZERO {
            self.config.probe_step
        } else {
            Fx::from_num(48)
        }
    }
}

/// Find a collision-free position near `nominal` for a body of the given
/// radius.
///
/// Probes rings of increasing radius: lateral offsets first, then
/// vertical, then diagonal. Attempts are bounded by `probe_rings`; when
/// every candidate collides, the nominal position itself is returned and
/// push-apart untangles the overlap over the following ticks.
#[must_use]
pub fn find_spawn_position(
    index: &SpatialUnitIndex,
    nominal: Vec2Fx,
    radius: Fx,
    step: Fx,
    probe_rings: u32,
    arena: &ArenaBounds,
    tuning: &AvoidanceTuning,
) -> Vec2Fx {
    let clamped = arena.clamp_with_radius(nominal, radius);
    if !index.collides_at(clamped, radius, tuning.separation_factor, None) {
        return clamped;
    }

    for ring in 1..=probe_rings {
        let d = step * Fx::from_num(ring);
        let offsets = [
            Vec2Fx::new(-d, Fx::ZERO),
            Vec2Fx::new(d, Fx::ZERO),
            Vec2Fx::new(Fx::ZERO, -d),
            Vec2Fx::new(Fx::ZERO, d),
            Vec2Fx::new(-d, -d),
            Vec2Fx::new(d, -d),
            Vec2Fx::new(-d, d),
            Vec2Fx::new(d, d),
        ];
        for offset in offsets {
            let candidate = arena.clamp_with_radius(nominal + offset, radius);
            if !index.collides_at(candidate, radius, tuning.separation_factor, None) {
                return candidate;
            }
        }
    }

    tracing::debug!(?clamped, "no free spawn position found, overlapping at nominal");
    clamped
}
