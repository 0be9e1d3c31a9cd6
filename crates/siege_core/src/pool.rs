//! Recyclable unit instances, keyed by kind.
//!
//! The pool owns recyclable slots, not unit semantics: checkout hands out
//! either a recycled instance or a freshly built one, and both paths go
//! through the same activation hook on the battle side. Check-in reverts
//! the instance to its pristine snapshot before shelving it; a full shelf
//! hard-destroys the instance instead, silently.

use std::collections::HashMap;

use crate::data::ArchetypeRegistry;
use crate::error::Result;
use crate::stats::UnitKind;
use crate::unit::CombatUnit;

/// Lifetime counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total checkouts served.
    pub checkouts: u64,
    /// Checkouts that had to build a fresh instance.
    pub fresh_builds: u64,
    /// Total check-ins received.
    pub checkins: u64,
    /// Check-ins dropped because the shelf was full.
    pub hard_destroys: u64,
}

/// What happened to a checked-in instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinOutcome {
    /// Instance shelved for reuse.
    Pooled,
    /// Shelf full; instance destroyed.
    Destroyed,
}

/// Checkout/check-in lifecycle for recyclable unit instances.
#[derive(Debug)]
pub struct UnitPool {
    capacity_per_kind: usize,
    available: HashMap<UnitKind, Vec<CombatUnit>>,
    active: HashMap<UnitKind, u32>,
    stats: PoolStats,
}

impl UnitPool {
    /// Create a pool shelving up to `capacity_per_kind` instances of each
    /// kind.
    #[must_use]
    pub fn new(capacity_per_kind: usize) -> Self {
        Self {
            capacity_per_kind,
            available: HashMap::new(),
            active: HashMap::new(),
            stats: PoolStats::default(),
        }
    }

    /// Check out an instance of `kind`.
    ///
    /// Pops from the kind's shelf when possible; an empty shelf falls
    /// back to building a fresh instance from the archetype — that is
    /// policy, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownArchetype`](crate::error::CoreError)
    /// only when a fresh build is needed and the kind has no archetype.
    pub fn checkout(
        &mut self,
        kind: UnitKind,
        archetypes: &ArchetypeRegistry,
    ) -> Result<CombatUnit> {
        let unit = match self.available.get_mut(&kind).and_then(Vec::pop) {
            Some(unit) => unit,
            None => {
                self.stats.fresh_builds += 1;
                CombatUnit::from_archetype(archetypes.get(kind)?)
            }
        };
        self.stats.checkouts += 1;
        *self.active.entry(kind).or_default() += 1;
        Ok(unit)
    }

    /// Return an instance to the pool.
    ///
    /// The instance is reverted to its pristine snapshot first. When the
    /// kind's shelf is at capacity the instance is dropped instead —
    /// silent policy, mirroring the checkout fallback.
    pub fn checkin(&mut self, mut unit: CombatUnit) -> CheckinOutcome {
        let kind = unit.kind();
        self.stats.checkins += 1;
        if let Some(count) = self.active.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }

        unit.reset_for_checkin();

        let shelf = self.available.entry(kind).or_default();
        if shelf.len() < self.capacity_per_kind {
            shelf.push(unit);
            CheckinOutcome::Pooled
        } else {
            self.stats.hard_destroys += 1;
            CheckinOutcome::Destroyed
        }
    }

    /// Instances currently shelved for a kind.
    #[must_use]
    pub fn available_count(&self, kind: UnitKind) -> usize {
        self.available.get(&kind).map_or(0, Vec::len)
    }

    /// Instances currently checked out for a kind.
    #[must_use]
    pub fn active_count(&self, kind: UnitKind) -> u32 {
        self.active.get(&kind).copied().unwrap_or(0)
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
