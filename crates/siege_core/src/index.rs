//! Categorized spatial index over live units.
//!
//! The battle rebuilds the index at the start of every tick; units only
//! read it. Entries are a one-tick-stale snapshot of position and
//! liveness, which is acceptable for steering and target scans. All
//! queries are linear over the live set; unit counts in an arena stay in
//! the low hundreds.

use std::collections::HashMap;

use crate::handle::UnitHandle;
use crate::math::{Fx, Vec2Fx};
use crate::stats::{Faction, UnitKind};

/// Snapshot of one live unit, as seen by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Handle of the unit.
    pub handle: UnitHandle,
    /// Kind of the unit.
    pub kind: UnitKind,
    /// Faction of the unit.
    pub faction: Faction,
    /// Position at index refresh.
    pub position: Vec2Fx,
    /// Collision radius.
    pub collision_radius: Fx,
    /// Whether the unit was alive (not dying) at refresh.
    pub alive: bool,
}

/// Categorized live-unit lists with range queries.
#[derive(Debug, Default)]
pub struct SpatialUnitIndex {
    entries: Vec<IndexEntry>,
    by_kind: HashMap<UnitKind, Vec<usize>>,
}

impl SpatialUnitIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from the owner's current unit set.
    pub fn refresh(&mut self, entries: impl IntoIterator<Item = IndexEntry>) {
        self.entries.clear();
        for list in self.by_kind.values_mut() {
            list.clear();
        }
        for entry in entries {
            self.by_kind
                .entry(entry.kind)
                .or_default()
                .push(self.entries.len());
            self.entries.push(entry);
        }
    }

    /// Insert a single entry between refreshes.
    ///
    /// Used by the battle when spawning mid-tick, so placement probing
    /// for later spawns in the same burst sees the earlier ones.
    pub fn insert_entry(&mut self, entry: IndexEntry) {
        self.by_kind
            .entry(entry.kind)
            .or_default()
            .push(self.entries.len());
        self.entries.push(entry);
    }

    /// All entries.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of indexed units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for a specific handle.
    #[must_use]
    pub fn get(&self, handle: UnitHandle) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.handle == handle)
    }

    /// Full live list of one kind.
    pub fn of_kind(&self, kind: UnitKind) -> impl Iterator<Item = &IndexEntry> {
        self.by_kind
            .get(&kind)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&i| &self.entries[i])
    }

    /// Live towers.
    pub fn towers(&self) -> impl Iterator<Item = &IndexEntry> {
        self.of_kind(UnitKind::Tower)
    }

    /// Live hunters.
    pub fn hunters(&self) -> impl Iterator<Item = &IndexEntry> {
        self.of_kind(UnitKind::Hunter)
    }

    /// Live stone walls.
    pub fn stone_walls(&self) -> impl Iterator<Item = &IndexEntry> {
        self.of_kind(UnitKind::StoneWall)
    }

    /// Live raiders of every raider kind.
    pub fn raiders(&self) -> impl Iterator<Item = &IndexEntry> {
        self.of_faction(Faction::Raiders)
    }

    /// The crystal, when standing.
    #[must_use]
    pub fn crystal(&self) -> Option<&IndexEntry> {
        self.of_kind(UnitKind::Crystal).next()
    }

    /// Full live list of one faction.
    pub fn of_faction(&self, faction: Faction) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter().filter(move |e| e.faction == faction)
    }

    /// Units within `max_distance` of `origin`.
    pub fn in_range(
        &self,
        origin: Vec2Fx,
        max_distance: Fx,
        alive_only: bool,
    ) -> impl Iterator<Item = &IndexEntry> {
        let max_sq = max_distance * max_distance;
        self.entries.iter().filter(move |e| {
            (!alive_only || e.alive) && e.position.distance_squared(origin) <= max_sq
        })
    }

    /// Alive, targetable units of the opposing faction within range.
    pub fn enemies_in_range(
        &self,
        origin: Vec2Fx,
        own_faction: Faction,
        max_distance: Fx,
    ) -> impl Iterator<Item = &IndexEntry> {
        let opposing = own_faction.opposing();
        self.in_range(origin, max_distance, true)
            .filter(move |e| e.faction == opposing && e.kind.is_targetable())
    }

    /// Alive collidable bodies within range, excluding one handle (the
    /// querying unit itself).
    pub fn obstacles_within(
        &self,
        origin: Vec2Fx,
        max_distance: Fx,
        exclude: UnitHandle,
    ) -> impl Iterator<Item = &IndexEntry> {
        self.in_range(origin, max_distance, true)
            .filter(move |e| e.handle != exclude && e.kind.is_collidable())
    }

    /// Check whether a body of the given radius placed at `point` would
    /// violate minimum separation against any live collidable unit.
    #[must_use]
    pub fn collides_at(
        &self,
        point: Vec2Fx,
        radius: Fx,
        separation_factor: Fx,
        exclude: Option<UnitHandle>,
    ) -> bool {
        self.entries.iter().any(|e| {
            if !e.alive || !e.kind.is_collidable() {
                return false;
            }
            if Some(e.handle) == exclude {
                return false;
            }
            let min_sep = (radius + e.collision_radius) * separation_factor;
            e.position.distance_squared(point) < min_sep * min_sep
        })
    }

    /// Nearest alive unit of a faction to a point, excluding one handle.
    #[must_use]
    pub fn nearest_of_faction(
        &self,
        point: Vec2Fx,
        faction: Faction,
        exclude: Option<UnitHandle>,
    ) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .filter(|e| e.alive && e.faction == faction && Some(e.handle) != exclude)
            .min_by_key(|e| e.position.distance_squared(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: u32, kind: UnitKind, x: i32, y: i32, radius: i32, alive: bool) -> IndexEntry {
        IndexEntry {
            handle: UnitHandle::from_parts(index, 1),
            kind,
            faction: kind.faction(),
            position: Vec2Fx::new(Fx::from_num(x), Fx::from_num(y)),
            collision_radius: Fx::from_num(radius),
            alive,
        }
    }

    fn sample_index() -> SpatialUnitIndex {
        let mut index = SpatialUnitIndex::new();
        index.refresh([
            entry(0, UnitKind::Tower, 100, 100, 32, true),
            entry(1, UnitKind::Raider, 150, 100, 20, true),
            entry(2, UnitKind::Raider, 900, 900, 20, true),
            entry(3, UnitKind::Raider, 160, 100, 20, false),
            entry(4, UnitKind::Crystal, 0, 0, 48, true),
        ]);
        index
    }

    #[test]
    fn test_category_accessors() {
        let index = sample_index();
        assert_eq!(index.towers().count(), 1);
        assert_eq!(index.raiders().count(), 3);
        assert_eq!(index.stone_walls().count(), 0);
        assert!(index.crystal().is_some());
    }

    #[test]
    fn test_in_range_respects_alive_flag() {
        let index = sample_index();
        let origin = Vec2Fx::new(Fx::from_num(100), Fx::from_num(100));
        let in_range: Vec<_> = index.in_range(origin, Fx::from_num(100), true).collect();
        // Tower itself, near raider; dead raider filtered, far raider and
        // crystal out of range
        assert_eq!(in_range.len(), 2);
    }

    #[test]
    fn test_enemies_in_range_filters_faction() {
        let index = sample_index();
        let origin = Vec2Fx::new(Fx::from_num(100), Fx::from_num(100));
        let enemies: Vec<_> = index
            .enemies_in_range(origin, Faction::Defenders, Fx::from_num(100))
            .collect();
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].handle, UnitHandle::from_parts(1, 1));
    }

    #[test]
    fn test_collides_at() {
        let index = sample_index();
        let tower_pos = Vec2Fx::new(Fx::from_num(100), Fx::from_num(100));
        // Radius 20 at the tower's own position: separation (20+32)*1.2
        assert!(index.collides_at(tower_pos, Fx::from_num(20), Fx::from_num(1.2), None));
        // Far corner is free
        assert!(!index.collides_at(
            Vec2Fx::new(Fx::from_num(500), Fx::from_num(500)),
            Fx::from_num(20),
            Fx::from_num(1.2),
            None
        ));
        // Excluding the tower clears its own footprint of everything but
        // the nearby raider
        assert!(index.collides_at(
            tower_pos,
            Fx::from_num(20),
            Fx::from_num(1.2),
            Some(UnitHandle::from_parts(0, 1))
        ));
    }

    #[test]
    fn test_nearest_of_faction() {
        let index = sample_index();
        let origin = Vec2Fx::new(Fx::from_num(100), Fx::from_num(100));
        let nearest = index
            .nearest_of_faction(origin, Faction::Raiders, None)
            .unwrap();
        assert_eq!(nearest.handle, UnitHandle::from_parts(1, 1));
    }

    #[test]
    fn test_refresh_replaces_old_entries() {
        let mut index = sample_index();
        index.refresh([entry(9, UnitKind::Hunter, 5, 5, 18, true)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.towers().count(), 0);
        assert_eq!(index.hunters().count(), 1);
    }
}
