//! Target acquisition.
//!
//! Scans run on a throttled cadence owned by the unit, not every tick; a
//! unit whose held target dies or goes stale forces an immediate rescan.
//! Selection is nearest-by-squared-distance over alive, targetable units
//! of the opposing faction inside detection range. Ties are not resolved;
//! the first candidate encountered wins.

use crate::handle::UnitHandle;
use crate::index::SpatialUnitIndex;
use crate::math::{Fx, Vec2Fx};
use crate::stats::Faction;

/// Pick the nearest enemy within detection range of `origin`.
///
/// `hold_anchor` restricts candidates for defending units: only enemies
/// within the anchor's leash radius are considered, so a defender never
/// chases past the post it was ordered to hold.
///
/// Returns `None` when no candidate qualifies; the caller clears its
/// target and idles until the next scan.
#[must_use]
pub fn acquire_target(
    index: &SpatialUnitIndex,
    origin: Vec2Fx,
    own_faction: Faction,
    detection_range: Fx,
    hold_anchor: Option<(Vec2Fx, Fx)>,
) -> Option<UnitHandle> {
    index
        .enemies_in_range(origin, own_faction, detection_range)
        .filter(|entry| match hold_anchor {
            Some((anchor, leash)) => {
                entry.position.distance_squared(anchor) <= leash * leash
            }
            None => true,
        })
        .min_by_key(|entry| entry.position.distance_squared(origin))
        .map(|entry| entry.handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use crate::stats::UnitKind;

    fn raider(index: u32, x: i32, y: i32, alive: bool) -> IndexEntry {
        IndexEntry {
            handle: UnitHandle::from_parts(index, 1),
            kind: UnitKind::Raider,
            faction: Faction::Raiders,
            position: Vec2Fx::new(Fx::from_num(x), Fx::from_num(y)),
            collision_radius: Fx::from_num(20),
            alive,
        }
    }

    fn origin() -> Vec2Fx {
        Vec2Fx::ZERO
    }

    #[test]
    fn test_picks_nearest_enemy() {
        let mut index = SpatialUnitIndex::new();
        index.refresh([raider(1, 300, 0, true), raider(2, 100, 0, true)]);

        let target = acquire_target(
            &index,
            origin(),
            Faction::Defenders,
            Fx::from_num(400),
            None,
        );
        assert_eq!(target, Some(UnitHandle::from_parts(2, 1)));
    }

    #[test]
    fn test_ignores_dead_and_out_of_range() {
        let mut index = SpatialUnitIndex::new();
        index.refresh([raider(1, 100, 0, false), raider(2, 900, 0, true)]);

        let target = acquire_target(
            &index,
            origin(),
            Faction::Defenders,
            Fx::from_num(400),
            None,
        );
        assert_eq!(target, None);
    }

    #[test]
    fn test_ignores_own_faction() {
        let mut index = SpatialUnitIndex::new();
        index.refresh([raider(1, 100, 0, true)]);

        let target = acquire_target(
            &index,
            origin(),
            Faction::Raiders,
            Fx::from_num(400),
            None,
        );
        assert_eq!(target, None);
    }

    #[test]
    fn test_tie_keeps_first_found() {
        let mut index = SpatialUnitIndex::new();
        index.refresh([raider(1, 100, 0, true), raider(2, 0, 100, true)]);

        let target = acquire_target(
            &index,
            origin(),
            Faction::Defenders,
            Fx::from_num(400),
            None,
        );
        assert_eq!(target, Some(UnitHandle::from_parts(1, 1)));
    }

    #[test]
    fn test_hold_anchor_limits_pursuit() {
        let mut index = SpatialUnitIndex::new();
        index.refresh([raider(1, 350, 0, true)]);

        // Within detection range of the unit, but past the leash around
        // the defended post.
        let anchor = (Vec2Fx::ZERO, Fx::from_num(300));
        let target = acquire_target(
            &index,
            origin(),
            Faction::Defenders,
            Fx::from_num(400),
            Some(anchor),
        );
        assert_eq!(target, None);

        let target = acquire_target(
            &index,
            origin(),
            Faction::Defenders,
            Fx::from_num(400),
            Some((Vec2Fx::ZERO, Fx::from_num(400))),
        );
        assert_eq!(target, Some(UnitHandle::from_parts(1, 1)));
    }
}
