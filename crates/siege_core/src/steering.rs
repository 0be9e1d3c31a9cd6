//! Movement planning with local collision avoidance.
//!
//! Units steer toward a goal while repelling off nearby bodies. The
//! blended direction is cached and reused for a tuning-defined window so
//! competing repulsions cannot flip the heading from tick to tick, and a
//! unit whose position already violates minimum separation is displaced
//! immediately instead of steered.
//!
//! Everything here is a pure function over the spatial index plus a small
//! per-unit [`SteeringMemory`]; no obstacle state is owned by this module.

use serde::{Deserialize, Serialize};

use crate::config::{ArenaBounds, AvoidanceTuning};
use crate::handle::UnitHandle;
use crate::index::SpatialUnitIndex;
use crate::math::{Fx, Vec2Fx};

/// Per-unit steering scratch state, reset on every pool reactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteeringMemory {
    /// Cached blended direction, reused between recomputations.
    cached_dir: Vec2Fx,
    /// Ticks since the cached direction was computed.
    cache_age: u32,
    /// Ticks since the last hard-overlap scan.
    collision_timer: u32,
    /// Consecutive ticks with displacement below the stuck epsilon.
    stuck_ticks: u32,
    /// Remaining ticks of the hold-position phase after getting stuck.
    wait_ticks: u32,
}

impl SteeringMemory {
    /// Fresh steering state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cached_dir: Vec2Fx::ZERO,
            cache_age: u32::MAX,
            collision_timer: 0,
            stuck_ticks: 0,
            wait_ticks: 0,
        }
    }

    /// Reset to the fresh state. Called on activation and check-in.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether the unit is currently in its post-stuck hold phase.
    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        self.wait_ticks > 0
    }

    fn cache_is_stale(&self, window: u32) -> bool {
        self.cache_age >= window || self.cached_dir.is_shorter_than(Fx::from_num(0.01))
    }
}

impl Default for SteeringMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// How a tick of movement planning resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Unit advances to the new position.
    Moved(Vec2Fx),
    /// Unit was inside another body and was displaced out at boosted
    /// speed, bypassing the steering blend.
    PushedApart(Vec2Fx),
    /// Unit is holding position after getting stuck.
    Waiting,
    /// Every candidate position collided; unit stays put this tick.
    Blocked,
}

impl MoveOutcome {
    /// The position after this outcome, given the current one.
    #[must_use]
    pub fn position_or(self, current: Vec2Fx) -> Vec2Fx {
        match self {
            Self::Moved(p) | Self::PushedApart(p) => p,
            Self::Waiting | Self::Blocked => current,
        }
    }
}

/// Plan one tick of movement toward `goal`.
///
/// Order of resolution:
/// 1. hard-overlap correction (push-apart) on its throttled cadence,
/// 2. post-stuck hold,
/// 3. cached-or-recomputed blended direction,
/// 4. candidate validation with rotated-heading retries, then a smaller
///    push-apart nudge, then staying put.
///
/// Candidates are clamped to arena bounds before any collision test. The
/// attempt count is fixed; this never loops unboundedly.
pub fn plan_move(
    memory: &mut SteeringMemory,
    handle: UnitHandle,
    position: Vec2Fx,
    goal: Vec2Fx,
    speed: Fx,
    radius: Fx,
    index: &SpatialUnitIndex,
    arena: &ArenaBounds,
    tuning: &AvoidanceTuning,
) -> MoveOutcome {
    // 1. Hard-overlap correction, throttled by the collision-check timer.
    if let Some(new_pos) =
        resolve_overlap(memory, handle, position, speed, radius, index, arena, tuning)
    {
        return MoveOutcome::PushedApart(new_pos);
    }

    // 2. Post-stuck hold: stand still, then force a replan.
    if memory.wait_ticks > 0 {
        memory.wait_ticks -= 1;
        if memory.wait_ticks == 0 {
            memory.cache_age = u32::MAX;
        }
        return MoveOutcome::Waiting;
    }

    // 3. Blended steering direction, cached against jitter.
    let desired = (goal - position).normalize();
    let dir = if memory.cache_is_stale(tuning.cache_window_ticks) {
        let repulsion = repulsion_vector(handle, position, radius, index, tuning);
        let blended = blend(desired, repulsion, tuning);
        memory.cached_dir = blended;
        memory.cache_age = 0;
        blended
    } else {
        memory.cache_age += 1;
        memory.cached_dir
    };

    // 4. Candidate validation.
    let outcome = validate_candidate(memory, handle, position, dir, speed, radius, index, arena, tuning);

    // Stuck detection over the resolved displacement.
    let new_pos = outcome.position_or(position);
    let displaced = (new_pos - position).length_squared()
        >= tuning.stuck_epsilon * tuning.stuck_epsilon;
    if displaced {
        memory.stuck_ticks = 0;
    } else {
        memory.stuck_ticks += 1;
        if memory.stuck_ticks >= tuning.stuck_after_ticks {
            memory.stuck_ticks = 0;
            memory.wait_ticks = tuning.stuck_hold_ticks;
        }
    }

    outcome
}

/// Throttled hard-overlap check, shared by goal-driven movement and
/// units standing idle.
///
/// When the current position already violates minimum separation against
/// any obstacle, returns the corrected position: one step along the
/// summed, normalized penetration vector at boosted speed, bypassing the
/// steering blend entirely.
pub fn resolve_overlap(
    memory: &mut SteeringMemory,
    handle: UnitHandle,
    position: Vec2Fx,
    speed: Fx,
    radius: Fx,
    index: &SpatialUnitIndex,
    arena: &ArenaBounds,
    tuning: &AvoidanceTuning,
) -> Option<Vec2Fx> {
    memory.collision_timer += 1;
    if memory.collision_timer < tuning.collision_check_ticks {
        return None;
    }
    memory.collision_timer = 0;

    let out_dir = push_apart_direction(handle, position, radius, index, tuning)?;
    let step = speed * tuning.push_apart_boost;
    let new_pos = arena.clamp_with_radius(position + out_dir.scale(step), radius);
    // Overlap invalidates whatever heading was cached.
    memory.cached_dir = Vec2Fx::ZERO;
    memory.cache_age = u32::MAX;
    memory.stuck_ticks = 0;
    Some(new_pos)
}

/// Summed repulsion from all obstacles near `position`.
///
/// Each obstacle within `obstacle_radius_factor × radius` contributes a
/// vector away from it, scaled by `1 − distance/search_radius` and boosted
/// by `overlap_boost` once the pair is inside its minimum separation.
pub fn repulsion_vector(
    handle: UnitHandle,
    position: Vec2Fx,
    radius: Fx,
    index: &SpatialUnitIndex,
    tuning: &AvoidanceTuning,
) -> Vec2Fx {
    let search_radius = radius * tuning.obstacle_radius_factor;
    let mut sum = Vec2Fx::ZERO;

    for obstacle in index.obstacles_within(position, search_radius, handle) {
        let offset = position - obstacle.position;
        let dist = offset.length();
        let away = if dist == Fx::ZERO {
            fallback_direction(handle)
        } else {
            offset.normalize()
        };

        let mut magnitude = Fx::from_num(1) - dist / search_radius;
        let min_sep = (radius + obstacle.collision_radius) * tuning.separation_factor;
        if dist < min_sep {
            magnitude *= tuning.overlap_boost;
        }
        sum = sum + away.scale(magnitude);
    }

    sum
}

/// Blend the goal direction with the repulsion, weighting avoidance
/// harder the stronger the repulsion is.
fn blend(desired: Vec2Fx, repulsion: Vec2Fx, tuning: &AvoidanceTuning) -> Vec2Fx {
    let strength = repulsion.length();
    if strength == Fx::ZERO {
        return desired;
    }

    let weight = if strength > tuning.strong_repulsion {
        tuning.weight_strong
    } else if strength > tuning.mild_repulsion {
        tuning.weight_mild
    } else {
        tuning.weight_weak
    };

    let blended = desired.lerp(repulsion.normalize(), weight).normalize();
    if blended == Vec2Fx::ZERO {
        // Desired and repulsion cancelled exactly; fall back to repulsion
        // so the unit backs out rather than standing in the overlap.
        repulsion.normalize()
    } else {
        blended
    }
}

/// Direction out of a hard overlap: the summed, normalized penetration
/// vector against every obstacle currently inside minimum separation.
/// `None` when the position is clean.
fn push_apart_direction(
    handle: UnitHandle,
    position: Vec2Fx,
    radius: Fx,
    index: &SpatialUnitIndex,
    tuning: &AvoidanceTuning,
) -> Option<Vec2Fx> {
    let search_radius = radius * tuning.obstacle_radius_factor;
    let mut sum = Vec2Fx::ZERO;
    let mut overlapping = false;

    for obstacle in index.obstacles_within(position, search_radius, handle) {
        let min_sep = (radius + obstacle.collision_radius) * tuning.separation_factor;
        let offset = position - obstacle.position;
        if offset.length_squared() >= min_sep * min_sep {
            continue;
        }
        overlapping = true;
        if offset == Vec2Fx::ZERO {
            sum = sum + fallback_direction(handle);
        } else {
            sum = sum + offset.normalize();
        }
    }

    if !overlapping {
        return None;
    }
    let dir = sum.normalize();
    if dir == Vec2Fx::ZERO {
        // Penetrations cancelled exactly; pick the deterministic fallback.
        Some(fallback_direction(handle))
    } else {
        Some(dir)
    }
}

/// Validate the preferred candidate, then rotated headings, then a small
/// nudge; otherwise stay put for the tick.
fn validate_candidate(
    memory: &mut SteeringMemory,
    handle: UnitHandle,
    position: Vec2Fx,
    dir: Vec2Fx,
    speed: Fx,
    radius: Fx,
    index: &SpatialUnitIndex,
    arena: &ArenaBounds,
    tuning: &AvoidanceTuning,
) -> MoveOutcome {
    let try_candidate = |d: Vec2Fx| -> Option<Vec2Fx> {
        let candidate = arena.clamp_with_radius(position + d.scale(speed), radius);
        if index.collides_at(candidate, radius, tuning.separation_factor, Some(handle)) {
            None
        } else {
            Some(candidate)
        }
    };

    if let Some(pos) = try_candidate(dir) {
        return MoveOutcome::Moved(pos);
    }

    for &deg in tuning
        .retry_headings_deg
        .iter()
        .take(tuning.max_heading_retries)
    {
        let (sin, cos) = sin_cos_deg(deg);
        if let Some(pos) = try_candidate(dir.rotated(cos, sin)) {
            // The detour heading becomes the cached direction so the next
            // few ticks continue around the obstacle instead of ramming it
            // again.
            memory.cached_dir = dir.rotated(cos, sin);
            memory.cache_age = 0;
            return MoveOutcome::Moved(pos);
        }
    }

    // Already overlapping somebody: a reduced push-apart step always
    // improves the separation, so it skips candidate validation.
    if let Some(out_dir) = push_apart_direction(handle, position, radius, index, tuning) {
        let candidate =
            arena.clamp_with_radius(position + out_dir.scale(speed * tuning.nudge_scale), radius);
        return MoveOutcome::Moved(candidate);
    }

    MoveOutcome::Blocked
}

/// Deterministic escape direction for exactly coincident bodies.
fn fallback_direction(handle: UnitHandle) -> Vec2Fx {
    if handle.index() % 2 == 0 {
        Vec2Fx::new(Fx::from_num(1), Fx::ZERO)
    } else {
        Vec2Fx::new(Fx::from_num(-1), Fx::ZERO)
    }
}

/// (sin, cos) pairs for the fixed retry headings.
fn sin_cos_deg(deg: i32) -> (Fx, Fx) {
    // Only the handful of headings used by candidate retries; anything
    // else in a tuning file rounds to the nearest supported angle.
    let (sin, cos) = match deg.abs() {
        0..=44 => (Fx::ZERO, Fx::from_num(1)),
        45..=74 => (Fx::from_num(0.866_025_403_784), Fx::from_num(0.5)),
        _ => (Fx::from_num(1), Fx::ZERO),
    };
    if deg < 0 {
        (-sin, cos)
    } else {
        (sin, cos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use crate::stats::UnitKind;

    const SELF: UnitHandle = UnitHandle::from_parts(0, 1);

    fn obstacle_at(index: u32, x: i32, y: i32, radius: i32) -> IndexEntry {
        let kind = UnitKind::Raider;
        IndexEntry {
            handle: UnitHandle::from_parts(index, 1),
            kind,
            faction: kind.faction(),
            position: Vec2Fx::new(Fx::from_num(x), Fx::from_num(y)),
            collision_radius: Fx::from_num(radius),
            alive: true,
        }
    }

    fn index_with(entries: Vec<IndexEntry>) -> SpatialUnitIndex {
        let mut index = SpatialUnitIndex::new();
        index.refresh(entries);
        index
    }

    fn arena() -> ArenaBounds {
        ArenaBounds::default()
    }

    fn centered(x: i32, y: i32) -> Vec2Fx {
        Vec2Fx::new(Fx::from_num(x), Fx::from_num(y))
    }

    #[test]
    fn test_open_field_moves_straight_at_goal() {
        let index = index_with(vec![]);
        let mut memory = SteeringMemory::new();
        let outcome = plan_move(
            &mut memory,
            SELF,
            centered(100, 100),
            centered(200, 100),
            Fx::from_num(3),
            Fx::from_num(20),
            &index,
            &arena(),
            &AvoidanceTuning::default(),
        );
        assert_eq!(outcome, MoveOutcome::Moved(centered(103, 100)));
    }

    #[test]
    fn test_hard_overlap_pushes_apart_at_boosted_speed() {
        // Obstacle 10 units away, radii 20+20, separation factor 1.2:
        // required separation 48, so this is a hard overlap.
        let index = index_with(vec![obstacle_at(1, 110, 100, 20)]);
        let mut memory = SteeringMemory::new();
        let tuning = AvoidanceTuning {
            collision_check_ticks: 1,
            ..AvoidanceTuning::default()
        };
        let outcome = plan_move(
            &mut memory,
            SELF,
            centered(100, 100),
            centered(500, 100),
            Fx::from_num(3),
            Fx::from_num(20),
            &index,
            &arena(),
            &tuning,
        );
        // Pushed away from the obstacle (negative x) at 1.5× speed.
        assert_eq!(outcome, MoveOutcome::PushedApart(centered(100, 100) + Vec2Fx::new(Fx::from_num(-4.5), Fx::ZERO)));
    }

    #[test]
    fn test_repulsion_scales_with_distance() {
        let tuning = AvoidanceTuning::default();
        let radius = Fx::from_num(20);
        // Search radius 80. Obstacle at distance 60, outside min
        // separation (48): magnitude 1 - 60/80 = 0.25, pointing away.
        let index = index_with(vec![obstacle_at(1, 160, 100, 20)]);
        let repulsion = repulsion_vector(SELF, centered(100, 100), radius, &index, &tuning);
        assert!(repulsion.x < Fx::ZERO);
        assert!((repulsion.length() - Fx::from_num(0.25)).abs() < Fx::from_num(0.01));

        // Same obstacle inside minimum separation doubles up.
        let index = index_with(vec![obstacle_at(1, 140, 100, 20)]);
        let repulsion = repulsion_vector(SELF, centered(100, 100), radius, &index, &tuning);
        assert!((repulsion.length() - Fx::from_num(1)).abs() < Fx::from_num(0.01));
    }

    #[test]
    fn test_blend_weight_tiers() {
        let tuning = AvoidanceTuning::default();
        let desired = Vec2Fx::new(Fx::from_num(1), Fx::ZERO);

        // Stronger repulsion pulls the blended heading further off the
        // goal direction, tier by tier.
        let weak = blend(desired, Vec2Fx::new(Fx::ZERO, Fx::from_num(0.5)), &tuning);
        let mild = blend(desired, Vec2Fx::new(Fx::ZERO, Fx::from_num(1.5)), &tuning);
        let strong = blend(desired, Vec2Fx::new(Fx::ZERO, Fx::from_num(3)), &tuning);

        assert!(weak.x >= weak.y, "weak tier blends evenly at most: {weak:?}");
        assert!(mild.y > mild.x, "mild repulsion should dominate: {mild:?}");
        assert!(strong.y > strong.x, "strong repulsion should dominate: {strong:?}");
        assert!(strong.y > mild.y, "strong tier bends hardest: {strong:?} vs {mild:?}");
    }

    #[test]
    fn test_direction_cache_survives_obstacle_changes() {
        let tuning = AvoidanceTuning::default();
        let mut memory = SteeringMemory::new();
        let speed = Fx::from_num(2);
        let radius = Fx::from_num(10);

        // First plan computes and caches a blended direction.
        let index = index_with(vec![obstacle_at(1, 100, 140, 10)]);
        let first = plan_move(
            &mut memory,
            SELF,
            centered(100, 100),
            centered(100, 500),
            speed,
            radius,
            &index,
            &arena(),
            &tuning,
        );
        let MoveOutcome::Moved(after_first) = first else {
            panic!("expected a move, got {first:?}");
        };
        let cached = memory.cached_dir;

        // Obstacles vanish, but within the cache window the heading is
        // reused verbatim.
        let empty = index_with(vec![]);
        let second = plan_move(
            &mut memory,
            SELF,
            after_first,
            centered(100, 500),
            speed,
            radius,
            &empty,
            &arena(),
            &tuning,
        );
        assert_eq!(memory.cached_dir, cached);
        let MoveOutcome::Moved(after_second) = second else {
            panic!("expected a move, got {second:?}");
        };
        assert_eq!(after_second, after_first + cached.scale(speed));
    }

    #[test]
    fn test_stale_heading_into_new_obstacle_takes_rotated_heading() {
        let tuning = AvoidanceTuning {
            collision_check_ticks: 100,
            ..AvoidanceTuning::default()
        };
        let mut memory = SteeringMemory::new();
        let speed = Fx::from_num(30);
        let radius = Fx::from_num(10);

        // Open field: heading straight at the goal gets cached.
        let empty = index_with(vec![]);
        let first = plan_move(
            &mut memory,
            SELF,
            centered(100, 100),
            centered(600, 100),
            speed,
            radius,
            &empty,
            &arena(),
            &tuning,
        );
        assert_eq!(first, MoveOutcome::Moved(centered(130, 100)));

        // A body appears on the cached heading within the cache window.
        // The straight candidate (160,100) violates separation 24 against
        // it, but the ±60° rotation clears.
        let index = index_with(vec![obstacle_at(1, 175, 100, 10)]);
        let second = plan_move(
            &mut memory,
            SELF,
            centered(130, 100),
            centered(600, 100),
            speed,
            radius,
            &index,
            &arena(),
            &tuning,
        );
        match second {
            MoveOutcome::Moved(pos) => {
                assert_ne!(pos, centered(160, 100), "straight candidate must be rejected");
                assert!(
                    !index.collides_at(pos, radius, tuning.separation_factor, Some(SELF)),
                    "detour position must be collision free: {pos:?}"
                );
            }
            other => panic!("expected a detour move, got {other:?}"),
        }
    }

    #[test]
    fn test_fully_blocked_stays_put_then_goes_stuck() {
        // Ring of bodies so close that every candidate within one step
        // collides, but the current spot itself is just clean.
        let tuning = AvoidanceTuning {
            collision_check_ticks: 100,
            separation_factor: Fx::from_num(1),
            stuck_after_ticks: 2,
            stuck_hold_ticks: 3,
            ..AvoidanceTuning::default()
        };
        let index = index_with(vec![
            obstacle_at(1, 141, 100, 20),
            obstacle_at(2, 59, 100, 20),
            obstacle_at(3, 100, 141, 20),
            obstacle_at(4, 100, 59, 20),
        ]);
        let mut memory = SteeringMemory::new();

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(plan_move(
                &mut memory,
                SELF,
                centered(100, 100),
                centered(400, 100),
                Fx::from_num(3),
                Fx::from_num(20),
                &index,
                &arena(),
                &tuning,
            ));
        }
        assert_eq!(outcomes[0], MoveOutcome::Blocked);
        assert_eq!(outcomes[1], MoveOutcome::Blocked);
        // Two blocked ticks trip the stuck detector; the third holds.
        assert_eq!(outcomes[2], MoveOutcome::Waiting);
        assert!(memory.is_waiting());
    }

    #[test]
    fn test_candidates_clamped_to_arena() {
        let index = index_with(vec![]);
        let mut memory = SteeringMemory::new();
        let bounds = ArenaBounds::default();
        // Heading straight out of the arena clamps to the inset edge.
        let outcome = plan_move(
            &mut memory,
            SELF,
            centered(5, 100),
            centered(-500, 100),
            Fx::from_num(10),
            Fx::from_num(20),
            &index,
            &bounds,
            &AvoidanceTuning::default(),
        );
        assert_eq!(outcome, MoveOutcome::Moved(centered(20, 100)));
    }
}
