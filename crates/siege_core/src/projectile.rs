//! In-flight projectiles.
//!
//! Ranged units launch a projectile at windup completion instead of
//! applying damage directly. The shot is aimed at the target's position
//! at launch time and flies there in a straight line; a target that
//! moves far enough before impact is simply missed. Impact resolution
//! (hit test against the target, damage application) is owned by the
//! battle loop, which has the storage access this module deliberately
//! lacks.

use serde::{Deserialize, Serialize};

use crate::handle::UnitHandle;
use crate::math::{fx_serde, Fx, Vec2Fx};
use crate::stats::UnitKind;

/// One shot in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unit that fired the shot.
    pub shooter: UnitHandle,
    /// Kind of the shooter, for damage attribution.
    pub shooter_kind: UnitKind,
    /// Display name of the shooter, for damage attribution.
    pub shooter_name: String,
    /// Intended victim. Revalidated on arrival.
    pub target: UnitHandle,
    /// Where the target stood at launch; the shot flies here.
    pub aim_point: Vec2Fx,
    /// Current position.
    pub position: Vec2Fx,
    /// Travel speed per tick.
    #[serde(with = "fx_serde")]
    pub speed: Fx,
    /// Damage on impact.
    pub damage: u32,
}

impl Projectile {
    /// Advance one tick toward the aim point.
    ///
    /// Returns `true` once the shot has arrived (within one tick of
    /// travel), at which point the battle resolves the impact and drops
    /// the projectile.
    pub fn advance(&mut self) -> bool {
        let remaining = self.aim_point - self.position;
        if remaining.length_squared() <= self.speed * self.speed {
            self.position = self.aim_point;
            return true;
        }
        let step = remaining.normalize().scale(self.speed);
        self.position = self.position + step;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(from: (i32, i32), to: (i32, i32), speed: i32) -> Projectile {
        Projectile {
            shooter: UnitHandle::from_parts(0, 1),
            shooter_kind: UnitKind::Tower,
            shooter_name: "Arrow Tower".into(),
            target: UnitHandle::from_parts(1, 1),
            aim_point: Vec2Fx::new(Fx::from_num(to.0), Fx::from_num(to.1)),
            position: Vec2Fx::new(Fx::from_num(from.0), Fx::from_num(from.1)),
            speed: Fx::from_num(speed),
            damage: 10,
        }
    }

    #[test]
    fn test_advances_in_straight_line() {
        let mut projectile = shot((0, 0), (100, 0), 20);
        assert!(!projectile.advance());
        assert_eq!(
            projectile.position,
            Vec2Fx::new(Fx::from_num(20), Fx::ZERO)
        );
    }

    #[test]
    fn test_arrives_within_final_step() {
        let mut projectile = shot((0, 0), (50, 0), 20);
        assert!(!projectile.advance());
        assert!(!projectile.advance());
        // 10 units left, within one 20-unit step
        assert!(projectile.advance());
        assert_eq!(projectile.position, projectile.aim_point);
    }

    #[test]
    fn test_point_blank_arrives_immediately() {
        let mut projectile = shot((50, 50), (50, 50), 20);
        assert!(projectile.advance());
    }
}
