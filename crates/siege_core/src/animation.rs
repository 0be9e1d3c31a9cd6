//! Per-unit animation state.
//!
//! The original engine drove animation through scheduled callback chains,
//! which had to be unscheduled by hand on death or recycling. Here the
//! animation layer is a plain struct advanced by the frame loop: pool
//! reactivation resets it wholesale, so a recycled unit can never receive
//! a tick meant for its previous life.
//!
//! The animation layer is visual bookkeeping only. Combat timing (attack
//! windup, death duration) is owned by the unit's action state; this
//! module mirrors it for observers such as the selection UI.

use serde::{Deserialize, Serialize};

/// Which clip the unit is presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimClip {
    /// Standing.
    Idle,
    /// Walking/running loop.
    Move,
    /// Attack swing/draw.
    Attack,
    /// Flinch overlay after taking a hit.
    Hit,
    /// Death animation.
    Death,
}

/// Animation state advanced once per simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationPlayer {
    clip: AnimClip,
    /// Remaining ticks of a timed clip (`Attack`, `Hit`, `Death`);
    /// zero for looping clips.
    remaining: u32,
    /// Whether the unit is currently moving; decides what the hit overlay
    /// resumes into.
    moving: bool,
}

impl AnimationPlayer {
    /// A fresh player, idling.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clip: AnimClip::Idle,
            remaining: 0,
            moving: false,
        }
    }

    /// Current clip.
    #[must_use]
    pub const fn clip(&self) -> AnimClip {
        self.clip
    }

    /// Whether the death clip has fully played out.
    #[must_use]
    pub const fn death_finished(&self) -> bool {
        matches!(self.clip, AnimClip::Death) && self.remaining == 0
    }

    /// Record whether the unit is moving and, outside of timed clips,
    /// switch between the idle and move loops.
    pub fn set_moving(&mut self, moving: bool) {
        self.moving = moving;
        if matches!(self.clip, AnimClip::Idle | AnimClip::Move) {
            self.clip = if moving { AnimClip::Move } else { AnimClip::Idle };
        }
    }

    /// Begin the attack clip for the windup duration.
    ///
    /// A hit overlay in progress keeps playing; the attack clip only
    /// replaces the movement loop.
    pub fn play_attack(&mut self, windup_ticks: u32) {
        if matches!(self.clip, AnimClip::Hit | AnimClip::Death) {
            return;
        }
        self.clip = AnimClip::Attack;
        self.remaining = windup_ticks;
    }

    /// Overlay the hit flinch. Pauses the visual move/attack loop only;
    /// the unit keeps simulating underneath and may die mid-flinch.
    pub fn overlay_hit(&mut self, overlay_ticks: u32) {
        if matches!(self.clip, AnimClip::Death) {
            return;
        }
        self.clip = AnimClip::Hit;
        self.remaining = overlay_ticks;
    }

    /// Begin the death clip. Wins over every other clip.
    pub fn play_death(&mut self, death_ticks: u32) {
        self.clip = AnimClip::Death;
        self.remaining = death_ticks;
    }

    /// Advance one tick.
    pub fn tick(&mut self) {
        match self.clip {
            AnimClip::Idle | AnimClip::Move => {}
            AnimClip::Death => {
                self.remaining = self.remaining.saturating_sub(1);
            }
            AnimClip::Attack | AnimClip::Hit => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    // Timed clip over: resume the loop matching the
                    // current movement flag.
                    self.clip = if self.moving { AnimClip::Move } else { AnimClip::Idle };
                }
            }
        }
    }
}

impl Default for AnimationPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_overlay_resumes_by_movement_flag() {
        let mut anim = AnimationPlayer::new();
        anim.set_moving(true);
        assert_eq!(anim.clip(), AnimClip::Move);

        anim.overlay_hit(2);
        assert_eq!(anim.clip(), AnimClip::Hit);
        anim.tick();
        anim.tick();
        assert_eq!(anim.clip(), AnimClip::Move);

        anim.set_moving(false);
        anim.overlay_hit(1);
        anim.tick();
        assert_eq!(anim.clip(), AnimClip::Idle);
    }

    #[test]
    fn test_death_wins_over_hit() {
        let mut anim = AnimationPlayer::new();
        anim.overlay_hit(4);
        anim.play_death(3);
        assert_eq!(anim.clip(), AnimClip::Death);
        // A late flinch cannot interrupt dying
        anim.overlay_hit(4);
        assert_eq!(anim.clip(), AnimClip::Death);

        anim.tick();
        anim.tick();
        assert!(!anim.death_finished());
        anim.tick();
        assert!(anim.death_finished());
        // Death does not resume into idle
        anim.tick();
        assert_eq!(anim.clip(), AnimClip::Death);
    }

    #[test]
    fn test_attack_does_not_interrupt_hit() {
        let mut anim = AnimationPlayer::new();
        anim.overlay_hit(3);
        anim.play_attack(5);
        assert_eq!(anim.clip(), AnimClip::Hit);
    }
}
