//! The autonomous combat unit.
//!
//! Each unit runs its own state machine once per tick: maintain a target,
//! close in while steering around other bodies, attack on a cooldown
//! gated by the windup animation, die, and hand itself back for
//! recycling. Units never own their targets — only generational handles
//! revalidated at every use — and never touch global state: every
//! collaborator arrives through the per-tick [`UpdateCtx`].
//!
//! [`UpdateCtx`]: crate::battle::UpdateCtx

use serde::{Deserialize, Serialize};

use crate::animation::AnimationPlayer;
use crate::battle::{DamageEvent, KillEvent, UpdateCtx, TICK_RATE};
use crate::config::CombatTuning;
use crate::data::UnitArchetype;
use crate::handle::UnitHandle;
use crate::math::{Fx, Vec2Fx};
use crate::producer::BuildingProducer;
use crate::projectile::Projectile;
use crate::services::{DamageSink, ServiceRegistry};
use crate::stats::{Faction, Health, UnitKind, UnitStats};
use crate::steering::{self, SteeringMemory};
use crate::targeting;

/// What a unit is doing this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionState {
    /// Checked in (or never activated); the battle ignores the unit.
    Recycled,
    /// Active with no target.
    Idle,
    /// Target held; standing by (in range but cooling down, or a
    /// structure waiting for the target to close).
    Seeking,
    /// Closing in on the target or following a move order.
    Moving,
    /// Mid-windup. Damage lands only when the windup completes.
    Attacking {
        /// Ticks until the windup completes.
        windup_remaining: u32,
    },
    /// Death animation playing; all combat and movement logic frozen.
    Dying {
        /// Ticks until the unit is handed back to the pool.
        remaining: u32,
    },
}

/// Pull-only view of a unit for the selection UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Kind of the unit.
    pub kind: UnitKind,
    /// Display name.
    pub name: String,
    /// Current health.
    pub current_health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Level.
    pub level: u32,
    /// Attack damage after modifiers.
    pub attack_damage: u32,
    /// Attack range after modifiers.
    #[serde(with = "crate::math::fx_serde")]
    pub attack_range: Fx,
    /// Move speed after modifiers.
    #[serde(with = "crate::math::fx_serde")]
    pub move_speed: Fx,
    /// Whether the unit holds a defend order.
    pub is_defending: bool,
}

/// An autonomous combat unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatUnit {
    kind: UnitKind,
    name: String,
    faction: Faction,
    /// Immutable pristine snapshot from the archetype.
    base: UnitStats,
    /// Live stats: modifier pipeline and combat mutate these.
    stats: UnitStats,
    health: Health,
    position: Vec2Fx,
    facing: Vec2Fx,
    state: ActionState,
    anim: AnimationPlayer,
    steering: SteeringMemory,
    target: Option<UnitHandle>,
    manual_move: Option<Vec2Fx>,
    is_defending: bool,
    defend_anchor: Option<Vec2Fx>,
    production: Option<BuildingProducer>,
    /// Ticks since the last attack. Accumulates every tick; attacking
    /// requires the full interval.
    cooldown_ticks: u32,
    rescan_timer: u32,
    regen_timer: u32,
    /// One-shot guard: the modifier pipeline ran this pool cycle.
    enhancements_applied: bool,
    /// Activation completed and check-in has not happened yet.
    ready: bool,
    service_epoch: u64,
    degraded_warned: bool,
}

impl CombatUnit {
    /// Build a fresh instance from an archetype. The instance starts
    /// recycled; [`activate`](Self::activate) makes it live.
    #[must_use]
    pub fn from_archetype(archetype: &UnitArchetype) -> Self {
        Self {
            kind: archetype.kind,
            name: archetype.name.clone(),
            faction: archetype.kind.faction(),
            base: archetype.stats.clone(),
            stats: archetype.stats.clone(),
            health: Health::new(archetype.stats.max_health),
            position: Vec2Fx::ZERO,
            facing: Vec2Fx::new(Fx::from_num(1), Fx::ZERO),
            state: ActionState::Recycled,
            anim: AnimationPlayer::new(),
            steering: SteeringMemory::new(),
            target: None,
            manual_move: None,
            is_defending: false,
            defend_anchor: None,
            production: None,
            cooldown_ticks: 0,
            rescan_timer: 0,
            regen_timer: 0,
            enhancements_applied: false,
            ready: false,
            service_epoch: 0,
            degraded_warned: false,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Activate the unit at a position.
    ///
    /// Hook order is a contract: reset transient fields → restore the
    /// pristine stat sheet → re-resolve collaborator links → rebuild the
    /// visual layer → run the modifier pipeline exactly once per pool
    /// cycle → mark ready. Both checkout paths (recycled and fresh) run
    /// this same hook.
    ///
    /// A second activation without an intervening check-in is a no-op.
    pub fn activate(&mut self, position: Vec2Fx, services: &ServiceRegistry) {
        if self.ready {
            return;
        }

        // 1. Transient fields.
        self.target = None;
        self.manual_move = None;
        self.is_defending = false;
        self.defend_anchor = None;
        self.rescan_timer = 0;
        self.regen_timer = 0;
        self.steering.reset();
        self.position = position;
        self.facing = Vec2Fx::new(Fx::from_num(1), Fx::ZERO);

        // 2. Pristine stats.
        self.stats = self.base.clone();

        // 3. Collaborator links. Services may have been swapped since the
        // previous life of this instance.
        self.service_epoch = services.epoch();
        self.degraded_warned = false;

        // 4. Visual layer.
        self.anim = AnimationPlayer::new();

        // 5. Modifier pipeline, enhancement deltas then talents. The
        // guard is cleared only at check-in, not at deactivation.
        if !self.enhancements_applied {
            services.modifiers().apply_unit_enhancements(self.kind, &mut self.stats);
            services.modifiers().apply_talent_effects(&mut self.stats);
            self.enhancements_applied = true;
        }

        // 6. Ready.
        self.health = Health::new(self.stats.max_health);
        self.cooldown_ticks = self.stats.attack_interval_ticks;
        if let Some(producer) = self.production.as_mut() {
            producer.reset();
        }
        self.state = ActionState::Idle;
        self.ready = true;
    }

    /// Detach the unit from the battle without reverting stats.
    ///
    /// The enhancement guard stays set: a reactivation after a mere
    /// deactivation must not re-run the modifier pipeline.
    pub fn deactivate(&mut self) {
        self.ready = false;
        self.state = ActionState::Recycled;
    }

    /// Revert every runtime field and every stat to the pristine
    /// snapshot. The pool calls this on check-in; it is the only place
    /// the enhancement guard is cleared.
    pub fn reset_for_checkin(&mut self) {
        self.deactivate();
        self.stats = self.base.clone();
        self.health = Health::new(self.base.max_health);
        self.target = None;
        self.manual_move = None;
        self.is_defending = false;
        self.defend_anchor = None;
        self.steering.reset();
        self.anim = AnimationPlayer::new();
        self.cooldown_ticks = 0;
        self.rescan_timer = 0;
        self.regen_timer = 0;
        self.enhancements_applied = false;
        if let Some(producer) = self.production.as_mut() {
            producer.reset();
        }
    }

    // ========================================================================
    // Per-tick update
    // ========================================================================

    /// Run one tick of the unit's state machine.
    pub fn update(&mut self, handle: UnitHandle, ctx: &mut UpdateCtx<'_>) {
        match self.state {
            ActionState::Recycled => return,
            ActionState::Dying { remaining } => {
                // All combat and movement logic is frozen; only the death
                // animation advances.
                self.anim.tick();
                let remaining = remaining.saturating_sub(1);
                self.state = if remaining == 0 {
                    ActionState::Recycled
                } else {
                    ActionState::Dying { remaining }
                };
                return;
            }
            _ => {}
        }

        self.check_collaborators(ctx.services);

        // The attack cooldown accumulates every tick regardless of state.
        self.cooldown_ticks = self.cooldown_ticks.saturating_add(1);

        self.tick_regen(ctx.services);

        if self.kind.can_attack() {
            self.maintain_target(ctx);
        }

        if let ActionState::Attacking { windup_remaining } = self.state {
            let remaining = windup_remaining.saturating_sub(1);
            if remaining == 0 {
                self.resolve_attack(handle, ctx);
                if !matches!(self.state, ActionState::Dying { .. }) {
                    self.state = ActionState::Seeking;
                }
            } else {
                self.state = ActionState::Attacking {
                    windup_remaining: remaining,
                };
            }
            self.anim.tick();
            return;
        }

        self.plan_action(handle, ctx);
        self.anim.tick();
    }

    fn check_collaborators(&mut self, services: &ServiceRegistry) {
        if self.service_epoch != services.epoch() && !self.degraded_warned {
            tracing::warn!(
                unit = %self.name,
                "collaborator services replaced since activation; continuing with current registry"
            );
            self.degraded_warned = true;
        }
    }

    fn tick_regen(&mut self, services: &mut ServiceRegistry) {
        if self.stats.health_regen == 0 || self.health.is_full() {
            self.regen_timer = 0;
            return;
        }
        self.regen_timer += 1;
        if self.regen_timer >= TICK_RATE {
            self.regen_timer = 0;
            let healed = self.health.heal(self.stats.health_regen);
            if healed > 0 {
                services
                    .damage_sink()
                    .record_heal(self.kind, &self.name, healed);
            }
        }
    }

    /// Drop stale targets and rescan on the throttled cadence — or
    /// immediately when no target is held.
    fn maintain_target(&mut self, ctx: &mut UpdateCtx<'_>) {
        let target_alive = self
            .target
            .and_then(|h| ctx.units.get(h))
            .is_some_and(CombatUnit::is_alive);
        if !target_alive {
            self.target = None;
        }

        self.rescan_timer = self.rescan_timer.saturating_add(1);
        if self.target.is_some() && self.rescan_timer < ctx.config.combat.rescan_ticks {
            return;
        }
        self.rescan_timer = 0;

        let detection = self
            .stats
            .effective_detection_range(ctx.config.combat.detection_range_factor);
        let anchor = if self.is_defending {
            self.defend_anchor.map(|post| (post, detection))
        } else {
            None
        };
        self.target =
            targeting::acquire_target(ctx.index, self.position, self.faction, detection, anchor);
    }

    /// Windup complete: re-check the target's validity at this exact
    /// moment — it may have died mid-windup — then deal damage or launch
    /// a projectile.
    fn resolve_attack(&mut self, handle: UnitHandle, ctx: &mut UpdateCtx<'_>) {
        let Some(target_handle) = self.target else {
            return;
        };
        let Some(target) = ctx.units.get_mut(target_handle) else {
            self.target = None;
            return;
        };
        if !target.is_alive() {
            self.target = None;
            return;
        }

        let aim = target.position;
        let dir = (aim - self.position).normalize();
        if dir != Vec2Fx::ZERO {
            self.facing = dir;
        }

        if self.kind.is_ranged() {
            let speed = self
                .stats
                .projectile_speed
                .unwrap_or_else(|| Fx::from_num(20));
            ctx.projectiles.push(Projectile {
                shooter: handle,
                shooter_kind: self.kind,
                shooter_name: self.name.clone(),
                target: target_handle,
                aim_point: aim,
                position: self.position,
                speed,
                damage: self.stats.attack_damage,
            });
        } else {
            let dealt = target.take_damage(
                self.stats.attack_damage,
                ctx.services.damage_sink(),
                &ctx.config.combat,
            );
            ctx.services
                .damage_sink()
                .record_damage(self.kind, &self.name, dealt);
            ctx.events.damage_events.push(DamageEvent {
                attacker: handle,
                target: target_handle,
                amount: dealt,
            });
            if target.is_destroyed() {
                ctx.events.kills.push(KillEvent {
                    killer: handle,
                    victim: target_handle,
                });
                self.target = None;
            }
        }
    }

    /// Pick this tick's action: manual move orders first, then the
    /// target-driven seek/move/attack ladder.
    fn plan_action(&mut self, handle: UnitHandle, ctx: &mut UpdateCtx<'_>) {
        if let Some(dest) = self.manual_move {
            let arrive = ctx.config.combat.arrival_threshold;
            if self.position.distance_squared(dest) <= arrive * arrive {
                self.manual_move = None;
            } else {
                self.state = ActionState::Moving;
                self.step_toward(handle, dest, ctx);
                if self.steering.is_waiting() {
                    // Persistent collision: the order is dropped, not
                    // retried.
                    self.manual_move = None;
                }
                return;
            }
        }

        let target_pos = self
            .target
            .and_then(|h| ctx.units.get(h))
            .map(|u| u.position);
        let Some(target_pos) = target_pos else {
            self.target = None;
            self.state = ActionState::Idle;
            self.hold_position(handle, ctx);
            return;
        };

        let range = self.stats.attack_range;
        let dist_sq = self.position.distance_squared(target_pos);
        if dist_sq <= range * range {
            self.anim.set_moving(false);
            if self.cooldown_ticks >= self.stats.attack_interval_ticks {
                self.cooldown_ticks = 0;
                let windup = ctx.config.combat.windup_ticks.max(1);
                self.state = ActionState::Attacking {
                    windup_remaining: windup,
                };
                let dir = (target_pos - self.position).normalize();
                if dir != Vec2Fx::ZERO {
                    self.facing = dir;
                }
                self.anim.play_attack(windup);
            } else {
                self.state = ActionState::Seeking;
            }
        } else if self.kind.is_mobile() {
            self.state = ActionState::Moving;
            self.step_toward(handle, target_pos, ctx);
        } else {
            // Structures hold and wait for the target to close.
            self.state = ActionState::Seeking;
            self.anim.set_moving(false);
        }
    }

    /// Advance one movement step toward `goal` with avoidance.
    fn step_toward(&mut self, handle: UnitHandle, goal: Vec2Fx, ctx: &mut UpdateCtx<'_>) {
        let outcome = steering::plan_move(
            &mut self.steering,
            handle,
            self.position,
            goal,
            self.stats.move_speed,
            self.stats.collision_radius,
            ctx.index,
            &ctx.config.arena,
            &ctx.config.avoidance,
        );
        let new_pos = outcome.position_or(self.position);
        let moved = new_pos != self.position;
        if moved {
            let dir = (new_pos - self.position).normalize();
            if dir != Vec2Fx::ZERO {
                self.facing = dir;
            }
            self.position = new_pos;
        }
        self.anim.set_moving(moved);
    }

    /// Stationary tick: no goal, but a mobile unit overlapping another
    /// body still gets pushed apart.
    fn hold_position(&mut self, handle: UnitHandle, ctx: &mut UpdateCtx<'_>) {
        if !self.kind.is_mobile() {
            self.anim.set_moving(false);
            return;
        }
        if let Some(new_pos) = steering::resolve_overlap(
            &mut self.steering,
            handle,
            self.position,
            self.stats.move_speed,
            self.stats.collision_radius,
            ctx.index,
            &ctx.config.arena,
            &ctx.config.avoidance,
        ) {
            self.position = new_pos;
            self.anim.set_moving(true);
        } else {
            self.anim.set_moving(false);
        }
    }

    // ========================================================================
    // Damage intake
    // ========================================================================

    /// Apply incoming damage.
    ///
    /// Returns the health actually removed. A unit already dying or
    /// recycled is frozen and takes nothing. Reaching zero health flips
    /// the unit to dying immediately: position and target stop updating
    /// while the death animation plays out.
    pub fn take_damage(
        &mut self,
        amount: u32,
        sink: &mut dyn DamageSink,
        combat: &CombatTuning,
    ) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let dealt = self.health.apply_damage(amount);
        if dealt > 0 {
            sink.record_damage_taken(self.kind, &self.name, dealt);
        }
        if self.health.is_destroyed() {
            self.begin_dying(combat.death_ticks);
        } else if dealt > 0 {
            // Flinch overlay: visual only, does not block further damage
            // or dying.
            self.anim.overlay_hit(combat.hit_overlay_ticks);
        }
        dealt
    }

    /// Heal the unit, reporting the restored amount to the sink.
    pub fn receive_heal(&mut self, amount: u32, sink: &mut dyn DamageSink) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let healed = self.health.heal(amount);
        if healed > 0 {
            sink.record_heal(self.kind, &self.name, healed);
        }
        healed
    }

    fn begin_dying(&mut self, death_ticks: u32) {
        // Idempotent: a unit already dying stays on its original clock.
        if matches!(
            self.state,
            ActionState::Dying { .. } | ActionState::Recycled
        ) {
            return;
        }
        self.state = ActionState::Dying {
            remaining: death_ticks.max(1),
        };
        self.target = None;
        self.manual_move = None;
        self.anim.play_death(death_ticks);
    }

    // ========================================================================
    // Orders & queries
    // ========================================================================

    /// Issue a manual move order. Takes priority over autonomous seeking
    /// until arrival or an unresolved persistent collision.
    pub fn order_move(&mut self, destination: Vec2Fx) {
        if self.is_alive() && self.kind.is_mobile() {
            self.manual_move = Some(destination);
        }
    }

    /// Toggle the defend stance. Enabling anchors the unit at its current
    /// position: it will not pursue targets past its detection range from
    /// that post.
    pub fn set_defending(&mut self, defending: bool) {
        self.is_defending = defending;
        self.defend_anchor = defending.then_some(self.position);
    }

    /// Attach production state, turning this unit into a producer
    /// building.
    #[must_use]
    pub fn with_production(mut self, producer: BuildingProducer) -> Self {
        self.production = Some(producer);
        self
    }

    /// Attach production state in place.
    pub fn set_production(&mut self, producer: Option<BuildingProducer>) {
        self.production = producer;
    }

    /// Pull-only snapshot for the selection UI.
    #[must_use]
    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            kind: self.kind,
            name: self.name.clone(),
            current_health: self.health.current,
            max_health: self.health.max,
            level: self.stats.level,
            attack_damage: self.stats.attack_damage,
            attack_range: self.stats.attack_range,
            move_speed: self.stats.move_speed,
            is_defending: self.is_defending,
        }
    }

    /// Kind of this unit (doubles as its pool key).
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Faction.
    #[must_use]
    pub fn faction(&self) -> Faction {
        self.faction
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2Fx {
        self.position
    }

    /// Place the unit. Battle-side spawning only.
    pub fn set_position(&mut self, position: Vec2Fx) {
        self.position = position;
    }

    /// Facing direction (normalized).
    #[must_use]
    pub fn facing(&self) -> Vec2Fx {
        self.facing
    }

    /// Current action state.
    #[must_use]
    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> Health {
        self.health
    }

    /// Current target handle, if any.
    #[must_use]
    pub fn target(&self) -> Option<UnitHandle> {
        self.target
    }

    /// Manual move destination, if any.
    #[must_use]
    pub fn manual_move(&self) -> Option<Vec2Fx> {
        self.manual_move
    }

    /// Whether the unit holds a defend order.
    #[must_use]
    pub fn is_defending(&self) -> bool {
        self.is_defending
    }

    /// Destroyed means exactly zero health.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.health.is_destroyed()
    }

    /// Alive: activated, healthy, and not in the death/recycle tail.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.ready
            && !self.health.is_destroyed()
            && !matches!(
                self.state,
                ActionState::Dying { .. } | ActionState::Recycled
            )
    }

    /// Whether the death animation finished and the battle should hand
    /// this unit back to the pool.
    #[must_use]
    pub fn awaiting_recycle(&self) -> bool {
        self.ready && matches!(self.state, ActionState::Recycled)
    }

    /// Pristine stat snapshot.
    #[must_use]
    pub fn base_stats(&self) -> &UnitStats {
        &self.base
    }

    /// Live (modified) stats.
    #[must_use]
    pub fn live_stats(&self) -> &UnitStats {
        &self.stats
    }

    /// Mutable live stats. Combat and tests only; the pristine snapshot
    /// is untouchable.
    pub fn live_stats_mut(&mut self) -> &mut UnitStats {
        &mut self.stats
    }

    /// Production state, if this unit is a producer building.
    #[must_use]
    pub fn production(&self) -> Option<&BuildingProducer> {
        self.production.as_ref()
    }

    /// Mutable production state.
    pub fn production_mut(&mut self) -> Option<&mut BuildingProducer> {
        self.production.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ArchetypeRegistry;
    use crate::services::{EnhancementTable, NullDamageSink, StatDeltas};

    fn raider() -> CombatUnit {
        let registry = ArchetypeRegistry::with_defaults();
        CombatUnit::from_archetype(registry.get(UnitKind::Raider).unwrap())
    }

    fn services_with_enhancements() -> ServiceRegistry {
        let mut table = EnhancementTable::default();
        table.per_kind.insert(
            UnitKind::Raider,
            StatDeltas {
                attack_damage: 6,
                ..StatDeltas::default()
            },
        );
        table.talents = StatDeltas {
            max_health: 30,
            ..StatDeltas::default()
        };
        let mut services = ServiceRegistry::new();
        services.set_modifiers(Box::new(table));
        services
    }

    #[test]
    fn test_activation_applies_modifiers_once() {
        let services = services_with_enhancements();
        let mut unit = raider();
        let base_damage = unit.base_stats().attack_damage;

        unit.activate(Vec2Fx::ZERO, &services);
        assert_eq!(unit.live_stats().attack_damage, base_damage + 6);
        assert_eq!(unit.health().max, unit.base_stats().max_health + 30);

        // Double activation without a check-in is a no-op.
        unit.activate(Vec2Fx::ZERO, &services);
        assert_eq!(unit.live_stats().attack_damage, base_damage + 6);
        assert_eq!(unit.health().max, unit.base_stats().max_health + 30);
    }

    #[test]
    fn test_reactivation_after_deactivate_skips_modifiers() {
        let services = services_with_enhancements();
        let mut unit = raider();
        let base_damage = unit.base_stats().attack_damage;

        unit.activate(Vec2Fx::ZERO, &services);
        unit.deactivate();
        unit.activate(Vec2Fx::ZERO, &services);
        // Guard survives deactivation; only check-in clears it.
        assert_eq!(unit.live_stats().attack_damage, base_damage + 6);
    }

    #[test]
    fn test_checkin_reverts_and_rearms_modifiers() {
        let services = services_with_enhancements();
        let mut unit = raider();
        let base_damage = unit.base_stats().attack_damage;

        unit.activate(Vec2Fx::ZERO, &services);
        unit.reset_for_checkin();
        assert_eq!(unit.live_stats().attack_damage, base_damage);

        unit.activate(Vec2Fx::ZERO, &services);
        assert_eq!(unit.live_stats().attack_damage, base_damage + 6);
    }

    #[test]
    fn test_activation_primes_first_attack() {
        let services = ServiceRegistry::new();
        let mut unit = raider();
        unit.activate(Vec2Fx::ZERO, &services);
        assert!(unit.cooldown_ticks >= unit.live_stats().attack_interval_ticks);
        assert_eq!(unit.state(), ActionState::Idle);
        assert!(unit.is_alive());
    }

    #[test]
    fn test_lethal_damage_freezes_immediately() {
        let services = ServiceRegistry::new();
        let combat = CombatTuning::default();
        let mut sink = NullDamageSink;
        let mut unit = raider();
        unit.activate(Vec2Fx::ZERO, &services);
        unit.order_move(Vec2Fx::new(Fx::from_num(500), Fx::from_num(0)));

        let max = unit.health().max;
        let dealt = unit.take_damage(max + 50, &mut sink, &combat);
        assert_eq!(dealt, max);
        assert!(unit.is_destroyed());
        assert!(!unit.is_alive());
        assert!(matches!(unit.state(), ActionState::Dying { .. }));
        assert_eq!(unit.target(), None);
        assert_eq!(unit.manual_move(), None);

        // Frozen: further damage is a no-op.
        assert_eq!(unit.take_damage(100, &mut sink, &combat), 0);
    }

    #[test]
    fn test_nonlethal_damage_plays_hit_overlay() {
        let services = ServiceRegistry::new();
        let combat = CombatTuning::default();
        let mut sink = NullDamageSink;
        let mut unit = raider();
        unit.activate(Vec2Fx::ZERO, &services);

        unit.take_damage(10, &mut sink, &combat);
        assert!(!unit.is_destroyed());
        assert_eq!(unit.anim.clip(), crate::animation::AnimClip::Hit);
    }

    #[test]
    fn test_defend_anchor_follows_toggle() {
        let services = ServiceRegistry::new();
        let mut unit = raider();
        unit.activate(Vec2Fx::new(Fx::from_num(40), Fx::from_num(50)), &services);

        unit.set_defending(true);
        assert!(unit.is_defending());
        assert!(unit.snapshot().is_defending);
        unit.set_defending(false);
        assert!(!unit.is_defending());
    }

    #[test]
    fn test_snapshot_reflects_live_stats() {
        let services = services_with_enhancements();
        let mut unit = raider();
        unit.activate(Vec2Fx::ZERO, &services);

        let snapshot = unit.snapshot();
        assert_eq!(snapshot.kind, UnitKind::Raider);
        assert_eq!(snapshot.attack_damage, unit.live_stats().attack_damage);
        assert_eq!(snapshot.max_health, unit.health().max);
        assert_eq!(snapshot.level, 1);
    }

    #[test]
    fn test_structures_refuse_move_orders() {
        let registry = ArchetypeRegistry::with_defaults();
        let services = ServiceRegistry::new();
        let mut tower = CombatUnit::from_archetype(registry.get(UnitKind::Tower).unwrap());
        tower.activate(Vec2Fx::ZERO, &services);
        tower.order_move(Vec2Fx::new(Fx::from_num(100), Fx::from_num(100)));
        assert_eq!(tower.manual_move(), None);
    }
}
