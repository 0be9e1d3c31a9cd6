//! External collaborator services and the composition-root registry.
//!
//! The original engine reached these collaborators through global
//! singletons looked up from anywhere. Here every collaborator is a
//! narrow trait behind an explicitly constructed [`ServiceRegistry`]
//! owned by the battle; units receive the registry during activation and
//! update, never hold their own copies, and degrade gracefully when a
//! collaborator is a stub.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::math::{fx_serde, Fx};
use crate::stats::{UnitKind, UnitStats};

// ============================================================================
// Game Director
// ============================================================================

/// Coarse game phase as reported by the match owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// Pre-match setup.
    Ready,
    /// Simulation running.
    Playing,
    /// Defenders won.
    Victory,
    /// Defenders lost.
    Defeat,
    /// Paused mid-match.
    Paused,
}

/// Reports the current game phase.
///
/// The core fully suspends seeking, movement and attacks while the phase
/// is anything but [`GamePhase::Playing`], and resumes transparently.
pub trait GameDirector {
    /// Current phase.
    fn phase(&self) -> GamePhase;
}

/// Director pinned to a single phase. The default for tests and benches.
#[derive(Debug, Clone, Copy)]
pub struct FixedDirector(pub GamePhase);

impl GameDirector for FixedDirector {
    fn phase(&self) -> GamePhase {
        self.0
    }
}

/// Director whose phase can be flipped from outside the battle while the
/// battle holds the service. Clones share one phase cell.
#[derive(Debug, Clone)]
pub struct SharedPhase(Rc<std::cell::Cell<GamePhase>>);

impl SharedPhase {
    /// Create a shared phase starting in the given state.
    #[must_use]
    pub fn new(phase: GamePhase) -> Self {
        Self(Rc::new(std::cell::Cell::new(phase)))
    }

    /// Set the phase.
    pub fn set(&self, phase: GamePhase) {
        self.0.set(phase);
    }
}

impl GameDirector for SharedPhase {
    fn phase(&self) -> GamePhase {
        self.0.get()
    }
}

// ============================================================================
// Damage Sink
// ============================================================================

/// Receives damage/heal contributions for later display.
///
/// Fire-and-forget: implementations must never fail in a way that affects
/// the simulation, and the core ignores everything they do.
pub trait DamageSink {
    /// Record damage dealt by a unit.
    fn record_damage(&mut self, kind: UnitKind, name: &str, amount: u32);
    /// Record damage suffered by a unit.
    fn record_damage_taken(&mut self, kind: UnitKind, name: &str, amount: u32);
    /// Record healing performed on a unit.
    fn record_heal(&mut self, kind: UnitKind, name: &str, amount: u32);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDamageSink;

impl DamageSink for NullDamageSink {
    fn record_damage(&mut self, _kind: UnitKind, _name: &str, _amount: u32) {}
    fn record_damage_taken(&mut self, _kind: UnitKind, _name: &str, _amount: u32) {}
    fn record_heal(&mut self, _kind: UnitKind, _name: &str, _amount: u32) {}
}

/// Accumulated contribution totals per unit name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributionTotals {
    /// Damage dealt, keyed by display name.
    pub damage_dealt: HashMap<String, u64>,
    /// Damage suffered, keyed by display name.
    pub damage_taken: HashMap<String, u64>,
    /// Healing performed, keyed by display name.
    pub healing: HashMap<String, u64>,
}

/// Recording sink backing the damage-statistics panel.
///
/// The totals live behind a shared cell so the owner of the panel can keep
/// a reader while the battle owns the sink itself.
#[derive(Debug, Clone, Default)]
pub struct DamageLog {
    totals: Rc<RefCell<ContributionTotals>>,
}

impl DamageLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared reader for the accumulated totals.
    #[must_use]
    pub fn totals(&self) -> Rc<RefCell<ContributionTotals>> {
        Rc::clone(&self.totals)
    }
}

impl DamageSink for DamageLog {
    fn record_damage(&mut self, _kind: UnitKind, name: &str, amount: u32) {
        *self
            .totals
            .borrow_mut()
            .damage_dealt
            .entry(name.to_string())
            .or_default() += u64::from(amount);
    }

    fn record_damage_taken(&mut self, _kind: UnitKind, name: &str, amount: u32) {
        *self
            .totals
            .borrow_mut()
            .damage_taken
            .entry(name.to_string())
            .or_default() += u64::from(amount);
    }

    fn record_heal(&mut self, _kind: UnitKind, name: &str, amount: u32) {
        *self
            .totals
            .borrow_mut()
            .healing
            .entry(name.to_string())
            .or_default() += u64::from(amount);
    }
}

// ============================================================================
// Stat Modifier Pipeline
// ============================================================================

/// Flat stat adjustments applied on top of a pristine sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatDeltas {
    /// Added to maximum health.
    #[serde(default)]
    pub max_health: i32,
    /// Added to attack damage.
    #[serde(default)]
    pub attack_damage: i32,
    /// Added to attack range.
    #[serde(default, with = "fx_serde")]
    pub attack_range: Fx,
    /// Added to move speed.
    #[serde(default, with = "fx_serde")]
    pub move_speed: Fx,
}

impl StatDeltas {
    /// Apply the deltas to a live stat sheet, clamping at sane floors.
    pub fn apply(&self, stats: &mut UnitStats) {
        stats.max_health = add_clamped(stats.max_health, self.max_health, 1);
        stats.attack_damage = add_clamped(stats.attack_damage, self.attack_damage, 0);
        stats.attack_range = (stats.attack_range + self.attack_range).max(Fx::ZERO);
        stats.move_speed = (stats.move_speed + self.move_speed).max(Fx::ZERO);
    }
}

fn add_clamped(base: u32, delta: i32, floor: u32) -> u32 {
    let value = i64::from(base) + i64::from(delta);
    u32::try_from(value.max(i64::from(floor))).unwrap_or(u32::MAX)
}

/// Applies enhancement-card and talent stat deltas on activation.
///
/// The core calls [`apply_unit_enhancements`](Self::apply_unit_enhancements)
/// first and [`apply_talent_effects`](Self::apply_talent_effects) second,
/// exactly once per activation (guarded by the unit's one-shot flag).
pub trait StatModifierPipeline {
    /// Apply per-kind enhancement deltas.
    fn apply_unit_enhancements(&self, kind: UnitKind, stats: &mut UnitStats);
    /// Apply account-wide talent deltas.
    fn apply_talent_effects(&self, stats: &mut UnitStats);
}

/// Pipeline with no effects. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModifiers;

impl StatModifierPipeline for NoModifiers {
    fn apply_unit_enhancements(&self, _kind: UnitKind, _stats: &mut UnitStats) {}
    fn apply_talent_effects(&self, _stats: &mut UnitStats) {}
}

/// Table-driven pipeline: per-kind enhancement deltas plus one talent row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnhancementTable {
    /// Enhancement deltas per unit kind.
    #[serde(default)]
    pub per_kind: HashMap<UnitKind, StatDeltas>,
    /// Talent deltas applied to every unit.
    #[serde(default)]
    pub talents: StatDeltas,
}

impl StatModifierPipeline for EnhancementTable {
    fn apply_unit_enhancements(&self, kind: UnitKind, stats: &mut UnitStats) {
        if let Some(deltas) = self.per_kind.get(&kind) {
            deltas.apply(stats);
        }
    }

    fn apply_talent_effects(&self, stats: &mut UnitStats) {
        self.talents.apply(stats);
    }
}

// ============================================================================
// Resource Ledger
// ============================================================================

/// Spendable resource balance used by production buildings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceLedger {
    balance: u32,
}

impl ResourceLedger {
    /// Create a ledger with a starting balance.
    #[must_use]
    pub const fn new(balance: u32) -> Self {
        Self { balance }
    }

    /// Current balance.
    #[must_use]
    pub const fn balance(&self) -> u32 {
        self.balance
    }

    /// Add to the balance.
    pub fn deposit(&mut self, amount: u32) {
        self.balance = self.balance.saturating_add(amount);
    }

    /// Charge a cost if affordable. Returns whether the charge happened.
    pub fn try_charge(&mut self, cost: u32) -> bool {
        if self.balance >= cost {
            self.balance -= cost;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Composition root for all collaborator services.
///
/// Constructed once by the battle owner. Replacing a service bumps the
/// epoch; units compare their activation-time epoch against it to decide
/// whether their collaborator links are still current (scene changes swap
/// services out from under pooled units).
pub struct ServiceRegistry {
    epoch: u64,
    director: Box<dyn GameDirector>,
    damage_sink: Box<dyn DamageSink>,
    modifiers: Box<dyn StatModifierPipeline>,
    resources: ResourceLedger,
}

impl ServiceRegistry {
    /// Registry with stub services: always Playing, no stat modifiers,
    /// damage records dropped, empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: 1,
            director: Box::new(FixedDirector(GamePhase::Playing)),
            damage_sink: Box::new(NullDamageSink),
            modifiers: Box::new(NoModifiers),
            resources: ResourceLedger::default(),
        }
    }

    /// Current service epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Current game phase.
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.director.phase()
    }

    /// The damage sink.
    pub fn damage_sink(&mut self) -> &mut dyn DamageSink {
        self.damage_sink.as_mut()
    }

    /// The stat-modifier pipeline.
    #[must_use]
    pub fn modifiers(&self) -> &dyn StatModifierPipeline {
        self.modifiers.as_ref()
    }

    /// The resource ledger.
    pub fn resources(&mut self) -> &mut ResourceLedger {
        &mut self.resources
    }

    /// Read-only resource ledger.
    #[must_use]
    pub fn resources_ref(&self) -> &ResourceLedger {
        &self.resources
    }

    /// Replace the game director. Bumps the epoch.
    pub fn set_director(&mut self, director: Box<dyn GameDirector>) {
        self.director = director;
        self.epoch += 1;
    }

    /// Replace the damage sink. Bumps the epoch.
    pub fn set_damage_sink(&mut self, sink: Box<dyn DamageSink>) {
        self.damage_sink = sink;
        self.epoch += 1;
    }

    /// Replace the stat-modifier pipeline. Bumps the epoch.
    pub fn set_modifiers(&mut self, modifiers: Box<dyn StatModifierPipeline>) {
        self.modifiers = modifiers;
        self.epoch += 1;
    }

    /// Replace the resource ledger without bumping the epoch (the ledger
    /// is data, not a collaborator link).
    pub fn set_resources(&mut self, resources: ResourceLedger) {
        self.resources = resources;
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("epoch", &self.epoch)
            .field("phase", &self.director.phase())
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_phase_flips() {
        let phase = SharedPhase::new(GamePhase::Playing);
        let mut registry = ServiceRegistry::new();
        registry.set_director(Box::new(phase.clone()));

        assert_eq!(registry.phase(), GamePhase::Playing);
        phase.set(GamePhase::Paused);
        assert_eq!(registry.phase(), GamePhase::Paused);
    }

    #[test]
    fn test_epoch_bumps_on_replacement() {
        let mut registry = ServiceRegistry::new();
        let before = registry.epoch();
        registry.set_damage_sink(Box::new(DamageLog::new()));
        assert_eq!(registry.epoch(), before + 1);
    }

    #[test]
    fn test_damage_log_accumulates() {
        let log = DamageLog::new();
        let totals = log.totals();
        let mut sink: Box<dyn DamageSink> = Box::new(log);

        sink.record_damage(UnitKind::Raider, "Raider", 10);
        sink.record_damage(UnitKind::Raider, "Raider", 5);
        sink.record_heal(UnitKind::Crystal, "Crystal", 3);

        let totals = totals.borrow();
        assert_eq!(totals.damage_dealt.get("Raider"), Some(&15));
        assert_eq!(totals.healing.get("Crystal"), Some(&3));
    }

    #[test]
    fn test_stat_deltas_clamp() {
        let mut stats = crate::stats::UnitStats::fighter(
            100,
            10,
            20,
            Fx::from_num(50),
            Fx::from_num(3),
            Fx::from_num(20),
        );
        let deltas = StatDeltas {
            max_health: -500,
            attack_damage: -500,
            ..StatDeltas::default()
        };
        deltas.apply(&mut stats);
        assert_eq!(stats.max_health, 1);
        assert_eq!(stats.attack_damage, 0);
    }

    #[test]
    fn test_ledger_charge() {
        let mut ledger = ResourceLedger::new(30);
        assert!(ledger.try_charge(25));
        assert!(!ledger.try_charge(25));
        assert_eq!(ledger.balance(), 5);
    }
}
