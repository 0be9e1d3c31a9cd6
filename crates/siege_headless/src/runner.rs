//! Match execution and reporting.
//!
//! Runs a scenario battle at full speed until a decisive outcome or the
//! tick limit, collecting the damage log into a machine-readable report.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use siege_core::prelude::*;
use siege_core::services::ContributionTotals;

use crate::scenario::{Scenario, ScenarioError};

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// The crystal fell; raiders win.
    CrystalDestroyed,
    /// Every raider is gone; defenders win.
    RaidersEliminated,
    /// Neither side finished within the tick limit.
    TimeLimit,
}

/// Machine-readable result of one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks actually simulated.
    pub ticks: u64,
    /// Outcome.
    pub outcome: MatchOutcome,
    /// Defender units alive at the end.
    pub defenders_alive: usize,
    /// Raider units alive at the end.
    pub raiders_alive: usize,
    /// Units recycled through the pool during the match.
    pub units_recycled: usize,
    /// Units spawned by production during the match.
    pub units_spawned: usize,
    /// Damage dealt per unit name, as the statistics panel would show.
    pub damage_by_name: BTreeMap<String, u64>,
}

/// Drives one scenario battle to completion.
pub struct MatchRunner {
    battle: Battle,
    name: String,
    duration_ticks: u64,
    totals: Rc<RefCell<ContributionTotals>>,
}

impl MatchRunner {
    /// Build a runner for a scenario.
    ///
    /// # Errors
    ///
    /// Propagates scenario build errors.
    pub fn new(scenario: &Scenario) -> std::result::Result<Self, ScenarioError> {
        let log = DamageLog::new();
        let totals = log.totals();
        let battle = scenario.build_with_sink(Box::new(log))?;
        Ok(Self {
            battle,
            name: scenario.name.clone(),
            duration_ticks: scenario.duration_ticks,
            totals,
        })
    }

    /// Run the match to its outcome.
    #[must_use]
    pub fn run(mut self) -> MatchReport {
        let mut recycled = 0;
        let mut spawned = 0;
        let mut outcome = MatchOutcome::TimeLimit;

        for _ in 0..self.duration_ticks {
            let events = self.battle.tick();
            recycled += events.deaths.len();
            spawned += events.spawned.len();

            if let Some(decided) = self.decide() {
                outcome = decided;
                break;
            }
        }

        let damage_by_name: BTreeMap<String, u64> = self
            .totals
            .borrow()
            .damage_dealt
            .iter()
            .map(|(name, total)| (name.clone(), *total))
            .collect();

        tracing::info!(
            scenario = %self.name,
            ticks = self.battle.current_tick(),
            ?outcome,
            "match finished"
        );

        MatchReport {
            scenario: self.name,
            ticks: self.battle.current_tick(),
            outcome,
            defenders_alive: self.battle.alive_count(Faction::Defenders),
            raiders_alive: self.battle.alive_count(Faction::Raiders),
            units_recycled: recycled,
            units_spawned: spawned,
            damage_by_name,
        }
    }

    fn decide(&self) -> Option<MatchOutcome> {
        let crystal_stands = self
            .battle
            .units()
            .iter()
            .any(|(_, u)| u.kind() == UnitKind::Crystal && u.is_alive());
        if !crystal_stands {
            return Some(MatchOutcome::CrystalDestroyed);
        }
        // Raiders are eliminated only once the last corpse has played out
        // its death animation and left the arena.
        let raiders_remain = self
            .battle
            .units()
            .iter()
            .any(|(_, u)| u.faction() == Faction::Raiders);
        if !raiders_remain {
            return Some(MatchOutcome::RaidersEliminated);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Placement;

    fn tiny_scenario() -> Scenario {
        Scenario {
            name: "tiny".into(),
            duration_ticks: 2000,
            starting_resources: 0,
            config: BattleConfig::default(),
            placements: vec![
                Placement {
                    kind: UnitKind::Crystal,
                    position: (1000, 1500),
                    count: 1,
                    defending: false,
                    move_to: None,
                    production: None,
                },
                Placement {
                    kind: UnitKind::Tower,
                    position: (1000, 1300),
                    count: 2,
                    defending: false,
                    move_to: None,
                    production: None,
                },
                Placement {
                    kind: UnitKind::Raider,
                    position: (1000, 1100), // inside tower range
                    count: 1,
                    defending: false,
                    move_to: None,
                    production: None,
                },
            ],
        }
    }

    #[test]
    fn test_towers_clear_a_lone_raider() {
        let runner = MatchRunner::new(&tiny_scenario()).expect("build");
        let report = runner.run();
        assert_eq!(report.outcome, MatchOutcome::RaidersEliminated);
        assert_eq!(report.raiders_alive, 0);
        assert_eq!(report.units_recycled, 1);
        assert!(report.damage_by_name.contains_key("Arrow Tower"));
    }

    #[test]
    fn test_empty_raider_side_ends_immediately() {
        let mut scenario = tiny_scenario();
        scenario.placements.retain(|p| p.kind != UnitKind::Raider);
        let report = MatchRunner::new(&scenario).expect("build").run();
        assert_eq!(report.outcome, MatchOutcome::RaidersEliminated);
        assert_eq!(report.ticks, 1);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = MatchRunner::new(&tiny_scenario()).expect("build").run();
        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"scenario\":\"tiny\""));
    }
}
