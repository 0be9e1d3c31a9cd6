//! RON scenario files.
//!
//! A scenario describes the starting layout of a battle in
//! human-editable terms (plain integer coordinates, no fixed-point
//! bits) and builds a ready-to-run [`Battle`] against the shipped
//! default archetypes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use siege_core::prelude::*;

/// Errors from scenario loading and building.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Scenario file could not be read.
    #[error("Failed to read scenario '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Scenario file could not be parsed.
    #[error("Failed to parse scenario '{path}': {message}")]
    Parse {
        /// Path that failed.
        path: String,
        /// Parser message.
        message: String,
    },

    /// The core rejected part of the scenario.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Production attached to a placed building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionSpec {
    /// Kind of unit to produce.
    pub produces: UnitKind,
    /// Ticks between productions.
    pub interval_ticks: u32,
    /// Units produced before costs apply.
    #[serde(default)]
    pub free_units: u32,
    /// Resource cost per unit past the allowance.
    #[serde(default)]
    pub unit_cost: u32,
    /// Live-unit cap for this producer.
    pub population_cap: usize,
    /// Spawn offset from the building, in world units.
    pub spawn_offset: (i32, i32),
    /// Rally point the produced units move toward.
    #[serde(default)]
    pub rally: Option<(i32, i32)>,
}

/// One unit (or a row of them) placed at battle start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    /// Kind to place.
    pub kind: UnitKind,
    /// Position of the first unit.
    pub position: (i32, i32),
    /// Number of units, spaced along +x via placement probing.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Whether the units start in the defend stance.
    #[serde(default)]
    pub defending: bool,
    /// March order issued at spawn. Scripted waves use this to advance
    /// on the crystal until target acquisition takes over.
    #[serde(default)]
    pub move_to: Option<(i32, i32)>,
    /// Production state, for buildings.
    #[serde(default)]
    pub production: Option<ProductionSpec>,
}

fn default_count() -> u32 {
    1
}

/// A complete battle setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, echoed in reports.
    pub name: String,
    /// Tick limit before the match is called a draw.
    pub duration_ticks: u64,
    /// Starting resource balance.
    #[serde(default)]
    pub starting_resources: u32,
    /// Battle configuration overrides.
    #[serde(default)]
    pub config: BattleConfig,
    /// Starting units.
    pub placements: Vec<Placement>,
}

impl Scenario {
    /// Parse a scenario from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Parse`] on malformed input.
    pub fn from_ron(source: &str, origin: &str) -> std::result::Result<Self, ScenarioError> {
        ron::de::from_str(source).map_err(|e| ScenarioError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load a scenario from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Io`] or [`ScenarioError::Parse`].
    pub fn load(path: &Path) -> std::result::Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron(&text, &path.display().to_string())
    }

    /// Build a battle from this scenario with a recording damage log.
    ///
    /// # Errors
    ///
    /// Returns an error when a placement names a kind with no archetype.
    pub fn build(&self) -> std::result::Result<Battle, ScenarioError> {
        self.build_with_sink(Box::new(DamageLog::new()))
    }

    /// Build a battle from this scenario with the given damage sink.
    ///
    /// # Errors
    ///
    /// Returns an error when a placement names a kind with no archetype.
    pub fn build_with_sink(
        &self,
        sink: Box<dyn DamageSink>,
    ) -> std::result::Result<Battle, ScenarioError> {
        let mut services = ServiceRegistry::new();
        services.set_resources(ResourceLedger::new(self.starting_resources));
        services.set_damage_sink(sink);

        let mut battle = Battle::new(
            self.config.clone(),
            ArchetypeRegistry::with_defaults(),
            services,
        );

        for placement in &self.placements {
            let (x, y) = placement.position;
            let nominal = Vec2Fx::new(Fx::from_num(x), Fx::from_num(y));
            for _ in 0..placement.count {
                let handle = battle.spawn_unit(placement.kind, nominal)?;
                if placement.defending {
                    battle.set_defending(handle, true)?;
                }
                if let Some((mx, my)) = placement.move_to {
                    battle.issue_move(
                        handle,
                        Vec2Fx::new(Fx::from_num(mx), Fx::from_num(my)),
                    )?;
                }
                if let Some(spec) = &placement.production {
                    battle.set_production(handle, producer_config(spec))?;
                    if let Some((rx, ry)) = spec.rally {
                        battle.set_rally_point(
                            handle,
                            Some(Vec2Fx::new(Fx::from_num(rx), Fx::from_num(ry))),
                        )?;
                    }
                }
            }
        }

        Ok(battle)
    }
}

fn producer_config(spec: &ProductionSpec) -> ProducerConfig {
    let (ox, oy) = spec.spawn_offset;
    ProducerConfig {
        produces: spec.produces,
        interval_ticks: spec.interval_ticks,
        free_units: spec.free_units,
        unit_cost: spec.unit_cost,
        population_cap: spec.population_cap,
        spawn_offset: Vec2Fx::new(Fx::from_num(ox), Fx::from_num(oy)),
        probe_step: Fx::ZERO,
        probe_rings: 3,
    }
}
