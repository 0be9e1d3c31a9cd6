//! # Siege Headless
//!
//! Runs battles without graphics for balance testing and CI:
//! - RON scenario files describing the starting layout
//! - Full-speed simulation to a tick limit or decisive outcome
//! - JSON match reports on stdout

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod runner;
pub mod scenario;

pub use runner::{MatchOutcome, MatchReport, MatchRunner};
pub use scenario::{Scenario, ScenarioError};
