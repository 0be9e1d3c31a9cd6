//! Headless battle runner.
//!
//! Runs Crystal Siege battles without graphics, printing JSON match
//! reports to stdout. Designed for balance testing and CI.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario to its outcome
//! cargo run -p siege_headless -- run --scenario scenarios/skirmish.ron
//!
//! # Pretty-print the report
//! cargo run -p siege_headless -- run --scenario scenarios/skirmish.ron --pretty
//!
//! # Check a scenario file without running it
//! cargo run -p siege_headless -- validate --scenario scenarios/skirmish.ron
//! ```
//!
//! Output (stdout): one JSON match report.
//! Logs (stderr): tracing output, `RUST_LOG` respected.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use siege_headless::{MatchRunner, Scenario};

#[derive(Parser)]
#[command(name = "siege_headless")]
#[command(about = "Headless Crystal Siege runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print its match report
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override the scenario's tick limit
        #[arg(long)]
        ticks: Option<u64>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// Parse and build a scenario without running it
    Validate {
        /// Scenario file to check
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            scenario,
            ticks,
            pretty,
        } => {
            let mut scenario = Scenario::load(&scenario)?;
            if let Some(ticks) = ticks {
                scenario.duration_ticks = ticks;
            }
            let report = MatchRunner::new(&scenario)?.run();
            let json = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{json}");
        }
        Commands::Validate { scenario } => {
            let scenario = Scenario::load(&scenario)?;
            let battle = scenario.build()?;
            tracing::info!(
                name = %scenario.name,
                units = battle.units().len(),
                "scenario is valid"
            );
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli.command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
