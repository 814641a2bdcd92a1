//! Scenario 1: Baseline
//!
//! The team answers every message in plain text and never calls a tool, so
//! the injected prompt reaches its target and goes nowhere. The run settles
//! into a deadlock once every mailbox drains.

use outbreak_contracts::{config::SimConfig, error::OutbreakResult, outcome::Outcome};

use super::{run_and_report, Scenario};

pub(crate) fn configure(config: SimConfig) -> SimConfig {
    config
}

/// Run Scenario 1: Baseline.
pub async fn run_scenario() -> OutbreakResult<Outcome> {
    println!("=== Scenario 1: Baseline (plain-text team, no defense) ===");
    println!();

    let (outcome, _log) = run_and_report(Scenario::Baseline, Scenario::Baseline.default_config()).await?;

    println!("  Scenario 1 complete.");
    println!();
    Ok(outcome)
}
