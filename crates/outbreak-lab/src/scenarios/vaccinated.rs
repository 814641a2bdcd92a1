//! Scenario 3: Vaccinated
//!
//! The same team, now cautious, with the combined defense: the active
//! safety protocol in every system prompt plus the active vaccine in every
//! memory. The targeted specialist refuses the attack and warns the
//! coordinator, so nothing reaches the executor.

use outbreak_contracts::{
    agent::AgentId, config::SimConfig, defense::DefenseMode, error::OutbreakResult,
    outcome::Outcome,
};

use crate::roster::COORDINATOR;

use super::{run_and_report, Scenario};

pub(crate) fn configure(config: SimConfig) -> SimConfig {
    SimConfig {
        defense_mode: DefenseMode::Combined,
        ..config
    }
}

/// Run Scenario 3: Vaccinated.
pub async fn run_scenario() -> OutbreakResult<Outcome> {
    println!("=== Scenario 3: Vaccinated (cautious team, combined defense) ===");
    println!();

    let (outcome, log) =
        run_and_report(Scenario::Vaccinated, Scenario::Vaccinated.default_config()).await?;

    let coordinator = AgentId::new(COORDINATOR);
    let warnings = log
        .messages()
        .iter()
        .filter(|m| m.receiver.as_ref() == Some(&coordinator) && m.content.starts_with("WARNING"))
        .count();
    println!("  Warnings to {}:       {}", COORDINATOR, warnings);
    println!();

    println!("  Scenario 3 complete.");
    println!();
    Ok(outcome)
}
