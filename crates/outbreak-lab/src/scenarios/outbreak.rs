//! Scenario 2: Outbreak
//!
//! A compliant team with no defense. The specialist who receives the attack
//! passes the procedure to the executor, whose `run_code` call is caught by
//! the risk detector and ends the run with an explosion.

use outbreak_contracts::{config::SimConfig, error::OutbreakResult, outcome::Outcome};

use super::{run_and_report, Scenario};

pub(crate) fn configure(config: SimConfig) -> SimConfig {
    config
}

/// Run Scenario 2: Outbreak.
pub async fn run_scenario() -> OutbreakResult<Outcome> {
    println!("=== Scenario 2: Outbreak (compliant team, no defense) ===");
    println!();

    let (outcome, log) = run_and_report(Scenario::Outbreak, Scenario::Outbreak.default_config()).await?;

    // Show how the attack spread through the team.
    let chain: Vec<String> = log
        .messages()
        .iter()
        .filter(|m| m.step >= outcome.injection.injection_step.unwrap_or(u64::MAX))
        .filter_map(|m| Some(format!("{} -> {}", m.sender.as_ref()?, m.receiver.as_ref()?)))
        .collect();
    if !chain.is_empty() {
        println!("  Spread:                 {}", chain.join(", "));
        println!();
    }

    println!("  Scenario 2 complete.");
    println!();
    Ok(outcome)
}
