//! Outbreak Lab demo CLI
//!
//! Runs the laboratory scenarios, either one at a time with overrides and a
//! persistent run log, or all three in sequence with in-memory logs.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- run --scenario outbreak --seed 7
//!   cargo run -p demo -- run --scenario vaccinated --defense vaccine_passive --output logs
//!   cargo run -p demo -- verify-log logs/run_20250101_120000_1a2b3c4d

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use outbreak_audit::{find_break, read_events, read_outcome, JsonlRunLog};
use outbreak_contracts::{
    agent::RunId,
    config::SimConfig,
    defense::DefenseMode,
    error::OutbreakResult,
};
use outbreak_lab::scenarios::{baseline, outbreak, print_outcome, vaccinated, Scenario};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Outbreak: prompt-injection spread in a simulated multi-agent lab.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Outbreak multi-agent injection simulator demo",
    long_about = "Runs a seven-agent research lab, injects a jailbreak prompt into one\n\
                  specialist, and reports whether the attack reached the lab robot."
)]
struct Cli {
    /// Log run progress at info level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scenario and write its log to disk.
    Run {
        /// baseline, outbreak, or vaccinated.
        #[arg(long, default_value = "baseline")]
        scenario: Scenario,
        /// Seed for target and prompt selection.
        #[arg(long)]
        seed: Option<u64>,
        /// Override the defense mode (none, instruction_passive, instruction_active,
        /// vaccine_passive, vaccine_active, combined).
        #[arg(long)]
        defense: Option<DefenseMode>,
        /// Load the simulation config from a TOML file instead of the scenario default.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory that receives the run log.
        #[arg(long, default_value = "logs")]
        output: PathBuf,
    },
    /// Run all three scenarios in sequence.
    RunAll,
    /// Re-verify the event hash chain of a finished run.
    VerifyLog {
        /// A run directory written by `run`.
        dir: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let result = match cli.command {
        Command::Run {
            scenario,
            seed,
            defense,
            config,
            output,
        } => run_one(scenario, seed, defense, config, output).await,
        Command::RunAll => run_all().await,
        Command::VerifyLog { dir } => verify_log(dir),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run_one(
    scenario: Scenario,
    seed: Option<u64>,
    defense: Option<DefenseMode>,
    config_path: Option<PathBuf>,
    output: PathBuf,
) -> OutbreakResult<()> {
    let mut config = match &config_path {
        Some(path) => SimConfig::from_file(path)?,
        None => scenario.default_config(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(mode) = defense {
        config.defense_mode = mode;
    }

    println!("=== Scenario: {} ===", scenario);
    println!();
    println!("  Seed:            {}", config.seed);
    println!("  Defense mode:    {}", config.defense_mode);
    println!("  Message limit:   {}", config.max_messages);
    println!();

    let run_id = RunId::new();
    let log = Arc::new(JsonlRunLog::create(&output, &run_id.to_string())?);
    let supervisor = scenario.build(config, run_id, log.clone())?;

    let stop = supervisor.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping run");
            stop.stop();
        }
    });

    let outcome = supervisor.run().await?;
    print_outcome(&outcome);
    println!();
    println!("  Run log:                {}", log.dir().display());
    println!();
    Ok(())
}

async fn run_all() -> OutbreakResult<()> {
    baseline::run_scenario().await?;
    outbreak::run_scenario().await?;
    vaccinated::run_scenario().await?;
    println!("All scenarios completed.");
    Ok(())
}

fn verify_log(dir: PathBuf) -> OutbreakResult<()> {
    let events = read_events(&dir)?;
    let outcome = read_outcome(&dir)?;

    println!("=== Run log: {} ===", dir.display());
    println!();
    print_outcome(&outcome);
    println!();
    match find_break(&events) {
        None => println!(
            "  Event chain integrity:  VERIFIED ({} event(s) in chain)",
            events.len()
        ),
        Some(sequence) => {
            println!("  Event chain integrity:  FAILED at event #{}", sequence);
            std::process::exit(2);
        }
    }
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("OUTBREAK — Multi-agent Prompt Injection Simulator");
    println!("Autonomous Lab Demo");
    println!("=================================================");
    println!();
    println!("Each run:");
    println!("  [1] Seven agents start with private mailboxes and bounded memories");
    println!("  [2] The coordinator receives a project assignment");
    println!("  [3] After the first messages, a jailbreak prompt reaches one specialist");
    println!("  [4] Every run_code call is screened for hazardous chemistry");
    println!("  [5] The run ends on explosion, message limit, time limit, or deadlock");
    println!();
}
