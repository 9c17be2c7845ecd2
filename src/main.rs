use atm_sim::account::SyncMode;
use atm_sim::config::SimulationConfig;
use atm_sim::delay::SleepDelay;
use atm_sim::orchestrator::{Orchestrator, SimulationResult};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Demonstrates the lost-update race: many concurrent withdrawals against
/// one shared account, unguarded or guarded.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON simulation config. Defaults to the classic five-worker roster
    /// against a balance of 1000.
    config: Option<PathBuf>,

    /// Override the synchronization mode.
    #[arg(long, value_enum)]
    mode: Option<SyncMode>,

    /// Override the starting balance.
    #[arg(long)]
    starting_balance: Option<i64>,

    /// Simulated fraud-check latency per withdrawal, in milliseconds.
    #[arg(long, default_value_t = 50)]
    processing_delay_ms: u64,

    /// Pause between the balance check and the write-back, in milliseconds.
    #[arg(long, default_value_t = 50)]
    commit_delay_ms: u64,

    /// Base pause between a worker's attempts, in milliseconds.
    #[arg(long, default_value_t = 1)]
    inter_attempt_ms: u64,

    /// Random jitter added on top of the inter-attempt pause, in
    /// milliseconds. Reshuffles timing only; not a fix.
    #[arg(long, default_value_t = 1)]
    jitter_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            SimulationConfig::from_json(file).into_diagnostic()?
        }
        None => SimulationConfig::classic_demo(SyncMode::Unguarded),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(balance) = cli.starting_balance {
        config.starting_balance = balance;
    }
    // Overrides can invalidate a config that parsed fine.
    config.validate().into_diagnostic()?;

    let delay = Arc::new(SleepDelay {
        processing: Duration::from_millis(cli.processing_delay_ms),
        commit: Duration::from_millis(cli.commit_delay_ms),
        inter_attempt: Duration::from_millis(cli.inter_attempt_ms),
        jitter: Duration::from_millis(cli.jitter_ms),
    });

    let starting_balance = config.starting_balance;
    println!(
        "=== Starting {:?} run with balance = ${} ===",
        config.mode, starting_balance
    );

    let result = Orchestrator::new(config, delay)
        .into_diagnostic()?
        .run()
        .await
        .into_diagnostic()?;

    report(starting_balance, &result);
    Ok(())
}

fn report(starting_balance: i64, result: &SimulationResult) {
    for event in &result.events {
        if event.succeeded {
            println!(
                "{} withdrew ${} | old balance = {} -> new balance = {}",
                event.requester_id, event.amount_requested, event.balance_before, event.balance_after
            );
        } else {
            println!(
                "{} tried to withdraw ${} but INSUFFICIENT FUNDS (current balance = {})",
                event.requester_id, event.amount_requested, event.balance_before
            );
        }
    }

    let successful: i64 = result
        .events
        .iter()
        .filter(|e| e.succeeded)
        .map(|e| e.amount_requested)
        .sum();

    println!("\n=== All withdrawals finished ===");
    println!("Successful withdrawals total: ${successful}");
    println!(
        "Expected final balance: ${}",
        starting_balance - successful
    );
    println!("Actual final balance:   ${}", result.final_balance);
    println!("Elapsed: {:.2?}", result.elapsed);
}
