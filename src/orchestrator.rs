use crate::account::{Account, Amount, WithdrawalOutcome};
use crate::config::SimulationConfig;
use crate::delay::DelayStrategy;
use crate::error::Result;
use crate::worker::Worker;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Final observable state of one run, rendered by an external reporter.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub final_balance: i64,
    /// Every attempt's outcome, in completion order.
    pub events: Vec<WithdrawalOutcome>,
    pub elapsed: Duration,
}

/// Cooperative stop signal for an in-flight run.
///
/// Workers observe it only at delay boundaries, so an in-flight withdrawal
/// still completes and records its outcome before the worker exits.
#[derive(Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Composes one account and a roster of workers, runs them concurrently,
/// and surfaces the final state after every worker has finished.
pub struct Orchestrator {
    config: SimulationConfig,
    delay: Arc<dyn DelayStrategy>,
    stop_tx: watch::Sender<bool>,
}

impl Orchestrator {
    /// Validates the configuration eagerly; a bad config never spawns
    /// anything.
    pub fn new(config: SimulationConfig, delay: Arc<dyn DelayStrategy>) -> Result<Self> {
        config.validate()?;
        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            delay,
            stop_tx,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Runs the roster to completion.
    ///
    /// This is a barrier join, not a race to first completion: every
    /// worker's termination is awaited before the final balance and event
    /// log are read, so no background work outlives the run. A worker that
    /// terminated abnormally forfeits only its own remaining attempts.
    pub async fn run(self) -> Result<SimulationResult> {
        let account = Arc::new(Account::new(
            self.config.starting_balance,
            self.config.mode,
            self.delay.clone(),
        ));

        info!(
            mode = ?self.config.mode,
            starting_balance = self.config.starting_balance,
            workers = self.config.workers.len(),
            "starting simulation"
        );
        let started = Instant::now();

        let mut handles = Vec::with_capacity(self.config.workers.len());
        for spec in &self.config.workers {
            let worker = Worker::new(
                account.clone(),
                spec.requester_id.clone(),
                Amount::new(spec.amount_per_attempt)?,
                spec.attempt_count,
                self.delay.clone(),
                self.stop_tx.subscribe(),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker terminated abnormally");
            }
        }

        let elapsed = started.elapsed();
        let result = SimulationResult {
            final_balance: account.balance(),
            events: account.events().await,
            elapsed,
        };

        info!(
            final_balance = result.final_balance,
            events = result.events.len(),
            ?elapsed,
            "simulation finished"
        );
        Ok(result)
    }
}

/// Builds and runs an orchestrator in one call.
pub async fn run_simulation(
    config: SimulationConfig,
    delay: Arc<dyn DelayStrategy>,
) -> Result<SimulationResult> {
    Orchestrator::new(config, delay)?.run().await
}
