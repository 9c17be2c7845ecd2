use crate::delay::DelayStrategy;
use crate::error::SimulationError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// A positive withdrawal amount in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, SimulationError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(SimulationError::InvalidConfig(
                "Withdrawal amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = SimulationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Whether the account arbitrates its check-modify-write sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// No mutual exclusion. Concurrent withdrawals can both pass the balance
    /// check against the same stale snapshot and lose an update.
    Unguarded,
    /// The check-modify-write sequence is serialized account-wide.
    Guarded,
}

/// The record of one withdrawal attempt as that attempt observed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalOutcome {
    pub requester_id: String,
    pub amount_requested: i64,
    pub succeeded: bool,
    pub balance_before: i64,
    pub balance_after: i64,
    /// Monotonic offset from account creation, recorded at completion.
    pub timestamp: Duration,
}

/// The shared account: one mutable balance plus the withdrawal protocol.
///
/// The balance lives in an `AtomicI64` read and written as separate steps,
/// so an unguarded run expresses the classic check-then-act interleaving
/// without undefined behavior. In guarded mode a mutex wraps the whole
/// sequence and restores the conservation invariant.
///
/// The event log is serialized separately in both modes: even when the
/// balance races, outcome records are never dropped or duplicated. Its
/// order is completion order, not a causal order across workers.
pub struct Account {
    balance: AtomicI64,
    mode: SyncMode,
    critical: Mutex<()>,
    log: Mutex<Vec<WithdrawalOutcome>>,
    delay: Arc<dyn DelayStrategy>,
    opened_at: Instant,
}

impl Account {
    pub fn new(starting_balance: i64, mode: SyncMode, delay: Arc<dyn DelayStrategy>) -> Self {
        Self {
            balance: AtomicI64::new(starting_balance),
            mode,
            critical: Mutex::new(()),
            log: Mutex::new(Vec::new()),
            delay,
            opened_at: Instant::now(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Current balance. Consistent in guarded mode; in unguarded mode it may
    /// race with an in-flight write, which is fine for final reporting after
    /// all workers have joined.
    pub fn balance(&self) -> i64 {
        self.balance.load(Ordering::SeqCst)
    }

    /// Attempts one withdrawal and records its outcome.
    ///
    /// The leading processing pause overlaps across callers in both modes.
    /// An insufficient balance is a normal rejected outcome, not an error.
    pub async fn withdraw(&self, amount: Amount, requester_id: &str) -> WithdrawalOutcome {
        // Simulated fraud-check latency, outside any arbitration.
        self.delay.processing_pause().await;

        let (balance_before, balance_after, succeeded) = match self.mode {
            SyncMode::Guarded => {
                let _section = self.critical.lock().await;
                self.check_then_act(amount).await
            }
            SyncMode::Unguarded => self.check_then_act(amount).await,
        };

        let outcome = WithdrawalOutcome {
            requester_id: requester_id.to_string(),
            amount_requested: amount.value(),
            succeeded,
            balance_before,
            balance_after,
            timestamp: self.opened_at.elapsed(),
        };

        debug!(
            requester = %requester_id,
            amount = amount.value(),
            succeeded,
            balance_before,
            balance_after,
            "withdrawal attempt"
        );

        self.log.lock().await.push(outcome.clone());
        outcome
    }

    // The vulnerable sequence: snapshot, check, pause, write back. Two
    // unguarded callers can both snapshot the same balance and each commit
    // a decrement computed from it, losing one of the two.
    async fn check_then_act(&self, amount: Amount) -> (i64, i64, bool) {
        let before = self.balance.load(Ordering::SeqCst);
        if before >= amount.value() {
            self.delay.commit_pause().await;
            let after = before - amount.value();
            self.balance.store(after, Ordering::SeqCst);
            (before, after, true)
        } else {
            (before, before, false)
        }
    }

    /// Snapshot of the event log in completion order.
    pub async fn events(&self) -> Vec<WithdrawalOutcome> {
        self.log.lock().await.clone()
    }
}
