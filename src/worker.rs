use crate::account::{Account, Amount};
use crate::delay::DelayStrategy;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// One unit of concurrent execution, driving repeated withdrawals against a
/// shared account.
///
/// A worker holds no state of its own beyond its spec: its effects are fully
/// observable through the account's event log and balance.
pub struct Worker {
    account: Arc<Account>,
    requester_id: String,
    amount_per_attempt: Amount,
    attempt_count: u32,
    delay: Arc<dyn DelayStrategy>,
    stop: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        account: Arc<Account>,
        requester_id: String,
        amount_per_attempt: Amount,
        attempt_count: u32,
        delay: Arc<dyn DelayStrategy>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            account,
            requester_id,
            amount_per_attempt,
            attempt_count,
            delay,
            stop,
        }
    }

    /// Issues exactly `attempt_count` withdrawal attempts with a jittered
    /// pause between them.
    ///
    /// A stop request is honored only at delay boundaries: an in-flight
    /// withdrawal always completes and records its outcome, then the loop
    /// exits cleanly at the next checkpoint.
    pub async fn run(mut self) {
        for attempt in 0..self.attempt_count {
            if *self.stop.borrow() {
                info!(worker = %self.requester_id, attempt, "stop requested, ending early");
                return;
            }

            self.account
                .withdraw(self.amount_per_attempt, &self.requester_id)
                .await;

            if attempt + 1 == self.attempt_count {
                break;
            }

            // The pause reshuffles interleavings; it is not a fix for the
            // race and must stay interruptible by the stop signal.
            tokio::select! {
                changed = self.stop.changed() => {
                    match changed {
                        Ok(()) if *self.stop.borrow() => {
                            info!(worker = %self.requester_id, attempt, "stop requested, ending early");
                            return;
                        }
                        // Sender gone or value unchanged: keep pausing.
                        _ => self.delay.attempt_pause().await,
                    }
                }
                _ = self.delay.attempt_pause() => {}
            }
        }

        debug!(worker = %self.requester_id, "completed all attempts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SyncMode;
    use crate::delay::NoDelay;

    fn account(balance: i64) -> Arc<Account> {
        Arc::new(Account::new(balance, SyncMode::Guarded, Arc::new(NoDelay)))
    }

    #[tokio::test]
    async fn test_worker_runs_all_attempts() {
        let account = account(100);
        let (_tx, rx) = watch::channel(false);
        let worker = Worker::new(
            account.clone(),
            "alice".to_string(),
            Amount::new(10).unwrap(),
            5,
            Arc::new(NoDelay),
            rx,
        );

        worker.run().await;

        assert_eq!(account.events().await.len(), 5);
        assert_eq!(account.balance(), 50);
    }

    #[tokio::test]
    async fn test_worker_keeps_attempting_after_rejection() {
        let account = account(15);
        let (_tx, rx) = watch::channel(false);
        let worker = Worker::new(
            account.clone(),
            "alice".to_string(),
            Amount::new(10).unwrap(),
            3,
            Arc::new(NoDelay),
            rx,
        );

        worker.run().await;

        let events = account.events().await;
        assert_eq!(events.len(), 3);
        assert_eq!(events.iter().filter(|e| e.succeeded).count(), 1);
        assert_eq!(account.balance(), 5);
    }

    #[tokio::test]
    async fn test_worker_honors_stop_before_first_attempt() {
        let account = account(100);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let worker = Worker::new(
            account.clone(),
            "alice".to_string(),
            Amount::new(10).unwrap(),
            5,
            Arc::new(NoDelay),
            rx,
        );

        worker.run().await;

        assert!(account.events().await.is_empty());
        assert_eq!(account.balance(), 100);
    }
}
