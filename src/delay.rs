use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::sync::Barrier;

/// Injectable pause points for the withdrawal protocol.
///
/// The simulated "fraud check" latency and the worker's inter-attempt pause
/// go through this trait so demos can use real sleeps while tests substitute
/// a deterministic schedule instead of relying on timing luck.
#[async_trait]
pub trait DelayStrategy: Send + Sync {
    /// Pause at the start of a withdrawal, before the balance is read.
    async fn processing_pause(&self);

    /// Pause between the balance check and the write-back. This is the
    /// window the lost-update race lives in.
    async fn commit_pause(&self);

    /// Pause between a worker's consecutive attempts.
    async fn attempt_pause(&self);
}

/// Wall-clock sleeps for realistic demo runs.
///
/// The inter-attempt pause carries a random jitter on top of its base
/// duration. The jitter only reshuffles interleavings; it is not a
/// synchronization mechanism and does not prevent the race.
#[derive(Debug, Clone)]
pub struct SleepDelay {
    pub processing: Duration,
    pub commit: Duration,
    pub inter_attempt: Duration,
    pub jitter: Duration,
}

impl Default for SleepDelay {
    fn default() -> Self {
        Self {
            processing: Duration::from_millis(50),
            commit: Duration::from_millis(50),
            inter_attempt: Duration::from_millis(1),
            jitter: Duration::from_millis(1),
        }
    }
}

#[async_trait]
impl DelayStrategy for SleepDelay {
    async fn processing_pause(&self) {
        tokio::time::sleep(self.processing).await;
    }

    async fn commit_pause(&self) {
        tokio::time::sleep(self.commit).await;
    }

    async fn attempt_pause(&self) {
        let jitter_us = self.jitter.as_micros() as u64;
        let extra = if jitter_us == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_us)
        };
        tokio::time::sleep(self.inter_attempt + Duration::from_micros(extra)).await;
    }
}

/// No pauses at all. Useful for fast correctness runs in guarded mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl DelayStrategy for NoDelay {
    async fn processing_pause(&self) {}
    async fn commit_pause(&self) {}
    async fn attempt_pause(&self) {}
}

/// Deterministic interleaving forcer for reproducing the lost update.
///
/// Every caller that passes the balance check is held at the commit pause
/// until `parties` callers have arrived, then all are released at once and
/// each writes back a balance computed from its own stale snapshot.
///
/// Only meaningful for unguarded runs: in guarded mode the critical section
/// admits one caller at a time, so a second party can never reach the
/// rendezvous and the run would deadlock.
pub struct RendezvousDelay {
    barrier: Barrier,
}

impl RendezvousDelay {
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl DelayStrategy for RendezvousDelay {
    async fn processing_pause(&self) {}

    async fn commit_pause(&self) {
        self.barrier.wait().await;
    }

    async fn attempt_pause(&self) {}
}
