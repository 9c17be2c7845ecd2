use crate::account::SyncMode;
use crate::error::{Result, SimulationError};
use serde::Deserialize;

/// One worker's share of the roster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerSpec {
    pub requester_id: String,
    pub amount_per_attempt: i64,
    pub attempt_count: u32,
}

/// Everything the orchestrator needs for one run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    pub starting_balance: i64,
    pub mode: SyncMode,
    pub workers: Vec<WorkerSpec>,
}

impl SimulationConfig {
    /// Parses a JSON config and validates it in one step.
    pub fn from_json<R: std::io::Read>(source: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects invalid configurations synchronously, before any worker is
    /// spawned. Nothing partially executes on a bad config.
    pub fn validate(&self) -> Result<()> {
        if self.starting_balance < 0 {
            return Err(SimulationError::InvalidConfig(
                "Starting balance must not be negative".to_string(),
            ));
        }
        if self.workers.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "At least one worker is required".to_string(),
            ));
        }
        for spec in &self.workers {
            if spec.amount_per_attempt <= 0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "Worker '{}' has a non-positive withdrawal amount",
                    spec.requester_id
                )));
            }
            if spec.attempt_count == 0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "Worker '{}' has zero attempts",
                    spec.requester_id
                )));
            }
        }
        Ok(())
    }

    /// Total attempts across the roster; the event log of a full run has
    /// exactly this many entries.
    pub fn total_attempts(&self) -> usize {
        self.workers.iter().map(|w| w.attempt_count as usize).sum()
    }

    /// The classic demo roster: balance 1000, four tellers withdrawing
    /// 50 x 10 attempts each, plus one kiosk hammering 20 x 40.
    pub fn classic_demo(mode: SyncMode) -> Self {
        let teller = |name: &str| WorkerSpec {
            requester_id: name.to_string(),
            amount_per_attempt: 50,
            attempt_count: 10,
        };
        Self {
            starting_balance: 1000,
            mode,
            workers: vec![
                teller("Alice"),
                teller("Bob"),
                teller("Charlie"),
                teller("Diana"),
                WorkerSpec {
                    requester_id: "ATM-Kiosk".to_string(),
                    amount_per_attempt: 20,
                    attempt_count: 40,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_demo_is_valid() {
        let config = SimulationConfig::classic_demo(SyncMode::Guarded);
        assert!(config.validate().is_ok());
        assert_eq!(config.total_attempts(), 80);
    }

    #[test]
    fn test_negative_starting_balance_rejected() {
        let mut config = SimulationConfig::classic_demo(SyncMode::Guarded);
        config.starting_balance = -1;
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_roster_rejected() {
        let config = SimulationConfig {
            starting_balance: 100,
            mode: SyncMode::Guarded,
            workers: vec![],
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let mut config = SimulationConfig::classic_demo(SyncMode::Guarded);
        config.workers[0].amount_per_attempt = 0;
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = SimulationConfig::classic_demo(SyncMode::Guarded);
        config.workers[2].attempt_count = 0;
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "starting_balance": 500,
            "mode": "unguarded",
            "workers": [
                { "requester_id": "alice", "amount_per_attempt": 50, "attempt_count": 3 }
            ]
        }"#;
        let config = SimulationConfig::from_json(json.as_bytes()).unwrap();
        assert_eq!(config.starting_balance, 500);
        assert_eq!(config.mode, SyncMode::Unguarded);
        assert_eq!(config.workers.len(), 1);
    }

    #[test]
    fn test_from_json_rejects_invalid_config() {
        let json = r#"{ "starting_balance": 500, "mode": "guarded", "workers": [] }"#;
        assert!(matches!(
            SimulationConfig::from_json(json.as_bytes()),
            Err(SimulationError::InvalidConfig(_))
        ));
    }
}
