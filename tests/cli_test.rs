use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn no_delays(cmd: &mut Command) {
    cmd.args([
        "--processing-delay-ms",
        "0",
        "--commit-delay-ms",
        "0",
        "--inter-attempt-ms",
        "0",
        "--jitter-ms",
        "0",
    ]);
}

#[test]
fn test_guarded_demo_end_to_end() {
    let mut cmd = Command::new(cargo_bin!("atm-sim"));
    cmd.args(["--mode", "guarded"]);
    no_delays(&mut cmd);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "=== Starting Guarded run with balance = $1000 ===",
        ))
        .stdout(predicate::str::contains("All withdrawals finished"))
        .stdout(predicate::str::contains("Actual final balance"));
}

#[test]
fn test_config_file_run() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "starting_balance": 200,
            "mode": "guarded",
            "workers": [
                {{ "requester_id": "alice", "amount_per_attempt": 50, "attempt_count": 4 }}
            ]
        }}"#
    )?;

    let mut cmd = Command::new(cargo_bin!("atm-sim"));
    cmd.arg(file.path());
    no_delays(&mut cmd);

    // 4 x 50 drains the 200 exactly.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("alice withdrew $50"))
        .stdout(predicate::str::contains("Actual final balance:   $0"));

    Ok(())
}

#[test]
fn test_invalid_config_is_fatal_before_any_run() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"{{ "starting_balance": 100, "mode": "guarded", "workers": [] }}"#
    )?;

    let mut cmd = Command::new(cargo_bin!("atm-sim"));
    cmd.arg(file.path());
    no_delays(&mut cmd);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("At least one worker"));

    Ok(())
}
