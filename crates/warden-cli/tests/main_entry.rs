//! Integration tests for the `warden` binary entry point.
//!
//! Each test points the binary at a private state directory so runs never
//! observe one another.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use rstest::rstest;
use tempfile::TempDir;

fn warden(state: &Path) -> Command {
    let mut command = cargo_bin_cmd!("warden");
    command
        .env_remove("WARDEN_CONFIG_PATH")
        .arg("--pid-file")
        .arg(state.join("service.pid"))
        .arg("--log-file")
        .arg(state.join("service.log"));
    command
}

fn bare_warden(cwd: &Path) -> Command {
    let mut command = cargo_bin_cmd!("warden");
    command.current_dir(cwd).env("HOME", cwd);
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("WARDEN_") {
            command.env_remove(key);
        }
    }
    command
}

#[rstest]
#[case::status("status", "is not running")]
#[case::log("log", "no log yet")]
fn commands_run_without_any_configuration(#[case] subcommand: &str, #[case] expected: &str) {
    let cwd = TempDir::new().expect("temp dir");
    bare_warden(cwd.path())
        .arg(subcommand)
        .assert()
        .success()
        .stdout(contains(expected));
    assert!(
        !cwd.path().join(".warden").join("service.pid").exists(),
        "read-only commands must not create a handle record"
    );
}

#[test]
fn status_reports_not_running_for_fresh_state() {
    let state = TempDir::new().expect("temp dir");
    warden(state.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("is not running"));
}

#[test]
fn stop_is_a_no_op_when_not_running() {
    let state = TempDir::new().expect("temp dir");
    warden(state.path())
        .arg("stop")
        .assert()
        .success()
        .stdout(contains("is not running"));
}

#[test]
fn non_numeric_handle_record_is_discarded() {
    let state = TempDir::new().expect("temp dir");
    let record = state.path().join("service.pid");
    fs::write(&record, "not-a-pid\n").expect("seed record");

    warden(state.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("is not running"));
    assert!(!record.exists(), "malformed record should be removed");
}

#[test]
fn start_without_service_command_fails() {
    let state = TempDir::new().expect("temp dir");
    warden(state.path())
        .arg("start")
        .assert()
        .failure()
        .stderr(contains("no service command configured"));
}

#[test]
fn log_reports_missing_file() {
    let state = TempDir::new().expect("temp dir");
    warden(state.path())
        .arg("log")
        .assert()
        .success()
        .stdout(contains("no log yet").and(contains("warden start")));
}

#[test]
fn log_level_filter_applies_within_tail() {
    let state = TempDir::new().expect("temp dir");
    let mut contents = String::new();
    for line in 1..=100 {
        if matches!(line, 5 | 92 | 97 | 99) {
            contents.push_str(&format!("Error: failure {line}\n"));
        } else {
            contents.push_str(&format!("info: request {line}\n"));
        }
    }
    fs::write(state.path().join("service.log"), contents).expect("write log");

    warden(state.path())
        .args(["log", "--level", "error", "--tail", "10"])
        .assert()
        .success()
        .stdout("Error: failure 92\nError: failure 97\nError: failure 99\n\n--- 3 lines shown ---\n");
}

#[test]
fn invalid_pattern_is_reported() {
    let state = TempDir::new().expect("temp dir");
    fs::write(state.path().join("service.log"), "line\n").expect("write log");
    warden(state.path())
        .args(["log", "[unclosed"])
        .assert()
        .failure()
        .stderr(contains("invalid search pattern"));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let state = TempDir::new().expect("temp dir");
    warden(state.path()).arg("restart").assert().code(2);
}

#[cfg(unix)]
#[test]
fn lifecycle_round_trip_with_configured_service() -> Result<()> {
    let state = TempDir::new().context("create state directory")?;
    let config = state.path().join("warden.toml");
    fs::write(
        &config,
        r#"
service_name = "sleeper"
service_command = ["sleep", "30"]
startup_grace_ms = 200
stop_timeout_ms = 5000
kill_timeout_ms = 2000
"#,
    )
    .context("write configuration file")?;
    let with_config = |command: &str| {
        let mut cmd = warden(state.path());
        cmd.arg("--config-path").arg(&config).arg(command);
        cmd
    };

    with_config("start")
        .assert()
        .success()
        .stdout(contains("sleeper started (pid "));
    let record = fs::read_to_string(state.path().join("service.pid"))
        .context("read handle record after start")?;
    let pid = record.trim();
    ensure!(
        pid.parse::<u32>().is_ok(),
        "handle record should hold a pid, got {record:?}"
    );

    with_config("start")
        .assert()
        .success()
        .stdout(contains(format!("already running (pid {pid})")));

    with_config("status")
        .assert()
        .success()
        .stdout(contains(format!("sleeper is running (pid {pid})")));

    with_config("stop")
        .assert()
        .success()
        .stdout(contains(format!("sleeper (pid {pid}) stopped")));

    with_config("status")
        .assert()
        .success()
        .stdout(contains("sleeper is not running"));
    ensure!(
        !state.path().join("service.pid").exists(),
        "handle record should be cleared after stop"
    );
    Ok(())
}
