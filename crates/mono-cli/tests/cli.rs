//! End-to-end runs of the `monokit` binary, one process per probe run.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};

const MONOKIT: &str = "monokit";

/// Writes a config whose database and log live in `dir`.
fn write_config(dir: &Path, webhook: &str) -> PathBuf {
    let yaml = format!(
        r"
project-identifier: proj1
hostname: host1
log-location: {log}
sqlite-location: {db}
zulip-alarm:
  enabled: true
  interval: 0
  limit: 2
  webhook-urls:
    - {webhook}
redmine:
  enabled: true
",
        log = dir.join("logs").join("monokit.log").display(),
        db = dir.join("monokit.db").display(),
    );
    let path = dir.join("global.yml");
    fs::write(&path, yaml).unwrap();
    path
}

fn monokit(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin(MONOKIT).unwrap();
    cmd.env_remove("MONOKIT_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    cmd
}

fn json(config: &Path) -> Command {
    let mut cmd = monokit(config);
    cmd.args(["--format", "json"]);
    cmd
}

fn alarm(config: &Path, test_mode: bool) -> assert_cmd::assert::Assert {
    let mut cmd = json(config);
    if test_mode {
        cmd.env("TEST", "1");
    } else {
        cmd.env_remove("TEST");
    }
    cmd.args(["alarm", "-s", "diskProbe", "-m", "/var", "--status", "down", "[disk] 92%"])
        .assert()
}

fn setup() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:9/hook");
    (dir, config)
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin(MONOKIT)
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("alarm").and(predicate::str::contains("issue")));
}

#[test]
fn missing_config_fails() {
    let dir = tempdir().unwrap();
    monokit(&dir.path().join("absent.yml"))
        .args(["history", "news"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

#[test]
fn alarm_limit_holds_across_processes() {
    let (dir, config) = setup();

    alarm(&config, true)
        .success()
        .stdout(predicate::str::contains(r#""outcome": "sent""#));
    alarm(&config, true)
        .success()
        .stdout(predicate::str::contains(r#""outcome": "sent""#));
    alarm(&config, true)
        .success()
        .stdout(predicate::str::contains(r#""reason": "limit_reached""#));

    let output = json(&config)
        .args(["history", "alarms", "-s", "diskProbe", "-m", "/var"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["alarms"].as_array().map(Vec::len), Some(2));

    assert!(dir.path().join("logs").join("monokit.log").exists());
}

#[test]
fn unreachable_webhook_warns_and_records_nothing() {
    let (_dir, config) = setup();

    alarm(&config, false)
        .success()
        .stderr(predicate::str::starts_with("Warning:"));

    let output = json(&config)
        .args(["history", "alarms", "-s", "diskProbe", "-m", "/var"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["alarms"].as_array().map(Vec::len), Some(0));
}

#[test]
fn issue_escalation_in_test_mode() {
    let (_dir, config) = setup();
    let escalate = |status: &str| {
        json(&config)
            .env("TEST", "1")
            .args([
                "issue",
                "escalate",
                "-s",
                "osHealth",
                "-m",
                "load",
                "--status",
                status,
                "--subject",
                "load is high",
            ])
            .assert()
            .success()
    };

    escalate("down").stdout(predicate::str::contains(r#""outcome": "created""#));
    escalate("down").stdout(predicate::str::contains(r#""outcome": "no-op""#));
    escalate("up").stdout(predicate::str::contains(r#""outcome": "updated""#));
    escalate("down").stdout(predicate::str::contains(r#""outcome": "reopened""#));
}

#[test]
fn escalation_without_credentials_is_fatal() {
    let (_dir, config) = setup();

    json(&config)
        .env_remove("TEST")
        .args(["issue", "escalate", "--status", "down", "--subject", "reboot required"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ticket backend misconfigured"));
}

#[test]
fn version_change_is_announced() {
    let (_dir, config) = setup();
    let version = |v: &str| {
        json(&config)
            .env("TEST", "1")
            .args(["version", "Docker", v])
            .assert()
            .success()
    };

    version("27.0.1").stdout(predicate::str::contains("first_seen"));
    version("28.5.2").stdout(predicate::str::contains("Docker was updated on host1"));

    monokit(&config)
        .args(["history", "news"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 item(s)"));
}
