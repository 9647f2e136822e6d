//! CLI smoke tests against the real binary with a throwaway store

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

/// Write a config pointing storage at the temp dir, return its path
fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let config_path = dir.path().join("cg.yml");
    let db_path = dir.path().join("cg.db");
    std::fs::write(
        &config_path,
        format!("storage:\n  path: {}\n", db_path.display()),
    )
    .unwrap();
    config_path
}

fn write_intake(dir: &TempDir) -> std::path::PathBuf {
    let intake_path = dir.path().join("intake.json");
    std::fs::write(
        &intake_path,
        serde_json::json!({
            "advertiser_id": 42,
            "business": { "name": "کافه تهران", "type": "کافه" },
            "goal": "افزایش فروش",
            "target_audience": "جوانان تهرانی",
            "locations": ["تهران"],
            "daily_budget": 1_000_000,
            "total_budget": 10_000_000,
            "landing": { "address": "https://example.ir", "type": "webpage" }
        })
        .to_string(),
    )
    .unwrap();
    intake_path
}

fn cg() -> Command {
    Command::cargo_bin("cg").unwrap()
}

#[test]
#[serial]
fn test_tasks_empty() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    cg().args(["--config"])
        .arg(&config)
        .arg("tasks")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found"));
}

#[test]
#[serial]
fn test_request_enqueues_task() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let intake = write_intake(&dir);

    cg().args(["--config"])
        .arg(&config)
        .arg("request")
        .arg(&intake)
        .assert()
        .success()
        .stdout(predicate::str::contains("Request submitted"));

    cg().args(["--config"])
        .arg(&config)
        .arg("tasks")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate_campaign_plan"))
        .stdout(predicate::str::contains("new"));
}

#[test]
#[serial]
fn test_request_rejects_bad_intake() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let intake_path = dir.path().join("bad.json");
    std::fs::write(&intake_path, "{\"advertiser_id\": 42}").unwrap();

    cg().args(["--config"])
        .arg(&config)
        .arg("request")
        .arg(&intake_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("intake"));
}

#[test]
#[serial]
fn test_approve_missing_task() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    cg().args(["--config"])
        .arg(&config)
        .args(["approve", "no-such-task"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not found"));
}

#[test]
#[serial]
fn test_approve_rejects_wrong_state() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let intake = write_intake(&dir);

    cg().args(["--config"]).arg(&config).arg("request").arg(&intake).assert().success();

    // Find the new task id from the listing
    let output = cg().args(["--config"]).arg(&config).arg("tasks").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let task_id = stdout
        .lines()
        .find(|l| l.contains("generate_campaign_plan"))
        .and_then(|l| l.split_whitespace().next())
        .unwrap()
        .to_string();

    // Still new, not pending_confirm
    cg().args(["--config"])
        .arg(&config)
        .args(["approve", &task_id])
        .assert()
        .success()
        .stderr(predicate::str::contains("only pending_confirm"));
}

#[test]
#[serial]
fn test_plan_missing_session() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    cg().args(["--config"])
        .arg(&config)
        .args(["plan", "sess-none"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No plan found"));
}
