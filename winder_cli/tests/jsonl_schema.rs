use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sim]
carriage_start_mm = 1.0
tick_us = 100

[profile]
mandrel_diameter = 10.0

[[profile.layers]]
length = 2.0
angle = 45.0
offset = 0.5
stepover = 5.0
dwell = 0.0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(out: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(out)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON ({e}): {l}")))
        .collect()
}

fn summary(lines: &[serde_json::Value]) -> &serde_json::Value {
    lines
        .iter()
        .find(|v| v.get("status").is_some())
        .expect("no summary line with status")
}

/// Validate the JSONL schema for a completed job.
#[rstest]
fn jsonl_success_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("winder").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("wind");

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);

    // Events first, in order, then the summary.
    let kinds: Vec<&str> = lines
        .iter()
        .filter_map(|v| v.get("event").and_then(|e| e.as_str()))
        .collect();
    assert_eq!(kinds.first(), Some(&"state_changed"));
    assert_eq!(kinds.last(), Some(&"complete"));
    assert_eq!(kinds.iter().filter(|k| **k == "pass_completed").count(), 6);
    assert!(kinds.contains(&"layer_started"));

    let s = summary(&lines);
    assert!(s.get("timestamp").and_then(|x| x.as_i64()).is_some());
    assert!(s.get("duration_ms").and_then(|x| x.as_u64()).is_some());
    assert!(s.get("ticks").and_then(|x| x.as_u64()).is_some());
    assert_eq!(s["status"], "complete");
    assert_eq!(s["layers"], 1);
    assert_eq!(s["passes"], 6);
    assert!(s.get("abort_reason").is_some());
    assert!(s["abort_reason"].is_null());
}

/// Validate the JSONL schema for an aborted job, including abort_reason string.
#[rstest]
fn jsonl_abort_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("winder").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("wind")
        .arg("--max-ticks")
        .arg("50");

    let assert = cmd.assert().code(4);
    let output = assert.get_output();
    let lines = json_lines(&output.stdout);

    let s = summary(&lines);
    assert_eq!(s["status"], "aborted");
    assert_eq!(s["abort_reason"], "TickLimit");
    assert!(s["ticks"].is_null());

    // The error itself goes to stderr as one JSON object; log lines nest under "fields".
    let e = String::from_utf8_lossy(&output.stderr)
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .find(|v| v.get("reason").is_some())
        .expect("error JSON on stderr");
    assert_eq!(e["reason"], "TickLimit");
    assert_eq!(e["details"]["max_ticks"], 50);
    assert!(e["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[rstest]
fn jsonl_plan_rows() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("winder").unwrap();
    cmd.arg("--json").arg("--config").arg(&cfg).arg("plan");

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);
    assert_eq!(lines.len(), 1);
    let row = &lines[0];
    assert_eq!(row["layer"], 1);
    assert_eq!(row["total_passes"], 6);
    assert!(row["step_ratio"].as_f64().is_some_and(|r| r > 0.0));
    assert!(row["dwell_steps"].as_i64().is_some_and(|d| d > 0));
    assert!(row["warnings"].as_array().is_some_and(|w| w.is_empty()));
}

#[rstest]
fn jsonl_self_check() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("winder").unwrap();
    cmd.arg("--json").arg("--config").arg(&cfg).arg("self-check");

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);
    let v = &lines[0];
    assert_eq!(v["status"], "ok");
    assert_eq!(v["backend"], "simulation");
    assert_eq!(v["carriage_steps_per_mm"], 20.0);
    assert_eq!(v["mandrel_steps_per_rev"], 3840.0);
}
