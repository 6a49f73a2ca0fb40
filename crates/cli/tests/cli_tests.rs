//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn rsz(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "rightsize-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Four 15-minute single-pod intervals ending at 2024-06-01T01:00:00Z
fn series_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let mut entries = Vec::new();
    for minute in [15, 30, 45, 60] {
        let ts = if minute == 60 {
            "2024-06-01T01:00:00Z".to_string()
        } else {
            format!("2024-06-01T00:{:02}:00Z", minute)
        };
        entries.push(format!(
            r#""{}": {{"duration_in_minutes": 15.0, "metrics": {{
                "cpuUsage": {{"avg": 0.2, "max": 0.25, "min": 0.1, "sum": 0.2, "format": "cores"}},
                "memoryUsage": {{"avg": 200.0, "max": 250.0, "min": 150.0, "sum": 200.0, "format": "MiB"}}
            }}}}"#,
            ts
        ));
    }
    write!(file, "{{{}}}", entries.join(",")).unwrap();
    file
}

#[test]
fn test_cli_help() {
    let output = rsz(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Rightsize"), "Should show app name");
    assert!(stdout.contains("recommend"), "Should show recommend command");
    assert!(stdout.contains("check"), "Should show check command");
    assert!(stdout.contains("policy"), "Should show policy command");
}

#[test]
fn test_cli_version() {
    let output = rsz(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("rsz"), "Should show binary name");
}

#[test]
fn test_recommend_help() {
    let output = rsz(&["recommend", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--input"));
    assert!(stdout.contains("--end-time"));
    assert!(stdout.contains("--engine"));
    assert!(stdout.contains("--remote"));
}

#[test]
fn test_policy_json() {
    let output = rsz(&["--format", "json", "policy"]);
    assert!(output.status.success());

    let policy: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let labels: Vec<_> = policy["sub_categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, ["short_term", "medium_term", "long_term"]);
}

#[test]
fn test_recommend_local_json() {
    let file = series_file();
    let output = rsz(&[
        "--format",
        "json",
        "recommend",
        "--input",
        file.path().to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let recommendations: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        recommendations["short_term"]["config"]["requests"]["cpu"]["amount"],
        0.25
    );
    assert_eq!(
        recommendations["long_term"]["notifications"][0]["kind"],
        "NOT_ENOUGH_DATA"
    );
}

#[test]
fn test_recommend_table() {
    let file = series_file();
    let output = rsz(&["recommend", "--input", file.path().to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("short_term"));
    assert!(stdout.contains("250m"));
}

#[test]
fn test_check_local() {
    let file = series_file();
    let output = rsz(&[
        "--format",
        "json",
        "check",
        "--input",
        file.path().to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["min_data_available"], true);
}

#[test]
fn test_unknown_engine_fails() {
    let file = series_file();
    let output = rsz(&[
        "recommend",
        "--input",
        file.path().to_str().unwrap(),
        "--engine",
        "ml_based",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_input_file_fails() {
    let output = rsz(&["check", "--input", "/nonexistent/series.json"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to read series file"));
}

#[test]
fn test_invalid_command() {
    let output = rsz(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}
