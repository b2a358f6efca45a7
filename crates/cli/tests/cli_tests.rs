//! CLI integration tests

use std::process::Command;

fn harbor() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_harbor"));
    cmd.env_remove("HARBOR_CONFIG");
    cmd
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = harbor()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    for command in ["hosts", "ps", "logs", "events", "stats", "start", "stop", "restart"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

#[test]
fn test_cli_version() {
    let output = harbor()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("harbor"), "Should show binary name");
}

#[test]
fn test_logs_requires_host_and_container() {
    let output = harbor()
        .args(["logs", "just-a-container"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("HOST/CONTAINER"), "Should explain the target format");
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = harbor()
        .args(["--config"])
        .arg(dir.path().join("absent.json"))
        .arg("ps")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_unknown_host_filter_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"hosts": [{"id": "edge-1", "endpoint": "http://127.0.0.1:1"}]}"#,
    )
    .unwrap();

    let output = harbor()
        .arg("--config")
        .arg(&path)
        .args(["--host", "edge-2", "hosts"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("edge-2 is not configured"));
}

#[test]
fn test_unreachable_host_is_listed_as_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"hosts": [{"id": "edge-1", "endpoint": "http://127.0.0.1:1", "timeout_secs": 1}]}"#,
    )
    .unwrap();

    let output = harbor()
        .arg("--config")
        .arg(&path)
        .args(["--format", "json", "hosts"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let hosts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(hosts[0]["id"], "edge-1");
    assert_eq!(hosts[0]["available"], false);
}
