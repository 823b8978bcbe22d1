//! CLI binary integration tests.
//!
//! These exercise the compiled `secret-wallet` binary for command routing,
//! help text, exit codes and the commands that never touch secure storage.

use std::process::Command;

use tempfile::TempDir;

/// Command for the binary Cargo built for this test run, with its home
/// pointed at a fresh temp dir.
fn secret_wallet_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_secret-wallet"));
    cmd.env("SECRET_WALLET_HOME", home.path())
        .env_remove("SECRET_WALLET_CONFIG")
        .env_remove("SECRET_WALLET_SERVICE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd.arg("--help").output().expect("failed to run secret-wallet");
    assert!(output.status.success(), "--help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["init", "add", "get", "list", "remove", "inject", "status"] {
        assert!(
            stdout.contains(command),
            "help output should mention '{}', got: {}",
            command,
            stdout
        );
    }
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd.arg("--version").output().expect("failed to run secret-wallet");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("secret-wallet"));
}

#[test]
fn test_cli_unknown_command() {
    let home = TempDir::new().unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd
        .arg("nonexistent-command")
        .output()
        .expect("failed to run secret-wallet");
    assert!(
        !output.status.success(),
        "unknown command should return non-zero exit code"
    );
}

#[test]
fn test_cli_list_empty() {
    let home = TempDir::new().unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd.arg("list").output().expect("failed to run secret-wallet list");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No secrets stored."));
}

#[test]
fn test_cli_list_json_empty() {
    let home = TempDir::new().unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd
        .args(["list", "--json"])
        .output()
        .expect("failed to run secret-wallet list --json");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json, serde_json::json!([]));
}

#[test]
fn test_cli_status_json() {
    let home = TempDir::new().unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd.arg("status").output().expect("failed to run secret-wallet status");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["secrets"]["total"], 0);
    assert_eq!(json["service"], "dev.secret-wallet");
}

#[cfg(unix)]
#[test]
fn test_cli_inject_forwards_exit_code() {
    let home = TempDir::new().unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd
        .args(["inject", "--", "sh", "-c", "exit 3"])
        .output()
        .expect("failed to run secret-wallet inject");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_cli_inject_requires_command() {
    let home = TempDir::new().unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd.arg("inject").output().expect("failed to run secret-wallet inject");
    assert!(!output.status.success());
}

#[test]
fn test_cli_invalid_config_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("config.json5");
    std::fs::write(&config, "{ inject: { reuse_seconds: 0 } }").unwrap();
    let mut cmd = secret_wallet_cmd(&home);
    let output = cmd
        .arg("--config")
        .arg(&config)
        .arg("list")
        .output()
        .expect("failed to run secret-wallet list");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("reuse_seconds"));
}
