// contract-desk-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Runs the contract-desk binary against temp configs and flags.
// Purpose: Ensure offline commands print JSON and map outcomes to exit codes.
// Dependencies: contract-desk-cli binary, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Spawns the built binary for `config validate`, `policy check`, and the
//! `lifecycle` commands, then checks stdout and the process exit status.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs the CLI with the given arguments and no config env override.
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_contract-desk"))
        .args(args)
        .env_remove("CONTRACT_DESK_CONFIG")
        .output()
        .expect("run contract-desk")
}

/// Writes a config file into the temp dir and returns its path as a string.
fn write_config(dir: &TempDir, contents: &str) -> String {
    let path = dir.path().join("contract-desk.toml");
    fs::write(&path, contents).expect("write config");
    path_string(&path)
}

/// Converts a path to an owned string for argument passing.
fn path_string(path: &Path) -> String {
    path.to_str().expect("utf-8 path").to_string()
}

/// Parses stdout as JSON.
fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

// ============================================================================
// SECTION: Config Validate
// ============================================================================

#[test]
fn config_validate_accepts_minimal_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[server]\nbind = \"127.0.0.1:9090\"\n");
    let output = run_cli(&["config", "validate", "--config", &config]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("config valid"));
    assert!(stdout.contains("bind=127.0.0.1:9090"));
    assert!(stdout.contains("store=memory"));
}

#[test]
fn config_validate_rejects_exposed_memory_store_without_token() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[server]\nbind = \"0.0.0.0:8080\"\n");
    let output = run_cli(&["config", "validate", "--config", &config]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load config"));
    assert!(stderr.contains("bootstrap_admin.token"));
}

#[test]
fn config_validate_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = path_string(&dir.path().join("absent.toml"));
    let output = run_cli(&["config", "validate", "--config", &missing]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load config"));
}

// ============================================================================
// SECTION: Policy Check
// ============================================================================

#[test]
fn policy_check_allows_owner_read() {
    let output = run_cli(&[
        "policy",
        "check",
        "--role",
        "finance",
        "--actor-id",
        "7",
        "--action",
        "read",
        "--kind",
        "contract",
        "--owner",
        "7",
    ]);
    assert!(output.status.success());
    let decision = stdout_json(&output);
    assert_eq!(decision["allowed"], Value::Bool(true));
    assert_eq!(decision["reason"], "owner_allow");
}

#[test]
fn policy_check_denies_cross_owner_listing() {
    let output = run_cli(&[
        "policy", "check", "--role", "legal", "--action", "list_all", "--kind", "contract",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let decision = stdout_json(&output);
    assert_eq!(decision["allowed"], Value::Bool(false));
    assert_eq!(decision["reason"], "list_all_admin_only");
}

#[test]
fn policy_check_rejects_unknown_role() {
    let output = run_cli(&[
        "policy", "check", "--role", "auditor", "--action", "read", "--kind", "contract",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("auditor"));
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn lifecycle_next_accepts_table_transition() {
    let output = run_cli(&[
        "lifecycle",
        "next",
        "--current",
        "draft",
        "--requested",
        "pending_review",
        "--role",
        "procurement",
    ]);
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["ok"], Value::Bool(true));
    assert!(report.get("reason").is_none());
}

#[test]
fn lifecycle_next_rejects_approval_by_procurement() {
    let output = run_cli(&[
        "lifecycle",
        "next",
        "--current",
        "under_review",
        "--requested",
        "approved",
        "--role",
        "procurement",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let report = stdout_json(&output);
    assert_eq!(report["ok"], Value::Bool(false));
    assert_eq!(report["reason"], "role_not_authorized");
}

#[test]
fn lifecycle_next_rejects_terminal_source() {
    let output = run_cli(&[
        "lifecycle",
        "next",
        "--current",
        "expired",
        "--requested",
        "active",
        "--role",
        "admin",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_json(&output)["reason"], "terminal_status");
}

#[test]
fn lifecycle_table_lists_every_status() {
    let output = run_cli(&["lifecycle", "table"]);
    assert!(output.status.success());
    let rows = stdout_json(&output);
    let rows = rows.as_array().expect("table rows");
    assert_eq!(rows.len(), 10);
    let draft = &rows[0];
    assert_eq!(draft["status"], "draft");
    assert_eq!(draft["targets"], serde_json::json!(["pending_review"]));
    assert!(draft.get("reachable").is_none());
}

#[test]
fn lifecycle_table_filters_reachable_by_role() {
    let output = run_cli(&["lifecycle", "table", "--role", "finance"]);
    assert!(output.status.success());
    let rows = stdout_json(&output);
    let under_review = rows
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["status"] == "under_review")
        .expect("under_review row");
    assert_eq!(under_review["targets"], serde_json::json!(["approved", "rejected"]));
    assert_eq!(under_review["reachable"], serde_json::json!([]));
    let terminated =
        rows.as_array().unwrap().iter().find(|row| row["status"] == "terminated").unwrap();
    assert_eq!(terminated["terminal"], Value::Bool(true));
}

#[test]
fn version_flag_prints_package_version() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("contract-desk "));
}
