// contract-desk-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Defaults, file loading, and fail-closed validation.
// Purpose: Ensure minimal config is valid and exposure rules are enforced.
// Dependencies: contract-desk-config, tempfile
// ============================================================================

//! ## Overview
//! Parses TOML snippets and files into [`DeskConfig`] and checks the
//! validation rules that guard exposed binds, store settings, and paging.

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

use contract_desk_config::ConfigError;
use contract_desk_config::DeskConfig;
use contract_desk_config::StoreType;
use tempfile::TempDir;

type TestResult = Result<(), String>;

fn parse(toml: &str) -> Result<DeskConfig, ConfigError> {
    DeskConfig::from_bytes(toml.as_bytes())
}

fn assert_invalid(result: Result<DeskConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn empty_config_uses_defaults() {
    let config = parse("").unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:8080");
    assert_eq!(config.server.max_body_bytes, 1024 * 1024);
    assert!(config.server.audit.enabled);
    assert_eq!(config.store.store_type, StoreType::Memory);
    assert!(config.store.sqlite().is_none());
    assert_eq!(config.paging.default_limit, 100);
    assert_eq!(config.paging.max_limit, 1_000);
}

#[test]
fn sqlite_store_requires_path() -> TestResult {
    assert_invalid(parse("[store]\ntype = \"sqlite\"\n"), "sqlite store requires path")
}

#[test]
fn memory_store_rejects_path() -> TestResult {
    assert_invalid(
        parse("[store]\ntype = \"memory\"\npath = \"desk.db\"\n"),
        "memory store must not set path",
    )
}

#[test]
fn sqlite_settings_map_to_store_config() {
    let config = parse(
        "[store]\ntype = \"sqlite\"\npath = \"data/desk.db\"\njournal_mode = \"delete\"\n\
         sync_mode = \"normal\"\nbusy_timeout_ms = 250\n",
    )
    .unwrap();
    let sqlite = config.store.sqlite().unwrap();
    assert_eq!(sqlite.path.to_string_lossy(), "data/desk.db");
    assert_eq!(sqlite.busy_timeout_ms, 250);
    assert_eq!(sqlite.journal_mode.pragma_value(), "delete");
    assert_eq!(sqlite.sync_mode.pragma_value(), "normal");
}

#[test]
fn exposed_memory_server_requires_bootstrap_token() -> TestResult {
    assert_invalid(
        parse("[server]\nbind = \"0.0.0.0:8080\"\n"),
        "requires server.bootstrap_admin.token",
    )?;
    let config = parse(
        "[server]\nbind = \"0.0.0.0:8080\"\n[server.bootstrap_admin]\nemail = \
         \"root@example.com\"\ntoken = \"cd_0123456789abcdef\"\n",
    )
    .map_err(|err| err.to_string())?;
    assert_eq!(config.server.bootstrap_admin.unwrap().full_name, "Administrator");
    Ok(())
}

#[test]
fn exposed_sqlite_server_may_rely_on_stored_users() {
    let config = parse(
        "[server]\nbind = \"0.0.0.0:8080\"\n[store]\ntype = \"sqlite\"\npath = \"desk.db\"\n",
    );
    assert!(config.is_ok());
}

#[test]
fn short_bootstrap_tokens_are_rejected() -> TestResult {
    assert_invalid(
        parse("[server.bootstrap_admin]\nemail = \"root@example.com\"\ntoken = \"short\"\n"),
        "at least 16 characters",
    )
}

#[test]
fn bootstrap_email_must_look_like_email() -> TestResult {
    assert_invalid(
        parse("[server.bootstrap_admin]\nemail = \"root\"\n"),
        "must be an email address",
    )
}

#[test]
fn invalid_bind_is_rejected() -> TestResult {
    assert_invalid(parse("[server]\nbind = \"localhost\"\n"), "invalid bind address")
}

#[test]
fn body_limit_must_be_positive() -> TestResult {
    assert_invalid(parse("[server]\nmax_body_bytes = 0\n"), "max_body_bytes")
}

#[test]
fn paging_default_cannot_exceed_max() -> TestResult {
    assert_invalid(
        parse("[paging]\ndefault_limit = 500\nmax_limit = 100\n"),
        "paging.default_limit",
    )?;
    assert_invalid(parse("[paging]\nmax_limit = 0\n"), "paging.max_limit")
}

#[test]
fn unknown_fields_fail_parsing() {
    let err = parse("[server]\nbnid = \"127.0.0.1:1\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn load_reads_explicit_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("contract-desk.toml");
    fs::write(&path, "[paging]\ndefault_limit = 25\n").unwrap();
    let config = DeskConfig::load(Some(&path)).unwrap();
    assert_eq!(config.paging.default_limit, 25);
}

#[test]
fn load_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let err = DeskConfig::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn oversized_files_are_rejected() -> TestResult {
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    assert_invalid(DeskConfig::from_bytes(padding.as_bytes()), "size limit")
}
