// contract-desk-cli/src/main.rs
// ============================================================================
// Module: Contract Desk CLI Entry Point
// Description: Command dispatcher for the contract desk server and offline checks.
// Purpose: Run the REST server and evaluate policy and lifecycle rules locally.
// Dependencies: clap, contract-desk-core, contract-desk-config, contract-desk-server, tokio
// ============================================================================

//! ## Overview
//! `contract-desk serve` runs the REST server. The remaining commands work
//! without a server or store: `config validate` checks a config file,
//! `policy check` evaluates one access decision, and `lifecycle next` /
//! `lifecycle table` evaluate status transitions. Evaluation commands print
//! JSON and exit with status 2 when the answer is a denial or rejection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use contract_desk_config::DeskConfig;
use contract_desk_config::StoreType;
use contract_desk_core::Action;
use contract_desk_core::Actor;
use contract_desk_core::ContractStatus;
use contract_desk_core::ResourceKind;
use contract_desk_core::ResourceRef;
use contract_desk_core::Role;
use contract_desk_core::TransitionReport;
use contract_desk_core::UserId;
use contract_desk_core::allowed_targets;
use contract_desk_core::can_perform;
use contract_desk_core::next_status;
use contract_desk_core::reachable_statuses;
use contract_desk_server::DeskServer;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit status for a denied or rejected evaluation.
const EXIT_DENIED: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "contract-desk", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the contract desk REST server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Access policy utilities.
    Policy {
        /// Selected policy subcommand.
        #[command(subcommand)]
        command: PolicyCommand,
    },
    /// Contract lifecycle utilities.
    Lifecycle {
        /// Selected lifecycle subcommand.
        #[command(subcommand)]
        command: LifecycleCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to contract-desk.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a contract desk configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to contract-desk.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Evaluate one access decision.
    Check(PolicyCheckCommand),
}

/// Arguments for an access decision.
#[derive(Args, Debug)]
struct PolicyCheckCommand {
    /// Actor role.
    #[arg(long, value_name = "ROLE")]
    role: Role,
    /// Actor user identifier.
    #[arg(long, value_name = "ID", default_value_t = 1)]
    actor_id: i64,
    /// Requested action (create, read, update, delete, list_all).
    #[arg(long, value_name = "ACTION")]
    action: Action,
    /// Resource kind (user, template, contract).
    #[arg(long, value_name = "KIND")]
    kind: ResourceKind,
    /// Owner of the resource, when it has one.
    #[arg(long, value_name = "ID")]
    owner: Option<i64>,
    /// Resource identifier, when addressing a single resource.
    #[arg(long, value_name = "ID")]
    resource_id: Option<i64>,
}

/// Lifecycle subcommands.
#[derive(Subcommand, Debug)]
enum LifecycleCommand {
    /// Evaluate one status transition.
    Next(LifecycleNextCommand),
    /// Print the transition table.
    Table(LifecycleTableCommand),
}

/// Arguments for a transition evaluation.
#[derive(Args, Debug)]
struct LifecycleNextCommand {
    /// Current contract status.
    #[arg(long, value_name = "STATUS")]
    current: ContractStatus,
    /// Requested contract status.
    #[arg(long, value_name = "STATUS")]
    requested: ContractStatus,
    /// Role of the caller.
    #[arg(long, value_name = "ROLE")]
    role: Role,
}

/// Arguments for the transition table.
#[derive(Args, Debug)]
struct LifecycleTableCommand {
    /// Include the statuses reachable by this role.
    #[arg(long, value_name = "ROLE")]
    role: Option<Role>,
}

/// One row of the printed transition table.
#[derive(Debug, Serialize)]
struct TableRow {
    /// Source status.
    status: ContractStatus,
    /// Whether the status admits no transitions.
    terminal: bool,
    /// Statuses in the transition table.
    targets: Vec<ContractStatus>,
    /// Statuses reachable by the requested role.
    #[serde(skip_serializing_if = "Option::is_none")]
    reachable: Option<Vec<ContractStatus>>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("contract-desk {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Policy {
            command,
        } => command_policy(command),
        Commands::Lifecycle {
            command,
        } => command_lifecycle(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = DeskConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let bind = config.server.bind.clone();
    let server = tokio::task::spawn_blocking(move || DeskServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!("contract-desk: listening on {bind}"))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = DeskConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let store = match config.store.store_type {
        StoreType::Memory => "memory",
        StoreType::Sqlite => "sqlite",
    };
    write_stdout_line(&format!("config valid: bind={} store={store}", config.server.bind))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Evaluation Commands
// ============================================================================

/// Dispatches policy subcommands.
fn command_policy(command: PolicyCommand) -> CliResult<ExitCode> {
    match command {
        PolicyCommand::Check(command) => command_policy_check(&command),
    }
}

/// Evaluates and prints one access decision.
fn command_policy_check(command: &PolicyCheckCommand) -> CliResult<ExitCode> {
    let actor = Actor::new(UserId::new(command.actor_id), command.role);
    let resource = ResourceRef {
        kind: command.kind,
        owner_id: command.owner.map(UserId::new),
        id: command.resource_id,
    };
    let decision = can_perform(&actor, command.action, &resource);
    write_json(&decision)?;
    Ok(evaluation_exit(decision.allowed))
}

/// Dispatches lifecycle subcommands.
fn command_lifecycle(command: LifecycleCommand) -> CliResult<ExitCode> {
    match command {
        LifecycleCommand::Next(command) => command_lifecycle_next(&command),
        LifecycleCommand::Table(command) => command_lifecycle_table(&command),
    }
}

/// Evaluates and prints one transition.
fn command_lifecycle_next(command: &LifecycleNextCommand) -> CliResult<ExitCode> {
    let report = TransitionReport::from(next_status(command.current, command.requested, command.role));
    write_json(&report)?;
    Ok(evaluation_exit(report.ok))
}

/// Prints the transition table.
fn command_lifecycle_table(command: &LifecycleTableCommand) -> CliResult<ExitCode> {
    let rows: Vec<TableRow> = ContractStatus::ALL
        .into_iter()
        .map(|status| TableRow {
            status,
            terminal: status.is_terminal(),
            targets: allowed_targets(status).to_vec(),
            reachable: command.role.map(|role| reachable_statuses(status, role)),
        })
        .collect();
    write_json(&rows)?;
    Ok(ExitCode::SUCCESS)
}

/// Maps an evaluation outcome to an exit code.
fn evaluation_exit(allowed: bool) -> ExitCode {
    if allowed { ExitCode::SUCCESS } else { ExitCode::from(EXIT_DENIED) }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&payload).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
