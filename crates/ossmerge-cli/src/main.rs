// crates/ossmerge-cli/src/main.rs
// ============================================================================
// Module: OSS Merge CLI Entry Point
// Description: Command dispatcher for merge runs and config validation.
// Purpose: Run the metadata merge over a captured snapshot from the shell.
// Dependencies: clap, ossmerge-config, ossmerge-core, serde, serde_jcs,
// serde_json, thiserror, time, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `ossmerge merge` loads the configuration, a JSON snapshot of every source
//! directory and an optional parts table, runs the merge engine and writes the
//! finalized record stream as JSON to stdout or a file. Logs go to stderr so
//! stdout carries only the output document. `ossmerge config validate` checks
//! a configuration file without running anything.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use ossmerge_config::CONFIG_ENV_VAR;
use ossmerge_config::DEFAULT_CONFIG_NAME;
use ossmerge_config::LogFormat;
use ossmerge_config::LoggingSection;
use ossmerge_config::OssMergeConfig;
use ossmerge_core::Checksum;
use ossmerge_core::MergeCounters;
use ossmerge_core::MergeEngine;
use ossmerge_core::MergeOutput;
use ossmerge_core::PartsTable;
use ossmerge_core::RunAction;
use ossmerge_core::SnapshotSources;
use ossmerge_core::interfaces::MonitoringSource;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a snapshot JSON input.
const MAX_SNAPSHOT_BYTES: usize = 256 * 1024 * 1024;
/// Maximum size of a parts-table JSON input.
const MAX_PARTS_BYTES: usize = 16 * 1024 * 1024;
/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "OSSMERGE_LOG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "ossmerge", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one merge over a snapshot.
    Merge(MergeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an ossmerge configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to ossmerge.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for a merge run.
#[derive(Args, Debug)]
struct MergeCommand {
    /// Optional config file path (defaults to ossmerge.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Snapshot JSON file (overrides `inputs.snapshot`).
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,
    /// Parts-table JSON file (overrides `inputs.parts`).
    #[arg(long, value_name = "PATH")]
    parts: Option<PathBuf>,
    /// Output file; stdout when omitted.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Name pattern (overrides `run.pattern`).
    #[arg(long, value_name = "GLOB")]
    pattern: Option<String>,
    /// Comma-separated run actions (replaces `run.actions`).
    #[arg(long, value_name = "ACTIONS", value_delimiter = ',')]
    actions: Vec<String>,
    /// Reference date `YYYY-MM-DD` (overrides `run.reference_date`).
    #[arg(long, value_name = "DATE")]
    reference_date: Option<String>,
    /// Output document shape.
    #[arg(long, value_enum, default_value_t = OutputFormat::Canonical)]
    format: OutputFormat,
}

/// Output document shapes.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Full output as RFC 8785 canonical JSON.
    Canonical,
    /// Full output as indented JSON.
    Pretty,
    /// Counters and checksum only.
    Summary,
}

/// Condensed run result written by `--format summary`.
#[derive(Debug, Serialize)]
struct RunSummary {
    /// Checksum of the full output document.
    checksum: Checksum,
    /// Run counters.
    counters: MergeCounters,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a human-readable message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors returned by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File I/O failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file exceeds size limit ({size} > {limit})")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Merge(command) => command_merge(&command),
        Commands::Config { command: ConfigCommand::Validate(command) } => command_config_validate(&command),
    }
}

// ============================================================================
// SECTION: Merge Command
// ============================================================================

/// Executes the `merge` command.
fn command_merge(command: &MergeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    init_logging(&config.logging)?;
    let bytes = execute_merge(command, config, OffsetDateTime::now_utc().date())?;
    match &command.output {
        Some(path) => {
            fs::write(path, &bytes)
                .map_err(|err| CliError::new(format!("failed to write output {}: {err}", path.display())))?;
            info!(path = %path.display(), bytes = bytes.len(), "merge output written");
        }
        None => write_stdout_bytes(&bytes)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs the merge and renders the output document.
fn execute_merge(command: &MergeCommand, mut config: OssMergeConfig, today: Date) -> CliResult<Vec<u8>> {
    apply_overrides(&mut config, command);
    let merge_config = config.to_merge_config(today).map_err(|err| CliError::new(err.to_string()))?;

    let snapshot_path = command
        .snapshot
        .as_ref()
        .or(config.inputs.snapshot.as_ref())
        .ok_or_else(|| CliError::new("no snapshot input: pass --snapshot or set inputs.snapshot"))?;
    let snapshot = read_snapshot(snapshot_path)?;
    let parts = match command.parts.as_ref().or(config.inputs.parts.as_ref()) {
        Some(path) => read_parts(path)?,
        None => PartsTable::default(),
    };

    let engine = MergeEngine::new(merge_config);
    let monitoring: &dyn MonitoringSource = &snapshot;
    let output =
        engine.run(&snapshot, &parts, Some(monitoring)).map_err(|err| CliError::new(format!("merge failed: {err}")))?;
    let checksum = output.checksum().map_err(|err| CliError::new(format!("output hashing failed: {err}")))?;
    let counters = output.counters;
    if !snapshot.unavailable.is_empty() {
        warn!(directories = snapshot.unavailable.len(), "snapshot marks directories unavailable");
    }
    info!(
        services = counters.services,
        segments = counters.segments,
        tribes = counters.tribes,
        environments = counters.environments,
        quarantined = counters.quarantined,
        aborted = counters.aborted,
        checksum = %checksum,
        "merge run complete"
    );
    render_output(&output, checksum, command.format)
}

/// Applies command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut OssMergeConfig, command: &MergeCommand) {
    if let Some(pattern) = &command.pattern {
        config.run.pattern.clone_from(pattern);
    }
    if !command.actions.is_empty() {
        config.run.actions.clone_from(&command.actions);
    }
    if let Some(date) = &command.reference_date {
        config.run.reference_date = Some(date.clone());
    }
}

/// Serializes the run output in the requested shape.
fn render_output(output: &MergeOutput, checksum: Checksum, format: OutputFormat) -> CliResult<Vec<u8>> {
    let mut bytes = match format {
        OutputFormat::Canonical => serde_jcs::to_vec(output),
        OutputFormat::Pretty => serde_json::to_vec_pretty(output),
        OutputFormat::Summary => serde_jcs::to_vec(&RunSummary { checksum, counters: output.counters }),
    }
    .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes `config validate`.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = OssMergeConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let actions = config.run_actions().map_err(|err| CliError::new(err.to_string()))?;
    let enabled: Vec<&str> = actions.iter().map(RunAction::as_str).collect();
    write_stdout_line(&format!("config ok: actions {}", enabled.join(",")))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Helpers
// ============================================================================

/// Loads the configuration, falling back to defaults when no file is named.
///
/// Defaults apply only when neither `--config` nor `OSSMERGE_CONFIG` is set
/// and `ossmerge.toml` does not exist.
fn load_config(path: Option<&Path>) -> CliResult<OssMergeConfig> {
    if path.is_none() && env::var_os(CONFIG_ENV_VAR).is_none() && !Path::new(DEFAULT_CONFIG_NAME).exists() {
        return Ok(OssMergeConfig::default());
    }
    OssMergeConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Installs the stderr tracing subscriber.
fn init_logging(logging: &LoggingSection) -> CliResult<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|err| CliError::new(format!("invalid log filter: {err}")))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| CliError::new(format!("failed to install logger: {err}")))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge { size, limit: max_bytes })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge { size, limit: max_bytes });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge { size: actual, limit: max_bytes });
    }
    Ok(bytes)
}

/// Reads and parses the snapshot document.
fn read_snapshot(path: &Path) -> CliResult<SnapshotSources> {
    let bytes = read_bytes_with_limit(path, MAX_SNAPSHOT_BYTES)
        .map_err(|err| CliError::new(format!("failed to read snapshot {}: {err}", path.display())))?;
    SnapshotSources::from_json(&bytes)
        .map_err(|err| CliError::new(format!("invalid snapshot {}: {err}", path.display())))
}

/// Reads and parses the parts table.
fn read_parts(path: &Path) -> CliResult<PartsTable> {
    let bytes = read_bytes_with_limit(path, MAX_PARTS_BYTES)
        .map_err(|err| CliError::new(format!("failed to read parts table {}: {err}", path.display())))?;
    PartsTable::from_json(&bytes).map_err(|err| CliError::new(format!("invalid parts table {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
