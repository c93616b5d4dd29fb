// crates/ossmerge-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for merge execution, overrides and bounded reads.
// Purpose: Ensure the CLI wires config, snapshot and output together.
// Dependencies: ossmerge-cli main helpers
// ============================================================================

//! ## Overview
//! Drives `execute_merge` over snapshot files written to temporary
//! directories and checks the rendered documents.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use ossmerge_config::OssMergeConfig;
use ossmerge_core::EntryType;
use ossmerge_core::IncidentItem;
use ossmerge_core::IncidentRecord;
use ossmerge_core::OperationalStatus;
use ossmerge_core::SnapshotSources;
use serde_json::Value;
use tempfile::TempDir;
use time::macros::date;

use super::Cli;
use super::Commands;
use super::MergeCommand;
use super::OutputFormat;
use super::ReadLimitError;
use super::execute_merge;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn incident(name: &str) -> IncidentRecord {
    IncidentRecord {
        item: IncidentItem {
            crn_service_name: name.to_string(),
            display_name: name.to_string(),
            entry_type: EntryType::Service,
            operational_status: OperationalStatus::Ga,
            client_facing: true,
            ..IncidentItem::default()
        },
        ..IncidentRecord::default()
    }
}

fn write_snapshot(dir: &TempDir, names: &[&str]) -> PathBuf {
    let snapshot =
        SnapshotSources { incident: names.iter().map(|name| incident(name)).collect(), ..SnapshotSources::default() };
    let path = dir.path().join("snapshot.json");
    fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();
    path
}

fn merge_command(args: &[&str]) -> MergeCommand {
    let mut argv = vec!["ossmerge", "merge"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv).unwrap().command {
        Commands::Merge(command) => command,
        Commands::Config { .. } => panic!("expected merge command"),
    }
}

fn service_names(document: &Value) -> Vec<String> {
    document["records"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|record| record["kind"] == "service")
        .map(|record| record["record"]["reference_resource_name"].as_str().unwrap().to_string())
        .collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ============================================================================
// SECTION: Merge Execution
// ============================================================================

#[test]
fn merge_emits_one_record_per_service() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = path_arg(&write_snapshot(&dir, &["svc-b", "svc-a"]));
    let command = merge_command(&["--snapshot", &snapshot, "--reference-date", "2024-06-01"]);

    let bytes = execute_merge(&command, OssMergeConfig::default(), date!(2025 - 01 - 01)).unwrap();
    let document: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(service_names(&document), vec!["svc-a".to_string(), "svc-b".to_string()]);
    assert_eq!(document["counters"]["services"], 2);
    assert!(bytes.ends_with(b"\n"));
}

#[test]
fn merge_output_is_byte_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = path_arg(&write_snapshot(&dir, &["svc-a", "svc-b", "svc-c"]));
    let command = merge_command(&["--snapshot", &snapshot]);

    let first = execute_merge(&command, OssMergeConfig::default(), date!(2024 - 06 - 01)).unwrap();
    let second = execute_merge(&command, OssMergeConfig::default(), date!(2024 - 06 - 01)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn pattern_override_restricts_loaded_names() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = path_arg(&write_snapshot(&dir, &["kafka-east", "redis"]));
    let command = merge_command(&["--snapshot", &snapshot, "--pattern", "kafka*"]);

    let bytes = execute_merge(&command, OssMergeConfig::default(), date!(2024 - 06 - 01)).unwrap();
    let document: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(service_names(&document), vec!["kafka-east".to_string()]);
}

#[test]
fn summary_format_carries_output_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = path_arg(&write_snapshot(&dir, &["svc-a"]));
    let command = merge_command(&["--snapshot", &snapshot, "--format", "summary"]);
    assert_eq!(command.format, OutputFormat::Summary);

    let bytes = execute_merge(&command, OssMergeConfig::default(), date!(2024 - 06 - 01)).unwrap();
    let document: Value = serde_json::from_slice(&bytes).unwrap();
    let checksum = document["checksum"].as_str().unwrap();
    assert_eq!(checksum.len(), 64);
    assert_eq!(document["counters"]["services"], 1);
    assert!(document.get("records").is_none());
}

#[test]
fn unknown_action_override_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = path_arg(&write_snapshot(&dir, &["svc-a"]));
    let command = merge_command(&["--snapshot", &snapshot, "--actions", "services,teleport"]);

    let error = execute_merge(&command, OssMergeConfig::default(), date!(2024 - 06 - 01)).unwrap_err();
    assert!(error.to_string().contains("unknown run action: teleport"));
}

#[test]
fn snapshot_path_falls_back_to_config_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_snapshot(&dir, &["svc-a"]);
    let mut config = OssMergeConfig::default();
    config.inputs.snapshot = Some(snapshot);

    let bytes = execute_merge(&merge_command(&[]), config, date!(2024 - 06 - 01)).unwrap();
    let document: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(service_names(&document), vec!["svc-a".to_string()]);
}

#[test]
fn missing_snapshot_input_is_reported() {
    let error = execute_merge(&merge_command(&[]), OssMergeConfig::default(), date!(2024 - 06 - 01)).unwrap_err();
    assert!(error.to_string().contains("no snapshot input"));
}

#[test]
fn malformed_snapshot_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    fs::write(&path, b"{\"incident\": 7}").unwrap();
    let command = merge_command(&["--snapshot", &path_arg(&path)]);

    let error = execute_merge(&command, OssMergeConfig::default(), date!(2024 - 06 - 01)).unwrap_err();
    assert!(error.to_string().contains("invalid snapshot"));
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.bin");
    fs::write(&path, vec![0_u8; 17]).unwrap();

    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge { size, limit }) => {
            assert_eq!(size, 17);
            assert_eq!(limit, 16);
        }
        other => panic!("expected size limit error, got {other:?}"),
    }
}

#[test]
fn read_bytes_with_limit_accepts_file_at_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exact.bin");
    fs::write(&path, vec![1_u8; 16]).unwrap();
    assert_eq!(read_bytes_with_limit(&path, 16).unwrap().len(), 16);
}
