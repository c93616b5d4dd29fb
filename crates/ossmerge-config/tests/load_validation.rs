//! Config load validation tests for ossmerge-config.
// crates/ossmerge-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding, syntax).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use ossmerge_config::ConfigError;
use ossmerge_config::LogFormat;
use ossmerge_config::OssMergeConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<OssMergeConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(content: &[u8]) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    assert_invalid(OssMergeConfig::load(Some(Path::new(&long_path))), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(OssMergeConfig::load(Some(Path::new(&long_component))), "config path component too long")
}

#[test]
fn load_rejects_missing_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(OssMergeConfig::load(Some(&path)), "config io error")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let file = write_config(&vec![b'#'; 1_048_577])?;
    assert_invalid(OssMergeConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let file = write_config(&[0xFF, 0xFE, 0xFF])?;
    assert_invalid(OssMergeConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_rejects_unknown_sections() -> TestResult {
    let file = write_config(b"[server]\nport = 8080\n")?;
    assert_invalid(OssMergeConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn load_accepts_empty_file_with_defaults() -> TestResult {
    let file = write_config(b"")?;
    let config = OssMergeConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config != OssMergeConfig::default() {
        return Err("empty config should equal defaults".to_string());
    }
    Ok(())
}

#[test]
fn load_reads_every_section() -> TestResult {
    let file = write_config(
        br#"
[run]
actions = ["services", "tribes", "rmc", "rmc-rescan", "lenient"]
pattern = "cloud*"
reference_date = "2024-06-01"

[naming]
do_not_merge = ["console"]

[clearinghouse]
blacklist = ["on AWS"]

[platform]
cloud_platform_name = "ibm-cloud"
support_tier1_prefixes = ["SUP-"]

[inputs]
snapshot = "snapshot.json"
parts = "parts.json"

[logging]
level = "debug"
format = "json"
"#,
    )?;
    let config = OssMergeConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.run.pattern != "cloud*" || config.naming.do_not_merge != vec!["console".to_string()] {
        return Err("run/naming sections not read".to_string());
    }
    if config.logging.format != LogFormat::Json || config.logging.level != "debug" {
        return Err("logging section not read".to_string());
    }
    if config.inputs.snapshot.as_deref() != Some(Path::new("snapshot.json")) {
        return Err("inputs section not read".to_string());
    }
    Ok(())
}
