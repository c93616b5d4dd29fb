//! Run-section validation tests for ossmerge-config.
// crates/ossmerge-config/tests/run_validation.rs
// =============================================================================
// Module: Run Validation Tests
// Description: Validate run actions, patterns, dates and platform values.
// Purpose: Ensure inconsistent run configurations are rejected before merging.
// =============================================================================

use ossmerge_config::ConfigError;
use ossmerge_config::OssMergeConfig;
use ossmerge_core::RunAction;
use time::macros::date;

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
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn unknown_run_action_is_rejected() -> TestResult {
    assert_invalid(OssMergeConfig::parse("[run]\nactions = [\"services\", \"teleport\"]\n"), "unknown run action: teleport")
}

#[test]
fn rescan_requires_rmc() -> TestResult {
    assert_invalid(OssMergeConfig::parse("[run]\nactions = [\"services\", \"rmc-rescan\"]\n"), "rmc-rescan requires rmc")
}

#[test]
fn refresh_pricing_requires_include_pricing() -> TestResult {
    assert_invalid(
        OssMergeConfig::parse("[run]\nactions = [\"refresh-pricing\"]\n"),
        "refresh-pricing requires include-pricing",
    )
}

#[test]
fn pattern_with_regex_syntax_is_rejected() -> TestResult {
    assert_invalid(OssMergeConfig::parse("[run]\npattern = \"cloud[0-9]+\"\n"), "unsupported characters")
}

#[test]
fn blank_pattern_is_rejected() -> TestResult {
    assert_invalid(OssMergeConfig::parse("[run]\npattern = \"  \"\n"), "run.pattern is required")
}

#[test]
fn malformed_reference_date_is_rejected() -> TestResult {
    assert_invalid(OssMergeConfig::parse("[run]\nreference_date = \"06/01/2024\"\n"), "YYYY-MM-DD")
}

#[test]
fn empty_do_not_merge_name_is_rejected() -> TestResult {
    assert_invalid(OssMergeConfig::parse("[naming]\ndo_not_merge = [\"\"]\n"), "do_not_merge")
}

#[test]
fn non_canonical_platform_name_is_rejected() -> TestResult {
    assert_invalid(
        OssMergeConfig::parse("[platform]\ncloud_platform_name = \"IBM Cloud\"\n"),
        "must be a canonical name",
    )
}

#[test]
fn unknown_log_level_is_rejected() -> TestResult {
    assert_invalid(OssMergeConfig::parse("[logging]\nlevel = \"verbose\"\n"), "logging.level")
}

#[test]
fn merge_config_uses_today_without_reference_date() -> TestResult {
    let config = OssMergeConfig::parse("[run]\nactions = [\"services\", \"lenient\"]\n").map_err(|err| err.to_string())?;
    let merge = config.to_merge_config(date!(2025 - 03 - 04)).map_err(|err| err.to_string())?;
    if merge.reference_date != date!(2025 - 03 - 04) {
        return Err("reference date should default to today".to_string());
    }
    if !merge.actions.contains(RunAction::Lenient) || merge.actions.contains(RunAction::Rmc) {
        return Err("run actions not converted".to_string());
    }
    Ok(())
}

#[test]
fn merge_config_prefers_configured_reference_date() -> TestResult {
    let config = OssMergeConfig::parse("[run]\nreference_date = \"2024-06-01\"\n[naming]\ndo_not_merge = [\"console\"]\n")
        .map_err(|err| err.to_string())?;
    let merge = config.to_merge_config(date!(2025 - 03 - 04)).map_err(|err| err.to_string())?;
    if merge.reference_date != date!(2024 - 06 - 01) {
        return Err("configured reference date should win".to_string());
    }
    if !merge.do_not_merge.contains("console") {
        return Err("do-not-merge names not converted".to_string());
    }
    Ok(())
}

#[test]
fn default_config_is_the_standard_run() -> TestResult {
    let merge = OssMergeConfig::default().to_merge_config(date!(2025 - 01 - 01)).map_err(|err| err.to_string())?;
    if merge.actions != ossmerge_core::RunActions::standard() || merge.pattern != "*" {
        return Err("defaults should match the standard run".to_string());
    }
    Ok(())
}
