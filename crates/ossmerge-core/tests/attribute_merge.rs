// crates/ossmerge-core/tests/attribute_merge.rs
// ============================================================================
// Module: Attribute Merge Tests
// Description: Precedence, missing-value and prior-fallback behavior.
// ============================================================================
//! ## Overview
//! Exercises the single-attribute merge primitive: first present source
//! wins, later disagreements are warnings, and a value absent everywhere is
//! reported exactly once.

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

use ossmerge_core::Severity;
use ossmerge_core::SourceKind;
use ossmerge_core::ValidationLog;
use ossmerge_core::runtime::AttributeError;
use ossmerge_core::runtime::AttributeMerge;
use ossmerge_core::runtime::LoadedSources;
use ossmerge_core::runtime::MergeContext;
use proptest::prelude::*;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn all_loaded() -> MergeContext {
    MergeContext::new(LoadedSources::all(), false)
}

const DIRECTORY_SOURCES: [SourceKind; 5] =
    [SourceKind::Catalog, SourceKind::ServiceNow, SourceKind::ScorecardV1, SourceKind::Iam, SourceKind::Rmc];

const SEVERITIES: [Severity; 5] =
    [Severity::Info, Severity::Minor, Severity::Warning, Severity::Severe, Severity::Critical];

// ============================================================================
// SECTION: Precedence
// ============================================================================

#[test]
fn first_source_prevails_and_later_values_are_reported() {
    let mut log = ValidationLog::new("svc");
    let value = AttributeMerge::new("X")
        .if_missing(Severity::Warning, &[])
        .value(SourceKind::Catalog, "a".to_string())
        .value(SourceKind::ServiceNow, "b".to_string())
        .value(SourceKind::ScorecardV1, String::new())
        .prior(Some("p".to_string()))
        .resolve(&all_loaded(), &mut log)
        .unwrap();

    assert_eq!(value, "a");
    assert_eq!(log.len(), 2);
    let mismatch: Vec<_> = log.find("different value in ServiceNow (first source prevails)").collect();
    assert_eq!(mismatch.len(), 1);
    assert_eq!(mismatch[0].severity, Severity::Warning);
    let missing: Vec<_> = log.find("missing from ScorecardV1").collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].severity, Severity::Warning);
}

#[test]
fn prior_is_copied_when_no_directory_produced_data() {
    let mut log = ValidationLog::new("svc");
    let value = AttributeMerge::new("DisplayName")
        .value(SourceKind::Catalog, "Fresh".to_string())
        .prior(Some("Kept".to_string()))
        .resolve(&MergeContext::new(LoadedSources::default(), false), &mut log)
        .unwrap();

    assert_eq!(value, "Kept");
    assert!(log.has_title("DisplayName: copying from prior run"));
}

#[test]
fn candidates_from_unloaded_sources_are_discarded() {
    let mut log = ValidationLog::new("svc");
    let loaded = LoadedSources { service_now: true, ..LoadedSources::default() };
    let value = AttributeMerge::new("DisplayName")
        .value(SourceKind::Catalog, "Stale".to_string())
        .value(SourceKind::ServiceNow, "Fresh".to_string())
        .prior(Some("Kept".to_string()))
        .resolve(&MergeContext::new(loaded, false), &mut log)
        .unwrap();

    assert_eq!(value, "Fresh");
    assert!(log.find("different value").next().is_none());
}

#[test]
fn prior_is_not_used_when_a_loaded_source_is_empty() {
    let mut log = ValidationLog::new("svc");
    let value = AttributeMerge::new("DisplayName")
        .value(SourceKind::Catalog, String::new())
        .prior(Some("Kept".to_string()))
        .resolve(&all_loaded(), &mut log)
        .unwrap();

    assert_eq!(value, "");
    assert!(log.has_title("DisplayName: not set from any source"));
}

#[test]
fn attribute_without_any_record_is_ignored() {
    let mut log = ValidationLog::new("svc");
    let value = AttributeMerge::<String>::new("Owner")
        .if_missing(Severity::Severe, &[])
        .candidate(SourceKind::Catalog, None)
        .candidate(SourceKind::ServiceNow, None)
        .prior(None)
        .resolve(&all_loaded(), &mut log)
        .unwrap();

    assert_eq!(value, "");
    assert_eq!(log.len(), 1);
    assert_eq!(log.issues()[0].severity, Severity::Ignore);
}

// ============================================================================
// SECTION: Malformed Calls
// ============================================================================

#[test]
fn merge_without_prior_is_rejected() {
    let mut log = ValidationLog::new("svc");
    let err = AttributeMerge::new("X")
        .value(SourceKind::Catalog, "a".to_string())
        .resolve(&all_loaded(), &mut log)
        .unwrap_err();
    assert!(matches!(err, AttributeError::MissingPrior { .. }));
}

#[test]
fn merge_with_only_prior_is_rejected() {
    let mut log = ValidationLog::new("svc");
    let err = AttributeMerge::<String>::new("X").prior(Some("p".to_string())).resolve(&all_loaded(), &mut log).unwrap_err();
    assert!(matches!(err, AttributeError::NoCandidates { .. }));
}

#[test]
fn candidate_after_prior_is_rejected() {
    let mut log = ValidationLog::new("svc");
    let err = AttributeMerge::new("X")
        .value(SourceKind::Catalog, "a".to_string())
        .prior(None)
        .value(SourceKind::ServiceNow, "b".to_string())
        .resolve(&all_loaded(), &mut log)
        .unwrap_err();
    assert!(matches!(err, AttributeError::CandidateAfterPrior { .. }));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn empty_everywhere_yields_one_issue_at_missing_severity(
        present in prop::collection::vec(any::<bool>(), DIRECTORY_SOURCES.len()),
        severity_index in 0..SEVERITIES.len(),
    ) {
        prop_assume!(present.iter().any(|flag| *flag));
        let severity = SEVERITIES[severity_index];
        let mut merge = AttributeMerge::new("Attr").if_missing(severity, &[]);
        for (source, has_record) in DIRECTORY_SOURCES.iter().zip(&present) {
            merge = merge.candidate(source.clone(), has_record.then(String::new));
        }
        let mut log = ValidationLog::new("svc");
        let value = merge.prior(Some(String::new())).resolve(&all_loaded(), &mut log).unwrap();

        prop_assert_eq!(value, "");
        prop_assert_eq!(log.len(), 1);
        prop_assert_eq!(log.issues()[0].severity, severity);
        prop_assert!(log.has_title("Attr: not set from any source"));
    }

    #[test]
    fn first_non_empty_value_always_wins(
        values in prop::collection::vec(prop::option::of("[a-c]{0,2}"), DIRECTORY_SOURCES.len()),
    ) {
        let expected = values.iter().flatten().find(|value| !value.is_empty()).cloned().unwrap_or_default();
        let mut merge = AttributeMerge::new("Attr");
        for (source, value) in DIRECTORY_SOURCES.iter().zip(&values) {
            merge = merge.candidate(source.clone(), value.clone());
        }
        let mut log = ValidationLog::new("svc");
        let value = merge.prior(None).resolve(&all_loaded(), &mut log).unwrap();
        prop_assert_eq!(value, expected);
    }
}
