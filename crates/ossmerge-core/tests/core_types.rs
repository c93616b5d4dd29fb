// crates/ossmerge-core/tests/core_types.rs
// ============================================================================
// Module: Core Type Tests
// Description: Names, location CRNs, tags, run actions and validation logs.
// ============================================================================
//! ## Overview
//! Checks the value types shared by every merger: name folding, tag expiry,
//! run-action parsing and the status summaries of validation logs.

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

use std::str::FromStr;

use ossmerge_core::CrnType;
use ossmerge_core::IssueTag;
use ossmerge_core::LocationCrn;
use ossmerge_core::RagStatus;
use ossmerge_core::RunAction;
use ossmerge_core::RunActionOutcome;
use ossmerge_core::RunActions;
use ossmerge_core::Severity;
use ossmerge_core::Tag;
use ossmerge_core::TagEntry;
use ossmerge_core::TagError;
use ossmerge_core::TagSet;
use ossmerge_core::ValidationLog;
use ossmerge_core::canonical_name;
use ossmerge_core::comparable_name;
use ossmerge_core::is_canonical_name;
use ossmerge_core::normalize_location_crn;
use proptest::prelude::*;
use time::macros::date;

// ============================================================================
// SECTION: Names
// ============================================================================

#[test]
fn comparable_names_fold_case_and_punctuation() {
    assert_eq!(comparable_name("Cloud Object-Storage"), "cloudobjectstorage");
    assert_eq!(comparable_name(" cloud_object.storage "), "cloudobjectstorage");
    assert_eq!(comparable_name("db#2"), "db#2");
}

#[test]
fn canonical_names_use_single_hyphens() {
    assert_eq!(canonical_name("Cloud  Object_Storage"), "cloud-object-storage");
    assert_eq!(canonical_name("-kafka-"), "kafka");
    assert!(is_canonical_name("event-streams"));
    assert!(!is_canonical_name("Event Streams"));
    assert!(!is_canonical_name(""));
}

#[test]
fn location_crns_normalize_to_the_location_form() {
    let normalized = normalize_location_crn("CRN:v1:bluemix:public:cloudant:us-south:a/123::").unwrap();
    assert_eq!(normalized, "crn:v1:bluemix:public::us-south::::");
    assert_eq!(normalize_location_crn("us-south"), None);

    let crn = LocationCrn::parse("crn:v1:satellite:public::satcon_dal::::").unwrap();
    assert_eq!(crn.crn_type(), CrnType::Public);
    assert!(crn.is_satellite());
}

// ============================================================================
// SECTION: Tags
// ============================================================================

#[test]
fn tag_expiry_suffix_round_trips() {
    let entry = TagEntry::parse("pnp-include@2024-01-31").unwrap();
    assert_eq!(entry.tag, Tag::PnpInclude);
    assert_eq!(entry.expires, Some(date!(2024 - 01 - 31)));
    assert_eq!(entry.render(), "pnp-include@2024-01-31");
}

#[test]
fn malformed_tags_are_reported_and_skipped() {
    let (tags, errors) = TagSet::parse_lenient(&["pnp-exclude", "no-such-tag", "oss-test@tomorrow", ""]);
    assert!(tags.contains(Tag::PnpExclude));
    assert_eq!(tags.len(), 1);
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], TagError::Unknown(_)));
    assert!(matches!(errors[1], TagError::InvalidExpiry { .. }));
}

#[test]
fn expired_tags_are_removed_after_their_last_day() {
    let mut tags = TagSet::new();
    tags.insert_until(Tag::PnpInclude, date!(2024 - 01 - 31));
    tags.insert_until(Tag::OssOnly, date!(2024 - 02 - 01));
    tags.insert(Tag::ClientFacing);

    let expired = tags.remove_expired(date!(2024 - 02 - 01));
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].tag, Tag::PnpInclude);
    assert!(tags.contains(Tag::OssOnly));
    assert!(tags.contains(Tag::ClientFacing));
}

#[test]
fn replacing_a_family_keeps_one_member() {
    let mut tags: TagSet = [Tag::CrnGreen, Tag::CrnRed, Tag::OssOnly].into_iter().collect();
    tags.replace_family(&[Tag::CrnGreen, Tag::CrnYellow, Tag::CrnRed], Tag::CrnYellow);
    assert_eq!(tags.to_tokens(), vec!["oss-only".to_string(), "crn-yellow".to_string()]);
}

// ============================================================================
// SECTION: Run Actions
// ============================================================================

#[test]
fn run_actions_parse_by_name() {
    assert_eq!(RunAction::from_str("rmc-rescan").unwrap(), RunAction::RmcRescan);
    assert_eq!(RunAction::from_str("bogus").unwrap_err().0, "bogus");

    let standard = RunActions::standard();
    assert!(standard.contains(RunAction::Services));
    assert!(!standard.contains(RunAction::Lenient));
    let trimmed = standard.without(RunAction::Rmc).with(RunAction::Lenient);
    assert!(!trimmed.contains(RunAction::Rmc));
    assert!(trimmed.contains(RunAction::Lenient));
}

#[test]
fn run_action_sets_serialize_as_names() {
    let actions: RunActions = [RunAction::Lenient, RunAction::Services].into_iter().collect();
    let json = serde_json::to_string(&actions).unwrap();
    assert_eq!(json, r#"["services","lenient"]"#);
}

// ============================================================================
// SECTION: Validation Logs
// ============================================================================

#[test]
fn duplicate_issues_are_stored_once() {
    let mut log = ValidationLog::new("svc");
    assert!(log.add(Severity::Warning, &[IssueTag::Data], "same", "details"));
    assert!(!log.add(Severity::Warning, &[IssueTag::Data], "same", "details"));
    assert!(log.add(Severity::Warning, &[IssueTag::Data], "same", "other details"));
    assert_eq!(log.len(), 2);
    assert_eq!(log.count(Severity::Warning), 2);
}

#[test]
fn crn_status_only_counts_crn_issues() {
    let mut log = ValidationLog::new("svc");
    log.add(Severity::Severe, &[IssueTag::Data], "data problem", "");
    log.add(Severity::Warning, &[IssueTag::Crn], "crn problem", "");
    log.add(Severity::Deferred, &[IssueTag::Crn], "deferred crn problem", "");

    assert_eq!(log.crn_status(), RagStatus::Yellow);
    assert_eq!(log.overall_status(), RagStatus::Red);
    assert_eq!(log.worst(), Some(Severity::Severe));
}

#[test]
fn deferred_is_green() {
    let mut log = ValidationLog::new("svc");
    log.add(Severity::Deferred, &[IssueTag::Crn], "suppressed", "");
    assert_eq!(log.crn_status(), RagStatus::Green);
}

#[test]
fn run_action_outcomes_are_recorded() {
    let mut log = ValidationLog::new("svc");
    log.record_run_action(RunAction::Services, RunActionOutcome::Executed);
    assert_eq!(log.run_action(RunAction::Services), Some(RunActionOutcome::Executed));
    assert_eq!(log.run_action(RunAction::Rmc), None);
}

proptest! {
    #[test]
    fn sorted_logs_hash_alike_regardless_of_insertion_order(
        titles in prop::collection::btree_set("[a-f]{1,4}", 1..8),
    ) {
        let titles: Vec<String> = titles.into_iter().collect();
        let mut forward = ValidationLog::new("svc");
        for title in &titles {
            forward.add(Severity::Warning, &[], title.clone(), "");
        }
        let mut backward = ValidationLog::new("svc");
        for title in titles.iter().rev() {
            backward.add(Severity::Warning, &[], title.clone(), "");
        }
        forward.sort();
        backward.sort();
        prop_assert_eq!(forward.checksum().unwrap(), backward.checksum().unwrap());
    }

    #[test]
    fn canonical_names_are_fixed_points(raw in "[ A-Za-z0-9_./:-]{0,16}") {
        let once = canonical_name(&raw);
        prop_assert_eq!(canonical_name(&once), once.clone());
        prop_assert!(once.is_empty() || is_canonical_name(&once));
    }
}
