// crates/ossmerge-core/tests/merge_run.rs
// ============================================================================
// Module: Merge Run Tests
// Description: End-to-end merge runs over in-memory snapshots.
// ============================================================================
//! ## Overview
//! Drives [`MergeEngine`] over [`SnapshotSources`] to check the cross-entry
//! behavior that only shows up in a full run: status-category voiding,
//! composite parents, name collisions, lenient loading, prior copies and
//! deterministic output.

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

use std::collections::BTreeMap;

use ossmerge_core::CatalogKind;
use ossmerge_core::CatalogResource;
use ossmerge_core::DoNotMergeNames;
use ossmerge_core::EntryType;
use ossmerge_core::GeneralInfo;
use ossmerge_core::IncidentItem;
use ossmerge_core::IncidentRecord;
use ossmerge_core::IncidentStatusPage;
use ossmerge_core::MergeConfig;
use ossmerge_core::MergeControl;
use ossmerge_core::MergeEngine;
use ossmerge_core::MergeError;
use ossmerge_core::MergeOutput;
use ossmerge_core::OperationalStatus;
use ossmerge_core::OutputRecord;
use ossmerge_core::PartsTable;
use ossmerge_core::PriorRecord;
use ossmerge_core::PriorService;
use ossmerge_core::RunAction;
use ossmerge_core::RunActions;
use ossmerge_core::ScorecardSegment;
use ossmerge_core::ScorecardTribe;
use ossmerge_core::SegmentId;
use ossmerge_core::SegmentRecord;
use ossmerge_core::ServiceRecord;
use ossmerge_core::Severity;
use ossmerge_core::SnapshotDirectory;
use ossmerge_core::SnapshotSources;
use ossmerge_core::Tag;
use ossmerge_core::TribeId;
use ossmerge_core::TribeRecord;
use ossmerge_core::ValidationLog;
use ossmerge_core::interfaces::MonitoringSource;
use ossmerge_core::runtime::GlobalPhase;
use ossmerge_core::runtime::PhaseController;
use ossmerge_core::runtime::PhaseError;
use time::macros::date;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn incident(name: &str, category_id: &str) -> IncidentRecord {
    IncidentRecord {
        item: IncidentItem {
            crn_service_name: name.to_string(),
            display_name: name.to_string(),
            entry_type: EntryType::Service,
            operational_status: OperationalStatus::Ga,
            client_facing: true,
            status_page: IncidentStatusPage { category_id: category_id.to_string(), ..IncidentStatusPage::default() },
            ..IncidentItem::default()
        },
        ..IncidentRecord::default()
    }
}

fn catalog(kind: CatalogKind, name: &str, id: &str, parent_id: &str) -> CatalogResource {
    CatalogResource {
        kind,
        name: name.to_string(),
        id: id.to_string(),
        parent_id: parent_id.to_string(),
        active: true,
        display_name: name.to_string(),
        ..CatalogResource::default()
    }
}

fn prior_service(name: &str, display: &str, tags: &[&str]) -> PriorRecord {
    let mut control = MergeControl::new(name);
    control.tags = tags.iter().map(|tag| (*tag).to_string()).collect();
    PriorRecord::Service(Box::new(PriorService {
        record: ServiceRecord {
            reference_display_name: display.to_string(),
            general: GeneralInfo {
                entry_type: EntryType::Service,
                operational_status: OperationalStatus::Ga,
                ..GeneralInfo::default()
            },
            ..ServiceRecord::named(name)
        },
        merge_control: Some(control),
        validation: None,
    }))
}

fn config(actions: RunActions) -> MergeConfig {
    MergeConfig { actions, reference_date: date!(2024 - 06 - 01), ..MergeConfig::default() }
}

fn run(snapshot: &SnapshotSources, actions: RunActions) -> Result<MergeOutput, MergeError> {
    let monitoring: &dyn MonitoringSource = snapshot;
    MergeEngine::new(config(actions)).run(snapshot, &PartsTable::default(), Some(monitoring))
}

// ============================================================================
// SECTION: Status Categories
// ============================================================================

#[test]
fn shared_category_without_parent_is_voided() {
    let snapshot = SnapshotSources {
        incident: vec![incident("svc-x", "c-5"), incident("svc-y", "c-5")],
        ..SnapshotSources::default()
    };
    let output = run(&snapshot, RunActions::standard()).unwrap();

    for name in ["svc-x", "svc-y"] {
        let record = output.service(name).unwrap();
        assert_eq!(record.status_page.category_id, "");
        assert_eq!(record.status_page.category_parent, "");
        assert!(!record.general.oss_tags.contains(Tag::PnpEnabled));

        let log = output.service_log(name).unwrap();
        let issues: Vec<_> =
            log.find("StatusPage.CategoryID used in more than one entry but Category Parent is blank").collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Severe);
    }
}

#[test]
fn unshared_category_is_kept() {
    let snapshot = SnapshotSources { incident: vec![incident("svc-x", "c-5")], ..SnapshotSources::default() };
    let output = run(&snapshot, RunActions::standard()).unwrap();
    assert_eq!(output.service("svc-x").unwrap().status_page.category_id, "c-5");
}

// ============================================================================
// SECTION: PnP
// ============================================================================

#[test]
fn exclude_tag_keeps_pnp_disabled() {
    let snapshot = SnapshotSources {
        prior: vec![prior_service("svc-x", "Service X", &["pnp-exclude"])],
        incident: vec![incident("svc-x", "cat-7")],
        ..SnapshotSources::default()
    };
    let output = run(&snapshot, RunActions::standard()).unwrap();
    let record = output.service("svc-x").unwrap();
    assert!(record.general.oss_tags.contains(Tag::PnpExclude));
    assert!(!record.general.oss_tags.contains(Tag::PnpEnabled));
}

// ============================================================================
// SECTION: Parents and Collisions
// ============================================================================

#[test]
fn composite_children_point_at_their_composite() {
    let snapshot = SnapshotSources {
        catalog: vec![
            catalog(CatalogKind::Composite, "big-bundle", "c-1", ""),
            catalog(CatalogKind::Service, "small-part", "c-2", "c-1"),
        ],
        ..SnapshotSources::default()
    };
    let output = run(&snapshot, RunActions::standard()).unwrap();

    assert_eq!(output.service("small-part").unwrap().general.parent_resource_name, "big-bundle");
    assert_eq!(output.service("big-bundle").unwrap().general.parent_resource_name, "");
}

#[test]
fn colliding_reference_names_are_quarantined() {
    let snapshot = SnapshotSources {
        incident: vec![incident("ab", ""), incident("ab#", "")],
        ..SnapshotSources::default()
    };
    let output = run(&snapshot, RunActions::standard()).unwrap();

    assert_eq!(output.counters.quarantined, 1);
    assert_eq!(output.services().filter(|record| record.reference_resource_name == "ab").count(), 1);
    assert!(output.run_log.find("reference name is derived for more than one entry").next().is_some());
    let log = output.service_log("ab").unwrap();
    assert_eq!(log.find("reference name is derived for more than one entry").count(), 1);
}

#[test]
fn skipped_shared_names_are_logged_on_the_run_log() {
    let mut first = incident("svc-a", "");
    first.item.display_name = "Common Name".to_string();
    let mut second = incident("svc-b", "");
    second.item.display_name = "Common Name".to_string();
    let mut blank = incident("svc-c", "");
    blank.item.display_name = String::new();
    let snapshot = SnapshotSources { incident: vec![first, second, blank], ..SnapshotSources::default() };
    let config = MergeConfig {
        do_not_merge: DoNotMergeNames::new(["Common Name"]),
        ..config(RunActions::standard())
    };
    let monitoring: &dyn MonitoringSource = &snapshot;
    let output = MergeEngine::new(config).run(&snapshot, &PartsTable::default(), Some(monitoring)).unwrap();

    assert_eq!(output.counters.name_groups, 3);
    let do_not_merge: Vec<_> = output.run_log.find("do-not-merge name not used").collect();
    for name in ["svc-a", "svc-b"] {
        assert!(do_not_merge.iter().any(|issue| issue.details.starts_with(name)));
    }
    assert!(do_not_merge.iter().all(|issue| issue.severity == Severity::Minor));
    let blank_names: Vec<_> = output
        .run_log
        .find("zero-length name not used")
        .filter(|issue| issue.details.starts_with("svc-c"))
        .collect();
    assert!(!blank_names.is_empty());
    assert!(blank_names.iter().all(|issue| issue.severity == Severity::Minor));
}

// ============================================================================
// SECTION: Segments and Tribes
// ============================================================================

fn prior_segment(id: &str, default: bool) -> PriorRecord {
    let mut record =
        SegmentRecord { segment_id: SegmentId::new(id), display_name: format!("Segment {id}"), ..SegmentRecord::default() };
    if default {
        record.tags.insert(Tag::DefaultSegment);
    }
    PriorRecord::Segment(record)
}

fn tribe(id: &str, name: &str) -> ScorecardTribe {
    ScorecardTribe { id: TribeId::new(id), name: name.to_string(), ..ScorecardTribe::default() }
}

fn tribes(output: &MergeOutput) -> Vec<(&TribeRecord, &ValidationLog)> {
    output
        .records
        .iter()
        .filter_map(|record| match record {
            OutputRecord::Tribe { record, validation, .. } => Some((record, validation)),
            _ => None,
        })
        .collect()
}

#[test]
fn duplicate_tribes_are_logged_and_names_made_unique() {
    let snapshot = SnapshotSources {
        scorecard_segments: vec![ScorecardSegment {
            id: SegmentId::new("s-1"),
            name: "Segment One".to_string(),
            tribes: vec![tribe("t-1", "Alpha"), tribe("t-1", "Alpha Again"), tribe("t-2", "Alpha")],
            ..ScorecardSegment::default()
        }],
        ..SnapshotSources::default()
    };
    let output = run(&snapshot, RunActions::standard()).unwrap();

    let merged = tribes(&output);
    let names: Vec<(&str, &str)> =
        merged.iter().map(|(record, _)| (record.tribe_id.as_str(), record.display_name.as_str())).collect();
    assert_eq!(names, vec![("t-1", "Alpha"), ("t-2", "Alpha#2")]);
    let duplicate: Vec<_> = merged[0].1.find("duplicate tribe id").collect();
    assert_eq!(duplicate.len(), 1);
    assert_eq!(duplicate[0].severity, Severity::Severe);
    assert!(merged.iter().all(|(record, _)| record.segment_id.as_str() == "s-1"));
}

#[test]
fn exactly_one_default_segment_is_required() {
    let cases = [
        (vec![prior_segment("s-1", true), prior_segment("s-2", false)], None),
        (
            vec![prior_segment("s-1", true), prior_segment("s-2", true)],
            Some(("more than one segment is tagged default-segment", Severity::Severe)),
        ),
        (vec![prior_segment("s-1", false)], Some(("no segment is tagged default-segment", Severity::Warning))),
    ];
    for (prior, expected) in cases {
        let snapshot = SnapshotSources { prior, ..SnapshotSources::default() };
        let output = run(&snapshot, RunActions::standard()).unwrap();
        let issues: Vec<_> = output.run_log.find("tagged default-segment").collect();
        match expected {
            None => assert!(issues.is_empty()),
            Some((title, severity)) => {
                assert_eq!(issues.len(), 1, "{title}");
                assert_eq!(issues[0].title, title);
                assert_eq!(issues[0].severity, severity);
            }
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn unavailable_directory_fails_the_run() {
    let snapshot = SnapshotSources { incident: vec![incident("svc-x", "")], ..SnapshotSources::default() }
        .with_unavailable(SnapshotDirectory::Catalog);
    let err = run(&snapshot, RunActions::standard()).unwrap_err();
    assert!(matches!(err, MergeError::Load(_)));
}

#[test]
fn lenient_run_records_the_failed_directory() {
    let snapshot = SnapshotSources { incident: vec![incident("svc-x", "")], ..SnapshotSources::default() }
        .with_unavailable(SnapshotDirectory::Catalog);
    let output = run(&snapshot, RunActions::standard().with(RunAction::Lenient)).unwrap();

    assert!(output.run_log.has_title("Catalog could not be loaded"));
    let log = output.service_log("svc-x").unwrap();
    let issues: Vec<_> = log.find("Catalog could not be loaded").collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Critical);
}

#[test]
fn test_records_load_only_in_test_mode() {
    let snapshot = SnapshotSources {
        incident: vec![incident("svc-x", "")],
        incident_test: vec![incident("svc-test", "")],
        ..SnapshotSources::default()
    };
    let normal = run(&snapshot, RunActions::standard()).unwrap();
    assert!(normal.service("svc-test").is_none());

    let test_mode = run(&snapshot, RunActions::standard().with(RunAction::TestMode)).unwrap();
    assert!(test_mode.service("svc-test").is_some());
}

#[test]
fn name_pattern_restricts_the_run() {
    let snapshot = SnapshotSources {
        incident: vec![incident("kafka-one", ""), incident("cloudant", "")],
        ..SnapshotSources::default()
    };
    let config = MergeConfig { pattern: "kafka*".to_string(), ..config(RunActions::standard()) };
    let output = MergeEngine::new(config).run(&snapshot, &PartsTable::default(), None).unwrap();
    assert!(output.service("kafka-one").is_some());
    assert!(output.service("cloudant").is_none());
}

// ============================================================================
// SECTION: Prior Copies
// ============================================================================

#[test]
fn disabled_service_merge_copies_prior_records() {
    let snapshot = SnapshotSources {
        prior: vec![prior_service("old-svc", "Old Service", &[])],
        incident: vec![incident("new-svc", "")],
        ..SnapshotSources::default()
    };
    let output = run(&snapshot, RunActions::standard().without(RunAction::Services)).unwrap();

    assert_eq!(output.service("old-svc").unwrap().reference_display_name, "Old Service");
    assert!(output.service_log("old-svc").unwrap().has_title("entry copied from prior run"));
    assert!(output.service("new-svc").is_none());
    assert_eq!(output.counters.copied_from_prior, 1);
    assert_eq!(output.counters.aborted, 1);
}

#[test]
fn expired_override_tags_are_dropped() {
    let snapshot = SnapshotSources {
        prior: vec![prior_service("svc-x", "Service X", &["pnp-include@2024-01-31", "oss-only"])],
        incident: vec![incident("svc-x", "")],
        ..SnapshotSources::default()
    };
    let output = run(&snapshot, RunActions::standard()).unwrap();
    let record = output.service("svc-x").unwrap();
    assert!(!record.general.oss_tags.contains(Tag::PnpInclude));
    assert!(record.general.oss_tags.contains(Tag::OssOnly));
    assert!(output.service_log("svc-x").unwrap().has_title("tag pnp-include has expired"));
}

// ============================================================================
// SECTION: Monitoring
// ============================================================================

#[test]
fn monitors_are_collected_when_enabled() {
    let snapshot = SnapshotSources {
        incident: vec![incident("svc-x", "")],
        monitors: BTreeMap::from([("svc-x".to_string(), vec!["b-uptime".to_string(), "a-uptime".to_string()])]),
        ..SnapshotSources::default()
    };
    let without = run(&snapshot, RunActions::standard()).unwrap();
    assert!(without.service("svc-x").unwrap().operations.monitors.is_empty());

    let with = run(&snapshot, RunActions::standard().with(RunAction::Monitoring)).unwrap();
    assert_eq!(with.service("svc-x").unwrap().operations.monitors, vec!["a-uptime", "b-uptime"]);
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

#[test]
fn identical_inputs_produce_identical_output() {
    let snapshot = SnapshotSources {
        prior: vec![prior_service("svc-x", "Service X", &["pnp-candidate"])],
        catalog: vec![
            catalog(CatalogKind::Composite, "big-bundle", "c-1", ""),
            catalog(CatalogKind::Service, "svc-x", "c-2", "c-1"),
        ],
        incident: vec![incident("svc-x", "c-5"), incident("svc-y", "c-5"), incident("svc-z", "c-9")],
        ..SnapshotSources::default()
    };
    let first = run(&snapshot, RunActions::standard()).unwrap();
    let second = run(&snapshot, RunActions::standard()).unwrap();

    assert_eq!(first.records, second.records);
    assert_eq!(first.checksum().unwrap(), second.checksum().unwrap());
    let keys: Vec<String> = first.records.iter().map(|record| record.sort_key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

// ============================================================================
// SECTION: Phase Discipline
// ============================================================================

#[test]
fn phases_advance_one_step_at_a_time() {
    let mut phases = PhaseController::new();
    let err = phases.advance(GlobalPhase::ServicesOne).unwrap_err();
    assert!(matches!(err, PhaseError::OutOfOrder { .. }));

    phases.advance(GlobalPhase::Segments).unwrap();
    assert_eq!(phases.current(), GlobalPhase::Segments);
    assert!(phases.expect("test", GlobalPhase::ServicesTwo).is_err());
    assert!(phases.set_finalized().is_err());
}

#[test]
fn finalize_shortcut_is_allowed_from_start() {
    let mut phases = PhaseController::new();
    phases.set_finalized().unwrap();
    assert_eq!(phases.current(), GlobalPhase::Finalized);
}
