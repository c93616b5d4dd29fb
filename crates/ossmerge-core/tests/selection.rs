// crates/ossmerge-core/tests/selection.rs
// ============================================================================
// Module: Source Selection Tests
// Description: Primary-record selection and shared-name grouping.
// ============================================================================
//! ## Overview
//! Covers the per-source primary selectors and the transitive closure built
//! by the name-group builder.

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
use std::collections::BTreeSet;

use ossmerge_core::CatalogResource;
use ossmerge_core::CatalogVisibility;
use ossmerge_core::DoNotMergeNames;
use ossmerge_core::IncidentItem;
use ossmerge_core::IncidentRecord;
use ossmerge_core::ScorecardEntry;
use ossmerge_core::Severity;
use ossmerge_core::ValidationLog;
use ossmerge_core::VisibilityRestriction;
use ossmerge_core::comparable_name;
use ossmerge_core::runtime::SourceSlot;
use ossmerge_core::runtime::names::NameGroupBuilder;
use ossmerge_core::runtime::names::NameSource;
use ossmerge_core::runtime::selector::ChosenNames;
use ossmerge_core::runtime::selector::select_catalog;
use ossmerge_core::runtime::selector::select_incident;
use ossmerge_core::runtime::selector::select_scorecard;
use proptest::prelude::*;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn scorecard(name: &str) -> ScorecardEntry {
    ScorecardEntry { name: name.to_string(), ..ScorecardEntry::default() }
}

fn incident(name: &str, retired: bool) -> IncidentRecord {
    IncidentRecord {
        item: IncidentItem { crn_service_name: name.to_string(), retired, ..IncidentItem::default() },
        ..IncidentRecord::default()
    }
}

fn catalog(name: &str, restriction: VisibilityRestriction) -> CatalogResource {
    CatalogResource {
        name: name.to_string(),
        visibility: CatalogVisibility { restrictions: restriction, ..CatalogVisibility::default() },
        ..CatalogResource::default()
    }
}

fn slot<T>(records: Vec<T>) -> SourceSlot<T> {
    let mut slot = SourceSlot::default();
    for record in records {
        slot.push(record);
    }
    slot
}

// ============================================================================
// SECTION: Primary Selection
// ============================================================================

#[test]
fn scorecard_prefers_the_prior_name() {
    let mut entries = slot(vec![scorecard("bluemix-cli-repo"), scorecard("cli-repo")]);
    select_scorecard(&mut entries, ChosenNames { prior: "cli-repo", ..ChosenNames::default() });

    assert_eq!(entries.primary, Some(scorecard("cli-repo")));
    assert_eq!(entries.additional, vec![scorecard("bluemix-cli-repo")]);
}

#[test]
fn single_record_is_left_alone() {
    let mut entries = slot(vec![scorecard("zeta")]);
    select_scorecard(&mut entries, ChosenNames { prior: "alpha", ..ChosenNames::default() });
    assert_eq!(entries.primary, Some(scorecard("zeta")));
    assert!(entries.additional.is_empty());
}

#[test]
fn incident_prefers_live_records() {
    let mut records = slot(vec![incident("alpha", true), incident("beta", false)]);
    select_incident(&mut records, ChosenNames { prior: "alpha", ..ChosenNames::default() });
    assert_eq!(records.primary.map(|record| record.item.crn_service_name), Some("beta".to_string()));
}

#[test]
fn catalog_prefers_public_visibility() {
    let mut resources = slot(vec![
        catalog("alpha", VisibilityRestriction::Private),
        catalog("beta", VisibilityRestriction::IbmOnly),
        catalog("gamma", VisibilityRestriction::Public),
    ]);
    select_catalog(&mut resources, ChosenNames::default());
    assert_eq!(resources.primary.map(|resource| resource.name), Some("gamma".to_string()));
    let rest: Vec<_> = resources.additional.iter().map(|resource| resource.name.as_str()).collect();
    assert_eq!(rest, vec!["beta", "alpha"]);
}

// ============================================================================
// SECTION: Name Groups
// ============================================================================

#[test]
fn do_not_merge_names_stay_apart() {
    let mut log = ValidationLog::new("svc");
    let mut builder = NameGroupBuilder::new(DoNotMergeNames::new(["common"]));
    builder.add_service_name("alpha", "common", NameSource::Display, &mut log);
    builder.add_service_name("beta", "common", NameSource::Display, &mut log);
    let groups = builder.build();

    assert_eq!(groups.len(), 2);
    let skipped: Vec<_> = log.find("do-not-merge name not used").collect();
    assert_eq!(skipped.len(), 2);
    assert!(skipped.iter().all(|issue| issue.severity == Severity::Minor));
}

#[test]
fn zero_length_names_are_logged_and_not_merged() {
    let mut log = ValidationLog::new("run");
    let mut builder = NameGroupBuilder::new(DoNotMergeNames::default());
    builder.add_service_name("alpha", "", NameSource::Display, &mut log);
    builder.add_service_name("beta", "  ", NameSource::Display, &mut log);
    let groups = builder.build();

    assert_eq!(groups.len(), 2);
    let skipped: Vec<_> = log.find("zero-length name not used").collect();
    assert_eq!(skipped.len(), 2);
    assert!(skipped.iter().all(|issue| issue.severity == Severity::Minor));
}

/// Connected components of services linked by a shared comparable name.
fn expected_components(names: &BTreeMap<String, Vec<String>>) -> BTreeSet<BTreeSet<String>> {
    let mut by_key: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for (service, service_names) in names {
        for name in service_names {
            by_key.entry(comparable_name(name)).or_default().push(service);
        }
    }
    let mut components: Vec<BTreeSet<String>> =
        names.keys().map(|service| BTreeSet::from([service.clone()])).collect();
    for members in by_key.values() {
        let (joined, rest): (Vec<_>, Vec<_>) = components
            .into_iter()
            .partition(|component| members.iter().any(|member| component.contains(*member)));
        let merged = joined.into_iter().flatten().collect();
        components = rest;
        components.push(merged);
    }
    components.into_iter().collect()
}

proptest! {
    #[test]
    fn selection_is_idempotent(names in prop::collection::vec("[a-d]{1,3}", 1..6), prior in "[a-d]{0,3}") {
        let mut entries = slot(names.iter().map(|name| scorecard(name)).collect());
        let chosen = ChosenNames { prior: &prior, ..ChosenNames::default() };
        select_scorecard(&mut entries, chosen);
        let once = entries.clone();
        select_scorecard(&mut entries, chosen);
        prop_assert_eq!(entries, once);
    }

    #[test]
    fn groups_are_the_closure_of_shared_names(
        names in prop::collection::btree_map("s[0-5]", prop::collection::vec("[a-e]( [a-e])?", 1..3), 1..6),
    ) {
        let mut log = ValidationLog::new("svc");
        let mut builder = NameGroupBuilder::new(DoNotMergeNames::default());
        for (service, service_names) in &names {
            for name in service_names {
                builder.add_service_name(service, name, NameSource::Display, &mut log);
            }
        }
        let groups = builder.build();

        let mut seen = BTreeSet::new();
        for group in &groups {
            prop_assert!(!group.services.is_empty());
            for service in &group.services {
                prop_assert!(seen.insert(service.clone()), "service in two groups");
            }
        }
        let actual: BTreeSet<BTreeSet<String>> =
            groups.iter().map(|group| group.services.iter().cloned().collect()).collect();
        prop_assert_eq!(actual, expected_components(&names));
    }
}
