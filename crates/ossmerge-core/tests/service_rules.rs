// crates/ossmerge-core/tests/service_rules.rs
// ============================================================================
// Module: Service Rule Tests
// Description: Rule tables of the service merger checked against the registry.
// ============================================================================
//! ## Overview
//! Builds service entries directly and runs the individual service rules:
//! PnP parent chains, status-category parents, entry-type derivation,
//! missing-source classification, tag ownership and product information.

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

use ossmerge_core::CatalogKind;
use ossmerge_core::CatalogResource;
use ossmerge_core::DoNotMergeNames;
use ossmerge_core::EntryType;
use ossmerge_core::IdentityEntry;
use ossmerge_core::IncidentItem;
use ossmerge_core::IncidentRecord;
use ossmerge_core::MaturityEntry;
use ossmerge_core::MaturityOssTab;
use ossmerge_core::MergeConfig;
use ossmerge_core::OnboardingPhase;
use ossmerge_core::OperationalStatus;
use ossmerge_core::PartInfo;
use ossmerge_core::PartsTable;
use ossmerge_core::ProductIdSource;
use ossmerge_core::SegmentId;
use ossmerge_core::SegmentType;
use ossmerge_core::ServiceRecord;
use ossmerge_core::Severity;
use ossmerge_core::Tag;
use ossmerge_core::ValidationLog;
use ossmerge_core::runtime::DeferredActions;
use ossmerge_core::runtime::Enablement;
use ossmerge_core::runtime::LoadedSources;
use ossmerge_core::runtime::MergeContext;
use ossmerge_core::runtime::Registry;
use ossmerge_core::runtime::RunContext;
use ossmerge_core::runtime::ServiceEntry;
use ossmerge_core::runtime::ServiceIdx;
use ossmerge_core::runtime::category::check_category_parents;
use ossmerge_core::runtime::pnp::evaluate_pnp;
use ossmerge_core::runtime::service::general::merge_entry_type;
use ossmerge_core::runtime::service::missing_sources::Absence;
use ossmerge_core::runtime::service::missing_sources::catalog_absence;
use ossmerge_core::runtime::service::missing_sources::check_missing_sources;
use ossmerge_core::runtime::service::missing_sources::incident_absence;
use ossmerge_core::runtime::service::missing_sources::rmc_absence;
use ossmerge_core::runtime::service::missing_sources::scorecard_absence;
use ossmerge_core::runtime::service::product_info::MULTIPLE_DIVISIONS;
use ossmerge_core::runtime::service::product_info::assign_oss_uids;
use ossmerge_core::runtime::service::product_info::merge_product_info_three;
use ossmerge_core::runtime::service::tags::normalize_tags;
use time::macros::date;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn entry(name: &str) -> ServiceEntry {
    ServiceEntry {
        key: name.to_string(),
        record: ServiceRecord::named(name),
        validation: ValidationLog::new(name),
        ..ServiceEntry::default()
    }
}

fn insert(registry: &mut Registry, name: &str) -> ServiceIdx {
    let idx = registry.service_or_insert(name).unwrap();
    let service = registry.service_mut(idx);
    service.record = ServiceRecord::named(name);
    service.validation = ValidationLog::new(name);
    idx
}

fn catalog(kind: CatalogKind, id: &str, parent_id: &str) -> CatalogResource {
    CatalogResource {
        kind,
        id: id.to_string(),
        parent_id: parent_id.to_string(),
        active: true,
        ..CatalogResource::default()
    }
}

fn incident(entry_type: EntryType) -> IncidentRecord {
    IncidentRecord {
        item: IncidentItem { entry_type, operational_status: OperationalStatus::Ga, ..IncidentItem::default() },
        ..IncidentRecord::default()
    }
}

fn all_loaded() -> MergeContext {
    MergeContext::new(LoadedSources::all(), false)
}

// ============================================================================
// SECTION: PnP Parent Chains
// ============================================================================

#[test]
fn pnp_parent_cycle_disables_both_entries() {
    let mut registry = Registry::new(DoNotMergeNames::default());
    let a = insert(&mut registry, "svc-a");
    let b = insert(&mut registry, "svc-b");
    registry.service_mut(a).record.general.parent_resource_name = "svc-b".to_string();
    registry.service_mut(b).record.general.parent_resource_name = "svc-a".to_string();

    assert_eq!(evaluate_pnp(&mut registry, a), Enablement::Disabled);
    assert_eq!(evaluate_pnp(&mut registry, b), Enablement::Disabled);

    for idx in [a, b] {
        let service = registry.service(idx);
        assert_eq!(service.pnp, Enablement::Disabled);
        assert!(!service.record.general.oss_tags.contains(Tag::PnpEnabled));
    }
    let cycle: Vec<_> = registry.service(a).validation.find("PnP parent chain contains a cycle").collect();
    assert_eq!(cycle.len(), 1);
    assert_eq!(cycle[0].severity, Severity::Critical);
}

// ============================================================================
// SECTION: Status Categories
// ============================================================================

/// One service row: name, category id, category parent, onboarding phase.
type CategoryRow<'a> = (&'a str, &'a str, &'a str, OnboardingPhase);

fn category_registry(rows: &[CategoryRow<'_>]) -> Registry {
    let mut registry = Registry::new(DoNotMergeNames::default());
    for (name, id, parent, phase) in rows {
        let idx = insert(&mut registry, name);
        let record = &mut registry.service_mut(idx).record;
        record.compliance.service_now_onboarded = true;
        record.status_page.category_id = (*id).to_string();
        record.status_page.category_parent = (*parent).to_string();
        record.general.onboarding_phase = *phase;
    }
    registry
}

#[test]
fn category_parent_rules_report_and_void() {
    let cases: [(Vec<CategoryRow<'_>>, &str, Severity, bool); 5] = [
        (
            vec![("svc-a", "", "svc-b", OnboardingPhase::Unset), ("svc-b", "c-1", "", OnboardingPhase::Unset)],
            "StatusPage.CategoryParent is set but StatusPage.CategoryID is blank",
            Severity::Severe,
            true,
        ),
        (
            vec![("svc-a", "", "svc-b", OnboardingPhase::Editing), ("svc-b", "c-1", "", OnboardingPhase::Unset)],
            "StatusPage.CategoryParent is set but StatusPage.CategoryID is blank",
            Severity::Info,
            false,
        ),
        (
            vec![("svc-a", "c-9", "svc-missing", OnboardingPhase::Unset)],
            "StatusPage.CategoryParent does not match a canonical entry name",
            Severity::Severe,
            true,
        ),
        (
            vec![("svc-a", "c-7", "svc-b", OnboardingPhase::Unset), ("svc-b", "c-8", "", OnboardingPhase::Unset)],
            "StatusPage.CategoryParent has a different Category ID",
            Severity::Severe,
            true,
        ),
        (
            vec![("svc-a", "c-7", "svc-a", OnboardingPhase::Unset)],
            "entry is the status category parent",
            Severity::Info,
            false,
        ),
    ];
    for (rows, title, severity, voided) in cases {
        let mut registry = category_registry(&rows);
        let mut deferred = DeferredActions::new();
        let count = check_category_parents(&mut registry, &mut deferred);
        assert_eq!(count, usize::from(voided), "{title}");
        assert_eq!(deferred.len(), usize::from(voided), "{title}");
        deferred.run_all(&mut registry);

        let idx = registry.service_by_name("svc-a").unwrap();
        let service = registry.service(idx);
        let issues: Vec<_> = service.validation.find(title).collect();
        assert_eq!(issues.len(), 1, "{title}");
        assert_eq!(issues[0].severity, severity, "{title}");
        assert_eq!(service.category_inconsistent, voided, "{title}");
        assert_eq!(service.record.status_page.category_parent.is_empty(), voided, "{title}");
    }
}

#[test]
fn consistent_category_parent_is_accepted() {
    let mut registry = category_registry(&[
        ("svc-a", "c-1", "svc-b", OnboardingPhase::Unset),
        ("svc-b", "c-1", "svc-b", OnboardingPhase::Unset),
    ]);
    let mut deferred = DeferredActions::new();
    assert_eq!(check_category_parents(&mut registry, &mut deferred), 0);
    let idx = registry.service_by_name("svc-a").unwrap();
    assert!(registry.service(idx).validation.is_empty());
}

// ============================================================================
// SECTION: Entry Type
// ============================================================================

#[test]
fn entry_type_rules_apply_in_priority_order() {
    let mut registry = Registry::new(DoNotMergeNames::default());
    let composite = catalog(CatalogKind::Composite, "c-parent", "");
    registry.store_catalog_resource(&composite);
    let gaas_segment = registry.segment_or_insert(&SegmentId::new("seg-gov"));
    registry.segment_mut(gaas_segment).record.segment_type = SegmentType::Gaas;

    let mut tagged = entry("svc-tagged");
    tagged.record.general.oss_tags.insert(Tag::TypeInternal);
    tagged.catalog.push(catalog(CatalogKind::Composite, "c-1", ""));

    let mut gaas = entry("svc-gaas");
    gaas.record.ownership.segment_id = SegmentId::new("seg-gov");
    gaas.catalog.push(catalog(CatalogKind::Service, "c-2", ""));

    let mut vmware = entry("svc-vmware");
    let mut vmware_resource = catalog(CatalogKind::Service, "c-3", "");
    vmware_resource.tags = vec!["VMware".to_string()];
    vmware.catalog.push(vmware_resource);

    let mut bundle = entry("svc-bundle");
    bundle.catalog.push(catalog(CatalogKind::Composite, "c-4", ""));

    let mut iaas = entry("svc-iaas");
    iaas.catalog.push(catalog(CatalogKind::Iaas, "c-5", ""));
    iaas.service_now.push(incident(EntryType::Service));

    let mut content = entry("content-ibm-cp-docs");
    content.service_now.push(incident(EntryType::Service));

    let mut identity_only = entry("svc-iam");
    identity_only.iam.push(IdentityEntry::default());

    let mut identity_child = entry("svc-iam-child");
    identity_child.iam.push(IdentityEntry::default());
    identity_child.catalog.push(catalog(CatalogKind::PlatformService, "c-6", "c-parent"));

    let mut plain = entry("svc-plain");
    plain.service_now.push(incident(EntryType::Service));

    let cases = [
        (tagged, EntryType::Internal),
        (gaas, EntryType::Gaas),
        (vmware, EntryType::Vmware),
        (bundle, EntryType::Composite),
        (iaas, EntryType::Iaas),
        (content, EntryType::Content),
        (identity_only, EntryType::IamOnly),
        (identity_child, EntryType::IamOnly),
        (plain, EntryType::Service),
    ];
    for (mut service, expected) in cases {
        merge_entry_type(&mut service, &registry, &all_loaded()).unwrap();
        assert_eq!(service.record.general.entry_type, expected, "{}", service.key);
    }
}

#[test]
fn forcing_tag_notes_disagreeing_sources() {
    let registry = Registry::new(DoNotMergeNames::default());
    let mut service = entry("svc-tagged");
    service.record.general.oss_tags.insert(Tag::TypeInternal);
    service.catalog.push(catalog(CatalogKind::Composite, "c-1", ""));
    merge_entry_type(&mut service, &registry, &all_loaded()).unwrap();

    let issues: Vec<_> = service.validation.find("entry type forced by tag").collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Deferred);
}

#[test]
fn onboarded_tab_type_wins_and_main_tab_mismatch_is_severe() {
    let registry = Registry::new(DoNotMergeNames::default());
    let mut service = entry("svc-edited");
    service.record.general.onboarding_phase = OnboardingPhase::Editing;
    service.record.general.oss_tags.insert(Tag::TypeContent);
    service.rmc = Some(MaturityEntry {
        entry_type: EntryType::Service,
        oss_tab: Some(MaturityOssTab {
            onboarding_phase: OnboardingPhase::Editing,
            entry_type: EntryType::Internal,
            ..MaturityOssTab::default()
        }),
        ..MaturityEntry::default()
    });
    merge_entry_type(&mut service, &registry, &MergeContext::new(LoadedSources::all(), true)).unwrap();

    assert_eq!(service.record.general.entry_type, EntryType::Internal);
    let issues: Vec<_> = service.validation.find("entry type differs between RMC main and OSS tabs").collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Severe);
}

// ============================================================================
// SECTION: Missing Sources
// ============================================================================

#[test]
fn absence_tables_classify_by_type_and_status() {
    let ga = OperationalStatus::Ga;
    let cases = [
        (rmc_absence(EntryType::Service, ga), Absence::Required),
        (rmc_absence(EntryType::Iaas, ga), Absence::Expected),
        (rmc_absence(EntryType::Service, OperationalStatus::Retired), Absence::Expected),
        (catalog_absence(EntryType::Service, ga, false), Absence::Required),
        (catalog_absence(EntryType::PlatformComponent, ga, false), Absence::Permitted),
        (catalog_absence(EntryType::Service, ga, true), Absence::Expected),
        (catalog_absence(EntryType::Internal, ga, false), Absence::Expected),
        (scorecard_absence(EntryType::Service, ga), Absence::Required),
        (scorecard_absence(EntryType::Gaas, ga), Absence::Permitted),
        (scorecard_absence(EntryType::Content, ga), Absence::Expected),
        (scorecard_absence(EntryType::Service, OperationalStatus::Community), Absence::Expected),
        (incident_absence(ga, false), Absence::Required),
        (incident_absence(OperationalStatus::Retired, false), Absence::Expected),
        (incident_absence(ga, true), Absence::Expected),
    ];
    for (index, (actual, expected)) in cases.into_iter().enumerate() {
        assert_eq!(actual, expected, "row {index}");
    }
    assert_eq!(Absence::Required.severity(), Some(Severity::Severe));
    assert_eq!(Absence::Permitted.severity(), Some(Severity::Minor));
    assert_eq!(Absence::Expected.severity(), None);
}

#[test]
fn missing_sources_are_reported_only_when_loaded() {
    let mut service = entry("svc-a");
    service.record.general.entry_type = EntryType::Service;
    service.record.general.operational_status = OperationalStatus::Ga;
    service.service_now.push(incident(EntryType::Service));

    check_missing_sources(&mut service, LoadedSources::all());
    for title in ["entry not found in RMC", "entry not found in catalog", "entry not found in scorecard"] {
        let issues: Vec<_> = service.validation.find(title).collect();
        assert_eq!(issues.len(), 1, "{title}");
        assert_eq!(issues[0].severity, Severity::Severe, "{title}");
    }
    assert!(!service.validation.has_title("entry not found in ServiceNow or retired"));

    let mut unloaded = entry("svc-b");
    unloaded.record.general.entry_type = EntryType::Service;
    check_missing_sources(&mut unloaded, LoadedSources::default());
    assert!(unloaded.validation.is_empty());
}

#[test]
fn iam_only_entry_requires_identity_record() {
    let mut service = entry("svc-iam");
    service.record.general.entry_type = EntryType::IamOnly;
    service.record.general.operational_status = OperationalStatus::Ga;
    check_missing_sources(&mut service, LoadedSources::all());

    let issues: Vec<_> = service.validation.find("iam-only entry not found in IAM").collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Severe);
}

// ============================================================================
// SECTION: Tag Ownership
// ============================================================================

#[test]
fn manager_owned_overrides_are_dropped_only_while_editing() {
    let cases = [
        (OnboardingPhase::Editing, true, false),
        (OnboardingPhase::Invalid, true, true),
        (OnboardingPhase::Unset, false, true),
    ];
    for (phase, onboarded, kept) in cases {
        let mut service = entry("svc-a");
        service.record.general.onboarding_phase = phase;
        service.merge_control.tags = vec![Tag::PnpExclude.as_str().to_string(), Tag::OssOnly.as_str().to_string()];
        normalize_tags(&mut service, onboarded, date!(2024 - 06 - 01));

        let tags = &service.record.general.oss_tags;
        assert!(tags.contains(Tag::OssOnly));
        assert_eq!(tags.contains(Tag::PnpExclude), kept);
        assert_eq!(service.validation.has_title("ignored overrides while entry is edited in RMC"), !kept);
    }
}

// ============================================================================
// SECTION: Product Information
// ============================================================================

#[test]
fn oss_uids_continue_after_the_highest_prior_value() {
    let mut registry = Registry::new(DoNotMergeNames::default());
    let kept = insert(&mut registry, "svc-a");
    let mut prior = ServiceRecord::named("svc-a");
    prior.product_info.oss_uid = 7;
    registry.service_mut(kept).prior = Some(prior);
    registry.service_mut(kept).record.product_info.oss_uid = 7;
    let first = insert(&mut registry, "svc-b");
    let second = insert(&mut registry, "svc-c");
    let quarantined = insert(&mut registry, "svc-d");
    registry.service_mut(quarantined).quarantined = true;

    assert_eq!(assign_oss_uids(&mut registry), 2);
    assert_eq!(registry.service(kept).record.product_info.oss_uid, 7);
    assert_eq!(registry.service(first).record.product_info.oss_uid, 8);
    assert_eq!(registry.service(second).record.product_info.oss_uid, 9);
    assert_eq!(registry.service(quarantined).record.product_info.oss_uid, 0);
}

#[test]
fn divisions_are_single_or_multiple() {
    let mut parts = PartsTable::default();
    parts.0.insert("p-1".to_string(), PartInfo { product_id: "prod-1".to_string(), division: "D1".to_string() });
    parts.0.insert("p-2".to_string(), PartInfo { product_id: "prod-2".to_string(), division: "D2".to_string() });
    let config = MergeConfig::default();
    let run = RunContext {
        config: &config,
        loaded: LoadedSources::all(),
        parts: &parts,
        pricing: None,
        monitoring: None,
        failed: &[],
    };

    let mut registry = Registry::new(DoNotMergeNames::default());
    let mixed = insert(&mut registry, "svc-mixed");
    let info = &mut registry.service_mut(mixed).record.product_info;
    info.add_product_id("prod-1", ProductIdSource::PartsTable);
    info.add_product_id("prod-2", ProductIdSource::PartsTable);
    let single = insert(&mut registry, "svc-single");
    registry.service_mut(single).record.product_info.add_product_id("prod-1", ProductIdSource::PartsTable);
    let child = insert(&mut registry, "svc-child");
    registry.service_mut(child).record.general.parent_resource_name = "svc-single".to_string();

    for idx in [mixed, single, child] {
        merge_product_info_three(&mut registry, idx, &run);
    }

    let mixed_entry = registry.service(mixed);
    assert_eq!(mixed_entry.record.product_info.division, MULTIPLE_DIVISIONS);
    let issues: Vec<_> = mixed_entry.validation.find("product ids belong to more than one division").collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Severe);

    assert_eq!(registry.service(single).record.product_info.division, "D1");
    let child_info = &registry.service(child).record.product_info;
    assert_eq!(child_info.division, "D1");
    assert_eq!(child_info.product_ids.len(), 1);
    assert_eq!(child_info.product_ids[0].source, ProductIdSource::Parent);
}
