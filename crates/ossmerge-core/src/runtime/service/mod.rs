// crates/ossmerge-core/src/runtime/service/mod.rs
// ============================================================================
// Module: Service Merger
// Description: Three-phase merge of every service entry.
// Purpose: Sequence the attribute mergers and the cross-entry passes.
// Dependencies: crate::core, crate::runtime, tracing
// ============================================================================

//! ## Overview
//! Phase one merges the own attributes of each service in isolation; the
//! entry is moved out of the registry while it is mutated so that the rest of
//! the registry stays readable. Between phases one and two, reference-name
//! collisions are quarantined and the shared-name groups are built. Phase two
//! resolves parents and clearinghouse bindings, and phase three propagates
//! product data, evaluates PnP enablement and finalizes every entry.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod catalog;
pub mod checks;
pub mod clearinghouse;
pub mod contacts;
pub mod dependencies;
pub mod general;
pub mod missing_sources;
pub mod naming;
pub mod ownership;
pub mod product_info;
pub mod tags;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::mem;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::CatalogKind;
use crate::core::DeliverableId;
use crate::core::IssueTag;
use crate::core::MaturityOssTab;
use crate::core::OnboardingPhase;
use crate::core::OperationalStatus;
use crate::core::OverrideKey;
use crate::core::RunAction;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::SourceNameKind;
use crate::core::Tag;
use crate::core::ValidationLog;
use crate::core::canonical_name;
use crate::core::is_canonical_name;
use crate::core::tags::CRN_STATUS_TAGS;
use crate::core::tags::OVERALL_STATUS_TAGS;
use crate::runtime::category::check_category_parents;
use crate::runtime::context::LoadedSources;
use crate::runtime::context::MergeConfig;
use crate::runtime::context::MergeContext;
use crate::runtime::context::RunContext;
use crate::runtime::deferred::DeferredActions;
use crate::runtime::error::MergeError;
use crate::runtime::gating::should_execute;
use crate::runtime::merge::AttributeMerge;
use crate::runtime::names::NameGroupBuilder;
use crate::runtime::names::service_names;
use crate::runtime::phase::EntityPhase;
use crate::runtime::phase::GlobalPhase;
use crate::runtime::phase::PhaseController;
use crate::runtime::phase::PhaseError;
use crate::runtime::phase::advance_entity;
use crate::runtime::phase::expect_entity;
use crate::runtime::pnp::evaluate_pnp;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;
use crate::runtime::registry::ServiceIdx;
use crate::runtime::selector::ChosenNames;
use crate::runtime::selector::select_catalog;
use crate::runtime::selector::select_identity;
use crate::runtime::selector::select_incident;
use crate::runtime::selector::select_scorecard;
use crate::runtime::service::catalog::apply_visibility_policy;
use crate::runtime::service::catalog::check_visibility_status;
use crate::runtime::service::catalog::merge_catalog_identity;
use crate::runtime::service::catalog::merge_catalog_info;
use crate::runtime::service::catalog::merge_client_facing;
use crate::runtime::service::checks::check_identity;
use crate::runtime::service::checks::check_incident_enrollment;
use crate::runtime::service::checks::check_ownership;
use crate::runtime::service::checks::merge_monitoring;
use crate::runtime::service::clearinghouse::DeliverableIndex;
use crate::runtime::service::clearinghouse::bind_deliverables;
use crate::runtime::service::clearinghouse::merge_product_ids_two;
use crate::runtime::service::clearinghouse::merge_taxonomy;
use crate::runtime::service::contacts::merge_compliance;
use crate::runtime::service::contacts::merge_operations;
use crate::runtime::service::contacts::merge_status_page;
use crate::runtime::service::contacts::merge_support;
use crate::runtime::service::dependencies::merge_dependencies;
use crate::runtime::service::general::merge_display_name;
use crate::runtime::service::general::merge_entry_type;
use crate::runtime::service::general::merge_future_status;
use crate::runtime::service::general::merge_status;
use crate::runtime::service::missing_sources::check_missing_sources;
use crate::runtime::service::naming::catalog_own_name;
use crate::runtime::service::naming::derive_reference_name;
use crate::runtime::service::ownership::merge_ownership;
use crate::runtime::service::product_info::assign_oss_uids;
use crate::runtime::service::product_info::merge_product_info_one;
use crate::runtime::service::product_info::merge_product_info_three;
use crate::runtime::service::tags::normalize_tags;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Source label of the parent name taken from a catalog composite.
pub const COMPOSITE_PARENT_SOURCE: &str = "CompositeParent";

/// Component label used in phase checks.
const COMPONENT: &str = "service-merger";

// ============================================================================
// SECTION: Onboarding
// ============================================================================

/// Returns true when the entry is onboarded in the maturity manager.
#[must_use]
pub fn is_onboarded(entry: &ServiceEntry) -> bool {
    entry.record.general.onboarding_phase != OnboardingPhase::Unset
}

/// Returns the maturity-manager operations tab of an onboarded entry.
#[must_use]
pub fn onboarded_tab(entry: &ServiceEntry) -> Option<&MaturityOssTab> {
    if !is_onboarded(entry) {
        return None;
    }
    entry.rmc.as_ref().and_then(|rmc| rmc.oss_tab.as_ref())
}

/// Sets the onboarding phase and approver from the maturity manager.
fn merge_onboarding(entry: &mut ServiceEntry, loaded: LoadedSources) {
    if !loaded.rmc {
        return;
    }
    let tab = entry.rmc.as_ref().and_then(|rmc| rmc.oss_tab.as_ref());
    entry.record.general.onboarding_phase = tab.map_or(OnboardingPhase::Unset, |tab| tab.onboarding_phase);
    entry.record.general.onboarding_approver = tab.map(|tab| tab.approver.clone()).unwrap_or_default();
}

/// Advances the phase of a service entry by one step.
fn advance(entry: &mut ServiceEntry, to: EntityPhase) -> Result<(), PhaseError> {
    let name = entry.name().to_string();
    advance_entity(&mut entry.phase, &name, to)
}

// ============================================================================
// SECTION: Phase One
// ============================================================================

/// Re-selects the primary record of every source slot.
fn select_sources(entry: &mut ServiceEntry) {
    let prior = entry.prior_name().to_string();
    select_catalog(&mut entry.catalog, ChosenNames { prior: &prior, ..ChosenNames::default() });
    let catalog = entry.catalog.primary.as_ref().map(|c| c.name.clone()).unwrap_or_default();
    select_incident(&mut entry.service_now, ChosenNames { prior: &prior, catalog: &catalog, incident: "" });
    let incident = entry.service_now.primary.as_ref().map(|s| s.item.crn_service_name.clone()).unwrap_or_default();
    let chosen = ChosenNames { prior: &prior, catalog: &catalog, incident: &incident };
    select_scorecard(&mut entry.scorecard, chosen);
    select_identity(&mut entry.iam, chosen);
}

/// Records the names each source contributed and surfaces source issues.
fn record_source_names(entry: &mut ServiceEntry) {
    let log = &mut entry.validation;
    if let Some(prior) = entry.prior.as_ref() {
        log.record_source(SourceNameKind::PriorOss, prior.reference_resource_name.clone());
    }
    for record in entry.service_now.iter() {
        let kind = if record.item.retired { SourceNameKind::ServiceNowRetired } else { SourceNameKind::ServiceNow };
        log.record_source(kind, record.item.crn_service_name.clone());
    }
    for record in entry.scorecard.iter() {
        log.record_source(SourceNameKind::Scorecard, record.name.clone());
    }
    for record in entry.iam.iter() {
        let kind = if record.enabled { SourceNameKind::Identity } else { SourceNameKind::IdentityDisabled };
        log.record_source(kind, record.name.clone());
    }
    if let Some(rmc) = entry.rmc.as_ref() {
        log.record_source(SourceNameKind::Rmc, rmc.crn_service_name.clone());
    }
    if let Some(incident) = entry.service_now.primary.as_ref() {
        for issue in &incident.issues {
            log.add_sourced(
                Severity::Warning,
                &[IssueTag::ServiceNow],
                SourceKind::ServiceNow,
                format!("ServiceNow: {}", issue.title),
                issue.details.clone(),
            );
        }
    }
}

/// Returns why the attribute merge is skipped for this entry, if it is.
fn skip_reason(entry: &mut ServiceEntry, run: &RunContext<'_>) -> Option<&'static str> {
    let tags = &entry.record.general.oss_tags;
    if tags.contains(Tag::OssTest) && !run.enabled(RunAction::TestMode) {
        return Some("test entry outside test mode");
    }
    if tags.contains(Tag::ManagerOnly) {
        return Some("entry is maintained in the maturity manager only");
    }
    if !should_execute(run.config.actions, RunAction::Services, &mut entry.validation, "service attributes") {
        return Some("service merge is disabled");
    }
    None
}

/// Keeps the prior record unchanged, or stops the merge when there is none.
fn copy_prior(entry: &mut ServiceEntry, reason: &'static str) {
    let Some(prior) = entry.prior.clone() else {
        entry.aborted = true;
        debug!(service = %entry.name(), reason, "service skipped without prior record");
        return;
    };
    let name = mem::take(&mut entry.record.reference_resource_name);
    entry.record = prior;
    entry.record.reference_resource_name = name;
    entry.copied_from_prior = true;
    entry.validation.add_sourced(
        Severity::Info,
        &[IssueTag::RunAction],
        SourceKind::PriorOss,
        "entry copied from prior run",
        reason,
    );
}

/// Records directories that failed to load in lenient mode.
fn record_failed_sources(entry: &mut ServiceEntry, run: &RunContext<'_>) {
    for (source, message) in run.failed {
        entry.validation.add_sourced(
            Severity::Critical,
            &[IssueTag::Data],
            source.clone(),
            format!("{source} could not be loaded"),
            message.clone(),
        );
    }
}

/// Merges the own attributes of one service.
fn merge_service_one(entry: &mut ServiceEntry, registry: &Registry, run: &RunContext<'_>) -> Result<(), MergeError> {
    if let Some(prior) = entry.prior.clone() {
        entry.record = prior;
    }
    merge_onboarding(entry, run.loaded);
    let onboarded = is_onboarded(entry);
    normalize_tags(entry, onboarded, run.config.reference_date);
    select_sources(entry);
    record_source_names(entry);
    apply_visibility_policy(entry);

    let name = derive_reference_name(entry);
    if name.is_empty() {
        entry.aborted = true;
        entry.validation.add(
            Severity::Critical,
            &[IssueTag::Crn, IssueTag::Naming],
            "no reference name can be derived from any source",
            "",
        );
        warn!(key = %entry.key, "service merge aborted without a name");
        return Ok(());
    }
    entry.record.reference_resource_name.clone_from(&name);
    entry.validation.canonical_name = name;

    if let Some(reason) = skip_reason(entry, run) {
        copy_prior(entry, reason);
        if entry.aborted {
            return Ok(());
        }
        advance(entry, EntityPhase::PhaseOne)?;
        return Ok(());
    }
    record_failed_sources(entry, run);

    let ctx = run.merge_context(onboarded);
    merge_display_name(entry, &ctx)?;
    merge_ownership(entry, registry, &ctx)?;
    merge_entry_type(entry, registry, &ctx)?;
    merge_status(entry, &ctx)?;
    merge_future_status(entry, &ctx)?;
    check_visibility_status(entry);
    merge_client_facing(entry, &ctx)?;
    if run.loaded.service_now {
        entry.record.general.service_now_sys_id =
            entry.service_now_primary().map(|s| s.item.sys_id.clone()).unwrap_or_default();
    }
    merge_support(entry, &ctx)?;
    merge_operations(entry, &ctx)?;
    merge_monitoring(entry, run);
    merge_compliance(entry, &ctx)?;
    merge_status_page(entry, &ctx)?;
    merge_catalog_identity(entry, registry);
    merge_catalog_info(entry, run, &ctx)?;
    merge_product_info_one(entry, run);

    check_missing_sources(entry, run.loaded);
    check_ownership(entry);
    check_incident_enrollment(entry, run);
    check_identity(entry, run);
    advance(entry, EntityPhase::PhaseOne)?;
    Ok(())
}

/// Binds the lookup keys of a merged service in the registry indexes.
fn index_service(registry: &mut Registry, idx: ServiceIdx) {
    let entry = registry.service(idx);
    if !entry.is_active() {
        return;
    }
    let catalog_id = entry.record.reference_catalog_id.clone();
    let plan_ids: Vec<String> = entry.catalog_plans.iter().map(|plan| plan.id.clone()).collect();
    let part_numbers = entry.record.product_info.part_numbers.clone();
    let product_ids: Vec<String> = entry.record.product_info.product_ids.iter().map(|pid| pid.id.clone()).collect();

    let mut conflicts = Vec::new();
    if !catalog_id.is_empty() {
        if let Err(err) = registry.index_catalog_id(&catalog_id, idx) {
            conflicts.push(err.to_string());
        }
    }
    for plan_id in &plan_ids {
        if let Err(err) = registry.index_plan_id(plan_id, idx) {
            conflicts.push(err.to_string());
        }
    }
    for part_number in &part_numbers {
        registry.index_part_number(part_number, idx);
    }
    for product_id in &product_ids {
        registry.index_product_id(product_id, idx);
    }
    for conflict in conflicts {
        registry.service_mut(idx).validation.add(
            Severity::Warning,
            &[IssueTag::CatalogInfo, IssueTag::Duplicate],
            "catalog identifier already belongs to another entry",
            conflict,
        );
    }
}

/// Runs phase one for every service.
///
/// # Errors
///
/// Returns [`MergeError`] on phase violations or malformed attribute merges.
pub fn merge_services_one(
    registry: &mut Registry,
    phases: &PhaseController,
    run: &RunContext<'_>,
) -> Result<usize, MergeError> {
    phases.expect(COMPONENT, GlobalPhase::ServicesOne)?;
    let mut merged = 0;
    for idx in registry.service_indices() {
        if registry.service(idx).duplicate_of.is_some() {
            continue;
        }
        let mut entry = registry.take_service(idx);
        let result = merge_service_one(&mut entry, registry, run);
        registry.restore_service(idx, entry);
        result?;
        index_service(registry, idx);
        merged += 1;
    }
    info!(merged, "service phase one complete");
    Ok(merged)
}

// ============================================================================
// SECTION: Between Phases
// ============================================================================

/// Quarantines entries whose reference name is already taken.
///
/// The first entry in key order keeps the name. Returns the number of
/// quarantined entries.
pub fn quarantine_collisions(registry: &mut Registry, run_log: &mut ValidationLog) -> usize {
    let mut owners: BTreeMap<String, ServiceIdx> = BTreeMap::new();
    let mut quarantined = 0;
    for idx in registry.service_indices() {
        let entry = registry.service(idx);
        if !entry.is_active() {
            continue;
        }
        let name = entry.record.reference_resource_name.clone();
        let Some(winner) = owners.get(&name).copied() else {
            owners.insert(name, idx);
            continue;
        };
        let details = format!("{} and {}", registry.service(winner).key, entry.key);
        let title = "reference name is derived for more than one entry";
        registry.service_mut(winner).validation.add(
            Severity::Critical,
            &[IssueTag::Crn, IssueTag::Duplicate],
            title,
            details.clone(),
        );
        let loser = registry.service_mut(idx);
        loser.quarantined = true;
        loser.validation.add(Severity::Critical, &[IssueTag::Crn, IssueTag::Duplicate], title, details.clone());
        run_log.add(Severity::Critical, &[IssueTag::Duplicate], format!("{title}: {name}"), details);
        warn!(name = %name, "reference name collision quarantined");
        quarantined += 1;
    }
    quarantined
}

/// Builds the shared-name groups of services and deliverables.
///
/// # Errors
///
/// Returns [`MergeError::Registry`] when a member lands in two groups.
pub fn build_name_groups(
    registry: &mut Registry,
    config: &MergeConfig,
    run_log: &mut ValidationLog,
) -> Result<usize, MergeError> {
    let mut builder = NameGroupBuilder::new(registry.do_not_merge().clone());
    for idx in registry.service_indices() {
        let entry = registry.service(idx);
        if !entry.is_active() {
            continue;
        }
        let service = entry.record.reference_resource_name.clone();
        builder.register_service(&service);
        for (source, name) in service_names(entry) {
            builder.add_service_name(&service, &name, source, run_log);
        }
    }
    for summary in registry.deliverables() {
        builder.add_deliverable(summary, config, run_log);
    }
    let groups = builder.build();
    let count = groups.len();
    for group in groups {
        registry.insert_name_group(group)?;
    }
    debug!(groups = count, "name groups built");
    Ok(count)
}

// ============================================================================
// SECTION: Phase Two
// ============================================================================

/// Returns the canonical name of the catalog composite containing an entry.
fn composite_parent_of(registry: &Registry, idx: ServiceIdx) -> Option<String> {
    let catalog = registry.service(idx).catalog_primary()?;
    if catalog.parent_id.is_empty() {
        return None;
    }
    let parent = registry.catalog_resource(&catalog.parent_id)?;
    if parent.kind != CatalogKind::Composite {
        return None;
    }
    let owner = registry.service_by_name(catalog_own_name(&parent.name))?;
    let owner_entry = registry.service(owner);
    (owner != idx && owner_entry.is_active()).then(|| owner_entry.record.reference_resource_name.clone())
}

/// Records composite parents on the children of catalog composites.
fn assign_composite_parents(registry: &mut Registry) {
    for idx in registry.service_indices() {
        if !registry.service(idx).is_active() {
            continue;
        }
        if let Some(parent) = composite_parent_of(registry, idx) {
            registry.service_mut(idx).composite_parent = parent;
        }
    }
}

/// Checks a parent name against the registry and returns the value to keep.
fn validate_parent(entry: &mut ServiceEntry, registry: &Registry, mut value: String) -> Result<String, MergeError> {
    if value.is_empty() {
        return Ok(value);
    }
    if registry.service_key(&value) == entry.key {
        entry.validation.add(Severity::Warning, &[IssueTag::Crn], "entry is its own parent", value);
        return Ok(String::new());
    }
    if !is_canonical_name(&value) {
        let canonical = canonical_name(&value);
        entry.validation.add(
            Severity::Severe,
            &[IssueTag::Crn],
            "ParentResourceName is not in canonical format",
            format!("\"{value}\" should be \"{canonical}\""),
        );
        value = canonical;
    }
    let target = registry.service_by_name(&value).map(|idx| registry.service(idx)).filter(|t| t.is_active());
    let Some(target) = target else {
        entry.validation.add(
            Severity::Severe,
            &[IssueTag::Crn],
            "ParentResourceName does not match any entry",
            value,
        );
        return Ok(String::new());
    };
    expect_entity(
        "parent-resource-name",
        target.name(),
        target.phase,
        &[EntityPhase::PhaseOne, EntityPhase::PhaseTwo],
    )?;
    let own_status = entry.record.general.operational_status;
    let parent_status = target.record.general.operational_status;
    if own_status.is_client_available()
        && matches!(parent_status, OperationalStatus::Retired | OperationalStatus::Deprecated)
    {
        entry.validation.add(
            Severity::Warning,
            &[IssueTag::Crn],
            "parent entry is retired or deprecated",
            format!("status={own_status} parent-status={parent_status}"),
        );
    }
    Ok(target.record.reference_resource_name.clone())
}

/// Merges the parent resource name.
fn merge_parent(entry: &mut ServiceEntry, registry: &Registry, ctx: &MergeContext) -> Result<(), MergeError> {
    let tab = onboarded_tab(entry).map(|tab| tab.parent_resource_name.clone());
    let composite = (!entry.composite_parent.is_empty()).then(|| entry.composite_parent.clone());
    let value = AttributeMerge::new("ParentResourceName")
        .if_missing(Severity::Ignore, &[IssueTag::Crn])
        .if_mismatch(Severity::Warning, &[IssueTag::Crn])
        .candidate(
            SourceKind::OverrideProperty,
            entry.merge_control.override_value(OverrideKey::ParentResourceName).map(str::to_string),
        )
        .candidate(SourceKind::RmcOss, tab)
        .candidate(SourceKind::Custom(COMPOSITE_PARENT_SOURCE.to_string()), composite)
        .prior(entry.prior.as_ref().map(|p| p.general.parent_resource_name.clone()))
        .resolve(ctx, &mut entry.validation)?;
    entry.record.general.parent_resource_name = validate_parent(entry, registry, value)?;
    Ok(())
}

/// Runs phase two for one service.
fn merge_service_two(
    entry: &mut ServiceEntry,
    registry: &Registry,
    run: &RunContext<'_>,
    index: &DeliverableIndex,
) -> Result<(), MergeError> {
    if entry.copied_from_prior {
        let parent = entry.record.general.parent_resource_name.clone();
        entry.record.general.parent_resource_name = validate_parent(entry, registry, parent)?;
        advance(entry, EntityPhase::PhaseTwo)?;
        return Ok(());
    }
    let ctx = run.merge_context(is_onboarded(entry));
    merge_parent(entry, registry, &ctx)?;

    let execute = should_execute(
        run.config.actions,
        RunAction::ProductInfoClearinghouse,
        &mut entry.validation,
        "clearinghouse product info",
    );
    if execute && run.loaded.clearinghouse {
        bind_deliverables(entry, registry, index);
        merge_taxonomy(entry, registry);
        merge_product_ids_two(entry, registry);
    } else if let Some(prior) = entry.prior.as_ref() {
        entry.record.product_info.clearinghouse_refs = prior.product_info.clearinghouse_refs.clone();
        entry.record.product_info.taxonomy = prior.product_info.taxonomy.clone();
    }
    entry.crn_status_phase_two = Some(entry.validation.crn_status());
    advance(entry, EntityPhase::PhaseTwo)?;
    Ok(())
}

/// Runs phase two for every service, then the deferred actions.
///
/// # Errors
///
/// Returns [`MergeError`] on phase violations or malformed attribute merges.
pub fn merge_services_two(
    registry: &mut Registry,
    phases: &PhaseController,
    run: &RunContext<'_>,
    deferred: &mut DeferredActions,
) -> Result<(), MergeError> {
    phases.expect(COMPONENT, GlobalPhase::ServicesTwo)?;
    assign_composite_parents(registry);
    check_category_parents(registry, deferred);
    let index = DeliverableIndex::build(registry, run.config);

    for idx in registry.service_indices() {
        let entry = registry.service(idx);
        if !entry.is_active() || entry.phase != EntityPhase::PhaseOne {
            continue;
        }
        let mut entry = registry.take_service(idx);
        let result = merge_service_two(&mut entry, registry, run, &index);
        let bindings: Vec<DeliverableId> =
            entry.record.product_info.clearinghouse_refs.iter().map(|r| r.id.clone()).collect();
        registry.restore_service(idx, entry);
        result?;
        for id in &bindings {
            registry.index_deliverable_binding(id, idx);
        }
    }
    let executed = deferred.run_all(registry);
    info!(deferred = executed, "service phase two complete");
    Ok(())
}

// ============================================================================
// SECTION: Phase Three
// ============================================================================

/// Returns true when the entry takes part in phase three.
fn in_phase_three(entry: &ServiceEntry) -> bool {
    entry.is_active() && entry.phase == EntityPhase::PhaseTwo
}

/// Merges dependencies of every service.
fn merge_all_dependencies(registry: &mut Registry, run: &RunContext<'_>) {
    for idx in registry.service_indices() {
        let entry = registry.service(idx);
        if !in_phase_three(entry) || entry.copied_from_prior {
            continue;
        }
        let mut entry = registry.take_service(idx);
        let execute = should_execute(
            run.config.actions,
            RunAction::DependenciesClearinghouse,
            &mut entry.validation,
            "dependencies",
        );
        if execute && run.loaded.clearinghouse {
            merge_dependencies(&mut entry, registry);
        } else if let Some(prior) = entry.prior.as_ref() {
            entry.record.dependencies = prior.dependencies.clone();
        }
        registry.restore_service(idx, entry);
    }
}

/// Sets the status tags, sorts the log and finalizes one entry.
fn finalize_service(entry: &mut ServiceEntry) -> Result<(), PhaseError> {
    if !entry.copied_from_prior {
        let crn = entry.validation.crn_status();
        if let Some(before) = entry.crn_status_phase_two.filter(|before| *before != crn) {
            entry.validation.add(
                Severity::Warning,
                &[IssueTag::Data],
                "CRN status changed after phase two",
                format!("{} -> {}", before.as_str(), crn.as_str()),
            );
        }
        entry.record.general.oss_tags.replace_family(&CRN_STATUS_TAGS, Tag::crn_status(crn));
        let overall = entry.validation.overall_status();
        entry.record.general.oss_tags.replace_family(&OVERALL_STATUS_TAGS, Tag::overall_status(overall));
    }
    entry.validation.sort();
    advance(entry, EntityPhase::Finalized)
}

/// Runs phase three for every service and finalizes them.
///
/// # Errors
///
/// Returns [`MergeError`] on phase violations.
pub fn merge_services_three(
    registry: &mut Registry,
    phases: &PhaseController,
    run: &RunContext<'_>,
) -> Result<usize, MergeError> {
    phases.expect(COMPONENT, GlobalPhase::ServicesThree)?;
    let indices: Vec<ServiceIdx> =
        registry.service_indices().into_iter().filter(|idx| in_phase_three(registry.service(*idx))).collect();

    for idx in &indices {
        merge_product_info_three(registry, *idx, run);
    }
    let allocated = assign_oss_uids(registry);
    debug!(allocated, "oss uids assigned");
    merge_all_dependencies(registry, run);
    for idx in &indices {
        evaluate_pnp(registry, *idx);
    }
    for idx in &indices {
        finalize_service(registry.service_mut(*idx))?;
    }
    info!(finalized = indices.len(), "service phase three complete");
    Ok(indices.len())
}
