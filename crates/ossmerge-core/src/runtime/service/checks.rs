// crates/ossmerge-core/src/runtime/service/checks.rs
// ============================================================================
// Module: Auxiliary Service Checks
// Description: Consistency checks run at the end of service phase one.
// Purpose: Flag ownership, escalation and identity inconsistencies.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! These checks only add issues; the monitoring step also fills the monitor
//! list when the collaborator is configured.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::EscalationType;
use crate::core::IssueTag;
use crate::core::RunAction;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::ValidationLog;
use crate::runtime::context::RunContext;
use crate::runtime::gating::should_execute;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Ownership
// ============================================================================

/// Requires at least one resolved contact.
pub fn check_ownership(entry: &mut ServiceEntry) {
    let ownership = &entry.record.ownership;
    let contacts = [
        &ownership.offering_manager,
        &ownership.development_manager,
        &ownership.tribe_owner,
        &ownership.segment_owner,
    ];
    if contacts.iter().all(|person| person.is_empty()) {
        entry.validation.add(Severity::Severe, &[IssueTag::Ownership], "no owner contact can be resolved", "");
    }
}

// ============================================================================
// SECTION: Incident Enrollment
// ============================================================================

/// Returns true when a group starts with one of the prefixes, or none are set.
fn has_expected_prefix(group: &str, prefixes: &[String]) -> bool {
    prefixes.is_empty() || prefixes.iter().any(|prefix| group.starts_with(prefix.as_str()))
}

/// Checks an escalation type against the presence of its target.
fn check_escalation(log: &mut ValidationLog, group: &str, tag: IssueTag, kind: EscalationType, target: &str) {
    let needs_target = matches!(kind, EscalationType::GitHub | EscalationType::Category);
    if needs_target && target.is_empty() {
        log.add(
            Severity::Warning,
            &[tag],
            format!("{group} tier-2 escalation has no target"),
            format!("type={}", kind.as_str()),
        );
    } else if !needs_target && !target.is_empty() {
        log.add(
            Severity::Minor,
            &[tag],
            format!("{group} tier-2 escalation target is not used"),
            format!("type={} target={target}", kind.as_str()),
        );
    }
}

/// Checks assignment-group prefixes and escalation settings.
pub fn check_incident_enrollment(entry: &mut ServiceEntry, run: &RunContext<'_>) {
    if entry.service_now_primary().is_none() {
        return;
    }
    let support = entry.record.support.clone();
    let operations = entry.record.operations.clone();
    let config = run.config;
    if !support.tier1_assignment_group.is_empty()
        && !has_expected_prefix(&support.tier1_assignment_group, &config.support_tier1_prefixes)
    {
        entry.validation.add_sourced(
            Severity::Warning,
            &[IssueTag::Support, IssueTag::ServiceNow],
            SourceKind::ServiceNow,
            "support tier-1 assignment group does not belong to an expected team",
            support.tier1_assignment_group.clone(),
        );
    }
    if !operations.tier1_assignment_group.is_empty()
        && !has_expected_prefix(&operations.tier1_assignment_group, &config.operations_tier1_prefixes)
    {
        entry.validation.add_sourced(
            Severity::Warning,
            &[IssueTag::Operations, IssueTag::ServiceNow],
            SourceKind::ServiceNow,
            "operations tier-1 assignment group does not belong to an expected team",
            operations.tier1_assignment_group.clone(),
        );
    }
    check_escalation(
        &mut entry.validation,
        "support",
        IssueTag::Support,
        support.tier2_escalation_type,
        &support.tier2_escalation_target,
    );
    check_escalation(
        &mut entry.validation,
        "operations",
        IssueTag::Operations,
        operations.tier2_escalation_type,
        &operations.tier2_escalation_target,
    );
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Checks the catalog IAM-compatible flag against the identity record.
pub fn check_identity(entry: &mut ServiceEntry, run: &RunContext<'_>) {
    if !run.loaded.iam {
        return;
    }
    let Some(catalog) = entry.catalog_primary() else {
        return;
    };
    let compatible = catalog.iam_compatible;
    let enabled = entry.iam.primary.as_ref().map(|identity| identity.enabled);
    let problem = match (compatible, enabled) {
        (true, None) => Some("catalog declares IAM compatibility but entry is not found in IAM"),
        (true, Some(false)) => Some("catalog declares IAM compatibility but IAM entry is disabled"),
        (false, Some(true)) => Some("IAM entry is enabled but catalog does not declare IAM compatibility"),
        _ => None,
    };
    if let Some(title) = problem {
        entry.validation.add(Severity::Warning, &[IssueTag::Identity, IssueTag::CatalogInfo], title, "");
    }
}

// ============================================================================
// SECTION: Monitoring
// ============================================================================

/// Fills monitor names from the monitoring collaborator.
pub fn merge_monitoring(entry: &mut ServiceEntry, run: &RunContext<'_>) {
    let prior = entry.prior.as_ref().map(|p| p.operations.monitors.clone()).unwrap_or_default();
    if !should_execute(run.config.actions, RunAction::Monitoring, &mut entry.validation, "monitoring info") {
        entry.record.operations.monitors = prior;
        return;
    }
    let Some(source) = run.monitoring else {
        entry.record.operations.monitors = prior;
        return;
    };
    match source.monitors_for(&entry.record.reference_resource_name) {
        Ok(mut monitors) => {
            monitors.sort();
            monitors.dedup();
            entry.record.operations.monitors = monitors;
        }
        Err(err) => {
            entry.validation.add(
                Severity::Warning,
                &[IssueTag::Monitoring],
                "monitoring info not available",
                err.to_string(),
            );
            entry.record.operations.monitors = prior;
        }
    }
}
