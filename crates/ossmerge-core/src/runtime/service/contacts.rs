// crates/ossmerge-core/src/runtime/service/contacts.rs
// ============================================================================
// Module: Support, Operations, Compliance and Status Page
// Description: Incident-system driven attribute groups of a service.
// Purpose: Merge contact and escalation data with prior-run fallback.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! Support and operations share one block shape in the incident system, so
//! both groups are merged by the same routine with different attribute
//! prefixes and tags.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::EscalationType;
use crate::core::IncidentContacts;
use crate::core::IssueTag;
use crate::core::OverrideKey;
use crate::core::Person;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::ValidationLog;
use crate::runtime::context::MergeContext;
use crate::runtime::error::MergeError;
use crate::runtime::merge::AttributeMerge;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Contact Blocks
// ============================================================================

/// Fields shared by the support and operations groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ContactFields {
    /// Responsible manager.
    manager: Person,
    /// Slack channel.
    slack_channel: String,
    /// Tier-1 assignment group.
    tier1_assignment_group: String,
    /// Tier-2 assignment group.
    tier2_assignment_group: String,
    /// Tier-2 escalation type.
    tier2_escalation_type: EscalationType,
    /// Tier-2 escalation target.
    tier2_escalation_target: String,
}

impl From<&IncidentContacts> for ContactFields {
    fn from(block: &IncidentContacts) -> Self {
        Self {
            manager: block.manager.clone(),
            slack_channel: block.slack_channel.clone(),
            tier1_assignment_group: block.tier1_assignment_group.clone(),
            tier2_assignment_group: block.tier2_assignment_group.clone(),
            tier2_escalation_type: block.tier2_escalation_type,
            tier2_escalation_target: block.tier2_escalation_target.clone(),
        }
    }
}

/// Merges one contact block from the incident system and the prior record.
fn merge_contact_fields(
    log: &mut ValidationLog,
    ctx: &MergeContext,
    group: &str,
    tags: &'static [IssueTag],
    incident: Option<ContactFields>,
    prior: Option<ContactFields>,
) -> Result<ContactFields, MergeError> {
    let attr = |field: &str| format!("{group}.{field}");
    Ok(ContactFields {
        manager: AttributeMerge::new(attr("Manager"))
            .if_missing(Severity::Warning, tags)
            .if_mismatch(Severity::Minor, tags)
            .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.manager.clone()))
            .prior(prior.as_ref().map(|c| c.manager.clone()))
            .resolve(ctx, log)?,
        slack_channel: AttributeMerge::new(attr("SlackChannel"))
            .if_missing(Severity::Minor, tags)
            .if_mismatch(Severity::Minor, tags)
            .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.slack_channel.clone()))
            .prior(prior.as_ref().map(|c| c.slack_channel.clone()))
            .resolve(ctx, log)?,
        tier1_assignment_group: AttributeMerge::new(attr("Tier1AssignmentGroup"))
            .if_missing(Severity::Warning, tags)
            .if_mismatch(Severity::Minor, tags)
            .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.tier1_assignment_group.clone()))
            .prior(prior.as_ref().map(|c| c.tier1_assignment_group.clone()))
            .resolve(ctx, log)?,
        tier2_assignment_group: AttributeMerge::new(attr("Tier2AssignmentGroup"))
            .if_missing(Severity::Minor, tags)
            .if_mismatch(Severity::Minor, tags)
            .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.tier2_assignment_group.clone()))
            .prior(prior.as_ref().map(|c| c.tier2_assignment_group.clone()))
            .resolve(ctx, log)?,
        tier2_escalation_type: AttributeMerge::new(attr("Tier2EscalationType"))
            .if_missing(Severity::Minor, tags)
            .if_mismatch(Severity::Minor, tags)
            .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.tier2_escalation_type))
            .prior(prior.as_ref().map(|c| c.tier2_escalation_type))
            .resolve(ctx, log)?,
        tier2_escalation_target: AttributeMerge::new(attr("Tier2EscalationTarget"))
            .if_missing(Severity::Ignore, tags)
            .if_mismatch(Severity::Minor, tags)
            .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.tier2_escalation_target.clone()))
            .prior(prior.as_ref().map(|c| c.tier2_escalation_target.clone()))
            .resolve(ctx, log)?,
    })
}

/// Merges the support group.
///
/// # Errors
///
/// Returns [`MergeError`] when an attribute merge is malformed.
pub fn merge_support(entry: &mut ServiceEntry, ctx: &MergeContext) -> Result<(), MergeError> {
    let incident = entry.service_now_primary().map(|s| &s.item.support);
    let experience = incident.map(|block| block.client_experience);
    let incident = incident.map(ContactFields::from);
    let prior = entry.prior.as_ref().map(|p| ContactFields {
        manager: p.support.manager.clone(),
        slack_channel: p.support.slack_channel.clone(),
        tier1_assignment_group: p.support.tier1_assignment_group.clone(),
        tier2_assignment_group: p.support.tier2_assignment_group.clone(),
        tier2_escalation_type: p.support.tier2_escalation_type,
        tier2_escalation_target: p.support.tier2_escalation_target.clone(),
    });
    let prior_experience = entry.prior.as_ref().map(|p| p.support.client_experience);

    let fields = merge_contact_fields(&mut entry.validation, ctx, "Support", &[IssueTag::Support], incident, prior)?;
    let client_experience = AttributeMerge::new("Support.ClientExperience")
        .if_missing(Severity::Warning, &[IssueTag::Support])
        .if_mismatch(Severity::Minor, &[IssueTag::Support])
        .candidate(SourceKind::ServiceNow, experience)
        .prior(prior_experience)
        .resolve(ctx, &mut entry.validation)?;

    let support = &mut entry.record.support;
    support.manager = fields.manager;
    support.slack_channel = fields.slack_channel;
    support.tier1_assignment_group = fields.tier1_assignment_group;
    support.tier2_assignment_group = fields.tier2_assignment_group;
    support.tier2_escalation_type = fields.tier2_escalation_type;
    support.tier2_escalation_target = fields.tier2_escalation_target;
    support.client_experience = client_experience;
    Ok(())
}

/// Merges the operations group, except monitors.
///
/// # Errors
///
/// Returns [`MergeError`] when an attribute merge is malformed.
pub fn merge_operations(entry: &mut ServiceEntry, ctx: &MergeContext) -> Result<(), MergeError> {
    let incident = entry.service_now_primary().map(|s| ContactFields::from(&s.item.operations));
    let tip = entry.service_now_primary().map(|s| s.item.tip_onboarded);
    let prior = entry.prior.as_ref().map(|p| ContactFields {
        manager: p.operations.manager.clone(),
        slack_channel: p.operations.slack_channel.clone(),
        tier1_assignment_group: p.operations.tier1_assignment_group.clone(),
        tier2_assignment_group: p.operations.tier2_assignment_group.clone(),
        tier2_escalation_type: p.operations.tier2_escalation_type,
        tier2_escalation_target: p.operations.tier2_escalation_target.clone(),
    });
    let scorecard = entry.scorecard.primary.as_ref().map(|s| (s.avm_enabled, s.runbook_enabled));
    let prior_flags =
        entry.prior.as_ref().map(|p| (p.operations.tip_onboarded, p.operations.avm_enabled, p.operations.runbook_enabled));

    let log = &mut entry.validation;
    let fields = merge_contact_fields(log, ctx, "Operations", &[IssueTag::Operations], incident, prior)?;
    let tip_onboarded = AttributeMerge::new("Operations.TIPOnboarded")
        .if_missing(Severity::Ignore, &[IssueTag::Operations])
        .if_mismatch(Severity::Minor, &[IssueTag::Operations])
        .candidate(SourceKind::ServiceNow, tip)
        .prior(prior_flags.map(|flags| flags.0))
        .resolve(ctx, log)?;
    let avm_enabled = AttributeMerge::new("Operations.AVMEnabled")
        .if_missing(Severity::Ignore, &[IssueTag::Operations])
        .if_mismatch(Severity::Minor, &[IssueTag::Operations])
        .candidate(SourceKind::ScorecardV1, scorecard.map(|flags| flags.0))
        .prior(prior_flags.map(|flags| flags.1))
        .resolve(ctx, log)?;
    let runbook_enabled = AttributeMerge::new("Operations.RunbookEnabled")
        .if_missing(Severity::Ignore, &[IssueTag::Operations])
        .if_mismatch(Severity::Minor, &[IssueTag::Operations])
        .candidate(SourceKind::ScorecardV1, scorecard.map(|flags| flags.1))
        .prior(prior_flags.map(|flags| flags.2))
        .resolve(ctx, log)?;

    let operations = &mut entry.record.operations;
    operations.manager = fields.manager;
    operations.slack_channel = fields.slack_channel;
    operations.tier1_assignment_group = fields.tier1_assignment_group;
    operations.tier2_assignment_group = fields.tier2_assignment_group;
    operations.tier2_escalation_type = fields.tier2_escalation_type;
    operations.tier2_escalation_target = fields.tier2_escalation_target;
    operations.tip_onboarded = tip_onboarded;
    operations.avm_enabled = avm_enabled;
    operations.runbook_enabled = runbook_enabled;
    Ok(())
}

// ============================================================================
// SECTION: Compliance
// ============================================================================

/// Merges the compliance group.
///
/// # Errors
///
/// Returns [`MergeError`] when an attribute merge is malformed.
pub fn merge_compliance(entry: &mut ServiceEntry, ctx: &MergeContext) -> Result<(), MergeError> {
    let onboarded = if ctx.loaded.service_now {
        entry.has_live_service_now()
    } else {
        entry.prior.as_ref().is_some_and(|p| p.compliance.service_now_onboarded)
    };
    let incident = entry.service_now_primary().map(|s| s.item.compliance.clone());
    let scorecard = entry.scorecard.primary.as_ref().map(|s| (s.bcdr_focal.clone(), s.security_focal.clone()));
    let prior = entry.prior.as_ref().map(|p| p.compliance.clone());

    let log = &mut entry.validation;
    let bcdr_focal = AttributeMerge::new("Compliance.BCDRFocal")
        .if_missing(Severity::Minor, &[IssueTag::Compliance])
        .if_mismatch(Severity::Minor, &[IssueTag::Compliance])
        .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.bcdr_focal.clone()))
        .candidate(SourceKind::ScorecardV1, scorecard.as_ref().map(|s| s.0.clone()))
        .prior(prior.as_ref().map(|c| c.bcdr_focal.clone()))
        .resolve(ctx, log)?;
    let security_focal = AttributeMerge::new("Compliance.SecurityFocal")
        .if_missing(Severity::Minor, &[IssueTag::Compliance])
        .if_mismatch(Severity::Minor, &[IssueTag::Compliance])
        .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.security_focal.clone()))
        .candidate(SourceKind::ScorecardV1, scorecard.as_ref().map(|s| s.1.clone()))
        .prior(prior.as_ref().map(|c| c.security_focal.clone()))
        .resolve(ctx, log)?;
    let architecture_focal = AttributeMerge::new("Compliance.ArchitectureFocal")
        .if_missing(Severity::Minor, &[IssueTag::Compliance])
        .if_mismatch(Severity::Minor, &[IssueTag::Compliance])
        .candidate(SourceKind::ServiceNow, incident.as_ref().map(|c| c.architecture_focal.clone()))
        .prior(prior.as_ref().map(|c| c.architecture_focal.clone()))
        .resolve(ctx, log)?;

    let compliance = &mut entry.record.compliance;
    compliance.service_now_onboarded = onboarded;
    compliance.bcdr_focal = bcdr_focal;
    compliance.security_focal = security_focal;
    compliance.architecture_focal = architecture_focal;
    Ok(())
}

// ============================================================================
// SECTION: Status Page
// ============================================================================

/// Merges the status-page group.
///
/// The category parent has no directory source: an explicit override wins,
/// otherwise the prior value is carried and checked in phase two.
///
/// # Errors
///
/// Returns [`MergeError`] when an attribute merge is malformed.
pub fn merge_status_page(entry: &mut ServiceEntry, ctx: &MergeContext) -> Result<(), MergeError> {
    let control = &entry.merge_control;
    let override_id = control.override_value(OverrideKey::StatusCategoryId).map(str::to_string);
    let override_parent = control.override_value(OverrideKey::StatusCategoryParent).map(str::to_string);
    let override_group = control.override_value(OverrideKey::NotificationGroup).map(str::to_string);
    let incident = entry.service_now_primary().map(|s| s.item.status_page.clone());
    let prior = entry.prior.as_ref().map(|p| p.status_page.clone());

    let log = &mut entry.validation;
    let category_id = AttributeMerge::new("StatusPage.CategoryID")
        .if_missing(Severity::Ignore, &[IssueTag::StatusPage])
        .if_mismatch(Severity::Warning, &[IssueTag::StatusPage])
        .candidate(SourceKind::OverrideProperty, override_id)
        .candidate(SourceKind::ServiceNow, incident.as_ref().map(|s| s.category_id.clone()))
        .prior(prior.as_ref().map(|s| s.category_id.clone()))
        .resolve(ctx, log)?;
    let group = AttributeMerge::new("StatusPage.Group")
        .if_missing(Severity::Ignore, &[IssueTag::StatusPage])
        .if_mismatch(Severity::Minor, &[IssueTag::StatusPage])
        .candidate(SourceKind::OverrideProperty, override_group)
        .candidate(SourceKind::ServiceNow, incident.as_ref().map(|s| s.group.clone()))
        .prior(prior.as_ref().map(|s| s.group.clone()))
        .resolve(ctx, log)?;
    let category_parent = match override_parent {
        Some(parent) => {
            log.add_sourced(
                Severity::Minor,
                &[IssueTag::StatusPage],
                SourceKind::OverrideProperty,
                "StatusPage.CategoryParent: overridden by control record",
                parent.clone(),
            );
            parent
        }
        None => prior.map(|s| s.category_parent).unwrap_or_default(),
    };

    let status_page = &mut entry.record.status_page;
    status_page.category_id = category_id;
    status_page.category_parent = category_parent;
    status_page.group = group;
    Ok(())
}
