// crates/ossmerge-core/src/runtime/populate.rs
// ============================================================================
// Module: Registry Population
// Description: Placement of loaded source records into registry entries.
// Purpose: Attach every record to the entity it describes before merging.
// Dependencies: crate::core, crate::runtime::registry, tracing
// ============================================================================

//! ## Overview
//! Service records are keyed by the comparable form of the name each source
//! gives them. Catalog plans and deployments reach their service through the
//! catalog parent chain; location resources, fleet environments and region
//! ids are keyed by normalized location CRN.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::CatalogResource;
use crate::core::DeliverableFull;
use crate::core::DeliverableSummary;
use crate::core::FleetEnvironment;
use crate::core::IdentityEntry;
use crate::core::IncidentRecord;
use crate::core::IssueTag;
use crate::core::MaturityEntry;
use crate::core::PriorRecord;
use crate::core::PriorService;
use crate::core::RegionId;
use crate::core::ScorecardEntry;
use crate::core::ScorecardSegment;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::TribeRecord;
use crate::core::ValidationLog;
use crate::core::normalize_location_crn;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceIdx;
use crate::runtime::service::naming::catalog_own_name;

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Every record read from the directories for one run.
#[derive(Debug, Clone, Default)]
pub struct SourceInputs {
    /// Prior canonical records.
    pub prior: Vec<PriorRecord>,
    /// Catalog resources.
    pub catalog: Vec<CatalogResource>,
    /// Incident-system records.
    pub incident: Vec<IncidentRecord>,
    /// Scorecard entries.
    pub scorecard: Vec<ScorecardEntry>,
    /// Scorecard segments with their tribes.
    pub scorecard_segments: Vec<ScorecardSegment>,
    /// Identity-service registrations.
    pub identity: Vec<IdentityEntry>,
    /// Maturity-manager entries.
    pub maturity: Vec<MaturityEntry>,
    /// Clearinghouse deliverable summaries.
    pub deliverables: Vec<DeliverableSummary>,
    /// Full clearinghouse deliverables.
    pub deliverables_full: Vec<DeliverableFull>,
    /// Fleet environments.
    pub fleet: Vec<FleetEnvironment>,
    /// Region-id entries.
    pub regions: Vec<RegionId>,
}

// ============================================================================
// SECTION: Population
// ============================================================================

/// Returns the registry key of a location CRN, falling back to the raw form.
fn location_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(normalize_location_crn(trimmed).unwrap_or_else(|| trimmed.to_string()))
}

/// Attaches a prior service record.
fn attach_prior_service(registry: &mut Registry, prior: PriorService, run_log: &mut ValidationLog) {
    let name = prior.record.reference_resource_name.clone();
    let Some(idx) = registry.service_or_insert(&name) else {
        run_log.add(Severity::Warning, &[IssueTag::Data], "prior service record has no name", "");
        return;
    };
    let entry = registry.service_mut(idx);
    if entry.prior.is_some() {
        run_log.add_sourced(
            Severity::Warning,
            &[IssueTag::Data, IssueTag::Duplicate],
            SourceKind::PriorOss,
            "more than one prior record for the same name",
            name,
        );
        return;
    }
    entry.prior = Some(prior.record);
    entry.prior_validation = prior.validation;
    if let Some(control) = prior.merge_control {
        entry.merge_control = control;
    }
}

/// Attaches prior records and returns the prior tribes.
fn attach_prior(registry: &mut Registry, prior: Vec<PriorRecord>, run_log: &mut ValidationLog) -> Vec<TribeRecord> {
    let mut tribes = Vec::new();
    for record in prior {
        match record {
            PriorRecord::Service(service) => attach_prior_service(registry, *service, run_log),
            PriorRecord::Segment(segment) => {
                if segment.segment_id.is_empty() {
                    continue;
                }
                let idx = registry.segment_or_insert(&segment.segment_id);
                registry.segment_mut(idx).prior = Some(segment);
            }
            PriorRecord::Tribe(tribe) => tribes.push(tribe),
            PriorRecord::Environment(environment) => {
                let Some(key) = location_key(&environment.environment_id) else {
                    continue;
                };
                let idx = registry.environment_or_insert(&key);
                registry.environment_mut(idx).prior = Some(environment);
            }
        }
    }
    tribes
}

/// Attaches catalog resources to services and environments.
fn attach_catalog(registry: &mut Registry, catalog: Vec<CatalogResource>, run_log: &mut ValidationLog) {
    let mut owners: BTreeMap<String, ServiceIdx> = BTreeMap::new();
    let mut children = Vec::new();
    for resource in catalog {
        registry.store_catalog_resource(&resource);
        if resource.kind.is_service_like() {
            let Some(idx) = registry.service_or_insert(catalog_own_name(&resource.name)) else {
                continue;
            };
            owners.insert(resource.id.clone(), idx);
            registry.service_mut(idx).catalog.push(resource);
        } else if resource.kind.is_location() {
            let crn = resource.deployment.as_ref().and_then(|d| location_key(&d.target_crn));
            if let Some(crn) = crn {
                let idx = registry.environment_or_insert(&crn);
                registry.environment_mut(idx).catalog.push(resource);
            }
        } else {
            children.push(resource);
        }
    }

    // Plans first, so deployments of plans find their service.
    children.sort_by_key(|resource| !resource.kind.is_plan_like());
    let mut orphans = 0_usize;
    for resource in children {
        let Some(idx) = owners.get(&resource.parent_id).copied() else {
            orphans += 1;
            continue;
        };
        let entry = registry.service_mut(idx);
        if resource.kind.is_plan_like() {
            owners.insert(resource.id.clone(), idx);
            entry.catalog_plans.push(resource);
        } else {
            entry.catalog_deployments.push(resource);
        }
    }
    if orphans > 0 {
        run_log.add_sourced(
            Severity::Info,
            &[IssueTag::CatalogInfo],
            SourceKind::Catalog,
            "catalog plans or deployments without a parent service",
            format!("count={orphans}"),
        );
    }
}

/// Places every loaded record into the registry.
///
/// Returns the prior tribe records, which the segment merger consumes.
pub fn populate(registry: &mut Registry, inputs: SourceInputs, run_log: &mut ValidationLog) -> Vec<TribeRecord> {
    let prior_tribes = attach_prior(registry, inputs.prior, run_log);
    attach_catalog(registry, inputs.catalog, run_log);

    for record in inputs.incident {
        if let Some(idx) = registry.service_or_insert(&record.item.crn_service_name) {
            registry.service_mut(idx).service_now.push(record);
        }
    }
    for entry in inputs.scorecard {
        if let Some(idx) = registry.service_or_insert(&entry.name) {
            registry.service_mut(idx).scorecard.push(entry);
        }
    }
    for identity in inputs.identity {
        if let Some(idx) = registry.service_or_insert(&identity.name) {
            registry.service_mut(idx).iam.push(identity);
        }
    }
    for maturity in inputs.maturity {
        let Some(idx) = registry.service_or_insert(&maturity.crn_service_name) else {
            continue;
        };
        let entry = registry.service_mut(idx);
        if entry.rmc.is_some() {
            run_log.add_sourced(
                Severity::Warning,
                &[IssueTag::Rmc, IssueTag::Duplicate],
                SourceKind::Rmc,
                "more than one RMC entry for the same name",
                maturity.crn_service_name,
            );
            continue;
        }
        entry.rmc = Some(maturity);
    }

    for summary in inputs.deliverables {
        registry.store_deliverable(summary);
    }
    for full in inputs.deliverables_full {
        registry.store_deliverable_full(full);
    }

    for fleet in inputs.fleet {
        if let Some(crn) = location_key(&fleet.new_crn) {
            let idx = registry.environment_or_insert(&crn);
            registry.environment_mut(idx).fleet.push(fleet);
        }
    }
    for region in inputs.regions {
        if let Some(crn) = location_key(&region.crn) {
            let idx = registry.environment_or_insert(&crn);
            registry.environment_mut(idx).region.push(region);
        }
    }
    debug!(
        services = registry.service_count(),
        environments = registry.environment_indices().len(),
        "registry populated"
    );
    prior_tribes
}
