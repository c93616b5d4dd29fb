// crates/ossmerge-core/src/runtime/service/catalog.rs
// ============================================================================
// Module: Catalog Attributes
// Description: Catalog visibility policy, client-facing flags and catalog info.
// Purpose: Decide how much of the catalog entry a service trusts.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! A disabled or private catalog entry is ignored unless the service is known
//! to be restricted on purpose. Public visibility also drives the inferred
//! client-facing flag, which is kept separate from the authoritative flag of
//! the incident system.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::CatalogInfo;
use crate::core::CatalogKind;
use crate::core::EntryType;
use crate::core::IssueTag;
use crate::core::OperationalStatus;
use crate::core::RunAction;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::SourceNameKind;
use crate::core::Tag;
use crate::core::ValidationLog;
use crate::core::VisibilityRestriction;
use crate::runtime::context::MergeContext;
use crate::runtime::context::RunContext;
use crate::runtime::environment::sort_locations;
use crate::runtime::error::MergeError;
use crate::runtime::gating::should_execute;
use crate::runtime::merge::AttributeMerge;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;
use crate::runtime::service::onboarded_tab;

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Maps a service-like catalog kind to an entry type.
#[must_use]
pub const fn entry_type_of_kind(kind: CatalogKind) -> Option<EntryType> {
    match kind {
        CatalogKind::Service => Some(EntryType::Service),
        CatalogKind::Iaas => Some(EntryType::Iaas),
        CatalogKind::Runtime => Some(EntryType::Runtime),
        CatalogKind::Template => Some(EntryType::Template),
        CatalogKind::Composite => Some(EntryType::Composite),
        CatalogKind::PlatformService => Some(EntryType::PlatformComponent),
        _ => None,
    }
}

/// Entry types that are never offered to clients through the catalog.
const NON_CLIENT_TYPES: [EntryType; 6] = [
    EntryType::PlatformComponent,
    EntryType::SubComponent,
    EntryType::SuperComponent,
    EntryType::Internal,
    EntryType::IamOnly,
    EntryType::OtherOss,
];

// ============================================================================
// SECTION: Visibility Policy
// ============================================================================

/// Decides whether the primary catalog entry is ignored.
///
/// Tags must already be normalized.
pub fn apply_visibility_policy(entry: &mut ServiceEntry) {
    let Some(catalog) = entry.catalog.primary.as_ref() else {
        return;
    };
    let effective = catalog.visibility.effective_restriction();
    let reason = if catalog.disabled {
        "disabled"
    } else if effective == VisibilityRestriction::Private {
        "private"
    } else {
        entry.validation.record_source(SourceNameKind::Catalog, catalog.name.clone());
        return;
    };

    let onboarded_sa = onboarded_tab(entry)
        .is_some_and(|tab| tab.operational_status == OperationalStatus::SelectAvailability);
    let keep_because = if onboarded_sa {
        Some("entry is onboarded as select-availability")
    } else if entry.record.general.oss_tags.contains(Tag::SelectAvailability) {
        Some("entry is tagged select-availability")
    } else if matches!(catalog.kind, CatalogKind::PlatformService | CatalogKind::Composite) {
        Some("catalog kind is exempt from visibility filtering")
    } else {
        None
    };

    let name = catalog.name.clone();
    match keep_because {
        Some(because) => {
            entry.validation.add_sourced(
                Severity::Minor,
                &[IssueTag::CatalogInfo],
                SourceKind::Catalog,
                format!("{reason} catalog entry kept"),
                because,
            );
            entry.validation.record_source(SourceNameKind::Catalog, name);
        }
        None => {
            entry.validation.add_sourced(
                Severity::Info,
                &[IssueTag::CatalogInfo],
                SourceKind::Catalog,
                format!("{reason} catalog entry ignored"),
                name.clone(),
            );
            entry.validation.record_source(SourceNameKind::CatalogIgnored, name);
            entry.catalog_ignored = true;
        }
    }
}

/// Resets the status of client-available entries hidden in the catalog.
///
/// Runs after the operational status is merged; the future status is kept.
pub fn check_visibility_status(entry: &mut ServiceEntry) {
    let Some(catalog) = entry.catalog_primary() else {
        return;
    };
    let status = entry.record.general.operational_status;
    let hidden = catalog.active && !catalog.is_public();
    if hidden && status.is_client_available() && !entry.record.general.oss_tags.contains(Tag::SelectAvailability) {
        let details = format!("status={} catalog={}", status.as_str(), catalog.name);
        entry.validation.add_sourced(
            Severity::Severe,
            &[IssueTag::Crn, IssueTag::CatalogInfo],
            SourceKind::Catalog,
            "client-available entry is not publicly visible in catalog",
            details,
        );
        entry.record.general.operational_status = OperationalStatus::Unknown;
    }
}

// ============================================================================
// SECTION: Client Facing
// ============================================================================

/// Merges the client-facing flags.
///
/// # Errors
///
/// Returns [`MergeError`] when the attribute merge is malformed.
pub fn merge_client_facing(entry: &mut ServiceEntry, ctx: &MergeContext) -> Result<(), MergeError> {
    let tab = onboarded_tab(entry).map(|tab| tab.client_facing);
    let value = AttributeMerge::new("ClientFacing")
        .if_missing(Severity::Warning, &[IssueTag::ServiceNow])
        .if_mismatch(Severity::Warning, &[IssueTag::ServiceNow])
        .candidate(SourceKind::ServiceNow, entry.service_now_primary().map(|s| s.item.client_facing))
        .candidate(SourceKind::RmcOss, tab)
        .prior(entry.prior.as_ref().map(|p| p.general.client_facing))
        .resolve(ctx, &mut entry.validation)?;
    entry.record.general.client_facing = value;

    let entry_type = entry.record.general.entry_type;
    let public = entry.catalog_primary().is_some_and(|catalog| catalog.active && catalog.is_public());
    let tags = &entry.record.general.oss_tags;
    let inferred = if tags.contains(Tag::NotClientFacing) {
        false
    } else if tags.contains(Tag::ClientFacing) {
        true
    } else {
        public && !NON_CLIENT_TYPES.contains(&entry_type)
    };
    entry.record.general.catalog_client_facing = inferred;

    if entry.record.general.operational_status == OperationalStatus::SelectAvailability && public {
        entry.validation.add_sourced(
            Severity::Severe,
            &[IssueTag::Crn, IssueTag::CatalogInfo],
            SourceKind::Catalog,
            "select-availability entry is publicly visible in catalog",
            "",
        );
    }
    if ctx.loaded.catalog && entry.catalog_primary().is_some() && value != inferred {
        entry.validation.add(
            Severity::Minor,
            &[IssueTag::ServiceNow, IssueTag::CatalogInfo],
            "client-facing flag differs from catalog visibility",
            format!("ServiceNow={value} Catalog={inferred}"),
        );
    }
    Ok(())
}

// ============================================================================
// SECTION: Catalog Info
// ============================================================================

/// Merges provider data and deployment locations.
///
/// # Errors
///
/// Returns [`MergeError`] when an attribute merge is malformed.
pub fn merge_catalog_info(entry: &mut ServiceEntry, run: &RunContext<'_>, ctx: &MergeContext) -> Result<(), MergeError> {
    let provider = entry.catalog_primary().map(|catalog| catalog.provider.clone()).unwrap_or_default();
    let has_catalog = entry.catalog_primary().is_some();
    let prior = entry.prior.as_ref().map(|p| p.catalog_info.clone());
    let pick = |value: &str| has_catalog.then(|| value.to_string());
    let log = &mut entry.validation;
    let merged = CatalogInfo {
        provider: merge_provider_field(log, ctx, "Provider", pick(&provider.name), prior.as_ref().map(|c| c.provider.clone()))?,
        provider_contact: merge_provider_field(
            log,
            ctx,
            "ProviderContact",
            pick(&provider.contact),
            prior.as_ref().map(|c| c.provider_contact.clone()),
        )?,
        provider_support_email: merge_provider_field(
            log,
            ctx,
            "ProviderSupportEmail",
            pick(&provider.support_email),
            prior.as_ref().map(|c| c.provider_support_email.clone()),
        )?,
        provider_phone: merge_provider_field(
            log,
            ctx,
            "ProviderPhone",
            pick(&provider.phone),
            prior.as_ref().map(|c| c.provider_phone.clone()),
        )?,
        locations: Vec::new(),
    };
    entry.record.catalog_info = merged;

    if should_execute(run.config.actions, RunAction::Deployments, &mut entry.validation, "catalog locations") {
        let mut locations: Vec<String> = entry
            .catalog_deployments
            .iter()
            .filter_map(|deployment| deployment.deployment.as_ref())
            .map(|deployment| deployment.location.clone())
            .filter(|location| !location.is_empty())
            .collect();
        locations.sort();
        locations.dedup();
        sort_locations(&mut locations);
        entry.record.catalog_info.locations = locations;
    } else {
        entry.record.catalog_info.locations = prior.map(|c| c.locations).unwrap_or_default();
    }
    Ok(())
}

/// Merges one provider string from the catalog and the prior record.
fn merge_provider_field(
    log: &mut ValidationLog,
    ctx: &MergeContext,
    attribute: &str,
    catalog: Option<String>,
    prior: Option<String>,
) -> Result<String, MergeError> {
    let value = AttributeMerge::new(attribute)
        .if_missing(Severity::Ignore, &[IssueTag::CatalogInfo])
        .if_mismatch(Severity::Minor, &[IssueTag::CatalogInfo])
        .candidate(SourceKind::Catalog, catalog)
        .prior(prior)
        .resolve(ctx, log)?;
    Ok(value)
}

/// Sets the catalog identifier and path from the primary catalog entry.
pub fn merge_catalog_identity(entry: &mut ServiceEntry, registry: &Registry) {
    let Some(catalog) = entry.catalog_primary() else {
        if let Some(prior) = entry.prior.as_ref() {
            entry.record.reference_catalog_id.clone_from(&prior.reference_catalog_id);
            entry.record.reference_catalog_path.clone_from(&prior.reference_catalog_path);
        }
        return;
    };
    let id = catalog.id.clone();
    let mut path = vec![catalog.name.clone()];
    let mut parent_id = catalog.parent_id.clone();
    let mut seen = vec![id.clone()];
    while let Some(parent) = registry.catalog_resource(&parent_id) {
        if seen.contains(&parent.id) {
            break;
        }
        seen.push(parent.id.clone());
        path.push(parent.name.clone());
        parent_id.clone_from(&parent.parent_id);
    }
    path.reverse();
    entry.record.reference_catalog_id = id;
    entry.record.reference_catalog_path = path.join("/");
}
