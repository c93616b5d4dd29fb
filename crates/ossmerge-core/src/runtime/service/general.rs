// crates/ossmerge-core/src/runtime/service/general.rs
// ============================================================================
// Module: General Service Attributes
// Description: Display name, entry type and operational status merging.
// Purpose: Apply the override and precedence rules of derived attributes.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! Entry type and operational status are derived attributes: a fixed list of
//! rules is tried in priority order and the first applicable rule decides.
//! Only when no rule applies are the source values merged with the attribute
//! merge primitive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::CatalogKind;
use crate::core::EntryType;
use crate::core::IssueTag;
use crate::core::OnboardingPhase;
use crate::core::OperationalStatus;
use crate::core::OverrideKey;
use crate::core::SegmentType;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::Tag;
use crate::runtime::context::MergeContext;
use crate::runtime::error::MergeError;
use crate::runtime::merge::AttributeMerge;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;
use crate::runtime::service::catalog::entry_type_of_kind;
use crate::runtime::service::onboarded_tab;

// ============================================================================
// SECTION: Display Name
// ============================================================================

/// Merges the canonical display name.
///
/// # Errors
///
/// Returns [`MergeError`] when the attribute merge is malformed.
pub fn merge_display_name(entry: &mut ServiceEntry, ctx: &MergeContext) -> Result<(), MergeError> {
    let tab = onboarded_tab(entry).map(|tab| tab.display_name.clone());
    let value = AttributeMerge::new("DisplayName")
        .if_missing(Severity::Warning, &[IssueTag::Naming])
        .if_mismatch(Severity::Minor, &[IssueTag::Naming])
        .candidate(
            SourceKind::OverrideProperty,
            entry.merge_control.override_value(OverrideKey::DisplayName).map(str::to_string),
        )
        .candidate(SourceKind::RmcOss, tab)
        .candidate(SourceKind::Catalog, entry.catalog_primary().map(|c| c.display_name.clone()))
        .candidate(SourceKind::ServiceNow, entry.service_now_primary().map(|s| s.item.display_name.clone()))
        .candidate(SourceKind::ScorecardV1, entry.scorecard.primary.as_ref().map(|s| s.display_name.clone()))
        .candidate(SourceKind::Iam, entry.iam.primary.as_ref().map(|i| i.display_name.clone()))
        .candidate(SourceKind::Rmc, entry.rmc.as_ref().map(|r| r.display_name.clone()))
        .prior(entry.prior.as_ref().map(|p| p.reference_display_name.clone()))
        .resolve(ctx, &mut entry.validation)?;
    entry.record.reference_display_name = value;
    Ok(())
}

// ============================================================================
// SECTION: Entry Type
// ============================================================================

/// Override tags that force an entry type, in priority order.
const TYPE_OVERRIDES: [(Tag, EntryType); 10] = [
    (Tag::TypeContent, EntryType::Content),
    (Tag::TypeConsulting, EntryType::Consulting),
    (Tag::TypeInternal, EntryType::Internal),
    (Tag::TypeOtherOss, EntryType::OtherOss),
    (Tag::TypeIamOnly, EntryType::IamOnly),
    (Tag::TypeGaas, EntryType::Gaas),
    (Tag::TypeComponent, EntryType::PlatformComponent),
    (Tag::TypeSubcomponent, EntryType::SubComponent),
    (Tag::TypeSupercomponent, EntryType::SuperComponent),
    (Tag::TypeVmware, EntryType::Vmware),
];

/// Main-tab entry types that must agree with the operations tab.
const RMC_CHECKED_TYPES: [EntryType; 3] =
    [EntryType::Service, EntryType::PlatformComponent, EntryType::Composite];

/// Name prefix of content entries.
const CONTENT_PREFIX: &str = "content-ibm-cp";

/// Merges the entry type.
///
/// Ownership must already be merged so the owning segment type is known.
///
/// # Errors
///
/// Returns [`MergeError`] when the attribute merge is malformed.
pub fn merge_entry_type(
    entry: &mut ServiceEntry,
    registry: &Registry,
    ctx: &MergeContext,
) -> Result<(), MergeError> {
    let value = derive_entry_type(entry, registry, ctx)?;
    entry.record.general.entry_type = value;
    Ok(())
}

/// Applies the entry-type rules in priority order.
fn derive_entry_type(
    entry: &mut ServiceEntry,
    registry: &Registry,
    ctx: &MergeContext,
) -> Result<EntryType, MergeError> {
    let catalog_type = entry.catalog_primary().and_then(|c| entry_type_of_kind(c.kind));
    let incident_type = entry.service_now_primary().map(|s| s.item.entry_type);

    if let Some(tab_type) = onboarded_tab(entry).map(|tab| tab.entry_type) {
        if let Some(main) = entry.rmc.as_ref().map(|rmc| rmc.entry_type) {
            if main != tab_type && RMC_CHECKED_TYPES.contains(&main) {
                entry.validation.add_sourced(
                    Severity::Severe,
                    &[IssueTag::Rmc],
                    SourceKind::RmcOss,
                    "entry type differs between RMC main and OSS tabs",
                    format!("RMC={} RMC-OSS={}", main.as_str(), tab_type.as_str()),
                );
            }
        }
        if tab_type != EntryType::Unknown {
            return Ok(tab_type);
        }
    }

    let tags = &entry.record.general.oss_tags;
    if let Some((tag, forced)) = TYPE_OVERRIDES.iter().find(|(tag, _)| tags.contains(*tag)) {
        let disagreeing: Vec<String> = [(SourceKind::Catalog, catalog_type), (SourceKind::ServiceNow, incident_type)]
            .into_iter()
            .filter_map(|(source, value)| value.map(|value| (source, value)))
            .filter(|(_, value)| *value != EntryType::Unknown && *value != *forced)
            .map(|(source, value)| format!("{source}={}", value.as_str()))
            .collect();
        if !disagreeing.is_empty() {
            entry.validation.add_sourced(
                Severity::Deferred,
                &[IssueTag::Tags],
                SourceKind::OverrideTag,
                format!("entry type forced by tag {tag}"),
                disagreeing.join(" "),
            );
        }
        return Ok(*forced);
    }

    let segment_is_gaas = registry
        .segment_by_id(&entry.record.ownership.segment_id)
        .is_some_and(|idx| registry.segment(idx).record.segment_type == SegmentType::Gaas);
    if segment_is_gaas {
        return Ok(EntryType::Gaas);
    }

    if let Some(catalog) = entry.catalog_primary() {
        if catalog.has_tag("vmware") {
            return Ok(EntryType::Vmware);
        }
        match catalog.kind {
            CatalogKind::Composite => return Ok(EntryType::Composite),
            CatalogKind::Iaas if incident_type == Some(EntryType::Service) => return Ok(EntryType::Iaas),
            _ => {}
        }
    }

    if entry.record.reference_resource_name.starts_with(CONTENT_PREFIX) {
        return Ok(EntryType::Content);
    }

    let has_identity = entry.iam.primary.is_some();
    let no_other = entry.service_now.primary.is_none() && entry.scorecard.primary.is_none();
    if has_identity && no_other {
        match entry.catalog_primary() {
            None => return Ok(EntryType::IamOnly),
            Some(catalog) if catalog.kind == CatalogKind::PlatformService => {
                let child_of_composite = registry
                    .catalog_resource(&catalog.parent_id)
                    .is_some_and(|parent| parent.kind == CatalogKind::Composite);
                if child_of_composite {
                    return Ok(EntryType::IamOnly);
                }
            }
            Some(_) => {}
        }
    }

    let tab_type = onboarded_tab(entry).map(|tab| tab.entry_type);
    let value = AttributeMerge::new("EntryType")
        .if_missing(Severity::Severe, &[IssueTag::Crn])
        .if_mismatch(Severity::Warning, &[IssueTag::Crn])
        .candidate(SourceKind::RmcOss, tab_type)
        .candidate(SourceKind::Catalog, catalog_type)
        .candidate(SourceKind::ServiceNow, incident_type)
        .candidate(SourceKind::Rmc, entry.rmc.as_ref().map(|rmc| rmc.entry_type))
        .prior(entry.prior.as_ref().map(|p| p.general.entry_type))
        .resolve(ctx, &mut entry.validation)?;
    Ok(value)
}

// ============================================================================
// SECTION: Operational Status
// ============================================================================

/// Status tags that force an operational status, in priority order.
const STATUS_OVERRIDES: [(Tag, OperationalStatus); 6] = [
    (Tag::Invalid, OperationalStatus::Retired),
    (Tag::Retired, OperationalStatus::Retired),
    (Tag::Deprecated, OperationalStatus::Deprecated),
    (Tag::NotReady, OperationalStatus::NotReady),
    (Tag::SelectAvailability, OperationalStatus::SelectAvailability),
    (Tag::Internal, OperationalStatus::Internal),
];

/// Parses a free-text status label as used by the scorecard and RMC.
#[must_use]
pub fn parse_status_label(label: &str) -> OperationalStatus {
    let folded: String = label
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    match folded.as_str() {
        "ga" | "generallyavailable" | "production" => OperationalStatus::Ga,
        "beta" | "openbeta" | "closedbeta" => OperationalStatus::Beta,
        "experimental" => OperationalStatus::Experimental,
        "selectavailability" | "limitedavailability" => OperationalStatus::SelectAvailability,
        "deprecated" => OperationalStatus::Deprecated,
        "retired" | "decommissioned" => OperationalStatus::Retired,
        "thirdparty" => OperationalStatus::ThirdParty,
        "community" => OperationalStatus::Community,
        "internal" => OperationalStatus::Internal,
        "notready" | "planning" => OperationalStatus::NotReady,
        _ => OperationalStatus::Unknown,
    }
}

/// Merges the operational status.
///
/// # Errors
///
/// Returns [`MergeError`] when the attribute merge is malformed.
pub fn merge_status(entry: &mut ServiceEntry, ctx: &MergeContext) -> Result<(), MergeError> {
    let tags = &entry.record.general.oss_tags;
    if let Some((tag, forced)) = STATUS_OVERRIDES.iter().find(|(tag, _)| tags.contains(*tag)) {
        let incident = entry.service_now_primary().map(|s| s.item.operational_status);
        if let Some(incident) = incident.filter(|value| *value != OperationalStatus::Unknown && *value != *forced) {
            entry.validation.add_sourced(
                Severity::Deferred,
                &[IssueTag::Tags],
                SourceKind::OverrideTag,
                format!("operational status forced by tag {tag}"),
                format!("ServiceNow={}", incident.as_str()),
            );
        }
        entry.record.general.operational_status = *forced;
        return Ok(());
    }

    if entry.record.general.onboarding_phase == OnboardingPhase::Invalid {
        entry.validation.add_sourced(
            Severity::Info,
            &[IssueTag::Rmc],
            SourceKind::RmcOss,
            "operational status set to retired for invalid RMC onboarding",
            "",
        );
        entry.record.general.operational_status = OperationalStatus::Retired;
        return Ok(());
    }

    let tab = onboarded_tab(entry).map(|tab| tab.operational_status);
    let value = AttributeMerge::new("OperationalStatus")
        .if_missing(Severity::Severe, &[IssueTag::Crn])
        .if_mismatch(Severity::Warning, &[IssueTag::Crn])
        .candidate(SourceKind::RmcOss, tab)
        .candidate(SourceKind::ServiceNow, entry.service_now_primary().map(|s| s.item.operational_status))
        .candidate(SourceKind::Rmc, entry.rmc.as_ref().map(|rmc| parse_status_label(&rmc.maturity)))
        .candidate(
            SourceKind::ScorecardV1,
            entry.scorecard.primary.as_ref().map(|s| parse_status_label(&s.status)),
        )
        .prior(entry.prior.as_ref().map(|p| p.general.operational_status))
        .resolve(ctx, &mut entry.validation)?;
    entry.record.general.operational_status = value;
    Ok(())
}

/// Merges the future operational status, clearing it when equal to the status.
///
/// # Errors
///
/// Returns [`MergeError`] when the attribute merge is malformed.
pub fn merge_future_status(entry: &mut ServiceEntry, ctx: &MergeContext) -> Result<(), MergeError> {
    let tab = onboarded_tab(entry).map(|tab| tab.future_operational_status);
    let value = AttributeMerge::new("FutureOperationalStatus")
        .if_missing(Severity::Ignore, &[])
        .candidate(SourceKind::RmcOss, tab)
        .prior(entry.prior.as_ref().map(|p| p.general.future_operational_status))
        .resolve(ctx, &mut entry.validation)?;
    if value != OperationalStatus::Unknown && value == entry.record.general.operational_status {
        entry.validation.add(
            Severity::Info,
            &[IssueTag::Rmc],
            "future operational status cleared",
            format!("equal to current status {}", value.as_str()),
        );
        entry.record.general.future_operational_status = OperationalStatus::Unknown;
    } else {
        entry.record.general.future_operational_status = value;
    }
    Ok(())
}
