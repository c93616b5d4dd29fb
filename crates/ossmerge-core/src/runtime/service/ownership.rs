// crates/ossmerge-core/src/runtime/service/ownership.rs
// ============================================================================
// Module: Service Ownership
// Description: Tribe, segment and manager attributes of a service.
// Purpose: Resolve ownership through the org units merged beforehand.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! Only the tribe identifier is merged across sources. Tribe and segment
//! names and owners are then filled from the registry, so every service of
//! one tribe carries the same reconciled org data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::IssueTag;
use crate::core::Person;
use crate::core::SegmentId;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::TribeId;
use crate::runtime::context::MergeContext;
use crate::runtime::error::MergeError;
use crate::runtime::merge::AttributeMerge;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Source label of tribe identifiers resolved from scorecard names.
pub const SCORECARD_TRIBE_SOURCE: &str = "ScorecardTribe";

// ============================================================================
// SECTION: Ownership
// ============================================================================

/// Resolves the tribe named by the scorecard entry, if any.
fn scorecard_tribe(entry: &ServiceEntry, registry: &Registry) -> Option<TribeId> {
    let scorecard = entry.scorecard.primary.as_ref()?;
    let segment = registry.segment_by_name(&scorecard.business_unit)?;
    let tribe = registry.tribe_by_name(segment, &scorecard.tribe)?;
    Some(registry.tribe(tribe).record.tribe_id.clone())
}

/// Merges ownership and fills org data from the registry.
///
/// # Errors
///
/// Returns [`MergeError`] when an attribute merge is malformed.
pub fn merge_ownership(entry: &mut ServiceEntry, registry: &Registry, ctx: &MergeContext) -> Result<(), MergeError> {
    let from_scorecard = if entry.scorecard.primary.is_some() {
        Some(scorecard_tribe(entry, registry).unwrap_or_default())
    } else {
        None
    };
    let tribe_id = AttributeMerge::new("TribeID")
        .if_missing(Severity::Severe, &[IssueTag::Ownership])
        .if_mismatch(Severity::Warning, &[IssueTag::Ownership])
        .candidate(SourceKind::ServiceNow, entry.service_now_primary().map(|s| s.item.ownership.tribe_id.clone()))
        .candidate(SourceKind::Custom(SCORECARD_TRIBE_SOURCE.to_string()), from_scorecard)
        .prior(entry.prior.as_ref().map(|p| p.ownership.tribe_id.clone()))
        .resolve(ctx, &mut entry.validation)?;

    let ownership = &mut entry.record.ownership;
    ownership.tribe_id = tribe_id.clone();
    if let Some(tribe_idx) = registry.tribe_by_id(&tribe_id) {
        let tribe = registry.tribe(tribe_idx);
        let segment = registry.segment(tribe.segment);
        ownership.tribe_name.clone_from(&tribe.record.display_name);
        ownership.tribe_owner.clone_from(&tribe.record.owner);
        ownership.segment_id.clone_from(&segment.record.segment_id);
        ownership.segment_name.clone_from(&segment.record.display_name);
        ownership.segment_owner.clone_from(&segment.record.owner);
    } else {
        ownership.tribe_name.clear();
        ownership.tribe_owner = Person::default();
        ownership.segment_id = SegmentId::default();
        ownership.segment_name.clear();
        ownership.segment_owner = Person::default();
        if !tribe_id.is_empty() {
            entry.validation.add(
                Severity::Severe,
                &[IssueTag::Ownership, IssueTag::Tribe],
                "tribe id not found in any segment",
                tribe_id.to_string(),
            );
        }
    }

    let offering_manager = AttributeMerge::new("OfferingManager")
        .if_missing(Severity::Warning, &[IssueTag::Ownership])
        .if_mismatch(Severity::Minor, &[IssueTag::Ownership])
        .candidate(
            SourceKind::ServiceNow,
            entry.service_now_primary().map(|s| s.item.ownership.offering_manager.clone()),
        )
        .candidate(SourceKind::ScorecardV1, entry.scorecard.primary.as_ref().map(|s| s.management_contact.clone()))
        .prior(entry.prior.as_ref().map(|p| p.ownership.offering_manager.clone()))
        .resolve(ctx, &mut entry.validation)?;
    let development_manager = AttributeMerge::new("DevelopmentManager")
        .if_missing(Severity::Minor, &[IssueTag::Ownership])
        .if_mismatch(Severity::Minor, &[IssueTag::Ownership])
        .candidate(SourceKind::ScorecardV1, entry.scorecard.primary.as_ref().map(|s| s.tech_contact.clone()))
        .prior(entry.prior.as_ref().map(|p| p.ownership.development_manager.clone()))
        .resolve(ctx, &mut entry.validation)?;
    entry.record.ownership.offering_manager = offering_manager;
    entry.record.ownership.development_manager = development_manager;
    Ok(())
}
