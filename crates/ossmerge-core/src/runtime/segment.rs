// crates/ossmerge-core/src/runtime/segment.rs
// ============================================================================
// Module: Segment and Tribe Merger
// Description: Canonical segment and tribe records from the scorecard.
// Purpose: Build the organization tree services resolve ownership against.
// Dependencies: crate::core, crate::runtime, tracing
// ============================================================================

//! ## Overview
//! The scorecard is the single source of truth for segment and tribe owners.
//! The prior canonical record supplies tags and approver lists. Segment type
//! is public-cloud unless a `type-gaas` tag forces gaas, and exactly one
//! segment may carry `default-segment`; environments fall back to it as their
//! owning segment.
//!
//! Duplicate segment or tribe identifiers keep the first record and log a
//! severe issue on it. Duplicate tribe names within a segment are suffixed
//! `#2`, `#3`, and so on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::info;

use crate::core::IssueTag;
use crate::core::RunAction;
use crate::core::ScorecardSegment;
use crate::core::ScorecardTribe;
use crate::core::SegmentType;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::Tag;
use crate::core::TribeId;
use crate::core::TribeRecord;
use crate::core::ValidationLog;
use crate::runtime::context::RunContext;
use crate::runtime::error::MergeError;
use crate::runtime::gating::should_execute;
use crate::runtime::merge::AttributeMerge;
use crate::runtime::phase::EntityPhase;
use crate::runtime::phase::GlobalPhase;
use crate::runtime::phase::PhaseController;
use crate::runtime::phase::advance_entity_through;
use crate::runtime::registry::Registry;
use crate::runtime::registry::SegmentIdx;
use crate::runtime::registry::TribeIdx;

// ============================================================================
// SECTION: Segments
// ============================================================================

/// Merges every segment and tribe.
///
/// Prior segment records must already be attached to the registry; prior
/// tribe records are passed in.
///
/// # Errors
///
/// Returns [`MergeError`] on phase violations or malformed attribute merges.
pub fn merge_segments(
    registry: &mut Registry,
    phases: &PhaseController,
    ctx: &RunContext<'_>,
    scorecard: &[ScorecardSegment],
    prior_tribes: Vec<TribeRecord>,
    run_log: &mut ValidationLog,
) -> Result<(), MergeError> {
    phases.expect("segment-merger", GlobalPhase::Segments)?;

    let execute = should_execute(ctx.config.actions, RunAction::Tribes, run_log, "segments and tribes");
    if execute {
        attach_scorecard(registry, scorecard);
    }

    let mut priors_by_id: BTreeMap<TribeId, TribeRecord> =
        prior_tribes.into_iter().map(|tribe| (tribe.tribe_id.clone(), tribe)).collect();

    for idx in registry.segment_indices() {
        merge_segment_record(registry, idx, ctx, execute)?;
        let scorecard_tribes = registry
            .segment(idx)
            .scorecard
            .as_ref()
            .map(|segment| segment.tribes.clone())
            .unwrap_or_default();
        for tribe in scorecard_tribes {
            let prior = priors_by_id.remove(&tribe.id);
            let (record, log) = merge_tribe_record(registry, idx, ctx, &tribe, prior.as_ref())?;
            if let Some(inserted) = insert_unique_tribe(registry, idx, record, prior)? {
                registry.tribe_mut(inserted).validation.absorb(&log);
            }
        }
    }

    // Tribes only known from the prior run are carried forward unchanged.
    for (_, prior) in priors_by_id {
        let Some(segment) = registry.segment_by_id(&prior.segment_id) else {
            run_log.add(
                Severity::Warning,
                &[IssueTag::Tribe],
                "prior tribe has no segment",
                format!("tribe {} references segment {}", prior.tribe_id, prior.segment_id),
            );
            continue;
        };
        if execute && registry.segment(segment).scorecard.is_some() {
            let mut log = ValidationLog::new(prior.tribe_id.as_str());
            log.add(
                Severity::Warning,
                &[IssueTag::Tribe, IssueTag::Scorecard],
                "tribe no longer listed in scorecard",
                format!("segment {}", prior.segment_id),
            );
            if let Some(tribe) = insert_unique_tribe(registry, segment, prior.clone(), Some(prior))? {
                registry.tribe_mut(tribe).validation.absorb(&log);
            }
        } else {
            insert_unique_tribe(registry, segment, prior.clone(), Some(prior))?;
        }
    }

    select_default_segment(registry, run_log);

    for idx in registry.segment_indices() {
        let entry = registry.segment_mut(idx);
        let name = entry.record.segment_id.as_str().to_string();
        entry.validation.sort();
        advance_entity_through(&mut entry.phase, &name, EntityPhase::Finalized)?;
    }
    for idx in registry.tribe_indices() {
        let entry = registry.tribe_mut(idx);
        let name = entry.record.tribe_id.as_str().to_string();
        entry.validation.sort();
        advance_entity_through(&mut entry.phase, &name, EntityPhase::Finalized)?;
    }
    info!(
        segments = registry.segment_indices().len(),
        tribes = registry.tribe_indices().len(),
        "segments and tribes merged"
    );
    Ok(())
}

/// Attaches scorecard segments, keeping the first record per identifier.
fn attach_scorecard(registry: &mut Registry, scorecard: &[ScorecardSegment]) {
    for segment in scorecard {
        if segment.id.is_empty() {
            continue;
        }
        let idx = registry.segment_or_insert(&segment.id);
        let entry = registry.segment_mut(idx);
        if entry.scorecard.is_some() {
            entry.validation.add_sourced(
                Severity::Severe,
                &[IssueTag::Segment, IssueTag::Duplicate],
                SourceKind::ScorecardV1,
                "duplicate segment id in scorecard",
                format!("segment {} is also listed as \"{}\"", segment.id, segment.name),
            );
            continue;
        }
        entry.scorecard = Some(segment.clone());
    }
}

/// Merges the attributes of one segment.
fn merge_segment_record(
    registry: &mut Registry,
    idx: SegmentIdx,
    ctx: &RunContext<'_>,
    execute: bool,
) -> Result<(), MergeError> {
    let merge_ctx = ctx.merge_context(false);
    let entry = registry.segment_mut(idx);
    if !execute {
        if let Some(prior) = entry.prior.clone() {
            entry.record = prior;
        }
        return index_segment_name(registry, idx);
    }
    let prior = entry.prior.clone();
    let scorecard = entry.scorecard.clone();
    let log = &mut entry.validation;

    entry.record.display_name = AttributeMerge::new("DisplayName")
        .if_missing(Severity::Warning, &[IssueTag::Segment])
        .candidate(SourceKind::ScorecardV1, scorecard.as_ref().map(|segment| segment.name.clone()))
        .prior(prior.as_ref().map(|record| record.display_name.clone()))
        .resolve(&merge_ctx, log)?;
    entry.record.owner = AttributeMerge::new("Owner")
        .if_missing(Severity::Severe, &[IssueTag::Segment, IssueTag::Ownership])
        .candidate(SourceKind::ScorecardV1, scorecard.as_ref().map(|segment| segment.owner.clone()))
        .prior(prior.as_ref().map(|record| record.owner.clone()))
        .resolve(&merge_ctx, log)?;
    entry.record.technical_contact = AttributeMerge::new("TechnicalContact")
        .if_missing(Severity::Warning, &[IssueTag::Segment, IssueTag::Ownership])
        .candidate(
            SourceKind::ScorecardV1,
            scorecard.as_ref().map(|segment| segment.technical_contact.clone()),
        )
        .prior(prior.as_ref().map(|record| record.technical_contact.clone()))
        .resolve(&merge_ctx, log)?;
    if let Some(prior) = prior.as_ref() {
        entry.record.change_approvers.clone_from(&prior.change_approvers);
        entry.record.tags = prior.tags.clone();
    }
    if scorecard.is_none() && ctx.loaded.scorecard {
        log.add(
            Severity::Warning,
            &[IssueTag::Segment, IssueTag::Scorecard],
            "segment not found in scorecard",
            "",
        );
    }
    entry.record.segment_type =
        if entry.record.tags.contains(Tag::TypeGaas) { SegmentType::Gaas } else { SegmentType::PublicCloud };
    index_segment_name(registry, idx)
}

/// Indexes a segment display name unless another segment already uses it.
fn index_segment_name(registry: &mut Registry, idx: SegmentIdx) -> Result<(), MergeError> {
    let name = registry.segment(idx).record.display_name.clone();
    if let Some(existing) = registry.segment_by_name(&name) {
        if existing != idx {
            let detail = format!("\"{name}\" is also segment {}", registry.segment(existing).record.segment_id);
            registry.segment_mut(idx).validation.add(
                Severity::Severe,
                &[IssueTag::Segment, IssueTag::Duplicate],
                "segment name in use by another segment",
                detail,
            );
            return Ok(());
        }
    }
    registry.index_segment_name(&name, idx)?;
    Ok(())
}

// ============================================================================
// SECTION: Tribes
// ============================================================================

/// Merges the attributes of one scorecard tribe.
fn merge_tribe_record(
    registry: &Registry,
    segment: SegmentIdx,
    ctx: &RunContext<'_>,
    tribe: &ScorecardTribe,
    prior: Option<&TribeRecord>,
) -> Result<(TribeRecord, ValidationLog), MergeError> {
    let merge_ctx = ctx.merge_context(false);
    let segment_id = registry.segment(segment).record.segment_id.clone();
    let mut log = ValidationLog::new(tribe.id.as_str());
    let display_name = AttributeMerge::new("DisplayName")
        .if_missing(Severity::Warning, &[IssueTag::Tribe])
        .value(SourceKind::ScorecardV1, tribe.name.clone())
        .prior(prior.map(|record| record.display_name.clone()))
        .resolve(&merge_ctx, &mut log)?;
    let owner = AttributeMerge::new("Owner")
        .if_missing(Severity::Severe, &[IssueTag::Tribe, IssueTag::Ownership])
        .value(SourceKind::ScorecardV1, tribe.owner.clone())
        .prior(prior.map(|record| record.owner.clone()))
        .resolve(&merge_ctx, &mut log)?;
    let change_approvers = if tribe.change_approvers.is_empty() {
        prior.map(|record| record.change_approvers.clone()).unwrap_or_default()
    } else {
        tribe.change_approvers.clone()
    };
    let record = TribeRecord {
        tribe_id: tribe.id.clone(),
        segment_id,
        display_name,
        owner,
        change_approvers,
    };
    Ok((record, log))
}

/// Inserts a tribe, logging duplicates instead of failing.
///
/// Returns the new index, or `None` when the identifier was already taken.
fn insert_unique_tribe(
    registry: &mut Registry,
    segment: SegmentIdx,
    mut record: TribeRecord,
    prior: Option<TribeRecord>,
) -> Result<Option<TribeIdx>, MergeError> {
    if record.tribe_id.is_empty() {
        return Ok(None);
    }
    if let Some(existing) = registry.tribe_by_id(&record.tribe_id) {
        registry.tribe_mut(existing).validation.add(
            Severity::Severe,
            &[IssueTag::Tribe, IssueTag::Duplicate],
            "duplicate tribe id",
            format!("tribe {} is also listed as \"{}\"", record.tribe_id, record.display_name),
        );
        return Ok(None);
    }
    let base = record.display_name.clone();
    let mut suffix = 2_u32;
    while !record.display_name.is_empty()
        && registry.tribe_by_name(segment, &record.display_name).is_some()
    {
        record.display_name = format!("{base}#{suffix}");
        suffix += 1;
    }
    let idx = registry.insert_tribe(segment, record, prior)?;
    Ok(Some(idx))
}

// ============================================================================
// SECTION: Default Segment
// ============================================================================

/// Records the segment tagged `default-segment`, requiring exactly one.
fn select_default_segment(registry: &mut Registry, run_log: &mut ValidationLog) {
    let tagged: Vec<SegmentIdx> = registry
        .segment_indices()
        .into_iter()
        .filter(|idx| registry.segment(*idx).record.tags.contains(Tag::DefaultSegment))
        .collect();
    match tagged.as_slice() {
        [single] => registry.set_default_segment(Some(*single)),
        [] => {
            registry.set_default_segment(None);
            run_log.add(
                Severity::Warning,
                &[IssueTag::Segment],
                "no segment is tagged default-segment",
                "",
            );
        }
        many => {
            registry.set_default_segment(None);
            let ids: Vec<&str> =
                many.iter().map(|idx| registry.segment(*idx).record.segment_id.as_str()).collect();
            run_log.add(
                Severity::Severe,
                &[IssueTag::Segment],
                "more than one segment is tagged default-segment",
                ids.join(", "),
            );
        }
    }
}
