// crates/ossmerge-core/src/runtime/duplicates.rs
// ============================================================================
// Module: Duplicate Folding
// Description: Collapse of entries declared duplicates in merge control.
// Purpose: Move the source records of duplicates into their canonical entry.
// Dependencies: crate::core, crate::runtime::registry, tracing
// ============================================================================

//! ## Overview
//! A merge-control record may name another entry in `duplicate_of`. Chains
//! are followed to their end; the source records of the duplicate are moved
//! into the final target, whose selectors then choose among all of them.
//! Chains that loop or end nowhere are logged and left unfolded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use tracing::info;

use crate::core::IssueTag;
use crate::core::Severity;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;
use crate::runtime::registry::ServiceIdx;
use crate::runtime::registry::SourceSlot;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Why a duplicate-of chain could not be followed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChainError {
    /// A name in the chain matches no entry.
    Missing(String),
    /// The chain returns to an entry already visited.
    Cycle,
}

/// Follows the duplicate-of chain of an entry to its end.
fn resolve_chain(registry: &Registry, start: ServiceIdx) -> Result<Option<ServiceIdx>, ChainError> {
    let mut visited = BTreeSet::from([start]);
    let mut current = start;
    loop {
        let target_name = &registry.service(current).merge_control.duplicate_of;
        if target_name.trim().is_empty() {
            return Ok((current != start).then_some(current));
        }
        let Some(target) = registry.service_by_name(target_name) else {
            return Err(ChainError::Missing(target_name.clone()));
        };
        if !visited.insert(target) {
            return Err(ChainError::Cycle);
        }
        current = target;
    }
}

/// Moves every source record of `from` into `into`.
fn fold_sources(from: &mut ServiceEntry, into: &mut ServiceEntry) {
    into.catalog.additional.extend(from.catalog.take_all());
    into.service_now.additional.extend(from.service_now.take_all());
    into.scorecard.additional.extend(from.scorecard.take_all());
    into.iam.additional.extend(from.iam.take_all());
    into.catalog_plans.append(&mut from.catalog_plans);
    into.catalog_deployments.append(&mut from.catalog_deployments);
    if into.rmc.is_none() {
        into.rmc = from.rmc.take();
    }
    promote(&mut into.catalog);
    promote(&mut into.service_now);
    promote(&mut into.scorecard);
    promote(&mut into.iam);
}

/// Makes the first additional record primary when the slot has none.
fn promote<T>(slot: &mut SourceSlot<T>) {
    if slot.primary.is_none() && !slot.additional.is_empty() {
        slot.primary = Some(slot.additional.remove(0));
    }
}

/// Folds every declared duplicate into its canonical entry.
///
/// Returns the number of folded entries. Must run before service phase one.
pub fn fold_duplicates(registry: &mut Registry) -> usize {
    let mut folded = 0;
    for idx in registry.service_indices() {
        if registry.service(idx).merge_control.duplicate_of.trim().is_empty() {
            continue;
        }
        let target = match resolve_chain(registry, idx) {
            Ok(Some(target)) => target,
            Ok(None) => continue,
            Err(ChainError::Missing(name)) => {
                registry.service_mut(idx).validation.add(
                    Severity::Severe,
                    &[IssueTag::Duplicate],
                    "duplicate-of target not found",
                    name,
                );
                continue;
            }
            Err(ChainError::Cycle) => {
                registry.service_mut(idx).validation.add(
                    Severity::Critical,
                    &[IssueTag::Duplicate],
                    "duplicate-of chain contains a cycle",
                    "",
                );
                continue;
            }
        };

        let mut duplicate = registry.take_service(idx);
        let canonical = registry.service_mut(target);
        fold_sources(&mut duplicate, canonical);
        canonical.duplicates.push(duplicate.key.clone());
        canonical.validation.add(
            Severity::Info,
            &[IssueTag::Duplicate],
            "entries merged as duplicates",
            duplicate.key.clone(),
        );
        let canonical_key = canonical.key.clone();
        duplicate.validation.add(
            Severity::Info,
            &[IssueTag::Duplicate],
            "entry merged into duplicate target",
            canonical_key.clone(),
        );
        duplicate.duplicate_of = Some(target);
        info!(duplicate = %duplicate.key, target = %canonical_key, "duplicate entry folded");
        registry.restore_service(idx, duplicate);
        folded += 1;
    }
    folded
}
