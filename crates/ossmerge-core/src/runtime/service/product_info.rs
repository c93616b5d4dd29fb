// crates/ossmerge-core/src/runtime/service/product_info.rs
// ============================================================================
// Module: Product Information
// Description: Part numbers, product identifiers, division and OSS-UID.
// Purpose: Build product data in passes one and three of the service merge.
// Dependencies: crate::core, crate::runtime, tracing
// ============================================================================

//! ## Overview
//! Pass one reads part numbers from the pricing cache and maps them to
//! product identifiers through the static parts table. Pass three runs across
//! the registry: entries without their own identifiers inherit them from the
//! parent, from the cloud platform record, or from the prior run. Each entry is
//! handled at most once; the done flag is set before any recursion so cycles
//! terminate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use tracing::debug;

use crate::core::EntryType;
use crate::core::IssueTag;
use crate::core::ProductIdSource;
use crate::core::RunAction;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::runtime::context::RunContext;
use crate::runtime::gating::should_execute;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;
use crate::runtime::registry::ServiceIdx;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Division value used when product identifiers disagree.
pub const MULTIPLE_DIVISIONS: &str = "multiple";

// ============================================================================
// SECTION: Pass One
// ============================================================================

/// Fills part numbers and parts-table product identifiers.
///
/// The catalog identity must already be merged.
pub fn merge_product_info_one(entry: &mut ServiceEntry, run: &RunContext<'_>) {
    let prior = entry.prior.as_ref().map(|p| p.product_info.clone()).unwrap_or_default();
    let info = &mut entry.record.product_info;
    info.part_numbers.clear();
    info.product_ids.clear();
    info.clearinghouse_refs.clear();
    info.oss_uid = prior.oss_uid;

    if should_execute(run.config.actions, RunAction::IncludePricing, &mut entry.validation, "part numbers") {
        if let Some(pricing) = run.pricing {
            let mut catalog_ids: Vec<&str> = Vec::new();
            if !entry.record.reference_catalog_id.is_empty() {
                catalog_ids.push(&entry.record.reference_catalog_id);
            }
            catalog_ids.extend(entry.catalog_plans.iter().map(|plan| plan.id.as_str()));
            for id in catalog_ids {
                for part_number in pricing.part_numbers(id) {
                    entry.record.product_info.add_part_number(part_number.clone());
                }
            }
        }
    } else {
        entry.record.product_info.part_numbers = prior.part_numbers;
    }
    entry.record.product_info.part_numbers.sort();

    let mut unknown: Vec<String> = Vec::new();
    let info = &mut entry.record.product_info;
    for part_number in info.part_numbers.clone() {
        match run.parts.get(&part_number) {
            Some(part) => {
                info.add_product_id(part.product_id.clone(), ProductIdSource::PartsTable);
            }
            None => unknown.push(part_number),
        }
    }
    if !unknown.is_empty() {
        entry.validation.add(
            Severity::Minor,
            &[IssueTag::ProductInfo],
            "part numbers not found in parts table",
            unknown.join(", "),
        );
    }
}

// ============================================================================
// SECTION: Pass Three
// ============================================================================

/// Runs pass three for one entry, recursing into the record it inherits from.
pub fn merge_product_info_three(registry: &mut Registry, idx: ServiceIdx, run: &RunContext<'_>) {
    let entry = registry.service(idx);
    if entry.product_info_done || !entry.is_active() || entry.copied_from_prior {
        return;
    }
    registry.service_mut(idx).product_info_done = true;

    let entry = registry.service(idx);
    let has_own = entry.record.product_info.product_ids.iter().any(|pid| !pid.source.is_inherited());
    if !has_own {
        let parent = entry.record.general.parent_resource_name.clone();
        let inherit_from = if !parent.is_empty() && parent != entry.record.reference_resource_name {
            registry.service_by_name(&parent).map(|source| (source, ProductIdSource::Parent))
        } else if entry.record.general.entry_type == EntryType::PlatformComponent
            && entry.record.reference_resource_name != run.config.cloud_platform_name
        {
            registry
                .service_by_name(&run.config.cloud_platform_name)
                .map(|source| (source, ProductIdSource::CloudPlatform))
        } else {
            None
        };

        match inherit_from.filter(|(source, _)| *source != idx) {
            Some((source, provenance)) => {
                merge_product_info_three(registry, source, run);
                let ids: Vec<String> = registry
                    .service(source)
                    .record
                    .product_info
                    .product_ids
                    .iter()
                    .map(|pid| pid.id.clone())
                    .collect();
                let from = registry.service(source).name().to_string();
                let entry = registry.service_mut(idx);
                for id in ids {
                    entry.record.product_info.add_product_id(id, provenance);
                }
                debug!(service = %entry.name(), from = %from, "product ids inherited");
            }
            None => {
                let entry = registry.service_mut(idx);
                let prior_ids: Vec<String> = entry
                    .prior
                    .as_ref()
                    .map(|p| p.product_info.product_ids.iter().map(|pid| pid.id.clone()).collect())
                    .unwrap_or_default();
                if !prior_ids.is_empty() {
                    for id in prior_ids {
                        entry.record.product_info.add_product_id(id, ProductIdSource::PriorOss);
                    }
                    entry.validation.add_sourced(
                        Severity::Info,
                        &[IssueTag::ProductInfo],
                        SourceKind::PriorOss,
                        "product ids copied from prior run",
                        "",
                    );
                }
            }
        }
    }
    merge_division(registry, idx, run);
}

/// Computes the single division code of an entry.
fn merge_division(registry: &mut Registry, idx: ServiceIdx, run: &RunContext<'_>) {
    let entry = registry.service(idx);
    let mut divisions: BTreeSet<String> = entry
        .record
        .product_info
        .product_ids
        .iter()
        .filter_map(|pid| run.parts.division_of(&pid.id))
        .map(str::to_string)
        .collect();
    for reference in &entry.record.product_info.clearinghouse_refs {
        if let Some(full) = registry.deliverable_full(&reference.id) {
            if !full.division.is_empty() {
                divisions.insert(full.division.clone());
            }
        }
    }
    let entry = registry.service_mut(idx);
    entry.record.product_info.division = match divisions.len() {
        0 => String::new(),
        1 => divisions.into_iter().next().unwrap_or_default(),
        _ => {
            entry.validation.add(
                Severity::Severe,
                &[IssueTag::ProductInfo],
                "product ids belong to more than one division",
                divisions.into_iter().collect::<Vec<_>>().join(", "),
            );
            MULTIPLE_DIVISIONS.to_string()
        }
    };
}

// ============================================================================
// SECTION: OSS-UID
// ============================================================================

/// Monotonic OSS-UID allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidAllocator {
    /// Last allocated identifier.
    last: u64,
}

impl UidAllocator {
    /// Seeds the allocator with the highest identifier already in use.
    #[must_use]
    pub const fn seeded(max_in_use: u64) -> Self {
        Self { last: max_in_use }
    }

    /// Returns the next identifier.
    pub const fn allocate(&mut self) -> u64 {
        self.last = self.last.saturating_add(1);
        self.last
    }
}

/// Assigns an OSS-UID to every active entry that has none, in key order.
///
/// Returns the number of identifiers allocated.
pub fn assign_oss_uids(registry: &mut Registry) -> usize {
    let indices = registry.service_indices();
    let seed = indices
        .iter()
        .filter_map(|idx| registry.service(*idx).prior.as_ref())
        .map(|prior| prior.product_info.oss_uid)
        .max()
        .unwrap_or(0);
    let mut allocator = UidAllocator::seeded(seed);
    let mut allocated = 0;
    for idx in indices {
        let entry = registry.service_mut(idx);
        if !entry.is_active() || entry.copied_from_prior {
            continue;
        }
        if entry.record.product_info.oss_uid == 0 {
            entry.record.product_info.oss_uid = allocator.allocate();
            allocated += 1;
        }
    }
    allocated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_continues_after_seed() {
        let mut allocator = UidAllocator::seeded(41);
        assert_eq!(allocator.allocate(), 42);
        assert_eq!(allocator.allocate(), 43);
    }
}
