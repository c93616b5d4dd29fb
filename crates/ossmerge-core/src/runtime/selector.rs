// crates/ossmerge-core/src/runtime/selector.rs
// ============================================================================
// Module: Additional-Sources Selector
// Description: Primary-record choice among near-duplicate source records.
// Purpose: Pick one primary record per source kind deterministically.
// Dependencies: crate::core, crate::runtime::registry
// ============================================================================

//! ## Overview
//! When several records of one source kind fold onto the same comparable name,
//! all of them (the current primary included) are sorted by a source-specific
//! key and the first becomes primary. Sorting is stable and the keys only
//! depend on record content, so running a selector twice is a no-op.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::CatalogResource;
use crate::core::IdentityEntry;
use crate::core::IncidentRecord;
use crate::core::ScorecardEntry;
use crate::core::VisibilityRestriction;
use crate::runtime::registry::SourceSlot;

// ============================================================================
// SECTION: Generic Selection
// ============================================================================

/// Re-selects the primary record of a slot by ascending key.
pub fn select_by_key<T, K, F>(slot: &mut SourceSlot<T>, key: F)
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    if slot.additional.is_empty() {
        return;
    }
    let mut records = slot.take_all();
    records.sort_by_key(key);
    let mut records = records.into_iter();
    slot.primary = records.next();
    slot.additional = records.collect();
}

/// Names already chosen for the entity, used as tie-breakers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChosenNames<'a> {
    /// Prior canonical name.
    pub prior: &'a str,
    /// Name of the chosen catalog record.
    pub catalog: &'a str,
    /// Name of the chosen incident-system record.
    pub incident: &'a str,
}

/// Returns false when the candidate matches a non-empty chosen name.
fn differs(name: &str, chosen: &str) -> bool {
    chosen.is_empty() || name != chosen
}

// ============================================================================
// SECTION: Source Selectors
// ============================================================================

/// Ranks catalog visibility: public, then IBM-only, then anything else.
const fn visibility_rank(restriction: VisibilityRestriction) -> u8 {
    match restriction {
        VisibilityRestriction::Public => 0,
        VisibilityRestriction::IbmOnly => 1,
        VisibilityRestriction::Private | VisibilityRestriction::Unknown => 2,
    }
}

/// Selects the primary catalog record.
pub fn select_catalog(slot: &mut SourceSlot<CatalogResource>, chosen: ChosenNames<'_>) {
    select_by_key(slot, |resource| {
        (
            visibility_rank(resource.visibility.effective_restriction()),
            differs(&resource.name, chosen.prior),
            resource.name.clone(),
        )
    });
}

/// Selects the primary incident-system record.
pub fn select_incident(slot: &mut SourceSlot<IncidentRecord>, chosen: ChosenNames<'_>) {
    select_by_key(slot, |record| {
        let name = &record.item.crn_service_name;
        (
            record.item.retired,
            differs(name, chosen.prior),
            differs(name, chosen.catalog),
            name.clone(),
        )
    });
}

/// Selects the primary scorecard record.
pub fn select_scorecard(slot: &mut SourceSlot<ScorecardEntry>, chosen: ChosenNames<'_>) {
    select_by_key(slot, |entry| {
        (
            differs(&entry.name, chosen.prior),
            differs(&entry.name, chosen.catalog),
            differs(&entry.name, chosen.incident),
            entry.name.clone(),
        )
    });
}

/// Selects the primary identity-service record.
pub fn select_identity(slot: &mut SourceSlot<IdentityEntry>, chosen: ChosenNames<'_>) {
    select_by_key(slot, |entry| {
        (
            !entry.enabled,
            differs(&entry.name, chosen.prior),
            differs(&entry.name, chosen.catalog),
            entry.name.clone(),
        )
    });
}
