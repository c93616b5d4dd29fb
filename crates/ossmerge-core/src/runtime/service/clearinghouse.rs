// crates/ossmerge-core/src/runtime/service/clearinghouse.rs
// ============================================================================
// Module: Clearinghouse Binding
// Description: Binding of services to clearinghouse deliverables.
// Purpose: Link services to product data by CRN attribute, PID or name group.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! Deliverables are bound in three ways, in order: the deliverable's CRN
//! service-name attribute names the service, a product identifier of the
//! service (not inherited) belongs to the deliverable, or, when nothing bound
//! so far, the service and the deliverable share a name group. Taxonomy and
//! product identifiers are then read from the bound deliverables; identifiers
//! are never filled from PID bindings since those came from the identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::BindingKind;
use crate::core::ClearingHouseRef;
use crate::core::DeliverableId;
use crate::core::IssueTag;
use crate::core::ProductIdSource;
use crate::core::Severity;
use crate::core::Taxonomy;
use crate::core::comparable_name;
use crate::runtime::context::MergeConfig;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Lookup
// ============================================================================

/// Reverse indexes over the loaded deliverables.
#[derive(Debug, Clone, Default)]
pub struct DeliverableIndex {
    /// Deliverables by comparable CRN service-name attribute.
    by_crn: BTreeMap<String, Vec<DeliverableId>>,
    /// Deliverables by product identifier.
    by_pid: BTreeMap<String, Vec<DeliverableId>>,
}

impl DeliverableIndex {
    /// Builds the indexes, skipping blacklisted deliverables.
    #[must_use]
    pub fn build(registry: &Registry, config: &MergeConfig) -> Self {
        let mut index = Self::default();
        for summary in registry.deliverables() {
            if config.is_blacklisted_deliverable(&summary.name) {
                continue;
            }
            if !summary.crn_service_name.is_empty() {
                index.by_crn.entry(comparable_name(&summary.crn_service_name)).or_default().push(summary.id.clone());
            }
            if let Some(full) = registry.deliverable_full(&summary.id) {
                for pid in &full.product_ids {
                    index.by_pid.entry(pid.clone()).or_default().push(summary.id.clone());
                }
            }
        }
        index
    }

    /// Returns deliverables whose CRN attribute matches a service name.
    fn by_crn(&self, name: &str) -> &[DeliverableId] {
        self.by_crn.get(&comparable_name(name)).map_or(&[], Vec::as_slice)
    }

    /// Returns deliverables carrying a product identifier.
    fn by_pid(&self, pid: &str) -> &[DeliverableId] {
        self.by_pid.get(pid).map_or(&[], Vec::as_slice)
    }
}

// ============================================================================
// SECTION: Binding
// ============================================================================

/// Records one binding on the reference list.
fn bind(refs: &mut Vec<ClearingHouseRef>, registry: &Registry, id: &DeliverableId, kind: BindingKind) {
    if let Some(existing) = refs.iter_mut().find(|reference| reference.id == *id) {
        if !existing.bound_by(kind) {
            existing.bindings.push(kind);
        }
        return;
    }
    let name = registry.deliverable(id).map(|summary| summary.name.clone()).unwrap_or_default();
    refs.push(ClearingHouseRef { id: id.clone(), name, bindings: vec![kind] });
}

/// Binds the entry to deliverables and logs suspicious bindings.
pub fn bind_deliverables(entry: &mut ServiceEntry, registry: &Registry, index: &DeliverableIndex) {
    let name = entry.record.reference_resource_name.clone();
    let mut refs: Vec<ClearingHouseRef> = Vec::new();

    for id in index.by_crn(&name) {
        bind(&mut refs, registry, id, BindingKind::Crn);
    }
    for pid in entry.record.product_info.product_ids.iter().filter(|pid| !pid.source.is_inherited()) {
        for id in index.by_pid(&pid.id) {
            bind(&mut refs, registry, id, BindingKind::Pid);
        }
    }
    if refs.is_empty() {
        if let Some(group) = registry.group_by_service(&name) {
            if group.deliverables.len() > 1 {
                entry.validation.add(
                    Severity::Warning,
                    &[IssueTag::ClearingHouse],
                    "more than one clearinghouse deliverable matches by name",
                    group.deliverables.iter().map(DeliverableId::as_str).collect::<Vec<_>>().join(", "),
                );
            }
            for id in &group.deliverables {
                bind(&mut refs, registry, id, BindingKind::Name);
            }
        }
    }

    let key = comparable_name(&name);
    for reference in &refs {
        let Some(summary) = registry.deliverable(&reference.id) else {
            continue;
        };
        if summary.crn_service_name.is_empty() {
            entry.validation.add(
                Severity::Minor,
                &[IssueTag::ClearingHouse],
                "clearinghouse deliverable has no CRN service name",
                format!("{} ({})", summary.name, summary.id),
            );
        } else if comparable_name(&summary.crn_service_name) != key {
            entry.validation.add(
                Severity::Warning,
                &[IssueTag::ClearingHouse, IssueTag::Crn],
                "clearinghouse deliverable CRN service name does not match",
                format!("{} ({}) names \"{}\"", summary.name, summary.id, summary.crn_service_name),
            );
        }
    }
    refs.sort_by(|a, b| a.id.cmp(&b.id));
    entry.record.product_info.clearinghouse_refs = refs;
}

// ============================================================================
// SECTION: Taxonomy and Product Identifiers
// ============================================================================

/// Binding kinds in taxonomy preference order.
const TAXONOMY_PREFERENCE: [BindingKind; 3] = [BindingKind::Crn, BindingKind::Pid, BindingKind::Name];

/// Merges the taxonomy from the bound deliverables.
pub fn merge_taxonomy(entry: &mut ServiceEntry, registry: &Registry) {
    let mut candidates: Vec<(BindingKind, DeliverableId, Taxonomy)> = Vec::new();
    for kind in TAXONOMY_PREFERENCE {
        for reference in entry.record.product_info.clearinghouse_refs.iter().filter(|r| r.bound_by(kind)) {
            if let Some(full) = registry.deliverable_full(&reference.id) {
                if !full.taxonomy.is_empty() {
                    candidates.push((kind, reference.id.clone(), full.taxonomy.clone()));
                }
            }
        }
    }
    let Some((_, chosen_id, chosen)) = candidates.first().cloned() else {
        return;
    };
    for (_, id, taxonomy) in candidates.iter().skip(1) {
        if *taxonomy != chosen {
            entry.validation.add(
                Severity::Warning,
                &[IssueTag::ClearingHouse, IssueTag::ProductInfo],
                "taxonomy differs between clearinghouse deliverables",
                format!("{chosen_id}={chosen} {id}={taxonomy}"),
            );
        }
    }
    entry.record.product_info.taxonomy = chosen;
}

/// Fills product identifiers from deliverables bound by CRN or name.
pub fn merge_product_ids_two(entry: &mut ServiceEntry, registry: &Registry) {
    let refs = entry.record.product_info.clearinghouse_refs.clone();
    for reference in refs {
        let source = if reference.bound_by(BindingKind::Crn) {
            ProductIdSource::ClearingHouseCrn
        } else if reference.bound_by(BindingKind::Name) {
            ProductIdSource::ClearingHouseName
        } else {
            continue;
        };
        if let Some(full) = registry.deliverable_full(&reference.id) {
            for pid in &full.product_ids {
                entry.record.product_info.add_product_id(pid.clone(), source);
            }
        }
    }
}
