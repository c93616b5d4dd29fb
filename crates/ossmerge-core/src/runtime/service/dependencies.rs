// crates/ossmerge-core/src/runtime/service/dependencies.rs
// ============================================================================
// Module: Dependencies
// Description: Service dependency graph derived from clearinghouse links.
// Purpose: Translate deliverable dependencies into service dependencies.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! Each active dependency of a bound deliverable is mapped back to the
//! services bound to the deliverable at the other end. Targets bound to no
//! service are only counted: `not-oss` when the deliverable is known to the
//! clearinghouse, `not-cloud` otherwise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::DeliverableDependency;
use crate::core::Dependency;
use crate::core::DependencyState;
use crate::core::IssueTag;
use crate::core::Severity;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Provenance tag of clearinghouse-derived dependencies.
pub const CLEARINGHOUSE_TAG: &str = "source:clearinghouse";

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Counters of unresolved dependency targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Unresolved {
    /// Targets known to the clearinghouse but bound to no service.
    not_oss: usize,
    /// Targets unknown to the clearinghouse.
    not_cloud: usize,
}

/// Resolves one direction of deliverable dependencies into service links.
fn resolve(
    registry: &Registry,
    own_name: &str,
    links: &[&DeliverableDependency],
    unresolved: &mut Unresolved,
) -> Vec<Dependency> {
    let mut by_service: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for link in links.iter().filter(|link| link.state == DependencyState::Active) {
        let targets: Vec<String> = registry
            .services_by_deliverable(&link.deliverable_id)
            .map(|idx| registry.service(idx))
            .filter(|target| target.is_active())
            .map(|target| target.record.reference_resource_name.clone())
            .filter(|name| !name.is_empty() && name != own_name)
            .collect();
        if targets.is_empty() {
            if registry.deliverable(&link.deliverable_id).is_some() {
                unresolved.not_oss += 1;
            } else {
                unresolved.not_cloud += 1;
            }
            continue;
        }
        let mut tags = Vec::new();
        if !link.dependency_type.is_empty() {
            tags.push(format!("type:{}", link.dependency_type));
        }
        if !link.commit_status.is_empty() {
            tags.push(format!("commit:{}", link.commit_status));
        }
        tags.push(CLEARINGHOUSE_TAG.to_string());
        for target in targets {
            let entry = by_service.entry(target).or_default();
            for tag in &tags {
                if !entry.contains(tag) {
                    entry.push(tag.clone());
                }
            }
        }
    }
    by_service
        .into_iter()
        .map(|(service, mut tags)| {
            tags.sort();
            Dependency { service, tags }
        })
        .collect()
}

/// Merges inbound and outbound dependencies of one entry.
///
/// Clearinghouse references must already be bound for every service.
pub fn merge_dependencies(entry: &mut ServiceEntry, registry: &Registry) {
    let own_name = entry.record.reference_resource_name.clone();
    let mut outbound_links = Vec::new();
    let mut inbound_links = Vec::new();
    for reference in &entry.record.product_info.clearinghouse_refs {
        if let Some(full) = registry.deliverable_full(&reference.id) {
            outbound_links.extend(full.outbound.iter());
            inbound_links.extend(full.inbound.iter());
        }
    }
    let mut unresolved = Unresolved::default();
    let outbound = resolve(registry, &own_name, &outbound_links, &mut unresolved);
    let inbound = resolve(registry, &own_name, &inbound_links, &mut unresolved);
    entry.record.dependencies.outbound = outbound;
    entry.record.dependencies.inbound = inbound;

    if unresolved.not_oss > 0 {
        entry.validation.add(
            Severity::Info,
            &[IssueTag::Dependencies],
            "dependencies on clearinghouse entries that are not in OSS",
            format!("count={}", unresolved.not_oss),
        );
    }
    if unresolved.not_cloud > 0 {
        entry.validation.add(
            Severity::Info,
            &[IssueTag::Dependencies],
            "dependencies on entries that are not in the clearinghouse",
            format!("count={}", unresolved.not_cloud),
        );
    }
}
