// crates/ossmerge-core/src/runtime/names.rs
// ============================================================================
// Module: Shared-Name Groups
// Description: Equivalence classes of services and deliverables by name.
// Purpose: Find clearinghouse deliverables that share any name with a service.
// Dependencies: crate::core, crate::runtime::{context, registry}
// ============================================================================

//! ## Overview
//! Every observed name of a service or deliverable is folded to its comparable
//! form and dropped into a shared-name bucket. A two-pass union-find then
//! merges buckets that have a member in common:
//!
//! 1. Each distinct service and deliverable gets an integer label; within a
//!    bucket, every label is joined to the bucket's lowest label.
//! 2. Labels are resolved to their root with path compression, and one
//!    [`NameGroup`] is built per root.
//!
//! Name groups are therefore closed under chains of shared names, and no
//! group is ever empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::DeliverableId;
use crate::core::DeliverableSummary;
use crate::core::DoNotMergeNames;
use crate::core::IssueTag;
use crate::core::Severity;
use crate::core::ValidationLog;
use crate::core::comparable_name;
use crate::runtime::context::MergeConfig;
use crate::runtime::registry::NameGroup;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Name Sources
// ============================================================================

/// Where a registered name was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NameSource {
    /// Registry key of the service.
    Comparable,
    /// Canonical reference name.
    Reference,
    /// Canonical display name.
    Display,
    /// Catalog name.
    Catalog,
    /// Catalog display name.
    CatalogDisplay,
    /// Incident-system CRN service name.
    IncidentCrn,
    /// Incident-system display name.
    IncidentDisplay,
    /// Scorecard name.
    Scorecard,
    /// Scorecard display name.
    ScorecardDisplay,
    /// Deliverable name.
    DeliverableName,
    /// Deliverable code name.
    DeliverableCodeName,
    /// Deliverable official name.
    DeliverableOfficialName,
    /// Deliverable short name.
    DeliverableShortName,
    /// Deliverable CRN service name.
    DeliverableCrn,
}

impl NameSource {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comparable => "comparable-name",
            Self::Reference => "reference-name",
            Self::Display => "display-name",
            Self::Catalog => "catalog-name",
            Self::CatalogDisplay => "catalog-display-name",
            Self::IncidentCrn => "servicenow-crn-name",
            Self::IncidentDisplay => "servicenow-display-name",
            Self::Scorecard => "scorecard-name",
            Self::ScorecardDisplay => "scorecard-display-name",
            Self::DeliverableName => "clearinghouse-name",
            Self::DeliverableCodeName => "clearinghouse-code-name",
            Self::DeliverableOfficialName => "clearinghouse-official-name",
            Self::DeliverableShortName => "clearinghouse-short-name",
            Self::DeliverableCrn => "clearinghouse-crn-name",
        }
    }
}

/// Returns every name observed for a service, with where it was seen.
#[must_use]
pub fn service_names(entry: &ServiceEntry) -> Vec<(NameSource, String)> {
    let mut names = vec![
        (NameSource::Comparable, entry.key.clone()),
        (NameSource::Reference, entry.record.reference_resource_name.clone()),
        (NameSource::Display, entry.record.reference_display_name.clone()),
    ];
    if let Some(catalog) = entry.catalog_primary() {
        names.push((NameSource::Catalog, catalog.name.clone()));
        names.push((NameSource::CatalogDisplay, catalog.display_name.clone()));
    }
    if let Some(incident) = entry.service_now_primary() {
        names.push((NameSource::IncidentCrn, incident.item.crn_service_name.clone()));
        names.push((NameSource::IncidentDisplay, incident.item.display_name.clone()));
    }
    if let Some(scorecard) = entry.scorecard.primary.as_ref() {
        names.push((NameSource::Scorecard, scorecard.name.clone()));
        names.push((NameSource::ScorecardDisplay, scorecard.display_name.clone()));
    }
    names
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Members of one shared-name bucket.
#[derive(Debug, Default)]
struct Bucket {
    /// Services that carry the name.
    services: BTreeSet<String>,
    /// Deliverables that carry the name.
    deliverables: BTreeSet<DeliverableId>,
    /// Where the name was observed.
    sources: BTreeSet<NameSource>,
}

/// Accumulates names and builds name groups.
#[derive(Debug, Default)]
pub struct NameGroupBuilder {
    /// Buckets keyed by comparable name.
    buckets: BTreeMap<String, Bucket>,
    /// Every registered service.
    services: BTreeSet<String>,
    /// Every registered deliverable.
    deliverables: BTreeSet<DeliverableId>,
    /// Do-not-merge list.
    do_not_merge: DoNotMergeNames,
}

impl NameGroupBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(do_not_merge: DoNotMergeNames) -> Self {
        Self { do_not_merge, ..Self::default() }
    }

    /// Registers a service so it gets a group even without shareable names.
    pub fn register_service(&mut self, service: &str) {
        self.services.insert(service.to_string());
    }

    /// Adds one observed name of a service.
    ///
    /// Empty and do-not-merge names are not merged; each yields a minor issue.
    pub fn add_service_name(
        &mut self,
        service: &str,
        name: &str,
        source: NameSource,
        log: &mut ValidationLog,
    ) {
        self.register_service(service);
        if self.skip_name(name, source, service, log) {
            return;
        }
        let key = comparable_name(name);
        if key.is_empty() {
            return;
        }
        let bucket = self.buckets.entry(key).or_default();
        bucket.services.insert(service.to_string());
        bucket.sources.insert(source);
    }

    /// Adds every name of a deliverable.
    ///
    /// Returns false when the deliverable name matches the non-cloud blacklist.
    /// Empty and do-not-merge names are not merged; each yields a minor issue.
    pub fn add_deliverable(
        &mut self,
        summary: &DeliverableSummary,
        config: &MergeConfig,
        log: &mut ValidationLog,
    ) -> bool {
        if config.is_blacklisted_deliverable(&summary.name) {
            return false;
        }
        self.deliverables.insert(summary.id.clone());
        let names = [
            (NameSource::DeliverableName, &summary.name),
            (NameSource::DeliverableCodeName, &summary.code_name),
            (NameSource::DeliverableOfficialName, &summary.official_name),
            (NameSource::DeliverableShortName, &summary.short_name),
            (NameSource::DeliverableCrn, &summary.crn_service_name),
        ];
        let owner = format!("deliverable {}", summary.id);
        for (source, name) in names {
            if self.skip_name(name, source, &owner, log) {
                continue;
            }
            let key = comparable_name(name);
            if key.is_empty() {
                continue;
            }
            let bucket = self.buckets.entry(key).or_default();
            bucket.deliverables.insert(summary.id.clone());
            bucket.sources.insert(source);
        }
        true
    }

    /// Logs and reports names that take no part in shared-name matching.
    fn skip_name(&self, name: &str, source: NameSource, owner: &str, log: &mut ValidationLog) -> bool {
        let reason = if name.trim().is_empty() {
            "zero-length name not used for shared-name matching"
        } else if self.do_not_merge.contains(name) {
            "do-not-merge name not used for shared-name matching"
        } else {
            return false;
        };
        log.add(
            Severity::Minor,
            &[IssueTag::Naming],
            reason,
            format!("{owner}: {}=\"{name}\"", source.as_str()),
        );
        true
    }

    /// Builds the name groups.
    #[must_use]
    pub fn build(self) -> Vec<NameGroup> {
        let service_labels: BTreeMap<&String, usize> =
            self.services.iter().enumerate().map(|(label, name)| (name, label)).collect();
        let offset = service_labels.len();
        let deliverable_labels: BTreeMap<&DeliverableId, usize> = self
            .deliverables
            .iter()
            .enumerate()
            .map(|(label, id)| (id, offset + label))
            .collect();
        let mut forest = LabelForest::new(offset + deliverable_labels.len());

        for bucket in self.buckets.values() {
            let mut labels = bucket
                .services
                .iter()
                .filter_map(|name| service_labels.get(name).copied())
                .chain(bucket.deliverables.iter().filter_map(|id| deliverable_labels.get(id).copied()));
            let Some(first) = labels.next() else {
                continue;
            };
            let mut lowest = first;
            let mut others = Vec::new();
            for label in labels {
                if label < lowest {
                    others.push(lowest);
                    lowest = label;
                } else {
                    others.push(label);
                }
            }
            for label in others {
                forest.join(lowest, label);
            }
        }

        let mut groups: BTreeMap<usize, NameGroup> = BTreeMap::new();
        for (name, label) in &service_labels {
            let root = forest.root(*label);
            groups.entry(root).or_default().services.push((*name).clone());
        }
        for (id, label) in &deliverable_labels {
            let root = forest.root(*label);
            groups.entry(root).or_default().deliverables.push((*id).clone());
        }
        groups
            .into_values()
            .map(|mut group| {
                group.services.sort();
                group.deliverables.sort();
                group
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Union-Find
// ============================================================================

/// Disjoint-set forest over integer labels; roots are the lowest label.
#[derive(Debug)]
struct LabelForest {
    /// Parent label of each label.
    parent: Vec<usize>,
}

impl LabelForest {
    /// Creates a forest of singleton sets.
    fn new(size: usize) -> Self {
        Self { parent: (0..size).collect() }
    }

    /// Returns the root of a label, compressing the path.
    fn root(&mut self, label: usize) -> usize {
        let mut root = label;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = label;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Records that two labels are equivalent.
    fn join(&mut self, lower: usize, higher: usize) {
        let lower_root = self.root(lower);
        let higher_root = self.root(higher);
        if lower_root == higher_root {
            return;
        }
        let (keep, fold) = if lower_root < higher_root {
            (lower_root, higher_root)
        } else {
            (higher_root, lower_root)
        };
        self.parent[fold] = keep;
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_buckets_join_one_group() {
        let mut log = ValidationLog::new("t");
        let mut builder = NameGroupBuilder::new(DoNotMergeNames::default());
        builder.add_service_name("alpha", "Alpha", NameSource::Reference, &mut log);
        builder.add_service_name("alpha", "shared one", NameSource::Display, &mut log);
        builder.add_service_name("beta", "Shared-One", NameSource::Display, &mut log);
        builder.add_service_name("beta", "shared two", NameSource::Catalog, &mut log);
        builder.add_service_name("gamma", "shared_two", NameSource::Scorecard, &mut log);
        builder.add_service_name("delta", "delta", NameSource::Reference, &mut log);
        let groups = builder.build();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].services, vec!["alpha", "beta", "gamma"]);
        assert_eq!(groups[1].services, vec!["delta"]);
    }

    #[test]
    fn deliverable_skips_do_not_merge_and_blank_names() {
        let mut log = ValidationLog::new("run");
        let mut builder = NameGroupBuilder::new(DoNotMergeNames::new(["common"]));
        builder.add_service_name("alpha", "common", NameSource::Display, &mut log);
        let summary = DeliverableSummary {
            id: DeliverableId::new("d-1"),
            name: "common".to_string(),
            ..DeliverableSummary::default()
        };
        assert!(builder.add_deliverable(&summary, &MergeConfig::default(), &mut log));
        let groups = builder.build();

        assert_eq!(groups.len(), 2);
        assert!(log.find("do-not-merge name not used").any(|issue| issue.details.starts_with("deliverable d-1")));
        assert!(log.find("zero-length name not used").any(|issue| issue.details.starts_with("deliverable d-1")));
        assert!(log.issues().iter().all(|issue| issue.severity == Severity::Minor));
    }

    #[test]
    fn forest_roots_at_lowest_label() {
        let mut forest = LabelForest::new(4);
        forest.join(2, 3);
        forest.join(1, 3);
        assert_eq!(forest.root(3), 1);
        assert_eq!(forest.root(2), 1);
        assert_eq!(forest.root(0), 0);
    }
}
