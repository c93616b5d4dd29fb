// crates/ossmerge-core/src/runtime/snapshot.rs
// ============================================================================
// Module: Snapshot Sources
// Description: In-memory implementation of every loader interface.
// Purpose: Replay a captured directory state for the CLI and tests.
// Dependencies: crate::core, crate::interfaces, serde, serde_json
// ============================================================================

//! ## Overview
//! [`SnapshotSources`] holds the records of every directory in memory and is
//! deserialized from one JSON document. Name patterns are applied to the
//! service-level records of each directory; organization and location records
//! are returned unfiltered. Directories listed in `unavailable` fail with
//! [`LoadError::Unavailable`], which lets tests exercise lenient mode.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::CatalogResource;
use crate::core::DeliverableFull;
use crate::core::DeliverableId;
use crate::core::DeliverableSummary;
use crate::core::FleetEnvironment;
use crate::core::IdentityEntry;
use crate::core::IncidentRecord;
use crate::core::MaturityEntry;
use crate::core::PricingCache;
use crate::core::PriorRecord;
use crate::core::RegionId;
use crate::core::ScorecardEntry;
use crate::core::ScorecardSegment;
use crate::core::SourceKind;
use crate::interfaces::CatalogLoader;
use crate::interfaces::ClearingHouseLoader;
use crate::interfaces::FleetLoader;
use crate::interfaces::IdentityLoader;
use crate::interfaces::IncidentLoader;
use crate::interfaces::LoadError;
use crate::interfaces::MaturityLoader;
use crate::interfaces::MonitoringSource;
use crate::interfaces::NamePattern;
use crate::interfaces::PricingLoader;
use crate::interfaces::PriorLoader;
use crate::interfaces::PriorOptions;
use crate::interfaces::ScorecardLoader;
use crate::runtime::context::DOCTOR_SOURCE;
use crate::runtime::engine::CLEARINGHOUSE_SOURCE;
use crate::runtime::engine::PRICING_SOURCE;

// ============================================================================
// SECTION: Directories
// ============================================================================

/// Directory of a snapshot, used to simulate outages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotDirectory {
    /// Prior canonical records.
    Prior,
    /// Product catalog.
    Catalog,
    /// Incident system.
    Incident,
    /// Scorecard.
    Scorecard,
    /// Identity service.
    Identity,
    /// Maturity manager.
    Maturity,
    /// Product clearinghouse.
    ClearingHouse,
    /// Fleet and region directories.
    Fleet,
    /// Pricing cache.
    Pricing,
    /// Monitoring collaborator.
    Monitoring,
}

impl SnapshotDirectory {
    /// Returns the source kind reported when the directory fails.
    #[must_use]
    pub fn source_kind(self) -> SourceKind {
        match self {
            Self::Prior => SourceKind::PriorOss,
            Self::Catalog => SourceKind::Catalog,
            Self::Incident => SourceKind::ServiceNow,
            Self::Scorecard => SourceKind::ScorecardV1,
            Self::Identity => SourceKind::Iam,
            Self::Maturity => SourceKind::Rmc,
            Self::ClearingHouse => SourceKind::Custom(CLEARINGHOUSE_SOURCE.to_string()),
            Self::Fleet => SourceKind::Custom(DOCTOR_SOURCE.to_string()),
            Self::Pricing => SourceKind::Custom(PRICING_SOURCE.to_string()),
            Self::Monitoring => SourceKind::Custom("Monitoring".to_string()),
        }
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Captured state of every source directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSources {
    /// Prior canonical records.
    pub prior: Vec<PriorRecord>,
    /// Catalog resources.
    pub catalog: Vec<CatalogResource>,
    /// Incident-system records.
    pub incident: Vec<IncidentRecord>,
    /// Incident-system test records, returned only in test mode.
    pub incident_test: Vec<IncidentRecord>,
    /// Scorecard entries.
    pub scorecard: Vec<ScorecardEntry>,
    /// Scorecard segments.
    pub scorecard_segments: Vec<ScorecardSegment>,
    /// Identity registrations.
    pub identity: Vec<IdentityEntry>,
    /// Maturity-manager entries.
    pub maturity: Vec<MaturityEntry>,
    /// Full clearinghouse deliverables.
    pub deliverables: Vec<DeliverableFull>,
    /// Fleet environments.
    pub fleet: Vec<FleetEnvironment>,
    /// Region-id entries.
    pub regions: Vec<RegionId>,
    /// Pricing cache.
    pub pricing: Option<PricingCache>,
    /// Monitor names by canonical service name.
    pub monitors: BTreeMap<String, Vec<String>>,
    /// Directories that fail when read.
    pub unavailable: BTreeSet<SnapshotDirectory>,
}

impl SnapshotSources {
    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when the document is malformed.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Marks a directory as failing.
    #[must_use]
    pub fn with_unavailable(mut self, directory: SnapshotDirectory) -> Self {
        self.unavailable.insert(directory);
        self
    }

    /// Fails when the directory is marked unavailable.
    fn check(&self, directory: SnapshotDirectory) -> Result<(), LoadError> {
        if self.unavailable.contains(&directory) {
            return Err(LoadError::Unavailable {
                source_kind: directory.source_kind(),
                message: "directory marked unavailable in snapshot".to_string(),
            });
        }
        Ok(())
    }
}

/// Clones the records whose name matches the pattern.
fn matching<T: Clone>(records: &[T], pattern: &NamePattern, name: impl Fn(&T) -> &str) -> Vec<T> {
    records.iter().filter(|record| pattern.matches(name(record))).cloned().collect()
}

// ============================================================================
// SECTION: Loader Implementations
// ============================================================================

impl PriorLoader for SnapshotSources {
    fn list_prior(&self, pattern: &NamePattern, options: PriorOptions) -> Result<Vec<PriorRecord>, LoadError> {
        self.check(SnapshotDirectory::Prior)?;
        let records = self
            .prior
            .iter()
            .filter_map(|record| match record {
                PriorRecord::Service(service) => {
                    if !options.include_services || !pattern.matches(&service.record.reference_resource_name) {
                        return None;
                    }
                    let mut service = service.clone();
                    if !options.include_merge_control {
                        service.merge_control = None;
                    }
                    if !options.include_validation {
                        service.validation = None;
                    }
                    Some(PriorRecord::Service(service))
                }
                PriorRecord::Segment(_) | PriorRecord::Tribe(_) => {
                    options.include_tribes.then(|| record.clone())
                }
                PriorRecord::Environment(_) => options.include_environments.then(|| record.clone()),
            })
            .collect();
        Ok(records)
    }
}

impl CatalogLoader for SnapshotSources {
    fn list_catalog(&self, pattern: &NamePattern) -> Result<Vec<CatalogResource>, LoadError> {
        self.check(SnapshotDirectory::Catalog)?;
        Ok(self
            .catalog
            .iter()
            .filter(|resource| !resource.kind.is_service_like() || pattern.matches(&resource.name))
            .cloned()
            .collect())
    }
}

impl IncidentLoader for SnapshotSources {
    fn list_incident_items(&self, pattern: &NamePattern, include_test: bool) -> Result<Vec<IncidentRecord>, LoadError> {
        self.check(SnapshotDirectory::Incident)?;
        let mut records = matching(&self.incident, pattern, |record| record.item.crn_service_name.as_str());
        if include_test {
            records.extend(matching(&self.incident_test, pattern, |record| record.item.crn_service_name.as_str()));
        }
        Ok(records)
    }
}

impl ScorecardLoader for SnapshotSources {
    fn list_scorecard_detail(&self, pattern: &NamePattern) -> Result<Vec<ScorecardEntry>, LoadError> {
        self.check(SnapshotDirectory::Scorecard)?;
        Ok(matching(&self.scorecard, pattern, |entry| entry.name.as_str()))
    }

    fn list_scorecard_segments(&self) -> Result<Vec<ScorecardSegment>, LoadError> {
        self.check(SnapshotDirectory::Scorecard)?;
        Ok(self.scorecard_segments.clone())
    }
}

impl IdentityLoader for SnapshotSources {
    fn list_identity_services(&self, pattern: &NamePattern) -> Result<Vec<IdentityEntry>, LoadError> {
        self.check(SnapshotDirectory::Identity)?;
        Ok(matching(&self.identity, pattern, |entry| entry.name.as_str()))
    }
}

impl MaturityLoader for SnapshotSources {
    fn list_maturity_summary(&self, pattern: &NamePattern, _rescan: bool) -> Result<Vec<MaturityEntry>, LoadError> {
        self.check(SnapshotDirectory::Maturity)?;
        Ok(matching(&self.maturity, pattern, |entry| entry.crn_service_name.as_str()))
    }
}

impl ClearingHouseLoader for SnapshotSources {
    fn list_clearinghouse_summary(&self, pattern: &NamePattern) -> Result<Vec<DeliverableSummary>, LoadError> {
        self.check(SnapshotDirectory::ClearingHouse)?;
        Ok(self
            .deliverables
            .iter()
            .map(|full| &full.summary)
            .filter(|summary| pattern.is_any() || pattern.matches(&summary.crn_service_name))
            .cloned()
            .collect())
    }

    fn get_clearinghouse_full(&self, id: &DeliverableId) -> Result<Option<DeliverableFull>, LoadError> {
        self.check(SnapshotDirectory::ClearingHouse)?;
        Ok(self.deliverables.iter().find(|full| full.summary.id == *id).cloned())
    }
}

impl FleetLoader for SnapshotSources {
    fn list_fleet_environments(&self, _pattern: &NamePattern) -> Result<Vec<FleetEnvironment>, LoadError> {
        self.check(SnapshotDirectory::Fleet)?;
        Ok(self.fleet.clone())
    }

    fn list_region_ids(&self, _pattern: &NamePattern) -> Result<Vec<RegionId>, LoadError> {
        self.check(SnapshotDirectory::Fleet)?;
        Ok(self.regions.clone())
    }
}

impl PricingLoader for SnapshotSources {
    fn pricing_cache(&self, _refresh: bool) -> Result<Option<PricingCache>, LoadError> {
        self.check(SnapshotDirectory::Pricing)?;
        Ok(self.pricing.clone())
    }
}

impl MonitoringSource for SnapshotSources {
    fn monitors_for(&self, reference_resource_name: &str) -> Result<Vec<String>, LoadError> {
        self.check(SnapshotDirectory::Monitoring)?;
        Ok(self.monitors.get(reference_resource_name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn unavailable_directory_fails_with_its_source() {
        let snapshot = SnapshotSources::default().with_unavailable(SnapshotDirectory::Catalog);
        let Err(err) = snapshot.list_catalog(&NamePattern::any().unwrap()) else {
            panic!("catalog should fail");
        };
        assert_eq!(err.source_kind(), Some(&SourceKind::Catalog));
    }

    #[test]
    fn pattern_filters_identity_entries() {
        let snapshot = SnapshotSources {
            identity: vec![
                IdentityEntry { name: "cloudant".to_string(), ..IdentityEntry::default() },
                IdentityEntry { name: "kafka".to_string(), ..IdentityEntry::default() },
            ],
            ..SnapshotSources::default()
        };
        let pattern = NamePattern::new("cloud*").unwrap();
        let entries = snapshot.list_identity_services(&pattern).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "cloudant");
    }
}
