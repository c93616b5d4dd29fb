// crates/ossmerge-core/src/runtime/registry.rs
// ============================================================================
// Module: Entity Registry
// Description: Arena of all entities of one run with their lookup indexes.
// Purpose: Own the merge model and enforce primary-key uniqueness.
// Dependencies: crate::core, crate::runtime::phase, thiserror
// ============================================================================

//! ## Overview
//! The registry stores services, segments, tribes, environments and name groups
//! in arenas addressed by typed indexes. Cross-references between entities are
//! indexes, never pointers, so cycles are observable without special handling.
//!
//! Every unique index refuses an insertion whose key is already bound to a
//! different entity; such a conflict is a programming error and fails with
//! [`RegistryError::DuplicateKey`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::mem;

use thiserror::Error;

use crate::core::CatalogResource;
use crate::core::DeliverableFull;
use crate::core::DeliverableId;
use crate::core::DeliverableSummary;
use crate::core::DoNotMergeNames;
use crate::core::EnvironmentRecord;
use crate::core::FleetEnvironment;
use crate::core::IdentityEntry;
use crate::core::IncidentRecord;
use crate::core::MaturityEntry;
use crate::core::MergeControl;
use crate::core::RagStatus;
use crate::core::RegionId;
use crate::core::ScorecardEntry;
use crate::core::ScorecardSegment;
use crate::core::SegmentId;
use crate::core::SegmentRecord;
use crate::core::ServiceRecord;
use crate::core::TribeId;
use crate::core::TribeRecord;
use crate::core::ValidationLog;
use crate::core::comparable_name;
use crate::runtime::phase::EntityPhase;

// ============================================================================
// SECTION: Indexes
// ============================================================================

macro_rules! arena_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            /// Returns the raw arena position.
            #[must_use]
            pub const fn get(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

arena_index!(
    /// Index of a service entry.
    ServiceIdx
);
arena_index!(
    /// Index of a segment entry.
    SegmentIdx
);
arena_index!(
    /// Index of a tribe entry.
    TribeIdx
);
arena_index!(
    /// Index of an environment entry.
    EnvironmentIdx
);
arena_index!(
    /// Index of a name group.
    NameGroupIdx
);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry invariant violations. These are programming errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A unique key is already bound to another entity.
    #[error("{table} key {key} is already bound to another entry")]
    DuplicateKey {
        /// Index table name.
        table: &'static str,
        /// Conflicting key.
        key: String,
    },
}

/// Binds a key to a value in a unique index.
fn bind_unique<K, V>(
    table: &'static str,
    index: &mut BTreeMap<K, V>,
    key: K,
    value: V,
) -> Result<(), RegistryError>
where
    K: Ord + fmt::Display,
    V: PartialEq + Copy,
{
    match index.get(&key) {
        Some(existing) if *existing != value => {
            Err(RegistryError::DuplicateKey { table, key: key.to_string() })
        }
        Some(_) => Ok(()),
        None => {
            index.insert(key, value);
            Ok(())
        }
    }
}

// ============================================================================
// SECTION: Source Slots
// ============================================================================

/// Primary record of one source plus the overflow of near-duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSlot<T> {
    /// Chosen record.
    pub primary: Option<T>,
    /// Other records for the same comparable name.
    pub additional: Vec<T>,
}

impl<T> Default for SourceSlot<T> {
    fn default() -> Self {
        Self { primary: None, additional: Vec::new() }
    }
}

impl<T> SourceSlot<T> {
    /// Adds a record: the first becomes primary, later ones go to additional.
    pub fn push(&mut self, record: T) {
        if self.primary.is_none() {
            self.primary = Some(record);
        } else {
            self.additional.push(record);
        }
    }

    /// Returns the total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.primary.is_some()) + self.additional.len()
    }

    /// Returns true when no record is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.additional.is_empty()
    }

    /// Moves all records out, primary first.
    pub fn take_all(&mut self) -> Vec<T> {
        let mut records: Vec<T> = self.primary.take().into_iter().collect();
        records.append(&mut self.additional);
        records
    }

    /// Iterates over all records, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.primary.iter().chain(self.additional.iter())
    }
}

// ============================================================================
// SECTION: Service Entries
// ============================================================================

/// Tri-state PnP enablement, with a marker for in-progress evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Enablement {
    /// Not evaluated.
    #[default]
    Unknown,
    /// Evaluation in progress; reaching it again means a cycle.
    Checking,
    /// Disabled.
    Disabled,
    /// Enabled.
    Enabled,
}

/// Merge state of one service.
#[derive(Debug, Clone, Default)]
pub struct ServiceEntry {
    /// Registry key (comparable name, or the verbatim name when do-not-merge).
    pub key: String,
    /// Record under construction.
    pub record: ServiceRecord,
    /// Validation log.
    pub validation: ValidationLog,
    /// Merge-control record.
    pub merge_control: MergeControl,
    /// Prior canonical record.
    pub prior: Option<ServiceRecord>,
    /// Validation log of the prior run.
    pub prior_validation: Option<ValidationLog>,
    /// Catalog records.
    pub catalog: SourceSlot<CatalogResource>,
    /// Whether the primary catalog record is ignored by visibility policy.
    pub catalog_ignored: bool,
    /// Plans attached to the primary catalog record.
    pub catalog_plans: Vec<CatalogResource>,
    /// Deployments of this service or its plans.
    pub catalog_deployments: Vec<CatalogResource>,
    /// Incident-system records.
    pub service_now: SourceSlot<IncidentRecord>,
    /// Scorecard records.
    pub scorecard: SourceSlot<ScorecardEntry>,
    /// Identity-service records.
    pub iam: SourceSlot<IdentityEntry>,
    /// Maturity-manager record.
    pub rmc: Option<MaturityEntry>,
    /// Entity phase.
    pub phase: EntityPhase,
    /// Entry this one was folded into.
    pub duplicate_of: Option<ServiceIdx>,
    /// Names of entries folded into this one.
    pub duplicates: Vec<String>,
    /// Canonical name of the catalog composite containing this entry.
    pub composite_parent: String,
    /// Whether the merge stopped before producing a record.
    pub aborted: bool,
    /// Whether the entry lost a reference-name collision.
    pub quarantined: bool,
    /// Whether the prior record was copied wholesale.
    pub copied_from_prior: bool,
    /// Whether the status-page category check reported an inconsistency.
    pub category_inconsistent: bool,
    /// PnP enablement.
    pub pnp: Enablement,
    /// Whether product information phase three has run.
    pub product_info_done: bool,
    /// CRN status computed at the end of phase two.
    pub crn_status_phase_two: Option<RagStatus>,
}

impl ServiceEntry {
    /// Returns the best available name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.record.reference_resource_name.is_empty() {
            &self.key
        } else {
            &self.record.reference_resource_name
        }
    }

    /// Returns the prior canonical name, or an empty string.
    #[must_use]
    pub fn prior_name(&self) -> &str {
        self.prior.as_ref().map_or("", |prior| prior.reference_resource_name.as_str())
    }

    /// Returns true when the entry takes part in phases two and three.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.duplicate_of.is_none() && !self.aborted && !self.quarantined
    }

    /// Returns the primary catalog record unless it is ignored.
    #[must_use]
    pub fn catalog_primary(&self) -> Option<&CatalogResource> {
        if self.catalog_ignored { None } else { self.catalog.primary.as_ref() }
    }

    /// Returns the primary incident-system record.
    #[must_use]
    pub fn service_now_primary(&self) -> Option<&IncidentRecord> {
        self.service_now.primary.as_ref()
    }

    /// Returns true when a non-retired incident-system record exists.
    #[must_use]
    pub fn has_live_service_now(&self) -> bool {
        self.service_now.primary.as_ref().is_some_and(|record| !record.item.retired)
    }
}

// ============================================================================
// SECTION: Org and Environment Entries
// ============================================================================

/// Merge state of one segment.
#[derive(Debug, Clone, Default)]
pub struct SegmentEntry {
    /// Record under construction.
    pub record: SegmentRecord,
    /// Validation log.
    pub validation: ValidationLog,
    /// Prior canonical record.
    pub prior: Option<SegmentRecord>,
    /// Scorecard record.
    pub scorecard: Option<ScorecardSegment>,
    /// Tribes of the segment.
    pub tribes: Vec<TribeIdx>,
    /// Entity phase.
    pub phase: EntityPhase,
}

/// Merge state of one tribe.
#[derive(Debug, Clone)]
pub struct TribeEntry {
    /// Record under construction.
    pub record: TribeRecord,
    /// Validation log.
    pub validation: ValidationLog,
    /// Containing segment.
    pub segment: SegmentIdx,
    /// Prior canonical record.
    pub prior: Option<TribeRecord>,
    /// Entity phase.
    pub phase: EntityPhase,
}

/// Merge state of one environment.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentEntry {
    /// Record under construction.
    pub record: EnvironmentRecord,
    /// Validation log.
    pub validation: ValidationLog,
    /// Prior canonical record.
    pub prior: Option<EnvironmentRecord>,
    /// Catalog location records.
    pub catalog: SourceSlot<CatalogResource>,
    /// Fleet-directory records.
    pub fleet: SourceSlot<FleetEnvironment>,
    /// Region-id records.
    pub region: SourceSlot<RegionId>,
    /// Entity phase.
    pub phase: EntityPhase,
}

/// Equivalence class of service names and deliverables sharing a name.
///
/// # Invariants
/// - Never empty.
/// - Service names and deliverable identifiers are sorted and unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameGroup {
    /// Canonical service names.
    pub services: Vec<String>,
    /// Clearinghouse deliverable identifiers.
    pub deliverables: Vec<DeliverableId>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// In-memory store of every entity of one run.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Names that bypass folding.
    do_not_merge: DoNotMergeNames,
    /// Service arena.
    services: Vec<ServiceEntry>,
    /// Segment arena.
    segments: Vec<SegmentEntry>,
    /// Tribe arena.
    tribes: Vec<TribeEntry>,
    /// Environment arena.
    environments: Vec<EnvironmentEntry>,
    /// Name-group arena.
    name_groups: Vec<NameGroup>,
    /// Catalog resources by identifier.
    catalog_by_id: BTreeMap<String, CatalogResource>,
    /// Clearinghouse summaries by identifier.
    deliverables: BTreeMap<DeliverableId, DeliverableSummary>,
    /// Full clearinghouse deliverables by identifier.
    deliverables_full: BTreeMap<DeliverableId, DeliverableFull>,
    /// Service by comparable name.
    service_by_name: BTreeMap<String, ServiceIdx>,
    /// Service by catalog identifier.
    service_by_catalog_id: BTreeMap<String, ServiceIdx>,
    /// Service by catalog plan identifier.
    service_by_plan_id: BTreeMap<String, ServiceIdx>,
    /// Services by part number.
    services_by_part_number: BTreeMap<String, BTreeSet<ServiceIdx>>,
    /// Services by product identifier.
    services_by_product_id: BTreeMap<String, BTreeSet<ServiceIdx>>,
    /// Services by clearinghouse deliverable.
    services_by_deliverable: BTreeMap<DeliverableId, BTreeSet<ServiceIdx>>,
    /// Environment by normalized location CRN.
    environment_by_crn: BTreeMap<String, EnvironmentIdx>,
    /// Environment by catalog identifier.
    environment_by_catalog_id: BTreeMap<String, EnvironmentIdx>,
    /// Segment by identifier.
    segment_by_id: BTreeMap<SegmentId, SegmentIdx>,
    /// Segment by comparable display name.
    segment_by_name: BTreeMap<String, SegmentIdx>,
    /// Tribe by identifier.
    tribe_by_id: BTreeMap<TribeId, TribeIdx>,
    /// Tribe by comparable display name within its segment.
    tribe_by_segment_name: BTreeMap<(SegmentIdx, String), TribeIdx>,
    /// Name group by canonical service name.
    group_by_service: BTreeMap<String, NameGroupIdx>,
    /// Name group by deliverable identifier.
    group_by_deliverable: BTreeMap<DeliverableId, NameGroupIdx>,
    /// Segment carrying the default-segment tag.
    default_segment: Option<SegmentIdx>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(do_not_merge: DoNotMergeNames) -> Self {
        Self { do_not_merge, ..Self::default() }
    }

    /// Returns the do-not-merge list.
    #[must_use]
    pub const fn do_not_merge(&self) -> &DoNotMergeNames {
        &self.do_not_merge
    }

    /// Returns the registry key of a service name.
    #[must_use]
    pub fn service_key(&self, name: &str) -> String {
        self.do_not_merge.key_for(name)
    }

    // ------------------------------------------------------------------------
    // Services
    // ------------------------------------------------------------------------

    /// Looks up a service by any name form.
    #[must_use]
    pub fn service_by_name(&self, name: &str) -> Option<ServiceIdx> {
        self.service_by_name.get(&self.service_key(name)).copied()
    }

    /// Looks up a service, creating an empty entry when missing.
    ///
    /// Returns `None` for names that fold to nothing.
    pub fn service_or_insert(&mut self, name: &str) -> Option<ServiceIdx> {
        let key = self.service_key(name);
        if key.is_empty() {
            return None;
        }
        if let Some(idx) = self.service_by_name.get(&key) {
            return Some(*idx);
        }
        let idx = ServiceIdx(self.services.len());
        self.services.push(ServiceEntry {
            key: key.clone(),
            validation: ValidationLog::new(key.clone()),
            ..ServiceEntry::default()
        });
        self.service_by_name.insert(key, idx);
        Some(idx)
    }

    /// Returns a service entry.
    #[must_use]
    pub fn service(&self, idx: ServiceIdx) -> &ServiceEntry {
        &self.services[idx.0]
    }

    /// Returns a mutable service entry.
    pub fn service_mut(&mut self, idx: ServiceIdx) -> &mut ServiceEntry {
        &mut self.services[idx.0]
    }

    /// Moves a service entry out, leaving an empty placeholder.
    pub fn take_service(&mut self, idx: ServiceIdx) -> ServiceEntry {
        mem::take(&mut self.services[idx.0])
    }

    /// Puts a service entry back after [`Registry::take_service`].
    pub fn restore_service(&mut self, idx: ServiceIdx, entry: ServiceEntry) {
        self.services[idx.0] = entry;
    }

    /// Returns the number of service entries.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Returns service indexes in registry-key order.
    #[must_use]
    pub fn service_indices(&self) -> Vec<ServiceIdx> {
        self.service_by_name.values().copied().collect()
    }

    /// Looks up a service by catalog identifier.
    #[must_use]
    pub fn service_by_catalog_id(&self, id: &str) -> Option<ServiceIdx> {
        self.service_by_catalog_id.get(id).copied()
    }

    /// Binds a catalog identifier to a service.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] when bound to another service.
    pub fn index_catalog_id(&mut self, id: &str, idx: ServiceIdx) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Ok(());
        }
        bind_unique("service-by-catalog-id", &mut self.service_by_catalog_id, id.to_string(), idx)
    }

    /// Looks up a service by plan identifier.
    #[must_use]
    pub fn service_by_plan_id(&self, id: &str) -> Option<ServiceIdx> {
        self.service_by_plan_id.get(id).copied()
    }

    /// Binds a plan identifier to a service.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] when bound to another service.
    pub fn index_plan_id(&mut self, id: &str, idx: ServiceIdx) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Ok(());
        }
        bind_unique("service-by-plan-id", &mut self.service_by_plan_id, id.to_string(), idx)
    }

    /// Records a part number of a service.
    pub fn index_part_number(&mut self, part_number: &str, idx: ServiceIdx) {
        if !part_number.is_empty() {
            self.services_by_part_number.entry(part_number.to_string()).or_default().insert(idx);
        }
    }

    /// Returns services carrying a part number.
    pub fn services_by_part_number(&self, part_number: &str) -> impl Iterator<Item = ServiceIdx> + '_ {
        self.services_by_part_number.get(part_number).into_iter().flatten().copied()
    }

    /// Records a product identifier of a service.
    pub fn index_product_id(&mut self, product_id: &str, idx: ServiceIdx) {
        if !product_id.is_empty() {
            self.services_by_product_id.entry(product_id.to_string()).or_default().insert(idx);
        }
    }

    /// Returns services carrying a product identifier.
    pub fn services_by_product_id(&self, product_id: &str) -> impl Iterator<Item = ServiceIdx> + '_ {
        self.services_by_product_id.get(product_id).into_iter().flatten().copied()
    }

    /// Records a clearinghouse binding of a service.
    pub fn index_deliverable_binding(&mut self, id: &DeliverableId, idx: ServiceIdx) {
        self.services_by_deliverable.entry(id.clone()).or_default().insert(idx);
    }

    /// Returns services bound to a deliverable.
    pub fn services_by_deliverable(&self, id: &DeliverableId) -> impl Iterator<Item = ServiceIdx> + '_ {
        self.services_by_deliverable.get(id).into_iter().flatten().copied()
    }

    // ------------------------------------------------------------------------
    // Catalog and Clearinghouse
    // ------------------------------------------------------------------------

    /// Stores a catalog resource by identifier; the first one stored wins.
    pub fn store_catalog_resource(&mut self, resource: &CatalogResource) {
        if !resource.id.is_empty() {
            self.catalog_by_id.entry(resource.id.clone()).or_insert_with(|| resource.clone());
        }
    }

    /// Looks up a catalog resource by identifier.
    #[must_use]
    pub fn catalog_resource(&self, id: &str) -> Option<&CatalogResource> {
        self.catalog_by_id.get(id)
    }

    /// Stores a clearinghouse summary.
    pub fn store_deliverable(&mut self, summary: DeliverableSummary) {
        self.deliverables.insert(summary.id.clone(), summary);
    }

    /// Stores a full clearinghouse deliverable.
    pub fn store_deliverable_full(&mut self, full: DeliverableFull) {
        self.deliverables_full.insert(full.summary.id.clone(), full);
    }

    /// Looks up a clearinghouse summary.
    #[must_use]
    pub fn deliverable(&self, id: &DeliverableId) -> Option<&DeliverableSummary> {
        self.deliverables.get(id)
    }

    /// Looks up a full clearinghouse deliverable.
    #[must_use]
    pub fn deliverable_full(&self, id: &DeliverableId) -> Option<&DeliverableFull> {
        self.deliverables_full.get(id)
    }

    /// Iterates over clearinghouse summaries in identifier order.
    pub fn deliverables(&self) -> impl Iterator<Item = &DeliverableSummary> {
        self.deliverables.values()
    }

    // ------------------------------------------------------------------------
    // Environments
    // ------------------------------------------------------------------------

    /// Looks up an environment by normalized CRN.
    #[must_use]
    pub fn environment_by_crn(&self, crn: &str) -> Option<EnvironmentIdx> {
        self.environment_by_crn.get(crn).copied()
    }

    /// Looks up an environment, creating an empty entry when missing.
    pub fn environment_or_insert(&mut self, crn: &str) -> EnvironmentIdx {
        if let Some(idx) = self.environment_by_crn.get(crn) {
            return *idx;
        }
        let idx = EnvironmentIdx(self.environments.len());
        let mut entry = EnvironmentEntry { validation: ValidationLog::new(crn), ..EnvironmentEntry::default() };
        entry.record.environment_id = crn.to_string();
        self.environments.push(entry);
        self.environment_by_crn.insert(crn.to_string(), idx);
        idx
    }

    /// Returns an environment entry.
    #[must_use]
    pub fn environment(&self, idx: EnvironmentIdx) -> &EnvironmentEntry {
        &self.environments[idx.0]
    }

    /// Returns a mutable environment entry.
    pub fn environment_mut(&mut self, idx: EnvironmentIdx) -> &mut EnvironmentEntry {
        &mut self.environments[idx.0]
    }

    /// Returns environment indexes in CRN order.
    #[must_use]
    pub fn environment_indices(&self) -> Vec<EnvironmentIdx> {
        self.environment_by_crn.values().copied().collect()
    }

    /// Looks up an environment by catalog identifier.
    #[must_use]
    pub fn environment_by_catalog_id(&self, id: &str) -> Option<EnvironmentIdx> {
        self.environment_by_catalog_id.get(id).copied()
    }

    /// Binds a catalog identifier to an environment.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] when bound to another environment.
    pub fn index_environment_catalog_id(
        &mut self,
        id: &str,
        idx: EnvironmentIdx,
    ) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Ok(());
        }
        bind_unique("environment-by-catalog-id", &mut self.environment_by_catalog_id, id.to_string(), idx)
    }

    // ------------------------------------------------------------------------
    // Segments and Tribes
    // ------------------------------------------------------------------------

    /// Looks up a segment by identifier.
    #[must_use]
    pub fn segment_by_id(&self, id: &SegmentId) -> Option<SegmentIdx> {
        self.segment_by_id.get(id).copied()
    }

    /// Looks up a segment by display name.
    #[must_use]
    pub fn segment_by_name(&self, name: &str) -> Option<SegmentIdx> {
        self.segment_by_name.get(&comparable_name(name)).copied()
    }

    /// Looks up a segment, creating an empty entry when missing.
    pub fn segment_or_insert(&mut self, id: &SegmentId) -> SegmentIdx {
        if let Some(idx) = self.segment_by_id.get(id) {
            return *idx;
        }
        let idx = SegmentIdx(self.segments.len());
        let mut entry = SegmentEntry { validation: ValidationLog::new(id.as_str()), ..SegmentEntry::default() };
        entry.record.segment_id = id.clone();
        self.segments.push(entry);
        self.segment_by_id.insert(id.clone(), idx);
        idx
    }

    /// Binds a display name to a segment.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] when bound to another segment.
    pub fn index_segment_name(&mut self, name: &str, idx: SegmentIdx) -> Result<(), RegistryError> {
        let key = comparable_name(name);
        if key.is_empty() {
            return Ok(());
        }
        bind_unique("segment-by-name", &mut self.segment_by_name, key, idx)
    }

    /// Returns a segment entry.
    #[must_use]
    pub fn segment(&self, idx: SegmentIdx) -> &SegmentEntry {
        &self.segments[idx.0]
    }

    /// Returns a mutable segment entry.
    pub fn segment_mut(&mut self, idx: SegmentIdx) -> &mut SegmentEntry {
        &mut self.segments[idx.0]
    }

    /// Returns segment indexes in identifier order.
    #[must_use]
    pub fn segment_indices(&self) -> Vec<SegmentIdx> {
        self.segment_by_id.values().copied().collect()
    }

    /// Returns the default segment, when exactly one is tagged.
    #[must_use]
    pub const fn default_segment(&self) -> Option<SegmentIdx> {
        self.default_segment
    }

    /// Records the default segment.
    pub fn set_default_segment(&mut self, idx: Option<SegmentIdx>) {
        self.default_segment = idx;
    }

    /// Looks up a tribe by identifier.
    #[must_use]
    pub fn tribe_by_id(&self, id: &TribeId) -> Option<TribeIdx> {
        self.tribe_by_id.get(id).copied()
    }

    /// Looks up a tribe by display name within a segment.
    #[must_use]
    pub fn tribe_by_name(&self, segment: SegmentIdx, name: &str) -> Option<TribeIdx> {
        self.tribe_by_segment_name.get(&(segment, comparable_name(name))).copied()
    }

    /// Inserts a tribe into a segment.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] when the tribe identifier or the
    /// display name within the segment is bound to another tribe.
    pub fn insert_tribe(
        &mut self,
        segment: SegmentIdx,
        record: TribeRecord,
        prior: Option<TribeRecord>,
    ) -> Result<TribeIdx, RegistryError> {
        let idx = TribeIdx(self.tribes.len());
        bind_unique("tribe-by-id", &mut self.tribe_by_id, record.tribe_id.clone(), idx)?;
        let name_key = comparable_name(&record.display_name);
        if !name_key.is_empty() {
            if let Some(existing) = self.tribe_by_segment_name.get(&(segment, name_key.clone())) {
                return Err(RegistryError::DuplicateKey {
                    table: "tribe-by-segment-name",
                    key: format!("{}/{name_key} ({existing})", segment),
                });
            }
            self.tribe_by_segment_name.insert((segment, name_key), idx);
        }
        self.tribes.push(TribeEntry {
            validation: ValidationLog::new(record.tribe_id.as_str()),
            record,
            segment,
            prior,
            phase: EntityPhase::Created,
        });
        self.segments[segment.0].tribes.push(idx);
        Ok(idx)
    }

    /// Returns a tribe entry.
    #[must_use]
    pub fn tribe(&self, idx: TribeIdx) -> &TribeEntry {
        &self.tribes[idx.0]
    }

    /// Returns a mutable tribe entry.
    pub fn tribe_mut(&mut self, idx: TribeIdx) -> &mut TribeEntry {
        &mut self.tribes[idx.0]
    }

    /// Returns tribe indexes in identifier order.
    #[must_use]
    pub fn tribe_indices(&self) -> Vec<TribeIdx> {
        self.tribe_by_id.values().copied().collect()
    }

    // ------------------------------------------------------------------------
    // Name Groups
    // ------------------------------------------------------------------------

    /// Inserts a name group and indexes its members.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] when a member already belongs to
    /// another group.
    pub fn insert_name_group(&mut self, group: NameGroup) -> Result<NameGroupIdx, RegistryError> {
        let idx = NameGroupIdx(self.name_groups.len());
        for name in &group.services {
            bind_unique("group-by-service", &mut self.group_by_service, name.clone(), idx)?;
        }
        for id in &group.deliverables {
            bind_unique("group-by-deliverable", &mut self.group_by_deliverable, id.clone(), idx)?;
        }
        self.name_groups.push(group);
        Ok(idx)
    }

    /// Returns the name group of a canonical service name.
    #[must_use]
    pub fn group_by_service(&self, name: &str) -> Option<&NameGroup> {
        self.group_by_service.get(name).map(|idx| &self.name_groups[idx.0])
    }

    /// Returns the name group of a deliverable.
    #[must_use]
    pub fn group_by_deliverable(&self, id: &DeliverableId) -> Option<&NameGroup> {
        self.group_by_deliverable.get(id).map(|idx| &self.name_groups[idx.0])
    }

    /// Returns all name groups.
    #[must_use]
    pub fn name_groups(&self) -> &[NameGroup] {
        &self.name_groups
    }
}
