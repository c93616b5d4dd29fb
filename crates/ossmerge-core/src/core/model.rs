// crates/ossmerge-core/src/core/model.rs
// ============================================================================
// Module: Canonical Records
// Description: Canonical service, segment, tribe and environment records.
// Purpose: Define the authoritative per-entity objects produced by a run.
// Dependencies: crate::core::{identifiers, tags}, serde
// ============================================================================

//! ## Overview
//! Canonical records are what downstream consumers treat as ground truth. They
//! are produced fresh by each run, seeded from the prior run's records, and
//! serialized alongside their validation logs.
//!
//! Every enum here has a zero value (`Unknown`, `Unset`, ...) used by the
//! attribute merger to detect values missing from a source.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DeliverableId;
use crate::core::identifiers::SegmentId;
use crate::core::identifiers::TribeId;
use crate::core::tags::TagSet;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Coarse classification of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    /// Not known.
    #[default]
    Unknown,
    /// Service offering.
    Service,
    /// Runtime offering.
    Runtime,
    /// Template offering.
    Template,
    /// Infrastructure offering.
    Iaas,
    /// Composite of child offerings.
    Composite,
    /// Platform component.
    PlatformComponent,
    /// Sub-component of another entry.
    SubComponent,
    /// Super-component grouping other entries.
    SuperComponent,
    /// VMware offering.
    Vmware,
    /// Government cloud offering.
    Gaas,
    /// Content offering.
    Content,
    /// Consulting offering.
    Consulting,
    /// Internal-only entry.
    Internal,
    /// Registered only in the identity service.
    IamOnly,
    /// Other merged-model entry.
    OtherOss,
}

impl EntryType {
    /// Returns the stable label of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Service => "service",
            Self::Runtime => "runtime",
            Self::Template => "template",
            Self::Iaas => "iaas",
            Self::Composite => "composite",
            Self::PlatformComponent => "platform-component",
            Self::SubComponent => "sub-component",
            Self::SuperComponent => "super-component",
            Self::Vmware => "vmware",
            Self::Gaas => "gaas",
            Self::Content => "content",
            Self::Consulting => "consulting",
            Self::Internal => "internal",
            Self::IamOnly => "iam-only",
            Self::OtherOss => "other-oss",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationalStatus {
    /// Not known.
    #[default]
    Unknown,
    /// Generally available.
    Ga,
    /// Beta.
    Beta,
    /// Experimental.
    Experimental,
    /// Available to selected clients.
    SelectAvailability,
    /// Deprecated.
    Deprecated,
    /// Retired.
    Retired,
    /// Operated by a third party.
    ThirdParty,
    /// Community supported.
    Community,
    /// Internal only.
    Internal,
    /// Not ready for clients.
    NotReady,
}

impl OperationalStatus {
    /// Returns the stable label of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Ga => "ga",
            Self::Beta => "beta",
            Self::Experimental => "experimental",
            Self::SelectAvailability => "select-availability",
            Self::Deprecated => "deprecated",
            Self::Retired => "retired",
            Self::ThirdParty => "third-party",
            Self::Community => "community",
            Self::Internal => "internal",
            Self::NotReady => "not-ready",
        }
    }

    /// Returns true for statuses under which a service is offered to clients.
    #[must_use]
    pub const fn is_client_available(self) -> bool {
        matches!(self, Self::Ga | Self::Beta | Self::Experimental | Self::Community | Self::ThirdParty)
    }
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client experience classification of the support model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientExperience {
    /// Not known.
    #[default]
    Unknown,
    /// Support through the cloud support process.
    AcsSupported,
    /// Support through a third-party provider.
    ThirdPartySupported,
    /// Best-effort community support.
    CommunitySupported,
}

impl ClientExperience {
    /// Returns the stable label of the classification.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::AcsSupported => "acs-supported",
            Self::ThirdPartySupported => "third-party-supported",
            Self::CommunitySupported => "community-supported",
        }
    }
}

/// Tier-2 escalation mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationType {
    /// Not known.
    #[default]
    Unknown,
    /// Escalation through the incident system.
    ServiceNow,
    /// Escalation through a repository.
    GitHub,
    /// Escalation through a ticket category.
    Category,
    /// No escalation.
    None,
}

impl EscalationType {
    /// Returns the stable label of the escalation type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::ServiceNow => "service-now",
            Self::GitHub => "git-hub",
            Self::Category => "category",
            Self::None => "none",
        }
    }
}

/// Whether the entry is being edited in the maturity manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingPhase {
    /// Not onboarded.
    #[default]
    Unset,
    /// Being edited.
    Editing,
    /// Declared invalid.
    Invalid,
}

impl OnboardingPhase {
    /// Returns the stable label of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Editing => "editing",
            Self::Invalid => "invalid",
        }
    }
}

/// Segment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentType {
    /// Public cloud segment.
    #[default]
    PublicCloud,
    /// Government cloud segment.
    Gaas,
}

/// Environment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentType {
    /// Not known.
    #[default]
    Unknown,
    /// Multi-zone region.
    Region,
    /// Datacenter.
    Datacenter,
    /// Availability zone.
    Zone,
    /// Point of presence.
    Pop,
    /// Satellite location.
    Satellite,
    /// Dedicated environment.
    Dedicated,
    /// Local environment.
    Local,
    /// Staging environment.
    Staging,
    /// Government cloud environment.
    Gaas,
    /// Special-purpose environment.
    Special,
}

impl EnvironmentType {
    /// Returns the stable label of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Region => "region",
            Self::Datacenter => "datacenter",
            Self::Zone => "zone",
            Self::Pop => "pop",
            Self::Satellite => "satellite",
            Self::Dedicated => "dedicated",
            Self::Local => "local",
            Self::Staging => "staging",
            Self::Gaas => "gaas",
            Self::Special => "special",
        }
    }
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentStatus {
    /// Not known.
    #[default]
    Unknown,
    /// Active.
    Active,
    /// Available to selected clients.
    SelectAvailability,
    /// Decommissioned.
    Decommissioned,
    /// Not ready.
    NotReady,
}

impl EnvironmentStatus {
    /// Returns the stable label of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Active => "active",
            Self::SelectAvailability => "select-availability",
            Self::Decommissioned => "decommissioned",
            Self::NotReady => "not-ready",
        }
    }
}

// ============================================================================
// SECTION: Shared Values
// ============================================================================

/// Named contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    /// Display name.
    pub name: String,
    /// Email (W3 identifier).
    pub email: String,
}

impl Person {
    /// Creates a contact.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { name: name.into(), email: email.into() }
    }

    /// Returns true when neither name nor email is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty()
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.email.is_empty()) {
            (_, true) => f.write_str(&self.name),
            (true, false) => f.write_str(&self.email),
            (false, false) => write!(f, "{} <{}>", self.name, self.email),
        }
    }
}

/// Product taxonomy from the clearinghouse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    /// Major unit.
    pub major_unit: String,
    /// Minor unit.
    pub minor_unit: String,
}

impl Taxonomy {
    /// Returns true when no unit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.major_unit.is_empty() && self.minor_unit.is_empty()
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.major_unit, self.minor_unit)
    }
}

// ============================================================================
// SECTION: Merge Control
// ============================================================================

/// Property a merge-control record may override explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideKey {
    /// Display name.
    DisplayName,
    /// Parent resource name.
    ParentResourceName,
    /// Status-page category identifier.
    StatusCategoryId,
    /// Status-page category parent.
    StatusCategoryParent,
    /// Status-page notification group.
    NotificationGroup,
}

/// Per-service human control record that survives across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeControl {
    /// Canonical name the control record applies to.
    pub canonical_name: String,
    /// Raw tag tokens, validated during the merge.
    pub tags: Vec<String>,
    /// Explicit property overrides.
    pub overrides: BTreeMap<OverrideKey, String>,
    /// Canonical name of the entry this one duplicates, if any.
    pub duplicate_of: String,
}

impl MergeControl {
    /// Creates an empty control record for a name.
    #[must_use]
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self { canonical_name: canonical_name.into(), ..Self::default() }
    }

    /// Returns an override value, if set and non-empty.
    #[must_use]
    pub fn override_value(&self, key: OverrideKey) -> Option<&str> {
        self.overrides.get(&key).map(String::as_str).filter(|value| !value.is_empty())
    }
}

// ============================================================================
// SECTION: Service Record
// ============================================================================

/// General attributes of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralInfo {
    /// Entry type.
    pub entry_type: EntryType,
    /// Operational status.
    pub operational_status: OperationalStatus,
    /// Planned future operational status.
    pub future_operational_status: OperationalStatus,
    /// Client-facing flag from the incident system.
    pub client_facing: bool,
    /// Client-facing flag inferred from the catalog.
    pub catalog_client_facing: bool,
    /// Incident-system identifier.
    pub service_now_sys_id: String,
    /// Parent resource name.
    pub parent_resource_name: String,
    /// Policy tags.
    pub oss_tags: TagSet,
    /// Onboarding phase in the maturity manager.
    pub onboarding_phase: OnboardingPhase,
    /// Onboarding approver.
    pub onboarding_approver: Person,
}

/// Ownership attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ownership {
    /// Offering manager.
    pub offering_manager: Person,
    /// Development manager.
    pub development_manager: Person,
    /// Segment identifier.
    pub segment_id: SegmentId,
    /// Segment name.
    pub segment_name: String,
    /// Segment owner.
    pub segment_owner: Person,
    /// Tribe identifier.
    pub tribe_id: TribeId,
    /// Tribe name.
    pub tribe_name: String,
    /// Tribe owner.
    pub tribe_owner: Person,
}

/// Support attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Support {
    /// Support manager.
    pub manager: Person,
    /// Client experience classification.
    pub client_experience: ClientExperience,
    /// Slack channel.
    pub slack_channel: String,
    /// Tier-1 assignment group.
    pub tier1_assignment_group: String,
    /// Tier-2 assignment group.
    pub tier2_assignment_group: String,
    /// Tier-2 escalation type.
    pub tier2_escalation_type: EscalationType,
    /// Tier-2 escalation target.
    pub tier2_escalation_target: String,
}

/// Operations attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operations {
    /// Operations manager.
    pub manager: Person,
    /// Slack channel.
    pub slack_channel: String,
    /// Tier-1 assignment group.
    pub tier1_assignment_group: String,
    /// Tier-2 assignment group.
    pub tier2_assignment_group: String,
    /// Tier-2 escalation type.
    pub tier2_escalation_type: EscalationType,
    /// Tier-2 escalation target.
    pub tier2_escalation_target: String,
    /// TIP onboarding flag.
    pub tip_onboarded: bool,
    /// AVM automation flag.
    pub avm_enabled: bool,
    /// Runbook automation flag.
    pub runbook_enabled: bool,
    /// Monitor names.
    pub monitors: Vec<String>,
}

/// Compliance attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compliance {
    /// Whether a live incident-system record exists.
    pub service_now_onboarded: bool,
    /// BCDR focal.
    pub bcdr_focal: Person,
    /// Security focal.
    pub security_focal: Person,
    /// Architecture focal.
    pub architecture_focal: Person,
}

/// Status-page attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPage {
    /// Category identifier.
    pub category_id: String,
    /// Category parent service name.
    pub category_parent: String,
    /// Notification group.
    pub group: String,
}

/// Catalog attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogInfo {
    /// Provider name.
    pub provider: String,
    /// Provider contact.
    pub provider_contact: String,
    /// Provider support email.
    pub provider_support_email: String,
    /// Provider phone.
    pub provider_phone: String,
    /// Deployment locations.
    pub locations: Vec<String>,
}

/// Where a product identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductIdSource {
    /// Parts-input table.
    PartsTable,
    /// Clearinghouse deliverable matched by CRN attribute.
    ClearingHouseCrn,
    /// Clearinghouse deliverable matched by name group.
    ClearingHouseName,
    /// Inherited from the parent record.
    Parent,
    /// Inherited from the cloud platform record.
    CloudPlatform,
    /// Copied from the prior run.
    PriorOss,
}

impl ProductIdSource {
    /// Returns true for identifiers inherited from another record.
    #[must_use]
    pub const fn is_inherited(self) -> bool {
        matches!(self, Self::Parent | Self::CloudPlatform | Self::PriorOss)
    }
}

/// Product identifier with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId {
    /// Identifier.
    pub id: String,
    /// Provenance.
    pub source: ProductIdSource,
}

/// How a clearinghouse deliverable was bound to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingKind {
    /// Deliverable CRN-service-name attribute matched.
    Crn,
    /// Product identifier matched.
    Pid,
    /// Name group matched.
    Name,
}

/// Clearinghouse deliverable bound to a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingHouseRef {
    /// Deliverable identifier.
    pub id: DeliverableId,
    /// Deliverable name.
    pub name: String,
    /// How the deliverable was bound, in binding order.
    pub bindings: Vec<BindingKind>,
}

impl ClearingHouseRef {
    /// Returns true when the deliverable was bound by the given kind.
    #[must_use]
    pub fn bound_by(&self, kind: BindingKind) -> bool {
        self.bindings.contains(&kind)
    }
}

/// Product information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductInfo {
    /// Part numbers.
    pub part_numbers: Vec<String>,
    /// Product identifiers with provenance.
    pub product_ids: Vec<ProductId>,
    /// Bound clearinghouse deliverables.
    pub clearinghouse_refs: Vec<ClearingHouseRef>,
    /// Taxonomy.
    pub taxonomy: Taxonomy,
    /// Division code, or `multiple`.
    pub division: String,
    /// Stable OSS unique identifier; zero when unassigned.
    pub oss_uid: u64,
}

impl ProductInfo {
    /// Returns true when the identifier is already recorded.
    #[must_use]
    pub fn has_product_id(&self, id: &str) -> bool {
        self.product_ids.iter().any(|pid| pid.id == id)
    }

    /// Records an identifier unless already present; returns true when added.
    pub fn add_product_id(&mut self, id: impl Into<String>, source: ProductIdSource) -> bool {
        let id = id.into();
        if id.is_empty() || self.has_product_id(&id) {
            return false;
        }
        self.product_ids.push(ProductId { id, source });
        true
    }

    /// Records a part number unless already present.
    pub fn add_part_number(&mut self, part_number: impl Into<String>) {
        let part_number = part_number.into();
        if !part_number.is_empty() && !self.part_numbers.contains(&part_number) {
            self.part_numbers.push(part_number);
        }
    }
}

/// One dependency link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    /// Canonical service name, or deliverable identifier for unknown targets.
    pub service: String,
    /// Provenance tags (`type:...`, `commit:...`, `source:clearinghouse`, ...).
    pub tags: Vec<String>,
}

/// Dependency information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyInfo {
    /// Services this one depends on.
    pub outbound: Vec<Dependency>,
    /// Services depending on this one.
    pub inbound: Vec<Dependency>,
}

/// Canonical service record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceRecord {
    /// Canonical reference name.
    pub reference_resource_name: String,
    /// Canonical display name.
    pub reference_display_name: String,
    /// Catalog identifier.
    pub reference_catalog_id: String,
    /// Catalog path (parent names joined by `/`).
    pub reference_catalog_path: String,
    /// General attributes.
    pub general: GeneralInfo,
    /// Ownership attributes.
    pub ownership: Ownership,
    /// Support attributes.
    pub support: Support,
    /// Operations attributes.
    pub operations: Operations,
    /// Compliance attributes.
    pub compliance: Compliance,
    /// Status-page attributes.
    pub status_page: StatusPage,
    /// Catalog attributes.
    pub catalog_info: CatalogInfo,
    /// Product information.
    pub product_info: ProductInfo,
    /// Dependency information.
    pub dependencies: DependencyInfo,
}

impl ServiceRecord {
    /// Creates an empty record for a reference name.
    #[must_use]
    pub fn named(reference_resource_name: impl Into<String>) -> Self {
        Self { reference_resource_name: reference_resource_name.into(), ..Self::default() }
    }
}

// ============================================================================
// SECTION: Org and Environment Records
// ============================================================================

/// Canonical segment record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentRecord {
    /// Segment identifier.
    pub segment_id: SegmentId,
    /// Display name.
    pub display_name: String,
    /// Segment type.
    pub segment_type: SegmentType,
    /// Owner.
    pub owner: Person,
    /// Technical contact.
    pub technical_contact: Person,
    /// Change approvers.
    pub change_approvers: Vec<Person>,
    /// Policy tags.
    pub tags: TagSet,
}

/// Canonical tribe record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TribeRecord {
    /// Tribe identifier.
    pub tribe_id: TribeId,
    /// Containing segment identifier.
    pub segment_id: SegmentId,
    /// Display name.
    pub display_name: String,
    /// Owner.
    pub owner: Person,
    /// Change approvers.
    pub change_approvers: Vec<Person>,
}

/// Canonical environment record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentRecord {
    /// Environment identifier (normalized location CRN).
    pub environment_id: String,
    /// Display name.
    pub display_name: String,
    /// Parent environment identifier.
    pub parent_id: String,
    /// Environment type.
    pub env_type: EnvironmentType,
    /// Environment status.
    pub status: EnvironmentStatus,
    /// Owning segment identifier.
    pub owning_segment: SegmentId,
    /// Legacy IMS identifier.
    pub legacy_ims_id: String,
    /// Legacy MCCP identifier.
    pub legacy_mccp_id: String,
    /// Legacy fleet-directory CRN.
    pub legacy_doctor_crn: String,
    /// Catalog identifier of the primary catalog entry.
    pub catalog_id: String,
    /// Policy tags.
    pub tags: TagSet,
}
