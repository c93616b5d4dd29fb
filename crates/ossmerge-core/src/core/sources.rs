// crates/ossmerge-core/src/core/sources.rs
// ============================================================================
// Module: Source Record Shapes
// Description: Records read from each authoritative directory.
// Purpose: Describe the attributes the merge engine consumes from each source.
// Dependencies: crate::core::{identifiers, model}, serde
// ============================================================================

//! ## Overview
//! Each directory (catalog, incident system, scorecard, identity service,
//! maturity manager, clearinghouse, fleet directory) is loaded outside the
//! core. These shapes carry only the attributes the mergers read; loaders are
//! free to drop everything else. All fields default so partial JSON snapshots
//! deserialize.

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
use crate::core::model::ClientExperience;
use crate::core::model::EntryType;
use crate::core::model::EnvironmentRecord;
use crate::core::model::EnvironmentType;
use crate::core::model::EscalationType;
use crate::core::model::MergeControl;
use crate::core::model::OnboardingPhase;
use crate::core::model::OperationalStatus;
use crate::core::model::Person;
use crate::core::model::SegmentRecord;
use crate::core::model::ServiceRecord;
use crate::core::model::Taxonomy;
use crate::core::model::TribeRecord;
use crate::core::validation::ValidationLog;

// ============================================================================
// SECTION: Source Kinds
// ============================================================================

/// Source of a candidate value in an attribute merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Global product catalog.
    Catalog,
    /// Incident / CMDB system.
    ServiceNow,
    /// Internal scorecard.
    ScorecardV1,
    /// Identity service.
    Iam,
    /// Maturity manager main tab.
    Rmc,
    /// Maturity manager operations (OSS) tab.
    RmcOss,
    /// Canonical record from the previous run.
    PriorOss,
    /// Value computed by another merge step.
    Custom(String),
    /// Explicit override property in the merge-control record.
    OverrideProperty,
    /// Override tag in the merge-control record.
    OverrideTag,
}

impl SourceKind {
    /// Returns true for sources backed by an external directory fetch.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(
            self,
            Self::Catalog | Self::ServiceNow | Self::ScorecardV1 | Self::Iam | Self::Rmc | Self::RmcOss
        )
    }

    /// Returns true for override sources from the merge-control record.
    #[must_use]
    pub const fn is_override(&self) -> bool {
        matches!(self, Self::OverrideProperty | Self::OverrideTag)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => f.write_str("Catalog"),
            Self::ServiceNow => f.write_str("ServiceNow"),
            Self::ScorecardV1 => f.write_str("ScorecardV1"),
            Self::Iam => f.write_str("IAM"),
            Self::Rmc => f.write_str("RMC"),
            Self::RmcOss => f.write_str("RMC-OSS"),
            Self::PriorOss => f.write_str("PriorOSS"),
            Self::Custom(name) => f.write_str(name),
            Self::OverrideProperty => f.write_str("OverrideProperty"),
            Self::OverrideTag => f.write_str("OverrideTag"),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Kind of a catalog resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKind {
    /// Service offering.
    #[default]
    Service,
    /// Infrastructure offering.
    Iaas,
    /// Runtime offering.
    Runtime,
    /// Template offering.
    Template,
    /// Composite of several child offerings.
    Composite,
    /// Platform service.
    PlatformService,
    /// Pricing plan.
    Plan,
    /// Plan flavor.
    Flavor,
    /// Compute profile.
    Profile,
    /// Deployment of a plan to a location.
    Deployment,
    /// Multi-zone region.
    Region,
    /// Datacenter.
    Datacenter,
    /// Availability zone.
    AvailabilityZone,
    /// Point of presence.
    Pop,
    /// Legacy CNAME location.
    LegacyCname,
    /// Legacy environment location.
    LegacyEnvironment,
    /// Satellite location.
    Satellite,
}

impl CatalogKind {
    /// Returns true for kinds describing a service-like main entry.
    #[must_use]
    pub const fn is_service_like(self) -> bool {
        matches!(
            self,
            Self::Service
                | Self::Iaas
                | Self::Runtime
                | Self::Template
                | Self::Composite
                | Self::PlatformService
        )
    }

    /// Returns true for kinds attached to a parent service as plans.
    #[must_use]
    pub const fn is_plan_like(self) -> bool {
        matches!(self, Self::Plan | Self::Flavor | Self::Profile)
    }

    /// Returns true for kinds describing a location.
    #[must_use]
    pub const fn is_location(self) -> bool {
        matches!(
            self,
            Self::Region
                | Self::Datacenter
                | Self::AvailabilityZone
                | Self::Pop
                | Self::LegacyCname
                | Self::LegacyEnvironment
                | Self::Satellite
        )
    }

    /// Returns true for legacy location kinds.
    #[must_use]
    pub const fn is_legacy_location(self) -> bool {
        matches!(self, Self::LegacyCname | Self::LegacyEnvironment)
    }
}

/// Visibility restriction of a catalog resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisibilityRestriction {
    /// Visible to everyone.
    Public,
    /// Visible to internal accounts only.
    IbmOnly,
    /// Visible to an explicit account list only.
    Private,
    /// Restriction not reported.
    #[default]
    Unknown,
}

/// Visibility block of a catalog resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogVisibility {
    /// Declared restriction.
    pub restrictions: VisibilityRestriction,
    /// Effective restriction after inheritance from the parent.
    pub effective: VisibilityRestriction,
}

impl CatalogVisibility {
    /// Returns the effective restriction, falling back to the declared one.
    #[must_use]
    pub const fn effective_restriction(&self) -> VisibilityRestriction {
        match self.effective {
            VisibilityRestriction::Unknown => self.restrictions,
            other => other,
        }
    }
}

/// Deployment metadata of a catalog resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDeployment {
    /// Location name (e.g. `us-south`).
    pub location: String,
    /// Target location CRN.
    pub target_crn: String,
    /// Legacy MCCP identifier.
    pub mccp_id: String,
}

/// Provider block of a catalog resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogProvider {
    /// Provider name.
    pub name: String,
    /// Provider email.
    pub email: String,
    /// Provider support email.
    pub support_email: String,
    /// Provider phone.
    pub phone: String,
    /// Provider contact name.
    pub contact: String,
}

/// Global catalog resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogResource {
    /// Resource kind.
    pub kind: CatalogKind,
    /// Resource name.
    pub name: String,
    /// Catalog identifier.
    pub id: String,
    /// Parent catalog identifier.
    pub parent_id: String,
    /// Visibility block.
    pub visibility: CatalogVisibility,
    /// Active flag.
    pub active: bool,
    /// Disabled flag.
    pub disabled: bool,
    /// Hidden flag.
    pub hidden: bool,
    /// Display name.
    pub display_name: String,
    /// Catalog tags.
    pub tags: Vec<String>,
    /// Deployment metadata (deployments and locations only).
    pub deployment: Option<CatalogDeployment>,
    /// Provider block.
    pub provider: CatalogProvider,
    /// Whether the offering declares IAM compatibility.
    pub iam_compatible: bool,
}

impl CatalogResource {
    /// Returns true when the resource is publicly visible.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(self.visibility.effective_restriction(), VisibilityRestriction::Public)
    }

    /// Returns true when a catalog tag matches, case-insensitively.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate.eq_ignore_ascii_case(tag))
    }
}

// ============================================================================
// SECTION: Incident System
// ============================================================================

/// Support or operations block of an incident configuration item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentContacts {
    /// Responsible manager.
    pub manager: Person,
    /// Slack channel.
    pub slack_channel: String,
    /// Tier-1 assignment group.
    pub tier1_assignment_group: String,
    /// Tier-2 assignment group.
    pub tier2_assignment_group: String,
    /// Tier-2 escalation type.
    pub tier2_escalation_type: EscalationType,
    /// Tier-2 escalation target (repository or category).
    pub tier2_escalation_target: String,
    /// Client experience classification (support block only).
    pub client_experience: ClientExperience,
}

/// Status-page block of an incident configuration item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentStatusPage {
    /// Notification group.
    pub group: String,
    /// Status-page category identifier.
    pub category_id: String,
}

/// Ownership block of an incident configuration item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentOwnership {
    /// Segment name.
    pub segment: String,
    /// Tribe name.
    pub tribe: String,
    /// Tribe identifier.
    pub tribe_id: TribeId,
    /// Offering manager.
    pub offering_manager: Person,
}

/// Compliance block of an incident configuration item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentCompliance {
    /// Architecture focal.
    pub architecture_focal: Person,
    /// BCDR focal.
    pub bcdr_focal: Person,
    /// Security focal.
    pub security_focal: Person,
}

/// Incident-system configuration item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentItem {
    /// CRN service name.
    pub crn_service_name: String,
    /// Display name.
    pub display_name: String,
    /// System identifier.
    pub sys_id: String,
    /// Entry type as recorded in the incident system.
    pub entry_type: EntryType,
    /// Operational status as recorded in the incident system.
    pub operational_status: OperationalStatus,
    /// Client-facing flag.
    pub client_facing: bool,
    /// Support block.
    pub support: IncidentContacts,
    /// Operations block.
    pub operations: IncidentContacts,
    /// Status-page block.
    pub status_page: IncidentStatusPage,
    /// Ownership block.
    pub ownership: IncidentOwnership,
    /// Compliance block.
    pub compliance: IncidentCompliance,
    /// TIP onboarding flag.
    pub tip_onboarded: bool,
    /// Retired flag.
    pub retired: bool,
}

/// Issue reported by a loader alongside a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceIssue {
    /// Issue title.
    pub title: String,
    /// Issue details.
    pub details: String,
}

/// Incident item plus loader-reported issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentRecord {
    /// Configuration item.
    pub item: IncidentItem,
    /// Issues reported by the loader.
    pub issues: Vec<SourceIssue>,
}

// ============================================================================
// SECTION: Scorecard
// ============================================================================

/// Scorecard detail entry for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorecardEntry {
    /// Service name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Lifecycle status as free text.
    pub status: String,
    /// Management contact.
    pub management_contact: Person,
    /// Technical contact.
    pub tech_contact: Person,
    /// Business unit (segment) name.
    pub business_unit: String,
    /// Tribe name.
    pub tribe: String,
    /// AVM automation flag.
    pub avm_enabled: bool,
    /// Runbook automation flag.
    pub runbook_enabled: bool,
    /// BCDR focal.
    pub bcdr_focal: Person,
    /// Security focal.
    pub security_focal: Person,
}

/// Scorecard tribe inside a segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorecardTribe {
    /// Tribe identifier.
    pub id: TribeId,
    /// Tribe name.
    pub name: String,
    /// Tribe owner.
    pub owner: Person,
    /// Change approvers.
    pub change_approvers: Vec<Person>,
}

/// Scorecard segment with its tribes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorecardSegment {
    /// Segment identifier.
    pub id: SegmentId,
    /// Segment name.
    pub name: String,
    /// Segment owner.
    pub owner: Person,
    /// Technical contact.
    pub technical_contact: Person,
    /// Tribes of the segment.
    pub tribes: Vec<ScorecardTribe>,
}

// ============================================================================
// SECTION: Identity Service
// ============================================================================

/// Identity-service registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityEntry {
    /// Service name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Enabled flag.
    pub enabled: bool,
}

// ============================================================================
// SECTION: Maturity Manager
// ============================================================================

/// Operations (OSS) tab of a maturity-manager entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaturityOssTab {
    /// Onboarding phase.
    pub onboarding_phase: OnboardingPhase,
    /// Onboarding approver.
    pub approver: Person,
    /// Entry type.
    pub entry_type: EntryType,
    /// Operational status.
    pub operational_status: OperationalStatus,
    /// Future operational status.
    pub future_operational_status: OperationalStatus,
    /// Display name.
    pub display_name: String,
    /// Parent resource name.
    pub parent_resource_name: String,
    /// Client-facing flag.
    pub client_facing: bool,
    /// Manager-owned tags.
    pub tags: Vec<String>,
}

/// Maturity-manager summary entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaturityEntry {
    /// CRN service name.
    pub crn_service_name: String,
    /// Manager identifier.
    pub id: String,
    /// Name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Maturity label.
    pub maturity: String,
    /// Entry type on the main tab.
    pub entry_type: EntryType,
    /// Operations tab, present once onboarding started.
    pub oss_tab: Option<MaturityOssTab>,
}

impl MaturityEntry {
    /// Returns true when the entry is being edited in the manager.
    #[must_use]
    pub fn is_onboarded(&self) -> bool {
        self.oss_tab.as_ref().is_some_and(|tab| tab.onboarding_phase != OnboardingPhase::Unset)
    }
}

// ============================================================================
// SECTION: Clearinghouse
// ============================================================================

/// Clearinghouse deliverable summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverableSummary {
    /// Deliverable identifier.
    pub id: DeliverableId,
    /// Name.
    pub name: String,
    /// Code name.
    pub code_name: String,
    /// Official name.
    pub official_name: String,
    /// Short name.
    pub short_name: String,
    /// CRN service-name attribute.
    pub crn_service_name: String,
}

/// Lifecycle of a dependency declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyState {
    /// Active dependency.
    #[default]
    Active,
    /// Cancelled dependency.
    Cancelled,
    /// Rejected dependency.
    Rejected,
}

/// Dependency declared between two deliverables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverableDependency {
    /// Deliverable at the other end of the dependency.
    pub deliverable_id: DeliverableId,
    /// Dependency type label.
    pub dependency_type: String,
    /// Commit status label.
    pub commit_status: String,
    /// Lifecycle state.
    pub state: DependencyState,
}

/// Full clearinghouse deliverable with product data and dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverableFull {
    /// Summary fields.
    pub summary: DeliverableSummary,
    /// Product identifiers.
    pub product_ids: Vec<String>,
    /// Division code.
    pub division: String,
    /// Taxonomy.
    pub taxonomy: Taxonomy,
    /// Outbound dependencies.
    pub outbound: Vec<DeliverableDependency>,
    /// Inbound dependencies.
    pub inbound: Vec<DeliverableDependency>,
}

// ============================================================================
// SECTION: Fleet Directory
// ============================================================================

/// Fleet-directory environment entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetEnvironment {
    /// Location CRN.
    pub new_crn: String,
    /// Environment name.
    pub env_name: String,
    /// Region identifier.
    pub region_id: String,
    /// Environment type recorded by the fleet directory.
    pub env_type: EnvironmentType,
    /// Validity flag.
    pub valid: bool,
    /// Active flag.
    pub active: bool,
}

/// Region-id directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionId {
    /// Location CRN.
    pub crn: String,
    /// MCCP identifier.
    pub mccp_id: String,
    /// Region name.
    pub name: String,
    /// Validity flag.
    pub valid: bool,
    /// Active flag.
    pub active: bool,
}

// ============================================================================
// SECTION: Static Tables
// ============================================================================

/// Product data of one part number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartInfo {
    /// Product identifier.
    pub product_id: String,
    /// Division code.
    pub division: String,
}

/// Static parts-input table keyed by part number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartsTable(pub BTreeMap<String, PartInfo>);

impl PartsTable {
    /// Loads the table from JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when the document is malformed.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Looks up a part number.
    #[must_use]
    pub fn get(&self, part_number: &str) -> Option<&PartInfo> {
        self.0.get(part_number)
    }

    /// Returns the division recorded for a product identifier, if any.
    #[must_use]
    pub fn division_of(&self, product_id: &str) -> Option<&str> {
        self.0
            .values()
            .find(|info| info.product_id == product_id && !info.division.is_empty())
            .map(|info| info.division.as_str())
    }
}

/// Optional pricing cache: part numbers keyed by catalog identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingCache(pub BTreeMap<String, Vec<String>>);

impl PricingCache {
    /// Returns part numbers for a catalog identifier.
    #[must_use]
    pub fn part_numbers(&self, catalog_id: &str) -> &[String] {
        self.0.get(catalog_id).map_or(&[], Vec::as_slice)
    }
}

// ============================================================================
// SECTION: Prior Canonical Records
// ============================================================================

/// Prior-run service record with its control and validation companions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorService {
    /// Canonical record.
    pub record: ServiceRecord,
    /// Merge-control record.
    pub merge_control: Option<MergeControl>,
    /// Validation log of the prior run.
    pub validation: Option<ValidationLog>,
}

/// Canonical record produced by the previous run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriorRecord {
    /// Service record.
    Service(Box<PriorService>),
    /// Segment record.
    Segment(SegmentRecord),
    /// Tribe record.
    Tribe(TribeRecord),
    /// Environment record.
    Environment(EnvironmentRecord),
}
