// crates/ossmerge-core/src/core/mod.rs
// ============================================================================
// Module: OSS Merge Core Types
// Description: Canonical records, source shapes and validation structures.
// Purpose: Provide stable, serializable types shared by the merge runtime.
// Dependencies: serde, serde_jcs, sha2, smallvec, time
// ============================================================================

//! ## Overview
//! Core types define the canonical records produced by a run, the source
//! record shapes consumed from each directory, the per-entity validation log
//! and the run-action set. They carry no merge logic.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod crn;
pub mod hashing;
pub mod identifiers;
pub mod model;
pub mod run_actions;
pub mod sources;
pub mod tags;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crn::CrnType;
pub use crn::LocationCrn;
pub use crn::normalize_location_crn;
pub use hashing::Checksum;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::checksum_bytes;
pub use hashing::checksum_of;
pub use identifiers::DeliverableId;
pub use identifiers::DoNotMergeNames;
pub use identifiers::SegmentId;
pub use identifiers::TribeId;
pub use identifiers::canonical_name;
pub use identifiers::comparable_name;
pub use identifiers::is_canonical_name;
pub use model::BindingKind;
pub use model::CatalogInfo;
pub use model::ClearingHouseRef;
pub use model::ClientExperience;
pub use model::Compliance;
pub use model::Dependency;
pub use model::DependencyInfo;
pub use model::EntryType;
pub use model::EnvironmentRecord;
pub use model::EnvironmentStatus;
pub use model::EnvironmentType;
pub use model::EscalationType;
pub use model::GeneralInfo;
pub use model::MergeControl;
pub use model::OnboardingPhase;
pub use model::OperationalStatus;
pub use model::Operations;
pub use model::OverrideKey;
pub use model::Ownership;
pub use model::Person;
pub use model::ProductId;
pub use model::ProductIdSource;
pub use model::ProductInfo;
pub use model::SegmentRecord;
pub use model::SegmentType;
pub use model::ServiceRecord;
pub use model::StatusPage;
pub use model::Support;
pub use model::Taxonomy;
pub use model::TribeRecord;
pub use run_actions::RunAction;
pub use run_actions::RunActionOutcome;
pub use run_actions::RunActions;
pub use run_actions::UnknownRunAction;
pub use sources::CatalogDeployment;
pub use sources::CatalogKind;
pub use sources::CatalogProvider;
pub use sources::CatalogResource;
pub use sources::CatalogVisibility;
pub use sources::DeliverableDependency;
pub use sources::DeliverableFull;
pub use sources::DeliverableSummary;
pub use sources::DependencyState;
pub use sources::FleetEnvironment;
pub use sources::IdentityEntry;
pub use sources::IncidentCompliance;
pub use sources::IncidentContacts;
pub use sources::IncidentItem;
pub use sources::IncidentOwnership;
pub use sources::IncidentRecord;
pub use sources::IncidentStatusPage;
pub use sources::MaturityEntry;
pub use sources::MaturityOssTab;
pub use sources::PartInfo;
pub use sources::PartsTable;
pub use sources::PricingCache;
pub use sources::PriorRecord;
pub use sources::PriorService;
pub use sources::RegionId;
pub use sources::ScorecardEntry;
pub use sources::ScorecardSegment;
pub use sources::ScorecardTribe;
pub use sources::SourceIssue;
pub use sources::SourceKind;
pub use sources::VisibilityRestriction;
pub use tags::Tag;
pub use tags::TagEntry;
pub use tags::TagError;
pub use tags::TagSet;
pub use validation::IssueTag;
pub use validation::IssueTags;
pub use validation::RagStatus;
pub use validation::Severity;
pub use validation::SourceNameKind;
pub use validation::ValidationIssue;
pub use validation::ValidationLog;

