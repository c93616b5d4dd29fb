// crates/ossmerge-core/src/interfaces/mod.rs
// ============================================================================
// Module: OSS Merge Interfaces
// Description: Loader contracts for every authoritative directory.
// Purpose: Decouple the merge engine from directory clients and file formats.
// Dependencies: crate::core, regex, thiserror
// ============================================================================

//! ## Overview
//! The merge engine reads its inputs through the loader traits below. Raw API
//! clients, retries and import parsers live behind these traits, outside the
//! engine. Every loader receives a [`NamePattern`] restricting which names are
//! returned and must be deterministic for a given directory state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use regex::RegexBuilder;
use thiserror::Error;

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

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Loader errors.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The directory could not be reached or returned an error.
    #[error("{source_kind} unavailable: {message}")]
    Unavailable {
        /// Directory that failed.
        source_kind: SourceKind,
        /// Failure description.
        message: String,
    },
    /// The directory returned malformed data.
    #[error("{source_kind} returned invalid data: {message}")]
    Invalid {
        /// Directory that failed.
        source_kind: SourceKind,
        /// Failure description.
        message: String,
    },
    /// The name pattern is not a valid glob.
    #[error("invalid name pattern {pattern}: {message}")]
    Pattern {
        /// Pattern as written.
        pattern: String,
        /// Failure description.
        message: String,
    },
}

impl LoadError {
    /// Returns the directory that failed, when known.
    #[must_use]
    pub const fn source_kind(&self) -> Option<&SourceKind> {
        match self {
            Self::Unavailable { source_kind, .. } | Self::Invalid { source_kind, .. } => {
                Some(source_kind)
            }
            Self::Pattern { .. } => None,
        }
    }
}

// ============================================================================
// SECTION: Name Pattern
// ============================================================================

/// Case-insensitive glob pattern (`*` matches any run of characters).
#[derive(Debug, Clone)]
pub struct NamePattern {
    /// Pattern as written.
    raw: String,
    /// Compiled matcher.
    matcher: Regex,
}

impl NamePattern {
    /// Compiles a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Pattern`] when the pattern cannot be compiled.
    pub fn new(raw: &str) -> Result<Self, LoadError> {
        let raw = if raw.trim().is_empty() { "*" } else { raw.trim() };
        let body = raw.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
        let matcher = RegexBuilder::new(&format!("^{body}$"))
            .case_insensitive(true)
            .build()
            .map_err(|err| LoadError::Pattern { pattern: raw.to_string(), message: err.to_string() })?;
        Ok(Self { raw: raw.to_string(), matcher })
    }

    /// Returns a pattern matching every name.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Pattern`] if the match-all pattern fails to compile.
    pub fn any() -> Result<Self, LoadError> {
        Self::new("*")
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true when the pattern matches every name.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.raw == "*"
    }

    /// Returns true when the name matches.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }
}

// ============================================================================
// SECTION: Prior Canonical Records
// ============================================================================

/// Record families requested from the prior-canonical loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Each flag is an independent inclusion switch of the loader contract."
)]
pub struct PriorOptions {
    /// Include service records.
    pub include_services: bool,
    /// Include segment and tribe records.
    pub include_tribes: bool,
    /// Include environment records.
    pub include_environments: bool,
    /// Include environments native to the catalog.
    pub include_native_environments: bool,
    /// Include merge-control records.
    pub include_merge_control: bool,
    /// Include validation logs.
    pub include_validation: bool,
    /// Include domain overrides.
    pub include_domain_overrides: bool,
}

/// Loader for the canonical records of the previous run.
pub trait PriorLoader {
    /// Lists prior canonical records matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the prior records cannot be read.
    fn list_prior(
        &self,
        pattern: &NamePattern,
        options: PriorOptions,
    ) -> Result<Vec<PriorRecord>, LoadError>;
}

// ============================================================================
// SECTION: Directory Loaders
// ============================================================================

/// Loader for the global product catalog.
pub trait CatalogLoader {
    /// Lists catalog resources matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the catalog cannot be read.
    fn list_catalog(&self, pattern: &NamePattern) -> Result<Vec<CatalogResource>, LoadError>;
}

/// Loader for the incident / CMDB system.
pub trait IncidentLoader {
    /// Lists configuration items matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the incident system cannot be read.
    fn list_incident_items(
        &self,
        pattern: &NamePattern,
        include_test: bool,
    ) -> Result<Vec<IncidentRecord>, LoadError>;
}

/// Loader for the internal scorecard.
pub trait ScorecardLoader {
    /// Lists scorecard detail entries matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the scorecard cannot be read.
    fn list_scorecard_detail(&self, pattern: &NamePattern)
    -> Result<Vec<ScorecardEntry>, LoadError>;

    /// Lists scorecard segments with their tribes.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the scorecard cannot be read.
    fn list_scorecard_segments(&self) -> Result<Vec<ScorecardSegment>, LoadError>;
}

/// Loader for the identity service.
pub trait IdentityLoader {
    /// Lists identity registrations matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the identity service cannot be read.
    fn list_identity_services(&self, pattern: &NamePattern)
    -> Result<Vec<IdentityEntry>, LoadError>;
}

/// Loader for the resource / maturity manager.
pub trait MaturityLoader {
    /// Lists maturity-manager entries matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the maturity manager cannot be read.
    fn list_maturity_summary(
        &self,
        pattern: &NamePattern,
        rescan: bool,
    ) -> Result<Vec<MaturityEntry>, LoadError>;
}

/// Loader for the product clearinghouse.
pub trait ClearingHouseLoader {
    /// Lists deliverable summaries matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the clearinghouse cannot be read.
    fn list_clearinghouse_summary(
        &self,
        pattern: &NamePattern,
    ) -> Result<Vec<DeliverableSummary>, LoadError>;

    /// Fetches one full deliverable, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the clearinghouse cannot be read.
    fn get_clearinghouse_full(&self, id: &DeliverableId)
    -> Result<Option<DeliverableFull>, LoadError>;
}

/// Loader for the fleet and region-id directories.
pub trait FleetLoader {
    /// Lists fleet environments matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the fleet directory cannot be read.
    fn list_fleet_environments(
        &self,
        pattern: &NamePattern,
    ) -> Result<Vec<FleetEnvironment>, LoadError>;

    /// Lists region-id entries matching the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the region directory cannot be read.
    fn list_region_ids(&self, pattern: &NamePattern) -> Result<Vec<RegionId>, LoadError>;
}

/// Loader for the optional pricing cache.
pub trait PricingLoader {
    /// Returns the pricing cache, rebuilding it first when `refresh` is set.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the cache cannot be read or rebuilt.
    fn pricing_cache(&self, refresh: bool) -> Result<Option<PricingCache>, LoadError>;
}

/// Every loader the merge engine reads from.
pub trait SourceDirectory:
    PriorLoader
    + CatalogLoader
    + IncidentLoader
    + ScorecardLoader
    + IdentityLoader
    + MaturityLoader
    + ClearingHouseLoader
    + FleetLoader
    + PricingLoader
{
}

impl<T> SourceDirectory for T where
    T: PriorLoader
        + CatalogLoader
        + IncidentLoader
        + ScorecardLoader
        + IdentityLoader
        + MaturityLoader
        + ClearingHouseLoader
        + FleetLoader
        + PricingLoader
{
}

// ============================================================================
// SECTION: Monitoring
// ============================================================================

/// Optional collaborator supplying monitor names per service.
pub trait MonitoringSource {
    /// Returns monitor names for a canonical service name.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when monitoring data cannot be read.
    fn monitors_for(&self, reference_resource_name: &str) -> Result<Vec<String>, LoadError>;
}
