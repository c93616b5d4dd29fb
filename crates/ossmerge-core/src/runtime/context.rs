// crates/ossmerge-core/src/runtime/context.rs
// ============================================================================
// Module: Merge Context
// Description: Run configuration and per-run source availability.
// Purpose: Give every merger the same read-only view of the run settings.
// Dependencies: crate::core, crate::interfaces, time
// ============================================================================

//! ## Overview
//! [`MergeConfig`] is the complete, validated configuration of one run.
//! [`LoadedSources`] records which directories actually produced data in this
//! run; the attribute merger uses it to discard candidates from sources that
//! were not fetched and to decide when the prior canonical value applies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;

use crate::core::DoNotMergeNames;
use crate::core::PartsTable;
use crate::core::PricingCache;
use crate::core::RunAction;
use crate::core::RunActions;
use crate::core::SourceKind;
use crate::interfaces::MonitoringSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Custom source name of the fleet directory.
pub const DOCTOR_SOURCE: &str = "Doctor";

/// Custom source name of the region-id directory.
pub const REGION_ID_SOURCE: &str = "RegionID";

/// Deliverable-name fragments identifying non-cloud offerings.
pub const DEFAULT_DELIVERABLE_BLACKLIST: [&str; 2] = ["for Marketplace", "on AWS"];

/// Canonical name of the cloud platform record.
pub const DEFAULT_CLOUD_PLATFORM_NAME: &str = "cloud-platform";

// ============================================================================
// SECTION: Merge Configuration
// ============================================================================

/// Configuration of one merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// Enabled run actions.
    pub actions: RunActions,
    /// Glob pattern restricting loaded names.
    pub pattern: String,
    /// Reference date for tag expiry.
    pub reference_date: Date,
    /// Names that bypass folding.
    pub do_not_merge: DoNotMergeNames,
    /// Deliverable-name fragments excluded from name groups.
    pub deliverable_blacklist: Vec<String>,
    /// Canonical name of the cloud platform record.
    pub cloud_platform_name: String,
    /// Expected tier-1 support assignment-group prefixes.
    pub support_tier1_prefixes: Vec<String>,
    /// Expected tier-1 operations assignment-group prefixes.
    pub operations_tier1_prefixes: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            actions: RunActions::standard(),
            pattern: "*".to_string(),
            reference_date: Date::MIN,
            do_not_merge: DoNotMergeNames::default(),
            deliverable_blacklist: DEFAULT_DELIVERABLE_BLACKLIST
                .iter()
                .map(|entry| (*entry).to_string())
                .collect(),
            cloud_platform_name: DEFAULT_CLOUD_PLATFORM_NAME.to_string(),
            support_tier1_prefixes: Vec::new(),
            operations_tier1_prefixes: Vec::new(),
        }
    }
}

impl MergeConfig {
    /// Returns true when the run action is enabled.
    #[must_use]
    pub const fn enabled(&self, action: RunAction) -> bool {
        self.actions.contains(action)
    }

    /// Returns true when a deliverable name matches the non-cloud blacklist.
    #[must_use]
    pub fn is_blacklisted_deliverable(&self, name: &str) -> bool {
        let lowered = name.to_ascii_lowercase();
        self.deliverable_blacklist
            .iter()
            .any(|fragment| !fragment.is_empty() && lowered.contains(&fragment.to_ascii_lowercase()))
    }
}

// ============================================================================
// SECTION: Loaded Sources
// ============================================================================

/// Directories that produced data in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "One independent availability flag per directory."
)]
pub struct LoadedSources {
    /// Catalog loaded.
    pub catalog: bool,
    /// Incident system loaded.
    pub service_now: bool,
    /// Scorecard loaded.
    pub scorecard: bool,
    /// Identity service loaded.
    pub iam: bool,
    /// Maturity manager loaded.
    pub rmc: bool,
    /// Fleet and region directories loaded.
    pub doctor: bool,
    /// Clearinghouse loaded.
    pub clearinghouse: bool,
}

impl LoadedSources {
    /// Returns a set with every directory loaded.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            catalog: true,
            service_now: true,
            scorecard: true,
            iam: true,
            rmc: true,
            doctor: true,
            clearinghouse: true,
        }
    }

    /// Returns true when candidates from the source are valid in this run.
    #[must_use]
    pub fn is_loaded(&self, source: &SourceKind) -> bool {
        match source {
            SourceKind::Catalog => self.catalog,
            SourceKind::ServiceNow => self.service_now,
            SourceKind::ScorecardV1 => self.scorecard,
            SourceKind::Iam => self.iam,
            SourceKind::Rmc | SourceKind::RmcOss => self.rmc,
            SourceKind::Custom(name) if name == DOCTOR_SOURCE || name == REGION_ID_SOURCE => {
                self.doctor
            }
            SourceKind::Custom(_)
            | SourceKind::PriorOss
            | SourceKind::OverrideProperty
            | SourceKind::OverrideTag => true,
        }
    }
}

/// Per-entity view used by the attribute merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeContext {
    /// Directories loaded in this run.
    pub loaded: LoadedSources,
    /// Whether the entity is being edited in the maturity manager.
    pub onboarded: bool,
}

impl MergeContext {
    /// Builds a context.
    #[must_use]
    pub const fn new(loaded: LoadedSources, onboarded: bool) -> Self {
        Self { loaded, onboarded }
    }
}

// ============================================================================
// SECTION: Run Context
// ============================================================================

/// Read-only inputs shared by the mergers during one run.
pub struct RunContext<'a> {
    /// Run configuration.
    pub config: &'a MergeConfig,
    /// Directories loaded in this run.
    pub loaded: LoadedSources,
    /// Parts-input table.
    pub parts: &'a PartsTable,
    /// Pricing cache, when pricing is included.
    pub pricing: Option<&'a PricingCache>,
    /// Monitoring collaborator, when configured.
    pub monitoring: Option<&'a dyn MonitoringSource>,
    /// Directories that failed to load in lenient mode, with their messages.
    pub failed: &'a [(SourceKind, String)],
}

impl RunContext<'_> {
    /// Returns the attribute-merge context of an entity.
    #[must_use]
    pub const fn merge_context(&self, onboarded: bool) -> MergeContext {
        MergeContext::new(self.loaded, onboarded)
    }

    /// Returns true when the run action is enabled.
    #[must_use]
    pub const fn enabled(&self, action: RunAction) -> bool {
        self.config.enabled(action)
    }
}
