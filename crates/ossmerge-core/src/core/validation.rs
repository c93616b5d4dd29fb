// crates/ossmerge-core/src/core/validation.rs
// ============================================================================
// Module: Validation Log
// Description: Per-entity append-only issue log with summaries and checksum.
// Purpose: Record every discrepancy found while merging one entity.
// Dependencies: crate::core::{hashing, run_actions, sources}, serde, smallvec
// ============================================================================

//! ## Overview
//! Every canonical record carries a [`ValidationLog`]. Issues are appended by
//! the mergers and never removed; an issue with the same severity, title and
//! details as an existing one is counted but not stored twice. The log derives
//! two red/yellow/green summaries (CRN status and overall status), tracks the
//! names each source used for this entity, records how each run action was
//! applied, and exposes a checksum over its canonical JSON form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::core::hashing::Checksum;
use crate::core::hashing::HashError;
use crate::core::hashing::checksum_of;
use crate::core::run_actions::RunAction;
use crate::core::run_actions::RunActionOutcome;
use crate::core::sources::SourceKind;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Issue severity, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Recorded for completeness; does not affect any status.
    Ignore,
    /// Informational note.
    Info,
    /// Minor discrepancy.
    Minor,
    /// Would be severe, but an override tag suppresses it.
    Deferred,
    /// Discrepancy that needs attention.
    Warning,
    /// Discrepancy that makes the attribute unreliable.
    Severe,
    /// The record should not be relied on.
    Critical,
}

impl Severity {
    /// Returns the stable label of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Info => "info",
            Self::Minor => "minor",
            Self::Deferred => "deferred",
            Self::Warning => "warning",
            Self::Severe => "severe",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Issue Tags
// ============================================================================

/// Topic tag attached to an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueTag {
    /// Affects the CRN status summary.
    Crn,
    /// Ownership attributes.
    Ownership,
    /// Support attributes.
    Support,
    /// Operations attributes.
    Operations,
    /// Compliance attributes.
    Compliance,
    /// Status-page attributes.
    StatusPage,
    /// Catalog attributes.
    CatalogInfo,
    /// Product information.
    ProductInfo,
    /// Dependency information.
    Dependencies,
    /// Tag set handling.
    Tags,
    /// PnP enablement.
    Pnp,
    /// Expired tags.
    Expired,
    /// Run-action fallbacks.
    RunAction,
    /// Clearinghouse bindings.
    ClearingHouse,
    /// Environment attributes.
    Environment,
    /// Segment attributes.
    Segment,
    /// Tribe attributes.
    Tribe,
    /// Raw source data problems.
    Data,
    /// Incident-system enrollment.
    ServiceNow,
    /// Scorecard enrollment.
    Scorecard,
    /// Identity-service enrollment.
    Identity,
    /// Maturity-manager enrollment.
    Rmc,
    /// Duplicate-entry handling.
    Duplicate,
    /// Monitoring information.
    Monitoring,
    /// Name derivation and folding.
    Naming,
}

/// Tag list of one issue.
pub type IssueTags = SmallVec<[IssueTag; 2]>;

// ============================================================================
// SECTION: Issues
// ============================================================================

/// One validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Issue severity.
    pub severity: Severity,
    /// Short title, stable across runs.
    pub title: String,
    /// Freeform details.
    pub details: String,
    /// Topic tags.
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub tags: IssueTags,
    /// Source the issue is about, when it concerns one source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceKind>,
}

impl ValidationIssue {
    /// Builds an issue without a source.
    #[must_use]
    pub fn new(
        severity: Severity,
        tags: &[IssueTag],
        title: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            title: title.into(),
            details: details.into(),
            tags: tags.iter().copied().collect(),
            source: None,
        }
    }

    /// Attaches the source kind to the issue.
    #[must_use]
    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns true when the issue carries the tag.
    #[must_use]
    pub fn has_tag(&self, tag: IssueTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Returns true when both issues are duplicates of each other.
    fn same_key(&self, other: &Self) -> bool {
        self.severity == other.severity && self.title == other.title && self.details == other.details
    }
}

// ============================================================================
// SECTION: Source Names
// ============================================================================

/// Named source slot tracked by the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceNameKind {
    /// Catalog record in use.
    Catalog,
    /// Catalog record ignored by visibility policy.
    CatalogIgnored,
    /// Identity-service record in use.
    Identity,
    /// Identity-service record that is disabled.
    IdentityDisabled,
    /// Incident-system record in use.
    ServiceNow,
    /// Incident-system record that is retired.
    ServiceNowRetired,
    /// Scorecard record in use.
    Scorecard,
    /// Scorecard record present while scorecard fetching is disabled.
    ScorecardDisabled,
    /// Prior canonical record.
    PriorOss,
    /// Maturity-manager record.
    Rmc,
}

// ============================================================================
// SECTION: Status Summaries
// ============================================================================

/// Red/yellow/green summary status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RagStatus {
    /// Nothing worse than deferred.
    #[default]
    Green,
    /// Worst issue is a warning.
    Yellow,
    /// Worst issue is severe or critical.
    Red,
}

impl RagStatus {
    /// Maps a worst severity to a status.
    #[must_use]
    pub const fn from_worst(worst: Option<Severity>) -> Self {
        match worst {
            Some(Severity::Warning) => Self::Yellow,
            Some(Severity::Severe | Severity::Critical) => Self::Red,
            _ => Self::Green,
        }
    }

    /// Returns the stable label of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for RagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Validation Log
// ============================================================================

/// Append-only issue log of one entity.
///
/// # Invariants
/// - No two stored issues share (severity, title, details).
/// - Issues are never removed; duplicates increment `suppressed_duplicates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLog {
    /// Canonical name of the entity, used to match logs across runs.
    pub canonical_name: String,
    /// Stored issues.
    issues: Vec<ValidationIssue>,
    /// Names each source used for this entity.
    source_names: BTreeMap<SourceNameKind, BTreeSet<String>>,
    /// How each run action was applied.
    run_actions: BTreeMap<RunAction, RunActionOutcome>,
    /// Number of duplicate issues that were not stored again.
    suppressed_duplicates: u64,
}

impl ValidationLog {
    /// Creates an empty log for an entity.
    #[must_use]
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self { canonical_name: canonical_name.into(), ..Self::default() }
    }

    /// Appends an issue unless an identical one is already stored.
    ///
    /// Returns true when the issue was stored.
    pub fn push(&mut self, issue: ValidationIssue) -> bool {
        if self.issues.iter().any(|existing| existing.same_key(&issue)) {
            self.suppressed_duplicates += 1;
            return false;
        }
        self.issues.push(issue);
        true
    }

    /// Appends an issue built from its parts.
    pub fn add(
        &mut self,
        severity: Severity,
        tags: &[IssueTag],
        title: impl Into<String>,
        details: impl Into<String>,
    ) -> bool {
        self.push(ValidationIssue::new(severity, tags, title, details))
    }

    /// Appends an issue about one source.
    pub fn add_sourced(
        &mut self,
        severity: Severity,
        tags: &[IssueTag],
        source: SourceKind,
        title: impl Into<String>,
        details: impl Into<String>,
    ) -> bool {
        self.push(ValidationIssue::new(severity, tags, title, details).with_source(source))
    }

    /// Returns stored issues in insertion (or sorted) order.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Returns the number of stored issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns true when no issue is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns the number of suppressed duplicates.
    #[must_use]
    pub const fn suppressed_duplicates(&self) -> u64 {
        self.suppressed_duplicates
    }

    /// Returns true when an issue with the exact title is stored.
    #[must_use]
    pub fn has_title(&self, title: &str) -> bool {
        self.issues.iter().any(|issue| issue.title == title)
    }

    /// Returns issues whose title contains the fragment.
    pub fn find<'a>(&'a self, fragment: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues.iter().filter(move |issue| issue.title.contains(fragment))
    }

    /// Returns the number of stored issues at a severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|issue| issue.severity == severity).count()
    }

    /// Returns the worst severity above ignore.
    #[must_use]
    pub fn worst(&self) -> Option<Severity> {
        self.issues
            .iter()
            .map(|issue| issue.severity)
            .filter(|severity| *severity > Severity::Ignore)
            .max()
    }

    /// Returns the worst severity among issues carrying the tag.
    #[must_use]
    pub fn worst_tagged(&self, tag: IssueTag) -> Option<Severity> {
        self.issues
            .iter()
            .filter(|issue| issue.has_tag(tag))
            .map(|issue| issue.severity)
            .filter(|severity| *severity > Severity::Ignore)
            .max()
    }

    /// Returns the CRN status summary.
    #[must_use]
    pub fn crn_status(&self) -> RagStatus {
        RagStatus::from_worst(self.worst_tagged(IssueTag::Crn))
    }

    /// Returns the overall status summary.
    #[must_use]
    pub fn overall_status(&self) -> RagStatus {
        RagStatus::from_worst(self.worst())
    }

    /// Records a name used by one source for this entity.
    pub fn record_source(&mut self, kind: SourceNameKind, name: impl Into<String>) {
        let name = name.into();
        if name.is_empty() {
            return;
        }
        self.source_names.entry(kind).or_default().insert(name);
    }

    /// Returns names recorded for one source.
    #[must_use]
    pub fn source_names(&self, kind: SourceNameKind) -> Option<&BTreeSet<String>> {
        self.source_names.get(&kind)
    }

    /// Records how a run action was applied.
    pub fn record_run_action(&mut self, action: RunAction, outcome: RunActionOutcome) {
        self.run_actions.insert(action, outcome);
    }

    /// Returns how a run action was applied, if recorded.
    #[must_use]
    pub fn run_action(&self, action: RunAction) -> Option<RunActionOutcome> {
        self.run_actions.get(&action).copied()
    }

    /// Appends every issue of another log.
    pub fn absorb(&mut self, other: &Self) {
        for issue in &other.issues {
            self.push(issue.clone());
        }
    }

    /// Sorts issues by descending severity, then title, then details.
    pub fn sort(&mut self) {
        self.issues.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.details.cmp(&b.details))
        });
    }

    /// Computes the checksum of the log content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonical serialization fails.
    pub fn checksum(&self) -> Result<Checksum, HashError> {
        checksum_of(self)
    }
}
