// crates/ossmerge-core/src/runtime/merge.rs
// ============================================================================
// Module: Attribute Merge
// Description: Precedence-driven merge of one attribute across sources.
// Purpose: Pick one value per attribute and log every omission and mismatch.
// Dependencies: crate::core, crate::runtime::context, thiserror
// ============================================================================

//! ## Overview
//! [`AttributeMerge`] combines typed candidates for one attribute. Candidates
//! are walked in declaration order: the first non-zero value wins, zero values
//! raise "missing from" issues and later disagreeing values raise "different
//! value" issues. The prior canonical value closes the candidate list and only
//! contributes when no directory source of this run could.
//!
//! This is the only place where source-kind semantics live; mergers supply
//! candidates and read back one value.
//!
//! Security posture: candidate lists are built by mergers, never from input
//! data; malformed lists are programming errors and fail with
//! [`AttributeError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::debug;

use crate::core::ClientExperience;
use crate::core::EntryType;
use crate::core::EnvironmentStatus;
use crate::core::EnvironmentType;
use crate::core::EscalationType;
use crate::core::IssueTag;
use crate::core::OnboardingPhase;
use crate::core::OperationalStatus;
use crate::core::Person;
use crate::core::SegmentId;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::Taxonomy;
use crate::core::TribeId;
use crate::core::ValidationIssue;
use crate::core::ValidationLog;
use crate::runtime::context::MergeContext;

// ============================================================================
// SECTION: Merge Values
// ============================================================================

/// Value type an attribute merge can operate on.
pub trait MergeValue: Clone + PartialEq + Default {
    /// Booleans have no distinguishable zero value.
    const IS_BOOL: bool = false;

    /// Returns true when the value is the zero value of its type.
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Renders the value for issue details.
    fn describe(&self) -> String;
}

impl MergeValue for String {
    fn describe(&self) -> String {
        format!("\"{self}\"")
    }
}

impl MergeValue for bool {
    const IS_BOOL: bool = true;

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl MergeValue for u64 {
    fn describe(&self) -> String {
        self.to_string()
    }
}

impl MergeValue for Vec<String> {
    fn describe(&self) -> String {
        format!("[{}]", self.join(", "))
    }
}

impl MergeValue for Person {
    fn describe(&self) -> String {
        format!("\"{self}\"")
    }
}

impl MergeValue for Taxonomy {
    fn describe(&self) -> String {
        format!("\"{self}\"")
    }
}

impl MergeValue for SegmentId {
    fn describe(&self) -> String {
        format!("\"{self}\"")
    }
}

impl MergeValue for TribeId {
    fn describe(&self) -> String {
        format!("\"{self}\"")
    }
}

impl MergeValue for EntryType {
    fn describe(&self) -> String {
        self.as_str().to_string()
    }
}

impl MergeValue for OperationalStatus {
    fn describe(&self) -> String {
        self.as_str().to_string()
    }
}

impl MergeValue for EnvironmentType {
    fn describe(&self) -> String {
        self.as_str().to_string()
    }
}

impl MergeValue for EnvironmentStatus {
    fn describe(&self) -> String {
        self.as_str().to_string()
    }
}

impl MergeValue for ClientExperience {
    fn describe(&self) -> String {
        self.as_str().to_string()
    }
}

impl MergeValue for EscalationType {
    fn describe(&self) -> String {
        self.as_str().to_string()
    }
}

impl MergeValue for OnboardingPhase {
    fn describe(&self) -> String {
        self.as_str().to_string()
    }
}

// ============================================================================
// SECTION: Onboarded Precedence
// ============================================================================

/// Attributes for which the maturity-manager operations tab wins once the
/// entity is onboarded, regardless of candidate order at the call site.
pub const ONBOARDED_WINS: &[&str] = &[
    "DisplayName",
    "EntryType",
    "OperationalStatus",
    "FutureOperationalStatus",
    "ParentResourceName",
];

/// Returns true when the operations tab wins for the attribute.
#[must_use]
pub fn onboarded_wins(attribute: &str) -> bool {
    ONBOARDED_WINS.contains(&attribute)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Malformed attribute-merge calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// No prior canonical candidate was supplied.
    #[error("merge of {attribute} has no prior canonical candidate")]
    MissingPrior {
        /// Attribute name.
        attribute: String,
    },
    /// More than one prior canonical candidate was supplied.
    #[error("merge of {attribute} has more than one prior canonical candidate")]
    DuplicatePrior {
        /// Attribute name.
        attribute: String,
    },
    /// No candidate other than the prior canonical was supplied.
    #[error("merge of {attribute} has no candidate besides the prior canonical")]
    NoCandidates {
        /// Attribute name.
        attribute: String,
    },
    /// A candidate was supplied after the prior canonical.
    #[error("merge of {attribute} has candidate {source_kind} after the prior canonical")]
    CandidateAfterPrior {
        /// Attribute name.
        attribute: String,
        /// Offending candidate source.
        source_kind: SourceKind,
    },
    /// The prior canonical was supplied as an ordinary candidate.
    #[error("merge of {attribute} passes the prior canonical as an ordinary candidate")]
    PriorAsCandidate {
        /// Attribute name.
        attribute: String,
    },
}

// ============================================================================
// SECTION: Attribute Merge
// ============================================================================

/// One candidate value.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    /// Source of the value.
    pub source: SourceKind,
    /// Value, or `None` when the source has no record for this entity.
    pub value: Option<T>,
}

/// Severity and tags applied to one class of issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IssuePolicy {
    /// Severity of the issue.
    severity: Severity,
    /// Tags of the issue.
    tags: &'static [IssueTag],
}

/// Outcome of an attribute merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    /// Chosen value, or the zero value when nothing was chosen.
    pub value: T,
    /// Source of the chosen value.
    pub source: Option<SourceKind>,
}

/// Builder for one attribute merge.
///
/// # Invariants
/// - Exactly one prior canonical candidate, supplied last.
/// - At least one other candidate.
#[derive(Debug, Clone)]
pub struct AttributeMerge<T> {
    /// Attribute name used in issue titles.
    attribute: String,
    /// Policy for missing values.
    if_missing: IssuePolicy,
    /// Policy for mismatching values.
    if_mismatch: IssuePolicy,
    /// Ordinary candidates in declaration order.
    candidates: Vec<Candidate<T>>,
    /// Prior canonical value.
    prior: Option<T>,
    /// Number of prior candidates supplied.
    prior_count: usize,
    /// First construction error, reported on resolve.
    error: Option<AttributeError>,
}

impl<T: MergeValue> AttributeMerge<T> {
    /// Starts a merge for an attribute.
    #[must_use]
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            if_missing: IssuePolicy { severity: Severity::Warning, tags: &[] },
            if_mismatch: IssuePolicy { severity: Severity::Warning, tags: &[] },
            candidates: Vec::new(),
            prior: None,
            prior_count: 0,
            error: None,
        }
    }

    /// Sets severity and tags of missing-value issues.
    #[must_use]
    pub const fn if_missing(mut self, severity: Severity, tags: &'static [IssueTag]) -> Self {
        self.if_missing = IssuePolicy { severity, tags };
        self
    }

    /// Sets severity and tags of mismatch issues.
    #[must_use]
    pub const fn if_mismatch(mut self, severity: Severity, tags: &'static [IssueTag]) -> Self {
        self.if_mismatch = IssuePolicy { severity, tags };
        self
    }

    /// Adds a candidate; `None` means the source has no record for this entity.
    #[must_use]
    pub fn candidate(mut self, source: SourceKind, value: Option<T>) -> Self {
        if self.error.is_none() {
            if source == SourceKind::PriorOss {
                self.error = Some(AttributeError::PriorAsCandidate { attribute: self.attribute.clone() });
            } else if self.prior_count > 0 {
                self.error = Some(AttributeError::CandidateAfterPrior {
                    attribute: self.attribute.clone(),
                    source_kind: source.clone(),
                });
            }
        }
        self.candidates.push(Candidate { source, value });
        self
    }

    /// Adds a candidate from a record that is known to exist.
    #[must_use]
    pub fn value(self, source: SourceKind, value: T) -> Self {
        self.candidate(source, Some(value))
    }

    /// Adds the prior canonical value; `None` when there is no prior record.
    #[must_use]
    pub fn prior(mut self, value: Option<T>) -> Self {
        self.prior_count += 1;
        self.prior = value;
        self
    }

    /// Resolves the merge, logging issues and returning the chosen value.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when the candidate list is malformed.
    pub fn resolve(self, ctx: &MergeContext, log: &mut ValidationLog) -> Result<T, AttributeError> {
        self.resolve_sourced(ctx, log).map(|resolved| resolved.value)
    }

    /// Resolves the merge and also reports which source supplied the value.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when the candidate list is malformed.
    pub fn resolve_sourced(
        mut self,
        ctx: &MergeContext,
        log: &mut ValidationLog,
    ) -> Result<Resolved<T>, AttributeError> {
        self.check_shape()?;
        if ctx.onboarded && onboarded_wins(&self.attribute) {
            self.candidates.sort_by_key(|candidate| candidate.source != SourceKind::RmcOss);
        }
        let Self { attribute, if_missing, if_mismatch, candidates, prior, .. } = self;

        let any_directory_loaded = candidates
            .iter()
            .any(|candidate| candidate.source.is_directory() && ctx.loaded.is_loaded(&candidate.source));

        let mut chosen: Option<(T, SourceKind)> = None;
        let mut pending_missing: Vec<ValidationIssue> = Vec::new();
        let mut examined = false;
        let mut prior_used = false;

        for candidate in candidates {
            let (source, value) = if ctx.loaded.is_loaded(&candidate.source) {
                (candidate.source, candidate.value)
            } else if candidate.source == SourceKind::RmcOss && ctx.onboarded && !prior_used {
                // Onboarded but not re-fetched: the prior value stands in for the tab.
                prior_used = true;
                (SourceKind::PriorOss, prior.clone())
            } else {
                debug!(
                    attribute = %attribute,
                    source = %candidate.source,
                    "candidate from unloaded source discarded"
                );
                continue;
            };
            let Some(value) = value else {
                continue;
            };
            examined = true;
            if !T::IS_BOOL && value.is_zero() {
                pending_missing.push(
                    ValidationIssue::new(
                        if_missing.severity,
                        if_missing.tags,
                        format!("{attribute}: missing from {source}"),
                        String::new(),
                    )
                    .with_source(source),
                );
                continue;
            }
            match &chosen {
                None => {
                    if source.is_override() {
                        log.add_sourced(
                            Severity::Minor,
                            if_mismatch.tags,
                            source.clone(),
                            format!("{attribute}: overridden by control record"),
                            format!("{source}={}", value.describe()),
                        );
                    }
                    chosen = Some((value, source));
                }
                Some((current, current_source)) if *current != value => {
                    log.add_sourced(
                        if_mismatch.severity,
                        if_mismatch.tags,
                        source.clone(),
                        format!("{attribute}: different value in {source} (first source prevails)"),
                        format!(
                            "{source}={} {current_source}={}",
                            value.describe(),
                            current.describe()
                        ),
                    );
                }
                Some(_) => {}
            }
        }

        if chosen.is_none() && !any_directory_loaded && !prior_used {
            if let Some(value) = prior.filter(|value| T::IS_BOOL || !value.is_zero()) {
                log.add_sourced(
                    Severity::Info,
                    &[IssueTag::RunAction],
                    SourceKind::PriorOss,
                    format!("{attribute}: copying from prior run"),
                    "no source of this run provides the attribute".to_string(),
                );
                chosen = Some((value, SourceKind::PriorOss));
                examined = true;
            }
        }

        match chosen {
            Some((value, source)) => {
                for issue in pending_missing {
                    log.push(issue);
                }
                Ok(Resolved { value, source: Some(source) })
            }
            None => {
                if examined {
                    log.add(
                        if_missing.severity,
                        if_missing.tags,
                        format!("{attribute}: not set from any source"),
                        String::new(),
                    );
                } else {
                    log.add(
                        Severity::Ignore,
                        if_missing.tags,
                        format!("{attribute}: no source record contains this attribute"),
                        String::new(),
                    );
                }
                Ok(Resolved { value: T::default(), source: None })
            }
        }
    }

    /// Checks the candidate-list invariants.
    fn check_shape(&mut self) -> Result<(), AttributeError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        if self.prior_count == 0 {
            return Err(AttributeError::MissingPrior { attribute: self.attribute.clone() });
        }
        if self.prior_count > 1 {
            return Err(AttributeError::DuplicatePrior { attribute: self.attribute.clone() });
        }
        if self.candidates.is_empty() {
            return Err(AttributeError::NoCandidates { attribute: self.attribute.clone() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;
    use crate::runtime::context::LoadedSources;

    fn ctx() -> MergeContext {
        MergeContext::new(LoadedSources::all(), false)
    }

    #[test]
    fn onboarded_tab_moves_to_front() {
        let mut log = ValidationLog::new("svc");
        let ctx = MergeContext::new(LoadedSources::all(), true);
        let value = AttributeMerge::new("DisplayName")
            .value(SourceKind::Catalog, "Catalog Name".to_string())
            .value(SourceKind::RmcOss, "Tab Name".to_string())
            .prior(None)
            .resolve(&ctx, &mut log)
            .unwrap();
        assert_eq!(value, "Tab Name");
        assert!(log.find("different value in Catalog").next().is_some());
    }

    #[test]
    fn false_counts_as_set() {
        let mut log = ValidationLog::new("svc");
        let value = AttributeMerge::new("ClientFacing")
            .value(SourceKind::ServiceNow, false)
            .value(SourceKind::Catalog, true)
            .prior(Some(true))
            .resolve(&ctx(), &mut log)
            .unwrap();
        assert!(!value);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn prior_as_candidate_is_rejected() {
        let mut log = ValidationLog::new("svc");
        let err = AttributeMerge::<String>::new("X")
            .value(SourceKind::PriorOss, "p".to_string())
            .prior(None)
            .resolve(&ctx(), &mut log)
            .unwrap_err();
        assert!(matches!(err, AttributeError::PriorAsCandidate { .. }));
    }
}
