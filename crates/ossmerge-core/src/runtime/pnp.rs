// crates/ossmerge-core/src/runtime/pnp.rs
// ============================================================================
// Module: PnP Enablement
// Description: Multi-criteria gating of the pnp-enabled tag.
// Purpose: Decide, per service, whether status notifications are published.
// Dependencies: crate::core, crate::runtime::registry, tracing
// ============================================================================

//! ## Overview
//! Criteria fall into three classes. Basic criteria can only be overridden
//! by the `pnp-include` tag; non-overridable criteria can never be; the
//! overridable criteria apply to standalone entries only. The decision itself
//! is a pure function of the selection tag and the violation lists, so the
//! matrix can be tested without a registry.
//!
//! Parent enablement is evaluated recursively. An entry reached again while
//! its own evaluation is in progress closes a cycle: the cycle is logged as
//! critical and the entry is reported disabled to its child.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;

use crate::core::EntryType;
use crate::core::IssueTag;
use crate::core::OperationalStatus;
use crate::core::RagStatus;
use crate::core::Severity;
use crate::core::Tag;
use crate::runtime::registry::Enablement;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceEntry;
use crate::runtime::registry::ServiceIdx;

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Entry types eligible for PnP.
const ELIGIBLE_TYPES: [EntryType; 9] = [
    EntryType::Service,
    EntryType::Runtime,
    EntryType::Template,
    EntryType::Iaas,
    EntryType::PlatformComponent,
    EntryType::SubComponent,
    EntryType::SuperComponent,
    EntryType::Consulting,
    EntryType::Content,
];

/// Operational statuses eligible for PnP.
const ELIGIBLE_STATUSES: [OperationalStatus; 4] = [
    OperationalStatus::Ga,
    OperationalStatus::Beta,
    OperationalStatus::Deprecated,
    OperationalStatus::Community,
];

/// PnP selection tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnpTag {
    /// `pnp-candidate`.
    Candidate,
    /// `pnp-include`.
    Include,
    /// `pnp-exclude`.
    Exclude,
}

/// Criteria violations of one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PnpInputs {
    /// Selection tags present on the entry.
    pub selection: Vec<PnpTag>,
    /// Basic criteria violations.
    pub basic: Vec<String>,
    /// Non-overridable criteria violations.
    pub non_overridable: Vec<String>,
    /// Overridable criteria violations.
    pub overridable: Vec<String>,
}

impl PnpInputs {
    /// Returns true when no criterion is violated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.basic.is_empty() && self.non_overridable.is_empty() && self.overridable.is_empty()
    }

    /// Renders every violation for issue details.
    #[must_use]
    pub fn describe(&self) -> String {
        self.basic
            .iter()
            .chain(&self.non_overridable)
            .chain(&self.overridable)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Collects the criteria of a service.
    ///
    /// `parent_violation` is the outcome of the recursive parent check.
    #[must_use]
    pub fn collect(entry: &ServiceEntry, parent_violation: Option<String>) -> Self {
        let record = &entry.record;
        let tags = &record.general.oss_tags;
        let mut inputs = Self::default();

        for (tag, selection) in
            [(Tag::PnpCandidate, PnpTag::Candidate), (Tag::PnpInclude, PnpTag::Include), (Tag::PnpExclude, PnpTag::Exclude)]
        {
            if tags.contains(tag) {
                inputs.selection.push(selection);
            }
        }

        let entry_type = record.general.entry_type;
        if !ELIGIBLE_TYPES.contains(&entry_type) {
            inputs.basic.push(format!("entry type {entry_type} is not eligible"));
        }
        let status = record.general.operational_status;
        if !ELIGIBLE_STATUSES.contains(&status) {
            inputs.basic.push(format!("operational status {status} is not eligible"));
        }

        if !entry.has_live_service_now() && !tags.contains(Tag::OssOnly) {
            inputs.non_overridable.push("no active ServiceNow record".to_string());
        }
        if record.status_page.category_id.is_empty() {
            inputs.non_overridable.push("no status page category id".to_string());
        }
        if entry.category_inconsistent {
            inputs.non_overridable.push("status page category parent is inconsistent".to_string());
        }
        inputs.non_overridable.extend(parent_violation);

        let parent = &record.general.parent_resource_name;
        let standalone = parent.is_empty() || *parent == record.reference_resource_name;
        if standalone {
            if !record.general.client_facing && !tags.contains(Tag::PnpEnabledIaas) {
                inputs.overridable.push("not client facing".to_string());
            }
            if !record.compliance.service_now_onboarded {
                inputs.overridable.push("not onboarded in ServiceNow".to_string());
            }
            let prior_enabled =
                entry.prior.as_ref().is_some_and(|prior| prior.general.oss_tags.contains(Tag::PnpEnabled));
            match entry.validation.crn_status() {
                RagStatus::Green => {}
                RagStatus::Yellow if prior_enabled => {}
                crn => inputs.overridable.push(format!("CRN status is {}", crn.as_str())),
            }
        }
        inputs
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of the decision matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnpDecision {
    /// Whether the entry is enabled.
    pub enabled: bool,
    /// Issue to log, if any.
    pub issue: Option<(Severity, &'static str)>,
}

impl PnpDecision {
    /// Builds a decision.
    const fn new(enabled: bool, issue: Option<(Severity, &'static str)>) -> Self {
        Self { enabled, issue }
    }

    /// Returns the enablement state of the decision.
    #[must_use]
    pub const fn enablement(self) -> Enablement {
        if self.enabled { Enablement::Enabled } else { Enablement::Disabled }
    }
}

/// Applies the decision matrix.
#[must_use]
pub fn decide(inputs: &PnpInputs) -> PnpDecision {
    if inputs.selection.len() > 1 {
        return PnpDecision::new(false, Some((Severity::Critical, "more than one PnP selection tag")));
    }
    let clean = inputs.is_clean();
    match inputs.selection.first() {
        Some(PnpTag::Candidate) if clean => {
            PnpDecision::new(true, Some((Severity::Info, "PnP enabled with unnecessary candidate tag")))
        }
        Some(PnpTag::Candidate) => PnpDecision::new(false, Some((Severity::Info, "PnP not enabled but candidate"))),
        Some(PnpTag::Include) if !inputs.non_overridable.is_empty() => {
            PnpDecision::new(false, Some((Severity::Warning, "PnP not enabled despite include tag")))
        }
        Some(PnpTag::Include) if clean => {
            PnpDecision::new(true, Some((Severity::Info, "PnP enabled with unnecessary include tag")))
        }
        Some(PnpTag::Include) => PnpDecision::new(true, Some((Severity::Info, "PnP included despite issues"))),
        Some(PnpTag::Exclude) if clean => {
            PnpDecision::new(false, Some((Severity::Info, "PnP not enabled with unnecessary exclude tag")))
        }
        Some(PnpTag::Exclude) => PnpDecision::new(false, None),
        None => PnpDecision::new(clean, None),
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates the enablement of a service and records it on the entry.
///
/// Entries copied from the prior run keep the prior tag.
pub fn evaluate_pnp(registry: &mut Registry, idx: ServiceIdx) -> Enablement {
    let entry = registry.service(idx);
    match entry.pnp {
        Enablement::Enabled | Enablement::Disabled => return entry.pnp,
        Enablement::Checking => {
            registry.service_mut(idx).validation.add(
                Severity::Critical,
                &[IssueTag::Pnp],
                "PnP parent chain contains a cycle",
                "",
            );
            return Enablement::Disabled;
        }
        Enablement::Unknown => {}
    }
    if !entry.is_active() {
        return Enablement::Disabled;
    }
    if entry.copied_from_prior {
        let state = if entry.record.general.oss_tags.contains(Tag::PnpEnabled) {
            Enablement::Enabled
        } else {
            Enablement::Disabled
        };
        registry.service_mut(idx).pnp = state;
        return state;
    }

    registry.service_mut(idx).pnp = Enablement::Checking;
    let parent_violation = check_parent(registry, idx);
    let inputs = PnpInputs::collect(registry.service(idx), parent_violation);
    let decision = decide(&inputs);

    let entry = registry.service_mut(idx);
    if let Some((severity, title)) = decision.issue {
        entry.validation.add(severity, &[IssueTag::Pnp], title, inputs.describe());
    }
    if decision.enabled {
        entry.record.general.oss_tags.insert(Tag::PnpEnabled);
    } else {
        entry.record.general.oss_tags.remove(Tag::PnpEnabled);
    }
    // A cycle may already have recorded a critical issue against this entry.
    entry.pnp = decision.enablement();
    debug!(service = %entry.name(), enabled = decision.enabled, "pnp evaluated");
    entry.pnp
}

/// Evaluates the parent, returning a violation when it is not enabled.
fn check_parent(registry: &mut Registry, idx: ServiceIdx) -> Option<String> {
    let entry = registry.service(idx);
    let parent = entry.record.general.parent_resource_name.clone();
    if parent.is_empty() || parent == entry.record.reference_resource_name {
        return None;
    }
    let Some(parent_idx) = registry.service_by_name(&parent) else {
        return Some(format!("parent {parent} not found"));
    };
    if parent_idx == idx {
        return None;
    }
    match evaluate_pnp(registry, parent_idx) {
        Enablement::Enabled => None,
        _ => Some(format!("parent {parent} is not PnP enabled")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(selection: &[PnpTag]) -> PnpInputs {
        PnpInputs { selection: selection.to_vec(), ..PnpInputs::default() }
    }

    #[test]
    fn conflicting_selection_tags_disable() {
        let decision = decide(&inputs(&[PnpTag::Candidate, PnpTag::Include]));
        assert!(!decision.enabled);
        assert_eq!(decision.issue.map(|(severity, _)| severity), Some(Severity::Critical));
    }

    #[test]
    fn include_overrides_basic_but_not_non_overridable() {
        let mut basic = inputs(&[PnpTag::Include]);
        basic.basic.push("entry type internal is not eligible".to_string());
        assert!(decide(&basic).enabled);

        let mut blocked = inputs(&[PnpTag::Include]);
        blocked.non_overridable.push("no status page category id".to_string());
        assert!(!decide(&blocked).enabled);
    }

    #[test]
    fn untagged_entry_follows_violations() {
        assert!(decide(&inputs(&[])).enabled);
        let mut violated = inputs(&[]);
        violated.overridable.push("not client facing".to_string());
        assert!(!decide(&violated).enabled);
        assert_eq!(decide(&violated).issue, None);
    }

    #[test]
    fn exclude_without_violations_is_noted() {
        let decision = decide(&inputs(&[PnpTag::Exclude]));
        assert!(!decision.enabled);
        assert!(decision.issue.is_some_and(|(_, title)| title.contains("unnecessary exclude")));
    }
}
