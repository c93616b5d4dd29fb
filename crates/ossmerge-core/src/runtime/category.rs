// crates/ossmerge-core/src/runtime/category.rs
// ============================================================================
// Module: Status Category Parent Check
// Description: Cross-entry consistency of status-page category fields.
// Purpose: Detect inconsistent category parents and void them after phase two.
// Dependencies: crate::core, crate::runtime, tracing
// ============================================================================

//! ## Overview
//! Every check in this module reads the category fields as merged in phase
//! one. Inconsistent entries are flagged immediately, but their fields are
//! cleared by deferred actions so that later checks still observe the
//! original values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::debug;

use crate::core::IssueTag;
use crate::core::OnboardingPhase;
use crate::core::Severity;
use crate::runtime::deferred::DeferredActions;
use crate::runtime::registry::Registry;
use crate::runtime::registry::ServiceIdx;

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Category fields of one service, captured before any voiding.
#[derive(Debug, Clone)]
struct CategoryView {
    /// Service index.
    idx: ServiceIdx,
    /// Canonical name.
    name: String,
    /// Status-page category identifier.
    category_id: String,
    /// Status-page category parent.
    category_parent: String,
    /// Whether the service is onboarded in the incident system.
    incident_onboarded: bool,
    /// Whether the entry is being edited in the maturity manager.
    editing: bool,
}

/// Usage of one category identifier.
#[derive(Debug, Default)]
struct CategoryUsage {
    /// Number of services using the identifier.
    count: usize,
    /// Distinct parent values, the empty string standing for "no parent".
    parents: BTreeSet<String>,
}

// ============================================================================
// SECTION: Check
// ============================================================================

/// Checks status-category parents across all active services.
///
/// Returns the number of services whose category fields will be voided.
pub fn check_category_parents(registry: &mut Registry, deferred: &mut DeferredActions) -> usize {
    let views: Vec<CategoryView> = registry
        .service_indices()
        .into_iter()
        .filter_map(|idx| {
            let entry = registry.service(idx);
            (entry.is_active() && !entry.copied_from_prior).then(|| CategoryView {
                idx,
                name: entry.record.reference_resource_name.clone(),
                category_id: entry.record.status_page.category_id.clone(),
                category_parent: entry.record.status_page.category_parent.clone(),
                incident_onboarded: entry.record.compliance.service_now_onboarded,
                editing: entry.record.general.onboarding_phase == OnboardingPhase::Editing,
            })
        })
        .collect();

    let mut usage: BTreeMap<&str, CategoryUsage> = BTreeMap::new();
    for view in views.iter().filter(|view| view.incident_onboarded && !view.category_id.is_empty()) {
        let entry = usage.entry(view.category_id.as_str()).or_default();
        entry.count += 1;
        entry.parents.insert(view.category_parent.clone());
    }

    let mut voided = 0;
    for view in &views {
        let issue = find_issue(registry, &usage, view);
        let Some((title, details, void)) = issue else {
            continue;
        };
        let severity = if void { Severity::Severe } else { Severity::Info };
        let entry = registry.service_mut(view.idx);
        entry.validation.add(severity, &[IssueTag::StatusPage], title, details);
        if void {
            entry.category_inconsistent = true;
            voided += 1;
            let idx = view.idx;
            deferred.push(format!("void status category of {}", view.name), move |registry: &mut Registry| {
                let status_page = &mut registry.service_mut(idx).record.status_page;
                status_page.category_id.clear();
                status_page.category_parent.clear();
            });
        }
    }
    debug!(voided, "status category parents checked");
    voided
}

/// Finds the first inconsistency of one service.
///
/// Returns the issue title, its details and whether the fields are voided.
fn find_issue(
    registry: &Registry,
    usage: &BTreeMap<&str, CategoryUsage>,
    view: &CategoryView,
) -> Option<(&'static str, String, bool)> {
    let id = view.category_id.as_str();
    let parent = view.category_parent.as_str();

    if id.is_empty() {
        if parent.is_empty() {
            return None;
        }
        return Some((
            "StatusPage.CategoryParent is set but StatusPage.CategoryID is blank",
            format!("parent={parent}"),
            !view.editing,
        ));
    }

    let shared = usage.get(id);
    if let Some(shared) = shared.filter(|shared| shared.parents.len() > 1) {
        let parents: Vec<&str> =
            shared.parents.iter().map(|p| if p.is_empty() { "<blank>" } else { p.as_str() }).collect();
        return Some((
            "StatusPage.CategoryID used with more than one Category Parent",
            format!("id={id} parents={}", parents.join(", ")),
            true,
        ));
    }

    if parent.is_empty() {
        if shared.is_some_and(|shared| shared.count > 1) {
            return Some((
                "StatusPage.CategoryID used in more than one entry but Category Parent is blank",
                format!("id={id}"),
                true,
            ));
        }
        return None;
    }

    if parent == view.name {
        return Some(("entry is the status category parent", format!("id={id}"), false));
    }

    let Some(parent_idx) = registry.service_by_name(parent) else {
        return Some((
            "StatusPage.CategoryParent does not match a canonical entry name",
            format!("parent={parent}"),
            true,
        ));
    };
    let target = registry.service(parent_idx);
    if !target.is_active() || target.record.reference_resource_name != parent {
        return Some((
            "StatusPage.CategoryParent does not match a canonical entry name",
            format!("parent={parent} canonical={}", target.record.reference_resource_name),
            true,
        ));
    }
    if target.record.status_page.category_id != id {
        return Some((
            "StatusPage.CategoryParent has a different Category ID",
            format!("id={id} parent-id={}", target.record.status_page.category_id),
            true,
        ));
    }
    None
}
