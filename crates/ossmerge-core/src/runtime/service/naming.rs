// crates/ossmerge-core/src/runtime/service/naming.rs
// ============================================================================
// Module: Reference Names
// Description: Derivation of the canonical ReferenceResourceName.
// Purpose: Give every service one stable canonical name.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The prior canonical name wins when it is already canonical. Otherwise the
//! name is derived from the first source that has one: catalog (children of a
//! catalog composite use the segment after the last `:`), incident system,
//! scorecard, identity service. Any raw source name that is not canonical is
//! reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::IssueTag;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::canonical_name;
use crate::core::is_canonical_name;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Names
// ============================================================================

/// Returns the own part of a catalog name, dropping a `composite:` prefix.
#[must_use]
pub fn catalog_own_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Derives the reference name and logs non-canonical source names.
///
/// Returns an empty string when no source supplies a name.
pub fn derive_reference_name(entry: &mut ServiceEntry) -> String {
    let mut raw_names: Vec<(SourceKind, String)> = Vec::new();
    if let Some(catalog) = entry.catalog_primary() {
        raw_names.push((SourceKind::Catalog, catalog_own_name(&catalog.name).to_string()));
    }
    if let Some(incident) = entry.service_now_primary() {
        raw_names.push((SourceKind::ServiceNow, incident.item.crn_service_name.clone()));
    }
    if let Some(scorecard) = entry.scorecard.primary.as_ref() {
        raw_names.push((SourceKind::ScorecardV1, scorecard.name.clone()));
    }
    if let Some(identity) = entry.iam.primary.as_ref() {
        raw_names.push((SourceKind::Iam, identity.name.clone()));
    }
    raw_names.retain(|(_, name)| !name.trim().is_empty());

    for (source, raw) in &raw_names {
        if !is_canonical_name(raw) {
            entry.validation.add_sourced(
                Severity::Severe,
                &[IssueTag::Crn, IssueTag::Naming],
                source.clone(),
                format!("name in {source} is not in canonical format"),
                format!("\"{raw}\" should be \"{}\"", canonical_name(raw)),
            );
        }
    }

    let prior = entry.prior_name();
    if is_canonical_name(prior) {
        return prior.to_string();
    }
    raw_names.first().map(|(_, raw)| canonical_name(raw)).unwrap_or_default()
}
