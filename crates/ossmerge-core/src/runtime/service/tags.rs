// crates/ossmerge-core/src/runtime/service/tags.rs
// ============================================================================
// Module: Service Tag Normalization
// Description: Effective tag set of a service from its merge-control record.
// Purpose: Validate override tags and apply manager ownership and expiry.
// Dependencies: crate::core, time
// ============================================================================

//! ## Overview
//! The merge-control tag list is parsed leniently: unknown tokens are logged
//! and dropped, and computed tags are never accepted as input. While the
//! entity is being edited in the maturity manager, the manager owns policy
//! tags, so merge-control copies of them are ignored and the manager's own
//! tags are used instead. Expired tags are removed with a critical issue.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;

use crate::core::IssueTag;
use crate::core::OnboardingPhase;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::Tag;
use crate::core::TagEntry;
use crate::core::TagSet;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Renders tag entries for issue details.
fn render(entries: &[TagEntry]) -> String {
    entries.iter().map(TagEntry::render).collect::<Vec<_>>().join(", ")
}

/// Builds the effective tag set of a service.
///
/// The onboarding phase of the record must already be set. Manager-owned
/// overrides are dropped only while the phase is editing.
pub fn normalize_tags(entry: &mut ServiceEntry, onboarded: bool, reference: Date) {
    let (mut tags, errors) = TagSet::parse_lenient(&entry.merge_control.tags);
    let log = &mut entry.validation;
    for error in errors {
        log.add_sourced(
            Severity::Warning,
            &[IssueTag::Tags],
            SourceKind::OverrideTag,
            "invalid tag in merge control",
            error.to_string(),
        );
    }

    let computed = tags.drain_matching(Tag::is_computed);
    if !computed.is_empty() {
        log.add_sourced(
            Severity::Minor,
            &[IssueTag::Tags],
            SourceKind::OverrideTag,
            "computed tags in merge control ignored",
            render(&computed),
        );
    }

    let editing = entry.record.general.onboarding_phase == OnboardingPhase::Editing;
    if editing {
        let ignored = tags.drain_matching(Tag::is_manager_owned);
        if !ignored.is_empty() {
            log.add_sourced(
                Severity::Minor,
                &[IssueTag::Tags, IssueTag::Rmc],
                SourceKind::OverrideTag,
                "ignored overrides while entry is edited in RMC",
                render(&ignored),
            );
        }
    }
    if onboarded {
        let tab_tags = entry
            .rmc
            .as_ref()
            .and_then(|rmc| rmc.oss_tab.as_ref())
            .map(|tab| tab.tags.clone())
            .unwrap_or_default();
        let (manager, manager_errors) = TagSet::parse_lenient(&tab_tags);
        for error in manager_errors {
            log.add_sourced(
                Severity::Warning,
                &[IssueTag::Tags, IssueTag::Rmc],
                SourceKind::RmcOss,
                "invalid tag in RMC",
                error.to_string(),
            );
        }
        for manager_entry in manager.entries().filter(|manager_entry| manager_entry.tag.is_manager_owned()) {
            match manager_entry.expires {
                Some(date) => tags.insert_until(manager_entry.tag, date),
                None => tags.insert(manager_entry.tag),
            }
        }
    }

    for expired in tags.remove_expired(reference) {
        log.add(
            Severity::Critical,
            &[IssueTag::Tags, IssueTag::Expired],
            format!("tag {} has expired", expired.tag),
            expired.render(),
        );
    }
    entry.record.general.oss_tags = tags;
}
