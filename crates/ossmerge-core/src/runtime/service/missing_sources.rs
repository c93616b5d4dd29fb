// crates/ossmerge-core/src/runtime/service/missing_sources.rs
// ============================================================================
// Module: Missing-Source Classification
// Description: Rule table for sources absent from a service.
// Purpose: Report absences by entry type and operational status.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! An absent source is either required (severe), permitted (minor) or
//! expected to be absent (no issue). Sources not loaded in this run are never
//! classified.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::EntryType;
use crate::core::IssueTag;
use crate::core::OperationalStatus;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::Tag;
use crate::runtime::context::LoadedSources;
use crate::runtime::registry::ServiceEntry;

// ============================================================================
// SECTION: Rule Table
// ============================================================================

/// How the absence of a source is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    /// The source must be present.
    Required,
    /// The source may be absent; noted at minor severity.
    Permitted,
    /// The source is expected to be absent.
    Expected,
}

impl Absence {
    /// Returns the severity of an absence, if one is reported.
    #[must_use]
    pub const fn severity(self) -> Option<Severity> {
        match self {
            Self::Required => Some(Severity::Severe),
            Self::Permitted => Some(Severity::Minor),
            Self::Expected => None,
        }
    }
}

/// Classifies an absent maturity-manager entry.
#[must_use]
pub const fn rmc_absence(entry_type: EntryType, status: OperationalStatus) -> Absence {
    if matches!(
        status,
        OperationalStatus::Deprecated
            | OperationalStatus::Retired
            | OperationalStatus::NotReady
            | OperationalStatus::ThirdParty
            | OperationalStatus::Community
    ) || matches!(
        entry_type,
        EntryType::OtherOss
            | EntryType::Gaas
            | EntryType::SubComponent
            | EntryType::SuperComponent
            | EntryType::IamOnly
            | EntryType::Iaas
            | EntryType::Vmware
            | EntryType::Content
            | EntryType::Consulting
            | EntryType::Internal
            | EntryType::Unknown
    ) {
        Absence::Expected
    } else {
        Absence::Required
    }
}

/// Classifies an absent catalog entry.
#[must_use]
pub const fn catalog_absence(entry_type: EntryType, status: OperationalStatus, not_ready_tag: bool) -> Absence {
    if not_ready_tag
        || matches!(status, OperationalStatus::Deprecated | OperationalStatus::Retired | OperationalStatus::NotReady)
        || matches!(
            entry_type,
            EntryType::OtherOss
                | EntryType::Gaas
                | EntryType::SubComponent
                | EntryType::SuperComponent
                | EntryType::IamOnly
                | EntryType::Content
                | EntryType::Internal
        )
    {
        Absence::Expected
    } else if matches!(entry_type, EntryType::PlatformComponent) {
        Absence::Permitted
    } else {
        Absence::Required
    }
}

/// Classifies an absent scorecard entry.
#[must_use]
pub const fn scorecard_absence(entry_type: EntryType, status: OperationalStatus) -> Absence {
    if matches!(
        status,
        OperationalStatus::Deprecated
            | OperationalStatus::Retired
            | OperationalStatus::ThirdParty
            | OperationalStatus::Community
    ) || matches!(
        entry_type,
        EntryType::SubComponent
            | EntryType::SuperComponent
            | EntryType::OtherOss
            | EntryType::IamOnly
            | EntryType::Content
            | EntryType::Consulting
            | EntryType::Internal
    ) {
        Absence::Expected
    } else if matches!(entry_type, EntryType::Gaas | EntryType::PlatformComponent) {
        Absence::Permitted
    } else {
        Absence::Required
    }
}

/// Classifies an absent (or retired) incident-system record.
#[must_use]
pub const fn incident_absence(status: OperationalStatus, not_ready_tag: bool) -> Absence {
    if not_ready_tag
        || matches!(
            status,
            OperationalStatus::ThirdParty | OperationalStatus::Community | OperationalStatus::Retired
        )
    {
        Absence::Expected
    } else {
        Absence::Required
    }
}

// ============================================================================
// SECTION: Check
// ============================================================================

/// Reports absent sources of one entry.
pub fn check_missing_sources(entry: &mut ServiceEntry, loaded: LoadedSources) {
    let entry_type = entry.record.general.entry_type;
    let status = entry.record.general.operational_status;
    let not_ready = entry.record.general.oss_tags.contains(Tag::NotReady);

    let mut absences: Vec<(SourceKind, Absence, IssueTag, &'static str)> = Vec::new();
    if loaded.rmc && entry.rmc.is_none() {
        absences.push((SourceKind::Rmc, rmc_absence(entry_type, status), IssueTag::Rmc, "entry not found in RMC"));
    }
    if loaded.catalog && entry.catalog_primary().is_none() {
        absences.push((
            SourceKind::Catalog,
            catalog_absence(entry_type, status, not_ready),
            IssueTag::CatalogInfo,
            "entry not found in catalog",
        ));
    }
    if loaded.scorecard && entry.scorecard.primary.is_none() {
        absences.push((
            SourceKind::ScorecardV1,
            scorecard_absence(entry_type, status),
            IssueTag::Scorecard,
            "entry not found in scorecard",
        ));
    }
    if loaded.service_now && !entry.has_live_service_now() {
        absences.push((
            SourceKind::ServiceNow,
            incident_absence(status, not_ready),
            IssueTag::ServiceNow,
            "entry not found in ServiceNow or retired",
        ));
    }
    for (source, absence, tag, title) in absences {
        if let Some(severity) = absence.severity() {
            entry.validation.add_sourced(severity, &[tag], source, title, format!("type={entry_type} status={status}"));
        }
    }

    if loaded.iam {
        let has_identity = entry.iam.primary.is_some();
        let has_other = entry.service_now.primary.is_some() || entry.scorecard.primary.is_some();
        if entry_type == EntryType::IamOnly {
            if !has_identity {
                entry.validation.add_sourced(
                    Severity::Severe,
                    &[IssueTag::Identity],
                    SourceKind::Iam,
                    "iam-only entry not found in IAM",
                    "",
                );
            } else if has_other {
                entry.validation.add_sourced(
                    Severity::Critical,
                    &[IssueTag::Identity],
                    SourceKind::Iam,
                    "iam-only entry has ServiceNow or scorecard records",
                    "",
                );
            }
        }
    }
}
