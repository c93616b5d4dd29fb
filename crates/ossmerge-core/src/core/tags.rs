// crates/ossmerge-core/src/core/tags.rs
// ============================================================================
// Module: Tag Sets
// Description: Validated policy tags with optional expiry dates.
// Purpose: Carry per-record policy tokens through the merge.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! A tag set is an ordered set of known policy tokens. Tags come from the
//! merge-control record, from the maturity manager and from the merge itself
//! (computed status tags such as `pnp-enabled` or `crn-red`).
//!
//! A tag may carry an expiry date, written `name@YYYY-MM-DD`. The tag expires
//! once the run reference date is later than that date.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::core::validation::RagStatus;

// ============================================================================
// SECTION: Tag
// ============================================================================

/// Date format used for tag expiry.
const EXPIRY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Known policy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    /// Force entry type content.
    TypeContent,
    /// Force entry type consulting.
    TypeConsulting,
    /// Force entry type internal.
    TypeInternal,
    /// Force entry type other-oss.
    TypeOtherOss,
    /// Force entry type iam-only.
    TypeIamOnly,
    /// Force entry type gaas.
    TypeGaas,
    /// Force entry type platform-component.
    TypeComponent,
    /// Force entry type sub-component.
    TypeSubcomponent,
    /// Force entry type super-component.
    TypeSupercomponent,
    /// Force entry type vmware.
    TypeVmware,
    /// Force status not-ready.
    NotReady,
    /// Force status select-availability.
    SelectAvailability,
    /// Force status deprecated.
    Deprecated,
    /// Force status retired.
    Retired,
    /// Force status internal.
    Internal,
    /// Mark the record invalid (forces status retired).
    Invalid,
    /// Force the catalog client-facing flag on.
    ClientFacing,
    /// Force the catalog client-facing flag off.
    NotClientFacing,
    /// Ask for PnP enablement if all criteria pass.
    PnpCandidate,
    /// Force PnP enablement despite overridable violations.
    PnpInclude,
    /// Never enable PnP.
    PnpExclude,
    /// Treat an IaaS entry as client facing for PnP.
    PnpEnabledIaas,
    /// Computed: PnP is enabled.
    PnpEnabled,
    /// Entry exists only in the merged model.
    OssOnly,
    /// Test-only entry.
    OssTest,
    /// Entry maintained only in the maturity manager.
    ManagerOnly,
    /// Fallback owning segment for environments.
    DefaultSegment,
    /// Environment decommissioned.
    Decommissioned,
    /// Computed: CRN status green.
    CrnGreen,
    /// Computed: CRN status yellow.
    CrnYellow,
    /// Computed: CRN status red.
    CrnRed,
    /// Computed: overall status green.
    OverallGreen,
    /// Computed: overall status yellow.
    OverallYellow,
    /// Computed: overall status red.
    OverallRed,
}

impl Tag {
    /// All known tags in declaration order.
    pub const ALL: [Self; 34] = [
        Self::TypeContent,
        Self::TypeConsulting,
        Self::TypeInternal,
        Self::TypeOtherOss,
        Self::TypeIamOnly,
        Self::TypeGaas,
        Self::TypeComponent,
        Self::TypeSubcomponent,
        Self::TypeSupercomponent,
        Self::TypeVmware,
        Self::NotReady,
        Self::SelectAvailability,
        Self::Deprecated,
        Self::Retired,
        Self::Internal,
        Self::Invalid,
        Self::ClientFacing,
        Self::NotClientFacing,
        Self::PnpCandidate,
        Self::PnpInclude,
        Self::PnpExclude,
        Self::PnpEnabledIaas,
        Self::PnpEnabled,
        Self::OssOnly,
        Self::OssTest,
        Self::ManagerOnly,
        Self::DefaultSegment,
        Self::Decommissioned,
        Self::CrnGreen,
        Self::CrnYellow,
        Self::CrnRed,
        Self::OverallGreen,
        Self::OverallYellow,
        Self::OverallRed,
    ];

    /// Returns the tag token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypeContent => "type-content",
            Self::TypeConsulting => "type-consulting",
            Self::TypeInternal => "type-internal",
            Self::TypeOtherOss => "type-other-oss",
            Self::TypeIamOnly => "type-iam-only",
            Self::TypeGaas => "type-gaas",
            Self::TypeComponent => "type-component",
            Self::TypeSubcomponent => "type-subcomponent",
            Self::TypeSupercomponent => "type-supercomponent",
            Self::TypeVmware => "type-vmware",
            Self::NotReady => "not-ready",
            Self::SelectAvailability => "select-availability",
            Self::Deprecated => "deprecated",
            Self::Retired => "retired",
            Self::Internal => "internal",
            Self::Invalid => "invalid",
            Self::ClientFacing => "client-facing",
            Self::NotClientFacing => "not-client-facing",
            Self::PnpCandidate => "pnp-candidate",
            Self::PnpInclude => "pnp-include",
            Self::PnpExclude => "pnp-exclude",
            Self::PnpEnabledIaas => "pnp-enabled-iaas",
            Self::PnpEnabled => "pnp-enabled",
            Self::OssOnly => "oss-only",
            Self::OssTest => "oss-test",
            Self::ManagerOnly => "manager-only",
            Self::DefaultSegment => "default-segment",
            Self::Decommissioned => "decommissioned",
            Self::CrnGreen => "crn-green",
            Self::CrnYellow => "crn-yellow",
            Self::CrnRed => "crn-red",
            Self::OverallGreen => "overall-green",
            Self::OverallYellow => "overall-yellow",
            Self::OverallRed => "overall-red",
        }
    }

    /// Returns true for tags the merge computes and never reads from control records.
    #[must_use]
    pub const fn is_computed(self) -> bool {
        matches!(
            self,
            Self::PnpEnabled
                | Self::CrnGreen
                | Self::CrnYellow
                | Self::CrnRed
                | Self::OverallGreen
                | Self::OverallYellow
                | Self::OverallRed
        )
    }

    /// Returns true for tags owned by the maturity manager once an entry is onboarded.
    #[must_use]
    pub const fn is_manager_owned(self) -> bool {
        matches!(
            self,
            Self::TypeContent
                | Self::TypeConsulting
                | Self::TypeInternal
                | Self::TypeOtherOss
                | Self::TypeIamOnly
                | Self::TypeGaas
                | Self::TypeComponent
                | Self::TypeSubcomponent
                | Self::TypeSupercomponent
                | Self::TypeVmware
                | Self::NotReady
                | Self::SelectAvailability
                | Self::Deprecated
                | Self::Retired
                | Self::Internal
                | Self::ClientFacing
                | Self::NotClientFacing
                | Self::PnpCandidate
                | Self::PnpInclude
                | Self::PnpExclude
                | Self::PnpEnabledIaas
        )
    }

    /// Returns the CRN status tag for a summary.
    #[must_use]
    pub const fn crn_status(status: RagStatus) -> Self {
        match status {
            RagStatus::Green => Self::CrnGreen,
            RagStatus::Yellow => Self::CrnYellow,
            RagStatus::Red => Self::CrnRed,
        }
    }

    /// Returns the overall status tag for a summary.
    #[must_use]
    pub const fn overall_status(status: RagStatus) -> Self {
        match status {
            RagStatus::Green => Self::OverallGreen,
            RagStatus::Yellow => Self::OverallYellow,
            RagStatus::Red => Self::OverallRed,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let token = value.trim();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| TagError::Unknown(token.to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing tag tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// Token is not a known tag.
    #[error("unknown tag: {0}")]
    Unknown(String),
    /// Expiry suffix is not a valid date.
    #[error("invalid expiry date for tag {tag}: {value}")]
    InvalidExpiry {
        /// Tag token.
        tag: String,
        /// Expiry suffix as written.
        value: String,
    },
}

// ============================================================================
// SECTION: Tag Set
// ============================================================================

/// Tag together with its optional expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagEntry {
    /// The tag.
    pub tag: Tag,
    /// Last day the tag is in force.
    pub expires: Option<Date>,
}

impl TagEntry {
    /// Parses one `name` or `name@YYYY-MM-DD` token.
    ///
    /// # Errors
    ///
    /// Returns [`TagError`] for unknown tags or malformed dates.
    pub fn parse(token: &str) -> Result<Self, TagError> {
        let (name, expiry) = match token.split_once('@') {
            Some((name, expiry)) => (name, Some(expiry.trim())),
            None => (token, None),
        };
        let tag = Tag::from_str(name)?;
        let expires = match expiry {
            Some(value) => Some(Date::parse(value, EXPIRY_FORMAT).map_err(|_| {
                TagError::InvalidExpiry { tag: tag.as_str().to_string(), value: value.to_string() }
            })?),
            None => None,
        };
        Ok(Self { tag, expires })
    }

    /// Renders the entry back to its token form.
    #[must_use]
    pub fn render(&self) -> String {
        match self.expires.and_then(|date| date.format(EXPIRY_FORMAT).ok()) {
            Some(date) => format!("{}@{date}", self.tag),
            None => self.tag.as_str().to_string(),
        }
    }
}

/// Ordered set of tags.
///
/// # Invariants
/// - Each tag appears at most once; a later insert replaces the expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeMap<Tag, Option<Date>>);

impl TagSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parses raw tokens, returning the valid tags and one error per invalid token.
    #[must_use]
    pub fn parse_lenient<S: AsRef<str>>(tokens: &[S]) -> (Self, Vec<TagError>) {
        let mut set = Self::new();
        let mut errors = Vec::new();
        for token in tokens {
            let token = token.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            match TagEntry::parse(token) {
                Ok(entry) => {
                    set.0.insert(entry.tag, entry.expires);
                }
                Err(err) => errors.push(err),
            }
        }
        (set, errors)
    }

    /// Adds a tag without expiry.
    pub fn insert(&mut self, tag: Tag) {
        self.0.insert(tag, None);
    }

    /// Adds a tag that expires after the given date.
    pub fn insert_until(&mut self, tag: Tag, expires: Date) {
        self.0.insert(tag, Some(expires));
    }

    /// Removes a tag, returning true when it was present.
    pub fn remove(&mut self, tag: Tag) -> bool {
        self.0.remove(&tag).is_some()
    }

    /// Returns true when the tag is present.
    #[must_use]
    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains_key(&tag)
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over tags in order.
    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.keys().copied()
    }

    /// Iterates over entries with their expiry dates.
    pub fn entries(&self) -> impl Iterator<Item = TagEntry> + '_ {
        self.0.iter().map(|(tag, expires)| TagEntry { tag: *tag, expires: *expires })
    }

    /// Keeps only tags matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(Tag) -> bool) {
        self.0.retain(|tag, _| keep(*tag));
    }

    /// Removes tags matching the predicate and returns them.
    pub fn drain_matching(&mut self, mut matches: impl FnMut(Tag) -> bool) -> Vec<TagEntry> {
        let drained: Vec<TagEntry> = self.entries().filter(|entry| matches(entry.tag)).collect();
        for entry in &drained {
            self.0.remove(&entry.tag);
        }
        drained
    }

    /// Removes tags whose expiry date is before the reference date and returns them.
    pub fn remove_expired(&mut self, reference: Date) -> Vec<TagEntry> {
        let mut expired = Vec::new();
        self.0.retain(|tag, expires| match expires {
            Some(date) if *date < reference => {
                expired.push(TagEntry { tag: *tag, expires: Some(*date) });
                false
            }
            _ => true,
        });
        expired
    }

    /// Removes every tag of a mutually exclusive family and inserts one member.
    pub fn replace_family(&mut self, family: &[Tag], tag: Tag) {
        for member in family {
            self.0.remove(member);
        }
        self.insert(tag);
    }

    /// Returns the token form of every tag.
    #[must_use]
    pub fn to_tokens(&self) -> Vec<String> {
        self.entries().map(|entry| entry.render()).collect()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().map(|tag| (tag, None)).collect())
    }
}

impl Serialize for TagSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_tokens())
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tokens = Vec::<String>::deserialize(deserializer)?;
        let mut set = Self::new();
        for token in tokens {
            let entry = TagEntry::parse(&token).map_err(serde::de::Error::custom)?;
            set.0.insert(entry.tag, entry.expires);
        }
        Ok(set)
    }
}

/// Tags forcing an entry type.
pub const TYPE_TAGS: [Tag; 10] = [
    Tag::TypeContent,
    Tag::TypeConsulting,
    Tag::TypeInternal,
    Tag::TypeOtherOss,
    Tag::TypeIamOnly,
    Tag::TypeGaas,
    Tag::TypeComponent,
    Tag::TypeSubcomponent,
    Tag::TypeSupercomponent,
    Tag::TypeVmware,
];

/// CRN status tags.
pub const CRN_STATUS_TAGS: [Tag; 3] = [Tag::CrnGreen, Tag::CrnYellow, Tag::CrnRed];

/// Overall status tags.
pub const OVERALL_STATUS_TAGS: [Tag; 3] = [Tag::OverallGreen, Tag::OverallYellow, Tag::OverallRed];
