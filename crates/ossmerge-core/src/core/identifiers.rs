// crates/ossmerge-core/src/core/identifiers.rs
// ============================================================================
// Module: Identifiers and Name Folding
// Description: Typed org/deliverable identifiers and service name forms.
// Purpose: Provide stable identity keys shared by the registry and mergers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Segments, tribes and clearinghouse deliverables are keyed by opaque string
//! identifiers wrapped in newtypes. Services are keyed by names in two forms:
//!
//! - the *comparable* form, used to match records from different directories
//!   (ASCII-lowercased, a fixed punctuation set removed);
//! - the *canonical* form, the shape a `ReferenceResourceName` must have
//!   (lowercase ASCII alphanumerics separated by single hyphens).
//!
//! Folding is locale independent: only ASCII letters are case-folded and
//! non-ASCII characters pass through untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Segment identifier from the scorecard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(String);

impl SegmentId {
    /// Creates a new segment identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Tribe identifier, unique across all segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TribeId(String);

impl TribeId {
    /// Creates a new tribe identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TribeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TribeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Clearinghouse deliverable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliverableId(String);

impl DeliverableId {
    /// Creates a new deliverable identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliverableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DeliverableId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Name Folding
// ============================================================================

/// Punctuation removed when building a comparable name.
const FOLDED_PUNCTUATION: &[char] = &[
    ' ', '-', '_', '.', ',', ':', ';', '/', '\\', '(', ')', '[', ']', '\'', '"', '&', '+', '!', '?',
];

/// Characters rewritten to a hyphen when building a canonical name.
const CANONICAL_SEPARATORS: &[char] = &[' ', '_', '.', ':', '/'];

/// Returns the comparable form of a name.
///
/// ASCII letters are lowercased and every character of the fixed punctuation
/// set is dropped; all other characters are kept as-is.
#[must_use]
pub fn comparable_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|ch| !FOLDED_PUNCTUATION.contains(ch))
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Converts a raw directory name into canonical `ReferenceResourceName` form.
#[must_use]
pub fn canonical_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let mapped = if CANONICAL_SEPARATORS.contains(&ch) { '-' } else { ch.to_ascii_lowercase() };
        if mapped == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        } else if mapped.is_ascii_lowercase() || mapped.is_ascii_digit() {
            out.push(mapped);
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Returns true when a name is already in canonical form.
#[must_use]
pub fn is_canonical_name(name: &str) -> bool {
    !name.is_empty() && canonical_name(name) == name
}

// ============================================================================
// SECTION: Do-Not-Merge Names
// ============================================================================

/// Names that must never be folded together with other names.
///
/// # Invariants
/// - Stored names are exact, unfolded strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoNotMergeNames(BTreeSet<String>);

impl DoNotMergeNames {
    /// Builds the list from raw names.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Returns true when the name is on the list.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Returns the registry key for a name.
    ///
    /// Do-not-merge names bypass folding and are used verbatim.
    #[must_use]
    pub fn key_for(&self, name: &str) -> String {
        if self.contains(name) { name.to_string() } else { comparable_name(name) }
    }
}
