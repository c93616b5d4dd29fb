// crates/ossmerge-core/src/core/crn.rs
// ============================================================================
// Module: Location CRNs
// Description: Parsed location CRN used as the environment identity key.
// Purpose: Normalize location CRNs so that every source keys environments alike.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A CRN is a colon-separated string `crn:<version>:<cname>:<ctype>:<service>:
//! <location>:<scope>:<instance>:<resource-type>:<resource>`. Environments are
//! identified by the location part only, so the normalized form keeps the
//! version, cname, ctype and location and blanks everything else.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Location CRN
// ============================================================================

/// Scope of a CRN (`public`, `dedicated`, `local`, `staging`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrnType {
    /// Public cloud.
    Public,
    /// Dedicated environment.
    Dedicated,
    /// Local environment.
    Local,
    /// Staging environment.
    Staging,
    /// Any other c-type.
    Other,
}

/// Parsed location CRN.
///
/// # Invariants
/// - All parts are lowercase and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationCrn {
    /// CRN version.
    pub version: String,
    /// C-name (`bluemix`, `softlayer`, `d-<tenant>`, ...).
    pub cname: String,
    /// C-type as written.
    pub ctype: String,
    /// Location name.
    pub location: String,
}

impl LocationCrn {
    /// Parses a CRN string, returning `None` when it is not a CRN.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        let mut parts = lowered.split(':');
        if parts.next() != Some("crn") {
            return None;
        }
        let version = parts.next().unwrap_or_default().to_string();
        let cname = parts.next().unwrap_or_default().to_string();
        let ctype = parts.next().unwrap_or_default().to_string();
        let _service = parts.next();
        let location = parts.next().unwrap_or_default().to_string();
        if version.is_empty() || cname.is_empty() || ctype.is_empty() {
            return None;
        }
        Some(Self { version, cname, ctype, location })
    }

    /// Returns the classified c-type.
    #[must_use]
    pub fn crn_type(&self) -> CrnType {
        match self.ctype.as_str() {
            "public" => CrnType::Public,
            "dedicated" => CrnType::Dedicated,
            "local" => CrnType::Local,
            "staging" => CrnType::Staging,
            _ => CrnType::Other,
        }
    }

    /// Returns true for satellite containers and locations.
    #[must_use]
    pub fn is_satellite(&self) -> bool {
        self.cname == "satellite" || self.location.starts_with("satcon_")
    }

    /// Returns true for government cloud c-names.
    #[must_use]
    pub fn is_gaas(&self) -> bool {
        self.cname.starts_with("gov") || self.cname.starts_with("g-")
    }

    /// Returns the normalized string form.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LocationCrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crn:{}:{}:{}::{}::::", self.version, self.cname, self.ctype, self.location)
    }
}

/// Normalizes a raw location CRN, returning `None` when it is not a CRN.
#[must_use]
pub fn normalize_location_crn(raw: &str) -> Option<String> {
    LocationCrn::parse(raw).map(|crn| crn.normalized())
}
