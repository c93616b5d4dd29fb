// crates/ossmerge-core/src/core/run_actions.rs
// ============================================================================
// Module: Run Actions
// Description: Per-run boolean flags enabling merge sub-steps.
// Purpose: Represent the run-action set as a compact, serializable bitset.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A run action enables one sub-step of the merge for a given run. Disabled
//! actions that produce a merged attribute fall back to the prior canonical
//! value; the validation log records which path was taken so consumers can
//! detect stale attributes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Run Action
// ============================================================================

/// Named run action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunAction {
    /// Merge service records.
    Services,
    /// Merge segments and tribes.
    Tribes,
    /// Merge environments.
    Environments,
    /// Include environments native to the catalog.
    EnvironmentsNative,
    /// Fetch the scorecard.
    Scorecard,
    /// Fetch the fleet directory.
    Doctor,
    /// Compute dependencies from the clearinghouse.
    DependenciesClearinghouse,
    /// Compute product information from the clearinghouse.
    ProductInfoClearinghouse,
    /// Collect monitoring information.
    Monitoring,
    /// Collect catalog deployment locations.
    Deployments,
    /// Fetch the maturity manager.
    Rmc,
    /// Force a full maturity-manager rescan.
    RmcRescan,
    /// Include pricing-derived part numbers.
    IncludePricing,
    /// Refresh the pricing cache.
    RefreshPricing,
    /// Include test records.
    TestMode,
    /// Record loader failures instead of aborting.
    Lenient,
}

impl RunAction {
    /// All run actions in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Services,
        Self::Tribes,
        Self::Environments,
        Self::EnvironmentsNative,
        Self::Scorecard,
        Self::Doctor,
        Self::DependenciesClearinghouse,
        Self::ProductInfoClearinghouse,
        Self::Monitoring,
        Self::Deployments,
        Self::Rmc,
        Self::RmcRescan,
        Self::IncludePricing,
        Self::RefreshPricing,
        Self::TestMode,
        Self::Lenient,
    ];

    /// Returns the stable name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Tribes => "tribes",
            Self::Environments => "environments",
            Self::EnvironmentsNative => "environments-native",
            Self::Scorecard => "scorecard",
            Self::Doctor => "doctor",
            Self::DependenciesClearinghouse => "dependencies-clearinghouse",
            Self::ProductInfoClearinghouse => "product-info-clearinghouse",
            Self::Monitoring => "monitoring",
            Self::Deployments => "deployments",
            Self::Rmc => "rmc",
            Self::RmcRescan => "rmc-rescan",
            Self::IncludePricing => "include-pricing",
            Self::RefreshPricing => "refresh-pricing",
            Self::TestMode => "test-mode",
            Self::Lenient => "lenient",
        }
    }

    /// Returns the bit used for this action in [`RunActions`].
    const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for RunAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised for unrecognized run action names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown run action: {0}")]
pub struct UnknownRunAction(pub String);

impl FromStr for RunAction {
    type Err = UnknownRunAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| UnknownRunAction(value.to_string()))
    }
}

// ============================================================================
// SECTION: Run Action Set
// ============================================================================

/// Bitset of enabled run actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunActions(u32);

impl RunActions {
    /// Returns an empty set.
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    /// Returns the default production set.
    #[must_use]
    pub const fn standard() -> Self {
        Self::none()
            .with(RunAction::Services)
            .with(RunAction::Tribes)
            .with(RunAction::Environments)
            .with(RunAction::Scorecard)
            .with(RunAction::Doctor)
            .with(RunAction::DependenciesClearinghouse)
            .with(RunAction::ProductInfoClearinghouse)
            .with(RunAction::Rmc)
    }

    /// Returns a copy of the set with the action enabled.
    #[must_use]
    pub const fn with(self, action: RunAction) -> Self {
        Self(self.0 | action.bit())
    }

    /// Returns a copy of the set with the action disabled.
    #[must_use]
    pub const fn without(self, action: RunAction) -> Self {
        Self(self.0 & !action.bit())
    }

    /// Returns true when the action is enabled.
    #[must_use]
    pub const fn contains(self, action: RunAction) -> bool {
        self.0 & action.bit() != 0
    }

    /// Iterates over enabled actions in declaration order.
    pub fn iter(self) -> impl Iterator<Item = RunAction> {
        RunAction::ALL.into_iter().filter(move |action| self.contains(*action))
    }
}

impl FromIterator<RunAction> for RunActions {
    fn from_iter<I: IntoIterator<Item = RunAction>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

impl Serialize for RunActions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for RunActions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let actions = Vec::<RunAction>::deserialize(deserializer)?;
        Ok(actions.into_iter().collect())
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// How a run action was applied to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunActionOutcome {
    /// The sub-step ran and produced fresh values.
    Executed,
    /// The sub-step was disabled and values were copied from the prior run.
    CopiedFromPrior,
}
