// crates/ossmerge-core/src/runtime/phase.rs
// ============================================================================
// Module: Phase Controller
// Description: Global and per-entity merge state machines.
// Purpose: Refuse out-of-order transitions and calls from the wrong phase.
// Dependencies: serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! The run advances through a fixed sequence of global phases. Every merge
//! component checks the global phase on entry, and every entity carries its
//! own phase so cross-entry reads can assert how far the other entity got.
//! Transitions are strictly adjacent; anything else is a programming error and
//! surfaces as a fatal [`PhaseError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Global phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalPhase {
    /// Nothing merged yet.
    Start,
    /// Segments and tribes.
    Segments,
    /// Environments, phase one.
    EnvironmentsOne,
    /// Environments, phase two.
    EnvironmentsTwo,
    /// Services, phase one.
    ServicesOne,
    /// Services, phase two.
    ServicesTwo,
    /// Services, phase three.
    ServicesThree,
    /// All entities finalized.
    Finalized,
}

impl GlobalPhase {
    /// Returns the phase that follows this one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::Segments),
            Self::Segments => Some(Self::EnvironmentsOne),
            Self::EnvironmentsOne => Some(Self::EnvironmentsTwo),
            Self::EnvironmentsTwo => Some(Self::ServicesOne),
            Self::ServicesOne => Some(Self::ServicesTwo),
            Self::ServicesTwo => Some(Self::ServicesThree),
            Self::ServicesThree => Some(Self::Finalized),
            Self::Finalized => None,
        }
    }

    /// Returns the stable label of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Segments => "segments",
            Self::EnvironmentsOne => "environments-one",
            Self::EnvironmentsTwo => "environments-two",
            Self::ServicesOne => "services-one",
            Self::ServicesTwo => "services-two",
            Self::ServicesThree => "services-three",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for GlobalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityPhase {
    /// Created from some source; not merged.
    #[default]
    Created,
    /// Own attributes merged.
    PhaseOne,
    /// Cross-entry attributes merged.
    PhaseTwo,
    /// Finalized and immutable.
    Finalized,
}

impl EntityPhase {
    /// Returns the phase that follows this one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::PhaseOne),
            Self::PhaseOne => Some(Self::PhaseTwo),
            Self::PhaseTwo => Some(Self::Finalized),
            Self::Finalized => None,
        }
    }

    /// Returns the stable label of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PhaseOne => "phase-one",
            Self::PhaseTwo => "phase-two",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for EntityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Phase discipline violations. These are programming errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    /// Non-adjacent global transition.
    #[error("global phase cannot advance from {from} to {to}")]
    OutOfOrder {
        /// Current phase.
        from: GlobalPhase,
        /// Requested phase.
        to: GlobalPhase,
    },
    /// Component called in the wrong global phase.
    #[error("{component} requires global phase {expected} but the run is in {actual}")]
    Unexpected {
        /// Calling component.
        component: &'static str,
        /// Allowed phases.
        expected: String,
        /// Current phase.
        actual: GlobalPhase,
    },
    /// Non-adjacent entity transition.
    #[error("entity {entity} cannot advance from {from} to {to}")]
    EntityOutOfOrder {
        /// Entity name.
        entity: String,
        /// Current phase.
        from: EntityPhase,
        /// Requested phase.
        to: EntityPhase,
    },
    /// Entity read in the wrong phase.
    #[error("{component} requires entity {entity} in {expected} but it is in {actual}")]
    EntityUnexpected {
        /// Calling component.
        component: &'static str,
        /// Entity name.
        entity: String,
        /// Allowed phases.
        expected: String,
        /// Current phase.
        actual: EntityPhase,
    },
    /// Test-only finalize requested outside the start phase.
    #[error("set-finalized requires phase start but the run is in {0}")]
    FinalizeOutsideStart(GlobalPhase),
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Global phase controller.
///
/// # Invariants
/// - `current` only moves forward by one phase at a time, except through
///   [`PhaseController::set_finalized`], which requires [`GlobalPhase::Start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseController {
    /// Current global phase.
    current: GlobalPhase,
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseController {
    /// Creates a controller in the start phase.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: GlobalPhase::Start }
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn current(&self) -> GlobalPhase {
        self.current
    }

    /// Advances to the adjacent phase.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::OutOfOrder`] for any non-adjacent transition.
    pub fn advance(&mut self, to: GlobalPhase) -> Result<(), PhaseError> {
        if self.current.next() != Some(to) {
            return Err(PhaseError::OutOfOrder { from: self.current, to });
        }
        debug!(from = %self.current, to = %to, "global phase advanced");
        self.current = to;
        Ok(())
    }

    /// Checks that the run is in the expected phase.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::Unexpected`] when the phase differs.
    pub fn expect(&self, component: &'static str, expected: GlobalPhase) -> Result<(), PhaseError> {
        self.expect_any(component, &[expected])
    }

    /// Checks that the run is in one of several allowed phases.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::Unexpected`] when the phase is not allowed.
    pub fn expect_any(
        &self,
        component: &'static str,
        allowed: &[GlobalPhase],
    ) -> Result<(), PhaseError> {
        if allowed.contains(&self.current) {
            return Ok(());
        }
        Err(PhaseError::Unexpected {
            component,
            expected: join_labels(allowed.iter().map(|phase| phase.as_str())),
            actual: self.current,
        })
    }

    /// Jumps straight to the finalized phase. Only used by unit tests.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::FinalizeOutsideStart`] unless the run is in start.
    pub fn set_finalized(&mut self) -> Result<(), PhaseError> {
        if self.current != GlobalPhase::Start {
            return Err(PhaseError::FinalizeOutsideStart(self.current));
        }
        self.current = GlobalPhase::Finalized;
        Ok(())
    }
}

// ============================================================================
// SECTION: Entity Checks
// ============================================================================

/// Advances an entity phase by one step.
///
/// # Errors
///
/// Returns [`PhaseError::EntityOutOfOrder`] for any non-adjacent transition.
pub fn advance_entity(
    phase: &mut EntityPhase,
    entity: &str,
    to: EntityPhase,
) -> Result<(), PhaseError> {
    if phase.next() != Some(to) {
        return Err(PhaseError::EntityOutOfOrder { entity: entity.to_string(), from: *phase, to });
    }
    *phase = to;
    Ok(())
}

/// Checks that an entity is in one of the allowed phases.
///
/// Phase-two components pass both [`EntityPhase::PhaseOne`] and
/// [`EntityPhase::PhaseTwo`] when reading other entries.
///
/// # Errors
///
/// Returns [`PhaseError::EntityUnexpected`] when the phase is not allowed.
pub fn expect_entity(
    component: &'static str,
    entity: &str,
    actual: EntityPhase,
    allowed: &[EntityPhase],
) -> Result<(), PhaseError> {
    if allowed.contains(&actual) {
        return Ok(());
    }
    Err(PhaseError::EntityUnexpected {
        component,
        entity: entity.to_string(),
        expected: join_labels(allowed.iter().map(|phase| phase.as_str())),
        actual,
    })
}

/// Joins phase labels for diagnostics.
fn join_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels.collect::<Vec<_>>().join(" | ")
}

/// Advances an entity phase step by step until it reaches `to`.
///
/// Used by entity kinds that finish all their merging in a single global
/// phase.
///
/// # Errors
///
/// Returns [`PhaseError::EntityOutOfOrder`] when `to` lies behind the entity.
pub fn advance_entity_through(
    phase: &mut EntityPhase,
    entity: &str,
    to: EntityPhase,
) -> Result<(), PhaseError> {
    while *phase != to {
        match phase.next() {
            Some(next) if next <= to => advance_entity(phase, entity, next)?,
            _ => {
                return Err(PhaseError::EntityOutOfOrder {
                    entity: entity.to_string(),
                    from: *phase,
                    to,
                });
            }
        }
    }
    Ok(())
}
