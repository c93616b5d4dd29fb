// crates/ossmerge-core/src/runtime/error.rs
// ============================================================================
// Module: Merge Errors
// Description: Fatal outcomes of a merge run.
// Purpose: Collect every programming-error class behind one error type.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Data inconsistencies never surface here; they are validation issues. A
//! [`MergeError`] means the pipeline itself was driven incorrectly or a loader
//! failed outside lenient mode, and the run is discarded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::HashError;
use crate::interfaces::LoadError;
use crate::runtime::merge::AttributeError;
use crate::runtime::phase::PhaseError;
use crate::runtime::registry::RegistryError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal merge-run failures.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Malformed attribute merge.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
    /// Phase discipline violation.
    #[error(transparent)]
    Phase(#[from] PhaseError),
    /// Registry key conflict.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Loader failure outside lenient mode.
    #[error("source load failed: {0}")]
    Load(#[from] LoadError),
    /// Validation-log hashing failure.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Cross-entry computation revisited an entry it was already computing.
    #[error("recursive {what} merge reached {entity} twice")]
    Recursion {
        /// Computation in progress.
        what: &'static str,
        /// Entry reached twice.
        entity: String,
    },
}
