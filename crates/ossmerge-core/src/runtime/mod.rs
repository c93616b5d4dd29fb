// crates/ossmerge-core/src/runtime/mod.rs
// ============================================================================
// Module: OSS Merge Runtime
// Description: Registry, phase controller, mergers and the merge engine.
// Purpose: Turn loaded source records into finalized canonical records.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime owns every algorithm of a merge run. [`MergeEngine`] is the
//! entry point; the remaining modules are the building blocks it sequences
//! and are public so that each step can be exercised on its own.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod category;
pub mod context;
pub mod deferred;
pub mod duplicates;
pub mod engine;
pub mod environment;
pub mod error;
pub mod gating;
pub mod merge;
pub mod names;
pub mod phase;
pub mod pnp;
pub mod populate;
pub mod registry;
pub mod segment;
pub mod selector;
pub mod service;
pub mod snapshot;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::LoadedSources;
pub use context::MergeConfig;
pub use context::MergeContext;
pub use context::RunContext;
pub use deferred::DeferredActions;
pub use engine::MergeCounters;
pub use engine::MergeEngine;
pub use engine::MergeOutput;
pub use engine::OutputRecord;
pub use error::MergeError;
pub use merge::AttributeError;
pub use merge::AttributeMerge;
pub use merge::MergeValue;
pub use phase::EntityPhase;
pub use phase::GlobalPhase;
pub use phase::PhaseController;
pub use phase::PhaseError;
pub use populate::SourceInputs;
pub use registry::Enablement;
pub use registry::NameGroup;
pub use registry::Registry;
pub use registry::RegistryError;
pub use registry::ServiceEntry;
pub use registry::ServiceIdx;
pub use registry::SourceSlot;
pub use snapshot::SnapshotDirectory;
pub use snapshot::SnapshotSources;
