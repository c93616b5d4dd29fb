// crates/ossmerge-core/src/lib.rs
// ============================================================================
// Module: OSS Merge Core
// Description: Service metadata merge engine.
// Purpose: Merge records from independent directories into one canonical set.
// Dependencies: regex, serde, serde_jcs, sha2, smallvec, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! `ossmerge-core` reads service, organization and location records from
//! several authoritative directories, reconciles them attribute by attribute
//! and emits finalized canonical records, each with an append-only validation
//! log. Loaders are abstracted behind [`interfaces`]; the merge itself is
//! driven by [`runtime::MergeEngine`].

pub mod core;
pub mod interfaces;
pub mod runtime;

pub use crate::core::*;
pub use crate::interfaces::LoadError;
pub use crate::interfaces::NamePattern;
pub use crate::interfaces::PriorOptions;
pub use crate::interfaces::SourceDirectory;
pub use crate::runtime::MergeConfig;
pub use crate::runtime::MergeCounters;
pub use crate::runtime::MergeEngine;
pub use crate::runtime::MergeError;
pub use crate::runtime::MergeOutput;
pub use crate::runtime::OutputRecord;
pub use crate::runtime::SnapshotDirectory;
pub use crate::runtime::SnapshotSources;
