// crates/ossmerge-core/src/runtime/deferred.rs
// ============================================================================
// Module: Deferred Actions
// Description: FIFO queue of registry mutations run after phase two.
// Purpose: Void fields only after every cross-entry check has observed them.
// Dependencies: crate::runtime::registry, tracing
// ============================================================================

//! ## Overview
//! Cross-entry checks in phase two must all see the same field values, so any
//! field they decide to void is cleared later by a queued closure. The queue
//! runs in insertion order once, after the phase-two barrier. Closures receive
//! only the registry, never the queue, so they cannot enqueue further actions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::runtime::registry::Registry;

// ============================================================================
// SECTION: Queue
// ============================================================================

/// Boxed registry mutation.
type DeferredFn = Box<dyn FnOnce(&mut Registry)>;

/// Run-scoped queue of deferred registry mutations.
#[derive(Default)]
pub struct DeferredActions {
    /// Queued actions with diagnostic labels.
    queue: VecDeque<(String, DeferredFn)>,
}

impl fmt::Debug for DeferredActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredActions").field("len", &self.queue.len()).finish()
    }
}

impl DeferredActions {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action.
    pub fn push(&mut self, label: impl Into<String>, action: impl FnOnce(&mut Registry) + 'static) {
        self.queue.push_back((label.into(), Box::new(action)));
    }

    /// Returns the number of queued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Runs every queued action in insertion order and returns how many ran.
    pub fn run_all(&mut self, registry: &mut Registry) -> usize {
        let mut executed = 0;
        while let Some((label, action)) = self.queue.pop_front() {
            debug!(action = %label, "running deferred action");
            action(registry);
            executed += 1;
        }
        executed
    }
}
