// crates/ossmerge-core/src/runtime/gating.rs
// ============================================================================
// Module: Run-Action Gating
// Description: Compute-or-copy decision for attributes behind run actions.
// Purpose: Keep the copied path symmetric with the freshly computed path.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Each attribute computed behind a run action asks [`gate`] first. When the
//! action is enabled the log records [`RunActionOutcome::Executed`] and the
//! caller computes the attribute; otherwise an info issue is logged, the log
//! records [`RunActionOutcome::CopiedFromPrior`] and the caller copies the
//! prior value. Consumers can detect stale attributes from the log alone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::IssueTag;
use crate::core::RunAction;
use crate::core::RunActionOutcome;
use crate::core::RunActions;
use crate::core::Severity;
use crate::core::ValidationLog;

// ============================================================================
// SECTION: Gating
// ============================================================================

/// Decides whether an attribute is computed or copied, and records it.
pub fn gate(
    actions: RunActions,
    action: RunAction,
    log: &mut ValidationLog,
    what: &str,
) -> RunActionOutcome {
    if actions.contains(action) {
        log.record_run_action(action, RunActionOutcome::Executed);
        return RunActionOutcome::Executed;
    }
    log.record_run_action(action, RunActionOutcome::CopiedFromPrior);
    log.add(
        Severity::Info,
        &[IssueTag::RunAction],
        format!("copying {what} from prior run"),
        format!("run action {} is disabled", action.as_str()),
    );
    RunActionOutcome::CopiedFromPrior
}

/// Returns true when [`gate`] decided to compute.
#[must_use]
pub fn should_execute(
    actions: RunActions,
    action: RunAction,
    log: &mut ValidationLog,
    what: &str,
) -> bool {
    gate(actions, action, log, what) == RunActionOutcome::Executed
}
