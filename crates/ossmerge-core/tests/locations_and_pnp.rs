// crates/ossmerge-core/tests/locations_and_pnp.rs
// ============================================================================
// Module: Location and PnP Tests
// Description: Location ordering, IMS ids and the PnP decision matrix.
// ============================================================================
//! ## Overview
//! Pure-function checks for environment helpers and PnP gating.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use ossmerge_core::Severity;
use ossmerge_core::runtime::environment::legacy_ims_id;
use ossmerge_core::runtime::environment::sort_locations;
use ossmerge_core::runtime::pnp::PnpInputs;
use ossmerge_core::runtime::pnp::PnpTag;
use ossmerge_core::runtime::pnp::decide;
use proptest::prelude::*;

// ============================================================================
// SECTION: Locations
// ============================================================================

#[test]
fn locations_sort_by_bucket_then_name() {
    let mut locations: Vec<String> = [
        "us-south-1",
        "us-east-2",
        "us-east-1",
        "global",
        "satcon_dal",
        "us-south",
        "us-east",
        "tor01",
        "ams03",
        "au-syd",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    sort_locations(&mut locations);
    assert_eq!(
        locations,
        vec![
            "global",
            "au-syd",
            "us-east",
            "us-south",
            "ams03",
            "tor01",
            "satcon_dal",
            "us-east-1",
            "us-east-2",
            "us-south-1",
        ]
    );
}

#[test]
fn ims_id_is_taken_from_the_trailing_parentheses() {
    assert_eq!(legacy_ims_id("SoftLayer AMS03 (814994)"), Some("814994".to_string()));
    assert_eq!(legacy_ims_id("SoftLayer AMS03"), None);
    assert_eq!(legacy_ims_id("SoftLayer (AMS03)"), None);
}

// ============================================================================
// SECTION: PnP Decisions
// ============================================================================

fn inputs(selection: &[PnpTag]) -> PnpInputs {
    PnpInputs { selection: selection.to_vec(), ..PnpInputs::default() }
}

#[test]
fn exclude_on_an_eligible_entry_is_unnecessary() {
    let decision = decide(&inputs(&[PnpTag::Exclude]));
    assert!(!decision.enabled);
    assert_eq!(decision.issue, Some((Severity::Info, "PnP not enabled with unnecessary exclude tag")));
}

#[test]
fn include_overrides_overridable_criteria() {
    let mut tagged = inputs(&[PnpTag::Include]);
    tagged.overridable.push("not client facing".to_string());
    let decision = decide(&tagged);
    assert!(decision.enabled);
    assert_eq!(decision.issue, Some((Severity::Info, "PnP included despite issues")));
}

#[test]
fn include_cannot_override_non_overridable_criteria() {
    let mut tagged = inputs(&[PnpTag::Include]);
    tagged.non_overridable.push("no active ServiceNow record".to_string());
    let decision = decide(&tagged);
    assert!(!decision.enabled);
    assert_eq!(decision.issue.map(|(severity, _)| severity), Some(Severity::Warning));
}

#[test]
fn candidate_follows_violations() {
    assert!(decide(&inputs(&[PnpTag::Candidate])).enabled);
    let mut blocked = inputs(&[PnpTag::Candidate]);
    blocked.basic.push("operational status internal is not eligible".to_string());
    let decision = decide(&blocked);
    assert!(!decision.enabled);
    assert_eq!(decision.issue, Some((Severity::Info, "PnP not enabled but candidate")));
}

fn violations() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z ]{1,12}", 0..3)
}

proptest! {
    #[test]
    fn exclude_always_disables(
        basic in violations(),
        non_overridable in violations(),
        overridable in violations(),
        extra in prop::option::of(prop_oneof![Just(PnpTag::Candidate), Just(PnpTag::Include)]),
    ) {
        let mut selection = vec![PnpTag::Exclude];
        selection.extend(extra);
        let decision = decide(&PnpInputs { selection, basic, non_overridable, overridable });
        prop_assert!(!decision.enabled);
    }

    #[test]
    fn untagged_entries_are_enabled_exactly_when_clean(
        basic in violations(),
        non_overridable in violations(),
        overridable in violations(),
    ) {
        let inputs = PnpInputs { selection: Vec::new(), basic, non_overridable, overridable };
        prop_assert_eq!(decide(&inputs).enabled, inputs.is_clean());
    }
}
