// crates/ossmerge-core/src/runtime/environment.rs
// ============================================================================
// Module: Environment Merger
// Description: Canonical environment records from catalog and fleet sources.
// Purpose: Derive type, status and legacy identifiers per location CRN.
// Dependencies: crate::core, crate::runtime, tracing
// ============================================================================

//! ## Overview
//! Every environment is keyed by its normalized location CRN. Phase one picks
//! primary catalog, fleet and region-id records, derives the environment type
//! from the CRN scope and catalog kind, unions the status signals and merges
//! the scalar attributes. Phase two resolves the parent through the catalog
//! parent identifier.
//!
//! Legacy catalog kinds on dedicated or local CRNs are not valid environments
//! of that scope; their type is reset to unknown with a severe issue.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::info;

use crate::core::CatalogKind;
use crate::core::CatalogResource;
use crate::core::CrnType;
use crate::core::EnvironmentStatus;
use crate::core::EnvironmentType;
use crate::core::FleetEnvironment;
use crate::core::IssueTag;
use crate::core::LocationCrn;
use crate::core::RegionId;
use crate::core::RunAction;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::Tag;
use crate::core::ValidationLog;
use crate::runtime::context::DOCTOR_SOURCE;
use crate::runtime::context::REGION_ID_SOURCE;
use crate::runtime::context::RunContext;
use crate::runtime::error::MergeError;
use crate::runtime::gating::should_execute;
use crate::runtime::merge::AttributeMerge;
use crate::runtime::phase::EntityPhase;
use crate::runtime::phase::GlobalPhase;
use crate::runtime::phase::PhaseController;
use crate::runtime::phase::advance_entity;
use crate::runtime::phase::advance_entity_through;
use crate::runtime::registry::EnvironmentEntry;
use crate::runtime::registry::EnvironmentIdx;
use crate::runtime::registry::Registry;
use crate::runtime::selector::select_by_key;

// ============================================================================
// SECTION: Location Helpers
// ============================================================================

/// Sort bucket of a location name.
///
/// Globals first, then multi-zone regions, datacenters and PoPs, satellite
/// containers, availability zones, and anything else last.
#[must_use]
pub fn location_bucket(location: &str) -> u8 {
    if location == "global" {
        return 0;
    }
    if location.starts_with("satcon_") {
        return 3;
    }
    let parts: Vec<&str> = location.split('-').collect();
    match parts.as_slice() {
        [site] if is_site_code(site) => 2,
        [geo, metro] if is_alpha(geo) && is_alpha(metro) => 1,
        [geo, metro, zone] if is_alpha(geo) && is_alpha(metro) && is_digits(zone) => 4,
        _ => 5,
    }
}

/// Sorts locations by bucket, then lexicographically within each bucket.
pub fn sort_locations(locations: &mut [String]) {
    locations.sort_by(|a, b| location_bucket(a).cmp(&location_bucket(b)).then_with(|| a.cmp(b)));
}

/// Extracts the legacy IMS id from a name ending in `(digits)`.
#[must_use]
pub fn legacy_ims_id(name: &str) -> Option<String> {
    let trimmed = name.trim();
    let body = trimmed.strip_suffix(')')?;
    let open = body.rfind('(')?;
    let digits = body.get(open + 1..)?;
    if is_digits(digits) { Some(digits.to_string()) } else { None }
}

/// Returns true for a non-empty all-letter string.
fn is_alpha(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch.is_ascii_alphabetic())
}

/// Returns true for a non-empty all-digit string.
fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch.is_ascii_digit())
}

/// Returns true for datacenter and PoP codes such as `ams03`.
fn is_site_code(text: &str) -> bool {
    let letters = text.chars().take_while(char::is_ascii_alphabetic).count();
    let digits = text.len() - letters;
    letters >= 2 && digits >= 1 && text.get(letters..).is_some_and(is_digits)
}

// ============================================================================
// SECTION: Type and Status
// ============================================================================

/// Maps a catalog kind to the environment type it implies for public CRNs.
const fn type_of_kind(kind: CatalogKind) -> Option<EnvironmentType> {
    match kind {
        CatalogKind::Region => Some(EnvironmentType::Region),
        CatalogKind::Datacenter => Some(EnvironmentType::Datacenter),
        CatalogKind::AvailabilityZone => Some(EnvironmentType::Zone),
        CatalogKind::Pop => Some(EnvironmentType::Pop),
        CatalogKind::Satellite => Some(EnvironmentType::Satellite),
        CatalogKind::LegacyCname | CatalogKind::LegacyEnvironment => Some(EnvironmentType::Special),
        _ => None,
    }
}

/// Derives the environment type from the CRN scope and the catalog kind.
fn derive_type(
    crn: Option<&LocationCrn>,
    catalog: Option<&CatalogResource>,
    fleet: Option<&FleetEnvironment>,
    log: &mut ValidationLog,
) -> EnvironmentType {
    let from_catalog = catalog.and_then(|resource| type_of_kind(resource.kind));
    let Some(crn) = crn else {
        log.add(
            Severity::Severe,
            &[IssueTag::Environment, IssueTag::Crn],
            "environment id is not a valid location CRN",
            "",
        );
        return EnvironmentType::Unknown;
    };
    if crn.is_gaas() {
        return EnvironmentType::Gaas;
    }
    if crn.is_satellite() {
        return EnvironmentType::Satellite;
    }
    let scoped = match crn.crn_type() {
        CrnType::Dedicated => Some(EnvironmentType::Dedicated),
        CrnType::Local => Some(EnvironmentType::Local),
        CrnType::Staging => Some(EnvironmentType::Staging),
        CrnType::Public | CrnType::Other => None,
    };
    if let Some(scoped) = scoped {
        if let Some(resource) = catalog.filter(|resource| resource.kind.is_legacy_location()) {
            if matches!(scoped, EnvironmentType::Dedicated | EnvironmentType::Local) {
                log.add_sourced(
                    Severity::Severe,
                    &[IssueTag::Environment],
                    SourceKind::Catalog,
                    "legacy catalog kind is not valid for this environment",
                    format!("kind {} on {} CRN", catalog_kind_label(resource.kind), scoped.as_str()),
                );
                return EnvironmentType::Unknown;
            }
        }
        return scoped;
    }
    from_catalog
        .or_else(|| fleet.map(|fleet| fleet.env_type).filter(|kind| *kind != EnvironmentType::Unknown))
        .unwrap_or(EnvironmentType::Unknown)
}

/// Returns a label for a catalog location kind.
const fn catalog_kind_label(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::LegacyCname => "legacy-cname",
        CatalogKind::LegacyEnvironment => "legacy-environment",
        _ => "location",
    }
}

/// Derives the environment status from tags, catalog and fleet signals.
fn derive_status(entry: &EnvironmentEntry, prior: Option<EnvironmentStatus>) -> EnvironmentStatus {
    let tags = &entry.record.tags;
    if tags.contains(Tag::Decommissioned) {
        return EnvironmentStatus::Decommissioned;
    }
    if tags.contains(Tag::NotReady) {
        return EnvironmentStatus::NotReady;
    }
    if tags.contains(Tag::SelectAvailability) {
        return EnvironmentStatus::SelectAvailability;
    }
    let fleet = entry.fleet.primary.as_ref();
    if fleet.is_some_and(|fleet| fleet.env_name.to_ascii_lowercase().ends_with("decommissioned")) {
        return EnvironmentStatus::Decommissioned;
    }
    if let Some(catalog) = entry.catalog.primary.as_ref() {
        if catalog.disabled || !catalog.active {
            return EnvironmentStatus::NotReady;
        }
        if !catalog.is_public() {
            return EnvironmentStatus::SelectAvailability;
        }
        return EnvironmentStatus::Active;
    }
    if fleet.is_some_and(|fleet| fleet.active) {
        return EnvironmentStatus::Active;
    }
    prior.unwrap_or_default()
}

// ============================================================================
// SECTION: Phase One
// ============================================================================

/// Merges the own attributes of every environment.
///
/// # Errors
///
/// Returns [`MergeError`] on phase violations, registry conflicts or
/// malformed attribute merges.
pub fn merge_environments_one(
    registry: &mut Registry,
    phases: &PhaseController,
    ctx: &RunContext<'_>,
    run_log: &mut ValidationLog,
) -> Result<(), MergeError> {
    phases.expect("environment-merger", GlobalPhase::EnvironmentsOne)?;
    let execute = should_execute(ctx.config.actions, RunAction::Environments, run_log, "environments");
    let default_segment = registry
        .default_segment()
        .map(|idx| registry.segment(idx).record.segment_id.clone());

    for idx in registry.environment_indices() {
        let entry = registry.environment_mut(idx);
        let name = entry.record.environment_id.clone();
        if execute {
            merge_environment(entry, ctx)?;
        } else if let Some(prior) = entry.prior.clone() {
            entry.record = prior;
        }
        if entry.record.owning_segment.is_empty() {
            if let Some(segment) = default_segment.as_ref() {
                entry.record.owning_segment = segment.clone();
            }
        }
        let catalog_id = entry.record.catalog_id.clone();
        advance_entity(&mut entry.phase, &name, EntityPhase::PhaseOne)?;
        registry.index_environment_catalog_id(&catalog_id, idx)?;
    }
    info!(environments = registry.environment_indices().len(), "environments merged (phase one)");
    Ok(())
}

/// Merges one environment in isolation.
fn merge_environment(entry: &mut EnvironmentEntry, ctx: &RunContext<'_>) -> Result<(), MergeError> {
    select_by_key(&mut entry.catalog, |resource| (resource.disabled, !resource.active, resource.id.clone()));
    select_by_key(&mut entry.fleet, |fleet: &FleetEnvironment| (!fleet.valid, !fleet.active, fleet.new_crn.clone()));
    select_by_key(&mut entry.region, |region: &RegionId| (!region.valid, !region.active, region.crn.clone()));

    let merge_ctx = ctx.merge_context(false);
    let doctor = SourceKind::Custom(DOCTOR_SOURCE.to_string());
    let region_source = SourceKind::Custom(REGION_ID_SOURCE.to_string());
    let prior = entry.prior.clone();
    let catalog = entry.catalog.primary.clone();
    let fleet = entry.fleet.primary.clone();
    let region = entry.region.primary.clone();

    if let Some(prior) = prior.as_ref() {
        entry.record.tags = prior.tags.clone();
        entry.record.owning_segment = prior.owning_segment.clone();
    }
    let crn = LocationCrn::parse(&entry.record.environment_id);
    let log = &mut entry.validation;

    let derived = derive_type(crn.as_ref(), catalog.as_ref(), fleet.as_ref(), log);
    entry.record.env_type = match fleet.as_ref() {
        Some(fleet) if fleet.env_type != EnvironmentType::Unknown && fleet.env_type != derived => {
            log.add_sourced(
                Severity::Warning,
                &[IssueTag::Environment],
                doctor.clone(),
                "environment type differs from fleet directory",
                format!("derived={} {DOCTOR_SOURCE}={}", derived.as_str(), fleet.env_type.as_str()),
            );
            EnvironmentType::Unknown
        }
        _ => derived,
    };

    entry.record.display_name = AttributeMerge::new("DisplayName")
        .if_missing(Severity::Warning, &[IssueTag::Environment])
        .if_mismatch(Severity::Info, &[IssueTag::Environment])
        .candidate(SourceKind::Catalog, catalog.as_ref().map(|resource| resource.display_name.clone()))
        .candidate(doctor.clone(), fleet.as_ref().map(|fleet| fleet.env_name.clone()))
        .candidate(region_source.clone(), region.as_ref().map(|region| region.name.clone()))
        .prior(prior.as_ref().map(|record| record.display_name.clone()))
        .resolve(&merge_ctx, log)?;

    let ims_from = |name: &str| legacy_ims_id(name).unwrap_or_default();
    entry.record.legacy_ims_id = AttributeMerge::new("LegacyIMSID")
        .if_missing(Severity::Ignore, &[IssueTag::Environment])
        .if_mismatch(Severity::Warning, &[IssueTag::Environment])
        .candidate(SourceKind::Catalog, catalog.as_ref().map(|resource| ims_from(&resource.display_name)))
        .candidate(doctor.clone(), fleet.as_ref().map(|fleet| ims_from(&fleet.env_name)))
        .prior(prior.as_ref().map(|record| record.legacy_ims_id.clone()))
        .resolve(&merge_ctx, log)?;

    entry.record.legacy_mccp_id = AttributeMerge::new("LegacyMCCPID")
        .if_missing(Severity::Ignore, &[IssueTag::Environment])
        .if_mismatch(Severity::Warning, &[IssueTag::Environment])
        .candidate(region_source, region.as_ref().map(|region| region.mccp_id.clone()))
        .candidate(
            SourceKind::Catalog,
            catalog
                .as_ref()
                .map(|resource| resource.deployment.as_ref().map(|d| d.mccp_id.clone()).unwrap_or_default()),
        )
        .prior(prior.as_ref().map(|record| record.legacy_mccp_id.clone()))
        .resolve(&merge_ctx, log)?;

    entry.record.legacy_doctor_crn = AttributeMerge::new("LegacyDoctorCRN")
        .if_missing(Severity::Ignore, &[IssueTag::Environment])
        .if_mismatch(Severity::Warning, &[IssueTag::Environment])
        .candidate(doctor, fleet.as_ref().map(|fleet| fleet.region_id.clone()))
        .prior(prior.as_ref().map(|record| record.legacy_doctor_crn.clone()))
        .resolve(&merge_ctx, log)?;

    entry.record.catalog_id = catalog
        .as_ref()
        .map(|resource| resource.id.clone())
        .or_else(|| prior.as_ref().map(|record| record.catalog_id.clone()))
        .unwrap_or_default();
    entry.record.status = derive_status(entry, prior.as_ref().map(|record| record.status));
    Ok(())
}

// ============================================================================
// SECTION: Phase Two
// ============================================================================

/// Resolves environment parents and finalizes every environment.
///
/// # Errors
///
/// Returns [`MergeError`] on phase violations.
pub fn merge_environments_two(
    registry: &mut Registry,
    phases: &PhaseController,
    ctx: &RunContext<'_>,
) -> Result<(), MergeError> {
    phases.expect("environment-merger", GlobalPhase::EnvironmentsTwo)?;
    let execute = ctx.enabled(RunAction::Environments);
    for idx in registry.environment_indices() {
        if execute {
            let parent = resolve_parent(registry, idx);
            let entry = registry.environment_mut(idx);
            if let Some((parent_id, issue)) = parent {
                entry.record.parent_id = parent_id;
                if let Some((severity, title, details)) = issue {
                    entry.validation.add(severity, &[IssueTag::Environment], title, details);
                }
            } else if let Some(prior) = entry.prior.as_ref() {
                entry.record.parent_id.clone_from(&prior.parent_id);
            }
        }
        let entry = registry.environment_mut(idx);
        let name = entry.record.environment_id.clone();
        entry.validation.sort();
        advance_entity_through(&mut entry.phase, &name, EntityPhase::Finalized)?;
    }
    info!(environments = registry.environment_indices().len(), "environments finalized");
    Ok(())
}

/// Optional issue attached to a parent resolution.
type ParentIssue = Option<(Severity, &'static str, String)>;

/// Resolves the parent id of an environment from its catalog parent.
fn resolve_parent(registry: &Registry, idx: EnvironmentIdx) -> Option<(String, ParentIssue)> {
    let entry = registry.environment(idx);
    let catalog = entry.catalog.primary.as_ref()?;
    if catalog.parent_id.is_empty() {
        return None;
    }
    let is_zone = entry.record.env_type == EnvironmentType::Zone;
    if let Some(parent) = registry.environment_by_catalog_id(&catalog.parent_id) {
        return Some((registry.environment(parent).record.environment_id.clone(), None));
    }
    let Some(parent) = registry.catalog_resource(&catalog.parent_id) else {
        return Some((
            catalog.parent_id.clone(),
            Some((Severity::Minor, "catalog parent not found", catalog.parent_id.clone())),
        ));
    };
    if is_zone {
        return Some((
            parent.id.clone(),
            Some((
                Severity::Warning,
                "availability zone parent is not an environment",
                format!("parent \"{}\"", parent.name),
            )),
        ));
    }
    Some((parent.id.clone(), None))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CatalogVisibility;
    use crate::core::VisibilityRestriction;

    fn catalog(kind: CatalogKind) -> CatalogResource {
        CatalogResource {
            kind,
            active: true,
            visibility: CatalogVisibility { restrictions: VisibilityRestriction::Public, ..CatalogVisibility::default() },
            ..CatalogResource::default()
        }
    }

    fn fleet(env_type: EnvironmentType, env_name: &str, active: bool) -> FleetEnvironment {
        FleetEnvironment { env_type, env_name: env_name.to_string(), active, ..FleetEnvironment::default() }
    }

    #[test]
    fn type_follows_crn_scope_then_catalog_kind() {
        let cases = [
            ("crn:v1:bluemix:public::us-south", Some(CatalogKind::Region), EnvironmentType::Region),
            ("crn:v1:bluemix:public::ams03", Some(CatalogKind::Datacenter), EnvironmentType::Datacenter),
            ("crn:v1:bluemix:public::us-south-1", Some(CatalogKind::AvailabilityZone), EnvironmentType::Zone),
            ("crn:v1:bluemix:public::sjc-pop", Some(CatalogKind::Pop), EnvironmentType::Pop),
            ("crn:v1:bluemix:public::old", Some(CatalogKind::LegacyCname), EnvironmentType::Special),
            ("crn:v1:d-acme:dedicated::us-south", Some(CatalogKind::Region), EnvironmentType::Dedicated),
            ("crn:v1:bluemix:local::us-south", None, EnvironmentType::Local),
            ("crn:v1:staging:staging::old", Some(CatalogKind::LegacyEnvironment), EnvironmentType::Staging),
            ("crn:v1:gov-east:public::us-east", Some(CatalogKind::Region), EnvironmentType::Gaas),
            ("crn:v1:satellite:public::satcon_dal", Some(CatalogKind::Region), EnvironmentType::Satellite),
            ("crn:v1:bluemix:public::nowhere", None, EnvironmentType::Unknown),
        ];
        for (raw, kind, expected) in cases {
            let mut log = ValidationLog::new(raw);
            let crn = LocationCrn::parse(raw);
            let resource = kind.map(catalog);
            assert_eq!(derive_type(crn.as_ref(), resource.as_ref(), None, &mut log), expected, "{raw}");
            assert!(log.is_empty(), "{raw}");
        }
    }

    #[test]
    fn fleet_type_applies_without_catalog_kind() {
        let mut log = ValidationLog::new("env");
        let crn = LocationCrn::parse("crn:v1:bluemix:public::eu-de");
        let record = fleet(EnvironmentType::Region, "eu-de", true);
        assert_eq!(derive_type(crn.as_ref(), None, Some(&record), &mut log), EnvironmentType::Region);
    }

    #[test]
    fn legacy_kinds_on_dedicated_and_local_crns_are_unknown() {
        for raw in ["crn:v1:d-acme:dedicated::old", "crn:v1:bluemix:local::old"] {
            let mut log = ValidationLog::new(raw);
            let crn = LocationCrn::parse(raw);
            let resource = catalog(CatalogKind::LegacyEnvironment);
            assert_eq!(derive_type(crn.as_ref(), Some(&resource), None, &mut log), EnvironmentType::Unknown);
            let issues: Vec<_> = log.find("legacy catalog kind is not valid for this environment").collect();
            assert_eq!(issues.len(), 1, "{raw}");
            assert_eq!(issues[0].severity, Severity::Severe);
        }
    }

    #[test]
    fn invalid_crn_has_unknown_type() {
        let mut log = ValidationLog::new("env");
        assert_eq!(derive_type(None, None, None, &mut log), EnvironmentType::Unknown);
        assert!(log.has_title("environment id is not a valid location CRN"));
    }

    #[test]
    fn status_applies_tags_then_catalog_then_fleet() {
        let hidden = CatalogResource { kind: CatalogKind::Region, active: true, ..CatalogResource::default() };
        let disabled = CatalogResource { disabled: true, ..catalog(CatalogKind::Region) };
        let cases = [
            (Some(Tag::Decommissioned), Some(catalog(CatalogKind::Region)), None, EnvironmentStatus::Decommissioned),
            (Some(Tag::NotReady), Some(catalog(CatalogKind::Region)), None, EnvironmentStatus::NotReady),
            (Some(Tag::SelectAvailability), None, None, EnvironmentStatus::SelectAvailability),
            (
                None,
                Some(catalog(CatalogKind::Region)),
                Some(fleet(EnvironmentType::Region, "dal decommissioned", true)),
                EnvironmentStatus::Decommissioned,
            ),
            (None, Some(disabled), None, EnvironmentStatus::NotReady),
            (None, Some(hidden), None, EnvironmentStatus::SelectAvailability),
            (None, Some(catalog(CatalogKind::Region)), None, EnvironmentStatus::Active),
            (None, None, Some(fleet(EnvironmentType::Region, "dal", true)), EnvironmentStatus::Active),
        ];
        for (tag, resource, fleet_record, expected) in cases {
            let mut entry = EnvironmentEntry::default();
            if let Some(tag) = tag {
                entry.record.tags.insert(tag);
            }
            entry.catalog.primary = resource;
            entry.fleet.primary = fleet_record;
            assert_eq!(derive_status(&entry, None), expected);
        }
    }

    #[test]
    fn status_keeps_prior_without_signals() {
        let entry = EnvironmentEntry::default();
        assert_eq!(derive_status(&entry, Some(EnvironmentStatus::Decommissioned)), EnvironmentStatus::Decommissioned);
        assert_eq!(derive_status(&entry, None), EnvironmentStatus::default());
    }

    #[test]
    fn buckets_classify_location_shapes() {
        assert_eq!(location_bucket("global"), 0);
        assert_eq!(location_bucket("us-south"), 1);
        assert_eq!(location_bucket("ams03"), 2);
        assert_eq!(location_bucket("satcon_dal"), 3);
        assert_eq!(location_bucket("us-east-2"), 4);
        assert_eq!(location_bucket("mystery location"), 5);
    }

    #[test]
    fn ims_id_requires_trailing_digits() {
        assert_eq!(legacy_ims_id("Dallas 10 (12)"), Some("12".to_string()));
        assert_eq!(legacy_ims_id("Dallas (x12)"), None);
        assert_eq!(legacy_ims_id("Dallas"), None);
    }
}
