// crates/ossmerge-core/src/runtime/engine.rs
// ============================================================================
// Module: Merge Engine
// Description: Source loading, phase pipeline and output assembly.
// Purpose: Drive one complete merge run from loaders to finalized records.
// Dependencies: crate::core, crate::interfaces, crate::runtime, serde, tracing
// ============================================================================

//! ## Overview
//! [`MergeEngine::run`] is the single entry point of a merge. It reads every
//! enabled directory, populates the registry, then advances the global phase
//! controller through segments, environments and the three service phases.
//! Each phase completes for every entity before the next begins.
//!
//! Loader failures abort the run unless the `lenient` action is enabled; in
//! lenient mode the failed directory is treated as not loaded and the failure
//! is recorded as a critical issue on the run log and on every service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::Checksum;
use crate::core::DeliverableFull;
use crate::core::DeliverableSummary;
use crate::core::EnvironmentRecord;
use crate::core::HashError;
use crate::core::IssueTag;
use crate::core::MergeControl;
use crate::core::PartsTable;
use crate::core::PricingCache;
use crate::core::RunAction;
use crate::core::SegmentRecord;
use crate::core::ServiceRecord;
use crate::core::Severity;
use crate::core::SourceKind;
use crate::core::TribeRecord;
use crate::core::ValidationLog;
use crate::core::checksum_of;
use crate::interfaces::ClearingHouseLoader;
use crate::interfaces::LoadError;
use crate::interfaces::MonitoringSource;
use crate::interfaces::NamePattern;
use crate::interfaces::PriorOptions;
use crate::interfaces::SourceDirectory;
use crate::runtime::context::DOCTOR_SOURCE;
use crate::runtime::context::LoadedSources;
use crate::runtime::context::MergeConfig;
use crate::runtime::context::RunContext;
use crate::runtime::deferred::DeferredActions;
use crate::runtime::duplicates::fold_duplicates;
use crate::runtime::environment::merge_environments_one;
use crate::runtime::environment::merge_environments_two;
use crate::runtime::error::MergeError;
use crate::runtime::phase::EntityPhase;
use crate::runtime::phase::GlobalPhase;
use crate::runtime::phase::PhaseController;
use crate::runtime::populate::SourceInputs;
use crate::runtime::populate::populate;
use crate::runtime::registry::Registry;
use crate::runtime::segment::merge_segments;
use crate::runtime::service::build_name_groups;
use crate::runtime::service::merge_services_one;
use crate::runtime::service::merge_services_three;
use crate::runtime::service::merge_services_two;
use crate::runtime::service::quarantine_collisions;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Source label of the product clearinghouse in load diagnostics.
pub const CLEARINGHOUSE_SOURCE: &str = "ClearingHouse";

/// Source label of the pricing cache in load diagnostics.
pub const PRICING_SOURCE: &str = "Pricing";

/// Canonical name of the run log.
pub const RUN_LOG_NAME: &str = "merge-run";

// ============================================================================
// SECTION: Output
// ============================================================================

/// One finalized record of the output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputRecord {
    /// Segment record.
    Segment {
        /// Canonical record.
        record: SegmentRecord,
        /// Validation log.
        validation: ValidationLog,
        /// Checksum of the validation log.
        checksum: Checksum,
    },
    /// Tribe record.
    Tribe {
        /// Canonical record.
        record: TribeRecord,
        /// Validation log.
        validation: ValidationLog,
        /// Checksum of the validation log.
        checksum: Checksum,
    },
    /// Environment record.
    Environment {
        /// Canonical record.
        record: EnvironmentRecord,
        /// Validation log.
        validation: ValidationLog,
        /// Checksum of the validation log.
        checksum: Checksum,
    },
    /// Service record with its merge-control companion.
    Service {
        /// Canonical record.
        record: Box<ServiceRecord>,
        /// Merge-control record keyed by the canonical name.
        merge_control: MergeControl,
        /// Validation log.
        validation: ValidationLog,
        /// Checksum of the validation log.
        checksum: Checksum,
    },
}

impl OutputRecord {
    /// Returns the stable sort key of the record.
    #[must_use]
    pub fn sort_key(&self) -> String {
        match self {
            Self::Segment { record, .. } => format!("1.seg/{}", record.segment_id),
            Self::Tribe { record, .. } => format!("2.tribe/{}", record.tribe_id),
            Self::Environment { record, .. } => format!("3.env/{}", record.environment_id),
            Self::Service { record, .. } => format!("4.svc/{}", record.reference_resource_name),
        }
    }

    /// Returns the validation log of the record.
    #[must_use]
    pub const fn validation(&self) -> &ValidationLog {
        match self {
            Self::Segment { validation, .. }
            | Self::Tribe { validation, .. }
            | Self::Environment { validation, .. }
            | Self::Service { validation, .. } => validation,
        }
    }

    /// Returns the checksum of the validation log.
    #[must_use]
    pub const fn checksum(&self) -> &Checksum {
        match self {
            Self::Segment { checksum, .. }
            | Self::Tribe { checksum, .. }
            | Self::Environment { checksum, .. }
            | Self::Service { checksum, .. } => checksum,
        }
    }

    /// Returns the service record, if this is one.
    #[must_use]
    pub fn as_service(&self) -> Option<&ServiceRecord> {
        match self {
            Self::Service { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// Per-phase counters of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeCounters {
    /// Services emitted.
    pub services: usize,
    /// Segments emitted.
    pub segments: usize,
    /// Tribes emitted.
    pub tribes: usize,
    /// Environments emitted.
    pub environments: usize,
    /// Entries folded into a duplicate target.
    pub duplicates_folded: usize,
    /// Entries quarantined by reference-name collisions.
    pub quarantined: usize,
    /// Entries that produced no record.
    pub aborted: usize,
    /// Entries copied wholesale from the prior run.
    pub copied_from_prior: usize,
    /// Name groups built.
    pub name_groups: usize,
}

/// Result of one merge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutput {
    /// Finalized records sorted by [`OutputRecord::sort_key`].
    pub records: Vec<OutputRecord>,
    /// Run-level validation log.
    pub run_log: ValidationLog,
    /// Counters.
    pub counters: MergeCounters,
}

impl MergeOutput {
    /// Returns the checksum of the whole output document.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the document cannot be canonicalized.
    pub fn checksum(&self) -> Result<Checksum, HashError> {
        checksum_of(self)
    }

    /// Returns the service records of the output.
    pub fn services(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.records.iter().filter_map(OutputRecord::as_service)
    }

    /// Looks up a service record by canonical name.
    #[must_use]
    pub fn service(&self, reference_resource_name: &str) -> Option<&ServiceRecord> {
        self.services().find(|record| record.reference_resource_name == reference_resource_name)
    }

    /// Looks up the validation log of a service by canonical name.
    #[must_use]
    pub fn service_log(&self, reference_resource_name: &str) -> Option<&ValidationLog> {
        self.records.iter().find_map(|record| match record {
            OutputRecord::Service { record, validation, .. }
                if record.reference_resource_name == reference_resource_name =>
            {
                Some(validation)
            }
            _ => None,
        })
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Bookkeeping of directory loads for one run.
struct Loading<'a> {
    /// Whether failures are recorded instead of aborting.
    lenient: bool,
    /// Directories that failed, with their messages.
    failed: Vec<(SourceKind, String)>,
    /// Run log receiving failure issues.
    run_log: &'a mut ValidationLog,
}

impl Loading<'_> {
    /// Resolves one loader result.
    ///
    /// Returns `None` when the directory failed in lenient mode.
    fn take<T>(&mut self, source: SourceKind, result: Result<T, LoadError>) -> Result<Option<T>, MergeError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.lenient => {
                warn!(source = %source, error = %err, "source load failed; continuing in lenient mode");
                self.run_log.add_sourced(
                    Severity::Critical,
                    &[IssueTag::Data],
                    source.clone(),
                    format!("{source} could not be loaded"),
                    err.to_string(),
                );
                self.failed.push((source, err.to_string()));
                Ok(None)
            }
            Err(err) => Err(MergeError::Load(err)),
        }
    }
}

/// Fetches the full deliverable of every summary.
fn load_deliverables<S: ClearingHouseLoader + ?Sized>(
    sources: &S,
    pattern: &NamePattern,
) -> Result<(Vec<DeliverableSummary>, Vec<DeliverableFull>), LoadError> {
    let summaries = sources.list_clearinghouse_summary(pattern)?;
    let mut full = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        if let Some(deliverable) = sources.get_clearinghouse_full(&summary.id)? {
            full.push(deliverable);
        }
    }
    Ok((summaries, full))
}

/// Records loaded for one run plus the pricing cache.
struct Loaded {
    /// Records to place into the registry.
    inputs: SourceInputs,
    /// Directories that produced data.
    loaded: LoadedSources,
    /// Pricing cache, when pricing is included.
    pricing: Option<PricingCache>,
    /// Directories that failed in lenient mode.
    failed: Vec<(SourceKind, String)>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Merge engine for one configuration.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    /// Run configuration.
    config: MergeConfig,
}

impl MergeEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Returns the run configuration.
    #[must_use]
    pub const fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Runs one complete merge.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] on loader failures outside lenient mode and on
    /// any phase-discipline or registry violation.
    pub fn run<S: SourceDirectory + ?Sized>(
        &self,
        sources: &S,
        parts: &PartsTable,
        monitoring: Option<&dyn MonitoringSource>,
    ) -> Result<MergeOutput, MergeError> {
        let config = &self.config;
        let mut run_log = ValidationLog::new(RUN_LOG_NAME);
        let enabled: Vec<&str> = config.actions.iter().map(RunAction::as_str).collect();
        run_log.add(Severity::Info, &[IssueTag::RunAction], "run actions", enabled.join(", "));
        info!(pattern = %config.pattern, actions = %enabled.join(","), "merge run starting");

        let pattern = NamePattern::new(&config.pattern)?;
        let Loaded { inputs, loaded, pricing, failed } = self.load(sources, &pattern, &mut run_log)?;
        let scorecard_segments = inputs.scorecard_segments.clone();

        let mut registry = Registry::new(config.do_not_merge.clone());
        let prior_tribes = populate(&mut registry, inputs, &mut run_log);
        let mut counters = MergeCounters { duplicates_folded: fold_duplicates(&mut registry), ..MergeCounters::default() };

        let run = RunContext {
            config,
            loaded,
            parts,
            pricing: pricing.as_ref(),
            monitoring: if config.enabled(RunAction::Monitoring) { monitoring } else { None },
            failed: &failed,
        };
        let mut phases = PhaseController::new();

        phases.advance(GlobalPhase::Segments)?;
        merge_segments(&mut registry, &phases, &run, &scorecard_segments, prior_tribes, &mut run_log)?;

        phases.advance(GlobalPhase::EnvironmentsOne)?;
        merge_environments_one(&mut registry, &phases, &run, &mut run_log)?;
        phases.advance(GlobalPhase::EnvironmentsTwo)?;
        merge_environments_two(&mut registry, &phases, &run)?;

        phases.advance(GlobalPhase::ServicesOne)?;
        merge_services_one(&mut registry, &phases, &run)?;
        counters.quarantined = quarantine_collisions(&mut registry, &mut run_log);
        counters.name_groups = build_name_groups(&mut registry, config, &mut run_log)?;

        phases.advance(GlobalPhase::ServicesTwo)?;
        let mut deferred = DeferredActions::new();
        merge_services_two(&mut registry, &phases, &run, &mut deferred)?;

        phases.advance(GlobalPhase::ServicesThree)?;
        merge_services_three(&mut registry, &phases, &run)?;

        phases.advance(GlobalPhase::Finalized)?;
        let output = collect_output(&registry, run_log, counters)?;
        info!(
            services = output.counters.services,
            segments = output.counters.segments,
            tribes = output.counters.tribes,
            environments = output.counters.environments,
            "merge run complete"
        );
        Ok(output)
    }

    /// Reads every enabled directory.
    fn load<S: SourceDirectory + ?Sized>(
        &self,
        sources: &S,
        pattern: &NamePattern,
        run_log: &mut ValidationLog,
    ) -> Result<Loaded, MergeError> {
        let config = &self.config;
        let mut loading = Loading { lenient: config.enabled(RunAction::Lenient), failed: Vec::new(), run_log };
        let mut inputs = SourceInputs::default();
        let mut loaded = LoadedSources::default();

        let options = PriorOptions {
            include_services: true,
            include_tribes: true,
            include_environments: true,
            include_native_environments: config.enabled(RunAction::EnvironmentsNative),
            include_merge_control: true,
            include_validation: true,
            include_domain_overrides: true,
        };
        if let Some(prior) = loading.take(SourceKind::PriorOss, sources.list_prior(pattern, options))? {
            inputs.prior = prior;
        }

        if let Some(catalog) = loading.take(SourceKind::Catalog, sources.list_catalog(pattern))? {
            inputs.catalog = catalog;
            loaded.catalog = true;
        }

        let include_test = config.enabled(RunAction::TestMode);
        let incident = sources.list_incident_items(pattern, include_test);
        if let Some(incident) = loading.take(SourceKind::ServiceNow, incident)? {
            inputs.incident = incident;
            loaded.service_now = true;
        }

        if config.enabled(RunAction::Scorecard) {
            let scorecard = sources
                .list_scorecard_detail(pattern)
                .and_then(|detail| Ok((detail, sources.list_scorecard_segments()?)));
            if let Some((detail, segments)) = loading.take(SourceKind::ScorecardV1, scorecard)? {
                inputs.scorecard = detail;
                inputs.scorecard_segments = segments;
                loaded.scorecard = true;
            }
        }

        if let Some(identity) = loading.take(SourceKind::Iam, sources.list_identity_services(pattern))? {
            inputs.identity = identity;
            loaded.iam = true;
        }

        if config.enabled(RunAction::Rmc) {
            let rescan = config.enabled(RunAction::RmcRescan);
            if let Some(maturity) = loading.take(SourceKind::Rmc, sources.list_maturity_summary(pattern, rescan))? {
                inputs.maturity = maturity;
                loaded.rmc = true;
            }
        }

        if config.enabled(RunAction::Doctor) {
            let fleet = sources
                .list_fleet_environments(pattern)
                .and_then(|fleet| Ok((fleet, sources.list_region_ids(pattern)?)));
            if let Some((fleet, regions)) = loading.take(SourceKind::Custom(DOCTOR_SOURCE.to_string()), fleet)? {
                inputs.fleet = fleet;
                inputs.regions = regions;
                loaded.doctor = true;
            }
        }

        if config.enabled(RunAction::ProductInfoClearinghouse)
            || config.enabled(RunAction::DependenciesClearinghouse)
        {
            let source = SourceKind::Custom(CLEARINGHOUSE_SOURCE.to_string());
            if let Some((summaries, full)) = loading.take(source, load_deliverables(sources, pattern))? {
                inputs.deliverables = summaries;
                inputs.deliverables_full = full;
                loaded.clearinghouse = true;
            }
        }

        let mut pricing = None;
        if config.enabled(RunAction::IncludePricing) {
            let refresh = config.enabled(RunAction::RefreshPricing);
            let source = SourceKind::Custom(PRICING_SOURCE.to_string());
            pricing = loading.take(source, sources.pricing_cache(refresh))?.flatten();
        }

        debug!(
            prior = inputs.prior.len(),
            catalog = inputs.catalog.len(),
            incident = inputs.incident.len(),
            scorecard = inputs.scorecard.len(),
            identity = inputs.identity.len(),
            maturity = inputs.maturity.len(),
            deliverables = inputs.deliverables.len(),
            fleet = inputs.fleet.len(),
            failed = loading.failed.len(),
            "sources loaded"
        );
        Ok(Loaded { inputs, loaded, pricing, failed: loading.failed })
    }
}

// ============================================================================
// SECTION: Output Assembly
// ============================================================================

/// Collects every finalized entity into the output document.
fn collect_output(
    registry: &Registry,
    mut run_log: ValidationLog,
    mut counters: MergeCounters,
) -> Result<MergeOutput, MergeError> {
    let mut records = Vec::new();

    for idx in registry.segment_indices() {
        let entry = registry.segment(idx);
        if entry.phase != EntityPhase::Finalized {
            continue;
        }
        records.push(OutputRecord::Segment {
            record: entry.record.clone(),
            validation: entry.validation.clone(),
            checksum: entry.validation.checksum()?,
        });
        counters.segments += 1;
    }
    for idx in registry.tribe_indices() {
        let entry = registry.tribe(idx);
        if entry.phase != EntityPhase::Finalized {
            continue;
        }
        records.push(OutputRecord::Tribe {
            record: entry.record.clone(),
            validation: entry.validation.clone(),
            checksum: entry.validation.checksum()?,
        });
        counters.tribes += 1;
    }
    for idx in registry.environment_indices() {
        let entry = registry.environment(idx);
        if entry.phase != EntityPhase::Finalized {
            continue;
        }
        records.push(OutputRecord::Environment {
            record: entry.record.clone(),
            validation: entry.validation.clone(),
            checksum: entry.validation.checksum()?,
        });
        counters.environments += 1;
    }
    for idx in registry.service_indices() {
        let entry = registry.service(idx);
        if entry.aborted {
            counters.aborted += 1;
        }
        if entry.phase != EntityPhase::Finalized {
            continue;
        }
        if entry.copied_from_prior {
            counters.copied_from_prior += 1;
        }
        let mut merge_control = entry.merge_control.clone();
        merge_control.canonical_name.clone_from(&entry.record.reference_resource_name);
        records.push(OutputRecord::Service {
            record: Box::new(entry.record.clone()),
            merge_control,
            validation: entry.validation.clone(),
            checksum: entry.validation.checksum()?,
        });
        counters.services += 1;
    }

    records.sort_by_cached_key(OutputRecord::sort_key);
    run_log.sort();
    Ok(MergeOutput { records, run_log, counters })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_order_kinds_before_names() {
        let segment = OutputRecord::Segment {
            record: SegmentRecord::default(),
            validation: ValidationLog::default(),
            checksum: Checksum::default(),
        };
        let service = OutputRecord::Service {
            record: Box::new(ServiceRecord { reference_resource_name: "aaa".to_string(), ..ServiceRecord::default() }),
            merge_control: MergeControl::default(),
            validation: ValidationLog::default(),
            checksum: Checksum::default(),
        };
        assert!(segment.sort_key() < service.sort_key());
        assert_eq!(service.as_service().map(|r| r.reference_resource_name.as_str()), Some("aaa"));
    }
}
