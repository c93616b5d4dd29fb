// crates/ossmerge-config/src/config.rs
// ============================================================================
// Module: Config Model
// Description: ossmerge.toml sections, loader and validation rules.
// Purpose: Provide a strict configuration surface for merge runs.
// Dependencies: ossmerge-core, regex, serde, thiserror, time, toml
// ============================================================================

//! ## Overview
//! [`OssMergeConfig`] mirrors the file layout section by section. Every
//! section has defaults, so an empty file yields the standard production run.
//! [`OssMergeConfig::validate`] is called by the loader and by
//! [`OssMergeConfig::to_merge_config`]; a configuration that passed it always
//! converts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use ossmerge_core::DoNotMergeNames;
use ossmerge_core::MergeConfig;
use ossmerge_core::NamePattern;
use ossmerge_core::RunAction;
use ossmerge_core::RunActions;
use ossmerge_core::is_canonical_name;
use ossmerge_core::runtime::context::DEFAULT_CLOUD_PLATFORM_NAME;
use ossmerge_core::runtime::context::DEFAULT_DELIVERABLE_BLACKLIST;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default config file name.
pub const DEFAULT_CONFIG_NAME: &str = "ossmerge.toml";
/// Environment variable overriding the config path.
pub const CONFIG_ENV_VAR: &str = "OSSMERGE_CONFIG";
/// Maximum config file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of one path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Characters allowed in a name pattern.
const PATTERN_SYNTAX: &str = r"^[A-Za-z0-9*._ -]+$";
/// Format of `run.reference_date`.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
/// Accepted logging levels.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The file is not valid TOML for the model.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The configuration violates a rule.
    #[error("config invalid: {0}")]
    Invalid(String),
}

/// Builds an [`ConfigError::Invalid`].
fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// `[run]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// Enabled run-action names.
    pub actions: Vec<String>,
    /// Glob pattern restricting loaded names.
    pub pattern: String,
    /// Reference date for tag expiry, `YYYY-MM-DD`; today when unset.
    pub reference_date: Option<String>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            actions: RunActions::standard().iter().map(|action| action.as_str().to_string()).collect(),
            pattern: "*".to_string(),
            reference_date: None,
        }
    }
}

/// `[naming]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingSection {
    /// Names that are never folded together with other names.
    pub do_not_merge: Vec<String>,
}

/// `[clearinghouse]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClearingHouseSection {
    /// Deliverable-name fragments excluded from shared-name matching.
    pub blacklist: Vec<String>,
}

impl Default for ClearingHouseSection {
    fn default() -> Self {
        Self { blacklist: DEFAULT_DELIVERABLE_BLACKLIST.iter().map(|entry| (*entry).to_string()).collect() }
    }
}

/// `[platform]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformSection {
    /// Canonical name of the cloud platform record.
    pub cloud_platform_name: String,
    /// Expected tier-1 support assignment-group prefixes.
    pub support_tier1_prefixes: Vec<String>,
    /// Expected tier-1 operations assignment-group prefixes.
    pub operations_tier1_prefixes: Vec<String>,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            cloud_platform_name: DEFAULT_CLOUD_PLATFORM_NAME.to_string(),
            support_tier1_prefixes: Vec::new(),
            operations_tier1_prefixes: Vec::new(),
        }
    }
}

/// `[inputs]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputsSection {
    /// Snapshot document with every source directory.
    pub snapshot: Option<PathBuf>,
    /// Static parts-input table.
    pub parts: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Default level when `OSSMERGE_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Text }
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Complete `ossmerge.toml` model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OssMergeConfig {
    /// Run parameters.
    pub run: RunSection,
    /// Naming rules.
    pub naming: NamingSection,
    /// Clearinghouse rules.
    pub clearinghouse: ClearingHouseSection,
    /// Platform constants.
    pub platform: PlatformSection,
    /// Input files.
    pub inputs: InputsSection,
    /// Logging setup.
    pub logging: LoggingSection,
}

impl OssMergeConfig {
    /// Loads and validates the configuration file.
    ///
    /// The path is `path` when given, else `OSSMERGE_CONFIG`, else
    /// `ossmerge.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(invalid("config file exceeds size limit"));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_| invalid("config file must be utf-8"))?;
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text is malformed or invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let actions = self.run_actions()?;
        require_companion(actions, RunAction::RmcRescan, RunAction::Rmc)?;
        require_companion(actions, RunAction::RefreshPricing, RunAction::IncludePricing)?;
        validate_pattern(&self.run.pattern)?;
        self.reference_date()?;

        if self.naming.do_not_merge.iter().any(|name| name.trim().is_empty()) {
            return Err(invalid("naming.do_not_merge entries must be non-empty"));
        }
        if self.clearinghouse.blacklist.iter().any(|entry| entry.trim().is_empty()) {
            return Err(invalid("clearinghouse.blacklist entries must be non-empty"));
        }

        let platform = &self.platform;
        if platform.cloud_platform_name.trim().is_empty() {
            return Err(invalid("platform.cloud_platform_name is required"));
        }
        if !is_canonical_name(&platform.cloud_platform_name) {
            return Err(invalid(format!(
                "platform.cloud_platform_name must be a canonical name: {}",
                platform.cloud_platform_name
            )));
        }
        let mut prefixes = platform.support_tier1_prefixes.iter().chain(&platform.operations_tier1_prefixes);
        if prefixes.any(|prefix| prefix.trim().is_empty()) {
            return Err(invalid("platform tier-1 prefixes must be non-empty"));
        }

        for path in [&self.inputs.snapshot, &self.inputs.parts].into_iter().flatten() {
            validate_path(path)?;
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of {}: {}",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Returns the parsed run-action set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown action names.
    pub fn run_actions(&self) -> Result<RunActions, ConfigError> {
        self.run
            .actions
            .iter()
            .map(|name| RunAction::from_str(name.trim()).map_err(|err| invalid(format!("run.actions: {err}"))))
            .collect()
    }

    /// Returns the configured reference date, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the date is malformed.
    pub fn reference_date(&self) -> Result<Option<Date>, ConfigError> {
        self.run
            .reference_date
            .as_deref()
            .map(|raw| {
                Date::parse(raw.trim(), DATE_FORMAT)
                    .map_err(|_| invalid(format!("run.reference_date must be YYYY-MM-DD: {raw}")))
            })
            .transpose()
    }

    /// Converts the configuration into a core merge configuration.
    ///
    /// `today` is used when `run.reference_date` is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when validation fails.
    pub fn to_merge_config(&self, today: Date) -> Result<MergeConfig, ConfigError> {
        self.validate()?;
        Ok(MergeConfig {
            actions: self.run_actions()?,
            pattern: self.run.pattern.trim().to_string(),
            reference_date: self.reference_date()?.unwrap_or(today),
            do_not_merge: DoNotMergeNames::new(self.naming.do_not_merge.iter().cloned()),
            deliverable_blacklist: self.clearinghouse.blacklist.clone(),
            cloud_platform_name: self.platform.cloud_platform_name.clone(),
            support_tier1_prefixes: self.platform.support_tier1_prefixes.clone(),
            operations_tier1_prefixes: self.platform.operations_tier1_prefixes.clone(),
        })
    }
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Rejects `dependent` enabled without `required`.
fn require_companion(actions: RunActions, dependent: RunAction, required: RunAction) -> Result<(), ConfigError> {
    if actions.contains(dependent) && !actions.contains(required) {
        return Err(invalid(format!("run action {dependent} requires {required}")));
    }
    Ok(())
}

/// Checks the character set of a name pattern and that it compiles.
fn validate_pattern(pattern: &str) -> Result<(), ConfigError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(invalid("run.pattern is required"));
    }
    let syntax = Regex::new(PATTERN_SYNTAX).map_err(|err| invalid(err.to_string()))?;
    if !syntax.is_match(pattern) {
        return Err(invalid(format!("run.pattern contains unsupported characters: {pattern}")));
    }
    NamePattern::new(pattern).map_err(|err| invalid(format!("run.pattern: {err}")))?;
    Ok(())
}

/// Resolves the config path from explicit input or environment.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(invalid("config path exceeds max length"));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates path length and components.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(invalid("config path exceeds max length"));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(invalid("config path component too long"));
        }
    }
    Ok(())
}
