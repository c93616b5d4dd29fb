// crates/ossmerge-config/src/lib.rs
// ============================================================================
// Module: OSS Merge Config
// Description: Canonical ossmerge.toml model, loading and validation.
// Purpose: Turn an operator configuration file into a core merge configuration.
// Dependencies: ossmerge-core, regex, serde, thiserror, time, toml
// ============================================================================

//! ## Overview
//! The configuration file is resolved from an explicit path, the
//! `OSSMERGE_CONFIG` environment variable or `ossmerge.toml` in the working
//! directory. Loading is fail-closed: oversized, non-UTF-8, malformed or
//! inconsistent files are rejected before any merge starts.

pub mod config;

pub use config::CONFIG_ENV_VAR;
pub use config::ClearingHouseSection;
pub use config::ConfigError;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::InputsSection;
pub use config::LogFormat;
pub use config::LoggingSection;
pub use config::NamingSection;
pub use config::OssMergeConfig;
pub use config::PlatformSection;
pub use config::RunSection;
