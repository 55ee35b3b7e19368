//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for step telemetry, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for a run started from a project root
//! - Builder-style overrides for programmatic configuration
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `STEP_TELEMETRY_REPORTS_DIR` | Directory receiving rendered reports | `target/test-reports` |
//! | `STEP_TELEMETRY_RUN_NAME` | Run name used when none is given | `TestRun` |
//! | `STEP_TELEMETRY_MANIFEST` | Write a JSON manifest next to each report | `true` |
//! | `STEP_TELEMETRY_FEATURES_DIR` | Directory receiving generated feature files | `features` |
//!
//! # Example
//!
//! ```bash
//! export STEP_TELEMETRY_REPORTS_DIR="/var/tmp/radio-reports"
//! export STEP_TELEMETRY_MANIFEST=false
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default reports directory (relative to the working directory)
pub const DEFAULT_REPORTS_DIR: &str = "target/test-reports";

/// Platform label stamped on observations that do not set one
pub const DEFAULT_PLATFORM: &str = "Web";

/// Default run name
pub const DEFAULT_RUN_NAME: &str = "TestRun";

/// Default for manifest generation
pub const DEFAULT_WRITE_MANIFEST: bool = true;

/// Default directory for generated feature files
pub const DEFAULT_FEATURES_DIR: &str = "features";

// ============================================================================
// Heuristic thresholds
// ============================================================================

/// An error type seen more often than this raises the recurring-error warning
pub const RECURRING_ERROR_THRESHOLD: usize = 3;

/// A step name seen more often than this raises the frequent-step warning
pub const FREQUENT_STEP_THRESHOLD: usize = 5;

/// Upper bound on next-step suggestions
pub const MAX_SUGGESTIONS: usize = 3;

/// Upper bound on successful examples quoted in a failure analysis
pub const MAX_FAILURE_EXAMPLES: usize = 3;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the reports directory
pub const ENV_REPORTS_DIR: &str = "STEP_TELEMETRY_REPORTS_DIR";

/// Environment variable for the default run name
pub const ENV_RUN_NAME: &str = "STEP_TELEMETRY_RUN_NAME";

/// Environment variable toggling manifest output
pub const ENV_MANIFEST: &str = "STEP_TELEMETRY_MANIFEST";

/// Environment variable for the feature output directory
pub const ENV_FEATURES_DIR: &str = "STEP_TELEMETRY_FEATURES_DIR";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for step telemetry
#[derive(Debug, Clone)]
pub struct Config {
    /// Report output settings
    pub report: ReportSettings,
    /// Values applied to observations that do not set them
    pub defaults: DefaultSettings,
}

/// Report-related settings
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Directory where reports are written (created on demand)
    pub reports_dir: PathBuf,
    /// Whether a JSON manifest accompanies each workbook
    pub write_manifest: bool,
    /// Directory where generated feature files are written
    pub features_dir: PathBuf,
}

/// Defaults for renders
#[derive(Debug, Clone)]
pub struct DefaultSettings {
    /// Run name used for report file names
    pub run_name: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            report: ReportSettings::from_env(),
            defaults: DefaultSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            report: ReportSettings::defaults(),
            defaults: DefaultSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ReportSettings {
    /// Create report settings from environment variables
    pub fn from_env() -> Self {
        Self {
            reports_dir: env::var(ENV_REPORTS_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORTS_DIR)),
            write_manifest: env::var(ENV_MANIFEST)
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(DEFAULT_WRITE_MANIFEST),
            features_dir: env::var(ENV_FEATURES_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_FEATURES_DIR)),
        }
    }

    /// Create report settings with defaults
    pub fn defaults() -> Self {
        Self {
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            write_manifest: DEFAULT_WRITE_MANIFEST,
            features_dir: PathBuf::from(DEFAULT_FEATURES_DIR),
        }
    }
}

impl DefaultSettings {
    /// Create default settings from environment variables
    pub fn from_env() -> Self {
        Self {
            run_name: env::var(ENV_RUN_NAME).unwrap_or_else(|_| DEFAULT_RUN_NAME.to_string()),
        }
    }

    /// Create default settings with hardcoded defaults
    pub fn defaults() -> Self {
        Self {
            run_name: DEFAULT_RUN_NAME.to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a boolean flag as written in shells and CI configs
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the reports directory (convenience function)
pub fn reports_dir() -> PathBuf {
    get().report.reports_dir.clone()
}

/// Get the default run name (convenience function)
pub fn default_run_name() -> String {
    get().defaults.run_name.clone()
}

/// Get the feature output directory (convenience function)
pub fn features_dir() -> PathBuf {
    get().report.features_dir.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" YES "), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid() {
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.report.reports_dir, PathBuf::from(DEFAULT_REPORTS_DIR));
        assert!(config.report.write_manifest);
        assert_eq!(config.defaults.run_name, DEFAULT_RUN_NAME);
    }

    #[test]
    fn test_reports_dir_getter_matches_cached_config() {
        assert_eq!(reports_dir(), get().report.reports_dir);
    }
}
