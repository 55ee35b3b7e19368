//! Step observations and the stamped records kept by the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::DEFAULT_PLATFORM;

/// Outcome reported for one test step
///
/// Deserializes through [`FromStr`], so any casing of the English names and
/// the French suite labels is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum StepStatus {
    /// Step began but no outcome was reported yet
    #[default]
    Started,
    Passed,
    Failed,
    Warning,
    Error,
}

impl StepStatus {
    /// Label written to reports
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Started => "STARTED",
            StepStatus::Passed => "PASSED",
            StepStatus::Failed => "FAILED",
            StepStatus::Warning => "WARNING",
            StepStatus::Error => "ERROR",
        }
    }

    /// Whether the step has reached an outcome (anything but `Started`)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Started)
    }
}

impl TryFrom<String> for StepStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StepStatus {
    type Err = String;

    /// Parses English names and the French labels used by the web/android suites
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "started" | "demarre" | "démarré" => Ok(StepStatus::Started),
            "passed" | "pass" | "reussi" | "réussi" => Ok(StepStatus::Passed),
            "failed" | "fail" | "echec" | "échec" => Ok(StepStatus::Failed),
            "warning" | "warn" => Ok(StepStatus::Warning),
            "error" | "erreur" => Ok(StepStatus::Error),
            other => Err(format!("unknown step status '{}'", other)),
        }
    }
}

/// What a hook reports about a finished step.
///
/// Built fresh for every step and handed to the ledger by value; the ledger
/// assigns the execution time when it accepts the observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepObservation {
    pub scenario_name: String,
    pub step_name: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub expected_result: Option<String>,
    #[serde(default)]
    pub actual_result: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_string()
}

impl StepObservation {
    /// Create an observation with status `Started` on the default platform
    pub fn new(scenario_name: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            step_name: step_name.into(),
            status: StepStatus::Started,
            platform: default_platform(),
            expected_result: None,
            actual_result: None,
            error_message: None,
            url: None,
        }
    }

    pub fn status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected_result = Some(expected.into());
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual_result = Some(actual.into());
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Shorthand for `.status(StepStatus::Passed)`
    pub fn passed(self) -> Self {
        self.status(StepStatus::Passed)
    }

    /// Shorthand for a failed step carrying its error text
    pub fn failed(self, message: impl Into<String>) -> Self {
        self.status(StepStatus::Failed).error(message)
    }
}

/// Identity used for deduplication: `(scenario, step, url)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepKey {
    pub scenario_name: String,
    pub step_name: String,
    pub url: Option<String>,
}

/// One accepted observation, stamped by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub scenario_name: String,
    pub step_name: String,
    pub status: StepStatus,
    pub platform: String,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub error_message: Option<String>,
    pub url: Option<String>,
    /// Assigned at ingestion; non-decreasing in ledger order
    pub execution_time: DateTime<Utc>,
}

impl StepRecord {
    pub(crate) fn stamp(observation: StepObservation, execution_time: DateTime<Utc>) -> Self {
        Self {
            scenario_name: observation.scenario_name,
            step_name: observation.step_name,
            status: observation.status,
            platform: observation.platform,
            expected_result: observation.expected_result,
            actual_result: observation.actual_result,
            error_message: observation.error_message,
            url: observation.url,
            execution_time,
        }
    }

    pub fn key(&self) -> StepKey {
        StepKey {
            scenario_name: self.scenario_name.clone(),
            step_name: self.step_name.clone(),
            url: self.url.clone(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }

    pub fn is_passed(&self) -> bool {
        self.status == StepStatus::Passed
    }
}

impl StepObservation {
    pub fn key(&self) -> StepKey {
        StepKey {
            scenario_name: self.scenario_name.clone(),
            step_name: self.step_name.clone(),
            url: self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_platform_defaults_to_web() {
        let obs: StepObservation =
            serde_json::from_str(r#"{"scenario_name":"S","step_name":"Open home"}"#).unwrap();
        assert_eq!(obs.platform, "Web");
        assert_eq!(StepObservation::new("S", "Open home").platform, DEFAULT_PLATFORM);
    }

    #[test]
    fn test_status_parses_french_labels() {
        assert_eq!("REUSSI".parse::<StepStatus>(), Ok(StepStatus::Passed));
        assert_eq!("Échec".parse::<StepStatus>(), Ok(StepStatus::Failed));
        assert_eq!("DÉMARRÉ".parse::<StepStatus>(), Ok(StepStatus::Started));
        assert!("bogus".parse::<StepStatus>().is_err());
    }

    #[test]
    fn test_observation_defaults_to_started() {
        let obs = StepObservation::new("Home", "Open home");
        assert_eq!(obs.status, StepStatus::Started);
        assert!(obs.url.is_none());
    }

    #[test]
    fn test_observation_deserializes_with_missing_optionals() {
        let obs: StepObservation = serde_json::from_str(
            r#"{"scenario_name":"Search","step_name":"Search 'jazz'","status":"ECHEC","platform":"Android"}"#,
        )
        .unwrap();
        assert_eq!(obs.status, StepStatus::Failed);
        assert_eq!(obs.platform, "Android");
        assert!(obs.error_message.is_none());
    }

    #[test]
    fn test_status_deserializes_any_casing() {
        let statuses = [
            ("Passed", StepStatus::Passed),
            ("FAILED", StepStatus::Failed),
            ("Started", StepStatus::Started),
            ("passed", StepStatus::Passed),
            ("Réussi", StepStatus::Passed),
            ("Echec", StepStatus::Failed),
            ("démarré", StepStatus::Started),
            ("Warning", StepStatus::Warning),
            ("Erreur", StepStatus::Error),
        ];
        for (label, expected) in statuses {
            let line = format!(
                r#"{{"scenario_name":"S","step_name":"x","status":"{}"}}"#,
                label
            );
            let obs: StepObservation = serde_json::from_str(&line).unwrap();
            assert_eq!(obs.status, expected, "status {}", label);
        }
        assert!(serde_json::from_str::<StepStatus>(r#""bogus""#).is_err());
    }

    #[test]
    fn test_status_serializes_snake_case_and_reads_back() {
        let json = serde_json::to_string(&StepStatus::Passed).unwrap();
        assert_eq!(json, r#""passed""#);
        assert_eq!(serde_json::from_str::<StepStatus>(&json).unwrap(), StepStatus::Passed);
    }

    #[test]
    fn test_key_includes_url() {
        let a = StepObservation::new("S", "Step").url("https://a");
        let b = StepObservation::new("S", "Step").url("https://b");
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().passed().key());
    }
}
