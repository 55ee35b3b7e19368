//! Incremental aggregate metrics and failure diagnostics over the ledger.
//!
//! The engine is fed one accepted record at a time through
//! [`LedgerObserver`] and never rescans history for its counters. History is
//! only consulted to quote successful examples when a failure is analysed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::warn;

use crate::classify::{ErrorType, StepType, classify_error, classify_step};
use crate::config::{FREQUENT_STEP_THRESHOLD, MAX_FAILURE_EXAMPLES, RECURRING_ERROR_THRESHOLD};
use crate::ledger::LedgerObserver;
use crate::record::StepRecord;

/// Diagnostic attached to a failed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub scenario_name: String,
    pub step_name: String,
    pub step_type: StepType,
    pub error_type: ErrorType,
    pub error_message: Option<String>,
    /// Canned remediation hints for `error_type`
    pub hints: Vec<String>,
    /// Earlier passed steps of the same type, as `"<step> (<actual>)"`
    pub successful_examples: Vec<String>,
}

impl FailureAnalysis {
    /// Text block, one entry per report row
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Failure: {} / {}", self.scenario_name, self.step_name),
            format!("Step type: {}", self.step_type),
            format!("Error type: {}", self.error_type),
        ];
        if let Some(message) = &self.error_message {
            lines.push(format!("Error: {}", message));
        }
        if !self.hints.is_empty() {
            lines.push("Suggestions:".to_string());
            lines.extend(self.hints.iter().map(|h| format!("• {}", h)));
        }
        if !self.successful_examples.is_empty() {
            lines.push("Successful examples:".to_string());
            lines.extend(self.successful_examples.iter().map(|e| format!("• {}", e)));
        }
        lines
    }
}

impl fmt::Display for FailureAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

/// Analyse a failed record against the records that preceded it
pub fn analyze_failure(record: &StepRecord, history: &[StepRecord]) -> FailureAnalysis {
    let step_type = classify_step(&record.step_name);
    let error_type = classify_error(record.error_message.as_deref());

    let successful_examples = history
        .iter()
        .filter(|r| r.is_passed() && classify_step(&r.step_name) == step_type)
        .take(MAX_FAILURE_EXAMPLES)
        .map(|r| format!("{} ({})", r.step_name, r.actual_result.as_deref().unwrap_or("")))
        .collect();

    FailureAnalysis {
        scenario_name: record.scenario_name.clone(),
        step_name: record.step_name.clone(),
        step_type,
        error_type,
        error_message: record.error_message.clone(),
        hints: error_type.remediation().iter().map(|h| h.to_string()).collect(),
        successful_examples,
    }
}

/// How often one step name was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCount {
    pub step: String,
    pub count: usize,
}

/// Point-in-time copy of the aggregate metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub record_count: usize,
    /// Percentage of passed records among records with an outcome
    pub success_rate: f64,
    /// Step name counts in first-seen order
    pub step_frequency: Vec<StepCount>,
    pub error_frequency: BTreeMap<ErrorType, usize>,
    pub most_used_step: Option<String>,
    pub total_duration_ms: i64,
    /// Most recently raised recurring-error warning
    pub recurring_error_warning: Option<String>,
    pub recurring_error_warnings: Vec<String>,
    pub frequent_step_warnings: Vec<String>,
    pub failures: Vec<FailureAnalysis>,
}

impl AnalyticsSnapshot {
    pub fn total_duration(&self) -> Duration {
        Duration::milliseconds(self.total_duration_ms)
    }

    /// Success rate formatted for reports, e.g. `80.0%`
    pub fn success_rate_label(&self) -> String {
        format!("{:.1}%", self.success_rate)
    }

    /// Duration formatted for reports in whole seconds, e.g. `12s`
    pub fn duration_label(&self) -> String {
        format!("{}s", self.total_duration().num_seconds())
    }

    /// Step counts sorted by descending count, first-seen order among ties
    pub fn steps_by_frequency(&self) -> Vec<StepCount> {
        let mut steps = self.step_frequency.clone();
        steps.sort_by(|a, b| b.count.cmp(&a.count));
        steps
    }

    /// Error counts sorted by descending count
    pub fn errors_by_frequency(&self) -> Vec<(ErrorType, usize)> {
        let mut errors: Vec<_> = self.error_frequency.iter().map(|(k, v)| (*k, *v)).collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1));
        errors
    }
}

/// Incrementally maintained run metrics
#[derive(Debug, Default)]
pub struct Analytics {
    record_count: usize,
    passed: usize,
    with_outcome: usize,
    step_counts: HashMap<String, usize>,
    step_order: Vec<String>,
    error_counts: BTreeMap<ErrorType, usize>,
    first_time: Option<DateTime<Utc>>,
    last_time: Option<DateTime<Utc>>,
    recurring_raised: HashSet<ErrorType>,
    recurring_warnings: Vec<String>,
    frequent_raised: HashSet<String>,
    frequent_warnings: Vec<String>,
    failures: Vec<FailureAnalysis>,
}

impl Analytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one accepted record into the metrics
    pub fn update(&mut self, record: &StepRecord, history: &[StepRecord]) {
        self.record_count += 1;
        if self.first_time.is_none() {
            self.first_time = Some(record.execution_time);
        }
        self.last_time = Some(record.execution_time);

        if record.status.is_terminal() {
            self.with_outcome += 1;
            if record.is_passed() {
                self.passed += 1;
            }
        }

        let count = match self.step_counts.get_mut(&record.step_name) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                self.step_counts.insert(record.step_name.clone(), 1);
                self.step_order.push(record.step_name.clone());
                1
            }
        };
        if count > FREQUENT_STEP_THRESHOLD && self.frequent_raised.insert(record.step_name.clone()) {
            let message = format!(
                "Step '{}' is used frequently: {} times",
                record.step_name, count
            );
            warn!("{}", message);
            self.frequent_warnings.push(message);
        }

        if record.is_failed() {
            let analysis = analyze_failure(record, history);
            let error_type = analysis.error_type;
            let errors = self.error_counts.entry(error_type).or_insert(0);
            *errors += 1;
            if *errors > RECURRING_ERROR_THRESHOLD && self.recurring_raised.insert(error_type) {
                let message = format!(
                    "Warning: error '{}' occurred {} times. The test may need revision.",
                    error_type, errors
                );
                warn!("{}", message);
                self.recurring_warnings.push(message);
            }
            self.failures.push(analysis);
        }
    }

    /// Percentage of passed records among records with an outcome; `0.0` when none
    pub fn success_rate(&self) -> f64 {
        if self.with_outcome == 0 {
            0.0
        } else {
            self.passed as f64 * 100.0 / self.with_outcome as f64
        }
    }

    /// Most observed step name, first-seen wins ties
    pub fn most_used_step(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for step in &self.step_order {
            let count = self.step_counts.get(step).copied().unwrap_or(0);
            if best.is_none_or(|(_, top)| count > top) {
                best = Some((step.as_str(), count));
            }
        }
        best.map(|(step, _)| step)
    }

    /// Time between the first and the last record; zero with fewer than two
    pub fn total_duration(&self) -> Duration {
        match (self.first_time, self.last_time) {
            (Some(first), Some(last)) if self.record_count >= 2 => last - first,
            _ => Duration::zero(),
        }
    }

    pub fn recurring_error_warning(&self) -> Option<&str> {
        self.recurring_warnings.last().map(String::as_str)
    }

    pub fn error_count(&self, error_type: ErrorType) -> usize {
        self.error_counts.get(&error_type).copied().unwrap_or(0)
    }

    pub fn step_count(&self, step_name: &str) -> usize {
        self.step_counts.get(step_name).copied().unwrap_or(0)
    }

    pub fn failures(&self) -> &[FailureAnalysis] {
        &self.failures
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            record_count: self.record_count,
            success_rate: self.success_rate(),
            step_frequency: self
                .step_order
                .iter()
                .map(|step| StepCount {
                    step: step.clone(),
                    count: self.step_count(step),
                })
                .collect(),
            error_frequency: self.error_counts.clone(),
            most_used_step: self.most_used_step().map(str::to_string),
            total_duration_ms: self.total_duration().num_milliseconds(),
            recurring_error_warning: self.recurring_error_warning().map(str::to_string),
            recurring_error_warnings: self.recurring_warnings.clone(),
            frequent_step_warnings: self.frequent_warnings.clone(),
            failures: self.failures.clone(),
        }
    }

    /// Forget everything; used between independent runs
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl LedgerObserver for Analytics {
    fn on_append(&mut self, record: &StepRecord, history: &[StepRecord]) {
        self.update(record, history);
    }
}
