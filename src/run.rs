//! One test run: a ledger plus the engines it feeds.
//!
//! A `TestRun` is an owned value. Hooks receive it by `&mut` and parallel
//! workers each build their own, so no state is shared between runs.

use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::warn;

use crate::analytics::{Analytics, AnalyticsSnapshot};
use crate::clock::Clock;
use crate::error::ReportResult;
use crate::ledger::Ledger;
use crate::record::{StepObservation, StepRecord};
use crate::report::ReportRenderer;
use crate::suggest::SuggestionEngine;

/// Ledger, analytics and suggestions for a single run
#[derive(Debug, Default)]
pub struct TestRun {
    ledger: Ledger,
    analytics: Analytics,
    suggestions: SuggestionEngine,
}

impl TestRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run whose records are stamped by `clock`
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            ledger: Ledger::with_clock(clock),
            analytics: Analytics::new(),
            suggestions: SuggestionEngine::new(),
        }
    }

    /// Record one step; `false` when the step was already reported
    pub fn record(&mut self, observation: StepObservation) -> bool {
        self.ledger
            .append_with(observation, &mut [&mut self.analytics, &mut self.suggestions])
    }

    /// Record one JSON observation per line. Blank lines are ignored and
    /// malformed lines are logged and counted, never fatal.
    pub fn ingest_json_lines<R: BufRead>(&mut self, reader: R) -> ReportResult<IngestStats> {
        let mut stats = IngestStats::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StepObservation>(&line) {
                Ok(observation) => {
                    if self.record(observation) {
                        stats.accepted += 1;
                    } else {
                        stats.duplicates += 1;
                    }
                }
                Err(e) => {
                    warn!(line = i + 1, error = %e, "skipping malformed observation");
                    stats.malformed += 1;
                }
            }
        }
        Ok(stats)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn records(&self) -> Vec<StepRecord> {
        self.ledger.all()
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        self.analytics.snapshot()
    }

    /// Suggestions for the most recently recorded step
    pub fn suggestions(&self) -> &[String] {
        self.suggestions.latest()
    }

    /// Write the report for the current state of the run
    pub fn render(&self, renderer: &ReportRenderer, run_name: &str) -> ReportResult<PathBuf> {
        renderer.render(&self.ledger.all(), &self.snapshot(), self.suggestions(), run_name)
    }

    /// Start over for an independent run
    pub fn reset(&mut self) {
        self.ledger.reset();
        self.analytics.reset();
        self.suggestions.reset();
    }

    pub fn summary(&self) -> RunSummary {
        let records = self.ledger.records();
        RunSummary {
            total: records.len(),
            passed: records.iter().filter(|r| r.is_passed()).count(),
            failed: records.iter().filter(|r| r.is_failed()).count(),
            success_rate: self.analytics.success_rate(),
        }
    }
}

/// Outcome of a JSON-lines ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

/// Counts printed at the end of a scenario or run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub success_rate: f64,
}
