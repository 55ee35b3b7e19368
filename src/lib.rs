//! Step Telemetry - execution ledger, analytics and spreadsheet reports for
//! UI automation runs.
//!
//! This crate provides:
//! - A deduplicating ledger of executed steps with monotonic timestamps
//! - Keyword classification of step names and error messages
//! - Running analytics (success rate, step/error frequencies, failure analysis)
//! - Next-step suggestions from successful history
//! - A three-sheet xlsx report with an optional JSON manifest
//! - Gherkin feature-file generation from a step catalog
//!
//! # Example
//!
//! ```rust,no_run
//! use step_telemetry::{ReportRenderer, StepObservation, TestRun};
//!
//! let mut run = TestRun::new();
//! run.record(StepObservation::new("Search", "Open home").passed());
//! run.record(StepObservation::new("Search", "Search 'jazz'").failed("element not found: input"));
//!
//! let path = run.render(&ReportRenderer::default(), "Nightly").unwrap();
//! println!("report: {}", path.display());
//! ```

pub mod analytics;
pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod feature;
pub mod hooks;
pub mod ledger;
pub mod record;
pub mod report;
pub mod run;
pub mod suggest;

// Re-export the data model
pub use record::{StepKey, StepObservation, StepRecord, StepStatus};

// Re-export classification
pub use classify::{ErrorType, StepType, classify_error, classify_step};

// Re-export the run pipeline
pub use analytics::{Analytics, AnalyticsSnapshot, FailureAnalysis, analyze_failure};
pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{Ledger, LedgerObserver};
pub use run::{IngestStats, RunSummary, TestRun};
pub use suggest::{SuggestionEngine, suggest_next};

// Re-export reporting
pub use error::{ReportError, ReportResult};
pub use report::{ReportFormat, ReportManifest, ReportRenderer, Workbook, read_report, read_workbook};

// Re-export runner integration
pub use feature::{FeatureFile, Keyword, StepCatalog};
pub use hooks::ScenarioHooks;
