//! Scenario lifecycle helpers for test runners.
//!
//! A runner calls `before_scenario`, then `step` for every executed step,
//! then `after_scenario`; once all scenarios are done `after_run` writes the
//! report. None of these calls can fail the run.

use std::path::PathBuf;

use tracing::{error, info};

use crate::record::{StepObservation, StepStatus};
use crate::report::ReportRenderer;
use crate::run::{RunSummary, TestRun};

/// Step name recorded when a scenario begins
pub const START_STEP: &str = "Test start";

/// Step name recorded when a scenario ends
pub const END_STEP: &str = "Test end";

#[derive(Debug, Default)]
pub struct ScenarioHooks {
    run: TestRun,
    platform: Option<String>,
}

impl ScenarioHooks {
    pub fn new(run: TestRun) -> Self {
        Self { run, platform: None }
    }

    /// Record the scenario start and log what usually comes next
    pub fn before_scenario(&mut self, name: &str, platform: &str) -> bool {
        self.platform = Some(platform.to_string());
        let accepted = self.run.record(
            StepObservation::new(name, START_STEP)
                .status(StepStatus::Started)
                .platform(platform)
                .expected(format!("{} session starts", platform)),
        );

        let suggestions = self.run.suggestions();
        if !suggestions.is_empty() {
            info!(scenario = name, suggestions = ?suggestions, "suggested steps");
        }
        accepted
    }

    /// Record one executed step, applying the scenario platform when set
    pub fn step(&mut self, observation: StepObservation) -> bool {
        let observation = match &self.platform {
            Some(platform) => observation.platform(platform.clone()),
            None => observation,
        };
        self.run.record(observation)
    }

    /// Record the scenario outcome and log a one-line summary
    pub fn after_scenario(
        &mut self,
        name: &str,
        failed: bool,
        url: Option<&str>,
        actual: Option<&str>,
    ) -> bool {
        let mut end = StepObservation::new(name, END_STEP);
        if let Some(platform) = &self.platform {
            end = end.platform(platform.clone());
        }
        if let Some(url) = url {
            end = end.url(url);
        }
        end = if failed {
            end.failed("Scenario failed")
        } else {
            end.passed()
        };
        end = end.actual(actual.unwrap_or(if failed {
            "Scenario failed"
        } else {
            "Scenario completed"
        }));

        let accepted = self.run.record(end);
        let summary = self.run.summary();
        info!(
            scenario = name,
            status = if failed { "FAILED" } else { "PASSED" },
            steps = summary.total,
            success_rate = %format!("{:.1}%", summary.success_rate),
            "scenario finished"
        );
        if failed {
            if let Some(analysis) = self.run.analytics().failures().last() {
                info!("failure analysis:\n{}", analysis);
            }
        }
        self.platform = None;
        accepted
    }

    /// Render the run report. Failures are logged and yield `None`.
    pub fn after_run(&self, renderer: &ReportRenderer, run_name: &str) -> Option<PathBuf> {
        match self.run.render(renderer, run_name) {
            Ok(path) => Some(path),
            Err(e) => {
                error!(
                    run = run_name,
                    dir = %renderer.reports_dir().display(),
                    error = %e,
                    "could not write test report"
                );
                None
            }
        }
    }

    pub fn run(&self) -> &TestRun {
        &self.run
    }

    pub fn summary(&self) -> RunSummary {
        self.run.summary()
    }

    pub fn into_run(self) -> TestRun {
        self.run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::fs;

    fn hooks() -> ScenarioHooks {
        ScenarioHooks::new(TestRun::with_clock(ManualClock::ticking_seconds()))
    }

    #[test]
    fn test_lifecycle_records_start_and_end() {
        let mut hooks = hooks();
        hooks.before_scenario("Listen live", "Android");
        hooks.step(StepObservation::new("Listen live", "Click play").passed());
        hooks.after_scenario("Listen live", false, Some("https://radio/live"), None);

        let records = hooks.run().records();
        let steps: Vec<&str> = records.iter().map(|r| r.step_name.as_str()).collect();
        assert_eq!(steps, vec![START_STEP, "Click play", END_STEP]);
        assert_eq!(records[0].status, StepStatus::Started);
        assert!(records.iter().all(|r| r.platform == "Android"));
        assert_eq!(records[2].url.as_deref(), Some("https://radio/live"));
        assert_eq!(records[2].actual_result.as_deref(), Some("Scenario completed"));
    }

    #[test]
    fn test_failed_scenario_end_is_flagged() {
        let mut hooks = hooks();
        hooks.before_scenario("Search", "Web");
        hooks.after_scenario("Search", true, None, Some("screenshot attached"));

        let last = hooks.run().ledger().last().cloned().unwrap();
        assert!(last.is_failed());
        assert_eq!(last.actual_result.as_deref(), Some("screenshot attached"));
        assert_eq!(hooks.summary().failed, 1);
    }

    #[test]
    fn test_after_run_failure_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let mut hooks = hooks();
        hooks.before_scenario("S", "Web");
        assert!(hooks.after_run(&ReportRenderer::new(&blocker), "Run").is_none());
    }

    #[test]
    fn test_after_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut hooks = hooks();
        hooks.before_scenario("S", "Web");
        hooks.after_scenario("S", false, None, None);
        let path = hooks
            .after_run(&ReportRenderer::new(dir.path()).manifest(false), "Run")
            .unwrap();
        assert!(path.exists());
    }
}
