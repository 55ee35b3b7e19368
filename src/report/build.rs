//! Pure transform from run state to the report document.

use crate::analytics::AnalyticsSnapshot;
use crate::record::StepRecord;
use crate::report::model::{Row, RowStyle, Sheet, Workbook};

pub const RESULTS_SHEET: &str = "Results";
pub const ANALYSIS_SHEET: &str = "Analysis";
pub const SUGGESTIONS_SHEET: &str = "Suggestions";

/// Header row of the Results sheet, part of the report contract
pub const RESULTS_COLUMNS: [&str; 9] = [
    "Scenario",
    "Step",
    "Status",
    "Platform",
    "Expected",
    "Actual",
    "ErrorMessage",
    "URL",
    "Timestamp",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build the three-sheet report document
pub fn build_workbook(
    records: &[StepRecord],
    analytics: &AnalyticsSnapshot,
    suggestions: &[String],
) -> Workbook {
    Workbook {
        sheets: vec![
            results_sheet(records),
            analysis_sheet(analytics),
            suggestions_sheet(analytics, suggestions),
        ],
    }
}

fn results_sheet(records: &[StepRecord]) -> Sheet {
    let mut sheet = Sheet::new(RESULTS_SHEET).widths(&[24.0; 9]);
    sheet.push(Row::new(RESULTS_COLUMNS).styled(RowStyle::Header));

    for record in records {
        let style = if record.is_failed() {
            RowStyle::Flagged
        } else {
            RowStyle::Plain
        };
        let row = Row::new([
            record.scenario_name.clone(),
            record.step_name.clone(),
            record.status.label().to_string(),
            record.platform.clone(),
            record.expected_result.clone().unwrap_or_default(),
            record.actual_result.clone().unwrap_or_default(),
            record.error_message.clone().unwrap_or_default(),
            record.url.clone().unwrap_or_default(),
            record.execution_time.format(TIMESTAMP_FORMAT).to_string(),
        ])
        .styled(style);
        sheet.push(row);
    }
    sheet
}

fn analysis_sheet(analytics: &AnalyticsSnapshot) -> Sheet {
    let mut sheet = Sheet::new(ANALYSIS_SHEET).widths(&[60.0, 40.0]);

    sheet.push(Row::new(["General statistics"]).styled(RowStyle::Header));
    sheet.push(Row::new(["Success rate".to_string(), analytics.success_rate_label()]));
    sheet.push(Row::new([
        "Most used step".to_string(),
        analytics.most_used_step.clone().unwrap_or_else(|| "None".to_string()),
    ]));
    sheet.push(Row::new(["Total duration".to_string(), analytics.duration_label()]));
    sheet.push(Row::new([
        "Steps recorded".to_string(),
        analytics.record_count.to_string(),
    ]));

    let warnings: Vec<&String> = analytics
        .recurring_error_warnings
        .iter()
        .chain(&analytics.frequent_step_warnings)
        .collect();
    if !warnings.is_empty() {
        sheet.push(Row::blank());
        sheet.push(Row::new(["Warnings"]).styled(RowStyle::Header));
        for warning in warnings {
            sheet.push(Row::new([warning.as_str()]));
        }
    }

    if !analytics.failures.is_empty() {
        sheet.push(Row::blank());
        sheet.push(Row::new(["Failure analysis"]).styled(RowStyle::Header));
        for (i, failure) in analytics.failures.iter().enumerate() {
            if i > 0 {
                sheet.push(Row::blank());
            }
            for line in failure.lines() {
                sheet.push(Row::new([line]));
            }
        }
    }
    sheet
}

fn suggestions_sheet(analytics: &AnalyticsSnapshot, suggestions: &[String]) -> Sheet {
    let mut sheet = Sheet::new(SUGGESTIONS_SHEET).widths(&[60.0, 16.0]);

    sheet.push(Row::new(["Suggested next steps"]).styled(RowStyle::Header));
    for suggestion in suggestions {
        sheet.push(Row::new([format!("• {}", suggestion)]));
    }

    sheet.push(Row::blank());
    sheet.push(Row::new(["Step frequency", "Count"]).styled(RowStyle::Header));
    for entry in analytics.steps_by_frequency() {
        sheet.push(Row::new([entry.step, entry.count.to_string()]));
    }

    let errors = analytics.errors_by_frequency();
    if !errors.is_empty() {
        sheet.push(Row::blank());
        sheet.push(Row::new(["Error frequency", "Count"]).styled(RowStyle::Header));
        for (error_type, count) in errors {
            sheet.push(Row::new([error_type.to_string(), count.to_string()]));
        }
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::record::StepObservation;
    use crate::run::TestRun;

    fn sample_run() -> TestRun {
        let mut run = TestRun::with_clock(ManualClock::ticking_seconds());
        run.record(StepObservation::new("Home", "Open home").passed());
        run.record(StepObservation::new("Home", "Open home").url("https://radio").passed());
        run.record(StepObservation::new("Search", "Search 'jazz'").failed("element not found: input"));
        run
    }

    fn workbook(run: &TestRun) -> Workbook {
        build_workbook(&run.records(), &run.snapshot(), run.suggestions())
    }

    #[test]
    fn test_sheet_names_and_order() {
        let wb = workbook(&sample_run());
        assert_eq!(wb.sheet_names(), vec![RESULTS_SHEET, ANALYSIS_SHEET, SUGGESTIONS_SHEET]);
    }

    #[test]
    fn test_results_rows_and_flags() {
        let run = sample_run();
        let wb = workbook(&run);
        let results = wb.sheet(RESULTS_SHEET).unwrap();
        assert_eq!(results.rows.len(), run.ledger().len() + 1);
        assert_eq!(results.rows[0].cells, RESULTS_COLUMNS.to_vec());
        let flagged: Vec<bool> = results.rows[1..]
            .iter()
            .map(|r| r.style == RowStyle::Flagged)
            .collect();
        assert_eq!(flagged, vec![false, false, true]);
        // missing optionals render empty
        assert_eq!(results.rows[1].cells[7], "");
        assert_eq!(results.rows[1].cells[8], "1970-01-01 00:00:00");
    }

    #[test]
    fn test_analysis_contains_failure_block() {
        let wb = workbook(&sample_run());
        let text: Vec<String> = wb
            .sheet(ANALYSIS_SHEET)
            .unwrap()
            .rows
            .iter()
            .flat_map(|r| r.cells.clone())
            .collect();
        assert!(text.contains(&"66.7%".to_string()));
        assert!(text.contains(&"Error type: element_not_found".to_string()));
        assert!(text.contains(&"• verify selector".to_string()));
    }

    #[test]
    fn test_suggestions_sorted_by_count() {
        let wb = workbook(&sample_run());
        let rows = &wb.sheet(SUGGESTIONS_SHEET).unwrap().rows;
        let start = rows
            .iter()
            .position(|r| r.cells.first().map(String::as_str) == Some("Step frequency"))
            .unwrap();
        assert_eq!(rows[start + 1].cells, vec!["Open home", "2"]);
        assert_eq!(rows[start + 2].cells, vec!["Search 'jazz'", "1"]);
    }
}
