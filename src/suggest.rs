//! "Likely next step" hints from successful history and a static table.

use tracing::debug;

use crate::classify::{StepType, classify_step};
use crate::config::MAX_SUGGESTIONS;
use crate::ledger::LedgerObserver;
use crate::record::StepRecord;

/// Predefined follow-up steps per step type
pub fn predefined_suggestions(step_type: StepType) -> &'static [&'static str] {
    match step_type {
        StepType::PageAccueil => &["click search button", "check main menu", "check logo"],
        StepType::Recherche => &["enter search term", "check results", "click a result"],
        StepType::Click => &["check the page reacted", "check the current url"],
        StepType::Verification => &["take a screenshot of the verified area"],
        StepType::Other => &[],
    }
}

/// Step names that directly followed a passed occurrence of `step_name`.
///
/// Matching is case-insensitive; only the ledger entry immediately after a
/// match qualifies.
pub fn historical_next_steps(step_name: &str, history: &[StepRecord]) -> Vec<String> {
    let wanted = step_name.to_lowercase();
    history
        .windows(2)
        .filter(|pair| pair[0].is_passed() && pair[0].step_name.to_lowercase() == wanted)
        .map(|pair| pair[1].step_name.clone())
        .collect()
}

/// Up to [`MAX_SUGGESTIONS`] distinct next steps for `current`, history first
pub fn suggest_next(current: &StepRecord, history: &[StepRecord]) -> Vec<String> {
    let historical = historical_next_steps(&current.step_name, history);
    let predefined = predefined_suggestions(classify_step(&current.step_name))
        .iter()
        .map(|s| s.to_string());

    let mut suggestions: Vec<String> = Vec::with_capacity(MAX_SUGGESTIONS);
    for candidate in historical.into_iter().chain(predefined) {
        if suggestions.len() == MAX_SUGGESTIONS {
            break;
        }
        if !suggestions.contains(&candidate) {
            suggestions.push(candidate);
        }
    }
    suggestions
}

/// Keeps the suggestion list for the most recently accepted record
#[derive(Debug, Default)]
pub struct SuggestionEngine {
    latest: Vec<String>,
}

impl SuggestionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suggestions computed for the last accepted record
    pub fn latest(&self) -> &[String] {
        &self.latest
    }

    pub fn reset(&mut self) {
        self.latest.clear();
    }
}

impl LedgerObserver for SuggestionEngine {
    fn on_append(&mut self, record: &StepRecord, history: &[StepRecord]) {
        self.latest = suggest_next(record, history);
        debug!(step = %record.step_name, suggestions = ?self.latest, "next-step suggestions");
    }
}
