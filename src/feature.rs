//! Gherkin feature-file generation from a catalog of known steps.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ReportResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Given,
    When,
    Then,
    And,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Given => "Given",
            Keyword::When => "When",
            Keyword::Then => "Then",
            Keyword::And => "And",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Keyword {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "given" => Ok(Keyword::Given),
            "when" => Ok(Keyword::When),
            "then" => Ok(Keyword::Then),
            "and" => Ok(Keyword::And),
            other => Err(format!("unknown Gherkin keyword: {}", other)),
        }
    }
}

/// Known step texts grouped by keyword
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepCatalog {
    steps: BTreeMap<Keyword, Vec<String>>,
}

impl StepCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps implemented by the radio web/android suite
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.add(Keyword::Given, "I launch the application");
        catalog.add(Keyword::When, "I click the {string} button");
        catalog.add(Keyword::When, "I type {string} in the search field");
        catalog.add(Keyword::Then, "I verify I am on the home page");
        catalog.add(Keyword::Then, "Results for {string} are displayed");
        catalog
    }

    pub fn add(&mut self, keyword: Keyword, step: impl Into<String>) {
        self.steps.entry(keyword).or_default().push(step.into());
    }

    pub fn steps(&self, keyword: Keyword) -> &[String] {
        self.steps.get(&keyword).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.steps.values().all(Vec::is_empty)
    }

    /// Build a single-scenario feature for `description`
    pub fn generate(&self, description: &str) -> FeatureFile {
        let mut steps = Vec::new();

        if let Some(given) = self.most_relevant(Keyword::Given, description) {
            steps.push((Keyword::Given, given.to_string()));
        }
        for when in self.steps(Keyword::When) {
            if is_relevant(when, description) {
                steps.push((Keyword::When, when.clone()));
            }
        }
        if let Some(then) = self.most_relevant(Keyword::Then, description) {
            steps.push((Keyword::Then, then.to_string()));
        }

        FeatureFile {
            file_name: feature_file_name(description),
            feature_name: feature_name(description),
            scenario_name: format!("Verify {}", description.trim().to_lowercase()),
            steps,
        }
    }

    /// First relevant step, else the first step of that keyword
    fn most_relevant(&self, keyword: Keyword, description: &str) -> Option<&str> {
        let steps = self.steps(keyword);
        steps
            .iter()
            .find(|s| is_relevant(s, description))
            .or_else(|| steps.first())
            .map(String::as_str)
    }
}

/// True when `step` contains any word of `description`, ignoring case
pub fn is_relevant(step: &str, description: &str) -> bool {
    let step = step.to_lowercase();
    description
        .to_lowercase()
        .split_whitespace()
        .any(|word| step.contains(word))
}

fn feature_name(description: &str) -> String {
    let joined = description.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn feature_file_name(description: &str) -> String {
    let mut name = String::new();
    for c in description.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' };
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }
    format!("{}.feature", name)
}

/// A generated feature, ready to render or save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFile {
    pub file_name: String,
    pub feature_name: String,
    pub scenario_name: String,
    pub steps: Vec<(Keyword, String)>,
}

impl FeatureFile {
    /// Write into `dir` (created on demand) and return the file path
    pub fn save(&self, dir: &Path) -> ReportResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, self.to_string())?;
        info!(path = %path.display(), steps = self.steps.len(), "feature file created");
        Ok(path)
    }
}

impl fmt::Display for FeatureFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Feature: {}", self.feature_name)?;
        writeln!(f)?;
        writeln!(f, "  Scenario: {}", self.scenario_name)?;
        for (keyword, step) in &self.steps {
            writeln!(f, "    {} {}", keyword, step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_picks_relevant_steps() {
        let feature = StepCatalog::builtin().generate("search results for jazz");
        assert_eq!(feature.feature_name, "Search results for jazz");
        assert_eq!(feature.scenario_name, "Verify search results for jazz");
        assert_eq!(
            feature.steps,
            vec![
                (Keyword::Given, "I launch the application".to_string()),
                (Keyword::When, "I type {string} in the search field".to_string()),
                (Keyword::Then, "Results for {string} are displayed".to_string()),
            ]
        );
    }

    #[test]
    fn test_given_falls_back_to_first() {
        let mut catalog = StepCatalog::new();
        catalog.add(Keyword::Given, "first given");
        catalog.add(Keyword::Given, "second given");
        let feature = catalog.generate("podcast");
        assert_eq!(feature.steps, vec![(Keyword::Given, "first given".to_string())]);
    }

    #[test]
    fn test_empty_keyword_emits_nothing() {
        let feature = StepCatalog::new().generate("anything");
        assert!(feature.steps.is_empty());
        assert_eq!(feature.to_string(), "Feature: Anything\n\n  Scenario: Verify anything\n");
    }

    #[test]
    fn test_file_name_collapses_separators() {
        assert_eq!(feature_file_name("Search  'Jazz' now!"), "search_jazz_now_.feature");
        assert_eq!(feature_file_name("home page"), "home_page.feature");
    }

    #[test]
    fn test_keyword_parse() {
        assert_eq!("WHEN".parse::<Keyword>(), Ok(Keyword::When));
        assert!("but".parse::<Keyword>().is_err());
    }

    #[test]
    fn test_save_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("features");
        let feature = StepCatalog::builtin().generate("home page");
        let path = feature.save(&out).unwrap();
        assert_eq!(path, out.join("home_page.feature"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("    Then I verify I am on the home page"));
    }
}
