//! Keyword heuristics mapping step names and error text to coarse categories.
//!
//! Both classifiers lower-case their input and test substring containment in
//! a fixed order; the first matching rule wins. Unseen text falls through to
//! [`StepType::Other`] / [`ErrorType::Unknown`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse category of a step, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    PageAccueil,
    Recherche,
    Click,
    Verification,
    Other,
}

/// Coarse category of a failure, derived from its error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    ElementNotFound,
    ClickError,
    Timeout,
    Unknown,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::PageAccueil => "page_accueil",
            StepType::Recherche => "recherche",
            StepType::Click => "click",
            StepType::Verification => "verification",
            StepType::Other => "other",
        }
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ElementNotFound => "element_not_found",
            ErrorType::ClickError => "click_error",
            ErrorType::Timeout => "timeout",
            ErrorType::Unknown => "unknown",
        }
    }

    /// Canned remediation hints for this error type
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            ErrorType::ElementNotFound => &[
                "verify element present on the page",
                "increase wait time",
                "verify selector",
            ],
            ErrorType::ClickError => &[
                "verify clickability of the element",
                "wait for the element to become interactive",
                "check for blocking overlays or popups",
            ],
            ErrorType::Timeout => &[
                "increase timeout",
                "check network connection",
                "check page performance",
            ],
            ErrorType::Unknown => &[],
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const HOME_MARKERS: &[&str] = &["accueil", "home"];
const SEARCH_MARKERS: &[&str] = &["recherche", "search"];
// "clic" also covers "click", "cliquer" and "clique"
const CLICK_MARKERS: &[&str] = &["clic"];
const VERIFY_MARKERS: &[&str] = &["verif", "vérif", "check", "assert"];

const NOT_FOUND_MARKERS: &[&str] = &[
    "not found",
    "no such element",
    "unable to locate",
    "introuvable",
    "non trouvé",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Classify a step by its human-readable name
pub fn classify_step(step_name: &str) -> StepType {
    let step = step_name.to_lowercase();
    if step.contains("page") && contains_any(&step, HOME_MARKERS) {
        StepType::PageAccueil
    } else if contains_any(&step, SEARCH_MARKERS) {
        StepType::Recherche
    } else if contains_any(&step, CLICK_MARKERS) {
        StepType::Click
    } else if contains_any(&step, VERIFY_MARKERS) {
        StepType::Verification
    } else {
        StepType::Other
    }
}

/// Classify an error message; empty or missing text is `Unknown`
pub fn classify_error(message: Option<&str>) -> ErrorType {
    let error = match message.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_lowercase(),
        _ => return ErrorType::Unknown,
    };

    if error.contains("element") && contains_any(&error, NOT_FOUND_MARKERS) {
        ErrorType::ElementNotFound
    } else if error.contains("click") {
        ErrorType::ClickError
    } else if error.contains("timeout") || error.contains("timed out") {
        ErrorType::Timeout
    } else {
        ErrorType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_step_priority() {
        assert_eq!(classify_step("Je suis sur la page d'accueil"), StepType::PageAccueil);
        assert_eq!(classify_step("Open HOME page"), StepType::PageAccueil);
        assert_eq!(classify_step("Search 'jazz'"), StepType::Recherche);
        // search rule is checked before click
        assert_eq!(classify_step("Click the search button"), StepType::Recherche);
        assert_eq!(classify_step("Je clique sur Play"), StepType::Click);
        assert_eq!(classify_step("Je vérifie le logo"), StepType::Verification);
        assert_eq!(classify_step("Open home"), StepType::Other);
    }

    #[test]
    fn test_home_without_page_is_not_page_accueil() {
        assert_eq!(classify_step("Go home"), StepType::Other);
    }

    #[test]
    fn test_classify_error_priority() {
        assert_eq!(
            classify_error(Some("element not found: input")),
            ErrorType::ElementNotFound
        );
        assert_eq!(
            classify_error(Some("NoSuchElementException: no such element")),
            ErrorType::ElementNotFound
        );
        // click is checked before timeout
        assert_eq!(classify_error(Some("click timeout")), ErrorType::ClickError);
        assert_eq!(classify_error(Some("Timeout after 10s")), ErrorType::Timeout);
        assert_eq!(classify_error(Some("connection reset")), ErrorType::Unknown);
    }

    #[test]
    fn test_classify_error_empty() {
        assert_eq!(classify_error(None), ErrorType::Unknown);
        assert_eq!(classify_error(Some("")), ErrorType::Unknown);
        assert_eq!(classify_error(Some("   ")), ErrorType::Unknown);
    }

    #[test]
    fn test_element_without_not_found_marker() {
        assert_eq!(
            classify_error(Some("element is stale")),
            ErrorType::Unknown
        );
    }

    #[test]
    fn test_remediation_table() {
        assert!(ErrorType::ElementNotFound.remediation().contains(&"verify selector"));
        assert_eq!(ErrorType::Timeout.remediation().len(), 3);
        assert!(ErrorType::Unknown.remediation().is_empty());
    }
}
