//! Format-independent document model for reports.

use serde::{Deserialize, Serialize};

/// Presentation class of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStyle {
    #[default]
    Plain,
    /// Column headers and section titles
    Header,
    /// Highlighted row (failed steps)
    Flagged,
}

/// One row of text cells
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<String>,
    #[serde(default)]
    pub style: RowStyle,
}

impl Row {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
            style: RowStyle::Plain,
        }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn styled(mut self, style: RowStyle) -> Self {
        self.style = style;
        self
    }
}

/// Named sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
    /// Column widths in character units; cosmetic only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_widths: Vec<f64>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            column_widths: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn widths(mut self, widths: &[f64]) -> Self {
        self.column_widths = widths.to_vec();
        self
    }
}

/// Ordered collection of sheets
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}
