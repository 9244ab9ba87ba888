//! Survey row model structures.

use serde::{Deserialize, Serialize};

/// A scalar worksheet value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    #[default]
    Empty,
}

impl CellValue {
    /// Check if the cell carries nothing (or only whitespace).
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the value as answer text.
    ///
    /// Integral numbers print without a fractional part, so a numeric code
    /// stored as `3` reads back as `"3"` rather than `"3.0"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }
}

/// One participant's answers, read from a worksheet data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRow {
    /// Participant identifier (e.g. "A101")
    pub id: String,

    /// Display name, when a name column exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 1-based worksheet row number; the header occupies row 1
    pub physical_row: u32,

    /// Question label to answer, in column order
    #[serde(default)]
    pub answers: Vec<(String, CellValue)>,
}

impl SurveyRow {
    /// Create a row with no answers.
    pub fn new(id: impl Into<String>, physical_row: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            physical_row,
            answers: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append an answer.
    pub fn with_answer(mut self, label: impl Into<String>, value: CellValue) -> Self {
        self.answers.push((label.into(), value));
        self
    }

    /// Look up the answer recorded under a question label.
    ///
    /// Labels are compared after trimming, since survey exports often carry
    /// trailing spaces in their headers.
    pub fn answer(&self, label: &str) -> Option<&CellValue> {
        let label = label.trim();
        self.answers
            .iter()
            .find(|(l, _)| l.trim() == label)
            .map(|(_, v)| v)
    }
}
