use serde::{Deserialize, Serialize};

/// A single cell value as read from (and written back to) a spreadsheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel date serial (1900 system). Kept separate from `Number` so the
    /// writer can restore a date format.
    Date(f64),
}

impl CellValue {
    /// Build a text cell, mapping the empty string to `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text form of the value. Integral numbers print without decimals.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) | CellValue::Date(n) => format_number(*n),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    /// Trimmed text form, or `None` when the cell counts as missing.
    ///
    /// Whitespace-only text is treated the same as an empty cell, and so is
    /// a NaN number.
    pub fn as_required_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) | CellValue::Date(n) if n.is_nan() => None,
            other => {
                let text = other.display();
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
