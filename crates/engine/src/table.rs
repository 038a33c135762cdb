use serde::{Deserialize, Serialize};

use super::cell::CellValue;

/// Identifies a column either by its header label or by its 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnId {
    Label(String),
    Position(usize),
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnId::Label(label) => write!(f, "'{}'", label),
            ColumnId::Position(pos) => write!(f, "#{}", pos + 1),
        }
    }
}

/// Row-oriented table with a single header row.
///
/// Every row has exactly `headers.len()` cells; `push_row` pads short rows
/// and `add_column` widens every row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Worksheet name the table was read from (workbooks only)
    pub name: Option<String>,
    /// Field delimiter the table was read with (delimited text only)
    pub delimiter: Option<u8>,
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// A data row was wider than the header row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {row} has {found} fields, header has {expected}")]
pub struct RowWidthError {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            ..Default::default()
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.headers.len()
    }

    /// Append a data row, padding it with empty cells up to the header width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) -> Result<(), RowWidthError> {
        if row.len() > self.headers.len() {
            return Err(RowWidthError {
                row: self.rows.len() + 1,
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        row.resize(self.headers.len(), CellValue::Empty);
        self.rows.push(row);
        Ok(())
    }

    /// Index of the first column whose header matches `label` (surrounding
    /// whitespace ignored).
    pub fn column_index(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.headers.iter().position(|h| h.trim() == label)
    }

    /// Resolve a column identifier to an index, if the column exists.
    pub fn resolve(&self, id: &ColumnId) -> Option<usize> {
        match id {
            ColumnId::Label(label) => self.column_index(label),
            ColumnId::Position(pos) if *pos < self.headers.len() => Some(*pos),
            ColumnId::Position(_) => None,
        }
    }

    /// Append a new column with every cell empty. Returns its index.
    pub fn add_column(&mut self, label: impl Into<String>) -> usize {
        self.headers.push(label.into());
        for row in &mut self.rows {
            row.push(CellValue::Empty);
        }
        self.headers.len() - 1
    }

    /// Existing column index for `label`, or a newly added column.
    pub fn ensure_column(&mut self, label: &str) -> usize {
        match self.column_index(label) {
            Some(idx) => idx,
            None => self.add_column(label),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY)
    }

    /// Overwrite one cell. Out-of-range coordinates are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }
}
