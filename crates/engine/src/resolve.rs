//! Column resolution: decide which columns hold the company name, the
//! description, and where generated output goes.
//!
//! Two strategies are supported and selected explicitly by the caller:
//!
//! - **Label**: the description column is found by header text; output goes
//!   to a labelled column that is created on first write if missing.
//! - **Position**: name is column 1, description is column 4, output is
//!   column 5 when present or a new column with a default label.

use serde::{Deserialize, Serialize};

use crate::table::{ColumnId, Table};

/// Minimum column count for positional resolution (name .. description).
pub const MIN_POSITIONAL_COLUMNS: usize = 4;

pub const NAME_POSITION: usize = 0;
pub const DESCRIPTION_POSITION: usize = 3;
pub const OUTPUT_POSITION: usize = 4;

/// How input/output columns are located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnMode {
    Label {
        description: String,
        output: String,
        /// Optional company-name column; when set, rows missing a name are skipped
        name: Option<String>,
    },
    Position {
        /// Header used when the table has no fifth column
        default_output: String,
    },
}

impl ColumnMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnMode::Label { .. } => "label",
            ColumnMode::Position { .. } => "position",
        }
    }
}

/// Where generated drafts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputColumn {
    /// Column already present in the table
    Existing(usize),
    /// Column to append (lazily, on the first write)
    New(String),
}

/// Resolved column triple for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub name: Option<usize>,
    pub description: usize,
    pub output: OutputColumn,
}

impl ColumnMapping {
    /// Index of the output column, appending it to the table if needed.
    pub fn output_index(&mut self, table: &mut Table) -> usize {
        match &self.output {
            OutputColumn::Existing(idx) => *idx,
            OutputColumn::New(label) => {
                let idx = table.ensure_column(label);
                self.output = OutputColumn::Existing(idx);
                idx
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("column {0} not found in spreadsheet")]
    MissingColumn(ColumnId),

    #[error("too few columns: found {found}, need at least {required}")]
    TooFewColumns { found: usize, required: usize },

    #[error("column {0} is used for more than one role")]
    DuplicateColumn(ColumnId),
}

/// Resolve the column mapping for `table` under `mode`.
///
/// Does not modify the table; a missing output column is reported as
/// [`OutputColumn::New`].
pub fn resolve_columns(table: &Table, mode: &ColumnMode) -> Result<ColumnMapping, SchemaError> {
    match mode {
        ColumnMode::Label { description, output, name } => {
            let description_id = ColumnId::Label(description.clone());
            let description_idx = table
                .resolve(&description_id)
                .ok_or_else(|| SchemaError::MissingColumn(description_id.clone()))?;

            let name_idx = match name {
                Some(label) => {
                    let id = ColumnId::Label(label.clone());
                    let idx = table
                        .resolve(&id)
                        .ok_or_else(|| SchemaError::MissingColumn(id.clone()))?;
                    if idx == description_idx {
                        return Err(SchemaError::DuplicateColumn(id));
                    }
                    Some(idx)
                }
                None => None,
            };

            // Drafts must never land on a column the prompt is built from
            let output = match table.column_index(output) {
                Some(idx) if idx == description_idx || Some(idx) == name_idx => {
                    return Err(SchemaError::DuplicateColumn(ColumnId::Label(output.clone())));
                }
                Some(idx) => OutputColumn::Existing(idx),
                None => OutputColumn::New(output.clone()),
            };

            Ok(ColumnMapping {
                name: name_idx,
                description: description_idx,
                output,
            })
        }
        ColumnMode::Position { default_output } => {
            let found = table.col_count();
            if found < MIN_POSITIONAL_COLUMNS {
                return Err(SchemaError::TooFewColumns {
                    found,
                    required: MIN_POSITIONAL_COLUMNS,
                });
            }

            let output = if found > OUTPUT_POSITION {
                OutputColumn::Existing(OUTPUT_POSITION)
            } else {
                OutputColumn::New(default_output.clone())
            };

            Ok(ColumnMapping {
                name: Some(NAME_POSITION),
                description: DESCRIPTION_POSITION,
                output,
            })
        }
    }
}
