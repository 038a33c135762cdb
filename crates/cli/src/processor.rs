// Row processing pipeline
//
// Unloaded -> Loaded -> ColumnsResolved -> RowsProcessed -> Saved
//
// Any error before Saved aborts the run without writing; in-memory edits
// are dropped with the Run.

use std::path::{Path, PathBuf};

use outreach_engine::cell::CellValue;
use outreach_engine::resolve::{self, ColumnMapping, ColumnMode, SchemaError};
use outreach_engine::table::Table;
use outreach_io::{TableError, TableFormat};

use crate::exit_codes::{schema_exit_code, table_exit_code, EXIT_WRITE};
use crate::generator::{flatten, EmailGenerator};

/// Where a run has got to. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    Unloaded,
    Loaded,
    ColumnsResolved,
    RowsProcessed,
    Saved,
}

/// Fatal run errors. Generation failures are not in here: they are
/// recovered per row.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("output path {} is the input file; refusing to overwrite it", .0.display())]
    WouldOverwriteInput(PathBuf),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Table(e) => table_exit_code(e),
            RunError::Schema(e) => schema_exit_code(e),
            RunError::WouldOverwriteInput(_) => EXIT_WRITE,
        }
    }
}

/// Inputs of one run, already merged from settings and flags
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub format: TableFormat,
    /// Worksheet to read (workbooks only)
    pub sheet: Option<String>,
    pub mode: ColumnMode,
    pub output_suffix: String,
    /// Print prompts instead of calling the oracle; nothing is written
    pub dry_run: bool,
    /// Stop after this many eligible rows
    pub limit: Option<usize>,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rows sent to the generator (including failures)
    pub processed: usize,
    /// Rows left untouched (missing values, or past `--limit`)
    pub skipped: usize,
    /// Processed rows whose cell holds a failure placeholder
    pub failed: usize,
    /// File written, `None` for a dry run
    pub output: Option<PathBuf>,
}

/// One pass over one spreadsheet.
pub struct Run<'a> {
    options: RunOptions,
    generator: &'a EmailGenerator<'a>,
    stage: RunStage,
    table: Option<Table>,
    mapping: Option<ColumnMapping>,
}

impl<'a> Run<'a> {
    pub fn new(options: RunOptions, generator: &'a EmailGenerator<'a>) -> Self {
        Self {
            options,
            generator,
            stage: RunStage::Unloaded,
            table: None,
            mapping: None,
        }
    }

    /// Start from a table that is already in memory
    pub fn with_table(options: RunOptions, generator: &'a EmailGenerator<'a>, table: Table) -> Self {
        Self {
            stage: RunStage::Loaded,
            table: Some(table),
            ..Self::new(options, generator)
        }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Path the updated table will be written to
    pub fn output_path(&self) -> PathBuf {
        outreach_io::output_path(&self.options.input, &self.options.output_suffix)
    }

    /// Drive the run to completion.
    pub fn execute(&mut self) -> Result<RunSummary, RunError> {
        let output = self.output_path();
        if !self.options.dry_run && same_file(&self.options.input, &output) {
            return Err(RunError::WouldOverwriteInput(output));
        }

        self.load()?;
        self.resolve()?;
        let mut summary = self.process_rows();

        if !self.options.dry_run {
            self.save(&output)?;
            summary.output = Some(output);
        }
        Ok(summary)
    }

    fn load(&mut self) -> Result<(), RunError> {
        if self.stage >= RunStage::Loaded {
            return Ok(());
        }
        let table = outreach_io::load(
            &self.options.input,
            self.options.format,
            self.options.sheet.as_deref(),
        )?;
        self.table = Some(table);
        self.stage = RunStage::Loaded;
        Ok(())
    }

    fn resolve(&mut self) -> Result<(), RunError> {
        let Some(table) = &self.table else {
            return Ok(());
        };
        let mapping = resolve::resolve_columns(table, &self.options.mode)?;
        log::debug!("Resolved columns ({} mode): {:?}", self.options.mode.as_str(), mapping);
        self.mapping = Some(mapping);
        self.stage = RunStage::ColumnsResolved;
        Ok(())
    }

    fn process_rows(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        let (Some(table), Some(mapping)) = (self.table.as_mut(), self.mapping.as_mut()) else {
            return summary;
        };

        for row in 0..table.row_count() {
            let Some((name, description)) = required_values(table, mapping, row) else {
                log::debug!("Skipping row {}: missing required value", row + 1);
                summary.skipped += 1;
                continue;
            };
            if self.options.limit.is_some_and(|limit| summary.processed >= limit) {
                summary.skipped += 1;
                continue;
            }

            log::info!("Processing row {}", row + 1);
            summary.processed += 1;

            if self.options.dry_run {
                println!("--- row {} ---", row + 1);
                println!("{}", self.generator.prompt(name.as_deref(), &description));
                continue;
            }

            let result = self.generator.generate(name.as_deref(), &description);
            if result.is_err() {
                summary.failed += 1;
            }
            let col = mapping.output_index(table);
            table.set(row, col, CellValue::text(flatten(result)));
        }

        self.stage = RunStage::RowsProcessed;
        summary
    }

    fn save(&mut self, output: &Path) -> Result<(), RunError> {
        let Some(table) = &self.table else {
            return Ok(());
        };
        outreach_io::save(table, output, self.options.format)?;
        self.stage = RunStage::Saved;
        Ok(())
    }
}

/// The (name, description) pair for `row`, or `None` if a required one is
/// missing. Name is only required when the mapping has a name column.
fn required_values(table: &Table, mapping: &ColumnMapping, row: usize) -> Option<(Option<String>, String)> {
    let description = table.get(row, mapping.description).as_required_text()?;
    let name = match mapping.name {
        Some(col) => Some(table.get(row, col).as_required_text()?),
        None => None,
    };
    Some((name, description))
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
