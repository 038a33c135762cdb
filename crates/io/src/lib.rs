// File I/O operations
//
// Tables are loaded from and saved back to the same on-disk format. The
// writer never touches the input file: output goes to a derived path.

pub mod csv;
pub mod xlsx;

use std::path::{Path, PathBuf};

use outreach_engine::table::Table;

/// Suffix inserted before the extension of the output file
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_updated";

/// On-disk table format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Delimited text; delimiter is sniffed on load and reused on save
    Csv,
    /// Tab-separated text
    Tsv,
    /// Excel 2007+ workbook
    Xlsx,
}

impl TableFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("csv") | Some("txt") => Ok(TableFormat::Csv),
            Some("tsv") | Some("tab") => Ok(TableFormat::Tsv),
            Some("xlsx") | Some("xlsm") => Ok(TableFormat::Xlsx),
            Some(other @ ("xls" | "xlsb" | "ods")) => Err(TableError::UnsupportedFormat(format!(
                ".{} workbooks can be read but not written back; save the file as .xlsx",
                other
            ))),
            Some(other) => Err(TableError::UnsupportedFormat(format!(
                "cannot infer format from extension .{}",
                other
            ))),
            None => Err(TableError::UnsupportedFormat(
                "file has no extension".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Tsv => "tsv",
            TableFormat::Xlsx => "xlsx",
        }
    }

    /// True for workbook formats (as opposed to delimited text)
    pub fn is_workbook(&self) -> bool {
        matches!(self, TableFormat::Xlsx)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl TableError {
    pub(crate) fn parse(path: &Path, reason: impl std::fmt::Display) -> Self {
        TableError::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, reason: impl std::fmt::Display) -> Self {
        TableError::Write {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Load a table from `path`.
///
/// Fails with [`TableError::NotFound`] before attempting to parse when the
/// path does not exist.
pub fn load(path: &Path, format: TableFormat, sheet: Option<&str>) -> Result<Table, TableError> {
    if !path.exists() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }

    let table = match format {
        TableFormat::Csv => csv::import(path)?,
        TableFormat::Tsv => csv::import_with_delimiter(path, b'\t')?,
        TableFormat::Xlsx => xlsx::import(path, sheet)?,
    };

    log::info!(
        "Successfully read {} with {} rows and {} columns",
        path.display(),
        table.row_count(),
        table.col_count()
    );
    Ok(table)
}

/// Save `table` to `path` in `format`.
pub fn save(table: &Table, path: &Path, format: TableFormat) -> Result<(), TableError> {
    match format {
        TableFormat::Csv => {
            let delimiter = table.delimiter.unwrap_or(b',');
            csv::export_with_delimiter(table, path, delimiter)?
        }
        TableFormat::Tsv => csv::export_with_delimiter(table, path, b'\t')?,
        TableFormat::Xlsx => xlsx::export(table, path)?,
    }

    log::info!("Successfully saved updated spreadsheet to {}", path.display());
    Ok(())
}

/// Write `path` through a temp file in the same directory, renamed into
/// place only once `write` succeeds. A failed write leaves no file behind
/// and any existing file at `path` untouched.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<(), TableError>
where
    F: FnOnce(&mut tempfile::NamedTempFile) -> Result<(), String>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".outreach-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(dir).map_err(|e| TableError::write(path, e))?;
    write(&mut file).map_err(|e| TableError::write(path, e))?;
    file.persist(path).map_err(|e| TableError::write(path, e.error))?;
    Ok(())
}

/// Derive the output path: `<dir>/<stem><suffix><.ext>`.
///
/// An empty suffix falls back to [`DEFAULT_OUTPUT_SUFFIX`] so the result can
/// never equal the input path.
pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let suffix = if suffix.is_empty() { DEFAULT_OUTPUT_SUFFIX } else { suffix };
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    input.with_file_name(file_name)
}
