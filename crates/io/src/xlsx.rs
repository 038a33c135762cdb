// Excel workbook import/export (xlsx)
//
// Import reads one worksheet: the first by default, or a named one. The
// first row is the header. Export writes a single worksheet with the same
// name, a bold header row, and typed cells.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use outreach_engine::cell::CellValue;
use outreach_engine::table::Table;

use crate::TableError;

/// Excel's per-sheet row limit
const MAX_ROWS: usize = 1_048_576;

/// Excel's per-cell text limit
const MAX_STRING_LEN: usize = 32_767;

const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Import one worksheet of an Excel file as a table.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Table, TableError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| TableError::parse(path, format!("failed to open Excel file: {}", e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| TableError::parse(path, format!("no sheet named '{}'", name)))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| TableError::parse(path, "Excel file contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| TableError::parse(path, format!("failed to read sheet '{}': {}", sheet_name, e)))?;

    // Data may not begin at A1; leading blank columns still count as columns
    let (_, start_col) = range.start().unwrap_or((0, 0));
    let start_col = start_col as usize;

    let mut rows = range.rows();
    let header_cells = rows
        .next()
        .ok_or_else(|| TableError::parse(path, format!("sheet '{}' is empty", sheet_name)))?;

    let width = start_col + header_cells.len();
    let mut headers = Vec::with_capacity(width);
    for col in 0..width {
        let label = if col < start_col {
            String::new()
        } else {
            data_to_cell(&header_cells[col - start_col]).display()
        };
        headers.push(if label.trim().is_empty() {
            format!("Unnamed: {}", col)
        } else {
            label
        });
    }

    let mut table = Table::new(headers);
    table.name = Some(sheet_name);

    for row in rows {
        let mut cells = vec![CellValue::Empty; start_col];
        cells.extend(row.iter().map(data_to_cell));
        table.push_row(cells).map_err(|e| TableError::parse(path, e))?;
    }

    Ok(table)
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => CellValue::Date(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::text(s.clone()),
        Data::DurationIso(s) => CellValue::text(s.clone()),
    }
}

/// Export a table to an xlsx file.
pub fn export(table: &Table, path: &Path) -> Result<(), TableError> {
    if table.row_count() + 1 > MAX_ROWS {
        return Err(TableError::write(
            path,
            format!("{} rows exceed the Excel limit of {}", table.row_count() + 1, MAX_ROWS),
        ));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(table.name.as_deref().unwrap_or(DEFAULT_SHEET_NAME))
        .map_err(|e| TableError::write(path, format!("invalid sheet name: {}", e)))?;

    write_cells(table, worksheet).map_err(|e| TableError::write(path, e))?;

    crate::write_atomically(path, |file| {
        workbook
            .save_to_writer(file)
            .map_err(|e| format!("failed to save XLSX file: {}", e))
    })
}

fn write_cells(table: &Table, worksheet: &mut Worksheet) -> Result<(), XlsxError> {
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (col, header) in table.headers().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let col_num = col_idx as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(row_num, col_num, truncate_to_limit(s))?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(row_num, col_num, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row_num, col_num, *b)?;
                }
                CellValue::Date(serial) => {
                    let format = if serial.fract().abs() > 0.0001 {
                        &datetime_format
                    } else {
                        &date_format
                    };
                    worksheet.write_number_with_format(row_num, col_num, *serial, format)?;
                }
            }
        }
    }

    Ok(())
}

/// Cut text to Excel's cell limit on a char boundary.
fn truncate_to_limit(s: &str) -> &str {
    if s.chars().count() <= MAX_STRING_LEN {
        return s;
    }
    match s.char_indices().nth(MAX_STRING_LEN) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
