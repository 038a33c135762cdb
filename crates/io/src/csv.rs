// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use outreach_engine::cell::CellValue;
use outreach_engine::table::Table;

use crate::TableError;

pub fn import(path: &Path) -> Result<Table, TableError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter).map_err(|e| TableError::parse(path, e))
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Table, TableError> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter).map_err(|e| TableError::parse(path, e))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the header line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: lines agreeing with the header's field count, weighted by that count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, TableError> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TableError::NotFound(path.to_path_buf()),
        _ => TableError::parse(path, e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| TableError::parse(path, e))?;

    // Spreadsheet exports often start with a UTF-8 byte order mark
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(..3);
    }

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let headers: Vec<String> = match records.next() {
        Some(result) => {
            let record = result.map_err(|e| format!("line 1: {}", e))?;
            // Kept verbatim; label lookups ignore surrounding whitespace
            record.iter().map(str::to_string).collect()
        }
        None => return Err("no header row".to_string()),
    };

    let mut table = Table::new(headers);
    table.delimiter = Some(delimiter);

    for (idx, result) in records.enumerate() {
        let record = result.map_err(|e| format!("line {}: {}", idx + 2, e))?;
        // Blank lines are skipped by the csv reader; rows of empty fields are kept
        let row: Vec<CellValue> = record.iter().map(CellValue::text).collect();
        table.push_row(row).map_err(|e| e.to_string())?;
    }

    Ok(table)
}

pub fn export_with_delimiter(table: &Table, path: &Path, delimiter: u8) -> Result<(), TableError> {
    crate::write_atomically(path, |file| {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(file);

        writer.write_record(table.headers()).map_err(|e| e.to_string())?;
        for row in table.rows() {
            let record: Vec<String> = row.iter().map(CellValue::display).collect();
            writer.write_record(&record).map_err(|e| e.to_string())?;
        }
        writer.flush().map_err(|e| e.to_string())
    })
}
