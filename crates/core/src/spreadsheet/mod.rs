//! Spreadsheet uploads: product code lists and rename mappings.
//!
//! `.xlsx` workbooks are read with calamine (first sheet only), `.csv`
//! exports with the csv crate. Both are flattened into a grid of trimmed
//! strings; the first row is the header.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

/// Code column headers, by priority.
pub const CODE_HEADERS: [&str; 3] = ["CODICE", "COD.PR", "C.ART"];

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Il file deve essere in formato .xlsx o .csv")]
    UnsupportedFormat,

    #[error("Impossibile leggere il file: {0}")]
    Parse(String),

    #[error("Colonna 'CODICE' non trovata nel file Excel")]
    MissingColumn,

    #[error("Nessun codice trovato nella colonna CODICE")]
    NoCodes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Xlsx,
    Csv,
}

fn detect_format(filename: &str) -> Result<Format, SpreadsheetError> {
    let lower = filename.trim().to_ascii_lowercase();
    if lower.ends_with(".xlsx") {
        Ok(Format::Xlsx)
    } else if lower.ends_with(".csv") {
        Ok(Format::Csv)
    } else {
        Err(SpreadsheetError::UnsupportedFormat)
    }
}

/// Whether `filename` has an accepted spreadsheet extension.
pub fn is_supported(filename: &str) -> bool {
    detect_format(filename).is_ok()
}

/// All rows of the first sheet as trimmed strings, header included.
pub fn read_rows(filename: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    match detect_format(filename)? {
        Format::Xlsx => read_xlsx(bytes),
        Format::Csv => read_csv(bytes),
    }
}

fn read_xlsx(bytes: &[u8]) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    let mut workbook = open_workbook_from_rs::<Xlsx<_>, _>(Cursor::new(bytes))
        .map_err(|e| SpreadsheetError::Parse(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SpreadsheetError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| SpreadsheetError::Parse(e.to_string()))?;

    // calamine starts the range at the first used cell; re-anchor it at A1
    // so row 1 is always the header and columns keep their sheet positions.
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let (first_row, first_col) = (first_row as usize, first_col as usize);

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); first_row];
    rows.extend(range.rows().map(|row| {
        let mut cells = vec![String::new(); first_col];
        cells.extend(row.iter().map(cell_to_string));
        cells
    }));
    Ok(rows)
}

/// Render a cell the way a user typed it: `24369.0` becomes `24369`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{FEFF}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SpreadsheetError::Parse(e.to_string()))?;
        rows.push(record.iter().map(|v| v.trim().to_string()).collect());
    }
    Ok(rows)
}

/// Italian Excel exports use `;`.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Index of the code column, chosen by header name priority.
pub fn find_code_column(header: &[String]) -> Option<usize> {
    CODE_HEADERS.iter().find_map(|wanted| {
        header
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(wanted))
    })
}

/// Product codes from the code column, in sheet order, blanks skipped.
pub fn read_codes(filename: &str, bytes: &[u8]) -> Result<Vec<String>, SpreadsheetError> {
    let rows = read_rows(filename, bytes)?;
    let (header, data) = rows.split_first().ok_or(SpreadsheetError::MissingColumn)?;
    let column = find_code_column(header).ok_or(SpreadsheetError::MissingColumn)?;

    let codes: Vec<String> = data
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|cell| !cell.is_empty())
        .cloned()
        .collect();

    if codes.is_empty() {
        return Err(SpreadsheetError::NoCodes);
    }

    debug!(filename = %filename, codes = codes.len(), column, "Read product codes");
    Ok(codes)
}

/// `(code, new_name)` pairs from the first two columns, header skipped.
/// Later rows win over earlier ones with the same code.
pub fn read_mappings(filename: &str, bytes: &[u8]) -> Result<Vec<(String, String)>, SpreadsheetError> {
    let rows = read_rows(filename, bytes)?;

    let mut order = Vec::new();
    let mut latest: HashMap<String, String> = HashMap::new();
    for row in rows.iter().skip(1) {
        let (Some(code), Some(name)) = (row.first(), row.get(1)) else {
            continue;
        };
        if code.is_empty() || name.is_empty() {
            continue;
        }
        if latest.insert(code.clone(), name.clone()).is_none() {
            order.push(code.clone());
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|code| latest.remove(&code).map(|name| (code, name)))
        .collect())
}
