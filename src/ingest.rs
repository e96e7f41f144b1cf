use tracing::debug;

use crate::error::{FinError, Result};
use crate::models::RawRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            #[cfg(feature = "xlsx")]
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(FinError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// Decode an uploaded spreadsheet into ordered header->value rows.
pub fn read_table(bytes: &[u8], file_name: &str) -> Result<Vec<RawRow>> {
    let format = FileFormat::from_file_name(file_name)?;
    let rows = match format {
        FileFormat::Csv => read_csv(&decode_text(bytes))?,
        #[cfg(feature = "xlsx")]
        FileFormat::Xlsx => read_xlsx(bytes)?,
        #[cfg(not(feature = "xlsx"))]
        FileFormat::Xlsx => return Err(FinError::UnsupportedFormat(file_name.to_string())),
    };
    debug!(file = file_name, rows = rows.len(), "parsed table");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// UTF-8 when valid, otherwise Latin-1 (every byte maps to the same code point).
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            debug!("input is not UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Whether the text ends inside a quoted field. The csv reader accepts that
/// silently and folds every following line into the open field.
fn ends_in_open_quote(text: &str) -> bool {
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            ',' | '\n' | '\r' => at_field_start = true,
            _ => at_field_start = false,
        }
    }
    in_quotes
}

fn read_csv(text: &str) -> Result<Vec<RawRow>> {
    if ends_in_open_quote(text) {
        return Err(FinError::CorruptFile("unterminated quoted field".into()));
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| FinError::CorruptFile(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(FinError::CorruptFile("missing header row".into()));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| FinError::CorruptFile(e.to_string()))?;
        let values: Vec<String> = record.iter().map(|v| v.to_string()).collect();
        if let Some(row) = build_row(&headers, values, rows.len() + 1) {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Zip a header row with one record. Blank records yield `None`; surplus
/// cells without a header are dropped and the first of duplicate headers wins.
fn build_row(headers: &[String], values: Vec<String>, index: usize) -> Option<RawRow> {
    if values.iter().all(|v| v.trim().is_empty()) {
        return None;
    }
    let mut cells: Vec<(String, String)> = Vec::with_capacity(headers.len());
    for (header, value) in headers.iter().zip(values) {
        if header.trim().is_empty() || cells.iter().any(|(h, _)| h == header) {
            continue;
        }
        cells.push((header.clone(), value));
    }
    Some(RawRow { index, cells })
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

#[cfg(any(feature = "xlsx", test))]
pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(feature = "xlsx")]
fn read_xlsx(bytes: &[u8]) -> Result<Vec<RawRow>> {
    use calamine::{Reader, Xlsx};

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut workbook: Xlsx<_> =
        Xlsx::new(cursor).map_err(|e| FinError::CorruptFile(format!("failed to open XLSX: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FinError::CorruptFile("workbook has no worksheets".into()))?
        .map_err(|e| FinError::CorruptFile(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = sheet_rows
        .next()
        .ok_or_else(|| FinError::CorruptFile("missing header row".into()))?
        .iter()
        .map(cell_to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(FinError::CorruptFile("missing header row".into()));
    }

    let mut rows = Vec::new();
    for sheet_row in sheet_rows {
        let values = sheet_row.iter().map(cell_to_string).collect();
        if let Some(row) = build_row(&headers, values, rows.len() + 1) {
            rows.push(row);
        }
    }
    Ok(rows)
}

#[cfg(feature = "xlsx")]
pub fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => {
            // Exactly three fractional digits would read as a thousands group.
            let s = f.to_string();
            match s.split_once('.') {
                Some((_, frac)) if frac.len() == 3 => format!("{s}0"),
                _ => s,
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).unwrap_or_default(),
        Data::DateTimeIso(s) => s.get(..10).unwrap_or(s).to_string(),
        _ => String::new(),
    }
}
