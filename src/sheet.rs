// 📄 Sheet Reader - Spreadsheet exports → named-column rows
// Thin I/O layer: .xlsx/.xls/.ods through calamine, .csv through the csv crate.
// Everything downstream sees only `Sheet` and `RawRow`.

use crate::error::PipelineError;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ============================================================================
// CELL VALUE
// ============================================================================

/// A single cell as the spreadsheet stored it
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }

    /// Missing values: empty cells, blank strings and NaN numbers
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Text form of the cell. Whole numbers drop their fractional part so
    /// numeric IDs read as "1042", not "1042.0".
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.is_nan() {
                    String::new()
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Time(t) => t.format("%H:%M:%S").to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

// ============================================================================
// ROWS & SHEETS
// ============================================================================

/// One spreadsheet row keyed by header text
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 1-based line in the source, header included
    pub line_number: usize,
    cells: HashMap<String, CellValue>,
}

impl RawRow {
    pub fn new(line_number: usize) -> Self {
        RawRow {
            line_number,
            cells: HashMap::new(),
        }
    }

    /// Build a row from (header, value) pairs, mostly for tests and fixtures
    pub fn from_pairs<V: Into<CellValue> + Clone>(pairs: &[(&str, V)]) -> Self {
        let mut row = RawRow::new(0);
        for (header, value) in pairs {
            row.insert(header, value.clone().into());
        }
        row
    }

    /// First value for a header wins; repeated headers are ignored
    pub fn insert(&mut self, header: &str, value: CellValue) {
        self.cells.entry(header.to_string()).or_insert(value);
    }

    /// Missing columns read as empty
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_missing)
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub source: PathBuf,
    /// Headers in their original column order
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Sheet {
    pub fn new(source: PathBuf, headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Sheet {
            source,
            headers,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Load the first sheet of a workbook, or a CSV file, by extension
pub fn load_sheet(path: &Path) -> Result<Sheet, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingSource(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let sheet = if extension == "csv" {
        load_csv_sheet(path)?
    } else {
        load_workbook_sheet(path)?
    };

    tracing::debug!(
        source = %path.display(),
        rows = sheet.len(),
        columns = ?sheet.headers,
        "loaded sheet"
    );

    Ok(sheet)
}

fn load_workbook_sheet(path: &Path) -> Result<Sheet, PipelineError> {
    let workbook_error = |message: String| PipelineError::Workbook {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| workbook_error("workbook has no sheets".to_string()))?
        .map_err(|e| workbook_error(e.to_string()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect(),
        None => return Err(PipelineError::EmptySheet(path.to_path_buf())),
    };

    let mut rows = Vec::new();
    for (index, cells) in rows_iter.enumerate() {
        let mut row = RawRow::new(index + 2);
        for (header, cell) in headers.iter().zip(cells.iter()) {
            if header.is_empty() {
                continue;
            }
            row.insert(header, cell_from_data(cell));
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(Sheet::new(path.to_path_buf(), headers, rows))
}

fn load_csv_sheet(path: &Path) -> Result<Sheet, PipelineError> {
    let csv_error = |source: csv::Error| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(PipelineError::EmptySheet(path.to_path_buf()));
    }

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_error)?;
        let mut row = RawRow::new(index + 2);
        for (header, field) in headers.iter().zip(record.iter()) {
            if header.is_empty() {
                continue;
            }
            let value = if field.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::text(field)
            };
            row.insert(header, value);
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(Sheet::new(path.to_path_buf(), headers, rows))
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Error cells (#N/A, #REF!) carry no usable value
        Data::Error(_) => CellValue::Empty,
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if serial < 1.0 {
                time_from_day_fraction(serial)
                    .map(CellValue::Time)
                    .unwrap_or(CellValue::Number(serial))
            } else {
                datetime_from_serial(serial)
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Number(serial))
            }
        }
        Data::DateTimeIso(s) => {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                CellValue::DateTime(dt)
            } else if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
                CellValue::Time(t)
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Excel serial date (1900 system) → datetime
pub(crate) fn datetime_from_serial(serial: f64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

/// Fraction of a day (0.375 = 09:00) → time of day
pub(crate) fn time_from_day_fraction(fraction: f64) -> Option<NaiveTime> {
    if !(0.0..1.0).contains(&fraction) {
        return None;
    }
    let seconds = ((fraction * 86_400.0).round() as u32) % 86_400;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_number_text_drops_integer_fraction() {
        assert_eq!(CellValue::Number(1042.0).to_text(), "1042");
        assert_eq!(CellValue::Number(3.5).to_text(), "3.5");
        assert_eq!(CellValue::Number(f64::NAN).to_text(), "");
    }

    #[test]
    fn test_missing_values() {
        assert!(CellValue::Empty.is_missing());
        assert!(CellValue::text("   ").is_missing());
        assert!(CellValue::Number(f64::NAN).is_missing());
        assert!(!CellValue::Bool(false).is_missing());
        assert!(!CellValue::text("0").is_missing());
    }

    #[test]
    fn test_row_missing_column_reads_empty() {
        let row = RawRow::from_pairs(&[("Agency Name", "Hope Pantry")]);
        assert_eq!(row.get("Agency Name"), &CellValue::text("Hope Pantry"));
        assert_eq!(row.get("Phone"), &CellValue::Empty);
    }

    #[test]
    fn test_repeated_header_keeps_first() {
        let mut row = RawRow::new(2);
        row.insert("Notes", CellValue::text("first"));
        row.insert("Notes", CellValue::text("second"));
        assert_eq!(row.get("Notes").to_text(), "first");
    }

    #[test]
    fn test_serial_conversion() {
        let dt = datetime_from_serial(45292.5).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-01 12:00");

        let t = time_from_day_fraction(0.375).unwrap();
        assert_eq!(t.format("%H:%M:%S").to_string(), "09:00:00");
        assert!(time_from_day_fraction(1.5).is_none());
    }

    #[test]
    fn test_load_csv_sheet() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Agency Name , Phone,Day or Week").unwrap();
        writeln!(file, "Hope Pantry,555-0100,Monday").unwrap();
        writeln!(file, ",,").unwrap();
        writeln!(file, "Grace Market,,Tuesday").unwrap();
        file.flush().unwrap();

        let sheet = load_sheet(file.path()).unwrap();
        assert_eq!(sheet.headers, vec!["Agency Name", "Phone", "Day or Week"]);
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.rows[0].get("Phone").to_text(), "555-0100");
        assert!(sheet.rows[1].get("Phone").is_missing());
        assert_eq!(sheet.rows[1].line_number, 4);
    }

    #[test]
    fn test_missing_file_is_missing_source() {
        let err = load_sheet(Path::new("/definitely/not/here.xlsx")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingSource(_)));
    }
}
