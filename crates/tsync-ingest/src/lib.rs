//! Record file ingestion (tsync-ingest boundary).
//!
//! Converts an uploaded file into a [`RecordBatch`]: ordered column names plus
//! one [`NewRecord`] per data row. This is the read side only; nothing here
//! knows about the target table.
//!
//! ## Supported formats (by extension, case-insensitive)
//!
//! | Extension | Shape                                   | Cell typing                          |
//! |-----------|-----------------------------------------|--------------------------------------|
//! | `.csv`    | header row, then data rows              | [`CellValue::infer`]                 |
//! | `.json`   | array of flat objects                   | string / number / null / bool→text   |
//! | `.xlsx`, `.xlsm`, `.xls`, `.ods` | first worksheet, header row first | native cell type |
//!
//! Column order for JSON is first-seen order across objects; keys within one
//! object follow `serde_json` map order.

use std::fmt;
use std::path::Path;

use tsync_reconcile::{CellValue, NewRecord, RecordBatch};

mod spreadsheet;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum IngestError {
    Io(String),
    Csv(String),
    Json(String),
    /// File has no header row.
    MissingHeader,
    /// Structural problem: duplicate or blank column names, non-object rows.
    Shape(String),
    /// Workbook could not be opened or its first sheet decoded.
    Spreadsheet(String),
    UnsupportedFormat(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io(msg) => write!(f, "ingest io error: {msg}"),
            IngestError::Csv(msg) => write!(f, "ingest csv error: {msg}"),
            IngestError::Json(msg) => write!(f, "ingest json error: {msg}"),
            IngestError::MissingHeader => write!(f, "ingest: file has no header row"),
            IngestError::Shape(msg) => write!(f, "ingest shape error: {msg}"),
            IngestError::Spreadsheet(msg) => write!(f, "ingest spreadsheet error: {msg}"),
            IngestError::UnsupportedFormat(ext) => write!(
                f,
                "unsupported file format: '{ext}' (expected .csv, .json or .xlsx)"
            ),
        }
    }
}

impl std::error::Error for IngestError {}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read a record file, dispatching on its extension.
pub fn read_records_file(path: &Path) -> Result<RecordBatch, IngestError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => parse_csv_str(&read_text(path)?),
        "json" => parse_json_str(&read_text(path)?),
        e if spreadsheet::EXTENSIONS.contains(&e) => spreadsheet::read_first_sheet(path),
        other => Err(IngestError::UnsupportedFormat(other.to_string())),
    }
}

fn read_text(path: &Path) -> Result<String, IngestError> {
    std::fs::read_to_string(path)
        .map_err(|e| IngestError::Io(format!("read '{}': {e}", path.display())))
}

/// Parse CSV text. The first record is the header.
///
/// Fully blank data rows are skipped; short rows read as `Empty` for the
/// missing trailing cells.
pub fn parse_csv_str(src: &str) -> Result<RecordBatch, IngestError> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(src.as_bytes());

    let mut records = rdr.records();
    let header = match records.next() {
        Some(rec) => rec.map_err(|e| IngestError::Csv(e.to_string()))?,
        None => return Err(IngestError::MissingHeader),
    };
    let columns: Vec<String> = header.iter().map(|c| c.trim().to_string()).collect();
    check_columns(&columns)?;

    let mut out = Vec::new();
    for rec in records {
        let rec = rec.map_err(|e| IngestError::Csv(e.to_string()))?;
        if rec.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let mut row = NewRecord::new();
        for (i, col) in columns.iter().enumerate() {
            let cell = rec.get(i).map(CellValue::infer).unwrap_or_default();
            row.insert(col.clone(), cell);
        }
        out.push(row);
    }

    Ok(RecordBatch::new(columns, out))
}

/// Parse a JSON array of flat objects.
pub fn parse_json_str(src: &str) -> Result<RecordBatch, IngestError> {
    let value: serde_json::Value =
        serde_json::from_str(src).map_err(|e| IngestError::Json(e.to_string()))?;
    let items = value
        .as_array()
        .ok_or_else(|| IngestError::Shape("top-level JSON value must be an array".into()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut out = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| IngestError::Shape(format!("element {i} is not an object")))?;
        let mut row = NewRecord::new();
        for (k, v) in obj {
            let col = k.trim();
            if col.is_empty() {
                return Err(IngestError::Shape(format!("element {i} has a blank key")));
            }
            if v.is_array() || v.is_object() {
                return Err(IngestError::Shape(format!(
                    "element {i}: value of '{col}' is not a scalar"
                )));
            }
            if !columns.iter().any(|c| c == col) {
                columns.push(col.to_string());
            }
            row.insert(col.to_string(), CellValue::from(v));
        }
        out.push(row);
    }

    Ok(RecordBatch::new(columns, out))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn check_columns(columns: &[String]) -> Result<(), IngestError> {
    if columns.iter().all(|c| c.is_empty()) {
        return Err(IngestError::MissingHeader);
    }
    for (i, col) in columns.iter().enumerate() {
        if col.is_empty() {
            return Err(IngestError::Shape(format!("column {} has a blank name", i + 1)));
        }
        if columns[..i].contains(col) {
            return Err(IngestError::Shape(format!("duplicate column name '{col}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_infers_cell_types() {
        let b = parse_csv_str("ID,Name,Score\n1,Ann,10.5\n007,  Bob ,\n").unwrap();
        assert_eq!(b.columns, vec!["ID", "Name", "Score"]);
        assert_eq!(b.len(), 2);
        assert_eq!(b.records[0].get("ID"), Some(&CellValue::Number(1.0)));
        assert_eq!(b.records[0].get("Score"), Some(&CellValue::Number(10.5)));
        assert_eq!(b.records[1].get("ID"), Some(&CellValue::text("007")));
        assert_eq!(b.records[1].canonical("Name"), "Bob");
        assert_eq!(b.records[1].get("Score"), Some(&CellValue::Empty));
    }

    #[test]
    fn csv_short_rows_and_blank_lines() {
        let b = parse_csv_str("\u{feff}ID,Name\n1\n,\n2,Bo\n").unwrap();
        assert_eq!(b.columns, vec!["ID", "Name"]);
        assert_eq!(b.len(), 2);
        assert_eq!(b.records[0].get("Name"), Some(&CellValue::Empty));
    }

    #[test]
    fn csv_header_problems() {
        assert!(matches!(parse_csv_str(""), Err(IngestError::MissingHeader)));
        assert!(matches!(
            parse_csv_str("ID,Name,ID\n1,a,2\n"),
            Err(IngestError::Shape(_))
        ));
        assert!(matches!(
            parse_csv_str("ID,,Name\n1,a,2\n"),
            Err(IngestError::Shape(_))
        ));
    }

    #[test]
    fn json_scalars_and_column_order() {
        let b = parse_json_str(
            r#"[{"ID": 1, "Name": "Ann"}, {"ID": "2", "Active": true, "Score": null}]"#,
        )
        .unwrap();
        assert_eq!(b.columns, vec!["ID", "Name", "Active", "Score"]);
        assert_eq!(b.records[0].canonical("ID"), "1");
        assert_eq!(b.records[1].canonical("ID"), "2");
        assert_eq!(b.records[1].get("Active"), Some(&CellValue::text("true")));
        assert_eq!(b.records[1].get("Score"), Some(&CellValue::Empty));
    }

    #[test]
    fn json_shape_errors() {
        assert!(matches!(parse_json_str(r#"{"ID": 1}"#), Err(IngestError::Shape(_))));
        assert!(matches!(parse_json_str("[1, 2]"), Err(IngestError::Shape(_))));
        assert!(matches!(
            parse_json_str(r#"[{"ID": [1]}]"#),
            Err(IngestError::Shape(_))
        ));
        assert!(matches!(parse_json_str("[{"), Err(IngestError::Json(_))));
    }
}
