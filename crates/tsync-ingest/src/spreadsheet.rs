//! Spreadsheet uploads (`.xlsx`, `.xlsm`, `.xls`, `.ods`).
//!
//! Only the first worksheet is read. Its first row is the header.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use tsync_reconcile::{CellValue, NewRecord, RecordBatch};

use crate::{check_columns, IngestError};

pub(crate) const EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

pub(crate) fn read_first_sheet(path: &Path) -> Result<RecordBatch, IngestError> {
    let bytes = std::fs::read(path)
        .map_err(|e| IngestError::Io(format!("read '{}': {e}", path.display())))?;
    // Format is sniffed from content.
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| IngestError::Spreadsheet(format!("'{}': {e}", path.display())))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(r) => r.map_err(|e| IngestError::Spreadsheet(e.to_string()))?,
        None => return Err(IngestError::MissingHeader),
    };

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(IngestError::MissingHeader);
    };
    let columns: Vec<String> = header.iter().map(|c| cell_value(c).canonical()).collect();
    check_columns(&columns)?;

    let mut out = Vec::new();
    for row in rows {
        let cells: Vec<CellValue> = row.iter().map(cell_value).collect();
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }
        let mut record = NewRecord::new();
        for (i, col) in columns.iter().enumerate() {
            record.insert(col.clone(), cells.get(i).cloned().unwrap_or_default());
        }
        out.push(record);
    }

    Ok(RecordBatch::new(columns, out))
}

/// Typed cells map onto the same variants a CSV or JSON upload produces.
/// Integer cells keep their exact digits; error cells read as blank.
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Text(n.to_string()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => CellValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Text(cell.to_string()),
        },
        other => CellValue::Text(other.to_string()),
    }
}
