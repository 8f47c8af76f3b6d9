//! tsync-store
//!
//! Table store boundary for the upsert pipeline.
//!
//! This crate owns the store abstraction and two concrete stores:
//! - [`CsvWorkbook`]: a directory where every table is `<name>.csv`
//! - [`MemoryWorkbook`]: deterministic in-memory store with injectable failures
//!
//! It also owns the apply layer ([`apply_outcome`]) that turns a
//! reconciliation outcome into appends and row-range writes.
//!
//! Row positions are 1-based and the header is row 1, matching how
//! `tsync-reconcile` addresses rows.

pub mod a1;
mod apply;
mod csv_workbook;
mod error;
mod memory;

pub use apply::{apply_outcome, bootstrap_header, ApplySummary, ApplyTarget, RowApplyError};
pub use csv_workbook::CsvWorkbook;
pub use error::StoreError;
pub use memory::{MemoryWorkbook, WriteOp};

use tsync_reconcile::{CellValue, NewRecord, RawRow, RecordBatch};

/// Positional view of a table: row 0 is the header, the rest is data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    /// Header cells, or an empty slice for a table with no rows at all.
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows below the header; `data_rows()[0]` is table row 2.
    pub fn data_rows(&self) -> &[RawRow] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header-keyed view of the data rows with inferred cell types.
    ///
    /// Columns with a blank header name are skipped; missing trailing cells
    /// read as [`CellValue::Empty`].
    pub fn to_records(&self) -> RecordBatch {
        let header = self.header();
        let columns: Vec<String> = header
            .iter()
            .filter(|c| !c.trim().is_empty())
            .cloned()
            .collect();

        let records = self
            .data_rows()
            .iter()
            .map(|row| {
                let mut rec = NewRecord::new();
                for (i, col) in header.iter().enumerate() {
                    if col.trim().is_empty() {
                        continue;
                    }
                    let cell = row
                        .get(i)
                        .map(|c| CellValue::infer(c))
                        .unwrap_or(CellValue::Empty);
                    rec.insert(col.clone(), cell);
                }
                rec
            })
            .collect();

        RecordBatch::new(columns, records)
    }
}

/// Connection-scoped access to one workbook of tables.
///
/// Implementations are handed explicitly to every caller; there is no global
/// session. Writes are not transactional: every call stands alone.
#[async_trait::async_trait]
pub trait TableStore: Send + Sync {
    /// Stable name for logs (`csv`, `memory`).
    fn kind(&self) -> &'static str;

    /// Table names, sorted.
    async fn list_tables(&self) -> Result<Vec<String>, StoreError>;

    /// Header row plus data rows, by position.
    async fn read_raw(&self, table: &str) -> Result<RawTable, StoreError>;

    /// Create a new table whose first row is `header`.
    async fn create_table(&self, table: &str, header: &[String]) -> Result<(), StoreError>;

    /// Append rows after the last row. Returns the number of rows written.
    async fn append_rows(&self, table: &str, rows: &[RawRow]) -> Result<usize, StoreError>;

    /// Overwrite row `row` (1-based) with `cells`, from column A onward.
    ///
    /// Writing past the current end extends the table with blank rows.
    async fn write_range(&self, table: &str, row: usize, cells: &[String])
        -> Result<(), StoreError>;

    /// Header-keyed view for previews and matching-column discovery.
    async fn read_records(&self, table: &str) -> Result<RecordBatch, StoreError> {
        Ok(self.read_raw(table).await?.to_records())
    }

    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.list_tables().await?.iter().any(|t| t == table))
    }
}

/// Reject names that are empty or could address something outside the workbook.
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let bad = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name != name.trim();
    if bad {
        return Err(StoreError::InvalidTableName(name.to_string()));
    }
    Ok(())
}
