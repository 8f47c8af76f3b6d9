//! Deterministic in-memory workbook.
//!
//! Used by tests and dry runs. Records every successful write in order so
//! callers can assert on write sequencing, and can be told to fail specific
//! reads, appends or row writes.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::RwLock;
use tsync_reconcile::RawRow;

use crate::csv_workbook::overlay;
use crate::{validate_table_name, RawTable, StoreError, TableStore};

/// One successful write, in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Create { table: String },
    Append { table: String, rows: usize },
    Range { table: String, row: usize },
}

#[derive(Debug, Default)]
struct Faults {
    reads: BTreeSet<String>,
    appends: BTreeSet<String>,
    rows: BTreeSet<(String, usize)>,
    creates: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<String, Vec<RawRow>>,
    writes: Vec<WriteOp>,
    faults: Faults,
}

#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    inner: RwLock<Inner>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with raw rows (row 0 is the header).
    pub async fn seed(&self, table: &str, rows: Vec<RawRow>) {
        self.inner
            .write()
            .await
            .tables
            .insert(table.to_string(), rows);
    }

    /// Current raw rows of a table (None if it does not exist).
    pub async fn snapshot(&self, table: &str) -> Option<Vec<RawRow>> {
        self.inner.read().await.tables.get(table).cloned()
    }

    pub async fn writes(&self) -> Vec<WriteOp> {
        self.inner.read().await.writes.clone()
    }

    pub async fn fail_reads_of(&self, table: &str) {
        self.inner.write().await.faults.reads.insert(table.to_string());
    }

    pub async fn fail_appends_to(&self, table: &str) {
        self.inner.write().await.faults.appends.insert(table.to_string());
    }

    pub async fn fail_write_at(&self, table: &str, row: usize) {
        self.inner
            .write()
            .await
            .faults
            .rows
            .insert((table.to_string(), row));
    }

    pub async fn fail_create_of(&self, table: &str) {
        self.inner.write().await.faults.creates.insert(table.to_string());
    }
}

#[async_trait::async_trait]
impl TableStore for MemoryWorkbook {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        // BTreeMap keys are already sorted.
        Ok(self.inner.read().await.tables.keys().cloned().collect())
    }

    async fn read_raw(&self, table: &str) -> Result<RawTable, StoreError> {
        let inner = self.inner.read().await;
        if inner.faults.reads.contains(table) {
            return Err(StoreError::Injected(format!("read {table}")));
        }
        inner
            .tables
            .get(table)
            .cloned()
            .map(RawTable::new)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    async fn create_table(&self, table: &str, header: &[String]) -> Result<(), StoreError> {
        validate_table_name(table)?;
        let mut inner = self.inner.write().await;
        if inner.faults.creates.contains(table) {
            return Err(StoreError::Injected(format!("create {table}")));
        }
        if inner.tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        inner
            .tables
            .insert(table.to_string(), vec![header.to_vec()]);
        inner.writes.push(WriteOp::Create {
            table: table.to_string(),
        });
        Ok(())
    }

    async fn append_rows(&self, table: &str, rows: &[RawRow]) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.faults.appends.contains(table) {
            return Err(StoreError::Injected(format!("append {table}")));
        }
        let stored = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        stored.extend(rows.iter().cloned());
        inner.writes.push(WriteOp::Append {
            table: table.to_string(),
            rows: rows.len(),
        });
        Ok(rows.len())
    }

    async fn write_range(
        &self,
        table: &str,
        row: usize,
        cells: &[String],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.faults.rows.contains(&(table.to_string(), row)) {
            return Err(StoreError::Injected(format!("write {table} row {row}")));
        }
        if row == 0 {
            return Err(StoreError::RowOutOfRange {
                table: table.to_string(),
                row,
            });
        }
        let stored = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        if stored.len() < row {
            stored.resize(row, Vec::new());
        }
        stored[row - 1] = overlay(&stored[row - 1], cells);
        inner.writes.push(WriteOp::Range {
            table: table.to_string(),
            row,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> RawRow {
        v.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn write_range_past_end_extends_with_blank_rows() {
        let wb = MemoryWorkbook::new();
        wb.seed("T", vec![s(&["ID"])]).await;
        wb.write_range("T", 4, &s(&["9"])).await.unwrap();
        let rows = wb.snapshot("T").await.unwrap();
        assert_eq!(rows, vec![s(&["ID"]), vec![], vec![], s(&["9"])]);
    }

    #[tokio::test]
    async fn injected_faults_fail_only_their_target() {
        let wb = MemoryWorkbook::new();
        wb.seed("T", vec![s(&["ID"]), s(&["1"]), s(&["2"])]).await;
        wb.fail_write_at("T", 2).await;

        assert!(matches!(
            wb.write_range("T", 2, &s(&["x"])).await,
            Err(StoreError::Injected(_))
        ));
        wb.write_range("T", 3, &s(&["y"])).await.unwrap();
        assert_eq!(
            wb.writes().await,
            vec![WriteOp::Range {
                table: "T".into(),
                row: 3
            }]
        );
    }

    #[tokio::test]
    async fn create_rejects_existing_table() {
        let wb = MemoryWorkbook::new();
        wb.create_table("L", &s(&["a"])).await.unwrap();
        assert_eq!(
            wb.create_table("L", &s(&["a"])).await,
            Err(StoreError::TableExists("L".into()))
        );
        assert!(wb.table_exists("L").await.unwrap());
    }
}
