//! Directory-backed workbook: every table is one CSV file.
//!
//! Rows are read with `flexible(true)` so short rows keep their stored width;
//! the reconciler pads them, the store never does on read. Every write
//! rewrites the whole file through a temp file + rename.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use tsync_reconcile::RawRow;

use crate::{validate_table_name, RawTable, StoreError, TableStore};

const TABLE_EXT: &str = "csv";

#[derive(Debug)]
pub struct CsvWorkbook {
    root: PathBuf,
}

impl CsvWorkbook {
    /// Acquire a connection to the workbook at `root`. The directory must exist.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", root.display())))?;
        if !meta.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{}: not a directory",
                root.display()
            )));
        }
        info!(root = %root.display(), "workbook opened");
        Ok(Self { root })
    }

    /// Release the connection. Nothing is buffered, so this only ends the handle.
    pub fn close(self) {
        info!(root = %self.root.display(), "workbook closed");
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, table: &str) -> Result<PathBuf, StoreError> {
        validate_table_name(table)?;
        Ok(self.root.join(format!("{table}.{TABLE_EXT}")))
    }

    async fn load(&self, table: &str) -> Result<(PathBuf, Vec<RawRow>), StoreError> {
        let path = self.table_path(table)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::TableNotFound(table.to_string()))
            }
            Err(e) => return Err(StoreError::Io(format!("read {}: {e}", path.display()))),
        };
        Ok((path, decode_rows(&bytes)?))
    }

    async fn store(&self, path: &Path, rows: &[RawRow]) -> Result<(), StoreError> {
        let bytes = encode_rows(rows)?;
        let tmp = path.with_extension(format!("{TABLE_EXT}.tmp"));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::Io(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Io(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableStore for CsvWorkbook {
    fn kind(&self) -> &'static str {
        "csv"
    }

    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::Io(format!("list {}: {e}", self.root.display())))?;

        let mut out = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(format!("list {}: {e}", self.root.display())))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.push(stem.to_string());
            }
        }
        out.sort();
        Ok(out)
    }

    async fn read_raw(&self, table: &str) -> Result<RawTable, StoreError> {
        let (_, rows) = self.load(table).await?;
        debug!(table, rows = rows.len(), "read raw table");
        Ok(RawTable::new(rows))
    }

    async fn create_table(&self, table: &str, header: &[String]) -> Result<(), StoreError> {
        let path = self.table_path(table)?;
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::Io(format!("stat {}: {e}", path.display())))?
        {
            return Err(StoreError::TableExists(table.to_string()));
        }
        self.store(&path, &[header.to_vec()]).await?;
        info!(table, columns = header.len(), "table created");
        Ok(())
    }

    async fn append_rows(&self, table: &str, rows: &[RawRow]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let (path, mut existing) = self.load(table).await?;
        existing.extend(rows.iter().cloned());
        self.store(&path, &existing).await?;
        debug!(table, appended = rows.len(), "rows appended");
        Ok(rows.len())
    }

    async fn write_range(
        &self,
        table: &str,
        row: usize,
        cells: &[String],
    ) -> Result<(), StoreError> {
        if row == 0 {
            return Err(StoreError::RowOutOfRange {
                table: table.to_string(),
                row,
            });
        }
        let (path, mut existing) = self.load(table).await?;
        if existing.len() < row {
            existing.resize(row, Vec::new());
        }
        existing[row - 1] = overlay(&existing[row - 1], cells);
        self.store(&path, &existing).await?;
        debug!(table, row, width = cells.len(), "row written");
        Ok(())
    }
}

/// Cells `A..` come from `cells`; anything the stored row had past that is kept.
pub(crate) fn overlay(stored: &[String], cells: &[String]) -> RawRow {
    let mut out = cells.to_vec();
    if stored.len() > cells.len() {
        out.extend(stored[cells.len()..].iter().cloned());
    }
    out
}

fn decode_rows(bytes: &[u8]) -> Result<Vec<RawRow>, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let mut row: RawRow = rec.iter().map(str::to_string).collect();
        // A blank row is stored as a single empty field.
        if row.len() == 1 && row[0].is_empty() {
            row.clear();
        }
        rows.push(row);
    }
    Ok(rows)
}

fn encode_rows(rows: &[RawRow]) -> Result<Vec<u8>, StoreError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        // An empty line would be skipped on read and shift every row below it.
        if row.is_empty() {
            wtr.write_record([""])?;
        } else {
            wtr.write_record(row)?;
        }
    }
    wtr.into_inner()
        .map_err(|e| StoreError::Csv(format!("flush: {e}")))
}
