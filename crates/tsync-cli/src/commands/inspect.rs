//! Read-only workbook commands: tables, preview, history.

use std::path::Path;

use anyhow::{Context, Result};
use tsync_audit::{format_timestamp, read_update_log};
use tsync_store::{CsvWorkbook, TableStore};

use super::join_cells;

async fn open(store: &Path) -> Result<CsvWorkbook> {
    CsvWorkbook::open(store)
        .await
        .with_context(|| format!("open workbook {}", store.display()))
}

pub async fn tables(store: &Path) -> Result<()> {
    let wb = open(store).await?;
    let names = wb.list_tables().await;
    wb.close();
    let names = names.context("list tables failed")?;

    for name in &names {
        println!("table={name}");
    }
    println!("tables={}", names.len());
    Ok(())
}

pub async fn preview(store: &Path, table: &str, rows: usize) -> Result<()> {
    let wb = open(store).await?;
    let raw = wb.read_raw(table).await;
    wb.close();
    let raw = raw.with_context(|| format!("read table '{table}'"))?;

    let header = raw.header();
    println!("table={table}");
    println!("columns={}", join_cells(header));
    println!("rows={}", raw.data_rows().len());

    for (i, row) in raw.data_rows().iter().take(rows).enumerate() {
        let cells: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(c, name)| format!("{name}={}", row.get(c).map(String::as_str).unwrap_or("")))
            .collect();
        // Data rows start at table row 2.
        println!("row={} {}", i + 2, cells.join(" "));
    }
    Ok(())
}

pub async fn history(store: &Path, log_table: &str, last: Option<usize>) -> Result<()> {
    let wb = open(store).await?;
    let entries = read_update_log(&wb, log_table).await;
    wb.close();
    let entries = entries.with_context(|| format!("read update log '{log_table}'"))?;

    let skip = last.map(|n| entries.len().saturating_sub(n)).unwrap_or(0);
    for e in entries.iter().skip(skip) {
        println!(
            "timestamp={} run_id={} sheet={} matching_col={} added={} updated={} errors={} user_file={}",
            format_timestamp(&e.timestamp),
            e.run_id,
            e.table,
            e.matching_column,
            e.inserted,
            e.updated,
            e.errors.len(),
            e.source_file
        );
    }
    println!("entries={}", entries.len());
    Ok(())
}
