//! tsync-audit
//!
//! Update log for upsert runs. One row per run is appended to a log table
//! (default `__update_log__`) in the same workbook as the target table.
//!
//! The log is best effort: a failed append surfaces as [`LogWriteError`] and
//! callers warn instead of failing the run.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use tsync_reconcile::ReconcileOutcome;
use tsync_store::TableStore;

pub const LOG_TABLE: &str = "__update_log__";

/// Fixed column layout of the log table.
pub const LOG_HEADER: [&str; 8] = [
    "timestamp",
    "sheet",
    "matching_col",
    "added",
    "updated",
    "errors",
    "user_file",
    "raw_summary",
];

/// Planned counts and provenance, stored as JSON in `raw_summary`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub rows_insert: usize,
    pub rows_update: usize,
    pub rows_unchanged: usize,
    pub skipped_blank_keys: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

impl RunSummary {
    pub fn from_outcome(run_id: Uuid, outcome: &ReconcileOutcome, config_hash: Option<String>) -> Self {
        Self {
            run_id,
            rows_insert: outcome.inserts.len(),
            rows_update: outcome.updates.len(),
            rows_unchanged: outcome.unchanged,
            skipped_blank_keys: outcome.skipped_blank_keys,
            config_hash,
        }
    }
}

/// One log row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateLogEntry {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub table: String,
    pub matching_column: String,
    pub inserted: usize,
    pub updated: usize,
    pub errors: Vec<String>,
    pub source_file: String,
    pub summary: RunSummary,
}

impl UpdateLogEntry {
    /// Render as cells in [`LOG_HEADER`] order.
    pub fn to_row(&self) -> Result<Vec<String>, serde_json::Error> {
        Ok(vec![
            format_timestamp(&self.timestamp),
            self.table.clone(),
            self.matching_column.clone(),
            self.inserted.to_string(),
            self.updated.to_string(),
            serde_json::to_string(&self.errors)?,
            self.source_file.clone(),
            serde_json::to_string(&self.summary)?,
        ])
    }

    /// Parse a row previously written by [`UpdateLogEntry::to_row`].
    pub fn from_row(row: &[String]) -> Result<Self, String> {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let timestamp = DateTime::parse_from_rfc3339(cell(0))
            .map_err(|e| format!("timestamp '{}': {e}", cell(0)))?
            .with_timezone(&Utc);
        let count = |i: usize| {
            cell(i)
                .parse::<usize>()
                .map_err(|e| format!("{} '{}': {e}", LOG_HEADER[i], cell(i)))
        };
        let errors: Vec<String> =
            serde_json::from_str(cell(5)).map_err(|e| format!("errors: {e}"))?;
        let summary: RunSummary =
            serde_json::from_str(cell(7)).map_err(|e| format!("raw_summary: {e}"))?;

        Ok(Self {
            run_id: summary.run_id,
            timestamp,
            table: cell(1).to_string(),
            matching_column: cell(2).to_string(),
            inserted: count(3)?,
            updated: count(4)?,
            errors,
            source_file: cell(6).to_string(),
            summary,
        })
    }
}

/// UTC, microsecond precision, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn log_header() -> Vec<String> {
    LOG_HEADER.iter().map(|c| c.to_string()).collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogWriteError {
    pub table: String,
    pub message: String,
}

impl fmt::Display for LogWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to write update log to '{}': {}",
            self.table, self.message
        )
    }
}

impl std::error::Error for LogWriteError {}

/// Append `entry` to `log_table`, creating the table with [`LOG_HEADER`] on
/// first use. A table that exists but has no rows gets the header first.
pub async fn append_update_log(
    store: &dyn TableStore,
    log_table: &str,
    entry: &UpdateLogEntry,
) -> Result<(), LogWriteError> {
    let fail = |message: String| LogWriteError {
        table: log_table.to_string(),
        message,
    };

    let row = entry.to_row().map_err(|e| fail(format!("encode: {e}")))?;

    let exists = store
        .table_exists(log_table)
        .await
        .map_err(|e| fail(e.to_string()))?;
    if !exists {
        store
            .create_table(log_table, &log_header())
            .await
            .map_err(|e| fail(e.to_string()))?;
        info!(table = log_table, "update log table created");
    } else {
        let raw = store
            .read_raw(log_table)
            .await
            .map_err(|e| fail(e.to_string()))?;
        if raw.is_empty() {
            store
                .write_range(log_table, 1, &log_header())
                .await
                .map_err(|e| fail(e.to_string()))?;
        }
    }

    store
        .append_rows(log_table, &[row])
        .await
        .map_err(|e| fail(e.to_string()))?;
    debug!(table = log_table, run_id = %entry.run_id, "update log appended");
    Ok(())
}

/// All parseable entries of a log table, oldest first. Rows that do not
/// parse are skipped.
pub async fn read_update_log(
    store: &dyn TableStore,
    log_table: &str,
) -> Result<Vec<UpdateLogEntry>, tsync_store::StoreError> {
    let raw = store.read_raw(log_table).await?;
    Ok(raw
        .data_rows()
        .iter()
        .filter_map(|r| UpdateLogEntry::from_row(r).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> UpdateLogEntry {
        let run_id = Uuid::new_v4();
        UpdateLogEntry {
            run_id,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            table: "Customers".into(),
            matching_column: "ID".into(),
            inserted: 2,
            updated: 1,
            errors: vec!["Update row 4 (A4:C4) error: boom".into()],
            source_file: "new.csv".into(),
            summary: RunSummary {
                run_id,
                rows_insert: 2,
                rows_update: 2,
                rows_unchanged: 5,
                skipped_blank_keys: 0,
                config_hash: Some("abc".into()),
            },
        }
    }

    #[test]
    fn row_matches_header_layout() {
        let row = entry().to_row().unwrap();
        assert_eq!(row.len(), LOG_HEADER.len());
        assert_eq!(row[0], "2024-05-01T12:30:00.000000Z");
        assert_eq!(row[1], "Customers");
        assert_eq!(row[3], "2");
        assert_eq!(row[5], r#"["Update row 4 (A4:C4) error: boom"]"#);
        assert!(row[7].contains("\"rows_insert\":2"));
        assert!(row[7].contains("\"config_hash\":\"abc\""));
    }

    #[test]
    fn row_parses_back() {
        let e = entry();
        let back = UpdateLogEntry::from_row(&e.to_row().unwrap()).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn bad_row_is_rejected() {
        let row: Vec<String> = vec!["yesterday".into()];
        assert!(UpdateLogEntry::from_row(&row).unwrap_err().starts_with("timestamp"));
    }
}
