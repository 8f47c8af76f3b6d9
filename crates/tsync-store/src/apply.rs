//! Apply layer: push a reconciliation outcome into a store.
//!
//! Inserts go out as one append batch; every update is its own row-range
//! write. A failed write is recorded and the remaining writes still run.
//! Nothing is rolled back.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};
use tsync_reconcile::{normalize_width, ReconcileOutcome};

use crate::{a1, StoreError, TableStore};

/// What a failed write was trying to do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplyTarget {
    InsertBatch { rows: usize },
    Row { row: usize },
}

/// One failed insert batch or update row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RowApplyError {
    pub target: ApplyTarget,
    /// A1 range of the attempted write; a column span (`A:C`) for append batches.
    pub range: String,
    pub message: String,
}

impl fmt::Display for RowApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            ApplyTarget::InsertBatch { rows } => {
                write!(f, "Insert error ({rows} rows): {}", self.message)
            }
            ApplyTarget::Row { row } => {
                write!(f, "Update row {row} ({}) error: {}", self.range, self.message)
            }
        }
    }
}

impl std::error::Error for RowApplyError {}

/// Counts of successful writes plus every failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub inserted: usize,
    pub updated: usize,
    pub errors: Vec<RowApplyError>,
}

impl ApplySummary {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error messages in write order, as stored in the update log.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Write `header` as row 1 of an existing table that has no rows yet.
pub async fn bootstrap_header(
    store: &dyn TableStore,
    table: &str,
    header: &[String],
) -> Result<(), StoreError> {
    store.write_range(table, 1, header).await?;
    info!(table, columns = header.len(), "header bootstrapped");
    Ok(())
}

/// Append all inserts, then write every update row.
///
/// The outcome must have been computed from a snapshot of `table` taken
/// before any write, with no third-party writes in between: update rows are
/// addressed by position.
pub async fn apply_outcome(
    store: &dyn TableStore,
    table: &str,
    outcome: &ReconcileOutcome,
) -> ApplySummary {
    let width = outcome.header.len();
    let mut summary = ApplySummary::default();

    if !outcome.inserts.is_empty() {
        let rows: Vec<Vec<String>> = outcome
            .inserts
            .iter()
            .map(|r| normalize_width(r.cells.clone(), width))
            .collect();
        match store.append_rows(table, &rows).await {
            Ok(n) => {
                summary.inserted = n;
                info!(table, inserted = n, "inserts appended");
            }
            Err(e) => {
                warn!(table, rows = rows.len(), error = %e, "insert batch failed");
                summary.errors.push(RowApplyError {
                    target: ApplyTarget::InsertBatch { rows: rows.len() },
                    range: a1::column_span(width),
                    message: e.to_string(),
                });
            }
        }
    }

    for upd in &outcome.updates {
        let cells = normalize_width(upd.cells.clone(), width);
        let range = a1::row_range(upd.row, width);
        match store.write_range(table, upd.row, &cells).await {
            Ok(()) => {
                summary.updated += 1;
                debug!(table, range = %range, key = %upd.key, "row updated");
            }
            Err(e) => {
                warn!(table, range = %range, error = %e, "row update failed");
                summary.errors.push(RowApplyError {
                    target: ApplyTarget::Row { row: upd.row },
                    range,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        table,
        inserted = summary.inserted,
        updated = summary.updated,
        errors = summary.errors.len(),
        "apply finished"
    );
    summary
}
