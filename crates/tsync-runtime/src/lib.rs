//! tsync-runtime
//!
//! One upsert run against one target table:
//!
//! 1. read the target table (a read failure aborts the run)
//! 2. reconcile the uploaded batch against it (configuration errors abort)
//! 3. bootstrap the header when the table has no rows
//! 4. apply inserts and updates, collecting per-row failures
//! 5. append one row to the update log (failure only warns)
//!
//! Nothing is written before step 3, so a run that fails validation leaves
//! the workbook untouched. Update rows are addressed by the positions read in
//! step 1; the caller must not let anything else write the table mid-run.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use tsync_audit::{append_update_log, RunSummary, UpdateLogEntry};
use tsync_reconcile::{
    reconcile, reconcile_with_index, KeyIndex, ReconcileOptions, ReconcileOutcome,
    Reconciliation, RecordBatch,
};
use tsync_store::{apply_outcome, bootstrap_header, ApplySummary, TableStore};

#[derive(Debug, Clone)]
pub struct UpsertRequest {
    pub table: String,
    /// Upload name as recorded in the update log.
    pub source_file: String,
    pub batch: RecordBatch,
    pub options: ReconcileOptions,
    /// Update log table; `None` disables logging.
    pub log: Option<String>,
    pub config_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpsertPlan {
    pub run_id: Uuid,
    pub table: String,
    /// Header to write as row 1 first; set only when the target had no rows.
    pub bootstrap_header: Option<Vec<String>>,
    pub outcome: ReconcileOutcome,
}

impl UpsertPlan {
    pub fn is_noop(&self) -> bool {
        self.bootstrap_header.is_none() && self.outcome.is_noop()
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub plan: UpsertPlan,
    pub applied: ApplySummary,
    /// Set when the update log could not be written. The run still counts.
    pub log_error: Option<String>,
}

/// Read and reconcile without writing anything.
pub async fn plan_upsert(store: &dyn TableStore, req: &UpsertRequest) -> Result<UpsertPlan> {
    let run_id = Uuid::new_v4();
    let raw = store
        .read_raw(&req.table)
        .await
        .with_context(|| format!("read target table '{}'", req.table))?;

    let reconciliation = reconcile(raw.header(), raw.data_rows(), &req.batch, &req.options)?;
    let (bootstrap, outcome) = match reconciliation {
        Reconciliation::Ready(outcome) => (None, outcome),
        Reconciliation::EmptyTarget => {
            let header = req.batch.columns.clone();
            let outcome = reconcile_with_index(
                &KeyIndex::default(),
                &header,
                &[],
                &req.batch,
                &req.options,
            )?;
            info!(table = %req.table, columns = header.len(), "target is empty; header will be bootstrapped");
            (Some(header), outcome)
        }
    };

    if !outcome.ignored_columns.is_empty() {
        warn!(
            table = %req.table,
            ignored = ?outcome.ignored_columns,
            "sync columns not in target header are ignored"
        );
    }
    if !outcome.target_duplicate_keys.is_empty() {
        warn!(
            table = %req.table,
            policy = ?req.options.target_duplicates,
            duplicates = ?outcome.target_duplicate_keys,
            "duplicate match keys in target table"
        );
    }
    info!(
        %run_id,
        store = store.kind(),
        table = %req.table,
        key = %req.options.key_column,
        inserts = outcome.inserts.len(),
        updates = outcome.updates.len(),
        unchanged = outcome.unchanged,
        skipped_blank_keys = outcome.skipped_blank_keys,
        "upsert planned"
    );

    Ok(UpsertPlan {
        run_id,
        table: req.table.clone(),
        bootstrap_header: bootstrap,
        outcome,
    })
}

/// Plan, then write: header bootstrap, inserts, updates, update log.
pub async fn run_upsert(store: &dyn TableStore, req: &UpsertRequest) -> Result<RunReport> {
    let plan = plan_upsert(store, req).await?;

    if let Some(header) = &plan.bootstrap_header {
        bootstrap_header(store, &plan.table, header)
            .await
            .with_context(|| format!("write header to '{}'", plan.table))?;
    }

    let applied = apply_outcome(store, &plan.table, &plan.outcome).await;

    let log_error = match &req.log {
        Some(log_table) => {
            let entry = log_entry(req, &plan, &applied);
            match append_update_log(store, log_table, &entry).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(run_id = %plan.run_id, error = %e, "update log not written");
                    Some(e.to_string())
                }
            }
        }
        None => None,
    };

    info!(
        run_id = %plan.run_id,
        table = %plan.table,
        inserted = applied.inserted,
        updated = applied.updated,
        errors = applied.errors.len(),
        "upsert finished"
    );

    Ok(RunReport {
        plan,
        applied,
        log_error,
    })
}

fn log_entry(req: &UpsertRequest, plan: &UpsertPlan, applied: &ApplySummary) -> UpdateLogEntry {
    UpdateLogEntry {
        run_id: plan.run_id,
        timestamp: Utc::now(),
        table: plan.table.clone(),
        matching_column: req.options.key_column.clone(),
        inserted: applied.inserted,
        updated: applied.updated,
        errors: applied.error_messages(),
        source_file: req.source_file.clone(),
        summary: RunSummary::from_outcome(plan.run_id, &plan.outcome, req.config_hash.clone()),
    }
}
