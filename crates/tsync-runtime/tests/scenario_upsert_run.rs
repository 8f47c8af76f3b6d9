//! End-to-end upsert runs against an in-memory workbook.
//!
//! GREEN when:
//! - A run applies inserts and updates and logs once; a second identical run
//!   is a no-op.
//! - An empty target gets its header before any data row.
//! - Validation and read failures abort before any write.
//! - Row and log failures are reported without failing the run.
//! - Duplicate keys already in the target are surfaced in the plan.

use tsync_audit::{read_update_log, LOG_HEADER, LOG_TABLE};
use tsync_reconcile::{NewRecord, ReconcileError, ReconcileOptions, RecordBatch};
use tsync_runtime::{plan_upsert, run_upsert, UpsertRequest};
use tsync_store::{MemoryWorkbook, WriteOp};

fn s(v: &[&str]) -> Vec<String> {
    v.iter().map(|c| c.to_string()).collect()
}

fn seeded() -> Vec<Vec<String>> {
    vec![
        s(&["ID", "Name", "Score"]),
        s(&["1", "Ann", "10"]),
        s(&["2", "Bob", "20"]),
    ]
}

fn batch() -> RecordBatch {
    let rec = |id: &str, name: &str, score: &str| {
        NewRecord::new()
            .with("ID", id)
            .with("Name", name)
            .with("Score", score)
    };
    RecordBatch::new(
        s(&["ID", "Name", "Score"]),
        vec![rec("2", "Bob", "25"), rec("3", "Cara", "30")],
    )
}

fn request(batch: RecordBatch, key: &str) -> UpsertRequest {
    UpsertRequest {
        table: "Customers".into(),
        source_file: "new.csv".into(),
        batch,
        options: ReconcileOptions::new(key).with_sync_columns(["Name", "Score"]),
        log: Some(LOG_TABLE.into()),
        config_hash: Some("cfg".into()),
    }
}

#[tokio::test]
async fn run_applies_logs_and_second_run_is_noop() {
    let wb = MemoryWorkbook::new();
    wb.seed("Customers", seeded()).await;

    let first = run_upsert(&wb, &request(batch(), "ID")).await.unwrap();
    assert_eq!(first.applied.inserted, 1);
    assert_eq!(first.applied.updated, 1);
    assert!(first.applied.is_clean());
    assert!(first.log_error.is_none());

    assert_eq!(
        wb.snapshot("Customers").await.unwrap(),
        vec![
            s(&["ID", "Name", "Score"]),
            s(&["1", "Ann", "10"]),
            s(&["2", "Bob", "25"]),
            s(&["3", "Cara", "30"]),
        ]
    );

    let second = run_upsert(&wb, &request(batch(), "ID")).await.unwrap();
    assert!(second.plan.is_noop());
    assert_eq!(second.plan.outcome.unchanged, 2);

    let log = read_update_log(&wb, LOG_TABLE).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].run_id, first.plan.run_id);
    assert_eq!(log[0].inserted, 1);
    assert_eq!(log[0].summary.config_hash.as_deref(), Some("cfg"));
    assert_eq!(log[1].inserted, 0);
}

#[tokio::test]
async fn empty_target_gets_header_before_data() {
    let wb = MemoryWorkbook::new();
    wb.seed("Customers", vec![]).await;

    let mut req = request(batch(), "ID");
    req.log = None;
    let report = run_upsert(&wb, &req).await.unwrap();

    assert_eq!(report.plan.bootstrap_header, Some(s(&["ID", "Name", "Score"])));
    assert_eq!(report.applied.inserted, 2);
    assert_eq!(
        wb.writes().await,
        vec![
            WriteOp::Range {
                table: "Customers".into(),
                row: 1
            },
            WriteOp::Append {
                table: "Customers".into(),
                rows: 2
            },
        ]
    );
    assert_eq!(
        wb.snapshot("Customers").await.unwrap(),
        vec![
            s(&["ID", "Name", "Score"]),
            s(&["2", "Bob", "25"]),
            s(&["3", "Cara", "30"]),
        ]
    );
}

#[tokio::test]
async fn missing_key_aborts_before_any_write() {
    let wb = MemoryWorkbook::new();
    wb.seed("Customers", seeded()).await;

    let err = run_upsert(&wb, &request(batch(), "CustomerNo"))
        .await
        .unwrap_err();
    let re = err.downcast_ref::<ReconcileError>().unwrap();
    assert!(re.is_configuration());
    assert!(wb.writes().await.is_empty());
    assert!(plan.outcome.target_duplicate_keys.is_empty());
}

#[tokio::test]
async fn plan_reports_duplicate_target_keys() {
    let wb = MemoryWorkbook::new();
    let mut rows = seeded();
    rows.push(s(&["2", "Bob", "21"]));
    wb.seed("Customers", rows).await;

    let plan = plan_upsert(&wb, &request(batch(), "ID")).await.unwrap();
    assert_eq!(plan.outcome.target_duplicate_keys, vec!["2".to_string()]);
    // Default policy updates the last occurrence.
    assert_eq!(plan.outcome.updates[0].row, 4);
    assert_eq!(plan.outcome.updates[0].key, "2");
}

#[tokio::test]
async fn read_failure_aborts_before_any_write() {
    let wb = MemoryWorkbook::new();
    wb.seed("Customers", seeded()).await;
    wb.fail_reads_of("Customers").await;

    let err = run_upsert(&wb, &request(batch(), "ID")).await.unwrap_err();
    assert!(format!("{err:#}").contains("read target table 'Customers'"));
    assert!(wb.writes().await.is_empty());

    let missing = MemoryWorkbook::new();
    assert!(plan_upsert(&missing, &request(batch(), "ID")).await.is_err());
}

#[tokio::test]
async fn row_and_log_failures_do_not_fail_the_run() {
    let wb = MemoryWorkbook::new();
    wb.seed("Customers", seeded()).await;
    wb.fail_write_at("Customers", 3).await;
    wb.fail_create_of(LOG_TABLE).await;

    let report = run_upsert(&wb, &request(batch(), "ID")).await.unwrap();
    assert_eq!(report.applied.inserted, 1);
    assert_eq!(report.applied.updated, 0);
    assert_eq!(report.applied.errors.len(), 1);
    assert!(report.log_error.as_deref().unwrap().contains(LOG_TABLE));
}

#[tokio::test]
async fn row_errors_are_logged() {
    let wb = MemoryWorkbook::new();
    wb.seed("Customers", seeded()).await;
    wb.fail_write_at("Customers", 3).await;

    run_upsert(&wb, &request(batch(), "ID")).await.unwrap();

    let rows = wb.snapshot(LOG_TABLE).await.unwrap();
    assert_eq!(rows[0], LOG_HEADER.to_vec());
    assert!(rows[1][5].contains("Update row 3 (A3:C3) error"));
}

#[tokio::test]
async fn plan_writes_nothing() {
    let wb = MemoryWorkbook::new();
    wb.seed("Customers", seeded()).await;

    let plan = plan_upsert(&wb, &request(batch(), "ID")).await.unwrap();
    assert_eq!(plan.outcome.inserts.len(), 1);
    assert_eq!(plan.outcome.updates[0].row, 3);
    assert!(wb.writes().await.is_empty());
}
