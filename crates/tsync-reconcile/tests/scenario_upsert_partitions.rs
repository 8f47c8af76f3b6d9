//! Upsert partitioning on a small customer table.
//!
//! GREEN when:
//! - A changed existing key becomes an update at its table row with a full-width row.
//! - A new key becomes an insert aligned to the header.
//! - An empty incoming cell never counts as a change.
//! - An empty target table is signalled instead of guessed.
//! - A missing key column fails before anything is partitioned.

use tsync_reconcile::*;

fn header() -> Vec<String> {
    vec!["ID".into(), "Name".into(), "Score".into()]
}

fn rows() -> Vec<RawRow> {
    vec![
        vec!["1".into(), "Ann".into(), "10".into()],
        vec!["2".into(), "Bob".into(), "20".into()],
    ]
}

fn rec(id: &str, name: &str, score: &str) -> NewRecord {
    NewRecord::new()
        .with("ID", id)
        .with("Name", name)
        .with("Score", score)
}

fn batch(records: Vec<NewRecord>) -> RecordBatch {
    RecordBatch::new(vec!["ID".into(), "Name".into(), "Score".into()], records)
}

fn opts() -> ReconcileOptions {
    ReconcileOptions::new("ID").with_sync_columns(["Name", "Score"])
}

#[test]
fn changed_key_updates_and_new_key_inserts() {
    let b = batch(vec![rec("2", "Bob", "25"), rec("3", "Cara", "30")]);
    let r = reconcile(&header(), &rows(), &b, &opts()).unwrap();
    let out = r.outcome().expect("non-empty target");

    assert_eq!(
        out.inserts,
        vec![InsertRow {
            key: "3".into(),
            cells: vec!["3".into(), "Cara".into(), "30".into()],
        }]
    );
    assert_eq!(out.updates.len(), 1);
    assert_eq!(out.updates[0].row, 3);
    assert_eq!(out.updates[0].cells, vec!["2", "Bob", "25"]);
    assert_eq!(out.updates[0].changed_columns, vec!["Score".to_string()]);
    assert_eq!(out.unchanged, 0);
}

#[test]
fn insert_leaves_unsynced_cells_blank() {
    let b = batch(vec![rec("3", "Cara", "30")]);
    let o = ReconcileOptions::new("ID").with_sync_columns(["Name"]);
    let r = reconcile(&header(), &rows(), &b, &o).unwrap();
    assert_eq!(r.outcome().unwrap().insert_cells(), vec![vec!["3", "Cara", ""]]);
}

#[test]
fn empty_score_is_suppressed() {
    let b = batch(vec![rec("1", "Ann", "")]);
    let r = reconcile(&header(), &rows(), &b, &opts()).unwrap();
    let out = r.outcome().unwrap();
    assert_eq!(out.unchanged, 1);
    assert!(out.updates.is_empty());
    assert!(out.inserts.is_empty());
}

#[test]
fn empty_target_is_signalled() {
    let b = batch(vec![rec("1", "Ann", "10")]);
    let r = reconcile(&[], &[], &b, &opts()).unwrap();
    assert_eq!(r, Reconciliation::EmptyTarget);
    assert!(r.is_empty_target());
    assert!(r.outcome().is_none());
}

#[test]
fn missing_key_column_in_upload_is_configuration_error() {
    let b = RecordBatch::new(
        vec!["Name".into(), "Score".into()],
        vec![NewRecord::new().with("Name", "Ann").with("Score", "11")],
    );
    let err = reconcile(&header(), &rows(), &b, &opts()).unwrap_err();
    assert_eq!(
        err,
        ReconcileError::MissingKeyInRecords {
            key_column: "ID".into()
        }
    );
    assert!(err.is_configuration());
    assert!(err.to_string().contains("CONFIG_KEY_COLUMN_MISSING"));
}
