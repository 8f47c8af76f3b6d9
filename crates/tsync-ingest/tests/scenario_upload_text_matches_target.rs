//! Uploaded CSV text compared against the target's stored text.
//!
//! GREEN when:
//! - A 17-digit ID matches its existing row and keeps every digit.
//! - A key spelled "2.0" matches "2.0", not a new "2".
//! - Re-uploading the target's own "1.10" is unchanged, not rewritten to "1.1".

use tsync_ingest::parse_csv_str;
use tsync_reconcile::{reconcile, RawRow, ReconcileOptions};

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn row(cells: &[&str]) -> RawRow {
    cells.iter().map(|c| c.to_string()).collect()
}

#[test]
fn long_numeric_id_matches_existing_row() {
    let batch = parse_csv_str("ID,Name\n12345678901234567,Anne\n").unwrap();
    let opts = ReconcileOptions::new("ID");
    let r = reconcile(
        &header(&["ID", "Name"]),
        &[row(&["12345678901234567", "Ann"])],
        &batch,
        &opts,
    )
    .unwrap();
    let out = r.outcome().unwrap();

    assert!(out.inserts.is_empty(), "inserts: {:?}", out.inserts);
    assert_eq!(out.updates.len(), 1);
    assert_eq!(out.updates[0].key, "12345678901234567");
    assert_eq!(out.updates[0].row, 2);
    assert_eq!(out.updates[0].cells, vec!["12345678901234567", "Anne"]);
}

#[test]
fn decimal_spelled_key_matches_verbatim() {
    let batch = parse_csv_str("ID,Name\n2.0,Anne\n").unwrap();
    let opts = ReconcileOptions::new("ID");
    let r = reconcile(&header(&["ID", "Name"]), &[row(&["2.0", "Ann"])], &batch, &opts).unwrap();
    let out = r.outcome().unwrap();

    assert!(out.inserts.is_empty(), "inserts: {:?}", out.inserts);
    assert_eq!(out.updates.len(), 1);
    assert_eq!(out.updates[0].key, "2.0");
    assert_eq!(out.updates[0].cells, vec!["2.0", "Anne"]);
}

#[test]
fn identical_upload_with_trailing_zero_is_unchanged() {
    let batch = parse_csv_str("SKU,Price\nA,1.10\n").unwrap();
    let opts = ReconcileOptions::new("SKU");
    let r = reconcile(&header(&["SKU", "Price"]), &[row(&["A", "1.10"])], &batch, &opts).unwrap();
    let out = r.outcome().unwrap();

    assert!(out.inserts.is_empty());
    assert!(out.updates.is_empty(), "updates: {:?}", out.updates);
    assert_eq!(out.unchanged, 1);
}
