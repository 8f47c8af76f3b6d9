use std::collections::{BTreeMap, BTreeSet};

use crate::index::{build_key_index, header_position, KeyIndex, FIRST_DATA_ROW};
use crate::{
    DuplicateSide, IncomingDuplicatePolicy, InsertRow, NewRecord, RawRow, RecordBatch,
    ReconcileError, ReconcileOptions, ReconcileOutcome, Reconciliation, UpdateRow,
};

/// Pad with empty cells or truncate so the row has exactly `width` cells.
pub fn normalize_width(mut row: Vec<String>, width: usize) -> Vec<String> {
    row.resize(width, String::new());
    row
}

/// A sync column that exists in the target header.
struct SyncSlot<'a> {
    column: &'a str,
    pos: usize,
}

/// Deterministic reconciliation of `batch` against the target table.
///
/// `header` is table row 1, `rows` the data rows below it (row 2 onward).
///
/// Validation happens first, in this order, before anything is partitioned:
/// 1) key column must be a batch column
/// 2) an empty header short-circuits to [`Reconciliation::EmptyTarget`]
/// 3) key column must be a header column
/// 4) duplicate policies (`reject` fails here)
pub fn reconcile(
    header: &[String],
    rows: &[RawRow],
    batch: &RecordBatch,
    opts: &ReconcileOptions,
) -> Result<Reconciliation, ReconcileError> {
    if !batch.has_column(&opts.key_column) {
        return Err(ReconcileError::MissingKeyInRecords {
            key_column: opts.key_column.clone(),
        });
    }

    if header.is_empty() {
        return Ok(Reconciliation::EmptyTarget);
    }

    if header_position(header, &opts.key_column).is_none() {
        return Err(ReconcileError::MissingKeyInHeader {
            key_column: opts.key_column.clone(),
        });
    }

    let index = build_key_index(header, rows, &opts.key_column, opts.target_duplicates)?;
    reconcile_with_index(&index, header, rows, batch, opts).map(Reconciliation::Ready)
}

/// Partition `batch` using a prebuilt [`KeyIndex`].
///
/// The index must have been built from the same `header` and `rows`.
pub fn reconcile_with_index(
    index: &KeyIndex,
    header: &[String],
    rows: &[RawRow],
    batch: &RecordBatch,
    opts: &ReconcileOptions,
) -> Result<ReconcileOutcome, ReconcileError> {
    let width = header.len();
    let key_column = opts.key_column.as_str();
    let key_pos = header_position(header, key_column);

    let sync_columns = opts.effective_sync_columns(batch);
    let mut slots: Vec<SyncSlot<'_>> = Vec::new();
    let mut ignored_columns: Vec<String> = Vec::new();
    for col in &sync_columns {
        match header_position(header, col) {
            Some(pos) => slots.push(SyncSlot { column: col, pos }),
            None => ignored_columns.push(col.clone()),
        }
    }
    // Header order makes changed_columns stable regardless of sync order.
    slots.sort_by_key(|s| s.pos);

    let (selected, skipped_duplicates) =
        select_records(&batch.records, key_column, opts.incoming_duplicates)?;

    let mut outcome = ReconcileOutcome {
        header: header.to_vec(),
        skipped_duplicates,
        ignored_columns,
        target_duplicate_keys: index.duplicates().to_vec(),
        ..ReconcileOutcome::default()
    };

    for (key, record) in selected {
        if key.is_empty() {
            outcome.skipped_blank_keys += 1;
            continue;
        }

        match index.get(&key) {
            None => {
                let mut cells = vec![String::new(); width];
                for slot in &slots {
                    cells[slot.pos] = record.canonical(slot.column);
                }
                // An inserted row always carries its match key.
                if let Some(kpos) = key_pos {
                    cells[kpos] = key.clone();
                }
                outcome.inserts.push(InsertRow { key, cells });
            }
            Some(row) => {
                let current: &[String] = row
                    .checked_sub(FIRST_DATA_ROW)
                    .and_then(|i| rows.get(i))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);

                match diff_row(current, record, &slots, width) {
                    Some((cells, changed_columns)) => outcome.updates.push(UpdateRow {
                        key,
                        row,
                        cells,
                        changed_columns,
                    }),
                    None => outcome.unchanged += 1,
                }
            }
        }
    }

    Ok(outcome)
}

/// Overwrite synced cells that carry a non-blank, different value.
/// Returns `None` when nothing changed.
fn diff_row(
    current: &[String],
    record: &NewRecord,
    slots: &[SyncSlot<'_>],
    width: usize,
) -> Option<(Vec<String>, Vec<String>)> {
    let mut cells = normalize_width(current.to_vec(), width);
    let mut changed: Vec<String> = Vec::new();

    for slot in slots {
        let new_val = record.canonical(slot.column);
        // Blank never overwrites.
        if new_val.is_empty() {
            continue;
        }
        let cur_val = current.get(slot.pos).map(|c| c.trim()).unwrap_or("");
        if new_val != cur_val {
            cells[slot.pos] = new_val;
            changed.push(slot.column.to_string());
        }
    }

    if changed.is_empty() {
        None
    } else {
        Some((cells, changed))
    }
}

/// Apply the incoming duplicate policy. Returns (key, record) pairs in input
/// order plus the number of records dropped. Blank keys pass through untouched
/// so they are counted as blank, not as duplicates.
fn select_records<'a>(
    records: &'a [NewRecord],
    key_column: &str,
    policy: IncomingDuplicatePolicy,
) -> Result<(Vec<(String, &'a NewRecord)>, usize), ReconcileError> {
    let keyed: Vec<(String, &NewRecord)> = records
        .iter()
        .map(|r| (r.canonical(key_column), r))
        .collect();

    match policy {
        IncomingDuplicatePolicy::KeepAll => Ok((keyed, 0)),

        IncomingDuplicatePolicy::Reject => {
            {
                let mut seen: BTreeSet<&str> = BTreeSet::new();
                for (key, _) in &keyed {
                    if !key.is_empty() && !seen.insert(key.as_str()) {
                        return Err(ReconcileError::DuplicateKey {
                            side: DuplicateSide::Incoming,
                            key: key.clone(),
                        });
                    }
                }
            }
            Ok((keyed, 0))
        }

        IncomingDuplicatePolicy::KeepFirst | IncomingDuplicatePolicy::KeepLast => {
            let keep: Vec<bool> = {
                // key -> index of the surviving record
                let mut winner: BTreeMap<&str, usize> = BTreeMap::new();
                for (i, (key, _)) in keyed.iter().enumerate() {
                    if key.is_empty() {
                        continue;
                    }
                    if policy == IncomingDuplicatePolicy::KeepLast {
                        winner.insert(key.as_str(), i);
                    } else {
                        winner.entry(key.as_str()).or_insert(i);
                    }
                }
                keyed
                    .iter()
                    .enumerate()
                    .map(|(i, (key, _))| key.is_empty() || winner.get(key.as_str()) == Some(&i))
                    .collect()
            };
            let dropped = keep.iter().filter(|k| !**k).count();

            let selected = keyed
                .into_iter()
                .zip(keep)
                .filter_map(|(pair, k)| k.then_some(pair))
                .collect();
            Ok((selected, dropped))
        }
    }
}
