use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::CellValue;

/// Ordered column names of the target table (row 1).
pub type Header = Vec<String>;

/// Raw positional cells of one stored row. May be shorter than the header
/// when the store drops trailing blanks.
pub type RawRow = Vec<String>;

/// One incoming record: column name -> value. A column that is not present
/// reads as [`CellValue::Empty`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub values: BTreeMap<String, CellValue>,
}

impl NewRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// Canonical string of a column ("" when absent).
    pub fn canonical(&self, column: &str) -> String {
        self.values
            .get(column)
            .map(CellValue::canonical)
            .unwrap_or_default()
    }
}

/// A parsed upload: column order as found in the source plus the records.
///
/// `columns` is what an empty target table gets as its header.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    pub columns: Vec<String>,
    pub records: Vec<NewRecord>,
}

impl RecordBatch {
    pub fn new(columns: Vec<String>, records: Vec<NewRecord>) -> Self {
        Self { columns, records }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How repeated keys in the target table are indexed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later (higher) row position wins.
    #[default]
    KeepLast,
    KeepFirst,
    Reject,
}

impl DuplicatePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_last" | "last" => Some(DuplicatePolicy::KeepLast),
            "keep_first" | "first" => Some(DuplicatePolicy::KeepFirst),
            "reject" => Some(DuplicatePolicy::Reject),
            _ => None,
        }
    }
}

/// How repeated match keys inside the incoming batch are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomingDuplicatePolicy {
    /// Every record is processed on its own; an insert key may be appended twice.
    #[default]
    KeepAll,
    KeepFirst,
    KeepLast,
    Reject,
}

impl IncomingDuplicatePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_all" | "all" => Some(IncomingDuplicatePolicy::KeepAll),
            "keep_first" | "first" => Some(IncomingDuplicatePolicy::KeepFirst),
            "keep_last" | "last" => Some(IncomingDuplicatePolicy::KeepLast),
            "reject" => Some(IncomingDuplicatePolicy::Reject),
            _ => None,
        }
    }
}

/// Inputs that shape one reconciliation besides the data itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    pub key_column: String,
    /// Columns eligible for compare/overwrite. Empty means every batch column.
    pub sync_columns: Vec<String>,
    pub target_duplicates: DuplicatePolicy,
    pub incoming_duplicates: IncomingDuplicatePolicy,
}

impl ReconcileOptions {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
            ..Self::default()
        }
    }

    pub fn with_sync_columns<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sync_columns = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_duplicates(mut self, p: DuplicatePolicy) -> Self {
        self.target_duplicates = p;
        self
    }

    pub fn with_incoming_duplicates(mut self, p: IncomingDuplicatePolicy) -> Self {
        self.incoming_duplicates = p;
        self
    }

    /// Effective sync set in a stable order: explicit columns as given (deduped),
    /// or the batch's own column order when none were chosen.
    pub fn effective_sync_columns(&self, batch: &RecordBatch) -> Vec<String> {
        let source = if self.sync_columns.is_empty() {
            &batch.columns
        } else {
            &self.sync_columns
        };
        let mut seen = BTreeSet::new();
        source
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect()
    }
}

/// A new key: ready-to-append cells in header order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertRow {
    pub key: String,
    pub cells: Vec<String>,
}

/// An existing key with at least one changed synced cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRow {
    pub key: String,
    /// 1-based position in the target table (header is row 1).
    pub row: usize,
    /// Full reconstructed row, exactly header width.
    pub cells: Vec<String>,
    /// Header columns whose cell was overwritten, in header order.
    pub changed_columns: Vec<String>,
}

/// Result of one reconciliation over a non-empty target.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub header: Header,
    pub inserts: Vec<InsertRow>,
    pub updates: Vec<UpdateRow>,
    pub unchanged: usize,
    /// Records whose match key was blank; excluded from every partition.
    pub skipped_blank_keys: usize,
    /// Records dropped by the incoming duplicate policy (keep_first / keep_last).
    pub skipped_duplicates: usize,
    /// Sync columns that do not exist in the target header (never written).
    pub ignored_columns: Vec<String>,
    /// Keys that occur on more than one target row, resolved by the
    /// target duplicate policy.
    pub target_duplicate_keys: Vec<String>,
}

impl ReconcileOutcome {
    /// Number of records accounted for by insert, update or unchanged.
    pub fn accounted(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.unchanged
    }

    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }

    pub fn insert_cells(&self) -> Vec<Vec<String>> {
        self.inserts.iter().map(|r| r.cells.clone()).collect()
    }
}

/// What the engine hands back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reconciliation {
    Ready(ReconcileOutcome),
    /// The target has no header row at all. The caller must establish one
    /// (normally the batch's column order) before any write.
    EmptyTarget,
}

impl Reconciliation {
    pub fn outcome(&self) -> Option<&ReconcileOutcome> {
        match self {
            Reconciliation::Ready(o) => Some(o),
            Reconciliation::EmptyTarget => None,
        }
    }

    pub fn is_empty_target(&self) -> bool {
        matches!(self, Reconciliation::EmptyTarget)
    }
}
