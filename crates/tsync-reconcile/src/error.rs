use std::fmt;

/// Which side of the reconciliation carried a repeated key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicateSide {
    Target,
    Incoming,
}

impl DuplicateSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateSide::Target => "target",
            DuplicateSide::Incoming => "incoming",
        }
    }
}

/// Input errors. Raised before any partitioning happens, so a failed call
/// never produces a partial outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// Key column is not a column of the incoming batch.
    MissingKeyInRecords { key_column: String },
    /// Key column is not in a non-empty target header.
    MissingKeyInHeader { key_column: String },
    /// A repeated key under a `reject` policy.
    DuplicateKey { side: DuplicateSide, key: String },
}

impl ReconcileError {
    /// Configuration errors: the run was asked to match on a column that
    /// does not exist on one side.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReconcileError::MissingKeyInRecords { .. } | ReconcileError::MissingKeyInHeader { .. }
        )
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::MissingKeyInRecords { key_column } => write!(
                f,
                "CONFIG_KEY_COLUMN_MISSING: matching column '{key_column}' not found in upload"
            ),
            ReconcileError::MissingKeyInHeader { key_column } => write!(
                f,
                "CONFIG_KEY_COLUMN_MISSING: matching column '{key_column}' not found in target header"
            ),
            ReconcileError::DuplicateKey { side, key } => write!(
                f,
                "DUPLICATE_KEY: key '{key}' appears more than once on the {} side",
                side.as_str()
            ),
        }
    }
}

impl std::error::Error for ReconcileError {}
