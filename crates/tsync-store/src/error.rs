use std::fmt;

/// Errors surfaced by a [`crate::TableStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The workbook root does not exist or is not a directory.
    Unavailable(String),
    /// Table name is empty or would escape the workbook.
    InvalidTableName(String),
    TableNotFound(String),
    TableExists(String),
    /// Row positions are 1-based.
    RowOutOfRange { table: String, row: usize },
    Io(String),
    Csv(String),
    /// Failure injected by [`crate::MemoryWorkbook`] for tests.
    Injected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(root) => write!(f, "store unavailable: {root}"),
            StoreError::InvalidTableName(name) => write!(f, "invalid table name: '{name}'"),
            StoreError::TableNotFound(name) => write!(f, "table not found: '{name}'"),
            StoreError::TableExists(name) => write!(f, "table already exists: '{name}'"),
            StoreError::RowOutOfRange { table, row } => {
                write!(f, "row {row} out of range for table '{table}'")
            }
            StoreError::Io(msg) => write!(f, "store io error: {msg}"),
            StoreError::Csv(msg) => write!(f, "store csv error: {msg}"),
            StoreError::Injected(msg) => write!(f, "injected failure: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Csv(e.to_string())
    }
}
