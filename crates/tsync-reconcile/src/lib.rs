//! tsync-reconcile
//!
//! Key-column reconciliation of an incoming record batch against a target table.
//!
//! Architectural decisions:
//! - The target table is addressed by position: header at row 1, data from row 2
//! - Match keys are the trimmed canonical string of the key column
//! - Blank keys never match and never insert
//! - Empty incoming values never blank an existing cell
//! - Sync columns missing from the target header are ignored, never appended
//! - Update and insert rows always have exactly the header's width
//!
//! Deterministic, pure logic. No IO. No logging.

mod engine;
mod error;
mod index;
mod types;
mod value;

pub use engine::{normalize_width, reconcile, reconcile_with_index};
pub use error::{DuplicateSide, ReconcileError};
pub use index::{build_key_index, header_position, KeyIndex, FIRST_DATA_ROW};
pub use types::*;
pub use value::CellValue;
