//! Command handler modules for the `tsync` binary.
//!
//! Shared output helpers live here; command logic lives in the submodules.

pub mod inspect;
pub mod upsert;

/// Join cells for single-line `key=value` output.
pub fn join_cells(cells: &[String]) -> String {
    cells.join(",")
}
