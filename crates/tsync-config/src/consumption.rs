//! Unused-key guard.
//!
//! A config leaf counts as read when its JSON Pointer equals, or sits under,
//! one of [`CONSUMED_POINTERS`]. Everything else is reported, so a typo such
//! as `target.key_colum` surfaces instead of silently falling back to a default.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every pointer `SyncSettings::from_config_json` reads.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/log/enabled",
    "/log/table",
    "/policy/incoming_duplicates",
    "/policy/target_duplicates",
    "/store/root",
    "/store/root_env",
    "/target/key_column",
    "/target/sync_columns",
    "/target/table",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub consumed_prefixes: Vec<String>,
    /// Sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// With `Fail`, any unused key is an error. With `Warn`, always `Ok(report)`.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut unused: Vec<String> = leaves(config_json)
        .into_iter()
        .map(|(pointer, _)| pointer)
        .filter(|pointer| !is_consumed(pointer))
        .collect();
    unused.sort();

    if policy == UnusedKeyPolicy::Fail && !unused.is_empty() {
        bail!(
            "CONFIG_UNUSED_KEYS: the sync config sets {} key(s) nothing reads: {}",
            unused.len(),
            unused.join(", ")
        );
    }

    Ok(UnusedKeyReport {
        consumed_prefixes: CONSUMED_POINTERS.iter().map(|p| p.to_string()).collect(),
        unused_leaf_pointers: unused,
    })
}

/// `/target/sync_columns` covers `/target/sync_columns/0`; `/log/table` does
/// not cover `/log/tables`.
fn is_consumed(leaf: &str) -> bool {
    CONSUMED_POINTERS.iter().any(|consumed| {
        leaf.strip_prefix(*consumed)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Every scalar in `root` (null included) with its JSON Pointer.
/// An empty mapping or sequence has no leaves.
pub(crate) fn leaves(root: &Value) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    let mut pending = vec![(String::new(), root)];
    while let Some((pointer, value)) = pending.pop() {
        match value {
            Value::Object(map) => pending.extend(map.iter().map(|(k, v)| {
                let token = k.replace('~', "~0").replace('/', "~1");
                (format!("{pointer}/{token}"), v)
            })),
            Value::Array(items) => pending.extend(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (format!("{pointer}/{i}"), v)),
            ),
            scalar => out.push((pointer, scalar)),
        }
    }
    out
}
