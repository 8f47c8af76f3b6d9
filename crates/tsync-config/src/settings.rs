//! Typed view of the effective config for one upsert invocation.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tsync_reconcile::{DuplicatePolicy, IncomingDuplicatePolicy, ReconcileOptions};

pub const DEFAULT_LOG_TABLE: &str = "__update_log__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Workbook directory; each table is `<name>.csv`.
    pub store_root: PathBuf,
    pub table: Option<String>,
    pub key_column: Option<String>,
    /// Empty means every upload column.
    pub sync_columns: Vec<String>,
    pub target_duplicates: DuplicatePolicy,
    pub incoming_duplicates: IncomingDuplicatePolicy,
    pub log_enabled: bool,
    pub log_table: String,
}

impl SyncSettings {
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        Self::from_config_json_with_env(cfg, |name| std::env::var(name).ok())
    }

    /// Same as [`SyncSettings::from_config_json`] with an explicit env lookup.
    ///
    /// `store.root_env` names an env var; when that var is set and non-empty
    /// it overrides `store.root`.
    pub fn from_config_json_with_env<F>(cfg: &Value, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root_literal = opt_str(cfg, "/store/root")?;
        let root_from_env = match opt_str(cfg, "/store/root_env")? {
            Some(var) => env(&var).filter(|v| !v.trim().is_empty()),
            None => None,
        };
        let store_root = root_from_env
            .or(root_literal)
            .map(PathBuf::from)
            .context("config missing store.root (or a set store.root_env variable)")?;

        let sync_columns = match cfg.pointer("/target/sync_columns") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(|s| s.trim().to_string())
                        .ok_or_else(|| anyhow!("target.sync_columns must be a list of strings"))
                })
                .collect::<Result<Vec<_>>>()?,
            // A single comma-separated string is accepted too.
            Some(Value::String(s)) => split_columns(s),
            Some(other) => bail!("target.sync_columns must be a list (got {other})"),
        };

        let target_duplicates = match opt_str(cfg, "/policy/target_duplicates")? {
            Some(s) => DuplicatePolicy::parse(&s)
                .ok_or_else(|| anyhow!("policy.target_duplicates: unknown value '{s}'"))?,
            None => DuplicatePolicy::default(),
        };
        let incoming_duplicates = match opt_str(cfg, "/policy/incoming_duplicates")? {
            Some(s) => IncomingDuplicatePolicy::parse(&s)
                .ok_or_else(|| anyhow!("policy.incoming_duplicates: unknown value '{s}'"))?,
            None => IncomingDuplicatePolicy::default(),
        };

        let log_enabled = match cfg.pointer("/log/enabled") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => *b,
            Some(other) => bail!("log.enabled must be a boolean (got {other})"),
        };
        let log_table = opt_str(cfg, "/log/table")?
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_TABLE.to_string());

        Ok(Self {
            store_root,
            table: opt_str(cfg, "/target/table")?,
            key_column: opt_str(cfg, "/target/key_column")?,
            sync_columns,
            target_duplicates,
            incoming_duplicates,
            log_enabled,
            log_table,
        })
    }

    /// Command-line flags win over config values.
    pub fn apply_overrides(
        &mut self,
        table: Option<&str>,
        key_column: Option<&str>,
        sync_columns: Option<&str>,
    ) {
        if let Some(t) = table {
            self.table = Some(t.trim().to_string());
        }
        if let Some(k) = key_column {
            self.key_column = Some(k.trim().to_string());
        }
        if let Some(s) = sync_columns {
            self.sync_columns = split_columns(s);
        }
    }

    pub fn require_table(&self) -> Result<&str> {
        self.table
            .as_deref()
            .filter(|t| !t.is_empty())
            .context("no target table: set target.table or pass --table")
    }

    pub fn reconcile_options(&self) -> Result<ReconcileOptions> {
        let key = self
            .key_column
            .as_deref()
            .filter(|k| !k.is_empty())
            .context("no matching column: set target.key_column or pass --key")?;
        Ok(ReconcileOptions::new(key)
            .with_sync_columns(self.sync_columns.iter().cloned())
            .with_target_duplicates(self.target_duplicates)
            .with_incoming_duplicates(self.incoming_duplicates))
    }

    /// Log table to append to, or `None` when logging is disabled.
    pub fn log_target(&self) -> Option<&str> {
        self.log_enabled.then_some(self.log_table.as_str())
    }
}

fn opt_str(cfg: &Value, ptr: &str) -> Result<Option<String>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        // YAML happily types `key_column: 2024` as a number.
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => bail!("{} must be a string (got {other})", pointer_to_dotted(ptr)),
    }
}

fn pointer_to_dotted(ptr: &str) -> String {
    ptr.trim_start_matches('/').replace('/', ".")
}

fn split_columns(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
